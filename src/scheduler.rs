//! Unattended mode: poll a folder and publish whatever is new.

use crate::catalog::{DedupStore, FileCatalog};
use crate::config::{ContentType, UploadJobConfig};
use crate::events::EventBus;
use crate::session::JobResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Something that publishes a list of files. Implemented by the upload
/// session driver.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(
        &self,
        config: &UploadJobConfig,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> JobResult;
}

/// Reply to `start` and `stop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlResult {
    pub success: bool,
    pub message: String,
}

impl ControlResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WatchStatus {
    pub running: bool,
    pub folder: Option<PathBuf>,
    pub cycles: u64,
    pub last_check: Option<DateTime<Utc>>,
    pub last_result: Option<JobResult>,
    pub uploaded_count: usize,
}

#[derive(Default)]
struct WatchState {
    running: bool,
    config: Option<UploadJobConfig>,
    catalog: Option<FileCatalog>,
    token: Option<CancellationToken>,
    cycles: u64,
    last_check: Option<DateTime<Utc>>,
    last_result: Option<JobResult>,
}

/// Owns the run/stop flag, the poll timer and the upload record of one
/// watched folder. Clones share the same state.
#[derive(Clone)]
pub struct WatchScheduler {
    runner: Arc<dyn JobRunner>,
    store: Arc<dyn DedupStore>,
    events: EventBus,
    state: Arc<Mutex<WatchState>>,
    // Held for the whole of a check, so two checks never overlap.
    cycle_lock: Arc<Mutex<()>>,
}

impl WatchScheduler {
    pub fn new(runner: Arc<dyn JobRunner>, store: Arc<dyn DedupStore>, events: EventBus) -> Self {
        Self {
            runner,
            store,
            events,
            state: Arc::new(Mutex::new(WatchState::default())),
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Start watching `config.folder_path`. The first check runs right away,
    /// then one every `poll_interval_ms`.
    pub async fn start(&self, config: UploadJobConfig) -> ControlResult {
        let mut state = self.state.lock().await;
        if state.running {
            return ControlResult::rejected("already running");
        }
        if let Err(e) = config.validate_unattended() {
            return ControlResult::rejected(e.to_string());
        }

        let catalog = FileCatalog::load(
            &config.folder_path,
            self.store.clone(),
            &config.exclude_patterns,
        )
        .await;
        let period = Duration::from_millis(config.poll_interval_ms);
        let token = CancellationToken::new();

        tracing::info!(
            folder = %catalog.folder().display(),
            poll_interval_ms = config.poll_interval_ms,
            "Watch started"
        );
        self.events.info(format!(
            "Watching {} every {}s",
            catalog.folder().display(),
            period.as_secs()
        ));

        state.running = true;
        state.config = Some(config);
        state.catalog = Some(catalog);
        state.token = Some(token.clone());
        drop(state);

        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.watch_loop(token, period).await });

        ControlResult::ok("started")
    }

    /// Stop watching. A run already in progress is not aborted; it stops at
    /// its next batch boundary.
    pub async fn stop(&self) -> ControlResult {
        let mut state = self.state.lock().await;
        if !state.running {
            return ControlResult::rejected("not running");
        }
        state.running = false;
        if let Some(token) = state.token.take() {
            token.cancel();
        }

        tracing::info!("Watch stopped");
        self.events.info("Stopped watching");
        ControlResult::ok("stopped")
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.running
    }

    pub async fn status(&self) -> WatchStatus {
        let state = self.state.lock().await;
        WatchStatus {
            running: state.running,
            folder: state.catalog.as_ref().map(|c| c.folder().to_path_buf()),
            cycles: state.cycles,
            last_check: state.last_check,
            last_result: state.last_result.clone(),
            uploaded_count: state.catalog.as_ref().map_or(0, FileCatalog::uploaded_count),
        }
    }

    /// One discovery + publish pass for `content_type`. Returns the run's
    /// result, or `None` when not running or nothing new was found. Waits
    /// for any check already in progress.
    pub async fn check_and_upload(&self, content_type: ContentType) -> Option<JobResult> {
        let _cycle = self.cycle_lock.lock().await;
        self.check_and_upload_locked(content_type).await
    }

    async fn watch_loop(self, token: CancellationToken, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => self.run_cycle(&token).await,
            }
        }
        tracing::debug!("Watch loop exited");
    }

    async fn run_cycle(&self, token: &CancellationToken) {
        let Ok(_cycle) = self.cycle_lock.try_lock() else {
            tracing::debug!("Previous check still running, skipping this tick");
            return;
        };

        for content_type in ContentType::ALL {
            if token.is_cancelled() {
                break;
            }
            self.check_and_upload_locked(content_type).await;
        }

        let mut state = self.state.lock().await;
        state.cycles += 1;
        state.last_check = Some(Utc::now());
    }

    async fn check_and_upload_locked(&self, content_type: ContentType) -> Option<JobResult> {
        let (config, folder, files, cancel) = {
            let state = self.state.lock().await;
            if !state.running {
                return None;
            }
            let (Some(config), Some(catalog), Some(token)) =
                (&state.config, &state.catalog, &state.token)
            else {
                return None;
            };

            let config = config.for_content_type(content_type);
            let files: Vec<PathBuf> = catalog
                .discover_new(content_type, config.max_files_per_check)
                .into_iter()
                .map(|candidate| candidate.path)
                .collect();
            (
                config,
                catalog.folder().to_path_buf(),
                files,
                token.child_token(),
            )
        };

        if files.is_empty() {
            tracing::debug!(content_type = %content_type, "No new files");
            return None;
        }

        self.events.info(format!(
            "Found {} new {} files",
            files.len(),
            content_type
        ));
        let result = self.runner.run(&config, &files, &cancel).await;

        let mut state = self.state.lock().await;
        if result.success {
            // The watch may have been restarted on another folder while the
            // run was in flight; the files belong to the folder they came from.
            let added = match state.catalog.as_mut() {
                Some(catalog) if catalog.folder() == folder.as_path() => {
                    catalog.mark_uploaded(&files).await
                }
                _ => {
                    let mut origin =
                        FileCatalog::load(&folder, self.store.clone(), &config.exclude_patterns)
                            .await;
                    origin.mark_uploaded(&files).await
                }
            };
            tracing::info!(
                content_type = %content_type,
                folder = %folder.display(),
                added,
                "Marked files as uploaded"
            );
        } else if result.cancelled {
            tracing::info!(content_type = %content_type, "Run cancelled, files stay pending");
        } else {
            tracing::error!(
                content_type = %content_type,
                error = result.error.as_deref().unwrap_or("unknown error"),
                "Run failed, will retry next cycle"
            );
        }
        state.last_result = Some(result.clone());
        Some(result)
    }
}
