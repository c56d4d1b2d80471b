mod state;
mod ui;

use auto_publisher::catalog;
use auto_publisher::driver::SessionOptions;
use auto_publisher::events::ChannelSink;
use auto_publisher::session::plan_batches;
use auto_publisher::{
    AppConfig, DestinationResolver, EventBus, HttpDestinationSearch, JobResult, JsonFileStore,
    UploadError, UploadSessionDriver, WatchScheduler, WebDriverBrowser,
};
use eframe::{egui, App};
pub use state::{ActionProgress, HostState, JobForm};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

pub struct PublisherApp {
    form: JobForm,
    state: HostState,
    config: AppConfig,
    events: EventBus,
    runtime: Runtime,
    scheduler: Option<WatchScheduler>,
}

impl PublisherApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig, runtime: Runtime) -> Self {
        tracing::info!(
            webdriver = %config.webdriver_url,
            state_dir = %config.state_dir.display(),
            "Initializing publisher"
        );
        let (sender, receiver) = std_mpsc::channel();
        let events = EventBus::new().with_sink(Arc::new(ChannelSink::new(sender)));
        let state = HostState {
            event_receiver: Some(receiver),
            ..HostState::default()
        };

        Self {
            form: JobForm::default(),
            state,
            config,
            events,
            runtime,
            scheduler: None,
        }
    }

    /// Publish every matching file in the folder once.
    pub fn start_upload(&mut self) {
        self.state.error_message = None;
        let config = match self.form.to_config() {
            Ok(config) => config,
            Err(e) => {
                self.state.error_message = Some(e);
                return;
            }
        };
        if let Err(e) = config.validate() {
            self.state.error_message = Some(e.to_string());
            return;
        }
        let config = config.for_content_type(config.content_type);

        let files: Vec<PathBuf> = catalog::list_all(&config.folder_path, config.content_type)
            .into_iter()
            .map(|candidate| candidate.path)
            .collect();
        if files.is_empty() {
            self.state.error_message = Some(format!(
                "No {} files in {}",
                config.content_type,
                config.folder_path.display()
            ));
            return;
        }

        tracing::info!(
            files = files.len(),
            folder = %config.folder_path.display(),
            "Starting manual upload"
        );
        self.state.progress = ActionProgress::Uploading {
            total_files: files.len(),
            total_batches: plan_batches(&files, config.batch_size).len(),
        };

        let (sender, receiver) = std_mpsc::channel();
        self.state.result_receiver = Some(receiver);
        let cancel = CancellationToken::new();
        self.state.cancel = Some(cancel.clone());

        let app_config = self.config.clone();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let result = match build_driver(&app_config, events).await {
                Ok(driver) => driver.run(&config, &files, &cancel).await,
                Err(e) => {
                    tracing::error!(error = %e, "Could not reach the browser driver");
                    JobResult::failed(e.to_string(), 0, 0)
                }
            };
            let _ = sender.send(result);
        });
    }

    pub fn cancel_upload(&mut self) {
        if let Some(cancel) = &self.state.cancel {
            tracing::info!("Cancelling manual upload");
            cancel.cancel();
        }
    }

    pub fn start_watching(&mut self) {
        self.state.error_message = None;
        let config = match self.form.to_config() {
            Ok(config) => config,
            Err(e) => {
                self.state.error_message = Some(e);
                return;
            }
        };

        let app_config = self.config.clone();
        let events = self.events.clone();
        let existing = self.scheduler.clone();
        let outcome = self.runtime.block_on(async move {
            let scheduler = match existing {
                Some(scheduler) => scheduler,
                None => {
                    let driver = build_driver(&app_config, events.clone()).await?;
                    let store = JsonFileStore::new(app_config.state_dir.clone());
                    WatchScheduler::new(Arc::new(driver), Arc::new(store), events)
                }
            };
            let reply = scheduler.start(config).await;
            Ok::<_, UploadError>((scheduler, reply))
        });

        match outcome {
            Ok((scheduler, reply)) => {
                if !reply.success {
                    self.state.error_message = Some(format!("Could not start: {}", reply.message));
                }
                self.scheduler = Some(scheduler);
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not start watching");
                self.state.error_message = Some(e.to_string());
            }
        }
    }

    pub fn stop_watching(&mut self) {
        if let Some(scheduler) = &self.scheduler {
            let reply = self.runtime.block_on(scheduler.stop());
            if !reply.success {
                self.state.error_message = Some(format!("Could not stop: {}", reply.message));
            }
        }
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        ctx.request_repaint_after(Duration::from_millis(250));

        if let Some(receiver) = self.state.event_receiver.take() {
            while let Ok(event) = receiver.try_recv() {
                self.state.push_event(event);
            }
            self.state.event_receiver = Some(receiver);
        }

        if let Some(receiver) = &self.state.result_receiver {
            if let Ok(result) = receiver.try_recv() {
                if !result.success && !result.cancelled {
                    self.state.error_message = Some(
                        "Upload failed. Check details for more information.".to_string(),
                    );
                }
                self.state.progress = ActionProgress::Completed(result);
                self.state.result_receiver = None;
                self.state.cancel = None;
            }
        }

        if let Some(scheduler) = &self.scheduler {
            self.state.watch_status = Some(self.runtime.block_on(scheduler.status()));
        }
    }
}

async fn build_driver(config: &AppConfig, events: EventBus) -> Result<UploadSessionDriver, UploadError> {
    let browser = WebDriverBrowser::launch(config.webdriver_url.clone()).await?;
    let profile = config.site_profile.clone();
    let search = HttpDestinationSearch::new(profile.search_endpoint.clone());
    let resolver = DestinationResolver::new(Arc::new(search), profile.lookup_strategies.clone());
    let options = SessionOptions {
        headless: config.headless,
        ..SessionOptions::default()
    };

    Ok(UploadSessionDriver::new(Arc::new(browser), resolver, profile, events).with_session_options(options))
}

impl App for PublisherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
