//! The upload session: one authenticated browser session that publishes a
//! list of files batch by batch.

mod batch;
pub mod strategy;

pub use batch::{plan_batches, Batch, JobResult};

use crate::config::{SelectorSet, SiteProfile, UploadJobConfig};
use crate::destination::{DestinationResolver, DestinationSuggestion, MatchKind};
use crate::driver::{Browser, BrowserSession, Control, SessionOptions, WaitCondition};
use crate::error::{DriverError, Result, UploadError};
use crate::events::EventBus;
use crate::scheduler::JobRunner;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use strategy::{
    file_selection_strategies, first_present, generic_click_strategy, reconcile, rendered_groups,
    suggestion_strategies,
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Authenticating,
    Authenticated,
    NavigatingToPublishSurface,
    SelectingFiles { batch: usize },
    AwaitingFileAcknowledgement { batch: usize },
    FillingMetadata { batch: usize },
    ResolvingDestination { batch: usize },
    Publishing { batch: usize },
    BatchComplete { batch: usize },
    AllBatchesComplete,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::AllBatchesComplete | SessionState::Cancelled | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Authenticating => write!(f, "logging in"),
            SessionState::Authenticated => write!(f, "logged in"),
            SessionState::NavigatingToPublishSurface => write!(f, "opening the publish form"),
            SessionState::SelectingFiles { batch } => write!(f, "batch {}: selecting files", batch),
            SessionState::AwaitingFileAcknowledgement { batch } => {
                write!(f, "batch {}: waiting for the file picker", batch)
            }
            SessionState::FillingMetadata { batch } => write!(f, "batch {}: filling details", batch),
            SessionState::ResolvingDestination { batch } => {
                write!(f, "batch {}: choosing destination", batch)
            }
            SessionState::Publishing { batch } => write!(f, "batch {}: publishing", batch),
            SessionState::BatchComplete { batch } => write!(f, "batch {}: done", batch),
            SessionState::AllBatchesComplete => write!(f, "all batches published"),
            SessionState::Cancelled => write!(f, "cancelled"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

pub struct UploadSessionDriver {
    browser: Arc<dyn Browser>,
    resolver: DestinationResolver,
    profile: SiteProfile,
    options: SessionOptions,
    events: EventBus,
}

impl UploadSessionDriver {
    pub fn new(
        browser: Arc<dyn Browser>,
        resolver: DestinationResolver,
        profile: SiteProfile,
        events: EventBus,
    ) -> Self {
        Self {
            browser,
            resolver,
            profile,
            options: SessionOptions::default(),
            events,
        }
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Publish `files` in batches. Always resolves to a [`JobResult`];
    /// `cancel` is checked before each batch, never in the middle of one.
    ///
    /// The browser session is left open afterwards, whatever the outcome, so
    /// the final page can be inspected.
    #[tracing::instrument(
        skip_all,
        fields(content_type = %config.content_type, files = files.len())
    )]
    pub async fn run(
        &self,
        config: &UploadJobConfig,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> JobResult {
        let batches = plan_batches(files, config.batch_size);
        let mut run = Run::new(self, config, batches.len());

        let result = match run.execute(&batches, cancel).await {
            Ok(Outcome::Completed) => {
                run.transition(SessionState::AllBatchesComplete);
                self.events.success(format!(
                    "Published {} {} files in {} batches",
                    run.files_done, config.content_type, run.batches_done
                ));
                JobResult::completed(run.files_done, run.batches_done)
            }
            Ok(Outcome::Cancelled) => {
                run.transition(SessionState::Cancelled);
                self.events.warning(format!(
                    "Upload cancelled after {} of {} batches",
                    run.batches_done, run.total_batches
                ));
                JobResult::cancelled(run.files_done, run.batches_done)
            }
            Err(e) => {
                run.transition(SessionState::Failed);
                self.events.error(format!("Upload failed: {}", e));
                JobResult::failed(e.to_string(), run.files_done, run.batches_done)
            }
        };
        run.transition(SessionState::Idle);
        result
    }
}

#[async_trait]
impl JobRunner for UploadSessionDriver {
    async fn run(
        &self,
        config: &UploadJobConfig,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> JobResult {
        UploadSessionDriver::run(self, config, files, cancel).await
    }
}

enum Outcome {
    Completed,
    Cancelled,
}

/// State of a single `run` call.
struct Run<'a> {
    driver: &'a UploadSessionDriver,
    config: &'a UploadJobConfig,
    state: SessionState,
    total_batches: usize,
    batches_done: usize,
    files_done: usize,
    destination: Option<DestinationSuggestion>,
}

impl<'a> Run<'a> {
    fn new(driver: &'a UploadSessionDriver, config: &'a UploadJobConfig, total_batches: usize) -> Self {
        Self {
            driver,
            config,
            state: SessionState::Idle,
            total_batches,
            batches_done: 0,
            files_done: 0,
            destination: None,
        }
    }

    fn profile(&self) -> &'a SiteProfile {
        &self.driver.profile
    }

    fn transition(&mut self, next: SessionState) {
        tracing::info!(from = ?self.state, to = ?next, total_batches = self.total_batches, "Session state");
        self.state = next;
        if !next.is_terminal() && next != SessionState::Idle {
            self.driver.events.info(format!("Upload: {}", next));
        }
    }

    async fn execute(&mut self, batches: &[Batch], cancel: &CancellationToken) -> Result<Outcome> {
        self.config.validate()?;
        if batches.is_empty() {
            self.driver.events.info("Nothing to upload");
            return Ok(Outcome::Completed);
        }

        let session = self.driver.browser.new_session(&self.driver.options).await?;
        self.authenticate(session.as_ref()).await?;
        self.open_publish_surface(session.as_ref()).await?;

        for batch in batches {
            if cancel.is_cancelled() {
                return Ok(Outcome::Cancelled);
            }
            self.publish_batch(session.as_ref(), batch).await?;
        }
        Ok(Outcome::Completed)
    }

    async fn authenticate(&mut self, session: &dyn BrowserSession) -> Result<()> {
        self.transition(SessionState::Authenticating);
        let profile = self.profile();
        let timeouts = &profile.timeouts;

        session
            .navigate(&profile.login_url, WaitCondition::DomContentLoaded, timeouts.navigation())
            .await
            .map_err(UploadError::Authentication)?;

        let account = wait_or(session, &profile.account_input, timeouts.element(), UploadError::Authentication).await?;
        session.fill(&account, &self.config.account_id).await?;
        let next = wait_or(session, &profile.continue_button, timeouts.element(), UploadError::Authentication).await?;
        session.click(&next).await?;

        let secret = wait_or(session, &profile.secret_input, timeouts.element(), UploadError::Authentication).await?;
        session.fill(&secret, &self.config.secret).await?;
        let submit = wait_or(session, &profile.login_submit, timeouts.element(), UploadError::Authentication).await?;
        session.click(&submit).await?;

        wait_or(session, &profile.login_confirmation, timeouts.login(), UploadError::Authentication).await?;
        self.transition(SessionState::Authenticated);
        Ok(())
    }

    /// The publish form has no stable URL; it is reached through the
    /// create menu.
    async fn open_publish_surface(&mut self, session: &dyn BrowserSession) -> Result<()> {
        self.transition(SessionState::NavigatingToPublishSurface);
        let profile = self.profile();
        let timeouts = &profile.timeouts;

        session
            .navigate(&profile.home_url, WaitCondition::DomContentLoaded, timeouts.navigation())
            .await
            .map_err(UploadError::Navigation)?;

        let menu = wait_or(session, &profile.publish_menu, timeouts.element(), UploadError::Navigation).await?;
        session.click(&menu).await?;
        let entry = wait_or(session, &profile.publish_entry, timeouts.element(), UploadError::Navigation).await?;
        session.click(&entry).await?;
        wait_or(session, &profile.publish_surface, timeouts.navigation(), UploadError::Navigation).await?;
        Ok(())
    }

    async fn publish_batch(&mut self, session: &dyn BrowserSession, batch: &Batch) -> Result<()> {
        let timeouts = &self.profile().timeouts;

        self.transition(SessionState::SelectingFiles { batch: batch.index });
        // Armed before any click so the selection event cannot be missed.
        let pending = session.arm_file_selection(timeouts.file_chooser()).await?;
        self.trigger_file_selection(session, batch).await?;

        self.transition(SessionState::AwaitingFileAcknowledgement { batch: batch.index });
        let selection = pending.await.map_err(|e| {
            tracing::warn!(batch = batch.index, error = %e, "File selection never opened");
            UploadError::FileSelectionUnavailable { batch: batch.index }
        })?;
        selection.supply_files(&batch.files).await?;
        self.driver.events.info(format!(
            "Batch {}/{}: selected {} files",
            batch.index,
            batch.total,
            batch.files.len()
        ));
        sleep(timeouts.settle_after_files()).await;

        self.transition(SessionState::FillingMetadata { batch: batch.index });
        self.fill_price(session).await?;
        if let Some(description) = non_blank(&self.config.description) {
            self.fill_optional(session, "description", &self.profile().description_input, description)
                .await?;
        }

        self.transition(SessionState::ResolvingDestination { batch: batch.index });
        self.fill_destination(session).await?;

        if let Some(location) = non_blank(&self.config.location) {
            self.fill_optional(session, "location", &self.profile().location_input, location)
                .await?;
        }
        if let Some(date) = non_blank(&self.config.date) {
            self.fill_optional(session, "date", &self.profile().date_input, date)
                .await?;
        }

        self.transition(SessionState::Publishing { batch: batch.index });
        self.publish(session, batch).await?;

        self.batches_done += 1;
        self.files_done += batch.files.len();
        self.transition(SessionState::BatchComplete { batch: batch.index });
        self.driver.events.success(format!(
            "Batch {}/{} published ({} files)",
            batch.index,
            batch.total,
            batch.files.len()
        ));
        Ok(())
    }

    async fn trigger_file_selection(&self, session: &dyn BrowserSession, batch: &Batch) -> Result<()> {
        let profile = self.profile();
        let probe = profile.timeouts.optional_probe();

        let strategies = file_selection_strategies(profile, self.config.content_type);
        if let Some((name, control)) = first_present(session, &strategies, probe).await? {
            tracing::debug!(strategy = name, selector = %control.selector, "Opening file selection");
            session.click(&control).await?;
            return Ok(());
        }

        self.driver.events.warning(format!(
            "Batch {}: no file input or drop area found, clicking the page instead",
            batch.index
        ));
        match first_present(session, &[generic_click_strategy(profile)], probe).await? {
            Some((_, control)) => {
                session.click(&control).await?;
                Ok(())
            }
            None => Err(UploadError::FileSelectionUnavailable { batch: batch.index }),
        }
    }

    async fn fill_price(&self, session: &dyn BrowserSession) -> Result<()> {
        let profile = self.profile();
        let control = session
            .wait_for_control(&profile.price_input, profile.timeouts.element())
            .await
            .map_err(|e| required(e, "price"))?;
        session.clear(&control).await?;
        session.fill(&control, &self.config.price_text()).await?;
        Ok(())
    }

    /// Fill a field the form may not have. Absence is only a warning.
    async fn fill_optional(
        &self,
        session: &dyn BrowserSession,
        field: &str,
        selectors: &SelectorSet,
        value: &str,
    ) -> Result<()> {
        match session
            .wait_for_control(selectors, self.profile().timeouts.optional_probe())
            .await
        {
            Ok(control) => {
                session.fill(&control, value).await?;
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                self.driver
                    .events
                    .warning(format!("No {} field on the form, skipping it", field));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fill_destination(&mut self, session: &dyn BrowserSession) -> Result<()> {
        let destination = match &self.destination {
            Some(destination) => destination.clone(),
            None => {
                let destination = self
                    .driver
                    .resolver
                    .resolve(&self.config.destination_query)
                    .await?;
                self.driver
                    .events
                    .info(format!("Destination: {}", destination.label));
                self.destination = Some(destination.clone());
                destination
            }
        };

        let profile = self.profile();
        let input = session
            .wait_for_control(&profile.destination_input, profile.timeouts.element())
            .await
            .map_err(|e| required(e, "destination"))?;
        session.clear(&input).await?;
        session.fill(&input, &self.config.destination_query).await?;
        sleep(profile.timeouts.settle_after_destination()).await;

        let groups = rendered_groups(session, &suggestion_strategies(profile)).await;
        match reconcile(&groups, &destination.label) {
            Some((control, MatchKind::Contains)) => {
                session.click(control).await?;
            }
            Some((control, MatchKind::FirstAvailable)) => {
                self.driver.events.warning(format!(
                    "No suggestion reads '{}', choosing '{}'",
                    destination.label, control.text
                ));
                session.click(control).await?;
            }
            None => self.click_static_destination(session, &destination).await?,
        }
        Ok(())
    }

    async fn click_static_destination(
        &self,
        session: &dyn BrowserSession,
        destination: &DestinationSuggestion,
    ) -> Result<()> {
        let profile = self.profile();
        match session
            .wait_for_control(&profile.destination_static, profile.timeouts.optional_probe())
            .await
        {
            Ok(control) => {
                self.driver.events.warning(format!(
                    "No suggestion list rendered for '{}', clicking the single result",
                    destination.label
                ));
                session.click(&control).await?;
                Ok(())
            }
            Err(e) if e.is_timeout() => {
                self.driver.events.warning(format!(
                    "No suggestion element found for '{}'",
                    destination.label
                ));
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&self, session: &dyn BrowserSession, batch: &Batch) -> Result<()> {
        let profile = self.profile();
        match session
            .wait_for_control(&profile.publish_button, profile.timeouts.element())
            .await
        {
            Ok(control) => session.click(&control).await?,
            Err(e) if e.is_timeout() => {
                self.driver.events.warning(format!(
                    "Batch {}: no publish button, assuming the platform publishes on its own",
                    batch.index
                ));
            }
            Err(e) => return Err(e.into()),
        }
        sleep(profile.timeouts.settle_after_publish()).await;
        Ok(())
    }
}

async fn wait_or(
    session: &dyn BrowserSession,
    selectors: &SelectorSet,
    timeout: std::time::Duration,
    wrap: fn(DriverError) -> UploadError,
) -> Result<Control> {
    session.wait_for_control(selectors, timeout).await.map_err(wrap)
}

fn required(error: DriverError, field: &'static str) -> UploadError {
    if error.is_timeout() {
        UploadError::MissingRequiredField(field)
    } else {
        error.into()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
