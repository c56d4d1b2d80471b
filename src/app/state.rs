use auto_publisher::{ContentType, JobResult, StatusEvent, UploadJobConfig, WatchStatus};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

const MAX_EVENTS: usize = 500;

#[derive(Clone, Default)]
pub enum ActionProgress {
    #[default]
    NotStarted,
    Uploading {
        total_files: usize,
        total_batches: usize,
    },
    Completed(JobResult),
}

/// Values typed into the job form.
pub struct JobForm {
    pub account_id: String,
    pub secret: String,
    pub folder_path: Option<String>,
    pub content_type: ContentType,
    pub price: String,
    pub description: String,
    pub destination_query: String,
    pub batch_size: usize,
    pub poll_interval_secs: u64,
    pub max_files_per_check: usize,
}

impl Default for JobForm {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            secret: String::new(),
            folder_path: None,
            content_type: ContentType::Photo,
            price: String::new(),
            description: String::new(),
            destination_query: String::new(),
            batch_size: 20,
            poll_interval_secs: 300,
            max_files_per_check: 100,
        }
    }
}

impl JobForm {
    pub fn to_config(&self) -> Result<UploadJobConfig, String> {
        let folder_path = self
            .folder_path
            .as_ref()
            .map(PathBuf::from)
            .ok_or("No folder selected")?;
        let price = self
            .price
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Price '{}' is not a number", self.price.trim()))?;
        let description = Some(self.description.trim().to_string()).filter(|d| !d.is_empty());

        Ok(UploadJobConfig {
            account_id: self.account_id.trim().to_string(),
            secret: self.secret.clone(),
            folder_path,
            content_type: self.content_type,
            price,
            description,
            destination_query: self.destination_query.trim().to_string(),
            batch_size: self.batch_size,
            poll_interval_ms: self.poll_interval_secs * 1000,
            max_files_per_check: self.max_files_per_check,
            location: None,
            date: None,
            exclude_patterns: Vec::new(),
        })
    }
}

#[derive(Default)]
pub struct HostState {
    pub progress: ActionProgress,
    pub events: Vec<StatusEvent>,
    pub error_message: Option<String>,
    pub show_details: bool,
    pub watch_status: Option<WatchStatus>,
    pub cancel: Option<CancellationToken>,
    pub event_receiver: Option<Receiver<StatusEvent>>,
    pub result_receiver: Option<Receiver<JobResult>>,
}

impl HostState {
    pub fn is_uploading(&self) -> bool {
        matches!(self.progress, ActionProgress::Uploading { .. })
    }

    pub fn is_watching(&self) -> bool {
        self.watch_status.as_ref().map_or(false, |s| s.running)
    }

    pub fn push_event(&mut self, event: StatusEvent) {
        self.events.push(event);
        if self.events.len() > MAX_EVENTS {
            let overflow = self.events.len() - MAX_EVENTS;
            self.events.drain(..overflow);
        }
    }

    pub fn get_status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading {
                total_files,
                total_batches,
            } => format!(
                "Uploading {} files in {} batches",
                total_files, total_batches
            ),
            ActionProgress::Completed(result) if result.success => format!(
                "✅ Published {} files in {} batches",
                result.total_files, result.batches_completed
            ),
            ActionProgress::Completed(result) if result.cancelled => format!(
                "⏹ Cancelled after {} batches ({} files published)",
                result.batches_completed, result.total_files
            ),
            ActionProgress::Completed(result) => format!(
                "❌ Failed after {} batches: {}",
                result.batches_completed,
                result.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }

    pub fn get_watch_text(&self) -> Option<String> {
        let status = self.watch_status.as_ref().filter(|s| s.running)?;
        let folder = status
            .folder
            .as_ref()
            .map(|f| f.display().to_string())
            .unwrap_or_default();
        let last_check = status
            .last_check
            .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "pending".to_string());
        Some(format!(
            "👁 Watching {} | checks: {} | last: {} | uploaded: {}",
            folder, status.cycles, last_check, status.uploaded_count
        ))
    }
}
