//! Publishes folders of photos and videos to a content platform by driving a
//! browser through its login and publish forms, once on demand or
//! continuously while watching a folder for new files.

pub mod catalog;
pub mod config;
pub mod destination;
pub mod driver;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod session;

pub use catalog::{CandidateFile, DedupStore, FileCatalog, JsonFileStore, MemoryStore};
pub use config::{AppConfig, ContentType, SiteProfile, UploadJobConfig};
pub use destination::{DestinationResolver, DestinationSuggestion, HttpDestinationSearch};
pub use driver::WebDriverBrowser;
pub use error::{DriverError, UploadError};
pub use events::{EventBus, EventKind, EventSink, StatusEvent};
pub use scheduler::{ControlResult, JobRunner, WatchScheduler, WatchStatus};
pub use session::{Batch, JobResult, SessionState, UploadSessionDriver};
