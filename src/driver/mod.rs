//! Browser automation capability consumed by the upload session.
//!
//! The session only talks to these traits; [`webdriver`] provides a backend
//! speaking the W3C WebDriver protocol.

pub mod webdriver;

use crate::config::SelectorSet;
use crate::error::DriverResult;
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub use webdriver::WebDriverBrowser;

/// A located page element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub id: String,
    /// The selector that matched.
    pub selector: String,
    /// Visible text, possibly empty.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    DomContentLoaded,
    Load,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1366, 900),
            user_agent: None,
        }
    }
}

/// An opened file selection surface.
#[async_trait]
pub trait FileSelection: Send + Sync {
    async fn supply_files(&self, paths: &[PathBuf]) -> DriverResult<()>;
}

/// Resolves once the page opens a file selection surface, or fails with a
/// timeout. Must be obtained before the click that opens the surface.
pub type PendingFileSelection =
    Pin<Box<dyn Future<Output = DriverResult<Box<dyn FileSelection>>> + Send>>;

#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_session(&self, options: &SessionOptions) -> DriverResult<Arc<dyn BrowserSession>>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str, wait: WaitCondition, timeout: Duration) -> DriverResult<()>;

    /// The first control matched by any selector in `selectors`, waiting up
    /// to `timeout` for one to appear.
    async fn wait_for_control(&self, selectors: &SelectorSet, timeout: Duration) -> DriverResult<Control>;

    async fn fill(&self, control: &Control, value: &str) -> DriverResult<()>;

    async fn clear(&self, control: &Control) -> DriverResult<()>;

    async fn click(&self, control: &Control) -> DriverResult<()>;

    async fn arm_file_selection(&self, timeout: Duration) -> DriverResult<PendingFileSelection>;

    /// Every control currently matched by `selectors`, in document order per
    /// selector. Never waits.
    async fn locate_all(&self, selectors: &SelectorSet) -> DriverResult<Vec<Control>>;
}
