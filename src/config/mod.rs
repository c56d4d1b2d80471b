mod job;
mod site;

pub use job::{ContentType, UploadJobConfig};
pub use site::{LookupStrategy, NamedSelectors, SelectorSet, SiteProfile, StepTimeouts};

use crate::error::Result;
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Process-level settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub site_profile: SiteProfile,
    pub state_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let webdriver_url = env::var("AUTO_PUBLISHER_WEBDRIVER_URL")
            .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string());

        let headless = env::var("AUTO_PUBLISHER_HEADLESS")
            .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        let site_profile = match env::var("AUTO_PUBLISHER_SITE_PROFILE") {
            Ok(path) => {
                tracing::info!(path = %path, "Loading site profile");
                SiteProfile::from_file(Path::new(&path))?
            }
            Err(_) => SiteProfile::default(),
        };

        let state_dir = env::var("AUTO_PUBLISHER_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir());

        Ok(Self {
            webdriver_url,
            headless,
            site_profile,
            state_dir,
        })
    }
}

fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("auto-publisher")
}
