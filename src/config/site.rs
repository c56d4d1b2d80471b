use crate::config::ContentType;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Alternative CSS selectors for one control, tried in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorSet(pub Vec<String>);

impl SelectorSet {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(selectors.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A selector set with a name, so fallback chains can be logged and tested
/// step by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedSelectors {
    pub name: String,
    pub selectors: SelectorSet,
}

impl NamedSelectors {
    pub fn new(name: impl Into<String>, selectors: SelectorSet) -> Self {
        Self {
            name: name.into(),
            selectors,
        }
    }
}

/// One way of querying the destination search endpoint. Extra parameters are
/// appended to the free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStrategy {
    pub name: String,
    #[serde(default)]
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTimeouts {
    pub element_ms: u64,
    pub optional_probe_ms: u64,
    pub navigation_ms: u64,
    pub login_ms: u64,
    pub file_chooser_ms: u64,
    pub settle_after_files_ms: u64,
    pub settle_after_destination_ms: u64,
    pub settle_after_publish_ms: u64,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            element_ms: 10_000,
            optional_probe_ms: 2_000,
            navigation_ms: 30_000,
            login_ms: 60_000,
            file_chooser_ms: 10_000,
            settle_after_files_ms: 5_000,
            settle_after_destination_ms: 1_500,
            settle_after_publish_ms: 5_000,
        }
    }
}

impl StepTimeouts {
    /// No waiting at all; used by tests driving a scripted browser.
    pub fn immediate() -> Self {
        Self {
            element_ms: 0,
            optional_probe_ms: 0,
            navigation_ms: 0,
            login_ms: 0,
            file_chooser_ms: 0,
            settle_after_files_ms: 0,
            settle_after_destination_ms: 0,
            settle_after_publish_ms: 0,
        }
    }

    pub fn element(&self) -> Duration {
        Duration::from_millis(self.element_ms)
    }

    pub fn optional_probe(&self) -> Duration {
        Duration::from_millis(self.optional_probe_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn login(&self) -> Duration {
        Duration::from_millis(self.login_ms)
    }

    pub fn file_chooser(&self) -> Duration {
        Duration::from_millis(self.file_chooser_ms)
    }

    pub fn settle_after_files(&self) -> Duration {
        Duration::from_millis(self.settle_after_files_ms)
    }

    pub fn settle_after_destination(&self) -> Duration {
        Duration::from_millis(self.settle_after_destination_ms)
    }

    pub fn settle_after_publish(&self) -> Duration {
        Duration::from_millis(self.settle_after_publish_ms)
    }
}

/// URLs, selectors and timings for the destination platform. None of these
/// are fixed contracts: any of them can be overridden from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub login_url: String,
    pub home_url: String,
    pub search_endpoint: String,
    pub lookup_strategies: Vec<LookupStrategy>,

    pub account_input: SelectorSet,
    pub continue_button: SelectorSet,
    pub secret_input: SelectorSet,
    pub login_submit: SelectorSet,
    pub login_confirmation: SelectorSet,

    pub publish_menu: SelectorSet,
    pub publish_entry: SelectorSet,
    pub publish_surface: SelectorSet,

    pub file_input: SelectorSet,
    pub photo_drop_target: SelectorSet,
    pub video_drop_target: SelectorSet,
    pub generic_click: SelectorSet,

    pub price_input: SelectorSet,
    pub description_input: SelectorSet,
    pub destination_input: SelectorSet,
    pub destination_suggestions: Vec<NamedSelectors>,
    pub destination_static: SelectorSet,
    pub location_input: SelectorSet,
    pub date_input: SelectorSet,
    pub publish_button: SelectorSet,

    pub timeouts: StepTimeouts,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            login_url: "https://publish.example.com/login".to_string(),
            home_url: "https://publish.example.com/".to_string(),
            search_endpoint: "https://publish.example.com/api/tags/search".to_string(),
            lookup_strategies: vec![
                LookupStrategy {
                    name: "all".to_string(),
                    params: Vec::new(),
                },
                LookupStrategy {
                    name: "tags".to_string(),
                    params: vec![("type".to_string(), "tag".to_string())],
                },
            ],

            account_input: SelectorSet::new(["input[name='email']", "input[type='email']"]),
            continue_button: SelectorSet::new(["button[data-action='continue']", "#continue"]),
            secret_input: SelectorSet::new(["input[name='password']", "input[type='password']"]),
            login_submit: SelectorSet::new(["button[type='submit']", "#login"]),
            login_confirmation: SelectorSet::new(["[data-testid='account-menu']", ".avatar"]),

            publish_menu: SelectorSet::new(["[data-testid='create-menu']", "#create"]),
            publish_entry: SelectorSet::new(["a[href*='/publish']", "[data-testid='new-post']"]),
            publish_surface: SelectorSet::new([
                "form[data-testid='publish-form']",
                ".publish-form",
            ]),

            file_input: SelectorSet::new(["input[type='file']"]),
            photo_drop_target: SelectorSet::new([
                "[data-testid='photo-dropzone']",
                ".dropzone.photos",
            ]),
            video_drop_target: SelectorSet::new([
                "[data-testid='video-dropzone']",
                ".dropzone.videos",
            ]),
            generic_click: SelectorSet::new(["main", "body"]),

            price_input: SelectorSet::new(["input[name='price']", "#price"]),
            description_input: SelectorSet::new(["textarea[name='description']", "#description"]),
            destination_input: SelectorSet::new(["input[name='tag']", "#tag-search"]),
            destination_suggestions: vec![
                NamedSelectors::new(
                    "listbox-options",
                    SelectorSet::new(["[role='listbox'] [role='option']"]),
                ),
                NamedSelectors::new(
                    "autocomplete-items",
                    SelectorSet::new([".autocomplete-item", ".suggestion"]),
                ),
            ],
            destination_static: SelectorSet::new([".tag-result:first-child"]),
            location_input: SelectorSet::new(["input[name='location']"]),
            date_input: SelectorSet::new(["input[name='date']", "input[type='date']"]),
            publish_button: SelectorSet::new(["button[data-testid='publish']", "#publish"]),

            timeouts: StepTimeouts::default(),
        }
    }
}

impl SiteProfile {
    /// Load a profile from JSON. Keys missing from the file keep their
    /// default values.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let profile = serde_json::from_str(&content)?;
        Ok(profile)
    }

    pub fn drop_target(&self, content_type: ContentType) -> &SelectorSet {
        match content_type {
            ContentType::Photo => &self.photo_drop_target,
            ContentType::Video => &self.video_drop_target,
        }
    }
}
