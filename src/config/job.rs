use crate::error::{Result, UploadError};
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "heif", "tif", "tiff", "bmp",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "webm", "wmv", "mpg", "mpeg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Photo,
    Video,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Photo, ContentType::Video];

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ContentType::Photo => PHOTO_EXTENSIONS,
            ContentType::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Batch sizes the platform accepts in a single selection.
    pub fn batch_size_range(self) -> RangeInclusive<usize> {
        match self {
            ContentType::Photo => 1..=100,
            ContentType::Video => 1..=20,
        }
    }

    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        Self::ALL.into_iter().find(|ct| ct.matches(path))
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Photo => write!(f, "photo"),
            ContentType::Video => write!(f, "video"),
        }
    }
}

/// Everything a single upload job needs. The secret is never serialised and
/// never shows up in `Debug` output.
#[derive(Clone, Serialize, Deserialize, Derivative)]
#[derivative(Debug)]
pub struct UploadJobConfig {
    pub account_id: String,
    #[serde(skip_serializing, default)]
    #[derivative(Debug = "ignore")]
    pub secret: String,
    pub folder_path: PathBuf,
    pub content_type: ContentType,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub destination_query: String,
    pub batch_size: usize,
    pub poll_interval_ms: u64,
    pub max_files_per_check: usize,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl UploadJobConfig {
    /// Requirements for any run, manual or watched.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(invalid("account id is required"));
        }
        if self.secret.is_empty() {
            return Err(invalid("secret is required"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(invalid(format!(
                "price must be a non-negative number, got {}",
                self.price
            )));
        }
        if self.destination_query.trim().is_empty() {
            return Err(invalid("destination is required"));
        }

        let range = self.content_type.batch_size_range();
        if !range.contains(&self.batch_size) {
            return Err(invalid(format!(
                "batch size {} is outside {}..={} for {}s",
                self.batch_size,
                range.start(),
                range.end(),
                self.content_type
            )));
        }
        Ok(())
    }

    /// Requirements for watch mode, on top of [`validate`](Self::validate).
    pub fn validate_unattended(&self) -> Result<()> {
        self.validate()?;
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll interval must be greater than zero"));
        }
        if self.max_files_per_check == 0 {
            return Err(invalid("max files per check must be greater than zero"));
        }
        if !self.folder_path.is_dir() {
            return Err(invalid(format!(
                "folder {} does not exist",
                self.folder_path.display()
            )));
        }
        Ok(())
    }

    /// Config for one watch cycle pass over `content_type`, with the batch
    /// size clamped into that type's range.
    pub fn for_content_type(&self, content_type: ContentType) -> Self {
        let range = content_type.batch_size_range();
        let mut config = self.clone();
        config.content_type = content_type;
        config.batch_size = self.batch_size.clamp(*range.start(), *range.end());
        config
    }

    /// Price as typed into the form: integral prices carry no decimals.
    pub fn price_text(&self) -> String {
        if self.price.fract() == 0.0 {
            format!("{:.0}", self.price)
        } else {
            format!("{:.2}", self.price)
        }
    }
}

fn invalid(message: impl Into<String>) -> UploadError {
    UploadError::InvalidConfig(message.into())
}
