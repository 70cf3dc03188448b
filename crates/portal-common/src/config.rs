//! Editor and upload configuration.
//!
//! `EditorConfig` is what a host container hands to the editor (camelCase on
//! the wire). `UploadConfig` is loaded from TOML by binaries that talk to the
//! image storage service.

use std::path::Path;
use std::time::Duration;
use std::{env, fmt, fs};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};

/// Content classification sent alongside every uploaded image.
///
/// Decides the storage bucket on the image service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageDomainType {
    Question,
    Answer,
    Notice,
    Event,
    Banner,
    Faq,
    Registration,
    #[default]
    Common,
}

impl ImageDomainType {
    pub const ALL: [ImageDomainType; 8] = [
        Self::Question,
        Self::Answer,
        Self::Notice,
        Self::Event,
        Self::Banner,
        Self::Faq,
        Self::Registration,
        Self::Common,
    ];

    /// Wire name used in upload requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "QUESTION",
            Self::Answer => "ANSWER",
            Self::Notice => "NOTICE",
            Self::Event => "EVENT",
            Self::Banner => "BANNER",
            Self::Faq => "FAQ",
            Self::Registration => "REGISTRATION",
            Self::Common => "COMMON",
        }
    }

    /// Parse a wire or lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ImageDomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audience partition of the image service.
///
/// Each partition answers an upload with the public URL under its own field
/// name; see [`ImageServerType::url_fields`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImageServerType {
    Admin,
    #[default]
    User,
}

impl ImageServerType {
    /// Response fields that may carry the uploaded image URL, preferred first.
    ///
    /// Both partitions have been observed answering with either field, so
    /// every known field is listed for every partition.
    pub fn url_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Admin => &["url", "imgSrc"],
            Self::User => &["imgSrc", "url"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::Admin, Self::User]
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ImageServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn yes() -> bool {
    true
}

/// Fixed configuration supplied by the host container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default = "yes")]
    pub show_formatting: bool,
    #[serde(default = "yes")]
    pub show_font_size: bool,
    #[serde(default = "yes")]
    pub show_text_color: bool,
    #[serde(default = "yes")]
    pub show_image_upload: bool,
    #[serde(default)]
    pub image_domain_type: ImageDomainType,
    #[serde(default)]
    pub image_server_type: ImageServerType,
    #[serde(default)]
    pub placeholder: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            show_formatting: true,
            show_font_size: true,
            show_text_color: true,
            show_image_upload: true,
            image_domain_type: ImageDomainType::default(),
            image_server_type: ImageServerType::default(),
            placeholder: String::new(),
        }
    }
}

/// Errors loading an [`UploadConfig`].
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    #[diagnostic(code(portal::config::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config file {path}: {source}")]
    #[diagnostic(
        code(portal::config::parse),
        help("check the TOML syntax and field names of the [upload] table")
    )]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_size_threshold() -> u64 {
    2 * 1024 * 1024
}

fn default_max_edge() -> u32 {
    1920
}

fn default_quality() -> u8 {
    80
}

fn default_settle_window_ms() -> u64 {
    200
}

/// Settings for the image storage collaborator and the ingestion pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload endpoint of the image storage service.
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Files larger than this are downsampled before upload.
    #[serde(default = "default_size_threshold")]
    pub size_threshold_bytes: u64,
    #[serde(default = "default_max_edge")]
    pub max_edge_px: u32,
    /// JPEG quality (1-100) for downsampled images.
    #[serde(default = "default_quality")]
    pub jpeg_quality: u8,
    /// Notification settle window for color changes.
    #[serde(default = "default_settle_window_ms")]
    pub settle_window_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/images".into(),
            timeout_secs: default_timeout_secs(),
            size_threshold_bytes: default_size_threshold(),
            max_edge_px: default_max_edge(),
            jpeg_quality: default_quality(),
            settle_window_ms: default_settle_window_ms(),
        }
    }
}

#[derive(Deserialize)]
struct UploadFile {
    upload: UploadConfig,
}

impl UploadConfig {
    /// How long an editor holds back notifications after a color change.
    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    /// Load the `[upload]` table from a TOML file.
    ///
    /// `$NAME` references are replaced with the value of the environment
    /// variable `NAME` before parsing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&substitute_env(&raw, env::vars()), &path.display().to_string())
    }

    fn from_toml_str(s: &str, path: &str) -> Result<Self, ConfigError> {
        let file: UploadFile = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        tracing::debug!(endpoint = %file.upload.endpoint, "loaded upload config");
        Ok(file.upload)
    }
}

fn substitute_env(raw: &str, vars: impl Iterator<Item = (String, String)>) -> String {
    // Longest names first so `$HOST_NAME` is not clobbered by `$HOST`.
    let mut vars: Vec<_> = vars.collect();
    vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    let mut out = raw.to_string();
    for (k, v) in vars {
        out = out.replace(&format!("${}", k), &v);
    }
    out
}
