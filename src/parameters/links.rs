//! External documentation links and source links

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Link to another project's published documentation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExternalDocumentationLink {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_list_url: Option<String>,
}

impl ExternalDocumentationLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            package_list_url: None,
        }
    }

    pub fn with_package_list(url: impl Into<String>, package_list_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            package_list_url: Some(package_list_url.into()),
        }
    }

    /// The package list location; `<url>/package-list` unless overridden.
    pub fn effective_package_list_url(&self) -> String {
        match &self.package_list_url {
            Some(url) => url.clone(),
            None => format!("{}/package-list", self.url.trim_end_matches('/')),
        }
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        let has_scheme = |url: &str| {
            url.starts_with("https://") || url.starts_with("http://") || url.starts_with("file:")
        };
        has_scheme(&self.url) && self.package_list_url.as_deref().map_or(true, has_scheme)
    }
}

/// Maps a local source directory to its location in a remote repository browser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLink {
    pub local_directory: PathBuf,
    pub remote_url: String,
    #[serde(default = "default_line_suffix")]
    pub remote_line_suffix: Option<String>,
}

fn default_line_suffix() -> Option<String> {
    Some("#L".to_string())
}
