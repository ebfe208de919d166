//! Upload metadata and results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

/// Visibility of the uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    Public,
    Unlisted,
    #[default]
    Private,
}

/// Listing metadata sent alongside the video artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UploadMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Platform category identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub privacy: Privacy,
    /// Scheduled publish time; implies private until then
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<DateTime<Utc>>,
}

impl UploadMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Final outcome of the upload stage, produced once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    /// Remote video identifier on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Error kind on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// Whether a later attempt could succeed
    pub retriable: bool,
    /// Account that served the final attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountId>,
    /// Total upload attempts made
    pub attempts: u32,
    pub completed_at: DateTime<Utc>,
}

impl UploadResult {
    pub fn succeeded(remote_id: impl Into<String>, account: AccountId, attempts: u32) -> Self {
        Self {
            success: true,
            remote_id: Some(remote_id.into()),
            error_kind: None,
            retriable: false,
            account: Some(account),
            attempts,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(error_kind: impl Into<String>, retriable: bool, attempts: u32) -> Self {
        Self {
            success: false,
            remote_id: None,
            error_kind: Some(error_kind.into()),
            retriable,
            account: None,
            attempts,
            completed_at: Utc::now(),
        }
    }
}
