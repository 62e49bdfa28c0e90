//! `ActivityPub` Note object.

use activitypub_federation::kinds::object::NoteType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{addresses_public, deserialize_one_or_many};

/// `ActivityPub` Note object.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApNote {
    #[serde(rename = "type")]
    pub kind: NoteType,
    pub id: Url,
    pub attributed_to: Url,

    /// Attachment-only notes may omit it.
    #[serde(default)]
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub to: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub cc: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<Url>,

    /// Content warning.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive: Option<bool>,

    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub attachment: Vec<ApAttachment>,
}

/// `ActivityPub` attachment (file).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ApNote {
    #[must_use]
    pub fn is_public(&self) -> bool {
        addresses_public(&self.to) || addresses_public(&self.cc)
    }

    /// A content warning marks the note sensitive even without the flag.
    #[must_use]
    pub fn is_sensitive(&self) -> bool {
        self.sensitive.unwrap_or(false) || self.content_warning().is_some()
    }

    /// Non-blank `summary`.
    #[must_use]
    pub fn content_warning(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn attachment_urls(&self) -> Vec<String> {
        self.attachment.iter().map(|a| a.url.to_string()).collect()
    }
}
