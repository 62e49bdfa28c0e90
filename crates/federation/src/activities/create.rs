//! Create activity.

use activitypub_federation::kinds::activity::CreateType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::objects::{ApNote, deserialize_one_or_many};

/// `ActivityPub` Create activity wrapping a Note.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    #[serde(rename = "type")]
    pub kind: CreateType,
    pub id: Url,
    pub actor: Url,
    pub object: ApNote,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub to: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub cc: Vec<String>,
}

impl CreateActivity {
    /// Whether the activity or its note is addressed to the public collection.
    #[must_use]
    pub fn is_public(&self) -> bool {
        crate::objects::addresses_public(&self.to)
            || crate::objects::addresses_public(&self.cc)
            || self.object.is_public()
    }
}
