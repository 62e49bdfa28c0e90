//! Undo activity.

use activitypub_federation::kinds::activity::UndoType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{FollowActivity, LikeActivity};

/// What an Undo refers to: an embedded activity or a bare id.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UndoObject {
    Like(LikeActivity),
    Follow(FollowActivity),
    Reference(Url),
    Other(Value),
}

/// `ActivityPub` Undo activity.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoActivity {
    #[serde(rename = "type")]
    pub kind: UndoType,
    pub id: Url,
    pub actor: Url,
    pub object: UndoObject,
}

impl UndoActivity {
    /// Actor of the embedded activity, if any.
    #[must_use]
    pub const fn inner_actor(&self) -> Option<&Url> {
        match &self.object {
            UndoObject::Like(like) => Some(&like.actor),
            UndoObject::Follow(follow) => Some(&follow.actor),
            UndoObject::Reference(_) | UndoObject::Other(_) => None,
        }
    }
}
