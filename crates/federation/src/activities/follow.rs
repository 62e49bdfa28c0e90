//! Follow activity.

use activitypub_federation::kinds::activity::FollowType;
use serde::{Deserialize, Serialize};
use url::Url;

/// `ActivityPub` Follow activity.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowActivity {
    #[serde(rename = "type")]
    pub kind: FollowType,
    pub id: Url,
    /// Follower.
    pub actor: Url,
    /// Followee.
    pub object: Url,
}
