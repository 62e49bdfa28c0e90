//! Like activity.

use activitypub_federation::kinds::activity::LikeType;
use serde::{Deserialize, Serialize};
use url::Url;

/// `ActivityPub` Like activity. `object` is the liked post.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeActivity {
    #[serde(rename = "type")]
    pub kind: LikeType,
    pub id: Url,
    pub actor: Url,
    pub object: Url,
}
