//! Fixtures shared by the service tests.

use chrono::Utc;
use murmur_db::entities::{
    actor,
    post::{self, Visibility},
};
use sea_orm::MockExecResult;
use serde_json::json;

pub fn create_test_actor(id: &str, username: &str) -> actor::Model {
    let uri = format!("https://local.test/users/{id}");
    actor::Model {
        id: id.to_string(),
        inbox: Some(format!("{uri}/inbox")),
        uri,
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        host: None,
        name: None,
        summary: None,
        avatar_url: None,
        followers: json!([]),
        following: json!([]),
        followers_count: 0,
        following_count: 0,
        public_key_pem: None,
        private_key_pem: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub fn create_test_post(id: &str, author_id: &str) -> post::Model {
    post::Model {
        id: id.to_string(),
        uri: format!("https://local.test/posts/{id}"),
        author_id: author_id.to_string(),
        content: "hello world".to_string(),
        visibility: Visibility::Public,
        sensitive: false,
        content_warning: None,
        attachments: json!([]),
        liked_by: json!([]),
        shared_by: json!([]),
        like_count: 0,
        share_count: 0,
        replies_count: 0,
        is_local: true,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

pub const fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}
