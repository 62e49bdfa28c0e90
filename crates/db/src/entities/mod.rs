//! Database entities.

#![allow(missing_docs)]

pub mod actor;
pub mod comment;
pub mod notification;
pub mod post;

pub use actor::Entity as Actor;
pub use comment::Entity as Comment;
pub use notification::Entity as Notification;
pub use post::Entity as Post;

use sea_orm::prelude::Json;

/// Read a JSONB array of strings, skipping anything that is not a string.
#[must_use]
pub fn json_string_set(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_string_set() {
        assert_eq!(json_string_set(&json!(["a", "b"])), vec!["a", "b"]);
        assert_eq!(json_string_set(&json!(["a", 1, null])), vec!["a"]);
        assert!(json_string_set(&json!({})).is_empty());
        assert!(json_string_set(&json!(null)).is_empty());
    }
}
