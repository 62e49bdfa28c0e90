//! `ActivityPub` object types.

#![allow(missing_docs)]

mod note;

pub use note::{ApAttachment, ApNote};

use serde::{Deserialize, Deserializer};

/// The public addressing collection.
pub const PUBLIC_COLLECTION: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Whether an addressing list contains the public collection in any of its
/// accepted spellings.
#[must_use]
pub fn addresses_public(addressees: &[String]) -> bool {
    addressees
        .iter()
        .any(|a| a == PUBLIC_COLLECTION || a == "as:Public" || a == "Public")
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept either a single value or an array.
pub fn deserialize_one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
