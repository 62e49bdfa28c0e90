//! ID generation utilities.

use ulid::Ulid;

/// ID generator for entities.
///
/// IDs are lower-case ULIDs: lexicographically sortable by creation time,
/// which the repositories rely on for `until_id` pagination.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}
