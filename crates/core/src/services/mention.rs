//! Mention extraction and resolution.

use std::collections::HashSet;

use murmur_db::entities::actor;
use regex::Regex;

use crate::services::actor::ActorService;

// Valid static pattern that cannot fail
#[allow(clippy::unwrap_used)]
static MENTION_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"@([a-zA-Z0-9_]+)(?:@([a-zA-Z0-9][a-zA-Z0-9.-]*[a-zA-Z0-9]))?").unwrap()
});

/// A mention token found in free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    /// Handle without the leading `@`.
    pub username: String,
    /// Domain for `@user@domain` mentions.
    pub host: Option<String>,
    /// The token as written, e.g. `@alice@example.com`.
    pub acct: String,
}

/// Extract `@handle` and `@handle@domain` tokens from text.
///
/// Tokens are deduplicated case-sensitively, keeping first-occurrence order.
/// An `@` preceded by a word character (as in `bob@example.com`) does not
/// start a mention.
#[must_use]
pub fn extract_mentions(text: &str) -> Vec<Mention> {
    let mut seen = HashSet::new();
    let mut mentions = Vec::new();

    for cap in MENTION_RE.captures_iter(text) {
        let (Some(whole), Some(username)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        let preceded_by_word = text[..whole.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '@');
        if preceded_by_word {
            continue;
        }

        let acct = whole.as_str().to_string();
        if !seen.insert(acct.clone()) {
            continue;
        }

        mentions.push(Mention {
            username: username.as_str().to_string(),
            host: cap.get(2).map(|h| h.as_str().to_string()),
            acct,
        });
    }

    mentions
}

/// Resolves mention tokens to actors through the actor directory.
#[derive(Clone)]
pub struct MentionResolver {
    actor_service: ActorService,
}

impl MentionResolver {
    /// Create a new mention resolver.
    #[must_use]
    pub const fn new(actor_service: ActorService) -> Self {
        Self { actor_service }
    }

    /// Resolve every mention in `text`. Unresolvable tokens are dropped.
    pub async fn resolve(&self, text: &str) -> Vec<actor::Model> {
        let mut seen_ids = HashSet::new();
        let mut actors = Vec::new();

        for mention in extract_mentions(text) {
            let identifier = mention.acct.trim_start_matches('@');

            match self.actor_service.resolve_actor(identifier).await {
                Ok(actor) => {
                    if seen_ids.insert(actor.id.clone()) {
                        actors.push(actor);
                    }
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!(mention = %mention.acct, "Mention did not resolve");
                }
                Err(e) => {
                    tracing::warn!(mention = %mention.acct, error = %e, "Mention lookup failed");
                }
            }
        }

        actors
    }
}
