//! Remote actor lookup and discovery.

use murmur_common::{AppError, AppResult, IdGenerator};
use murmur_db::{entities::actor, repositories::ActorRepository};
use sea_orm::Set;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

use crate::client::ApClient;

/// `host[:port]` of a URL, lowercased.
pub(crate) fn url_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Profile fields of a remote actor, from its document or from its URL alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoteProfile {
    pub username: String,
    pub host: String,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub avatar_url: Option<String>,
    pub inbox: Option<String>,
    pub public_key_pem: Option<String>,
    /// Whether `username` came from the actor's own document rather than
    /// being guessed from its URL.
    pub handle_confirmed: bool,
}

impl RemoteProfile {
    /// Derive a minimal profile from the actor URL: the last path segment
    /// becomes the username.
    pub fn from_url(actor_url: &Url) -> AppResult<Self> {
        let host = url_authority(actor_url)
            .ok_or_else(|| AppError::BadRequest("Invalid actor URL: no host".to_string()))?;

        let username = actor_url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .map(|s| s.trim_start_matches('@').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| host.clone());

        Ok(Self {
            username,
            host,
            name: None,
            summary: None,
            avatar_url: None,
            inbox: None,
            public_key_pem: None,
            handle_confirmed: false,
        })
    }

    /// Read a fetched actor document, falling back to URL-derived values for
    /// anything it lacks.
    pub fn from_document(document: &Value, actor_url: &Url) -> AppResult<Self> {
        let mut profile = Self::from_url(actor_url)?;
        let text = |key: &str| document.get(key).and_then(Value::as_str).map(String::from);

        if let Some(username) = text("preferredUsername").filter(|u| !u.is_empty()) {
            profile.username = username;
            profile.handle_confirmed = true;
        }
        profile.name = text("name");
        profile.summary = text("summary");
        profile.inbox = text("inbox");
        profile.avatar_url = document
            .get("icon")
            .and_then(|icon| {
                if icon.is_object() {
                    icon.get("url").and_then(Value::as_str)
                } else {
                    icon.as_str()
                }
            })
            .map(String::from);
        profile.public_key_pem = document
            .get("publicKey")
            .and_then(|key| key.get("publicKeyPem"))
            .and_then(Value::as_str)
            .map(String::from);

        Ok(profile)
    }
}

/// Finds remote actors by URI and creates them on first sight.
#[derive(Clone)]
pub struct ActorFetcher {
    actor_repo: ActorRepository,
    ap_client: Option<ApClient>,
    id_gen: IdGenerator,
}

impl ActorFetcher {
    /// Create a new actor fetcher. Without a client, unknown actors are
    /// recorded from their URL alone.
    #[must_use]
    pub const fn new(actor_repo: ActorRepository, ap_client: Option<ApClient>) -> Self {
        Self {
            actor_repo,
            ap_client,
            id_gen: IdGenerator::new(),
        }
    }

    /// Find an actor by URI, or discover and store it.
    ///
    /// A handle read from the actor's document that is already stored under
    /// another URI moves that row to `actor_url`. A handle guessed from the
    /// URL never does; that case fails with `Conflict`.
    pub async fn find_or_create(&self, actor_url: &Url) -> AppResult<actor::Model> {
        if let Some(actor) = self.actor_repo.find_by_uri(actor_url.as_str()).await? {
            debug!(actor_url = %actor_url, "Found existing actor");
            return Ok(actor);
        }

        let profile = self.discover(actor_url).await?;
        self.store(actor_url, profile).await
    }

    async fn store(&self, actor_url: &Url, profile: RemoteProfile) -> AppResult<actor::Model> {
        if let Some(existing) = self
            .actor_repo
            .find_by_username_and_host(&profile.username, Some(&profile.host))
            .await?
        {
            if !profile.handle_confirmed {
                warn!(
                    actor_url = %actor_url,
                    known_uri = %existing.uri,
                    username = %profile.username,
                    "Guessed handle belongs to another actor"
                );
                return Err(AppError::Conflict(format!(
                    "Handle {}@{} is taken by {}",
                    profile.username, profile.host, existing.uri
                )));
            }

            // The account moved: keep the row and carry its follow edges over
            info!(
                username = %profile.username,
                host = %profile.host,
                old_uri = %existing.uri,
                new_uri = %actor_url,
                "Actor moved to a new URI"
            );
            let moved = self
                .actor_repo
                .move_uri(&existing.id, actor_url.as_str())
                .await?;
            return match profile.inbox {
                Some(inbox) if moved.inbox.as_deref() != Some(inbox.as_str()) => {
                    let mut active: actor::ActiveModel = moved.into();
                    active.inbox = Set(Some(inbox));
                    self.actor_repo.update(active).await
                }
                _ => Ok(moved),
            };
        }

        let model = actor::ActiveModel {
            id: Set(self.id_gen.generate()),
            uri: Set(actor_url.to_string()),
            username_lower: Set(profile.username.to_lowercase()),
            username: Set(profile.username),
            host: Set(Some(profile.host)),
            name: Set(profile.name),
            summary: Set(profile.summary),
            avatar_url: Set(profile.avatar_url),
            inbox: Set(profile.inbox),
            followers: Set(json!([])),
            following: Set(json!([])),
            followers_count: Set(0),
            following_count: Set(0),
            public_key_pem: Set(profile.public_key_pem),
            private_key_pem: Set(None),
            ..Default::default()
        };

        match self.actor_repo.create(model).await {
            Ok(actor) => {
                info!(actor_id = %actor.id, uri = %actor.uri, "Created remote actor");
                Ok(actor)
            }
            Err(e) => {
                // Lost a race against a concurrent delivery from the same actor
                match self.actor_repo.find_by_uri(actor_url.as_str()).await? {
                    Some(actor) => Ok(actor),
                    None => Err(e),
                }
            }
        }
    }

    async fn discover(&self, actor_url: &Url) -> AppResult<RemoteProfile> {
        let Some(client) = &self.ap_client else {
            return RemoteProfile::from_url(actor_url);
        };

        match client.fetch_actor(actor_url).await {
            Ok(document) => RemoteProfile::from_document(&document, actor_url),
            Err(e) => {
                warn!(actor_url = %actor_url, error = %e, "Failed to fetch remote actor, using URL");
                RemoteProfile::from_url(actor_url)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn remote_actor(id: &str, uri: &str) -> actor::Model {
        actor::Model {
            id: id.to_string(),
            uri: uri.to_string(),
            username: "bob".to_string(),
            username_lower: "bob".to_string(),
            host: Some("remote.test".to_string()),
            name: None,
            summary: None,
            avatar_url: None,
            inbox: None,
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

    fn bob_url() -> Url {
        Url::parse("https://Remote.Test/users/bob").unwrap()
    }

    #[test]
    fn test_profile_from_url() {
        let profile = RemoteProfile::from_url(&bob_url()).unwrap();
        assert_eq!(profile.username, "bob");
        assert_eq!(profile.host, "remote.test");

        let at_style = Url::parse("https://remote.test:8443/@carol/").unwrap();
        let profile = RemoteProfile::from_url(&at_style).unwrap();
        assert_eq!(profile.username, "carol");
        assert_eq!(profile.host, "remote.test:8443");
    }

    #[test]
    fn test_profile_from_document() {
        let document = json!({
            "type": "Person",
            "id": "https://remote.test/users/bob",
            "preferredUsername": "Bobby",
            "name": "Bob",
            "inbox": "https://remote.test/users/bob/inbox",
            "icon": { "type": "Image", "url": "https://remote.test/avatar.png" },
            "publicKey": { "publicKeyPem": "-----BEGIN PUBLIC KEY-----" }
        });

        let profile = RemoteProfile::from_document(&document, &bob_url()).unwrap();
        assert_eq!(profile.username, "Bobby");
        assert_eq!(profile.name.as_deref(), Some("Bob"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://remote.test/avatar.png")
        );
        assert!(profile.public_key_pem.is_some());
    }

    #[test]
    fn test_profile_from_sparse_document_keeps_url_username() {
        let profile = RemoteProfile::from_document(&json!({}), &bob_url()).unwrap();
        assert_eq!(profile.username, "bob");
        assert!(profile.inbox.is_none());
    }

    #[tokio::test]
    async fn test_find_existing_by_uri() {
        let bob = remote_actor("r1", "https://remote.test/users/bob");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[bob]])
            .into_connection();

        let fetcher = ActorFetcher::new(ActorRepository::new(Arc::new(db)), None);
        let found = fetcher.find_or_create(&bob_url()).await.unwrap();

        assert_eq!(found.id, "r1");
    }

    #[tokio::test]
    async fn test_creates_actor_from_url_when_fetching_disabled() {
        let created = remote_actor("r2", "https://remote.test/users/bob");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<actor::Model>::new(), Vec::new()])
            .append_query_results([[created]])
            .into_connection();

        let fetcher = ActorFetcher::new(ActorRepository::new(Arc::new(db)), None);
        let actor = fetcher.find_or_create(&bob_url()).await.unwrap();

        assert_eq!(actor.id, "r2");
        assert!(!actor.is_local());
    }

    #[tokio::test]
    async fn test_insert_race_rereads_by_uri() {
        let winner = remote_actor("r3", "https://remote.test/users/bob");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<actor::Model>::new(), Vec::new()])
            .append_query_errors([DbErr::Custom("duplicate key value".to_string())])
            .append_query_results([[winner]])
            .into_connection();

        let fetcher = ActorFetcher::new(ActorRepository::new(Arc::new(db)), None);
        let actor = fetcher.find_or_create(&bob_url()).await.unwrap();

        assert_eq!(actor.id, "r3");
    }

    #[tokio::test]
    async fn test_guessed_handle_never_takes_over_another_actor() {
        let known = remote_actor("r1", "https://remote.test/users/bob");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<actor::Model>::new()])
            .append_query_results([[known]])
            .into_connection();

        let fetcher = ActorFetcher::new(ActorRepository::new(Arc::new(db)), None);
        let other = Url::parse("https://remote.test/u/bob").unwrap();

        match fetcher.find_or_create(&other).await {
            Err(AppError::Conflict(msg)) => {
                assert!(msg.contains("https://remote.test/users/bob"));
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_confirmed_handle_moves_actor_with_its_edges() {
        let known = remote_actor("r1", "https://remote.test/users/bob");
        let moved = actor::Model {
            uri: "https://remote.test/u/bob".to_string(),
            ..known.clone()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // handle lookup, then the move re-reads the row before and after
            .append_query_results([[known.clone()], [known], [moved]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();

        let fetcher = ActorFetcher::new(ActorRepository::new(Arc::new(db)), None);
        let new_url = Url::parse("https://remote.test/u/bob").unwrap();
        let profile = RemoteProfile::from_document(
            &json!({ "type": "Person", "preferredUsername": "bob" }),
            &new_url,
        )
        .unwrap();
        assert!(profile.handle_confirmed);

        let actor = fetcher.store(&new_url, profile).await.unwrap();

        assert_eq!(actor.id, "r1");
        assert_eq!(actor.uri, "https://remote.test/u/bob");
    }
}
