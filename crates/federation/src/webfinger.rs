//! `WebFinger` resolution of `acct:` resources to local actors.

use murmur_core::ActorService;
use murmur_db::entities::actor;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reasons a `WebFinger` lookup yields no document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebfingerError {
    #[error("Invalid resource format: {0}")]
    InvalidFormat(String),

    #[error("Resource is not on this server: {0}")]
    NotLocal(String),

    #[error("Actor not found: {0}")]
    NotFound(String),

    #[error("Lookup failed: {0}")]
    Internal(String),
}

/// `WebFinger` JRD document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebfingerResponse {
    pub subject: String,
    pub aliases: Vec<String>,
    pub links: Vec<WebfingerLink>,
}

/// `WebFinger` link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebfingerLink {
    pub rel: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// A parsed resource.
#[derive(Debug, PartialEq, Eq)]
enum Resource<'a> {
    /// `acct:user@domain`
    Account { username: &'a str, domain: &'a str },
    /// The actor's own URI.
    Uri(&'a str),
}

fn parse_resource(resource: &str) -> Result<Resource<'_>, WebfingerError> {
    let invalid = || WebfingerError::InvalidFormat(resource.to_string());
    let resource = resource.trim();

    if resource.starts_with("https://") || resource.starts_with("http://") {
        return Ok(Resource::Uri(resource));
    }

    let account = resource.strip_prefix("acct:").unwrap_or(resource);
    let account = account.strip_prefix('@').unwrap_or(account);

    let (username, domain) = account.split_once('@').ok_or_else(invalid)?;
    if username.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    Ok(Resource::Account { username, domain })
}

/// Resolves `WebFinger` resources against the Actor Directory.
#[derive(Clone)]
pub struct WebfingerResolver {
    actor_service: ActorService,
    server_url: String,
}

impl WebfingerResolver {
    /// Create a new resolver. Profile links are built under `server_url`.
    #[must_use]
    pub fn new(actor_service: ActorService, server_url: &str) -> Self {
        Self {
            actor_service,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve `acct:user@domain` (or a local actor URI) to a JRD document.
    pub async fn resolve_resource(
        &self,
        resource: &str,
    ) -> Result<WebfingerResponse, WebfingerError> {
        let actor = match parse_resource(resource)? {
            Resource::Account { username, domain } => {
                if !domain.eq_ignore_ascii_case(self.actor_service.local_domain()) {
                    return Err(WebfingerError::NotLocal(domain.to_string()));
                }
                self.actor_service
                    .find_by_handle(username, None)
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Database error during WebFinger lookup");
                        WebfingerError::Internal(e.to_string())
                    })?
            }
            Resource::Uri(uri) => match self.actor_service.resolve_actor(uri).await {
                Ok(actor) => Some(actor),
                Err(e) if e.is_not_found() => None,
                Err(e) => {
                    warn!(error = %e, "Database error during WebFinger lookup");
                    return Err(WebfingerError::Internal(e.to_string()));
                }
            },
        };

        let Some(actor) = actor.filter(actor::Model::is_local) else {
            debug!(resource = %resource, "No local actor for WebFinger resource");
            return Err(WebfingerError::NotFound(resource.to_string()));
        };

        Ok(self.document(&actor))
    }

    fn document(&self, actor: &actor::Model) -> WebfingerResponse {
        let profile_url = format!("{}/@{}", self.server_url, actor.username);

        WebfingerResponse {
            subject: format!(
                "acct:{}@{}",
                actor.username,
                self.actor_service.local_domain()
            ),
            aliases: vec![actor.uri.clone(), profile_url.clone()],
            links: vec![
                WebfingerLink {
                    rel: "self".to_string(),
                    link_type: Some("application/activity+json".to_string()),
                    href: Some(actor.uri.clone()),
                },
                WebfingerLink {
                    rel: "http://webfinger.net/rel/profile-page".to_string(),
                    link_type: Some("text/html".to_string()),
                    href: Some(profile_url),
                },
            ],
        }
    }
}
