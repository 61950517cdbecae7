use std::collections::HashSet;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use super::domain::ActorId;

type HmacSha256 = Hmac<Sha256>;

/// Capabilities checked before a reviewer action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ReviewApplications,
}

impl Capability {
    pub const fn label(self) -> &'static str {
        match self {
            Capability::ReviewApplications => "review_applications",
        }
    }
}

/// Access-control collaborator: capability checks plus anti-forgery tokens.
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, actor: ActorId, capability: Capability) -> Result<(), AccessError>;
    fn verify_nonce(&self, actor: ActorId, action: &str, nonce: &str) -> Result<(), AccessError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("user {actor} lacks the {} capability", capability.label())]
    MissingCapability {
        actor: ActorId,
        capability: Capability,
    },
    #[error("security check failed for action '{action}'")]
    InvalidNonce { action: String },
    #[error("nonce secret rejected by HMAC")]
    KeyRejected,
}

/// Fixed reviewer list with HMAC-SHA256 nonces over `"{action}|{actor}"`.
#[derive(Debug, Clone)]
pub struct ReviewerRoster {
    reviewers: HashSet<ActorId>,
    secret: String,
}

impl ReviewerRoster {
    pub fn new(reviewers: impl IntoIterator<Item = ActorId>, secret: impl Into<String>) -> Self {
        Self {
            reviewers: reviewers.into_iter().collect(),
            secret: secret.into(),
        }
    }

    /// Nonce the client must echo back with `action`.
    pub fn nonce_for(&self, actor: ActorId, action: &str) -> Result<String, AccessError> {
        let mac = self.mac(actor, action)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn mac(&self, actor: ActorId, action: &str) -> Result<HmacSha256, AccessError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AccessError::KeyRejected)?;
        mac.update(action.as_bytes());
        mac.update(b"|");
        mac.update(actor.to_string().as_bytes());
        Ok(mac)
    }
}

impl AccessPolicy for ReviewerRoster {
    fn authorize(&self, actor: ActorId, capability: Capability) -> Result<(), AccessError> {
        match capability {
            Capability::ReviewApplications if self.reviewers.contains(&actor) => Ok(()),
            Capability::ReviewApplications => Err(AccessError::MissingCapability { actor, capability }),
        }
    }

    fn verify_nonce(&self, actor: ActorId, action: &str, nonce: &str) -> Result<(), AccessError> {
        let invalid = || AccessError::InvalidNonce {
            action: action.to_string(),
        };
        let expected = hex::decode(nonce.trim()).map_err(|_| invalid())?;
        self.mac(actor, action)?
            .verify_slice(&expected)
            .map_err(|_| {
                warn!(%actor, action, "nonce mismatch");
                invalid()
            })
    }
}
