use thiserror::Error;

use crate::common::{PostId, SocialAccountId};
use crate::domains::posts::{Platform, PostType};

/// Why a post could not be turned into a webhook request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Type de post non supporté pour {platform}: {post_type}")]
    UnsupportedPostType {
        platform: Platform,
        post_type: PostType,
    },

    #[error("Aucun jeton d'accès configuré pour le compte {platform}")]
    MissingCredential { platform: Platform },
}

/// Publication failures, surfaced verbatim to the dashboard.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Post non trouvé: {0}")]
    PostNotFound(String),

    #[error("Aucun compte social associé à ce post")]
    NoAccountLinked,

    #[error("Compte social non trouvé: {0}")]
    AccountNotFound(SocialAccountId),

    #[error("Ce post est déjà en cours de publication")]
    AlreadyPublishing,

    #[error("Ce post est déjà en cours de publication ou son statut a changé.")]
    ConcurrentPublishConflict,

    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// The automation answered with an error, or could not be reached.
    #[error("{0}")]
    Delivery(String),

    /// Only produced under [`TimeoutPolicy::TreatAsFailure`](super::TimeoutPolicy).
    #[error("{0}")]
    DeliveryTimeout(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl PublishError {
    pub fn post_not_found(id: PostId) -> Self {
        PublishError::PostNotFound(id.to_string())
    }

    /// Rejected before the post was claimed; no state was written.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PublishError::PostNotFound(_)
                | PublishError::NoAccountLinked
                | PublishError::AccountNotFound(_)
                | PublishError::AlreadyPublishing
                | PublishError::ConcurrentPublishConflict
        )
    }
}
