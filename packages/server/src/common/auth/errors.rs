use thiserror::Error;

/// Authentication and authorization failures surfaced by the HTTP layer.
///
/// Messages are shown as-is in the (French) dashboard.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Non authentifié")]
    AuthenticationRequired,

    #[error("Permissions insuffisantes. Seuls les managers et admins peuvent publier.")]
    Forbidden,

    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}
