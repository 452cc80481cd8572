//! The one error kind shared by every collaborator trait in this crate.

/// Any failure raised by a collaborator (publisher, validator client, world state, or peer
/// network). Logged by the core and rethrown to the main loop, per §7's `CollaboratorError`
/// propagation policy — the core itself never inspects the cause, it only logs and propagates.
#[derive(Debug, thiserror::Error)]
#[error("collaborator error: {source}")]
pub struct CollaboratorError {
    /// The underlying, collaborator-defined failure.
    #[source]
    pub source: anyhow::Error,
}

impl CollaboratorError {
    /// Wrap any error as a [`CollaboratorError`].
    pub fn new(source: impl Into<anyhow::Error>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
