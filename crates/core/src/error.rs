/// Domain-level errors that a calling layer maps to its own responses.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("can't find the {entity} with id {id} in the database")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a `NotFound` for any displayable identifier.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
