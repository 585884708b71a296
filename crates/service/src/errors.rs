use models::errors::ModelError;
use thiserror::Error;

use crate::artifacts::ArtifactError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} does not exist", entity)) }

    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

    /// Text safe to hand back to the caller; infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(m) | ServiceError::NotFound(m) | ServiceError::Conflict(m) => m.clone(),
            ServiceError::Model(ModelError::Validation(m)) => m.clone(),
            ServiceError::Db(_) | ServiceError::Internal(_) | ServiceError::Model(ModelError::Db(_)) => {
                "internal server error".to_string()
            }
        }
    }
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self { ServiceError::Db(e.to_string()) }
}

impl From<ArtifactError> for ServiceError {
    fn from(e: ArtifactError) -> Self {
        match e {
            ArtifactError::IllegalId => ServiceError::Validation(e.to_string()),
            ArtifactError::NotFound => ServiceError::NotFound(e.to_string()),
            ArtifactError::Full | ArtifactError::Io(_) => ServiceError::Internal(e.to_string()),
        }
    }
}
