//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Gate every privileged mutation through the permission resolver.
//! - Keep callers (HTTP layer, CLI, scheduler) decoupled from storage details.

use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod aggregate;
pub mod boarding_service;
pub mod grade;
pub mod grading_job;
pub mod member_service;
pub mod permission;
pub mod task_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error surfaced to callers.
#[derive(Debug)]
pub enum ServiceError {
    /// Malformed input, rejected before computation.
    Validation(ValidationError),
    /// Referenced record is absent. Aborts only this operation.
    NotFound { entity: &'static str, id: Uuid },
    /// Permission denied. Carries no detail about why.
    Forbidden,
    /// Persistence-layer failure.
    Storage(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::NotFound { .. } | Self::Forbidden => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}
