//! Domain validation errors shared by model constructors and services.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed input rejected before any computation or persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Discipline score outside `[0, 100]` or not finite.
    DisciplineScoreOutOfRange(f64),
    /// Task ratio outside `[0, 1]` or not finite.
    TaskRatioOutOfRange(f64),
    /// Period text is not a `YYYY-MM-01` first-of-month date.
    InvalidPeriod(String),
    /// Task title shorter than the minimum length.
    TitleTooShort { min_chars: usize },
    /// Proof link is not an absolute http(s) URL.
    InvalidProofLink(String),
    /// Unknown role/status/frequency/grade text.
    UnknownValue { field: &'static str, value: String },
    /// Task already left `PENDING`; verification is one-way.
    TaskAlreadyVerified { status: &'static str },
    /// Member profiles can only link to actors with member role.
    ActorNotMember,
    /// Username shorter than the minimum length.
    UsernameTooShort { min_chars: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DisciplineScoreOutOfRange(value) => {
                write!(f, "discipline score must be within 0..=100, got {value}")
            }
            Self::TaskRatioOutOfRange(value) => {
                write!(f, "task ratio must be within 0..=1, got {value}")
            }
            Self::InvalidPeriod(value) => {
                write!(f, "period must use format YYYY-MM-01, got `{value}`")
            }
            Self::TitleTooShort { min_chars } => {
                write!(f, "task title must have at least {min_chars} characters")
            }
            Self::InvalidProofLink(value) => write!(f, "proof link is not a valid url: `{value}`"),
            Self::UnknownValue { field, value } => write!(f, "unknown {field} value `{value}`"),
            Self::TaskAlreadyVerified { status } => {
                write!(f, "task already verified with status {status}")
            }
            Self::ActorNotMember => write!(f, "member profile requires an actor with MEMBER role"),
            Self::UsernameTooShort { min_chars } => {
                write!(f, "username must have at least {min_chars} characters")
            }
        }
    }
}

impl Error for ValidationError {}
