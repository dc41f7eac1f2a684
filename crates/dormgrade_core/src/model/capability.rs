//! Capability keys for per-actor privilege grants.
//!
//! # Responsibility
//! - Define the closed set of privileges an administrator can delegate.
//! - Map capability keys to and from their stored string form.
//!
//! # Invariants
//! - Stored keys are exact, upper-case strings; parsing never normalizes case.
//! - Unknown keys are parse errors, never silently mapped to a capability.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Privilege that can be granted to a non-admin actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// May approve or reject member tasks and see every member's tasks.
    #[serde(rename = "TASK_VERIFIER")]
    TaskVerifier,
    /// May record monthly boarding (discipline) records.
    #[serde(rename = "DISCIPLINE_OFFICER")]
    DisciplineOfficer,
}

impl Capability {
    /// All capabilities in stable order.
    pub const ALL: [Capability; 2] = [Capability::TaskVerifier, Capability::DisciplineOfficer];

    /// Stable string key used in storage and request payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskVerifier => CAPABILITY_TASK_VERIFIER,
            Self::DisciplineOfficer => CAPABILITY_DISCIPLINE_OFFICER,
        }
    }

    /// User-facing short description.
    pub fn description(self) -> &'static str {
        match self {
            Self::TaskVerifier => "Allow approving or rejecting submitted member tasks.",
            Self::DisciplineOfficer => "Allow recording monthly boarding discipline scores.",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored key for task verification privilege.
pub const CAPABILITY_TASK_VERIFIER: &str = "TASK_VERIFIER";
/// Stored key for discipline officer privilege.
pub const CAPABILITY_DISCIPLINE_OFFICER: &str = "DISCIPLINE_OFFICER";

const SUPPORTED_CAPABILITY_STRINGS: &[&str] =
    &[CAPABILITY_TASK_VERIFIER, CAPABILITY_DISCIPLINE_OFFICER];

/// Returns supported capability key strings.
pub fn supported_capability_strings() -> &'static [&'static str] {
    SUPPORTED_CAPABILITY_STRINGS
}

/// Parses one capability from its stored key.
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityParseError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(CapabilityParseError::EmptyCapability);
    }

    match normalized {
        CAPABILITY_TASK_VERIFIER => Ok(Capability::TaskVerifier),
        CAPABILITY_DISCIPLINE_OFFICER => Ok(Capability::DisciplineOfficer),
        other => Err(CapabilityParseError::UnsupportedCapability(
            other.to_string(),
        )),
    }
}

/// Capability key parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityParseError {
    EmptyCapability,
    UnsupportedCapability(String),
}

impl Display for CapabilityParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "capability key must not be empty"),
            Self::UnsupportedCapability(value) => {
                write!(
                    f,
                    "capability key is unsupported: {value} (expected one of {})",
                    supported_capability_strings().join(", ")
                )
            }
        }
    }
}

impl Error for CapabilityParseError {}

#[cfg(test)]
mod tests {
    use super::{parse_capability, supported_capability_strings, Capability, CapabilityParseError};

    #[test]
    fn parses_all_supported_capabilities() {
        for capability in Capability::ALL {
            assert_eq!(
                parse_capability(capability.as_str()).expect("supported key parse"),
                capability
            );
        }
    }

    #[test]
    fn rejects_empty_capability() {
        let err = parse_capability("  ").expect_err("empty key must fail");
        assert_eq!(err, CapabilityParseError::EmptyCapability);
    }

    #[test]
    fn rejects_lowercase_variants() {
        let err = parse_capability("task_verifier").expect_err("lowercase key must fail");
        assert_eq!(
            err,
            CapabilityParseError::UnsupportedCapability("task_verifier".to_string())
        );
    }

    #[test]
    fn unsupported_key_error_lists_supported_keys() {
        let err = parse_capability("VERIFIER").expect_err("unknown key must fail");
        assert_eq!(
            err.to_string(),
            "capability key is unsupported: VERIFIER (expected one of TASK_VERIFIER, DISCIPLINE_OFFICER)"
        );
    }

    #[test]
    fn returns_supported_capability_strings() {
        let values = supported_capability_strings();
        assert!(values.contains(&"TASK_VERIFIER"));
        assert!(values.contains(&"DISCIPLINE_OFFICER"));
        assert_eq!(values.len(), Capability::ALL.len());
    }

    #[test]
    fn exposes_user_facing_descriptions() {
        assert!(Capability::TaskVerifier.description().contains("tasks"));
        assert!(Capability::DisciplineOfficer
            .description()
            .contains("discipline"));
    }
}
