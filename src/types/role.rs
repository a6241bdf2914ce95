//! Role taxonomy for the user's contribution posture on a project.
//!
//! The string forms below are the wire contract; storage and the API layer
//! use them verbatim.

use serde::{Deserialize, Serialize};

/// Classified role of the current user on a project.
///
/// Ordered by seniority, most senior first. Boundary contribution values
/// resolve to the more senior role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Solo Developer")]
    SoloDeveloper,
    #[serde(rename = "Lead Developer")]
    LeadDeveloper,
    #[serde(rename = "Co-Lead")]
    CoLead,
    #[serde(rename = "Contributor")]
    Contributor,
    #[serde(rename = "Minor Contributor")]
    MinorContributor,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoloDeveloper => "Solo Developer",
            Self::LeadDeveloper => "Lead Developer",
            Self::CoLead => "Co-Lead",
            Self::Contributor => "Contributor",
            Self::MinorContributor => "Minor Contributor",
            Self::Unknown => "Unknown",
        }
    }

    /// Seniority rank, lower = more senior. Used by the monotonicity
    /// guarantee: more commits never demote.
    pub fn seniority(&self) -> u8 {
        match self {
            Self::SoloDeveloper => 0,
            Self::LeadDeveloper => 1,
            Self::CoLead => 2,
            Self::Contributor => 3,
            Self::MinorContributor => 4,
            Self::Unknown => 5,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Solo Developer" => Ok(Self::SoloDeveloper),
            "Lead Developer" => Ok(Self::LeadDeveloper),
            "Co-Lead" => Ok(Self::CoLead),
            "Contributor" => Ok(Self::Contributor),
            "Minor Contributor" => Ok(Self::MinorContributor),
            "Unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}
