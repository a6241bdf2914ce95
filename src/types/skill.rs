//! Skill records: `(name, kind)` pairs attached to projects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKind {
    Tool,
    Practice,
}

impl SkillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Practice => "practice",
        }
    }
}

impl std::str::FromStr for SkillKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tool" => Ok(Self::Tool),
            "practice" => Ok(Self::Practice),
            _ => Err(format!("unknown skill kind: {}", s)),
        }
    }
}

/// Unique skill, identified by `(name, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub kind: SkillKind,
}

impl Skill {
    pub fn tool(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SkillKind::Tool,
        }
    }

    pub fn practice(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SkillKind::Practice,
        }
    }
}

/// Deduplicated, deterministically ordered extraction result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSet {
    pub tools: BTreeSet<String>,
    pub practices: BTreeSet<String>,
}

impl SkillSet {
    pub fn merge(&mut self, other: SkillSet) {
        self.tools.extend(other.tools);
        self.practices.extend(other.practices);
    }

    pub fn len(&self) -> usize {
        self.tools.len() + self.practices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.practices.is_empty()
    }

    /// Flatten into `(name, kind)` skill rows for persistence.
    pub fn to_skills(&self) -> Vec<Skill> {
        self.tools
            .iter()
            .map(|t| Skill::tool(t.clone()))
            .chain(self.practices.iter().map(|p| Skill::practice(p.clone())))
            .collect()
    }
}
