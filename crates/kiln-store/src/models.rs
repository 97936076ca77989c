use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// A named stage of the generation pipeline.
///
/// Declaration order is pipeline order: the four text roles run first,
/// `Layout` runs last and produces the filesystem structure payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Visionary,
    Strategist,
    Designer,
    Builder,
    Layout,
}

impl Role {
    /// Every role, in pipeline order.
    pub const ALL: [Role; 5] = [
        Self::Visionary,
        Self::Strategist,
        Self::Designer,
        Self::Builder,
        Self::Layout,
    ];

    /// The text-producing roles whose output becomes a stage document.
    pub const TEXT_ROLES: [Role; 4] = [
        Self::Visionary,
        Self::Strategist,
        Self::Designer,
        Self::Builder,
    ];

    /// Name of the context slot this role owns.
    pub fn slot(self) -> &'static str {
        match self {
            Self::Visionary => "vision",
            Self::Strategist => "tech_strategy",
            Self::Designer => "design",
            Self::Builder => "implementation",
            Self::Layout => "layout",
        }
    }

    /// Human-readable title used in transcripts and documents.
    pub fn title(self) -> &'static str {
        match self {
            Self::Visionary => "Visionary",
            Self::Strategist => "Technology Strategist",
            Self::Designer => "Chief Designer",
            Self::Builder => "Builder",
            Self::Layout => "Layout Planner",
        }
    }

    /// Key under which a template override is persisted.
    pub fn store_key(self) -> String {
        format!("{self}_template")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Visionary => "visionary",
            Self::Strategist => "strategist",
            Self::Designer => "designer",
            Self::Builder => "builder",
            Self::Layout => "layout",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    /// Accepts the canonical names plus the executive-style aliases
    /// (`ceo`, `cto`, `architect`, `developer`, `filesystem`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visionary" | "ceo" => Ok(Self::Visionary),
            "strategist" | "cto" => Ok(Self::Strategist),
            "designer" | "architect" => Ok(Self::Designer),
            "builder" | "developer" => Ok(Self::Builder),
            "layout" | "filesystem" => Ok(Self::Layout),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Role`] string.
#[derive(Debug, Clone)]
pub struct RoleParseError(pub String);

impl fmt::Display for RoleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role: {:?}", self.0)
    }
}

impl std::error::Error for RoleParseError {}

// ---------------------------------------------------------------------------
// Parameter levels
// ---------------------------------------------------------------------------

/// Error returned when parsing an invalid parameter level.
#[derive(Debug, Clone)]
pub struct LevelParseError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for LevelParseError {}

/// How far a role should push beyond conventional answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    #[default]
    Moderate,
    High,
    Maximum,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Maximum => "maximum",
        };
        f.write_str(s)
    }
}

impl FromStr for Intensity {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "maximum" => Ok(Self::Maximum),
            other => Err(LevelParseError {
                kind: "intensity",
                value: other.to_owned(),
            }),
        }
    }
}

/// How aggressively a role should discard assumed constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Elimination {
    Cautious,
    #[default]
    Moderate,
    Aggressive,
}

impl fmt::Display for Elimination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cautious => "cautious",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        };
        f.write_str(s)
    }
}

impl FromStr for Elimination {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cautious" => Ok(Self::Cautious),
            "moderate" => Ok(Self::Moderate),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(LevelParseError {
                kind: "elimination level",
                value: other.to_owned(),
            }),
        }
    }
}

/// How much detail a role's answer should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl DetailLevel {
    /// One-line instruction appended to prompts for this level.
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Low => "Keep the answer brief and focus on the essentials.",
            Self::Medium => "Give a balanced answer with key details.",
            Self::High => "Be thorough: cover specifics, examples, and edge cases.",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for DetailLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(LevelParseError {
                kind: "detail level",
                value: other.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Tunable knobs a role's prompt is rendered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RoleParameters {
    /// Ordered list of topics the role should emphasize.
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default)]
    pub elimination: Elimination,
    #[serde(default)]
    pub detail_level: DetailLevel,
    /// Free-text points the role should keep in mind.
    #[serde(default)]
    pub considerations: Vec<String>,
}

/// A persisted template override for one role.
///
/// `parameters` is optional: a record without parameters renders with the
/// role's built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<RoleParameters>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_roundtrip() {
        for role in Role::ALL {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn role_accepts_aliases() {
        assert_eq!("ceo".parse::<Role>().unwrap(), Role::Visionary);
        assert_eq!("CTO".parse::<Role>().unwrap(), Role::Strategist);
        assert_eq!("architect".parse::<Role>().unwrap(), Role::Designer);
        assert_eq!(" developer ".parse::<Role>().unwrap(), Role::Builder);
        assert_eq!("filesystem".parse::<Role>().unwrap(), Role::Layout);
    }

    #[test]
    fn role_rejects_unknown() {
        let err = "janitor".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("janitor"));
    }

    #[test]
    fn role_order_is_pipeline_order() {
        let mut sorted = Role::ALL;
        sorted.sort();
        assert_eq!(sorted, Role::ALL);
        assert_eq!(Role::ALL[..4], Role::TEXT_ROLES);
    }

    #[test]
    fn slots_are_distinct() {
        let mut slots: Vec<_> = Role::ALL.iter().map(|r| r.slot()).collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), Role::ALL.len());
    }

    #[test]
    fn store_key_format() {
        assert_eq!(Role::Strategist.store_key(), "strategist_template");
    }

    #[test]
    fn levels_parse_and_display() {
        for s in ["moderate", "high", "maximum"] {
            assert_eq!(s.parse::<Intensity>().unwrap().to_string(), s);
        }
        for s in ["cautious", "moderate", "aggressive"] {
            assert_eq!(s.parse::<Elimination>().unwrap().to_string(), s);
        }
        for s in ["low", "medium", "high"] {
            assert_eq!(s.parse::<DetailLevel>().unwrap().to_string(), s);
        }
        let err = "extreme".parse::<Intensity>().unwrap_err();
        assert_eq!(err.to_string(), "invalid intensity: \"extreme\"");
    }

    #[test]
    fn record_without_parameters_deserializes() {
        let rec: TemplateRecord = serde_json::from_str(r#"{"template": "Task: {task}"}"#).unwrap();
        assert_eq!(rec.template, "Task: {task}");
        assert!(rec.parameters.is_none());
    }

    #[test]
    fn partial_parameters_fill_defaults() {
        let rec: TemplateRecord = serde_json::from_str(
            r#"{"template": "t", "parameters": {"focus_areas": ["a"], "intensity": "maximum"}}"#,
        )
        .unwrap();
        let params = rec.parameters.unwrap();
        assert_eq!(params.focus_areas, vec!["a"]);
        assert_eq!(params.intensity, Intensity::Maximum);
        assert_eq!(params.elimination, Elimination::Moderate);
        assert_eq!(params.detail_level, DetailLevel::Medium);
        assert!(params.considerations.is_empty());
    }

    #[test]
    fn record_serializes_without_null_parameters() {
        let rec = TemplateRecord {
            template: "x".into(),
            parameters: None,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"template":"x"}"#);
    }
}
