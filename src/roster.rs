//! Professional roster and resource coupling - read-only scheduler inputs
//!
//! The roster is a point-in-time snapshot passed into availability checks.
//! Squad assignment walks it in declaration order, so the file order of
//! professionals is load-bearing for reproducibility.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Professional role — drives squad staffing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Capture,
    Editing,
    Social,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => write!(f, "capture"),
            Self::Editing => write!(f, "editing"),
            Self::Social => write!(f, "social"),
        }
    }
}

/// A member of the production team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Professional {
    pub id: String,
    pub role: Role,
    pub name: Option<String>,
}

fn default_coupling() -> HashMap<String, String> {
    let mut coupled = HashMap::new();
    // A capture kit reservation also consumes the shared audio peripheral
    coupled.insert("capture-kit".to_string(), "external-audio-kit".to_string());
    coupled
}

/// Roster of professionals plus resource coupling rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub professionals: Vec<Professional>,
    /// Reserving the key resource also consumes the value resource
    #[serde(default = "default_coupling")]
    pub coupled_resources: HashMap<String, String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            professionals: Vec::new(),
            coupled_resources: default_coupling(),
        }
    }
}

impl Roster {
    pub fn new(professionals: Vec<Professional>) -> Self {
        Self {
            professionals,
            coupled_resources: default_coupling(),
        }
    }

    /// Load roster from YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let roster: Roster = serde_yaml::from_str(&content)?;
        Ok(roster)
    }

    /// Professionals of a role, in stable roster order
    pub fn with_role(&self, role: Role) -> impl Iterator<Item = &Professional> {
        self.professionals.iter().filter(move |p| p.role == role)
    }

    /// The peripheral resource consumed alongside `resource_id`, if any
    pub fn coupled_resource(&self, resource_id: &str) -> Option<&str> {
        self.coupled_resources.get(resource_id).map(|s| s.as_str())
    }

    /// Every resource a reservation of `resource_id` consumes, itself included
    pub fn consumed_resources<'a>(&'a self, resource_id: &'a str) -> Vec<&'a str> {
        let mut consumed = vec![resource_id];
        if let Some(coupled) = self.coupled_resource(resource_id) {
            consumed.push(coupled);
        }
        consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_role_preserves_order() {
        let roster = Roster::new(vec![
            Professional {
                id: "p1".into(),
                role: Role::Editing,
                name: None,
            },
            Professional {
                id: "p2".into(),
                role: Role::Capture,
                name: None,
            },
            Professional {
                id: "p3".into(),
                role: Role::Editing,
                name: None,
            },
        ]);

        let editors: Vec<&str> = roster.with_role(Role::Editing).map(|p| p.id.as_str()).collect();
        assert_eq!(editors, vec!["p1", "p3"]);
    }

    #[test]
    fn test_default_coupling() {
        let roster = Roster::default();
        assert_eq!(
            roster.coupled_resource("capture-kit"),
            Some("external-audio-kit")
        );
        assert_eq!(roster.coupled_resource("studio-a"), None);
        assert_eq!(
            roster.consumed_resources("capture-kit"),
            vec!["capture-kit", "external-audio-kit"]
        );
    }

    #[test]
    fn test_yaml_parse() {
        let yaml = r#"
professionals:
  - id: p1
    role: capture
    name: Ana
  - id: p2
    role: editing
"#;
        let roster: Roster = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(roster.professionals.len(), 2);
        assert_eq!(roster.professionals[0].role, Role::Capture);
        // Coupling falls back to the built-in pair when omitted
        assert!(roster.coupled_resource("capture-kit").is_some());
    }
}
