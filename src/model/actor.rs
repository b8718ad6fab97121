//! The user on whose behalf a category operation runs.

use super::DepartmentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Write privilege level of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May modify and delete any category.
    Administrator,
    /// May modify categories in its own department or in the Global scope.
    Editor,
    /// Read-only.
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Administrator => write!(f, "administrator"),
            Role::Editor => write!(f, "editor"),
            Role::Reader => write!(f, "reader"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Administrator),
            "editor" => Ok(Role::Editor),
            "reader" | "viewer" => Ok(Role::Reader),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub department: Option<DepartmentId>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role, department: Option<DepartmentId>) -> Self {
        Self {
            id: id.into(),
            role,
            department,
        }
    }

    pub fn administrator(id: impl Into<String>) -> Self {
        Self::new(id, Role::Administrator, None)
    }

    pub fn editor(id: impl Into<String>, department: &str) -> Self {
        Self::new(id, Role::Editor, DepartmentId::parse(department))
    }

    pub fn reader(id: impl Into<String>) -> Self {
        Self::new(id, Role::Reader, None)
    }

    pub fn is_administrator(&self) -> bool {
        self.role == Role::Administrator
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.department {
            Some(department) => write!(f, "{} ({}, {})", self.id, self.role, department),
            None => write!(f, "{} ({})", self.id, self.role),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Administrator);
        assert_eq!("Editor".parse::<Role>().unwrap(), Role::Editor);
        assert_eq!("reader".parse::<Role>().unwrap(), Role::Reader);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_actor_display() {
        assert_eq!(Actor::editor("ana", "RH").to_string(), "ana (editor, RH)");
        assert_eq!(Actor::administrator("root").to_string(), "root (administrator)");
    }
}
