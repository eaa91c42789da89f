use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. Admins manage the organization, employees see their own data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            other => Err(format!("unknown role '{}', expected admin or employee", other)),
        }
    }
}

/// The user attached to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Name and email for status lines, e.g. "Jane Doe <jane@acme.test>"
    pub fn display_name(&self) -> String {
        if self.full_name.trim().is_empty() {
            self.email.clone()
        } else {
            format!("{} <{}>", self.full_name, self.email)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_parses_server_payload() {
        let json = r#"{"id":"u-1","email":"jane@acme.test","full_name":"Jane Doe","role":"admin","created_at":"2025-01-15T09:30:00Z"}"#;
        let user: User = serde_json::from_str(json).expect("valid user json");
        assert_eq!(user.role, Role::Admin);
        assert!(user.is_admin());
        assert!(user.created_at.is_some());
        assert_eq!(user.display_name(), "Jane Doe <jane@acme.test>");
    }

    #[test]
    fn test_user_without_created_at() {
        let json = r#"{"id":"u-2","email":"bob@acme.test","full_name":"","role":"employee"}"#;
        let user: User = serde_json::from_str(json).expect("valid user json");
        assert_eq!(user.role, Role::Employee);
        assert!(user.created_at.is_none());
        assert_eq!(user.display_name(), "bob@acme.test");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Employee ".parse::<Role>(), Ok(Role::Employee));
        assert!("manager".parse::<Role>().is_err());
    }
}
