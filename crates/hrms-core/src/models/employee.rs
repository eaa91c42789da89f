//! Organization structure: departments and employee records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /departments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DepartmentInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Employee {
    pub id: String,
    /// Human-facing code such as `EMP1A2B3C4D`
    pub employee_id: String,
    pub name: String,
    pub email: String,
    // Older records carry the department name, newer ones a reference
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    pub joining_date: String,
    #[serde(default)]
    pub reporting_manager_id: Option<String>,
    #[serde(default)]
    pub invited: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Employee {
    /// True once the employee has registered an account.
    pub fn has_account(&self) -> bool {
        self.user_id.is_some()
    }

    /// Department label for listings, resolving ids against `departments`.
    pub fn department_name<'a>(&'a self, departments: &'a [Department]) -> &'a str {
        if let Some(ref id) = self.department_id {
            if let Some(dept) = departments.iter().find(|d| &d.id == id) {
                return &dept.name;
            }
        }
        self.department.as_deref().unwrap_or("-")
    }
}

/// Body for `POST /employees` and `PUT /employees/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EmployeeInput {
    pub name: String,
    pub email: String,
    pub department_id: String,
    pub joining_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_manager_id: Option<String>,
}

impl EmployeeInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("employee name is required".to_string());
        }
        if !self.email.contains('@') {
            return Err(format!("'{}' is not an email address", self.email));
        }
        if !super::is_iso_date(&self.joining_date) {
            return Err(format!("joining date '{}' must be YYYY-MM-DD", self.joining_date));
        }
        Ok(())
    }
}
