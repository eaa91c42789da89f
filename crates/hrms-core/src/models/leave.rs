//! Leave policies, leave requests and per-policy balances.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaveStatus::Pending => write!(f, "Pending"),
            LeaveStatus::Approved => write!(f, "Approved"),
            LeaveStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LeavePolicy {
    pub id: String,
    pub name: String,
    pub days_per_year: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /leave-policies`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LeavePolicyInput {
    pub name: String,
    pub days_per_year: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LeaveRequest {
    pub id: String,
    pub employee_id: String,
    pub leave_policy_id: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
    #[serde(default)]
    pub status: LeaveStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// Inclusive number of calendar days covered, if both dates parse.
    pub fn days(&self) -> Option<i64> {
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d").ok()?;
        Some((end - start).num_days() + 1)
    }

    pub fn is_pending(&self) -> bool {
        self.status == LeaveStatus::Pending
    }
}

/// Body for `POST /leave-requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LeaveRequestInput {
    pub leave_policy_id: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
}

impl LeaveRequestInput {
    pub fn validate(&self) -> Result<(), String> {
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .map_err(|_| format!("start date '{}' must be YYYY-MM-DD", self.start_date))?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d")
            .map_err(|_| format!("end date '{}' must be YYYY-MM-DD", self.end_date))?;
        if end < start {
            return Err("end date is before start date".to_string());
        }
        Ok(())
    }
}

/// Remaining allowance for one policy, as computed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LeaveBalance {
    pub leave_policy_id: String,
    pub leave_policy_name: String,
    pub total_days: i64,
    pub used_days: i64,
    pub remaining_days: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leave_request_days_inclusive() {
        let json = r#"{"id":"l-1","employee_id":"e-1","leave_policy_id":"p-1","start_date":"2026-03-02","end_date":"2026-03-04","reason":"trip"}"#;
        let req: LeaveRequest = serde_json::from_str(json).expect("valid leave request json");
        assert_eq!(req.days(), Some(3));
        assert!(req.is_pending());
    }

    #[test]
    fn test_leave_status_wire_format() {
        assert_eq!(serde_json::to_string(&LeaveStatus::Approved).unwrap(), "\"approved\"");
        let status: LeaveStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(status, LeaveStatus::Rejected);
    }

    #[test]
    fn test_leave_request_input_validate() {
        let mut input = LeaveRequestInput {
            leave_policy_id: "p-1".to_string(),
            start_date: "2026-03-04".to_string(),
            end_date: "2026-03-02".to_string(),
            reason: "trip".to_string(),
        };
        assert!(input.validate().is_err());

        input.end_date = "2026-03-04".to_string();
        assert!(input.validate().is_ok());

        input.start_date = "March 4".to_string();
        assert!(input.validate().is_err());
    }
}
