use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Holiday {
    pub id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub name: String,
}

/// Body for `POST /holidays`; `POST /holidays/bulk` takes a list of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HolidayInput {
    pub date: String,
    pub name: String,
}

impl HolidayInput {
    pub fn new(date: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !super::is_iso_date(&self.date) {
            return Err(format!("holiday date '{}' must be YYYY-MM-DD", self.date));
        }
        if self.name.trim().is_empty() {
            return Err("holiday name is required".to_string());
        }
        Ok(())
    }

    /// True if `existing` already has a holiday on this date.
    pub fn conflicts_with(&self, existing: &[Holiday]) -> bool {
        existing.iter().any(|h| h.date == self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holiday_input_validate() {
        assert!(HolidayInput::new("2026-01-01", "New Year").validate().is_ok());
        assert!(HolidayInput::new("2026-13-01", "Bogus").validate().is_err());
        assert!(HolidayInput::new("2026-01-01", "  ").validate().is_err());
    }

    #[test]
    fn test_holiday_conflicts_with_same_date() {
        let existing = vec![Holiday {
            id: "h-1".to_string(),
            date: "2026-12-25".to_string(),
            name: "Christmas".to_string(),
        }];
        assert!(HolidayInput::new("2026-12-25", "Xmas").conflicts_with(&existing));
        assert!(!HolidayInput::new("2026-12-26", "Boxing Day").conflicts_with(&existing));
    }
}
