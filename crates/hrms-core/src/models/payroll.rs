//! Payroll structures, payslips and the print formats used to render them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PayrollStructure {
    pub id: String,
    pub name: String,
    pub basic_salary: f64,
    #[serde(default)]
    pub allowances: f64,
    #[serde(default)]
    pub deductions: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PayrollStructure {
    /// Monthly net pay before any server-side adjustments.
    pub fn net_pay(&self) -> f64 {
        self.basic_salary + self.allowances - self.deductions
    }
}

/// Body for `POST /payroll-structures`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PayrollStructureInput {
    pub name: String,
    pub basic_salary: f64,
    pub allowances: f64,
    pub deductions: f64,
}

/// Body for `POST /payroll`: links an employee to a structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PayrollAssignment {
    pub employee_id: String,
    pub payroll_structure_id: String,
}

/// An employee's current payroll assignment, as returned by `GET /payroll/{employee_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EmployeePayroll {
    pub id: String,
    pub employee_id: String,
    pub payroll_structure_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Missing when the structure was deleted after assignment
    #[serde(default)]
    pub structure: Option<PayrollStructure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Payslip {
    pub id: String,
    pub employee_id: String,
    /// `YYYY-MM`
    pub month: String,
    pub basic_salary: f64,
    pub allowances: f64,
    pub deductions: f64,
    pub net_pay: f64,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl Payslip {
    /// Suggested file name for the downloaded PDF
    pub fn file_name(&self) -> String {
        format!("payslip-{}.pdf", self.month)
    }
}

/// Body for `POST /payslips/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PayslipRequest {
    pub employee_id: String,
    pub month: String,
}

impl PayslipRequest {
    pub fn validate(&self) -> Result<(), String> {
        let valid = self.month.len() == 7
            && NaiveDate::parse_from_str(&format!("{}-01", self.month), "%Y-%m-%d").is_ok();
        if valid {
            Ok(())
        } else {
            Err(format!("payslip month '{}' must be YYYY-MM", self.month))
        }
    }
}

/// HTML template used by the server when rendering payslips.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PrintFormat {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub template_html: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /print-formats` and `PUT /print-formats/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PrintFormatInput {
    pub name: String,
    pub template_html: String,
    pub is_default: bool,
}

impl PrintFormatInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("print format name is required".to_string());
        }
        if self.template_html.trim().is_empty() {
            return Err("print format template cannot be empty".to_string());
        }
        Ok(())
    }
}

impl From<&PrintFormat> for PrintFormatInput {
    fn from(format: &PrintFormat) -> Self {
        Self {
            name: format.name.clone(),
            template_html: format.template_html.clone(),
            is_default: format.is_default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payroll_structure_net_pay() {
        let json = r#"{"id":"s-1","name":"Junior","basic_salary":3000.0,"allowances":250.5,"deductions":100.0}"#;
        let structure: PayrollStructure = serde_json::from_str(json).expect("valid structure json");
        assert!((structure.net_pay() - 3150.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_payslip_request_month_format() {
        let ok = PayslipRequest {
            employee_id: "e-1".to_string(),
            month: "2026-02".to_string(),
        };
        assert!(ok.validate().is_ok());

        for bad in ["2026-2", "2026-13", "Feb 2026", "2026-02-01"] {
            let req = PayslipRequest {
                employee_id: "e-1".to_string(),
                month: bad.to_string(),
            };
            assert!(req.validate().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_payslip_file_name() {
        let json = r#"{"id":"p-1","employee_id":"e-1","month":"2026-02","basic_salary":1.0,"allowances":0.0,"deductions":0.0,"net_pay":1.0}"#;
        let payslip: Payslip = serde_json::from_str(json).expect("valid payslip json");
        assert_eq!(payslip.file_name(), "payslip-2026-02.pdf");
    }

    #[test]
    fn test_employee_payroll_with_structure() {
        let json = r#"{"id":"a-1","employee_id":"e-1","payroll_structure_id":"s-1","created_at":"2026-01-05T09:00:00Z","structure":{"id":"s-1","name":"Junior","basic_salary":3000.0}}"#;
        let payroll: EmployeePayroll = serde_json::from_str(json).expect("valid payroll json");
        let structure = payroll.structure.expect("structure included");
        assert_eq!(structure.name, "Junior");
        assert!((structure.net_pay() - 3000.0).abs() < f64::EPSILON);

        let bare = r#"{"id":"a-1","employee_id":"e-1","payroll_structure_id":"s-gone"}"#;
        let payroll: EmployeePayroll = serde_json::from_str(bare).expect("valid payroll json");
        assert!(payroll.structure.is_none());
    }

    #[test]
    fn test_print_format_input_validation() {
        let format = PrintFormat {
            id: "f-1".to_string(),
            name: "Standard".to_string(),
            template_html: "<h1>{{ employee_name }}</h1>".to_string(),
            is_default: true,
            created_at: None,
        };
        let input = PrintFormatInput::from(&format);
        assert!(input.validate().is_ok());
        assert!(input.is_default);

        let unnamed = PrintFormatInput {
            name: "  ".to_string(),
            ..input.clone()
        };
        assert!(unnamed.validate().is_err());

        let empty = PrintFormatInput {
            template_html: String::new(),
            ..input
        };
        assert!(empty.validate().is_err());
    }
}
