//! Data models for the HRMS REST API.
//!
//! This module contains the request and response shapes exchanged with
//! the server:
//!
//! - `User`, `Role`: The authenticated account
//! - `Department`, `Employee`: Organization structure
//! - Leave types: `LeavePolicy`, `LeaveRequest`, `LeaveBalance`
//! - `Holiday`: Company holiday calendar
//! - Payroll types: `PayrollStructure`, `EmployeePayroll`, `Payslip`, `PrintFormat`

pub mod employee;
pub mod holiday;
pub mod leave;
pub mod payroll;
pub mod user;

pub use employee::{Department, DepartmentInput, Employee, EmployeeInput};
pub use holiday::{Holiday, HolidayInput};
pub use leave::{LeaveBalance, LeavePolicy, LeavePolicyInput, LeaveRequest, LeaveRequestInput, LeaveStatus};
pub use payroll::{
    EmployeePayroll, PayrollAssignment, PayrollStructure, PayrollStructureInput, Payslip, PayslipRequest, PrintFormat,
    PrintFormatInput,
};
pub use user::{Role, User};

/// Returns true if `value` is a calendar date in `YYYY-MM-DD` form.
pub(crate) fn is_iso_date(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() && value.len() == 10
}
