//! Subcommands and their handlers.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;

use hrms_core::models::{
    HolidayInput, LeaveRequestInput, LeaveStatus, PayslipRequest, Role,
};
use hrms_core::{ApiClient, Config};

use crate::format::{format_amount, format_date, render_table};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and save the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and log in with it
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "employee")]
        role: Role,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Summary of the most used lists, fetched in parallel
    Dashboard,
    Departments,
    Employees,
    LeavePolicies,
    LeaveRequests,
    /// Remaining leave per policy (employees only)
    LeaveBalance,
    /// Submit a leave request
    RequestLeave {
        #[arg(long)]
        policy: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        reason: String,
    },
    ApproveLeave {
        id: String,
    },
    RejectLeave {
        id: String,
    },
    Holidays,
    /// Add a company holiday
    AddHoliday {
        #[arg(long)]
        date: String,
        #[arg(long)]
        name: String,
    },
    PayrollStructures,
    /// List payslips (defaults to your own employee record)
    Payslips {
        #[arg(long)]
        employee: Option<String>,
    },
    GeneratePayslip {
        #[arg(long)]
        employee: String,
        /// Month as YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// Save a payslip PDF
    DownloadPayslip {
        id: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require_login(client: &ApiClient) -> Result<()> {
    if !client.session().is_authenticated() {
        bail!("Not logged in. Run `hrms login` first.");
    }
    Ok(())
}

pub async fn run(client: &ApiClient, config: &mut Config, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt("Email: ")?,
            };
            let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
            let user = client.login(&email, &password).await?;
            config.last_email = Some(email);
            config.save().context("Failed to save config")?;
            println!("Logged in as {} ({})", user.display_name(), user.role);
        }
        Command::Register { email, name, role } => {
            let password = rpassword::prompt_password("Choose a password: ").context("Failed to read password")?;
            let user = client.register(&email, &password, &name, role).await?;
            config.last_email = Some(email);
            config.save().context("Failed to save config")?;
            println!("Registered and logged in as {}", user.display_name());
        }
        Command::Logout => {
            client.logout()?;
            println!("Logged out");
        }
        Command::Whoami => {
            require_login(client)?;
            let user = client.me().await?;
            if json {
                return print_json(&user);
            }
            println!("{} ({})", user.display_name(), user.role);
        }
        Command::Dashboard => {
            require_login(client)?;
            dashboard(client, json).await?;
        }
        Command::Departments => {
            require_login(client)?;
            let departments = client.fetch_departments().await?;
            if json {
                return print_json(&departments);
            }
            let rows = departments
                .iter()
                .map(|d| vec![d.id.clone(), d.name.clone(), d.description.clone().unwrap_or_default()])
                .collect::<Vec<_>>();
            println!("{}", render_table(&["ID", "Name", "Description"], &rows));
        }
        Command::Employees => {
            require_login(client)?;
            let (employees, departments) = tokio::join!(client.fetch_employees(), client.fetch_departments());
            let employees = employees?;
            if json {
                return print_json(&employees);
            }
            // Department names are cosmetic; fall back to raw values
            let departments = departments.unwrap_or_default();
            let rows = employees
                .iter()
                .map(|e| {
                    vec![
                        e.employee_id.clone(),
                        e.name.clone(),
                        e.email.clone(),
                        e.department_name(&departments).to_string(),
                        format_date(&e.joining_date),
                        if e.has_account() { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", render_table(&["Code", "Name", "Email", "Department", "Joined", "Account"], &rows));
        }
        Command::LeavePolicies => {
            require_login(client)?;
            let policies = client.fetch_leave_policies().await?;
            if json {
                return print_json(&policies);
            }
            let rows = policies
                .iter()
                .map(|p| vec![p.id.clone(), p.name.clone(), p.days_per_year.to_string()])
                .collect::<Vec<_>>();
            println!("{}", render_table(&["ID", "Policy", "Days/year"], &rows));
        }
        Command::LeaveRequests => {
            require_login(client)?;
            let requests = client.fetch_leave_requests().await?;
            if json {
                return print_json(&requests);
            }
            let rows = requests
                .iter()
                .map(|r| {
                    vec![
                        r.id.clone(),
                        r.employee_id.clone(),
                        format_date(&r.start_date),
                        format_date(&r.end_date),
                        r.days().map(|d| d.to_string()).unwrap_or_default(),
                        r.status.to_string(),
                        r.reason.clone(),
                    ]
                })
                .collect::<Vec<_>>();
            println!(
                "{}",
                render_table(&["ID", "Employee", "From", "To", "Days", "Status", "Reason"], &rows)
            );
        }
        Command::LeaveBalance => {
            require_login(client)?;
            let balances = client.fetch_leave_balance().await?;
            if json {
                return print_json(&balances);
            }
            let rows = balances
                .iter()
                .map(|b| {
                    vec![
                        b.leave_policy_name.clone(),
                        b.total_days.to_string(),
                        b.used_days.to_string(),
                        b.remaining_days.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", render_table(&["Policy", "Total", "Used", "Remaining"], &rows));
        }
        Command::RequestLeave { policy, from, to, reason } => {
            require_login(client)?;
            let request = LeaveRequestInput {
                leave_policy_id: policy,
                start_date: from,
                end_date: to,
                reason,
            };
            let created = client.create_leave_request(&request).await?;
            println!("Leave request {} submitted ({})", created.id, created.status);
        }
        Command::ApproveLeave { id } => {
            require_login(client)?;
            let updated = client.set_leave_status(&id, LeaveStatus::Approved).await?;
            println!("Leave request {} {}", updated.id, updated.status);
        }
        Command::RejectLeave { id } => {
            require_login(client)?;
            let updated = client.set_leave_status(&id, LeaveStatus::Rejected).await?;
            println!("Leave request {} {}", updated.id, updated.status);
        }
        Command::Holidays => {
            require_login(client)?;
            let mut holidays = client.fetch_holidays().await?;
            holidays.sort_by(|a, b| a.date.cmp(&b.date));
            if json {
                return print_json(&holidays);
            }
            let rows = holidays
                .iter()
                .map(|h| vec![format_date(&h.date), h.name.clone()])
                .collect::<Vec<_>>();
            println!("{}", render_table(&["Date", "Holiday"], &rows));
        }
        Command::AddHoliday { date, name } => {
            require_login(client)?;
            let input = HolidayInput::new(date, name);
            let existing = client.fetch_holidays().await?;
            if input.conflicts_with(&existing) {
                bail!("A holiday on {} already exists", input.date);
            }
            let created = client.create_holiday(&input).await?;
            println!("Added {} on {}", created.name, format_date(&created.date));
        }
        Command::PayrollStructures => {
            require_login(client)?;
            let structures = client.fetch_payroll_structures().await?;
            if json {
                return print_json(&structures);
            }
            let rows = structures
                .iter()
                .map(|s| {
                    vec![
                        s.name.clone(),
                        format_amount(s.basic_salary),
                        format_amount(s.allowances),
                        format_amount(s.deductions),
                        format_amount(s.net_pay()),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", render_table(&["Structure", "Basic", "Allowances", "Deductions", "Net"], &rows));
        }
        Command::Payslips { employee } => {
            require_login(client)?;
            let employee_id = match employee {
                Some(id) => id,
                None => client
                    .fetch_my_employee()
                    .await?
                    .map(|e| e.id)
                    .context("No employee record is linked to this account; pass --employee")?,
            };
            let payslips = client.fetch_payslips(&employee_id).await?;
            if json {
                return print_json(&payslips);
            }
            let rows = payslips
                .iter()
                .map(|p| {
                    vec![
                        p.id.clone(),
                        p.month.clone(),
                        format_amount(p.basic_salary),
                        format_amount(p.allowances),
                        format_amount(p.deductions),
                        format_amount(p.net_pay),
                    ]
                })
                .collect::<Vec<_>>();
            println!("{}", render_table(&["ID", "Month", "Basic", "Allowances", "Deductions", "Net"], &rows));
        }
        Command::GeneratePayslip { employee, month } => {
            require_login(client)?;
            let payslip = client
                .generate_payslip(&PayslipRequest { employee_id: employee, month })
                .await?;
            println!("Generated payslip {} for {}: net {}", payslip.id, payslip.month, format_amount(payslip.net_pay));
        }
        Command::DownloadPayslip { id, output } => {
            require_login(client)?;
            let bytes = client.download_payslip(&id).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(format!("payslip-{}.pdf", id)));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} ({} bytes)", path.display(), bytes.len());
        }
    }
    Ok(())
}

/// Fire the dashboard's lists at once. With an expired token this is the
/// burst case: one refresh, every call replayed.
async fn dashboard(client: &ApiClient, json: bool) -> Result<()> {
    let is_admin = client.session().user().map(|u| u.is_admin()).unwrap_or(false);

    if is_admin {
        let (employees, departments, requests, holidays) = tokio::join!(
            client.fetch_employees(),
            client.fetch_departments(),
            client.fetch_leave_requests(),
            client.fetch_holidays(),
        );
        let (employees, departments, requests, holidays) = (employees?, departments?, requests?, holidays?);
        let pending = requests.iter().filter(|r| r.is_pending()).count();
        if json {
            return print_json(&serde_json::json!({
                "employees": employees.len(),
                "departments": departments.len(),
                "pending_leave_requests": pending,
                "holidays": holidays.len(),
            }));
        }
        println!("Employees:              {}", employees.len());
        println!("Departments:            {}", departments.len());
        println!("Pending leave requests: {}", pending);
        println!("Holidays:               {}", holidays.len());
    } else {
        let (balances, requests, holidays) = tokio::join!(
            client.fetch_leave_balance(),
            client.fetch_leave_requests(),
            client.fetch_holidays(),
        );
        let (balances, requests, holidays) = (balances?, requests?, holidays?);
        let remaining: i64 = balances.iter().map(|b| b.remaining_days).sum();
        let pending = requests.iter().filter(|r| r.is_pending()).count();
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        let next_holiday = holidays
            .iter()
            .filter(|h| h.date >= today)
            .min_by(|a, b| a.date.cmp(&b.date));
        if json {
            return print_json(&serde_json::json!({
                "remaining_leave_days": remaining,
                "pending_leave_requests": pending,
                "next_holiday": next_holiday,
            }));
        }
        println!("Remaining leave days:   {}", remaining);
        println!("Pending leave requests: {}", pending);
        match next_holiday {
            Some(h) => println!("Next holiday:           {} ({})", h.name, format_date(&h.date)),
            None => println!("Next holiday:           none scheduled"),
        }
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("No input given");
    }
    Ok(value)
}
