//! API client for communicating with the HRMS REST API.
//!
//! This module provides the `ApiClient` struct, which decorates every call
//! with the session's bearer token and recovers from expired access tokens
//! by refreshing once and replaying the call.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::{RefreshCoordinator, SessionEvent, SessionStore, Ticket};
use crate::models::{
    Department, DepartmentInput, Employee, EmployeeInput, EmployeePayroll, Holiday, HolidayInput,
    LeaveBalance, LeavePolicy, LeavePolicyInput, LeaveRequest, LeaveRequestInput, LeaveStatus,
    PayrollAssignment, PayrollStructure, PayrollStructureInput, Payslip, PayslipRequest, PrintFormat,
    PrintFormatInput, Role, User,
};

use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
use super::{ApiError, RefreshError};

/// Capacity of the session event channel. Subscribers that lag further
/// than this only lose old events.
const SESSION_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    // Older servers do not issue refresh tokens
    #[serde(default)]
    refresh_token: Option<String>,
    user: User,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    full_name: &'a str,
    role: Role,
}

/// API client for the HRMS backend.
/// Clone is cheap - clones share the transport, session store and refresh state.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
    refresher: Arc<RefreshCoordinator>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a client talking HTTP to `api_url` (e.g. `http://localhost:8000/api`).
    pub fn new(api_url: &str, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(api_url)?;
        Ok(Self::with_transport(Arc::new(transport), session))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            transport,
            session,
            refresher: Arc::new(RefreshCoordinator::new()),
            events,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Receive login, logout and expiry notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ===== Request Pipeline =====

    /// Send `request` with the current bearer token.
    ///
    /// A 401 from a protected endpoint is answered by refreshing the access
    /// token (or waiting for the refresh already in flight) and replaying the
    /// request once. Every other outcome is returned as is.
    ///
    /// Checking for a token that changed while the request was on the wire
    /// and joining the refresh are separate steps. On a multi-threaded
    /// runtime a refresh may settle between them, in which case this request
    /// starts one more exchange instead of reusing the new token.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_token = self.session.access_token();
        let response = self
            .transport
            .send(&request.clone().with_bearer(sent_token.clone()))
            .await?;

        if response.status != StatusCode::UNAUTHORIZED {
            return Self::check_response(&request, response);
        }
        if request.is_auth_endpoint() {
            return Err(ApiError::from_auth_status(response.status, &response.text()));
        }

        debug!(path = %request.path, "Access token rejected, refreshing");
        let token = match self.session.access_token() {
            // A refresh settled while this request was on the wire
            Some(current) if sent_token.as_ref() != Some(&current) => current,
            _ => self.fresh_token().await?,
        };

        let replay = self.transport.send(&request.clone().with_bearer(Some(token))).await?;
        if replay.status == StatusCode::UNAUTHORIZED {
            warn!(path = %request.path, "Request still unauthorized after token refresh");
            return Err(ApiError::Unauthorized);
        }
        Self::check_response(&request, replay)
    }

    fn check_response(request: &ApiRequest, response: ApiResponse) -> Result<ApiResponse, ApiError> {
        if response.status.is_success() {
            Ok(response)
        } else if request.is_auth_endpoint() {
            Err(ApiError::from_auth_status(response.status, &response.text()))
        } else {
            Err(ApiError::from_status(response.status, &response.text()))
        }
    }

    /// Lead a refresh or queue behind the one in flight.
    async fn fresh_token(&self) -> Result<String, ApiError> {
        match self.refresher.acquire() {
            Ticket::Wait(waiter) => waiter.wait().await.map_err(ApiError::SessionExpired),
            Ticket::Lead(lead) => {
                let outcome = self.exchange_refresh_token().await;
                let resolved = lead.settle(&outcome);
                match outcome {
                    Ok(token) => {
                        info!(resumed = resolved, "Access token refreshed");
                        Ok(token)
                    }
                    Err(e) => {
                        warn!(error = %e, rejected = resolved, "Token refresh failed");
                        // The lead request reports its own 401
                        Err(ApiError::Unauthorized)
                    }
                }
            }
        }
    }

    /// Force a refresh of the access token, sharing any exchange already running.
    pub async fn refresh_session(&self) -> Result<String, ApiError> {
        match self.refresher.acquire() {
            Ticket::Wait(waiter) => waiter.wait().await.map_err(ApiError::SessionExpired),
            Ticket::Lead(lead) => {
                let outcome = self.exchange_refresh_token().await;
                lead.settle(&outcome);
                outcome.map_err(ApiError::SessionExpired)
            }
        }
    }

    /// One exchange against `/auth/refresh`. Any failure ends the session.
    async fn exchange_refresh_token(&self) -> Result<String, RefreshError> {
        let result = self.request_new_tokens().await;
        if result.is_err() {
            self.expire_session();
        }
        result
    }

    async fn request_new_tokens(&self) -> Result<String, RefreshError> {
        let refresh_token = self.session.refresh_token().ok_or(RefreshError::NoRefreshToken)?;
        let request = ApiRequest::post(REFRESH_PATH, serde_json::json!({ "refresh_token": refresh_token }));

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| RefreshError::Failed(e.to_string()))?;

        if !response.status.is_success() {
            let detail = ApiError::detail_message(&response.text());
            return Err(if response.status.is_client_error() {
                RefreshError::Rejected(detail)
            } else {
                RefreshError::Failed(format!("Status {}: {}", response.status, detail))
            });
        }

        let tokens: RefreshResponse = response
            .json()
            .map_err(|e| RefreshError::Failed(e.to_string()))?;
        let rotated = tokens.refresh_token.is_some();
        match self.session.update_tokens(tokens.access_token.clone(), tokens.refresh_token) {
            Ok(true) => debug!(rotated, "Stored refreshed tokens"),
            Ok(false) => debug!("Session ended during refresh, new tokens not stored"),
            // Memory already holds the new tokens
            Err(e) => warn!(error = %format!("{:#}", e), "Failed to persist refreshed tokens"),
        }
        Ok(tokens.access_token)
    }

    fn expire_session(&self) {
        match self.session.clear() {
            Ok(true) => {
                info!("Session expired");
                self.notify(SessionEvent::Expired);
            }
            Ok(false) => {}
            Err(e) => {
                // The in-memory session is already gone
                warn!(error = %e, "Failed to remove expired session file");
                self.notify(SessionEvent::Expired);
            }
        }
    }

    // ===== Session Lifecycle =====

    /// Log in and start a session
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = serde_json::to_value(LoginRequest { email, password })?;
        let response = self.execute(ApiRequest::post(LOGIN_PATH, body)).await?;
        self.start_session(response.json()?)
    }

    /// Create an account and start a session for it
    pub async fn register(&self, email: &str, password: &str, full_name: &str, role: Role) -> Result<User, ApiError> {
        let body = serde_json::to_value(RegisterRequest {
            email,
            password,
            full_name,
            role,
        })?;
        let response = self.execute(ApiRequest::post(REGISTER_PATH, body)).await?;
        self.start_session(response.json()?)
    }

    fn start_session(&self, auth: AuthResponse) -> Result<User, ApiError> {
        if auth.refresh_token.is_none() {
            debug!("Server issued no refresh token; session ends when the access token expires");
        }
        if let Err(e) = self.session.set(auth.user.clone(), auth.access_token, auth.refresh_token) {
            warn!(error = %format!("{:#}", e), "Failed to save session, it lasts only for this run");
        }
        info!(user = %auth.user.email, role = %auth.user.role, "Logged in");
        self.notify(SessionEvent::LoggedIn);
        Ok(auth.user)
    }

    /// End the session locally. Logging out twice is harmless.
    pub fn logout(&self) -> Result<(), ApiError> {
        match self.session.clear() {
            Ok(removed) => {
                if removed {
                    info!("Logged out");
                    self.notify(SessionEvent::LoggedOut);
                }
                Ok(())
            }
            Err(e) => {
                // The in-memory session is already gone
                self.notify(SessionEvent::LoggedOut);
                Err(ApiError::Storage(format!("{:#}", e)))
            }
        }
    }

    // ===== JSON Helpers =====

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(ApiRequest::get(path)).await?.json()
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::post(path, body)).await?.json()
    }

    async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::put(path, body)).await?.json()
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.execute(ApiRequest::patch(path, body)).await?.json()
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    // ===== Account =====

    /// Fetch the user the current token belongs to
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get("/auth/me").await
    }

    // ===== Departments & Employees =====

    pub async fn fetch_departments(&self) -> Result<Vec<Department>, ApiError> {
        self.get("/departments").await
    }

    pub async fn create_department(&self, department: &DepartmentInput) -> Result<Department, ApiError> {
        self.post("/departments", department).await
    }

    pub async fn fetch_employees(&self) -> Result<Vec<Employee>, ApiError> {
        self.get("/employees").await
    }

    pub async fn fetch_employee(&self, id: &str) -> Result<Employee, ApiError> {
        self.get(&format!("/employees/{}", id)).await
    }

    pub async fn create_employee(&self, employee: &EmployeeInput) -> Result<Employee, ApiError> {
        employee.validate().map_err(ApiError::BadRequest)?;
        self.post("/employees", employee).await
    }

    pub async fn update_employee(&self, id: &str, employee: &EmployeeInput) -> Result<Employee, ApiError> {
        employee.validate().map_err(ApiError::BadRequest)?;
        self.put(&format!("/employees/{}", id), employee).await
    }

    pub async fn delete_employee(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/employees/{}", id)).await
    }

    /// The employee record linked to the logged-in account, if any.
    pub async fn fetch_my_employee(&self) -> Result<Option<Employee>, ApiError> {
        let Some(user) = self.session.user() else {
            return Err(ApiError::Unauthorized);
        };
        let employees = self.fetch_employees().await?;
        Ok(employees
            .into_iter()
            .find(|e| e.user_id.as_deref() == Some(user.id.as_str()) || e.email.eq_ignore_ascii_case(&user.email)))
    }

    // ===== Leave =====

    pub async fn fetch_leave_policies(&self) -> Result<Vec<LeavePolicy>, ApiError> {
        self.get("/leave-policies").await
    }

    pub async fn create_leave_policy(&self, policy: &LeavePolicyInput) -> Result<LeavePolicy, ApiError> {
        if policy.days_per_year < 0 {
            return Err(ApiError::BadRequest("days per year cannot be negative".to_string()));
        }
        self.post("/leave-policies", policy).await
    }

    pub async fn delete_leave_policy(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/leave-policies/{}", id)).await
    }

    /// Admins see every request, employees only their own.
    pub async fn fetch_leave_requests(&self) -> Result<Vec<LeaveRequest>, ApiError> {
        self.get("/leave-requests").await
    }

    pub async fn create_leave_request(&self, request: &LeaveRequestInput) -> Result<LeaveRequest, ApiError> {
        request.validate().map_err(ApiError::BadRequest)?;
        self.post("/leave-requests", request).await
    }

    /// Approve or reject a pending request
    pub async fn set_leave_status(&self, id: &str, status: LeaveStatus) -> Result<LeaveRequest, ApiError> {
        if status == LeaveStatus::Pending {
            return Err(ApiError::BadRequest("a leave request can only be approved or rejected".to_string()));
        }
        self.patch(&format!("/leave-requests/{}", id), &serde_json::json!({ "status": status }))
            .await
    }

    pub async fn fetch_leave_balance(&self) -> Result<Vec<LeaveBalance>, ApiError> {
        self.get("/leave-requests/balance").await
    }

    // ===== Holidays =====

    pub async fn fetch_holidays(&self) -> Result<Vec<Holiday>, ApiError> {
        self.get("/holidays").await
    }

    pub async fn create_holiday(&self, holiday: &HolidayInput) -> Result<Holiday, ApiError> {
        holiday.validate().map_err(ApiError::BadRequest)?;
        self.post("/holidays", holiday).await
    }

    /// Add several holidays in one call
    pub async fn create_holidays(&self, holidays: &[HolidayInput]) -> Result<serde_json::Value, ApiError> {
        for holiday in holidays {
            holiday.validate().map_err(ApiError::BadRequest)?;
        }
        self.post("/holidays/bulk", &holidays).await
    }

    pub async fn delete_holiday(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/holidays/{}", id)).await
    }

    // ===== Payroll =====

    pub async fn fetch_payroll_structures(&self) -> Result<Vec<PayrollStructure>, ApiError> {
        self.get("/payroll-structures").await
    }

    pub async fn create_payroll_structure(&self, structure: &PayrollStructureInput) -> Result<PayrollStructure, ApiError> {
        self.post("/payroll-structures", structure).await
    }

    pub async fn assign_payroll(&self, assignment: &PayrollAssignment) -> Result<serde_json::Value, ApiError> {
        self.post("/payroll", assignment).await
    }

    /// The structure assigned to an employee, or `None` if they have no payroll yet.
    pub async fn fetch_payroll(&self, employee_id: &str) -> Result<Option<EmployeePayroll>, ApiError> {
        self.get(&format!("/payroll/{}", employee_id)).await
    }

    pub async fn generate_payslip(&self, request: &PayslipRequest) -> Result<Payslip, ApiError> {
        request.validate().map_err(ApiError::BadRequest)?;
        self.post("/payslips/generate", request).await
    }

    pub async fn fetch_payslips(&self, employee_id: &str) -> Result<Vec<Payslip>, ApiError> {
        self.get(&format!("/payslips/employee/{}", employee_id)).await
    }

    /// Raw PDF bytes of a rendered payslip
    pub async fn download_payslip(&self, payslip_id: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .execute(ApiRequest::get(format!("/payslips/{}/download", payslip_id)))
            .await?;
        Ok(response.body)
    }

    pub async fn fetch_print_formats(&self) -> Result<Vec<PrintFormat>, ApiError> {
        self.get("/print-formats").await
    }

    pub async fn create_print_format(&self, format: &PrintFormatInput) -> Result<PrintFormat, ApiError> {
        format.validate().map_err(ApiError::BadRequest)?;
        self.post("/print-formats", format).await
    }

    pub async fn update_print_format(&self, id: &str, format: &PrintFormatInput) -> Result<PrintFormat, ApiError> {
        format.validate().map_err(ApiError::BadRequest)?;
        self.put(&format!("/print-formats/{}", id), format).await
    }

    pub async fn delete_print_format(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/print-formats/{}", id)).await
    }

    /// Render a print format against sample data. Returns the HTML page.
    pub async fn preview_print_format(&self, id: &str) -> Result<String, ApiError> {
        let request = ApiRequest::post(format!("/print-formats/{}/preview", id), serde_json::json!({}));
        Ok(self.execute(request).await?.text())
    }
}
