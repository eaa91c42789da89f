//! In-process stand-in for the HRMS server, used by the protocol tests.
//!
//! Accepts exactly one access token at a time, counts refresh exchanges and
//! can hold `/auth/refresh` open until a number of requests have been
//! rejected, so a whole burst is queued before the exchange settles.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::transport::{ApiRequest, ApiResponse, Transport, LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
use super::ApiError;
use crate::models::{Role, User};

/// Password the fake accepts for every account
const PASSWORD: &str = "secret";

struct FakeState {
    valid_access: String,
    valid_refresh: String,
    rotate_to: Option<String>,
    refresh_status: Option<StatusCode>,
    hold_until: usize,
    rejected: usize,
    refresh_calls: usize,
    refresh_bodies: Vec<Option<String>>,
    requests: Vec<ApiRequest>,
    locked: HashSet<String>,
    canned: HashMap<String, (StatusCode, String)>,
}

pub(crate) struct FakeServer {
    state: Mutex<FakeState>,
    gate: Notify,
}

impl FakeServer {
    /// A server that currently accepts `access` and exchanges `refresh` for it.
    pub fn new(access: &str, refresh: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                valid_access: access.to_string(),
                valid_refresh: refresh.to_string(),
                rotate_to: None,
                refresh_status: None,
                hold_until: 0,
                rejected: 0,
                refresh_calls: 0,
                refresh_bodies: Vec::new(),
                requests: Vec::new(),
                locked: HashSet::new(),
                canned: HashMap::new(),
            }),
            gate: Notify::new(),
        }
    }

    pub fn admin() -> User {
        User {
            id: "u-admin".to_string(),
            email: "admin@acme.test".to_string(),
            full_name: "Ada Admin".to_string(),
            role: Role::Admin,
            created_at: None,
        }
    }

    /// Keep `/auth/refresh` pending until `count` protected requests got a 401.
    pub fn hold_refresh_until(self, count: usize) -> Self {
        self.state.lock().unwrap().hold_until = count;
        self
    }

    /// Issue `refresh` as a new refresh token on the next exchange.
    pub fn rotate_to(self, refresh: &str) -> Self {
        self.state.lock().unwrap().rotate_to = Some(refresh.to_string());
        self
    }

    /// Answer every exchange with `status` instead of checking the refresh token.
    pub fn fail_refresh_with(self, status: StatusCode) -> Self {
        self.state.lock().unwrap().refresh_status = Some(status);
        self
    }

    /// Answer 401 on `path` no matter which token is presented.
    pub fn always_unauthorized(&self, path: &str) {
        self.state.lock().unwrap().locked.insert(path.to_string());
    }

    /// Answer authorized requests to `path` with `status` and `body`.
    pub fn respond(&self, path: &str, status: StatusCode, body: Value) {
        self.state
            .lock()
            .unwrap()
            .canned
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Answer authorized requests to `path` with a plain text body.
    pub fn respond_text(&self, path: &str, text: &str) {
        self.state
            .lock()
            .unwrap()
            .canned
            .insert(path.to_string(), (StatusCode::OK, text.to_string()));
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.lock().unwrap().refresh_calls
    }

    pub fn refresh_bodies(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().refresh_bodies.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    /// Bearer tokens presented to `path`, in arrival order.
    pub fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.path == path)
            .map(|r| r.bearer.clone())
            .collect()
    }

    pub fn last_request(&self, path: &str) -> Option<ApiRequest> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .rev()
            .find(|r| r.path == path)
            .cloned()
    }

    fn reply(status: StatusCode, body: Value) -> ApiResponse {
        ApiResponse::new(status, body.to_string())
    }

    fn unauthorized() -> ApiResponse {
        Self::reply(StatusCode::UNAUTHORIZED, json!({ "detail": "Could not validate credentials" }))
    }

    fn login(&self, request: &ApiRequest) -> ApiResponse {
        let body = request.body.clone().unwrap_or_default();
        let state = self.state.lock().unwrap();
        if body["password"] != PASSWORD {
            return Self::reply(StatusCode::UNAUTHORIZED, json!({ "detail": "Invalid credentials" }));
        }
        Self::reply(
            StatusCode::OK,
            json!({
                "access_token": state.valid_access,
                "refresh_token": state.valid_refresh,
                "token_type": "bearer",
                "user": Self::admin(),
            }),
        )
    }

    fn register(&self, request: &ApiRequest) -> ApiResponse {
        let body = request.body.clone().unwrap_or_default();
        let email = body["email"].as_str().unwrap_or_default().to_string();
        if email.contains("blocked") {
            return Self::reply(StatusCode::UNAUTHORIZED, json!({ "detail": "Registration disabled" }));
        }
        let state = self.state.lock().unwrap();
        Self::reply(
            StatusCode::OK,
            json!({
                "access_token": state.valid_access,
                "user": {
                    "id": "u-new",
                    "email": email,
                    "full_name": body["full_name"],
                    "role": body["role"],
                },
            }),
        )
    }

    async fn refresh(&self, request: &ApiRequest) -> ApiResponse {
        let hold = {
            let mut state = self.state.lock().unwrap();
            state.refresh_calls += 1;
            let presented = request
                .body
                .as_ref()
                .and_then(|b| b["refresh_token"].as_str())
                .map(String::from);
            state.refresh_bodies.push(presented);
            state.hold_until > 0
        };
        if hold {
            self.gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.refresh_status {
            return Self::reply(status, json!({ "detail": "Token service unavailable" }));
        }
        let presented = request.body.as_ref().and_then(|b| b["refresh_token"].as_str());
        if presented != Some(state.valid_refresh.as_str()) {
            return Self::reply(StatusCode::UNAUTHORIZED, json!({ "detail": "Invalid refresh token" }));
        }
        let mut body = json!({ "access_token": state.valid_access, "token_type": "bearer" });
        if let Some(rotated) = state.rotate_to.take() {
            body["refresh_token"] = json!(rotated);
            state.valid_refresh = rotated;
        }
        Self::reply(StatusCode::OK, body)
    }

    fn protected(&self, request: &ApiRequest) -> ApiResponse {
        let mut state = self.state.lock().unwrap();
        let authorized = request.bearer.as_deref() == Some(state.valid_access.as_str())
            && !state.locked.contains(&request.path);
        if !authorized {
            state.rejected += 1;
            if state.rejected == state.hold_until {
                self.gate.notify_one();
            }
            return Self::unauthorized();
        }

        if let Some((status, body)) = state.canned.get(&request.path) {
            return ApiResponse::new(*status, body.clone());
        }
        match request.path.as_str() {
            "/auth/me" => Self::reply(StatusCode::OK, json!(Self::admin())),
            "/employees" => Self::reply(
                StatusCode::OK,
                json!([{
                    "id": "e-1",
                    "employee_id": "EMP00000001",
                    "name": "Ann Lee",
                    "email": "ann@acme.test",
                    "department": "Engineering",
                    "joining_date": "2024-03-01",
                }]),
            ),
            _ if request.method == reqwest::Method::GET => Self::reply(StatusCode::OK, json!([])),
            _ => Self::reply(StatusCode::OK, json!({})),
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.state.lock().unwrap().requests.push(request.clone());
        let response = match request.route() {
            LOGIN_PATH => self.login(request),
            REGISTER_PATH => self.register(request),
            REFRESH_PATH => self.refresh(request).await,
            _ => self.protected(request),
        };
        Ok(response)
    }
}
