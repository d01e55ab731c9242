//! Authenticated access to the BFF data endpoints.
//!
//! `DashboardApi` is the seam the dashboard and workflows talk through;
//! `HttpGateway` is the real reqwest-backed implementation and `MockApi`
//! the configurable stand-in for tests. The gateway owns the tolerant
//! payload decoding (the BFF sometimes wraps collections in an object)
//! and hands every record to the normalization boundary before anything
//! else sees it. No caching, no retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::LoginRequest;
use crate::config;
use crate::models::{Appointment, Task};
use crate::normalize::{
    self, NormalizeContext, NormalizeError, RawAppointment, RawTask,
};

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No bearer token available for a request that requires one.
    #[error("No bearer token available")]
    MissingCredential,

    /// The BFF answered with a non-success status.
    #[error("Request failed with status {status}")]
    RemoteStatus { status: u16, body: String },

    /// Transport failure: refused connection, DNS, reset.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("Malformed response body: {0}")]
    Decode(String),

    /// A record failed validation at the normalization boundary.
    #[error(transparent)]
    Malformed(#[from] NormalizeError),
}

impl GatewayError {
    /// Both HTTP-status and transport failures are the same "remote fetch
    /// failed" category as far as the UI copy is concerned.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteStatus { .. } | Self::Network(_))
    }
}

// ─── API seam ─────────────────────────────────────────────────────────────────

/// Everything the dashboard needs from the BFF.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Fetch, validate, and sort the caller's appointments.
    async fn fetch_appointments(
        &self,
        ctx: &NormalizeContext,
        token: &str,
    ) -> Result<Vec<Appointment>, GatewayError>;

    /// Fetch and validate the caller's tasks.
    async fn fetch_tasks(
        &self,
        ctx: &NormalizeContext,
        token: &str,
    ) -> Result<Vec<Task>, GatewayError>;

    /// Submit a reschedule. Returns the raw echoed record; the server's
    /// copy is authoritative and the caller splices it into its collection.
    async fn reschedule_appointment(
        &self,
        id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        reason: &str,
        token: &str,
    ) -> Result<RawAppointment, GatewayError>;

    /// Exchange identity-provider credentials for a BFF token.
    async fn register_claims(
        &self,
        login: &LoginRequest,
        idp_token: &str,
    ) -> Result<String, GatewayError>;
}

// ─── Wire payloads ────────────────────────────────────────────────────────────

/// The appointments endpoint returns either a bare array or `{appts: [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AppointmentsPayload {
    Bare(Vec<RawAppointment>),
    Wrapped { appts: Vec<RawAppointment> },
}

impl AppointmentsPayload {
    fn into_records(self) -> Vec<RawAppointment> {
        match self {
            Self::Bare(records) | Self::Wrapped { appts: records } => records,
        }
    }
}

/// The tasks endpoint returns either a bare array or `{tasks: [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TasksPayload {
    Bare(Vec<RawTask>),
    Wrapped { tasks: Vec<RawTask> },
}

impl TasksPayload {
    fn into_records(self) -> Vec<RawTask> {
        match self {
            Self::Bare(records) | Self::Wrapped { tasks: records } => records,
        }
    }
}

#[derive(Serialize)]
struct RescheduleBody<'a> {
    start_time: String,
    end_time: String,
    reason: &'a str,
}

#[derive(Serialize)]
struct RegisterClaimsBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "clinicCode")]
    clinic_code: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

// ─── HttpGateway ──────────────────────────────────────────────────────────────

/// reqwest-backed BFF client.
pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Gateway pointed at the configured BFF base URL.
    pub fn from_env() -> Self {
        Self::new(&config::bff_base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_err(&self, e: reqwest::Error) -> GatewayError {
        if e.is_connect() {
            GatewayError::Network(format!("cannot reach BFF at {}", self.base_url))
        } else {
            GatewayError::Network(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::RemoteStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// The empty-token check shared by all authenticated reads. The token is
/// opaque pass-through state; only presence is validated client-side.
fn require_token(token: &str) -> Result<(), GatewayError> {
    if token.trim().is_empty() {
        Err(GatewayError::MissingCredential)
    } else {
        Ok(())
    }
}

#[async_trait]
impl DashboardApi for HttpGateway {
    async fn fetch_appointments(
        &self,
        ctx: &NormalizeContext,
        token: &str,
    ) -> Result<Vec<Appointment>, GatewayError> {
        require_token(token)?;
        let url = format!("{}/appointments", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_send_err(e))?;
        let payload: AppointmentsPayload = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(normalize::normalize_appointments(payload.into_records(), ctx)?)
    }

    async fn fetch_tasks(
        &self,
        ctx: &NormalizeContext,
        token: &str,
    ) -> Result<Vec<Task>, GatewayError> {
        require_token(token)?;
        let url = format!("{}/pendingTasks", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_send_err(e))?;
        let payload: TasksPayload = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(normalize::normalize_tasks(
            payload.into_records(),
            ctx,
            Utc::now(),
        )?)
    }

    async fn reschedule_appointment(
        &self,
        id: &str,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        reason: &str,
        token: &str,
    ) -> Result<RawAppointment, GatewayError> {
        require_token(token)?;
        let url = format!("{}/appointments/{}/reschedule", self.base_url, id);
        let body = RescheduleBody {
            start_time: new_start.to_rfc3339(),
            end_time: new_end.to_rfc3339(),
            reason,
        };
        let response = self
            .client
            .patch(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_err(e))?;
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn register_claims(
        &self,
        login: &LoginRequest,
        idp_token: &str,
    ) -> Result<String, GatewayError> {
        require_token(idp_token)?;
        let url = format!("{}/registerClaims", self.base_url);
        let body = RegisterClaimsBody {
            email: &login.email,
            password: &login.password,
            clinic_code: &login.clinic_code,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(idp_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_err(e))?;
        let parsed: TokenResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(parsed.token)
    }
}

// ─── MockApi ──────────────────────────────────────────────────────────────────

/// Mock BFF for tests, returning configured collections or failures.
#[derive(Default)]
pub struct MockApi {
    pub appointments: Vec<Appointment>,
    pub tasks: Vec<Task>,
    pub fail_appointments: bool,
    pub fail_tasks: bool,
    pub reschedule_response: Option<RawAppointment>,
    pub fail_reschedule: bool,
    pub issued_token: Option<String>,
}

impl MockApi {
    fn mock_failure() -> GatewayError {
        GatewayError::RemoteStatus {
            status: 500,
            body: "mock failure".into(),
        }
    }
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn fetch_appointments(
        &self,
        _ctx: &NormalizeContext,
        token: &str,
    ) -> Result<Vec<Appointment>, GatewayError> {
        require_token(token)?;
        if self.fail_appointments {
            return Err(Self::mock_failure());
        }
        Ok(self.appointments.clone())
    }

    async fn fetch_tasks(
        &self,
        _ctx: &NormalizeContext,
        token: &str,
    ) -> Result<Vec<Task>, GatewayError> {
        require_token(token)?;
        if self.fail_tasks {
            return Err(Self::mock_failure());
        }
        Ok(self.tasks.clone())
    }

    async fn reschedule_appointment(
        &self,
        _id: &str,
        _new_start: DateTime<Utc>,
        _new_end: DateTime<Utc>,
        _reason: &str,
        token: &str,
    ) -> Result<RawAppointment, GatewayError> {
        require_token(token)?;
        if self.fail_reschedule {
            return Err(Self::mock_failure());
        }
        self.reschedule_response
            .clone()
            .ok_or_else(Self::mock_failure)
    }

    async fn register_claims(
        &self,
        _login: &LoginRequest,
        idp_token: &str,
    ) -> Result<String, GatewayError> {
        require_token(idp_token)?;
        self.issued_token.clone().ok_or(GatewayError::RemoteStatus {
            status: 401,
            body: r#"{"error":"Invalid credentials"}"#.into(),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
