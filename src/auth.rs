//! Sign-in flow: BFF token exchange and identity-provider failure
//! classification.
//!
//! The interactive redirect to the identity provider belongs to the shell;
//! this module takes the opaque access token that flow produced, exchanges
//! it for a BFF token via `POST /registerClaims`, decodes the claims, and
//! persists the session.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::gateway::{DashboardApi, GatewayError};
use crate::session::{self, Session, SessionError, SessionStore};

/// Credentials from the sign-in form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub clinic_code: String,
}

/// Per-field form problems, caught before anything goes over the wire.
/// Messages are shown verbatim under the offending field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("Email is required")]
    MissingEmail,

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Password is required")]
    MissingPassword,

    #[error("Password must be at least 8 characters")]
    PasswordTooShort,

    #[error("Clinic code is required")]
    MissingClinicCode,

    #[error("Format must be XXX-00X e.g. C-000")]
    InvalidClinicCode,
}

impl LoginRequest {
    /// Check all three fields, reporting the first failure in field order.
    pub fn validate(&self) -> Result<(), CredentialsError> {
        if self.email.is_empty() {
            return Err(CredentialsError::MissingEmail);
        }
        if !is_plausible_email(&self.email) {
            return Err(CredentialsError::InvalidEmail);
        }
        if self.password.is_empty() {
            return Err(CredentialsError::MissingPassword);
        }
        if self.password.chars().count() < 8 {
            return Err(CredentialsError::PasswordTooShort);
        }
        if self.clinic_code.is_empty() {
            return Err(CredentialsError::MissingClinicCode);
        }
        if !is_clinic_code(&self.clinic_code) {
            return Err(CredentialsError::InvalidClinicCode);
        }
        Ok(())
    }
}

/// Structural email check: one `@` with a nonempty local part and a dotted,
/// whitespace-free domain. The BFF does the authoritative validation.
fn is_plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !s.chars().any(char::is_whitespace)
}

/// Clinic codes look like `C-001`: the literal prefix and exactly 3 digits.
fn is_clinic_code(s: &str) -> bool {
    match s.strip_prefix("C-") {
        Some(digits) => digits.len() == 3 && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Identity-provider error codes that mean "run the interactive login
/// again", not "sign-in failed".
const INTERACTIVE_CODES: &[&str] = &[
    "login_required",
    "consent_required",
    "missing_refresh_token",
];

/// Classified identity-provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdpFailure {
    /// The shell must redirect through the provider's interactive flow.
    InteractiveLoginRequired(String),
    /// Anything else is surfaced as a sign-in error.
    Other(String),
}

impl IdpFailure {
    pub fn classify(code: &str) -> Self {
        if INTERACTIVE_CODES.contains(&code) {
            Self::InteractiveLoginRequired(code.to_string())
        } else {
            Self::Other(code.to_string())
        }
    }

    pub fn requires_interactive_login(&self) -> bool {
        matches!(self, Self::InteractiveLoginRequired(_))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The form failed local validation; nothing was sent.
    #[error(transparent)]
    Invalid(#[from] CredentialsError),

    /// The BFF refused the exchange; the message is banner-ready.
    #[error("{0}")]
    Rejected(String),

    /// Transport-level failure reaching the BFF.
    #[error(transparent)]
    Gateway(GatewayError),

    /// The BFF answered with a token whose claims cannot be read.
    #[error("Invalid token received")]
    InvalidToken(#[source] SessionError),

    /// The session could not be persisted.
    #[error("Failed to persist session: {0}")]
    Persist(#[source] SessionError),
}

/// Validate the form, exchange credentials for a BFF session, persist it.
pub async fn login<A: DashboardApi + ?Sized>(
    api: &A,
    store: &SessionStore,
    request: &LoginRequest,
    idp_token: &str,
) -> Result<Session, AuthError> {
    request.validate()?;
    let token = api
        .register_claims(request, idp_token)
        .await
        .map_err(map_exchange_err)?;
    let claims = session::decode_claims(&token).map_err(AuthError::InvalidToken)?;
    let session = Session { token, claims };
    store.save(&session).map_err(AuthError::Persist)?;
    info!(doctor = %session.claims.doctor_id, "sign-in complete");
    Ok(session)
}

/// A rejected exchange carries `{"error": "..."}` in the body; fall back
/// to a generic message when it doesn't.
fn map_exchange_err(e: GatewayError) -> AuthError {
    match e {
        GatewayError::RemoteStatus { body, .. } => {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or_else(|| "Invalid credentials".to_string());
            AuthError::Rejected(message)
        }
        other => AuthError::Gateway(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockApi;
    use crate::models::BffClaims;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{DateTime, Utc};

    fn make_token(claims: &BffClaims) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.fakesig")
    }

    fn claims() -> BffClaims {
        BffClaims {
            sub: "auth0|abc123".into(),
            doctor_id: "doc-007".into(),
            clinic_id: "cl-001".into(),
            clinic_name: "Lakeside Family Medicine".into(),
            name: "Amelia Chen".into(),
            role: "physician".into(),
            iat: 0,
            exp: 4_102_444_800, // 2100-01-01
        }
    }

    fn request() -> LoginRequest {
        LoginRequest {
            email: "dr.chen@lakeside.com".into(),
            password: "correct-horse-battery".into(),
            clinic_code: "C-001".into(),
        }
    }

    #[test]
    fn validate_accepts_well_formed_credentials() {
        assert_eq!(request().validate(), Ok(()));
    }

    #[test]
    fn validate_reports_each_field() {
        let cases = [
            (
                LoginRequest {
                    email: String::new(),
                    ..request()
                },
                CredentialsError::MissingEmail,
            ),
            (
                LoginRequest {
                    email: "not-an-email".into(),
                    ..request()
                },
                CredentialsError::InvalidEmail,
            ),
            (
                LoginRequest {
                    email: "dr chen@lakeside.com".into(),
                    ..request()
                },
                CredentialsError::InvalidEmail,
            ),
            (
                LoginRequest {
                    password: String::new(),
                    ..request()
                },
                CredentialsError::MissingPassword,
            ),
            (
                LoginRequest {
                    password: "hunter2".into(),
                    ..request()
                },
                CredentialsError::PasswordTooShort,
            ),
            (
                LoginRequest {
                    clinic_code: String::new(),
                    ..request()
                },
                CredentialsError::MissingClinicCode,
            ),
            (
                LoginRequest {
                    clinic_code: "C-1".into(),
                    ..request()
                },
                CredentialsError::InvalidClinicCode,
            ),
            (
                LoginRequest {
                    clinic_code: "X-001".into(),
                    ..request()
                },
                CredentialsError::InvalidClinicCode,
            ),
            (
                LoginRequest {
                    clinic_code: "C-00A".into(),
                    ..request()
                },
                CredentialsError::InvalidClinicCode,
            ),
        ];
        for (req, expected) in cases {
            assert_eq!(req.validate(), Err(expected));
        }
    }

    #[tokio::test]
    async fn login_rejects_bad_form_before_the_exchange() {
        // A mock with no issued token answers every exchange with a 401, so
        // a validation error here proves the wire was never touched.
        let api = MockApi::default();
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let bad = LoginRequest {
            password: "short".into(),
            ..request()
        };
        let err = login(&api, &store, &bad, "idp-token").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Invalid(CredentialsError::PasswordTooShort)
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn interactive_codes_classify_as_reauth() {
        for code in ["login_required", "consent_required", "missing_refresh_token"] {
            assert!(IdpFailure::classify(code).requires_interactive_login());
        }
        assert!(!IdpFailure::classify("access_denied").requires_interactive_login());
    }

    #[tokio::test]
    async fn login_exchanges_decodes_and_persists() {
        let expected = claims();
        let api = MockApi {
            issued_token: Some(make_token(&expected)),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let session = login(&api, &store, &request(), "idp-token").await.unwrap();
        assert_eq!(session.claims, expected);

        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        assert_eq!(store.load(now), Some(session));
    }

    #[tokio::test]
    async fn rejected_exchange_surfaces_server_message() {
        let api = MockApi::default(); // no issued token -> 401 with error body
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let err = login(&api, &store, &request(), "idp-token")
            .await
            .unwrap_err();
        match err {
            AuthError::Rejected(msg) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("Expected Rejected, got: {other}"),
        }
    }

    #[tokio::test]
    async fn undecodable_token_is_invalid_token() {
        let api = MockApi {
            issued_token: Some("not-a-jwt".into()),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let err = login(&api, &store, &request(), "idp-token")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn missing_idp_token_passes_through_as_gateway_error() {
        let api = MockApi {
            issued_token: Some("unused".into()),
            ..Default::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));

        let err = login(&api, &store, &request(), "").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Gateway(GatewayError::MissingCredential)
        ));
    }

    #[test]
    fn exchange_error_body_fallback_message() {
        let err = map_exchange_err(GatewayError::RemoteStatus {
            status: 500,
            body: "<html>gateway timeout</html>".into(),
        });
        match err {
            AuthError::Rejected(msg) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("Expected Rejected, got: {other}"),
        }
    }

    #[test]
    fn exchange_error_body_custom_message() {
        let err = map_exchange_err(GatewayError::RemoteStatus {
            status: 403,
            body: r#"{"error":"Clinic code not recognized"}"#.into(),
        });
        match err {
            AuthError::Rejected(msg) => assert_eq!(msg, "Clinic code not recognized"),
            other => panic!("Expected Rejected, got: {other}"),
        }
    }
}
