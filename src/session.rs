//! Persisted BFF session: the exchanged token plus its decoded claims.
//!
//! The store is injectable (the gateway and workflows never read ambient
//! storage) and file-backed under the app data directory. `load` enforces
//! the `exp` claim against wall-clock time: an expired or corrupt session
//! is cleared and treated as absent, forcing a fresh sign-in.
//!
//! Claims are decoded without signature verification: the BFF signs the
//! token and the data endpoints reject tampered ones; this client only
//! needs to read the payload.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config;
use crate::models::BffClaims;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Token is not a compact JWT")]
    NotAJwt,

    #[error("Token payload is not valid base64url")]
    InvalidPayload,

    #[error("Token claims failed to decode: {0}")]
    Claims(#[from] serde_json::Error),

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),
}

/// An authenticated session as restored between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub claims: BffClaims,
}

/// Decode the claims payload of a compact JWT (header.payload.signature).
pub fn decode_claims(token: &str) -> Result<BffClaims, SessionError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::NotAJwt);
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| SessionError::InvalidPayload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// File-backed session persistence.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the standard location under the app data directory.
    pub fn default_location() -> Self {
        Self::new(config::session_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Restore the saved session if present and not expired. Expired or
    /// unreadable sessions are cleared so the next load starts clean.
    pub fn load(&self, now: DateTime<Utc>) -> Option<Session> {
        let data = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<Session>(&data) {
            Ok(session) if !session.claims.is_expired(now) => Some(session),
            Ok(_) => {
                self.clear();
                None
            }
            Err(e) => {
                warn!("discarding unreadable session file: {e}");
                self.clear();
                None
            }
        }
    }

    /// Remove the persisted session (sign-out or expiry detection).
    pub fn clear(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(exp: i64) -> BffClaims {
        BffClaims {
            sub: "auth0|abc123".into(),
            doctor_id: "doc-007".into(),
            clinic_id: "cl-001".into(),
            clinic_name: "Lakeside Family Medicine".into(),
            name: "Amelia Chen".into(),
            role: "physician".into(),
            iat: 0,
            exp,
        }
    }

    fn make_token(claims: &BffClaims) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("{header}.{payload}.fakesig")
    }

    #[test]
    fn decode_claims_reads_payload() {
        let claims = claims(1_800_000_000);
        let decoded = decode_claims(&make_token(&claims)).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn decode_rejects_non_jwt_shapes() {
        assert!(matches!(decode_claims(""), Err(SessionError::NotAJwt)));
        assert!(matches!(
            decode_claims("only.two"),
            Err(SessionError::NotAJwt)
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(SessionError::NotAJwt)
        ));
    }

    #[test]
    fn decode_rejects_bad_base64_payload() {
        assert!(matches!(
            decode_claims("head.!!!not-base64!!!.sig"),
            Err(SessionError::InvalidPayload)
        ));
    }

    #[test]
    fn decode_rejects_non_claims_payload() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"hello":"world"}"#);
        let token = format!("h.{payload}.s");
        assert!(matches!(
            decode_claims(&token),
            Err(SessionError::Claims(_))
        ));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        let session = Session {
            token: "tok".into(),
            claims: claims(now.timestamp() + 3600),
        };

        store.save(&session).unwrap();
        assert_eq!(store.load(now), Some(session));
    }

    #[test]
    fn expired_session_is_cleared_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        let session = Session {
            token: "tok".into(),
            claims: claims(now.timestamp() - 1),
        };

        store.save(&session).unwrap();
        assert_eq!(store.load(now), None);
        assert!(!store.path().exists(), "expired session file removed");
    }

    #[test]
    fn corrupt_session_is_cleared_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        fs::write(store.path(), "{not json").unwrap();

        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        assert_eq!(store.load(now), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        assert_eq!(store.load(now), None);
    }

    #[test]
    fn clear_removes_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        store
            .save(&Session {
                token: "tok".into(),
                claims: claims(now.timestamp() + 3600),
            })
            .unwrap();

        store.clear();
        assert_eq!(store.load(now), None);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested/deeper/session.json"));
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        let session = Session {
            token: "tok".into(),
            claims: claims(now.timestamp() + 3600),
        };
        store.save(&session).unwrap();
        assert!(store.load(now).is_some());
    }
}
