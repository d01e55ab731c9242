use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decoded payload of the BFF-issued bearer token.
///
/// The BFF signs the token; this client only reads the claims and trusts
/// the data endpoints to reject tampered tokens. `exp` is seconds since
/// the Unix epoch, per JWT convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BffClaims {
    pub sub: String,
    #[serde(rename = "doctorId")]
    pub doctor_id: String,
    #[serde(rename = "clinicId")]
    pub clinic_id: String,
    #[serde(rename = "clinicName")]
    pub clinic_name: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub iat: i64,
    pub exp: i64,
}

impl BffClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }

    /// Last name for the greeting line ("Good morning, Dr. Chen").
    pub fn surname(&self) -> &str {
        self.name.rsplit(' ').next().unwrap_or(&self.name)
    }
}
