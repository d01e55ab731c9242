use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "MedPortal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default BFF base URL (local development stack).
pub const DEFAULT_BFF_URL: &str = "http://localhost:8080";

/// Env var that overrides the BFF base URL.
pub const BFF_URL_ENV: &str = "MEDPORTAL_BFF_URL";

/// Fallback IANA timezone for appointments whose record carries none.
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

/// Resolve the BFF base URL, trailing slash stripped.
pub fn bff_base_url() -> String {
    std::env::var(BFF_URL_ENV)
        .unwrap_or_else(|_| DEFAULT_BFF_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Get the application data directory
/// ~/MedPortal/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("MedPortal")
}

/// Where the exchanged BFF token + decoded claims are persisted between runs.
pub fn session_file() -> PathBuf {
    app_data_dir().join("session.json")
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "medportal=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("MedPortal"));
    }

    #[test]
    fn session_file_under_app_data() {
        let file = session_file();
        assert!(file.starts_with(app_data_dir()));
        assert!(file.ends_with("session.json"));
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        assert!(!bff_base_url().ends_with('/'));
    }

    #[test]
    fn app_name_is_medportal() {
        assert_eq!(APP_NAME, "MedPortal");
    }
}
