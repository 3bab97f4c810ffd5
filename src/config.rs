use std::path::{Path, PathBuf};

use crate::session::{AccessPolicy, Identity};

pub const DEFAULT_HOURLY_RATE: f64 = 150.0;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("FOLIO_HOURLY_RATE must be a positive number, got '{0}'")]
    InvalidRate(String),
}

/// Runtime settings, read from the environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub allowed_emails: Vec<String>,
    pub hourly_rate: f64,
}

impl Config {
    pub fn from_env(data_dir_flag: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_lookup(data_dir_flag, |key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(data_dir_flag: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = match (data_dir_flag, get("FOLIO_DATA_DIR")) {
            (Some(flag), _) => flag.to_path_buf(),
            (None, Some(env)) => PathBuf::from(env),
            (None, None) => default_data_dir(),
        };

        let hourly_rate = match get("FOLIO_HOURLY_RATE") {
            None => DEFAULT_HOURLY_RATE,
            Some(raw) => match raw.parse::<f64>() {
                Ok(r) if r.is_finite() && r > 0.0 => r,
                _ => return Err(ConfigError::InvalidRate(raw)),
            },
        };

        let allowed_emails = get("FOLIO_ALLOWED_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            data_dir,
            user_email: get("FOLIO_USER_EMAIL"),
            user_name: get("FOLIO_USER_NAME"),
            allowed_emails,
            hourly_rate,
        })
    }

    /// The configured signed-in user, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.user_email.as_ref().map(|email| Identity {
            email: email.clone(),
            display_name: self.user_name.clone(),
        })
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.allowed_emails.iter().cloned())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("folio"))
        .unwrap_or_else(|| PathBuf::from("folio-data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn flag_beats_env_for_data_dir() {
        let env = lookup(&[("FOLIO_DATA_DIR", "/from/env")]);
        let cfg = Config::from_lookup(Some(Path::new("/from/flag")), &env).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/from/flag"));
        let cfg = Config::from_lookup(None, &env).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/from/env"));
    }

    #[test]
    fn defaults() {
        let cfg = Config::from_lookup(None, lookup(&[])).unwrap();
        assert_eq!(cfg.hourly_rate, DEFAULT_HOURLY_RATE);
        assert!(cfg.allowed_emails.is_empty());
        assert!(cfg.identity().is_none());
        assert!(cfg.data_dir.ends_with("folio") || cfg.data_dir.ends_with("folio-data"));
    }

    #[test]
    fn allow_list_and_identity() {
        let env = lookup(&[
            ("FOLIO_ALLOWED_EMAILS", " a@x.io, ,b@x.io "),
            ("FOLIO_USER_EMAIL", "b@x.io"),
            ("FOLIO_USER_NAME", "Bea"),
        ]);
        let cfg = Config::from_lookup(None, env).unwrap();
        assert_eq!(cfg.allowed_emails, vec!["a@x.io", "b@x.io"]);
        let session = cfg.access_policy().authorize(cfg.identity()).unwrap();
        assert_eq!(session.display_name(), "Bea");
    }

    #[test]
    fn bad_rate_is_rejected() {
        let env = lookup(&[("FOLIO_HOURLY_RATE", "-3")]);
        assert_eq!(Config::from_lookup(None, env).unwrap_err(), ConfigError::InvalidRate("-3".into()));
    }
}
