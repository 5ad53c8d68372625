use std::str::FromStr;
use std::time::Duration;

use clo_lease::{LeaseConfig, DEFAULT_LEASE_BLOB};

use crate::error::ConfigError;

/// Longest visibility window a claim may request (seven days)
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Log output format for the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// Configuration for the worker process
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between two claim attempts
    pub poll_interval: Duration,

    /// Hidden window requested on every visibility renewal
    pub visibility_timeout: Duration,

    /// How often a running job's visibility is renewed
    pub visibility_renewal_interval: Duration,

    /// Blob raced for by instances at startup
    pub lease_blob: String,

    /// Length of the startup lease
    pub lease_duration: Duration,

    /// Whether the worker starts claiming jobs right after startup
    pub process_jobs: bool,

    /// Recurrence interval of the partner file pipeline jobs
    pub file_pipeline_interval_minutes: u32,

    pub log_format: LogFormat,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            visibility_timeout: Duration::from_secs(60),
            visibility_renewal_interval: Duration::from_secs(55),
            lease_blob: DEFAULT_LEASE_BLOB.to_string(),
            lease_duration: Duration::from_secs(60),
            process_jobs: true,
            file_pipeline_interval_minutes: 60,
            log_format: LogFormat::Pretty,
        }
    }
}

impl WorkerConfig {
    /// Read `CLO_*` variables from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "CLO_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            visibility_timeout: Duration::from_secs(parse_or(
                &lookup,
                "CLO_VISIBILITY_TIMEOUT_SECS",
                defaults.visibility_timeout.as_secs(),
            )?),
            visibility_renewal_interval: Duration::from_secs(parse_or(
                &lookup,
                "CLO_VISIBILITY_RENEWAL_SECS",
                defaults.visibility_renewal_interval.as_secs(),
            )?),
            lease_blob: lookup("CLO_LEASE_BLOB").unwrap_or(defaults.lease_blob),
            lease_duration: Duration::from_secs(parse_or(
                &lookup,
                "CLO_LEASE_DURATION_SECS",
                defaults.lease_duration.as_secs(),
            )?),
            process_jobs: parse_or(&lookup, "CLO_PROCESS_JOBS", defaults.process_jobs)?,
            file_pipeline_interval_minutes: parse_or(
                &lookup,
                "CLO_FILE_PIPELINE_INTERVAL_MINUTES",
                defaults.file_pipeline_interval_minutes,
            )?,
            log_format: parse_or(&lookup, "CLO_LOG_FORMAT", defaults.log_format)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Inconsistent("poll interval must be positive".into()));
        }
        if self.visibility_timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(ConfigError::Inconsistent(format!(
                "visibility timeout {:?} exceeds the maximum of {:?}",
                self.visibility_timeout, MAX_VISIBILITY_TIMEOUT
            )));
        }
        if self.visibility_renewal_interval.is_zero()
            || self.visibility_renewal_interval >= self.visibility_timeout
        {
            return Err(ConfigError::Inconsistent(format!(
                "visibility renewal interval {:?} must be positive and shorter than the visibility timeout {:?}",
                self.visibility_renewal_interval, self.visibility_timeout
            )));
        }
        if self.lease_blob.is_empty() {
            return Err(ConfigError::Inconsistent("lease blob name must not be empty".into()));
        }
        if self.file_pipeline_interval_minutes == 0 {
            return Err(ConfigError::Inconsistent(
                "file pipeline interval must be at least one minute".into(),
            ));
        }
        Ok(())
    }

    pub fn lease_config(&self) -> LeaseConfig {
        LeaseConfig::new(self.lease_blob.clone()).with_duration(self.lease_duration)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_visibility(mut self, timeout: Duration, renewal_interval: Duration) -> Self {
        self.visibility_timeout = timeout;
        self.visibility_renewal_interval = renewal_interval;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.visibility_timeout, Duration::from_secs(60));
        assert_eq!(config.visibility_renewal_interval, Duration::from_secs(55));
        assert_eq!(config.lease_blob, "worker-initialization");
        assert!(config.process_jobs);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let config = WorkerConfig::from_lookup(lookup_from(&[
            ("CLO_POLL_INTERVAL_MS", "250"),
            ("CLO_PROCESS_JOBS", "false"),
            ("CLO_LOG_FORMAT", "JSON"),
            ("CLO_FILE_PIPELINE_INTERVAL_MINUTES", "15"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(!config.process_jobs);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.file_pipeline_interval_minutes, 15);
    }

    #[test]
    fn test_invalid_value_names_key() {
        let err = WorkerConfig::from_lookup(lookup_from(&[("CLO_POLL_INTERVAL_MS", "soon")])).unwrap_err();
        assert_eq!(err, ConfigError::invalid("CLO_POLL_INTERVAL_MS", "soon"));
    }

    #[test]
    fn test_renewal_must_be_shorter_than_timeout() {
        let err = WorkerConfig::from_lookup(lookup_from(&[
            ("CLO_VISIBILITY_TIMEOUT_SECS", "30"),
            ("CLO_VISIBILITY_RENEWAL_SECS", "30"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(_)));
    }

    #[test]
    fn test_visibility_timeout_is_capped() {
        let err = WorkerConfig::from_lookup(lookup_from(&[(
            "CLO_VISIBILITY_TIMEOUT_SECS",
            "10000000000000",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent(ref msg) if msg.contains("exceeds the maximum")));

        let week = WorkerConfig::default().with_visibility(MAX_VISIBILITY_TIMEOUT, Duration::from_secs(60));
        assert!(week.validate().is_ok());
    }
}
