use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::ConfigError;

/// Environment variable consulted when no SDK key is configured.
pub const SDK_KEY_ENV_VAR: &str = "FLAGWISE_SDK_KEY";

pub const DEFAULT_HOST: &str = "https://api.unlaunch.io";
pub const DEFAULT_FLAGS_PATH: &str = "/api/v1/flags";
pub const PRODUCTION_CDN_HOST: &str = "https://api-unlaunch-io-master-flags.s3-us-west-1.amazonaws.com";
pub const QA_CDN_HOST: &str = "https://app-qa-unlaunch-io-master-flags.s3-us-west-1.amazonaws.com";

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(60);
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Validated client settings. Build with [`ClientConfig::builder`].
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    sdk_key: String,
    host: String,
    flags_path: String,
    cdn_host: String,
    polling_interval: Duration,
    connect_timeout: Duration,
    read_timeout: Duration,
    close_timeout: Duration,
}

impl ClientConfig {
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    #[must_use]
    pub fn sdk_key(&self) -> &str {
        &self.sdk_key
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn flags_path(&self) -> &str {
        &self.flags_path
    }

    #[must_use]
    pub fn cdn_host(&self) -> &str {
        &self.cdn_host
    }

    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        self.polling_interval
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    #[must_use]
    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    /// The SDK key with everything after the first few characters hidden.
    #[must_use]
    pub fn obfuscated_sdk_key(&self) -> String {
        let visible: String = self.sdk_key.chars().take(5).collect();
        format!("{visible}-*")
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sdk_key = {}, host = {}, polling_interval = {}s, connect_timeout = {}ms, read_timeout = {}ms",
            self.obfuscated_sdk_key(),
            self.host,
            self.polling_interval.as_secs(),
            self.connect_timeout.as_millis(),
            self.read_timeout.as_millis()
        )
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("sdk_key", &self.obfuscated_sdk_key())
            .field("host", &self.host)
            .field("flags_path", &self.flags_path)
            .field("cdn_host", &self.cdn_host)
            .field("polling_interval", &self.polling_interval)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

/// Consuming builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    sdk_key: Option<String>,
    host: Option<String>,
    flags_path: Option<String>,
    cdn_host: Option<String>,
    polling_interval: Option<Duration>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    close_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn sdk_key(mut self, key: impl Into<String>) -> Self {
        self.sdk_key = Some(key.into());
        self
    }

    /// Override the API host. Intended for testing and private deployments.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn flags_path(mut self, path: impl Into<String>) -> Self {
        self.flags_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn cdn_host(mut self, host: impl Into<String>) -> Self {
        self.cdn_host = Some(host.into());
        self
    }

    #[must_use]
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = Some(timeout);
        self
    }

    /// Validate and resolve defaults. Falls back to
    /// [`SDK_KEY_ENV_VAR`] when no key was set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no SDK key is available, the host is
    /// empty, or a timeout is below one second.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        self.build_with_env(|name| std::env::var(name).ok())
    }

    fn build_with_env(self, env: impl Fn(&str) -> Option<String>) -> Result<ClientConfig, ConfigError> {
        let sdk_key = match self.sdk_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => key,
            None => {
                let key = env(SDK_KEY_ENV_VAR)
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(ConfigError::MissingSdkKey {
                        env_var: SDK_KEY_ENV_VAR,
                    })?;
                info!("using SDK key from {SDK_KEY_ENV_VAR}");
                key
            }
        };

        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_owned());
        if host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        let cdn_host = self.cdn_host.unwrap_or_else(|| {
            if host == DEFAULT_HOST {
                PRODUCTION_CDN_HOST.to_owned()
            } else {
                QA_CDN_HOST.to_owned()
            }
        });

        let connect_timeout = check_timeout("connect timeout", self.connect_timeout)?;
        let read_timeout = check_timeout("read timeout", self.read_timeout)?;

        let polling_interval = match self.polling_interval {
            Some(interval) if interval < MIN_POLLING_INTERVAL => {
                warn!(
                    requested = ?interval,
                    minimum = ?MIN_POLLING_INTERVAL,
                    "polling interval below minimum, using the minimum"
                );
                MIN_POLLING_INTERVAL
            }
            Some(interval) => interval,
            None if !sdk_key.starts_with("prod") => {
                info!("SDK key is not for production, polling at the minimum interval");
                MIN_POLLING_INTERVAL
            }
            None => DEFAULT_POLLING_INTERVAL,
        };

        if sdk_key.contains("-mob-") || sdk_key.contains("-public-") {
            warn!(
                "client-side SDK key in use; only flags with client-side access enabled will be \
                 downloaded. Use a server key when running on your own servers"
            );
        }

        Ok(ClientConfig {
            sdk_key,
            host,
            flags_path: self
                .flags_path
                .unwrap_or_else(|| DEFAULT_FLAGS_PATH.to_owned()),
            cdn_host,
            polling_interval,
            connect_timeout,
            read_timeout,
            close_timeout: self.close_timeout.unwrap_or(DEFAULT_CLOSE_TIMEOUT),
        })
    }
}

fn check_timeout(name: &'static str, value: Option<Duration>) -> Result<Duration, ConfigError> {
    let value = value.unwrap_or(DEFAULT_TIMEOUT);
    if value < MIN_TIMEOUT {
        return Err(ConfigError::TimeoutTooShort {
            name,
            actual: value,
            minimum: MIN_TIMEOUT,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn production_defaults() {
        let config = ClientConfig::builder()
            .sdk_key("prod-server-123")
            .build_with_env(no_env)
            .unwrap();
        assert_eq!(config.host(), DEFAULT_HOST);
        assert_eq!(config.flags_path(), DEFAULT_FLAGS_PATH);
        assert_eq!(config.cdn_host(), PRODUCTION_CDN_HOST);
        assert_eq!(config.polling_interval(), DEFAULT_POLLING_INTERVAL);
        assert_eq!(config.connect_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.read_timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.close_timeout(), DEFAULT_CLOSE_TIMEOUT);
    }

    #[test]
    fn pre_production_key_polls_faster() {
        let config = ClientConfig::builder()
            .sdk_key("test-server-123")
            .build_with_env(no_env)
            .unwrap();
        assert_eq!(config.polling_interval(), MIN_POLLING_INTERVAL);

        let explicit = ClientConfig::builder()
            .sdk_key("test-server-123")
            .polling_interval(Duration::from_secs(90))
            .build_with_env(no_env)
            .unwrap();
        assert_eq!(explicit.polling_interval(), Duration::from_secs(90));
    }

    #[test]
    fn polling_interval_clamped_to_minimum() {
        let config = ClientConfig::builder()
            .sdk_key("prod-server-123")
            .polling_interval(Duration::from_secs(1))
            .build_with_env(no_env)
            .unwrap();
        assert_eq!(config.polling_interval(), MIN_POLLING_INTERVAL);
    }

    #[test]
    fn custom_host_switches_cdn() {
        let config = ClientConfig::builder()
            .sdk_key("prod-server-123")
            .host("https://qa.example.com")
            .build_with_env(no_env)
            .unwrap();
        assert_eq!(config.cdn_host(), QA_CDN_HOST);
    }

    #[test]
    fn sdk_key_from_env() {
        let config = ClientConfig::builder()
            .build_with_env(|name| (name == SDK_KEY_ENV_VAR).then(|| "prod-env-key".to_owned()))
            .unwrap();
        assert_eq!(config.sdk_key(), "prod-env-key");
    }

    #[test]
    fn missing_sdk_key() {
        let err = ClientConfig::builder().sdk_key("  ").build_with_env(no_env).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingSdkKey {
                env_var: SDK_KEY_ENV_VAR
            }
        );
    }

    #[test]
    fn empty_host_rejected() {
        let err = ClientConfig::builder()
            .sdk_key("prod-x")
            .host("")
            .build_with_env(no_env)
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyHost);
    }

    #[test]
    fn short_timeouts_rejected() {
        let err = ClientConfig::builder()
            .sdk_key("prod-x")
            .read_timeout(Duration::from_millis(999))
            .build_with_env(no_env)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TimeoutTooShort { name: "read timeout", .. }));

        assert!(ClientConfig::builder()
            .sdk_key("prod-x")
            .connect_timeout(Duration::from_millis(1000))
            .build_with_env(no_env)
            .is_ok());
    }

    #[test]
    fn sdk_key_is_obfuscated() {
        let config = ClientConfig::builder()
            .sdk_key("prod-server-secret")
            .build_with_env(no_env)
            .unwrap();
        assert_eq!(config.obfuscated_sdk_key(), "prod--*");
        assert!(!format!("{config:?}").contains("secret"));
        assert!(!config.to_string().contains("secret"));
    }
}
