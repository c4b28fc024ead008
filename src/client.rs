use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{FlagwiseError, ReadyError};
use crate::events::{EventSink, Impression, NoopSink};
use crate::store::{RefreshProvider, SyncOutcome};
use crate::transport::Transport;
use crate::{Evaluation, FeatureFlag, Reason, User};

/// Placeholder reported for names while the client has no flags yet.
pub const NOT_READY: &str = "client_not_ready";

/// Which project and environment the downloaded flags belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub project_name: String,
    pub environment_name: String,
    /// `None` until the client is ready.
    pub flag_count: Option<usize>,
}

/// Evaluates flags against the locally cached snapshot.
///
/// Evaluation never touches the network and never fails because a flag is
/// missing or the client is not ready yet; those cases serve the `control`
/// variation with an explanatory [`Reason`].
pub struct Client {
    config: ClientConfig,
    provider: RefreshProvider,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl Client {
    #[must_use]
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder {
            config,
            transport: None,
            sink: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Evaluate `flag_key` for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`FlagwiseError::EmptyFlagKey`] if `flag_key` is empty.
    pub fn evaluate(&self, flag_key: &str, user: &User) -> Result<Evaluation, FlagwiseError> {
        if flag_key.is_empty() {
            return Err(FlagwiseError::EmptyFlagKey);
        }
        if self.provider.is_closed() {
            debug!(flag = flag_key, "evaluation requested after close");
            return Ok(Evaluation::control(flag_key, Reason::ClientClosed));
        }
        let Some(flag) = self.provider.store().get_flag(flag_key) else {
            warn!(flag = flag_key, "flag not found, serving control");
            return Ok(Evaluation::control(flag_key, Reason::FlagNotFound));
        };

        let evaluation = flag.evaluate(user);
        let impression = Impression {
            flag_key: flag.key().to_owned(),
            user_id: user.id().to_owned(),
            variation_key: evaluation.variation_key().to_owned(),
            flag_enabled: flag.is_enabled(),
            reason: evaluation.reason(),
            created_at: Utc::now(),
        };
        if panic::catch_unwind(AssertUnwindSafe(|| self.sink.record(impression))).is_err() {
            error!(flag = flag_key, "event sink panicked while recording an impression");
        }
        Ok(evaluation)
    }

    /// Key of the variation `user` receives for `flag_key`.
    ///
    /// # Errors
    ///
    /// Returns [`FlagwiseError::EmptyFlagKey`] if `flag_key` is empty.
    pub fn variation(&self, flag_key: &str, user: &User) -> Result<String, FlagwiseError> {
        self.evaluate(flag_key, user)
            .map(|e| e.variation_key().to_owned())
    }

    #[must_use]
    pub fn get_flag(&self, flag_key: &str) -> Option<Arc<FeatureFlag>> {
        self.provider.store().get_flag(flag_key)
    }

    /// Whether flags have been downloaded at least once.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.provider.is_ready()
    }

    /// Wait until the first download attempt finishes.
    ///
    /// # Errors
    ///
    /// [`ReadyError::Timeout`] if the attempt is still running after
    /// `timeout`; [`ReadyError::Interrupted`] if the client is closed first.
    pub async fn await_ready(&self, timeout: Duration) -> Result<(), ReadyError> {
        let result = self.provider.await_ready(timeout).await;
        if let Err(ReadyError::Timeout(_)) = &result {
            error!(
                ?timeout,
                "client did not finish initialization in time; the download may still be in progress"
            );
        }
        result
    }

    #[must_use]
    pub fn account_details(&self) -> AccountDetails {
        if !self.is_ready() {
            error!("account details requested before the client is ready");
            return AccountDetails {
                project_name: NOT_READY.to_owned(),
                environment_name: NOT_READY.to_owned(),
                flag_count: None,
            };
        }
        let snapshot = self.provider.store().snapshot();
        AccountDetails {
            project_name: snapshot.project_name().to_owned(),
            environment_name: snapshot.environment_name().to_owned(),
            flag_count: Some(snapshot.len()),
        }
    }

    /// Download flags now instead of waiting for the next scheduled poll.
    /// Returns `None` once the client is closed.
    pub async fn refresh_now(&self) -> Option<SyncOutcome> {
        self.provider.refresh_now().await
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.provider.is_closed()
    }

    /// Stop polling and release the flag snapshot. Later evaluations serve
    /// control. Safe to call more than once.
    pub async fn close(&self) {
        if self.provider.is_closed() {
            debug!("client already closed");
            return;
        }
        self.provider.close().await;
        info!(sdk_key = %self.config.obfuscated_sdk_key(), "client closed");
    }
}

/// Assembles a [`Client`] from its collaborators.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ClientBuilder {
    /// Use `transport` instead of the default HTTP transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn sdk_key(&self) -> &str {
        self.config.sdk_key()
    }

    /// Start the background refresh and return the client.
    ///
    /// # Errors
    ///
    /// Fails when called outside a Tokio runtime or when no transport can be
    /// constructed.
    pub fn start(self) -> Result<Client, FlagwiseError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.config)?,
        };
        let provider = RefreshProvider::start(
            transport,
            self.config.polling_interval(),
            self.config.close_timeout(),
        )?;
        info!(config = %self.config, "client created");
        Ok(Client {
            config: self.config,
            provider,
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopSink)),
        })
    }
}

#[cfg(feature = "http")]
fn default_transport(config: &ClientConfig) -> Result<Arc<dyn Transport>, FlagwiseError> {
    Ok(Arc::new(crate::transport::HttpTransport::new(config)?))
}

#[cfg(not(feature = "http"))]
fn default_transport(_config: &ClientConfig) -> Result<Arc<dyn Transport>, FlagwiseError> {
    Err(crate::error::ConfigError::NoTransport.into())
}
