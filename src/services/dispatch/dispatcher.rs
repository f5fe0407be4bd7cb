//! One public request -> one backend call, with bounded latency and a single
//! retry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::services::dispatch::envelope::MessageEnvelope;
use crate::services::dispatch::routes::RouteTable;
use crate::services::errors::RawFailure;
use crate::services::transport::{Transport, TransportError};

/// Total attempts per call: the first one plus exactly one retry.
pub const MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// How long one attempt may wait for its reply.
    pub timeout: Duration,
    /// Pause before the retry.
    pub retry_delay: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Successful reply plus how it was obtained.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub reply: Value,
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchFailure {
    #[error("Service `{0}` is not routed")]
    UnknownService(String),
    #[error("Service `{service}` timeout after {attempts} attempts")]
    Timeout { service: String, attempts: u32 },
    #[error("Service `{service}` unreachable")]
    Unreachable {
        service: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },
    #[error("Service `{service}` replied with an error")]
    Backend {
        service: String,
        attempts: u32,
        error: Value,
    },
}

impl DispatchFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownService(_) => "unknown_service",
            Self::Timeout { .. } => "timeout",
            Self::Unreachable { .. } => "unreachable",
            Self::Backend { .. } => "backend_error",
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::UnknownService(_) => 0,
            Self::Timeout { attempts, .. }
            | Self::Unreachable { attempts, .. }
            | Self::Backend { attempts, .. } => *attempts,
        }
    }

    /// Hand the failure over to the error translator.
    ///
    /// Our own failures become plain messages the keyword table recognizes;
    /// backend errors keep whatever shape the backend sent.
    pub fn into_raw(self) -> RawFailure {
        match self {
            Self::Backend { error, .. } => RawFailure::from_value(error),
            other => RawFailure::Message(other.to_string()),
        }
    }
}

enum AttemptError {
    Elapsed,
    Transport(TransportError),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Elapsed => write!(f, "no reply within timeout"),
            AttemptError::Transport(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Clone)]
pub struct RequestDispatcher {
    routes: Arc<RouteTable>,
    transport: Arc<dyn Transport>,
    policy: DispatchPolicy,
}

impl fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("transport", &self.transport.backend_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RequestDispatcher {
    pub fn new(routes: Arc<RouteTable>, transport: Arc<dyn Transport>, policy: DispatchPolicy) -> Self {
        Self {
            routes,
            transport,
            policy,
        }
    }

    /// Send `pattern` with `payload` to `service_id`.
    ///
    /// Timeouts and transport failures are retried once after
    /// `retry_delay`; a reply carrying a backend error is final.
    pub async fn dispatch(
        &self,
        service_id: &str,
        pattern: &str,
        payload: Value,
        headers: BTreeMap<String, String>,
    ) -> Result<Dispatched, DispatchFailure> {
        let route = self
            .routes
            .resolve(service_id)
            .ok_or_else(|| DispatchFailure::UnknownService(service_id.to_string()))?;

        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;

            // A fresh correlation id per attempt so a late first reply can't
            // be mistaken for the retry's.
            let envelope = MessageEnvelope::new(pattern, payload.clone(), headers.clone());

            let outcome = tokio::time::timeout(
                self.policy.timeout,
                self.transport.request(&route.address, &envelope),
            )
            .await;

            let error = match outcome {
                Ok(Ok(reply)) => {
                    debug!(
                        service = service_id,
                        pattern,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "backend replied"
                    );
                    return match reply.into_result() {
                        Ok(reply) => Ok(Dispatched {
                            reply,
                            attempts: attempt,
                            elapsed: started.elapsed(),
                        }),
                        Err(error) => Err(DispatchFailure::Backend {
                            service: service_id.to_string(),
                            attempts: attempt,
                            error,
                        }),
                    };
                }
                Ok(Err(e)) => AttemptError::Transport(e),
                Err(_) => AttemptError::Elapsed,
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(match error {
                    AttemptError::Elapsed => DispatchFailure::Timeout {
                        service: service_id.to_string(),
                        attempts: attempt,
                    },
                    AttemptError::Transport(source) => DispatchFailure::Unreachable {
                        service: service_id.to_string(),
                        attempts: attempt,
                        source,
                    },
                });
            }

            warn!(
                service = service_id,
                pattern,
                attempt,
                error = %error,
                retry_in_ms = self.policy.retry_delay.as_millis() as u64,
                "dispatch attempt failed, retrying"
            );
            tokio::time::sleep(self.policy.retry_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failures_convert_to_translator_input() {
        let raw = DispatchFailure::Timeout {
            service: "X".into(),
            attempts: 2,
        }
        .into_raw();
        assert!(matches!(raw, RawFailure::Message(ref m) if m.contains("timeout")));

        let raw = DispatchFailure::Backend {
            service: "products".into(),
            attempts: 1,
            error: json!({"statusCode": 404, "message": "X not found"}),
        }
        .into_raw();
        assert!(matches!(raw, RawFailure::Structured { status_code: 404, .. }));
    }
}
