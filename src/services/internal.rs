//! Receiving side of service-to-service calls.
//!
//! A backend hosts an [`InternalEndpoint`]: every inbound envelope is
//! authenticated by its `authorization` header field before the handler sees
//! it. There is no authorization step and no further dispatch here.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use crate::services::auth::{AuthenticationGuard, Identity};
use crate::services::dispatch::{MessageEnvelope, ReplyPacket};

/// Backend business logic behind an endpoint.
///
/// `Err` values are sent back verbatim as the reply's `err`; a
/// `{statusCode, message}` object keeps its status at the gateway.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(
        &self,
        pattern: &str,
        data: Value,
        identity: Option<Identity>,
    ) -> Result<Value, Value>;
}

pub struct InternalEndpoint {
    guard: AuthenticationGuard,
    handler: Arc<dyn MessageHandler>,
    public_patterns: BTreeSet<String>,
}

impl fmt::Debug for InternalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalEndpoint")
            .field("guard", &self.guard)
            .field("public_patterns", &self.public_patterns)
            .finish()
    }
}

impl InternalEndpoint {
    pub fn new(guard: AuthenticationGuard, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            guard,
            handler,
            public_patterns: BTreeSet::new(),
        }
    }

    /// Patterns reachable without a credential (e.g. `auth.login`).
    pub fn allow_public<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.public_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub async fn handle(&self, envelope: MessageEnvelope) -> ReplyPacket {
        let identity = if self.public_patterns.contains(&envelope.pattern) {
            None
        } else {
            match self.guard.authenticate_envelope(&envelope).await {
                Ok(identity) => Some(identity),
                Err(rejection) => {
                    warn!(
                        pattern = %envelope.pattern,
                        id = %envelope.id,
                        reason = rejection.kind(),
                        "internal request rejected"
                    );
                    return ReplyPacket::error(envelope.id, unauthorized());
                }
            }
        };

        match self
            .handler
            .handle(&envelope.pattern, envelope.data, identity)
            .await
        {
            Ok(value) => ReplyPacket::response(envelope.id, value),
            Err(err) => ReplyPacket::error(envelope.id, err),
        }
    }
}

fn unauthorized() -> Value {
    json!({"statusCode": 401, "message": "Unauthorized"})
}
