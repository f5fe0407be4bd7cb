use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::dispatch::{MessageEnvelope, ReplyPacket};
use crate::services::internal::InternalEndpoint;
use crate::services::transport::client::{Transport, TransportError};

/// Valkey/Redis list-based request/reply transport.
///
/// - requests: `LPUSH <address> <envelope json>`, consumed with `RPOP` (FIFO)
/// - replies:  `LPUSH <address>:reply:<id> <reply json>` + `EXPIRE`
///
/// Only non-blocking commands are used, so a single multiplexed connection
/// manager can be shared by every in-flight call.
#[derive(Clone)]
pub struct ValkeyTransport {
    manager: ConnectionManager,
    poll_interval: Duration,
    reply_ttl_seconds: u64,
}

impl std::fmt::Debug for ValkeyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyTransport")
            .field("poll_interval", &self.poll_interval)
            .field("reply_ttl_seconds", &self.reply_ttl_seconds)
            .finish()
    }
}

impl ValkeyTransport {
    // Connect to a URL like `redis://localhost:6379`
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client =
            redis::Client::open(url).map_err(|e| TransportError::Connection(e.to_string()))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            manager,
            poll_interval: Duration::from_millis(10),
            reply_ttl_seconds: 60,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Where the reply to request `id` on `address` is pushed.
    pub fn reply_key(address: &str, id: Uuid) -> String {
        format!("{address}:reply:{id}")
    }

    async fn push(&self, key: &str, body: &str) -> Result<(), TransportError> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("LPUSH")
            .arg(key)
            .arg(body)
            .query_async(&mut conn)
            .await
            .map_err(|e| TransportError::Command(e.to_string()))?;
        Ok(())
    }

    async fn pop(&self, key: &str) -> Result<Option<String>, TransportError> {
        let mut conn = self.manager.clone();
        let resp: Option<String> = redis::cmd("RPOP")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| TransportError::Command(e.to_string()))?;
        Ok(resp)
    }

    async fn send_reply(&self, reply_to: &str, reply: &ReplyPacket) -> Result<(), TransportError> {
        let body =
            serde_json::to_string(reply).map_err(|e| TransportError::Command(e.to_string()))?;

        // The reply list expires so a reply nobody waits for anymore is not kept.
        let mut conn = self.manager.clone();
        let _: () = redis::pipe()
            .cmd("LPUSH")
            .arg(reply_to)
            .arg(body)
            .ignore()
            .cmd("EXPIRE")
            .arg(reply_to)
            .arg(self.reply_ttl_seconds)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| TransportError::Command(e.to_string()))?;
        Ok(())
    }

    /// Consume requests queued on `address` and answer them with `endpoint`.
    ///
    /// Each request is handled on its own task; this loop only returns on a
    /// transport error.
    pub async fn serve(
        &self,
        address: &str,
        endpoint: Arc<InternalEndpoint>,
    ) -> Result<(), TransportError> {
        info!(address, "serving internal requests");

        loop {
            let Some(raw) = self.pop(address).await? else {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };

            let envelope: MessageEnvelope = match serde_json::from_str(&raw) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(address, error = %e, "dropping undecodable request");
                    continue;
                }
            };

            let Some(reply_to) = envelope.reply_to.clone() else {
                warn!(address, id = %envelope.id, "dropping request without replyTo");
                continue;
            };

            let transport = self.clone();
            let endpoint = endpoint.clone();
            tokio::spawn(async move {
                let reply = endpoint.handle(envelope).await;
                if let Err(e) = transport.send_reply(&reply_to, &reply).await {
                    error!(reply_to = %reply_to, error = %e, "failed to send reply");
                }
            });
        }
    }
}

/// A reply key that still needs deleting unless a reply was consumed from it.
#[derive(Debug)]
struct ReplyKey {
    name: String,
    consumed: bool,
}

impl ReplyKey {
    fn new(name: String) -> Self {
        Self {
            name,
            consumed: false,
        }
    }

    fn consume(&mut self) {
        self.consumed = true;
    }

    /// The key to delete, at most once.
    fn release(&mut self) -> Option<String> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        Some(std::mem::take(&mut self.name))
    }
}

/// Deletes the reply key when the waiting future is dropped early, e.g.
/// when the dispatcher's per-attempt timeout fires.
struct ReplyKeyGuard {
    manager: ConnectionManager,
    key: ReplyKey,
}

impl Drop for ReplyKeyGuard {
    fn drop(&mut self) {
        let Some(key) = self.key.release() else {
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let mut conn = self.manager.clone();
        handle.spawn(async move {
            let deleted: redis::RedisResult<i64> =
                redis::cmd("DEL").arg(&key).query_async(&mut conn).await;
            debug!(key = %key, ?deleted, "released abandoned reply key");
        });
    }
}

#[async_trait]
impl Transport for ValkeyTransport {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn request(
        &self,
        address: &str,
        envelope: &MessageEnvelope,
    ) -> Result<ReplyPacket, TransportError> {
        let reply_to = Self::reply_key(address, envelope.id);

        let mut outbound = envelope.clone();
        outbound.reply_to = Some(reply_to.clone());
        let body =
            serde_json::to_string(&outbound).map_err(|e| TransportError::Command(e.to_string()))?;

        let mut guard = ReplyKeyGuard {
            manager: self.manager.clone(),
            key: ReplyKey::new(reply_to.clone()),
        };

        self.push(address, &body).await?;

        loop {
            if let Some(raw) = self.pop(&reply_to).await? {
                guard.key.consume();

                let reply: ReplyPacket = serde_json::from_str(&raw)
                    .map_err(|e| TransportError::InvalidReply(e.to_string()))?;
                if reply.id != envelope.id {
                    return Err(TransportError::InvalidReply(format!(
                        "correlation id mismatch: expected {}, got {}",
                        envelope.id, reply.id
                    )));
                }
                return Ok(reply);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
