use crate::error::TransportError;
use crate::remote::Channel;
use crate::remote::agent::Agent;
use crate::remote::protocol::{AgentReply, AgentRequest};
use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Seconds a reply is kept around when nobody collects it.
const REPLY_TTL_SECS: i64 = 300;

fn request_key(node: &str) -> String {
    format!("dynparam:agent:{}:requests", node)
}

fn reply_key(request_id: Uuid) -> String {
    format!("dynparam:reply:{}", request_id)
}

#[derive(Debug, Serialize, Deserialize)]
struct QueuedRequest {
    id: Uuid,
    request: AgentRequest,
}

/// Channel to an agent polling a Redis request list.
#[derive(Debug, Clone)]
pub struct RedisChannel {
    client: redis::Client,
    node: String,
}

impl RedisChannel {
    pub fn new(client: redis::Client, node: impl Into<String>) -> Self {
        Self {
            client,
            node: node.into(),
        }
    }
}

#[async_trait]
impl Channel for RedisChannel {
    fn node_name(&self) -> &str {
        &self.node
    }

    async fn exchange(&self, request: AgentRequest) -> Result<AgentReply, TransportError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let id = Uuid::new_v4();
        let serialized = serde_json::to_string(&QueuedRequest { id, request })?;
        let _: () = conn.lpush(request_key(&self.node), serialized).await?;

        // Poll in short BRPOP rounds; the overall wait is unbounded unless the caller adds a deadline.
        let key = reply_key(id);
        loop {
            let result: Option<(String, String)> = conn.brpop(&key, 1.0).await?;
            if let Some((_, reply_json)) = result {
                return Ok(serde_json::from_str(&reply_json)?);
            }
        }
    }
}

/// Agent main loop for the Redis transport. Runs until the connection fails.
pub async fn serve_redis(agent: Agent, client: redis::Client) -> Result<(), TransportError> {
    let mut conn = client.get_multiplexed_async_connection().await?;
    let queue = request_key(agent.name());
    info!(
        node = %agent.name(),
        queue = %queue,
        workspace = %agent.workspace().display(),
        "Agent ready. Waiting for requests..."
    );

    loop {
        let result: Option<(String, String)> = conn.brpop(&queue, 1.0).await?;
        let Some((_, raw)) = result else {
            continue;
        };

        let queued: QueuedRequest = match serde_json::from_str(&raw) {
            Ok(q) => q,
            Err(e) => {
                error!(node = %agent.name(), error = %e, "Dropping malformed request");
                continue;
            }
        };

        let reply = agent.handle(queued.request).await;
        let reply_json = serde_json::to_string(&reply)?;
        let key = reply_key(queued.id);
        let _: () = conn.lpush(&key, reply_json).await?;
        let expiry: redis::RedisResult<()> = conn.expire(&key, REPLY_TTL_SECS).await;
        if let Err(e) = expiry {
            warn!(key = %key, error = %e, "Cannot set reply expiry");
        }
    }
}
