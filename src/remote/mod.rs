pub mod agent;
pub mod envelope;
pub mod protocol;
pub mod redis_channel;

use crate::error::TransportError;
use crate::remote::envelope::RemoteCallEnvelope;
use crate::remote::protocol::{AgentReply, AgentRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// 节点通信通道
/// 实现者只需提供一次请求-应答交换，其余操作由默认方法组合
#[async_trait]
pub trait Channel: Send + Sync + Debug {
    fn node_name(&self) -> &str;

    /// One request, one reply. Blocks until the node answers or the transport fails.
    async fn exchange(&self, request: AgentRequest) -> Result<AgentReply, TransportError>;

    async fn call(&self, envelope: RemoteCallEnvelope) -> Result<Value, TransportError> {
        match self.exchange(AgentRequest::Call { envelope }).await? {
            AgentReply::Value { value } => Ok(value),
            AgentReply::Failed { message } => Err(TransportError::RemoteFailure(message)),
            other => Err(self.unexpected(other)),
        }
    }

    /// Absolute form of `path` on the node.
    async fn resolve_path(&self, path: &Path) -> Result<PathBuf, TransportError> {
        let request = AgentRequest::ResolvePath {
            path: path.to_path_buf(),
        };
        match self.exchange(request).await? {
            AgentReply::Path { path } => Ok(path),
            AgentReply::Failed { message } => Err(TransportError::RemoteFailure(message)),
            other => Err(self.unexpected(other)),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), TransportError> {
        let request = AgentRequest::CreateDir {
            path: path.to_path_buf(),
        };
        self.expect_done(request).await
    }

    /// Writes a file, creating missing parents and replacing existing content.
    async fn write_file(&self, path: &Path, contents: Vec<u8>) -> Result<(), TransportError> {
        let request = AgentRequest::WriteFile {
            path: path.to_path_buf(),
            contents,
        };
        self.expect_done(request).await
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), TransportError> {
        let request = AgentRequest::RemoveDir {
            path: path.to_path_buf(),
        };
        self.expect_done(request).await
    }

    async fn expect_done(&self, request: AgentRequest) -> Result<(), TransportError> {
        match self.exchange(request).await? {
            AgentReply::Done => Ok(()),
            AgentReply::Failed { message } => Err(TransportError::RemoteFailure(message)),
            other => Err(self.unexpected(other)),
        }
    }

    fn unexpected(&self, reply: AgentReply) -> TransportError {
        TransportError::UnexpectedReply {
            node: self.node_name().to_string(),
            reply: format!("{:?}", reply),
        }
    }
}
