use crate::remote::envelope::RemoteCallEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Requests understood by an agent. Relative paths are taken against the agent workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum AgentRequest {
    ResolvePath { path: PathBuf },
    CreateDir { path: PathBuf },
    WriteFile { path: PathBuf, contents: Vec<u8> },
    RemoveDir { path: PathBuf },
    Call { envelope: RemoteCallEnvelope },
}

impl AgentRequest {
    pub fn op(&self) -> &'static str {
        match self {
            Self::ResolvePath { .. } => "resolve_path",
            Self::CreateDir { .. } => "create_dir",
            Self::WriteFile { .. } => "write_file",
            Self::RemoveDir { .. } => "remove_dir",
            Self::Call { .. } => "call",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentReply {
    Path { path: PathBuf },
    Done,
    Value { value: Value },
    Failed { message: String },
}
