use crate::error::TransportError;
use crate::remote::Channel;
use crate::remote::protocol::{AgentReply, AgentRequest};
use crate::script::Evaluator;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Worker-side endpoint: owns a workspace directory and an evaluator, answers agent requests.
#[derive(Debug, Clone)]
pub struct Agent {
    name: String,
    workspace: PathBuf,
    evaluator: Arc<dyn Evaluator>,
}

impl Agent {
    pub fn new(name: impl Into<String>, workspace: impl Into<PathBuf>, evaluator: Arc<dyn Evaluator>) -> Self {
        let workspace = workspace.into();
        let workspace = normalize(&std::path::absolute(&workspace).unwrap_or(workspace));
        Self {
            name: name.into(),
            workspace,
            evaluator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub async fn handle(&self, request: AgentRequest) -> AgentReply {
        debug!(node = %self.name, op = request.op(), "Handling agent request");
        match self.try_handle(request).await {
            Ok(reply) => reply,
            Err(message) => {
                error!(node = %self.name, "{}", message);
                AgentReply::Failed { message }
            }
        }
    }

    /// JSON in, JSON out. Undecodable requests get a `Failed` reply.
    pub async fn handle_json(&self, raw: &str) -> String {
        let reply = match serde_json::from_str::<AgentRequest>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => AgentReply::Failed {
                message: format!("Malformed agent request: {}", e),
            },
        };
        serde_json::to_string(&reply).unwrap_or_else(|e| {
            format!(r#"{{"status":"failed","message":"Cannot encode reply: {}"}}"#, e)
        })
    }

    async fn try_handle(&self, request: AgentRequest) -> Result<AgentReply, String> {
        match request {
            AgentRequest::ResolvePath { path } => Ok(AgentReply::Path {
                path: self.locate(&path)?,
            }),
            AgentRequest::CreateDir { path } => {
                let target = self.locate(&path)?;
                fs::create_dir_all(&target)
                    .await
                    .map_err(|e| format!("Cannot create {}: {}", target.display(), e))?;
                Ok(AgentReply::Done)
            }
            AgentRequest::WriteFile { path, contents } => {
                let target = self.locate(&path)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)
                        .await
                        .map_err(|e| format!("Cannot create {}: {}", parent.display(), e))?;
                }
                fs::write(&target, contents)
                    .await
                    .map_err(|e| format!("Cannot write {}: {}", target.display(), e))?;
                Ok(AgentReply::Done)
            }
            AgentRequest::RemoveDir { path } => {
                let target = self.locate(&path)?;
                if target == self.workspace {
                    return Err("Refusing to remove the agent workspace".to_string());
                }
                match fs::remove_dir_all(&target).await {
                    Ok(()) => Ok(AgentReply::Done),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentReply::Done),
                    Err(e) => Err(format!("Cannot remove {}: {}", target.display(), e)),
                }
            }
            AgentRequest::Call { envelope } => {
                let evaluator = self.evaluator.clone();
                let outcome = tokio::task::spawn_blocking(move || envelope.execute(evaluator.as_ref()))
                    .await
                    .map_err(|e| format!("Script task aborted: {}", e))?;
                match outcome {
                    Ok(value) => Ok(AgentReply::Value { value }),
                    Err(e) => Err(e.to_string()),
                }
            }
        }
    }

    /// Workspace-relative (or absolute) path, which must stay inside the workspace.
    fn locate(&self, path: &Path) -> Result<PathBuf, String> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        };

        let resolved = normalize(&joined);
        if resolved.starts_with(&self.workspace) {
            Ok(resolved)
        } else {
            Err(format!("Path {} is outside the agent workspace", path.display()))
        }
    }

    /// Serves requests on a tokio task and hands back the channel leading to it.
    pub fn spawn(self, capacity: usize) -> RunningAgent {
        let (tx, mut rx) = mpsc::channel::<Exchange>(capacity);
        let node = self.name.clone();

        let task = tokio::spawn(async move {
            info!(node = %self.name, workspace = %self.workspace.display(), "Agent started.");
            while let Some((raw, reply_tx)) = rx.recv().await {
                let reply = self.handle_json(&raw).await;
                if reply_tx.send(reply).is_err() {
                    debug!(node = %self.name, "Caller went away before the reply");
                }
            }
            info!(node = %self.name, "Agent stopped.");
        });

        RunningAgent {
            channel: InProcessChannel { node, sender: tx },
            task,
        }
    }
}

type Exchange = (String, oneshot::Sender<String>);

/// Lexical normalization. A `..` that cannot be folded is kept.
fn normalize(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    resolved.push(component);
                }
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// Handle of an agent served on the local runtime.
#[derive(Debug)]
pub struct RunningAgent {
    channel: InProcessChannel,
    task: JoinHandle<()>,
}

impl RunningAgent {
    pub fn channel(&self) -> Arc<dyn Channel> {
        Arc::new(self.channel.clone())
    }

    /// Takes the agent offline; pending and later calls fail as disconnected.
    pub fn stop(&self) {
        self.task.abort();
    }
}

/// Channel to an agent running in the same process. Messages still travel as JSON so the
/// envelope crosses the same boundary as with a real remote node.
#[derive(Debug, Clone)]
pub struct InProcessChannel {
    node: String,
    sender: mpsc::Sender<Exchange>,
}

#[async_trait]
impl Channel for InProcessChannel {
    fn node_name(&self) -> &str {
        &self.node
    }

    async fn exchange(&self, request: AgentRequest) -> Result<AgentReply, TransportError> {
        let raw = serde_json::to_string(&request)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send((raw, reply_tx))
            .await
            .map_err(|_| TransportError::Disconnected(self.node.clone()))?;
        let reply = reply_rx
            .await
            .map_err(|_| TransportError::Disconnected(self.node.clone()))?;
        Ok(serde_json::from_str(&reply)?)
    }
}
