use crate::error::EvaluationError;
use crate::script::Evaluator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Absolute path of a staged resource on the node that evaluates the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteResourceHandle(PathBuf);

impl RemoteResourceHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

/// 远程调用信封
/// 每次执行新建，发送后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteCallEnvelope {
    Classpath {
        script: String,
        resource_roots: Vec<RemoteResourceHandle>,
    },
    Parameterized {
        script: String,
        parameters: HashMap<String, String>,
    },
}

impl RemoteCallEnvelope {
    pub fn classpath(script: impl Into<String>, resource_roots: Vec<RemoteResourceHandle>) -> Self {
        Self::Classpath {
            script: script.into(),
            resource_roots,
        }
    }

    pub fn parameterized(script: impl Into<String>, parameters: HashMap<String, String>) -> Self {
        Self::Parameterized {
            script: script.into(),
            parameters,
        }
    }

    /// Runs the envelope on the receiving node.
    pub fn execute(&self, evaluator: &dyn Evaluator) -> Result<Value, EvaluationError> {
        match self {
            Self::Classpath {
                script,
                resource_roots,
            } => {
                let roots: Vec<PathBuf> = resource_roots.iter().map(|h| h.path().to_path_buf()).collect();
                evaluator.evaluate(script, &HashMap::new(), &roots)
            }
            Self::Parameterized { script, parameters } => evaluator.evaluate(script, parameters, &[]),
        }
    }
}
