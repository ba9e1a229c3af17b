pub mod expr;

use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;

/// 脚本求值接口
/// 与具体脚本语言无关，本地执行和远程 Agent 共用
pub trait Evaluator: Send + Sync + Debug {
    /// `resource_roots` are searched in order; an earlier root shadows later ones.
    fn evaluate(
        &self,
        script: &str,
        parameters: &HashMap<String, String>,
        resource_roots: &[PathBuf],
    ) -> Result<Value, EvaluationError>;
}

/// What to run: the script body and either a classpath or a set of named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScriptSpec {
    Classpath {
        body: String,
        /// Relative to the resource base directory. Order and duplicates are kept.
        resource_paths: Vec<String>,
    },
    Parameterized {
        body: String,
        parameters: HashMap<String, String>,
    },
}

impl ScriptSpec {
    pub fn classpath(body: impl Into<String>, resource_paths: Vec<String>) -> Self {
        Self::Classpath {
            body: body.into(),
            resource_paths,
        }
    }

    pub fn parameterized(body: impl Into<String>, parameters: HashMap<String, String>) -> Self {
        Self::Parameterized {
            body: body.into(),
            parameters,
        }
    }

    pub fn resource_paths(&self) -> &[String] {
        match self {
            Self::Classpath { resource_paths, .. } => resource_paths,
            Self::Parameterized { .. } => &[],
        }
    }
}
