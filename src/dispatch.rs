use crate::cluster::NodeRegistry;
use crate::cluster::jobs::LabelLookup;
use crate::config::{DynamicParameterConfig, StagingLayout};
use crate::error::{DispatchError, EvaluationError, StagingError};
use crate::remote::Channel;
use crate::remote::envelope::RemoteCallEnvelope;
use crate::resources::stager::ResourceStager;
use crate::resources::store::ResourceStore;
use crate::script::{Evaluator, ScriptSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Local,
    Remote,
}

/// Where a parameter's script runs, plus the identity used to find its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    pub mode: ExecutionMode,
    pub parameter_id: Uuid,
}

impl ExecutionPolicy {
    pub fn local(parameter_id: Uuid) -> Self {
        Self {
            mode: ExecutionMode::Local,
            parameter_id,
        }
    }

    pub fn remote(parameter_id: Uuid) -> Self {
        Self {
            mode: ExecutionMode::Remote,
            parameter_id,
        }
    }
}

/// 脚本执行调度器
/// 决定脚本在控制节点还是工作节点执行，远程执行前先同步 classpath
pub struct Dispatcher {
    config: DynamicParameterConfig,
    store: ResourceStore,
    stager: ResourceStager,
    evaluator: Arc<dyn Evaluator>,
    labels: Arc<dyn LabelLookup>,
    nodes: Arc<dyn NodeRegistry>,
}

impl Dispatcher {
    pub fn new(
        config: DynamicParameterConfig,
        evaluator: Arc<dyn Evaluator>,
        labels: Arc<dyn LabelLookup>,
        nodes: Arc<dyn NodeRegistry>,
    ) -> Self {
        let store = ResourceStore::from_config(&config);
        Self {
            stager: ResourceStager::new(store.clone()),
            store,
            config,
            evaluator,
            labels,
            nodes,
        }
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    /// Runs the script where `policy` says and returns its value.
    ///
    /// Only a local evaluation failure is returned as an error. Every failure on the remote path
    /// is logged and yields `Value::Null`, so a null result can mean either "the script returned
    /// nothing" or "the dispatch failed".
    pub async fn generate_value(
        &self,
        parameter_name: &str,
        policy: &ExecutionPolicy,
        spec: &ScriptSpec,
    ) -> Result<Value, EvaluationError> {
        if policy.mode == ExecutionMode::Local {
            return self.execute_locally(parameter_name, spec).await;
        }

        let Some(label) = self.labels.find_owning_label(policy.parameter_id) else {
            warn!(
                parameter = %parameter_name,
                "No label is assigned to project; script for parameter '{}' will be executed on the controller",
                parameter_name
            );
            return self.execute_locally(parameter_name, spec).await;
        };

        let Some(channel) = self.nodes.find_active_channel(&label) else {
            warn!(
                parameter = %parameter_name,
                label = %label,
                "Cannot find an active node of the label '{}' where to execute the script",
                label
            );
            return Ok(Value::Null);
        };

        match self.execute_at(spec, channel.as_ref()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                error!(
                    parameter = %parameter_name,
                    node = %channel.node_name(),
                    error = %e,
                    "Error during executing script for parameter '{}'",
                    parameter_name
                );
                Ok(Value::Null)
            }
        }
    }

    /// Evaluates on a blocking thread; library files are read during evaluation.
    async fn execute_locally(&self, parameter_name: &str, spec: &ScriptSpec) -> Result<Value, EvaluationError> {
        debug!(parameter = %parameter_name, "Executing script on the controller");
        let (body, parameters, roots) = match spec {
            ScriptSpec::Classpath { body, resource_paths } => match self.store.resolve_all(resource_paths) {
                Ok(roots) => (body.clone(), HashMap::new(), roots),
                Err(e) => {
                    error!(parameter = %parameter_name, error = %e, "Cannot access class path");
                    return Ok(Value::Null);
                }
            },
            ScriptSpec::Parameterized { body, parameters } => (body.clone(), parameters.clone(), Vec::new()),
        };

        let evaluator = self.evaluator.clone();
        tokio::task::spawn_blocking(move || evaluator.evaluate(&body, &parameters, &roots))
            .await
            .map_err(|e| EvaluationError::Aborted(e.to_string()))?
    }

    async fn execute_at(&self, spec: &ScriptSpec, channel: &dyn Channel) -> Result<Value, DispatchError> {
        let staging_root = self.staging_root();
        let outcome = match self.prepare_remote_call(spec, channel, &staging_root).await {
            Ok(envelope) => self.send(channel, envelope).await,
            Err(e) => Err(e.into()),
        };

        let staged = !spec.resource_paths().is_empty();
        if staged && self.config.staging_layout == StagingLayout::PerExecution {
            if let Err(e) = self.stager.clean(channel, &staging_root).await {
                warn!(node = %channel.node_name(), error = %e, "Cannot remove staging directory");
            }
        }
        outcome
    }

    /// Builds the envelope for `channel`, staging the classpath first.
    async fn prepare_remote_call(
        &self,
        spec: &ScriptSpec,
        channel: &dyn Channel,
        staging_root: &Path,
    ) -> Result<RemoteCallEnvelope, StagingError> {
        match spec {
            ScriptSpec::Classpath { body, resource_paths } => {
                let handles = self.stager.stage(channel, resource_paths, staging_root).await?;
                Ok(RemoteCallEnvelope::classpath(body.clone(), handles))
            }
            ScriptSpec::Parameterized { body, parameters } => {
                Ok(RemoteCallEnvelope::parameterized(body.clone(), parameters.clone()))
            }
        }
    }

    async fn send(&self, channel: &dyn Channel, envelope: RemoteCallEnvelope) -> Result<Value, DispatchError> {
        let value = match self.config.call_timeout() {
            Some(limit) => timeout(limit, channel.call(envelope))
                .await
                .map_err(|_| DispatchError::Timeout(limit))??,
            None => channel.call(envelope).await?,
        };
        Ok(value)
    }

    fn staging_root(&self) -> PathBuf {
        let shared = PathBuf::from(&self.config.remote_staging_dir);
        match self.config.staging_layout {
            StagingLayout::Shared => shared,
            StagingLayout::PerExecution => shared.join(Uuid::new_v4().to_string()),
        }
    }
}
