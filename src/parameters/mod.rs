pub mod catalog;
pub mod value;

use crate::dispatch::{Dispatcher, ExecutionPolicy};
use crate::error::ParameterError;
use crate::parameters::catalog::ScriptCatalog;
use crate::parameters::value::{ParameterValue, to_choices, to_display_string};
use crate::resources::classpath::parse_class_path;
use crate::script::ScriptSpec;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptParameter {
    pub name: String,
    pub value: String,
}

impl ScriptParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What the build receives from the script result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Choice,
}

/// Where the script text comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScriptSource {
    /// Script written into the job, optionally with a comma separated classpath.
    Inline {
        script: String,
        #[serde(default)]
        class_path: String,
    },
    /// Script taken from the shared catalog, with job-specific parameter values.
    Catalog {
        script_id: String,
        #[serde(default)]
        parameters: Vec<ScriptParameter>,
    },
}

/// Collaborators a parameter needs to produce its value.
#[derive(Clone, Copy)]
pub struct ParameterContext<'a> {
    pub dispatcher: &'a Dispatcher,
    pub catalog: &'a dyn ScriptCatalog,
}

/// 动态参数定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Uuid::new_v4", deserialize_with = "deserialize_uuid")]
    uuid: Uuid,
    #[serde(default)]
    pub remote: bool,
    pub kind: ValueKind,
    #[serde(flatten)]
    pub source: ScriptSource,
}

impl DynamicParameter {
    pub fn new(name: impl Into<String>, kind: ValueKind, source: ScriptSource) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            uuid: Uuid::new_v4(),
            remote: false,
            kind,
            source,
        }
    }

    pub fn inline(name: impl Into<String>, kind: ValueKind, script: impl Into<String>) -> Self {
        Self::new(
            name,
            kind,
            ScriptSource::Inline {
                script: script.into(),
                class_path: String::new(),
            },
        )
    }

    pub fn from_catalog(
        name: impl Into<String>,
        kind: ValueKind,
        script_id: impl Into<String>,
        parameters: Vec<ScriptParameter>,
    ) -> Self {
        Self::new(
            name,
            kind,
            ScriptSource::Catalog {
                script_id: script_id.into(),
                parameters,
            },
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Sets the classpath of an inline script; catalog scripts have none.
    pub fn with_class_path(mut self, value: impl Into<String>) -> Self {
        if let ScriptSource::Inline { class_path, .. } = &mut self.source {
            *class_path = value.into();
        }
        self
    }

    /// Empty means "generate a fresh identity".
    pub fn with_uuid(mut self, raw: &str) -> Result<Self, ParameterError> {
        self.uuid = parse_uuid(raw)?;
        Ok(self)
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn policy(&self) -> ExecutionPolicy {
        if self.remote {
            ExecutionPolicy::remote(self.uuid)
        } else {
            ExecutionPolicy::local(self.uuid)
        }
    }

    pub fn class_path_list(&self) -> Vec<String> {
        match &self.source {
            ScriptSource::Inline { class_path, .. } => parse_class_path(class_path),
            ScriptSource::Catalog { .. } => Vec::new(),
        }
    }

    /// Resolves the script to run. Job values win over catalog defaults.
    pub fn script_spec(&self, catalog: &dyn ScriptCatalog) -> Result<ScriptSpec, ParameterError> {
        match &self.source {
            ScriptSource::Inline { script, .. } => Ok(ScriptSpec::classpath(script.clone(), self.class_path_list())),
            ScriptSource::Catalog { script_id, parameters } => {
                let entry = catalog
                    .script(script_id)
                    .ok_or_else(|| ParameterError::UnknownScript(script_id.clone()))?;

                let mut values: HashMap<String, String> = parameters
                    .iter()
                    .map(|p| (p.name.clone(), p.value.clone()))
                    .collect();
                for default in entry.parameters {
                    values.entry(default.name).or_insert(default.value);
                }
                Ok(ScriptSpec::parameterized(entry.script, values))
            }
        }
    }

    /// Raw script result. Fails only when the script cannot be found or fails on the controller.
    pub async fn generate_value(&self, ctx: &ParameterContext<'_>) -> Result<Value, ParameterError> {
        let spec = self.script_spec(ctx.catalog)?;
        let value = ctx.dispatcher.generate_value(&self.name, &self.policy(), &spec).await?;
        Ok(value)
    }

    /// Like `generate_value`, but a failure is logged and reads as null.
    async fn value_or_null(&self, ctx: &ParameterContext<'_>) -> Value {
        match self.generate_value(ctx).await {
            Ok(value) => value,
            Err(e) => {
                error!(parameter = %self.name, error = %e, "Cannot generate value for parameter '{}'", self.name);
                Value::Null
            }
        }
    }

    pub async fn choices(&self, ctx: &ParameterContext<'_>) -> Vec<String> {
        to_choices(&self.value_or_null(ctx).await)
    }

    pub async fn default_value(&self, ctx: &ParameterContext<'_>) -> ParameterValue {
        let value = match self.kind {
            ValueKind::String => to_display_string(&self.value_or_null(ctx).await),
            ValueKind::Choice => self.choices(ctx).await.into_iter().next().unwrap_or_default(),
        };
        ParameterValue::new(self.name.clone(), value)
    }

    /// Validates submitted form values. Exactly one value; for choices it must be offered.
    pub async fn create_value(
        &self,
        ctx: &ParameterContext<'_>,
        submitted: &[String],
    ) -> Result<ParameterValue, ParameterError> {
        let [value] = submitted else {
            return Err(ParameterError::WrongValueCount {
                name: self.name.clone(),
                count: submitted.len(),
            });
        };

        if self.kind == ValueKind::Choice && !self.choices(ctx).await.contains(value) {
            return Err(ParameterError::InvalidChoice {
                name: self.name.clone(),
                value: value.clone(),
            });
        }
        Ok(ParameterValue::new(self.name.clone(), value.clone()))
    }
}

pub fn parse_uuid(raw: &str) -> Result<Uuid, ParameterError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Uuid::new_v4());
    }
    Uuid::parse_str(trimmed).map_err(|_| ParameterError::InvalidUuid(raw.to_string()))
}

fn deserialize_uuid<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_uuid(&raw).map_err(serde::de::Error::custom)
}
