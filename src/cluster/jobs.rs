use crate::cluster::Label;
use crate::parameters::DynamicParameter;
use anyhow::{Context as AnyhowContext, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// Finds the label of the job owning a parameter.
pub trait LabelLookup: Send + Sync {
    fn find_owning_label(&self, parameter_id: Uuid) -> Option<Label>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub parameters: Vec<DynamicParameter>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            parameters: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Label::new(label));
        self
    }

    pub fn with_parameter(mut self, parameter: DynamicParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&DynamicParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Job configurations plus an index from parameter identity to owning job,
/// refreshed whenever a job is saved.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: DashMap<String, Job>,
    owners: DashMap<Uuid, String>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_job(&self, job: Job) {
        if let Some((_, previous)) = self.jobs.remove(&job.name) {
            for parameter in &previous.parameters {
                self.owners.remove_if(&parameter.uuid(), |_, owner| owner == &job.name);
            }
        }

        for parameter in &job.parameters {
            if let Some(other) = self.owners.insert(parameter.uuid(), job.name.clone()) {
                if other != job.name {
                    warn!(
                        parameter = %parameter.name,
                        uuid = %parameter.uuid(),
                        previous_job = %other,
                        job = %job.name,
                        "Parameter identity reused across jobs; the last saved job owns it"
                    );
                }
            }
        }

        self.jobs.insert(job.name.clone(), job);
    }

    pub fn delete_job(&self, name: &str) -> Option<Job> {
        let (_, job) = self.jobs.remove(name)?;
        for parameter in &job.parameters {
            self.owners.remove_if(&parameter.uuid(), |_, owner| owner == name);
        }
        Some(job)
    }

    pub fn job(&self, name: &str) -> Option<Job> {
        self.jobs.get(name).map(|job| job.value().clone())
    }

    pub fn owning_job(&self, parameter_id: Uuid) -> Option<String> {
        self.owners.get(&parameter_id).map(|owner| owner.value().clone())
    }

    pub fn load_from_yaml(&self, file_path: &Path) -> Result<usize> {
        let jobs = load_jobs_from_yaml(file_path)?;
        let count = jobs.len();
        for job in jobs {
            self.save_job(job);
        }
        Ok(count)
    }
}

impl LabelLookup for JobRegistry {
    fn find_owning_label(&self, parameter_id: Uuid) -> Option<Label> {
        let job_name = self.owning_job(parameter_id)?;
        self.jobs.get(&job_name).and_then(|job| job.label.clone())
    }
}

pub fn load_jobs_from_yaml(file_path: &Path) -> Result<Vec<Job>> {
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;

    let jobs: Vec<Job> = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("Failed to deserialize jobs from {}", file_path.display()))?;

    Ok(jobs)
}
