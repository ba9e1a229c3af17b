use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use dynparam::cluster::jobs::JobRegistry;
use dynparam::cluster::{InMemoryNodeRegistry, Label};
use dynparam::config::DynamicParameterConfig;
use dynparam::dispatch::Dispatcher;
use dynparam::parameters::catalog::InMemoryScriptCatalog;
use dynparam::parameters::{ParameterContext, ValueKind};
use dynparam::remote::agent::Agent;
use dynparam::remote::redis_channel::{RedisChannel, serve_redis};
use dynparam::resources::classpath::autocomplete_class_path;
use dynparam::resources::store::ResourceStore;
use dynparam::script::expr::ExprEvaluator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration YAML file
    #[arg(long, short, global = true, default_value = "dynamic_parameter/config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the value of a job parameter
    Value {
        /// Path to the jobs YAML file
        #[arg(long)]
        jobs: PathBuf,

        /// Path to the script catalog YAML file
        #[arg(long)]
        scripts: Option<PathBuf>,

        /// Job name
        #[arg(long)]
        job: String,

        /// Parameter name
        #[arg(long)]
        parameter: String,

        /// Redis connection URL used to reach worker nodes
        #[arg(long)]
        redis: Option<String>,

        /// Worker node (name=label1,label2), reached through Redis
        #[arg(long = "node", value_parser = parse_node)]
        nodes: Vec<(String, Vec<Label>)>,
    },

    /// Run a worker node answering requests from Redis
    Agent {
        /// Redis connection URL
        #[arg(long, default_value = "redis://127.0.0.1:6379/0")]
        redis: String,

        /// Node name
        #[arg(long)]
        name: String,

        /// Directory receiving staged classpaths
        #[arg(long, default_value = ".")]
        workspace: PathBuf,
    },

    /// List classpath directories, or complete a partially typed classpath
    Classpath {
        /// Partially typed, comma separated classpath
        #[arg(long)]
        complete: Option<String>,
    },
}

fn parse_node(s: &str) -> Result<(String, Vec<Label>), String> {
    let (name, labels) = s.split_once('=').unwrap_or((s, ""));
    if name.trim().is_empty() {
        return Err(format!("invalid node `{}`: missing name", s));
    }
    let labels = labels
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Label::new)
        .collect();
    Ok((name.trim().to_string(), labels))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = DynamicParameterConfig::load_or_default(&cli.config);

    match cli.command {
        Commands::Value {
            jobs,
            scripts,
            job,
            parameter,
            redis,
            nodes,
        } => {
            let registry = Arc::new(JobRegistry::new());
            let count = registry.load_from_yaml(&jobs)?;
            info!("Loaded {} jobs from {:?}", count, jobs);

            let catalog = InMemoryScriptCatalog::new();
            if let Some(path) = scripts {
                let count = catalog.load_from_yaml(&path)?;
                info!("Loaded {} catalog scripts from {:?}", count, path);
            }

            let node_registry = Arc::new(InMemoryNodeRegistry::new());
            let client = redis.map(redis::Client::open).transpose()?;
            for (name, labels) in nodes {
                node_registry.add_node(&name, labels);
                if let Some(client) = &client {
                    node_registry.connect(&name, Arc::new(RedisChannel::new(client.clone(), name.clone())));
                }
            }

            let job_config = registry.job(&job).ok_or_else(|| anyhow!("Job not found: {}", job))?;
            let definition = job_config
                .parameter(&parameter)
                .ok_or_else(|| anyhow!("Parameter `{}` not found in job `{}`", parameter, job))?;

            let dispatcher = Dispatcher::new(config, Arc::new(ExprEvaluator::new()), registry.clone(), node_registry);
            let ctx = ParameterContext {
                dispatcher: &dispatcher,
                catalog: &catalog,
            };

            match definition.kind {
                ValueKind::String => {
                    let value = definition.default_value(&ctx).await;
                    println!("{}", value.value);
                }
                ValueKind::Choice => {
                    for choice in definition.choices(&ctx).await {
                        println!("{}", choice);
                    }
                }
            }
        }

        Commands::Agent { redis, name, workspace } => {
            info!("[{}] Starting agent... Redis: {}", name, redis);
            let client = redis::Client::open(redis)?;
            let agent = Agent::new(name, workspace, Arc::new(ExprEvaluator::new()));
            serve_redis(agent, client).await?;
        }

        Commands::Classpath { complete } => {
            let store = ResourceStore::from_config(&config);
            let entries = match complete {
                Some(value) => autocomplete_class_path(&store, &value),
                None => store.list_classpath_dirs(),
            };
            for entry in entries {
                println!("{}", entry);
            }
        }
    }

    Ok(())
}
