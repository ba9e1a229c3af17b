use dynparam::cluster::jobs::{Job, JobRegistry};
use dynparam::cluster::{InMemoryNodeRegistry, Label};
use dynparam::config::DynamicParameterConfig;
use dynparam::dispatch::{Dispatcher, ExecutionPolicy};
use dynparam::parameters::{DynamicParameter, ValueKind};
use dynparam::remote::agent::Agent;
use dynparam::remote::redis_channel::{RedisChannel, serve_redis};
use dynparam::script::ScriptSpec;
use dynparam::script::expr::ExprEvaluator;
use redis::Client;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

fn get_redis_client() -> Client {
    let url = std::env::var("DYNPARAM_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/6".to_string());
    redis::Client::open(url).expect("Invalid Redis URL")
}

#[tokio::test]
#[ignore] // needs a running Redis server
async fn test_redis_remote_execution() {
    let client = get_redis_client();
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");
    let _: () = redis::cmd("FLUSHDB")
        .query_async(&mut conn)
        .await
        .expect("Failed to flush db");

    let controller = tempfile::tempdir().expect("Failed to create temp dir");
    let worker = tempfile::tempdir().expect("Failed to create temp dir");
    fs::create_dir_all(controller.path().join("lib")).unwrap();
    fs::write(controller.path().join("lib/targets.expr"), r#"("staging", "production")"#).unwrap();

    let agent = Agent::new("redis-node", worker.path(), Arc::new(ExprEvaluator::new()));
    let agent_client = client.clone();
    let agent_task = tokio::spawn(async move { serve_redis(agent, agent_client).await });

    let parameter = DynamicParameter::inline("target", ValueKind::Choice, "targets").with_remote(true);
    let id = parameter.uuid();
    let jobs = Arc::new(JobRegistry::new());
    jobs.save_job(Job::new("deploy").with_label("linux").with_parameter(parameter));

    let nodes = Arc::new(InMemoryNodeRegistry::new());
    nodes.add_node("redis-node", vec![Label::new("linux")]);
    nodes.connect("redis-node", Arc::new(RedisChannel::new(client.clone(), "redis-node")));

    let mut config = DynamicParameterConfig::with_base_directory(controller.path());
    config.call_timeout_secs = Some(10);
    let dispatcher = Dispatcher::new(config, Arc::new(ExprEvaluator::new()), jobs, nodes);

    let spec = ScriptSpec::classpath("targets", vec!["lib".to_string()]);
    let value = tokio::time::timeout(
        Duration::from_secs(20),
        dispatcher.generate_value("target", &ExecutionPolicy::remote(id), &spec),
    )
    .await
    .expect("Remote execution timed out")
    .unwrap();

    assert_eq!(value, json!(["staging", "production"]));
    assert!(worker.path().join("dynamic_parameter_classpath/lib/targets.expr").is_file());

    agent_task.abort();
}
