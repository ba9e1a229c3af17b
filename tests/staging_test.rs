use dynparam::error::StagingError;
use dynparam::remote::agent::Agent;
use dynparam::resources::stager::ResourceStager;
use dynparam::resources::store::ResourceStore;
use dynparam::script::expr::ExprEvaluator;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_stage_copies_trees_in_order() {
    let controller = tempfile::tempdir().expect("Failed to create temp dir");
    let worker = tempfile::tempdir().expect("Failed to create temp dir");
    write(controller.path(), "A/top.expr", "1");
    write(controller.path(), "A/nested/deeper/inner.txt", "inner");
    write(controller.path(), "B/single.expr", "2");
    fs::create_dir_all(controller.path().join("A/empty")).unwrap();

    let running = Agent::new("n1", worker.path(), Arc::new(ExprEvaluator::new())).spawn(8);
    let channel = running.channel();
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));

    let handles = stager
        .stage(channel.as_ref(), &["A".to_string(), "B".to_string()], Path::new("staging"))
        .await
        .expect("Staging failed");

    let staging = worker.path().join("staging");
    assert_eq!(handles.len(), 2);
    assert_eq!(handles[0].path(), staging.join("A"));
    assert_eq!(handles[1].path(), staging.join("B"));

    assert_eq!(fs::read_to_string(staging.join("A/top.expr")).unwrap(), "1");
    assert_eq!(fs::read_to_string(staging.join("A/nested/deeper/inner.txt")).unwrap(), "inner");
    assert!(staging.join("A/empty").is_dir());
    assert_eq!(fs::read_to_string(staging.join("B/single.expr")).unwrap(), "2");
}

#[tokio::test]
async fn test_restaging_overwrites_remote_copy() {
    let controller = tempfile::tempdir().unwrap();
    let worker = tempfile::tempdir().unwrap();
    write(controller.path(), "lib/value.expr", "1");

    let running = Agent::new("n1", worker.path(), Arc::new(ExprEvaluator::new())).spawn(8);
    let channel = running.channel();
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));
    let paths = vec!["lib".to_string()];

    stager.stage(channel.as_ref(), &paths, Path::new("staging")).await.unwrap();
    write(controller.path(), "lib/value.expr", "2");
    stager.stage(channel.as_ref(), &paths, Path::new("staging")).await.unwrap();

    let staged = worker.path().join("staging/lib/value.expr");
    assert_eq!(fs::read_to_string(staged).unwrap(), "2");
}

#[tokio::test]
async fn test_missing_resource_aborts_staging() {
    let controller = tempfile::tempdir().unwrap();
    let worker = tempfile::tempdir().unwrap();
    write(controller.path(), "A/a.expr", "1");

    let running = Agent::new("n1", worker.path(), Arc::new(ExprEvaluator::new())).spawn(8);
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));

    let result = stager
        .stage(
            running.channel().as_ref(),
            &["A".to_string(), "missing".to_string()],
            Path::new("staging"),
        )
        .await;

    assert!(matches!(result, Err(StagingError::MissingResource(path)) if path.ends_with("missing")));
}

#[tokio::test]
async fn test_escaping_resource_path_is_refused() {
    let controller = tempfile::tempdir().unwrap();
    let worker = tempfile::tempdir().unwrap();

    let running = Agent::new("n1", worker.path(), Arc::new(ExprEvaluator::new())).spawn(8);
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));

    let result = stager
        .stage(running.channel().as_ref(), &["../outside".to_string()], Path::new("staging"))
        .await;

    assert!(matches!(result, Err(StagingError::Resource(_))));
}

#[tokio::test]
async fn test_clean_removes_staging_root() {
    let controller = tempfile::tempdir().unwrap();
    let worker = tempfile::tempdir().unwrap();
    write(controller.path(), "lib/a.expr", "1");

    let running = Agent::new("n1", worker.path(), Arc::new(ExprEvaluator::new())).spawn(8);
    let channel = running.channel();
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));

    stager.stage(channel.as_ref(), &["lib".to_string()], Path::new("run-1")).await.unwrap();
    assert!(worker.path().join("run-1/lib/a.expr").is_file());

    stager.clean(channel.as_ref(), Path::new("run-1")).await.unwrap();
    assert!(!worker.path().join("run-1").exists());

    // cleaning twice is fine
    stager.clean(channel.as_ref(), Path::new("run-1")).await.unwrap();
}

#[tokio::test]
async fn test_agent_refuses_paths_outside_workspace() {
    let controller = tempfile::tempdir().unwrap();
    let worker = tempfile::tempdir().unwrap();
    write(controller.path(), "lib/a.expr", "1");

    let running = Agent::new("n1", worker.path(), Arc::new(ExprEvaluator::new())).spawn(8);
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));

    let result = stager
        .stage(running.channel().as_ref(), &["lib".to_string()], Path::new("../escape"))
        .await;

    assert!(matches!(result, Err(StagingError::Transport(_))));
}

#[tokio::test]
async fn test_workspace_with_parent_components_accepts_staging() {
    let root = tempfile::tempdir().unwrap();
    let controller = tempfile::tempdir().unwrap();
    write(controller.path(), "lib/a.expr", "1");
    fs::create_dir_all(root.path().join("cwd")).unwrap();

    let workspace = root.path().join("cwd/../agent");
    let agent = Agent::new("n1", &workspace, Arc::new(ExprEvaluator::new()));
    assert_eq!(agent.workspace(), root.path().join("agent"));

    let running = agent.spawn(8);
    let stager = ResourceStager::new(ResourceStore::new(controller.path()));
    let handles = stager
        .stage(
            running.channel().as_ref(),
            &["lib".to_string()],
            Path::new("dynamic_parameter_classpath"),
        )
        .await
        .expect("Staging into a workspace given with `..` failed");

    let staged = root.path().join("agent/dynamic_parameter_classpath/lib");
    assert_eq!(handles[0].path(), staged);
    assert!(staged.join("a.expr").is_file());
}
