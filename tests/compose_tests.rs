//! End-to-end composition against a realistic profile directory.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use sortie::definition::{DefinitionOpts, FAMILY_PREFIX};
use sortie::error::SortieError;

fn opts(dir: &Path) -> DefinitionOpts {
    DefinitionOpts {
        conf_dir: dir.display().to_string(),
        config_files: vec![
            "ecspresso.yml".to_string(),
            "ecspresso.json".to_string(),
            "ecspresso.jsonnet".to_string(),
        ],
        container_def_file: "ecs-container-def.jsonnet".to_string(),
        overrides_file: ".sortie.jsonnet".to_string(),
        config_overrides: String::new(),
        service_overrides: String::new(),
        task_overrides: String::new(),
        container_overrides: String::new(),
        cluster: String::new(),
    }
}

/// A jsonnet profile close to what real deployments look like: the task
/// template carries two containers with logging and dependency wiring,
/// and there is no dedicated container definition file.
fn seed_jsonnet_profile(dir: &Path) {
    fs::write(
        dir.join("ecspresso.yml"),
        "cluster: ecs-staging\nregion: ap-northeast-1\n",
    )
    .unwrap();
    fs::write(
        dir.join("ecs-service-def.jsonnet"),
        r#"{
            launchType: "FARGATE",
            networkConfiguration: {
                awsvpcConfiguration: { assignPublicIp: "DISABLED" },
            },
        }"#,
    )
    .unwrap();
    fs::write(
        dir.join("ecs-task-def.jsonnet"),
        r#"local name = "batch";
        {
            family: name,
            cpu: "256",
            memory: "512",
            containerDefinitions: [
                {
                    name: name,
                    image: "repo/" + name + ":1.0",
                    logConfiguration: { logDriver: "awslogs" },
                    dependsOn: [{ containerName: "init", condition: "SUCCESS" }],
                },
                { name: "init", image: "repo/init:1.0" },
            ],
        }"#,
    )
    .unwrap();
}

#[test]
fn composes_single_container_bundle_from_jsonnet_templates() {
    let dir = TempDir::new().unwrap();
    seed_jsonnet_profile(dir.path());

    let def = opts(dir.path())
        .load("", "sleep infinity", ":2.0", 0, 0)
        .unwrap();

    assert_eq!(def.cluster, "ecs-staging");

    let family = def.task.document().get_str("family").unwrap();
    assert!(family.starts_with(FAMILY_PREFIX));
    assert!(family.ends_with("-batch"));

    let containers = def.task.document().get("containerDefinitions").unwrap();
    let containers = containers.as_array().unwrap();
    assert_eq!(containers.len(), 1);

    let container = &containers[0];
    assert_eq!(container["image"], json!("repo/batch:2.0"));
    assert_eq!(container["command"], json!(["sleep", "infinity"]));
    assert!(container.get("logConfiguration").is_none());
    assert!(container.get("dependsOn").is_none());
}

#[test]
fn cluster_resolution_follows_the_documented_precedence() {
    let dir = TempDir::new().unwrap();
    seed_jsonnet_profile(dir.path());
    fs::write(
        dir.path().join(".sortie.jsonnet"),
        r#"{ ecspresso_config: { cluster: "B" } }"#,
    )
    .unwrap();

    // Template says ecs-staging, overrides file says B.
    let def = opts(dir.path()).load("", "", "", 0, 0).unwrap();
    assert_eq!(def.cluster, "B");

    // The CLI flag beats both.
    let mut with_flag = opts(dir.path());
    with_flag.cluster = "C".to_string();
    let def = with_flag.load("", "", "", 0, 0).unwrap();
    assert_eq!(def.cluster, "C");
}

#[test]
fn dedicated_container_definition_file_wins_over_derivation() {
    let dir = TempDir::new().unwrap();
    seed_jsonnet_profile(dir.path());
    fs::write(
        dir.path().join("ecs-container-def.jsonnet"),
        r#"{ name: "dedicated", image: "repo/tool:3.0" }"#,
    )
    .unwrap();

    let def = opts(dir.path()).load("", "", "", 0, 0).unwrap();

    let containers = def.task.document().get("containerDefinitions").unwrap();
    assert_eq!(containers[0]["name"], json!("dedicated"));
}

#[test]
fn missing_config_is_not_found_listing_all_candidates() {
    let dir = TempDir::new().unwrap();

    let err = opts(dir.path()).load("", "", "", 0, 0).unwrap_err();

    assert!(matches!(err, SortieError::NotFound { .. }));
    assert!(err
        .to_string()
        .contains("ecspresso.yml,ecspresso.json,ecspresso.jsonnet"));
}

#[test]
fn repeated_composition_is_stable() {
    // Loading twice must not stack the family prefix or mutate templates.
    let dir = TempDir::new().unwrap();
    seed_jsonnet_profile(dir.path());
    let opts = opts(dir.path());

    let first = opts.load("", "", "", 0, 0).unwrap();
    let second = opts.load("", "", "", 0, 0).unwrap();

    assert_eq!(
        first.task.document().get_str("family"),
        second.task.document().get_str("family")
    );
    let family = first.task.document().get_str("family").unwrap();
    assert_eq!(family.matches(FAMILY_PREFIX).count(), 1);
}

#[test]
fn overrides_file_and_cli_strings_layer_in_order() {
    let dir = TempDir::new().unwrap();
    seed_jsonnet_profile(dir.path());
    fs::write(
        dir.path().join(".sortie.jsonnet"),
        r#"{
            task_definition: { memory: "1024", cpu: "512" },
            container_definition: { essential: true },
        }"#,
    )
    .unwrap();

    let mut o = opts(dir.path());
    o.task_overrides = r#"{"memory": "2048"}"#.to_string();
    let def = o.load("", "", "", 0, 0).unwrap();

    // CLI string wins over the overrides file; untouched keys survive.
    assert_eq!(def.task.document().get_str("memory"), Some("2048"));
    assert_eq!(def.task.document().get_str("cpu"), Some("512"));

    let containers = def.task.document().get("containerDefinitions").unwrap();
    assert_eq!(containers[0]["essential"], json!(true));
}
