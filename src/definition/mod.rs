//! Definition composition engine.
//!
//! Builds the ready-to-submit bundle (ecspresso config + service
//! definition + task definition + resolved cluster) out of profile
//! templates and layered merge patches. Later layers always win: the
//! profile overrides file, then the CLI override strings, then the
//! structural patches derived from the run itself.

mod config;
mod container;
mod document;
mod overrides;
mod service;
mod task;
pub mod template;

use std::path::PathBuf;

use serde_json::json;

pub use config::EcspressoConfig;
pub use container::ContainerDefinition;
pub use document::Document;
pub use overrides::Overrides;
pub use service::ServiceDefinition;
pub use task::{TaskDefinition, FAMILY_PREFIX};

use crate::error::Result;

/// Everything the composer needs besides the per-run arguments: resolved
/// CLI flags and their environment fallbacks. Empty override strings are
/// no-ops throughout.
#[derive(Debug, Clone)]
pub struct DefinitionOpts {
    pub conf_dir: String,
    pub config_files: Vec<String>,
    pub container_def_file: String,
    pub overrides_file: String,
    pub config_overrides: String,
    pub service_overrides: String,
    pub task_overrides: String,
    pub container_overrides: String,
    pub cluster: String,
}

/// The composed bundle, immutable once handed to the lifecycle
/// controller.
#[derive(Debug, Clone)]
pub struct Definition {
    pub ecspresso_config: EcspressoConfig,
    pub service: ServiceDefinition,
    pub task: TaskDefinition,
    pub cluster: String,
}

impl DefinitionOpts {
    pub fn expand_conf_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.conf_dir).into_owned())
    }

    fn profile_dir(&self, profile: &str) -> PathBuf {
        let base = self.expand_conf_dir();

        if profile.is_empty() {
            base
        } else {
            base.join(profile)
        }
    }

    /// Compose the bundle for one run.
    ///
    /// Load order follows the data dependencies: the overrides file seeds
    /// every later layer, the ecspresso config names the service/task
    /// template files, and the resolved container definition is embedded
    /// into the task definition last.
    pub fn load(
        &self,
        profile: &str,
        command: &str,
        image: &str,
        cpu: u64,
        memory: u64,
    ) -> Result<Definition> {
        let conf_dir = self.profile_dir(profile);

        let overrides = Overrides::load(&conf_dir.join(&self.overrides_file))?;

        let mut config = EcspressoConfig::load(&conf_dir, &self.config_files)?;
        if let Some(layer) = overrides.layer("ecspresso_config") {
            config.patch(&layer)?;
        }
        if !self.cluster.is_empty() {
            config.patch(&json!({ "cluster": self.cluster }).to_string())?;
        }
        config.patch(&self.config_overrides)?;

        let service_def_file = config.service_definition_file();
        let task_def_file = config.task_definition_file();

        let mut service = ServiceDefinition::load(&conf_dir.join(&service_def_file))?;
        if let Some(layer) = overrides.layer("service_definition") {
            service.patch(&layer)?;
        }
        service.patch(&self.service_overrides)?;

        let mut container = ContainerDefinition::load(
            &conf_dir.join(&self.container_def_file),
            &conf_dir.join(&task_def_file),
        )?;
        if let Some(layer) = overrides.layer("container_definition") {
            container.patch(&layer, "", "")?;
        }
        container.patch(&self.container_overrides, command, image)?;

        let mut task = TaskDefinition::load(&conf_dir.join(&task_def_file))?;
        if let Some(layer) = overrides.layer("task_definition") {
            task.patch(&layer, None, 0, 0)?;
        }
        task.patch(&self.task_overrides, Some(&container), cpu, memory)?;

        let cluster = config.get("cluster").unwrap_or_default();

        Ok(Definition {
            ecspresso_config: config,
            service,
            task,
            cluster,
        })
    }
}

impl Definition {
    /// Render the bundle the way it is handed off: the config as YAML,
    /// the two definitions as pretty JSON.
    pub fn render(&self) -> String {
        let config_yaml = self
            .ecspresso_config
            .document()
            .to_yaml()
            .unwrap_or_else(|_| self.ecspresso_config.document().pretty_json());

        format!(
            "# ecspresso config\n{}\n# ECS service definition\n{}\n\n# ECS task definition\n{}\n",
            config_yaml.trim_end(),
            self.service.document().pretty_json(),
            self.task.document().pretty_json(),
        )
    }

    pub fn print(&self) {
        println!("{}", self.render());
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

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

    fn seed_profile(dir: &Path) {
        fs::write(
            dir.join("ecspresso.yml"),
            "cluster: template-cluster\nservice_definition: ecs-service-def.json\ntask_definition: ecs-task-def.json\n",
        )
        .unwrap();
        fs::write(
            dir.join("ecs-service-def.json"),
            r#"{"launchType": "FARGATE"}"#,
        )
        .unwrap();
        fs::write(
            dir.join("ecs-task-def.json"),
            r#"{
                "family": "app",
                "cpu": "256",
                "containerDefinitions": [
                    {"name": "web", "image": "repo/app:1.0", "logConfiguration": {"logDriver": "awslogs"}}
                ]
            }"#,
        )
        .unwrap();
    }

    #[test]
    fn composes_bundle_from_profile_directory() {
        let dir = TempDir::new().unwrap();
        seed_profile(dir.path());

        let def = opts(dir.path()).load("", "echo hi", ":2.0", 512, 1024).unwrap();

        assert_eq!(def.cluster, "template-cluster");
        assert_eq!(def.task.document().get_str("cpu"), Some("512"));
        assert_eq!(def.task.document().get_str("memory"), Some("1024"));

        let containers = def.task.document().get("containerDefinitions").unwrap();
        assert_eq!(
            *containers,
            json!([{
                "name": "web",
                "image": "repo/app:2.0",
                "command": ["echo", "hi"]
            }])
        );
    }

    #[test]
    fn cluster_flag_beats_overrides_file_beats_template() {
        let dir = TempDir::new().unwrap();
        seed_profile(dir.path());
        fs::write(
            dir.path().join(".sortie.jsonnet"),
            r#"{ ecspresso_config: { cluster: "override-file-cluster" } }"#,
        )
        .unwrap();

        let mut o = opts(dir.path());
        let def = o.load("", "", "", 0, 0).unwrap();
        assert_eq!(def.cluster, "override-file-cluster");

        o.cluster = "flag-cluster".to_string();
        let def = o.load("", "", "", 0, 0).unwrap();
        assert_eq!(def.cluster, "flag-cluster");
    }

    #[test]
    fn profile_selects_subdirectory() {
        let dir = TempDir::new().unwrap();
        let profile_dir = dir.path().join("staging");
        fs::create_dir(&profile_dir).unwrap();
        seed_profile(&profile_dir);

        let def = opts(dir.path()).load("staging", "", "", 0, 0).unwrap();

        assert_eq!(def.cluster, "template-cluster");
    }

    #[test]
    fn overrides_file_layers_every_scope() {
        let dir = TempDir::new().unwrap();
        seed_profile(dir.path());
        fs::write(
            dir.path().join(".sortie.jsonnet"),
            r#"{
                service_definition: { desiredCount: 2 },
                task_definition: { memory: "4096" },
                container_definition: { essential: true },
            }"#,
        )
        .unwrap();

        let def = opts(dir.path()).load("", "", "", 0, 0).unwrap();

        assert_eq!(
            *def.service.document().get("desiredCount").unwrap(),
            json!(2)
        );
        assert_eq!(def.task.document().get_str("memory"), Some("4096"));
        let containers = def.task.document().get("containerDefinitions").unwrap();
        assert_eq!(*containers.get(0).unwrap().get("essential").unwrap(), json!(true));
    }

    #[test]
    fn cli_override_strings_win_over_overrides_file() {
        let dir = TempDir::new().unwrap();
        seed_profile(dir.path());
        fs::write(
            dir.path().join(".sortie.jsonnet"),
            r#"{ task_definition: { memory: "4096" } }"#,
        )
        .unwrap();

        let mut o = opts(dir.path());
        o.task_overrides = r#"{"memory": "8192"}"#.to_string();
        let def = o.load("", "", "", 0, 0).unwrap();

        assert_eq!(def.task.document().get_str("memory"), Some("8192"));
    }

    #[test]
    fn render_labels_all_three_documents() {
        let dir = TempDir::new().unwrap();
        seed_profile(dir.path());

        let def = opts(dir.path()).load("", "", "", 0, 0).unwrap();
        let rendered = def.render();

        assert!(rendered.contains("# ecspresso config"));
        assert!(rendered.contains("# ECS service definition"));
        assert!(rendered.contains("# ECS task definition"));
        assert!(rendered.contains("cluster: template-cluster"));
    }
}
