//! Subprocess-backed ecspresso adapter.
//!
//! Each submission writes the composed bundle into a fresh scratch
//! directory (removed on every exit path when the `TempDir` drops) and
//! invokes `ecspresso run` with that directory as the child's working
//! directory.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{Runner, WaitMode};
use crate::definition::Definition;
use crate::error::{Result, SortieError};
use crate::process::{run_captured, run_captured_in, CommandOutput};

const TASK_DEF_FILE: &str = "task-def.json";
const SERVICE_DEF_FILE: &str = "service-def.json";
const CONFIG_FILE: &str = "ecspresso.yml";

pub struct Ecspresso {
    path: String,
    options: String,
}

impl Ecspresso {
    pub fn new(path: impl Into<String>, options: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: options.into(),
        }
    }

    /// Check the binary actually runs before composing anything around it.
    pub async fn preflight(&self, cancel: &CancellationToken) -> Result<()> {
        let argv = vec![self.path.clone(), "version".to_string()];
        let out = run_captured(&argv, true, cancel).await?;

        out.ensure_success(&self.path)
            .map_err(|e| match e {
                SortieError::Interrupted => SortieError::Interrupted,
                e => SortieError::Subprocess {
                    command: self.path.clone(),
                    detail: format!("failed to execute ecspresso: {e}"),
                },
            })
    }

    fn run_argv(&self, mode: WaitMode) -> Result<Vec<String>> {
        let mut argv = vec![self.path.clone(), "run".to_string()];

        let opts = format!("{} {}", self.options, mode.flag());
        let args = shell_words::split(opts.trim())
            .map_err(|e| SortieError::Other(format!("failed to parse runner options: {e}")))?;
        argv.extend(args);

        Ok(argv)
    }
}

#[async_trait]
impl Runner for Ecspresso {
    async fn submit(
        &self,
        def: &Definition,
        mode: WaitMode,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        self.preflight(cancel).await?;

        let scratch = TempDir::with_prefix("sortie-")?;
        write_scratch_configs(scratch.path(), def)?;
        debug!(dir = %scratch.path().display(), "wrote scratch bundle");

        let argv = self.run_argv(mode)?;
        run_captured_in(&argv, Some(scratch.path()), false, cancel).await
    }
}

/// Write the hand-off bundle: the two definitions as JSON plus a config
/// patched to point its template fields at the sibling files just
/// written, rendered as YAML.
pub(crate) fn write_scratch_configs(dir: &Path, def: &Definition) -> Result<()> {
    fs::write(dir.join(TASK_DEF_FILE), def.task.document().to_vec())
        .map_err(|e| SortieError::Other(format!("failed to write ECS task definition: {e}")))?;

    fs::write(dir.join(SERVICE_DEF_FILE), def.service.document().to_vec())
        .map_err(|e| SortieError::Other(format!("failed to write ECS service definition: {e}")))?;

    let mut config = def.ecspresso_config.clone();
    config
        .patch(&format!(
            r#"{{"service_definition":"{SERVICE_DEF_FILE}","task_definition":"{TASK_DEF_FILE}"}}"#
        ))
        .map_err(|e| SortieError::Other(format!("failed to update scratch ecspresso config: {e}")))?;

    let yaml = config.document().to_yaml().map_err(|e| {
        SortieError::Other(format!("failed to convert scratch ecspresso config to yaml: {e}"))
    })?;
    fs::write(dir.join(CONFIG_FILE), yaml)
        .map_err(|e| SortieError::Other(format!("failed to write ecspresso config: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::definition::DefinitionOpts;

    fn composed_definition(dir: &std::path::Path) -> Definition {
        fs::write(dir.join("ecspresso.yml"), "cluster: staging\n").unwrap();
        fs::write(
            dir.join("ecs-service-def.jsonnet"),
            r#"{ launchType: "FARGATE" }"#,
        )
        .unwrap();
        fs::write(
            dir.join("ecs-task-def.jsonnet"),
            r#"{ family: "app", containerDefinitions: [{ name: "web" }] }"#,
        )
        .unwrap();

        DefinitionOpts {
            conf_dir: dir.display().to_string(),
            config_files: vec!["ecspresso.yml".to_string()],
            container_def_file: "ecs-container-def.jsonnet".to_string(),
            overrides_file: ".sortie.jsonnet".to_string(),
            config_overrides: String::new(),
            service_overrides: String::new(),
            task_overrides: String::new(),
            container_overrides: String::new(),
            cluster: String::new(),
        }
        .load("", "", "", 0, 0)
        .unwrap()
    }

    #[test]
    fn scratch_bundle_has_three_files_pointing_at_each_other() {
        let profile = TempDir::new().unwrap();
        let def = composed_definition(profile.path());

        let scratch = TempDir::new().unwrap();
        write_scratch_configs(scratch.path(), &def).unwrap();

        let task: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(scratch.path().join("task-def.json")).unwrap())
                .unwrap();
        assert!(task.get("family").is_some());

        assert!(scratch.path().join("service-def.json").exists());

        let config: serde_json::Value = serde_yaml_bw::from_str(
            &fs::read_to_string(scratch.path().join("ecspresso.yml")).unwrap(),
        )
        .unwrap();
        assert_eq!(config["service_definition"], "service-def.json");
        assert_eq!(config["task_definition"], "task-def.json");
        assert_eq!(config["cluster"], "staging");
    }

    #[test]
    fn wait_mode_appends_the_matching_flag() {
        let runner = Ecspresso::new("ecspresso", "--config custom.yml");

        let argv = runner.run_argv(WaitMode::UntilRunning).unwrap();
        assert_eq!(
            argv,
            vec!["ecspresso", "run", "--config", "custom.yml", "--wait-until=running"]
        );

        let argv = runner.run_argv(WaitMode::UntilStopped).unwrap();
        assert!(argv.contains(&"--wait-until=stopped".to_string()));
    }

    #[test]
    fn empty_options_produce_bare_run_invocation() {
        let runner = Ecspresso::new("ecspresso", "");

        let argv = runner.run_argv(WaitMode::UntilRunning).unwrap();

        assert_eq!(argv, vec!["ecspresso", "run", "--wait-until=running"]);
    }
}
