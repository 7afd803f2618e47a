use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::definition::DefinitionOpts;

#[derive(Parser)]
#[command(name = "sortie")]
#[command(version, about = "Launch ephemeral ECS tasks from layered definitions", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Profile directory under the config root
    #[arg(short, long, global = true, env = "SORTIE_PROFILE")]
    pub profile: Option<String>,

    /// Config file base dir
    #[arg(short = 'd', long, global = true, env = "SORTIE_CONF_DIR", default_value = "~/.sortie")]
    pub conf_dir: String,

    /// ecspresso config file names, scanned in order (the last existing
    /// name wins)
    #[arg(
        long,
        global = true,
        env = "ECSPRESSO_CONF",
        value_delimiter = ',',
        default_value = "ecspresso.yml,ecspresso.json,ecspresso.jsonnet"
    )]
    pub config: Vec<String>,

    /// ECS container definition file name
    #[arg(
        long,
        global = true,
        env = "SORTIE_CONTAINER_DEF",
        default_value = "ecs-container-def.jsonnet"
    )]
    pub container_def: String,

    /// Overrides file name, evaluated once per profile directory
    #[arg(
        long,
        global = true,
        env = "SORTIE_OVERRIDES_FILE",
        default_value = ".sortie.jsonnet"
    )]
    pub overrides_file: String,

    /// JSON/YAML string that overrides the ecspresso config
    #[arg(short = 'e', long, global = true)]
    pub config_overrides: Option<String>,

    /// JSON/YAML string that overrides the ECS service definition
    #[arg(short = 's', long, global = true)]
    pub service_overrides: Option<String>,

    /// JSON/YAML string that overrides the ECS task definition
    #[arg(short = 't', long, global = true)]
    pub task_overrides: Option<String>,

    /// JSON/YAML string that overrides the ECS container definition
    #[arg(short = 'c', long, global = true)]
    pub container_overrides: Option<String>,

    /// ECS cluster name
    #[arg(long, global = true, env = "SORTIE_CLUSTER")]
    pub cluster: Option<String>,

    /// ecspresso command path
    #[arg(long, global = true, env = "ECSPRESSO_CMD", default_value = "ecspresso")]
    pub ecspresso_cmd: String,

    /// Options passed through to ecspresso
    #[arg(short = 'X', long, global = true, env = "ECSPRESSO_OPTS", default_value = "")]
    pub ecspresso_opts: String,

    /// Print the composed bundle instead of submitting it
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an ECS task and wait until it stops
    Run {
        /// Command to run on the container
        #[arg(long)]
        command: Option<String>,

        /// Container image
        #[arg(long)]
        image: Option<String>,

        /// Task CPU override (0 keeps the template value)
        #[arg(long, default_value_t = 0)]
        cpu: u64,

        /// Task memory override (0 keeps the template value)
        #[arg(long, default_value_t = 0)]
        memory: u64,
    },

    /// Run an ECS task and open an interactive shell on the container
    Exec {
        /// Command to run on the container
        #[arg(long, env = "SORTIE_EXEC_COMMAND", default_value = "bash")]
        command: String,

        /// Container image
        #[arg(
            long,
            env = "SORTIE_EXEC_IMAGE",
            default_value = "public.ecr.aws/lts/ubuntu:latest"
        )]
        image: String,

        /// Use the task definition's own image
        #[arg(long)]
        use_task_image: bool,

        /// Leave the task running on exit
        #[arg(long)]
        skip_stop: bool,

        /// Task CPU override (0 keeps the template value)
        #[arg(long, default_value_t = 0)]
        cpu: u64,

        /// Task memory override (0 keeps the template value)
        #[arg(long, default_value_t = 0)]
        memory: u64,
    },

    /// Forward a local port to a remote host through a relay task
    PortForward {
        /// Remote host to forward to
        #[arg(short = 'H', long)]
        remote_host: String,

        /// Remote port
        #[arg(short = 'r', long)]
        remote_port: u16,

        /// Local port
        #[arg(short = 'l', long)]
        local_port: u16,

        /// Relay container image
        #[arg(long, env = "SORTIE_RELAY_IMAGE", default_value = "alpine/socat")]
        image: String,

        /// Task CPU override (0 keeps the template value)
        #[arg(long, default_value_t = 0)]
        cpu: u64,

        /// Task memory override (0 keeps the template value)
        #[arg(long, default_value_t = 0)]
        memory: u64,
    },

    /// List profiles
    Profiles,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn definition_opts(&self) -> DefinitionOpts {
        DefinitionOpts {
            conf_dir: self.conf_dir.clone(),
            config_files: self.config.clone(),
            container_def_file: self.container_def.clone(),
            overrides_file: self.overrides_file.clone(),
            config_overrides: self.config_overrides.clone().unwrap_or_default(),
            service_overrides: self.service_overrides.clone().unwrap_or_default(),
            task_overrides: self.task_overrides.clone().unwrap_or_default(),
            container_overrides: self.container_overrides.clone().unwrap_or_default(),
            cluster: self.cluster.clone().unwrap_or_default(),
        }
    }
}
