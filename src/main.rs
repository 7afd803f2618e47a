use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use console::style;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sortie::aws::AwsCliDriver;
use sortie::cli::{Cli, Commands};
use sortie::error::{Result, SortieError};
use sortie::lifecycle::TaskLifecycle;
use sortie::process::interrupt_token;
use sortie::profiles;
use sortie::runner::Ecspresso;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(SortieError::Interrupted) => ExitCode::from(130),
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sortie=debug")
    } else {
        EnvFilter::new("sortie=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = cli.definition_opts();
    let profile = cli.profile.clone().unwrap_or_default();

    match &cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "sortie", &mut std::io::stdout());
            Ok(())
        }

        Commands::Profiles => {
            println!("# conf-dir: {}", cli.conf_dir);
            for name in profiles::list(&opts.expand_conf_dir())? {
                println!("{name}");
            }
            Ok(())
        }

        Commands::Run {
            command,
            image,
            cpu,
            memory,
        } => {
            let def = opts.load(
                &profile,
                command.as_deref().unwrap_or_default(),
                image.as_deref().unwrap_or_default(),
                *cpu,
                *memory,
            )?;

            let cancel = interrupt_token();
            lifecycle(&cli).run(&def, &cancel).await
        }

        Commands::Exec {
            command,
            image,
            use_task_image,
            skip_stop,
            cpu,
            memory,
        } => {
            let image = if *use_task_image { "" } else { image.as_str() };
            let def = opts.load(&profile, "sleep infinity", image, *cpu, *memory)?;

            let cancel = interrupt_token();
            lifecycle(&cli).exec(&def, command, *skip_stop, &cancel).await
        }

        Commands::PortForward {
            remote_host,
            remote_port,
            local_port,
            image,
            cpu,
            memory,
        } => {
            // The relay container listens on the remote port and forwards
            // connections to the actual remote host.
            let relay_command =
                format!("TCP-LISTEN:{remote_port},fork,reuseaddr TCP:{remote_host}:{remote_port}");
            let def = opts.load(&profile, &relay_command, image, *cpu, *memory)?;

            let cancel = interrupt_token();
            lifecycle(&cli)
                .port_forward(&def, *remote_port, *local_port, &cancel)
                .await
        }
    }
}

fn lifecycle(cli: &Cli) -> TaskLifecycle {
    let runner = Ecspresso::new(cli.ecspresso_cmd.clone(), cli.ecspresso_opts.clone());

    TaskLifecycle::new(Box::new(runner), Arc::new(AwsCliDriver::new()), cli.dry_run)
}
