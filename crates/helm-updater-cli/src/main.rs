mod cli;
mod error;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;

use helm_updater::config::{default_config_path, load_config, EngineKind, RunConfig};
use helm_updater::{
    ChangeEntry, GitCliConnector, KeyEngine, RepositoryLocks, Updater, YamlEngine, YqEngine,
};

use crate::cli::{Cli, Command, RunArgs};
use crate::error::CliError;

/// Outcome of one application, printed as JSON on stdout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationReport {
    application: String,
    changes: Vec<ChangeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn load_run_config(args: RunArgs) -> Result<RunConfig, CliError> {
    let path = args.config.clone().or_else(default_config_path);
    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading run configuration");
            load_config(path)?
        }
        None => RunConfig::default(),
    };

    args.merge_into(&mut config)?;
    Ok(config)
}

fn engine(config: &RunConfig) -> Box<dyn KeyEngine> {
    match config.engine {
        EngineKind::Yaml => Box::new(YamlEngine::new()),
        EngineKind::Yq => Box::new(YqEngine::new(
            config.yq_binary.as_deref().unwrap_or("yq"),
        )),
    }
}

async fn run(args: RunArgs) -> Result<bool, CliError> {
    let config = load_run_config(args)?;
    let requests = config.build_requests()?;

    let updater = Arc::new(Updater::new(
        Arc::new(RepositoryLocks::new()),
        GitCliConnector,
        engine(&config),
    ));

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let updater = Arc::clone(&updater);
            tracing::debug!(
                application = %request.app_name,
                file = %request.file.display(),
                "processing application"
            );
            let app = request.app_name.clone();
            let handle = tokio::task::spawn_blocking(move || updater.run(&request));
            (app, handle)
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    let mut all_ok = true;

    for (app, handle) in handles {
        let result = handle.await.map_err(|e| CliError::Task {
            app: app.clone(),
            message: e.to_string(),
        })?;

        match result {
            Ok(changes) => {
                tracing::info!(application = %app, changes = changes.len(), "application updated");
                reports.push(ApplicationReport {
                    application: app,
                    changes,
                    error: None,
                });
            }
            Err(e) => {
                all_ok = false;
                tracing::error!(application = %app, error = %e, "can not update application");
                reports.push(ApplicationReport {
                    application: app,
                    changes: Vec::new(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(all_ok)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.log_level.as_deref(), cli.log_format) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let outcome = match cli.command {
        Command::Run(args) => run(args).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "helm-updater failed");
            ExitCode::FAILURE
        }
    }
}
