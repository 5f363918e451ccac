use clap::Parser;

use pipeboard::auth::AuthHandle;
use pipeboard::cli::{self, App, Cli};
use pipeboard::config::{Config, OutputConfig};
use pipeboard::crm::Session;
use pipeboard::term::{self, NoticeLevel};

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pipeboard=warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if output.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, config: &Config, offline: bool) -> anyhow::Result<()> {
    let (store, auth_service) = cli::backends(config, offline)?;
    let auth = AuthHandle::new(auth_service);

    if cli::execute_auth(&cli.command, &auth, &config.output).await? {
        return Ok(());
    }

    let user = auth.resolve().await?;
    tracing::debug!(user = %user.id, offline, "session resolved");

    let app = App {
        session: Session::new(store, user),
        output: config.output.clone(),
    };
    cli::execute(cli.command, &app).await?;

    // Give deferred history entries one last chance; the outbox dies with
    // the process.
    if app.session.pending_history() > 0 {
        let report = app.session.flush_history().await;
        if report.deferred + report.dropped > 0 {
            app_notify(
                &config.output,
                NoticeLevel::Warning,
                &format!(
                    "{} history entries could not be delivered and were lost",
                    report.deferred + report.dropped
                ),
            );
        }
    }
    Ok(())
}

fn app_notify(output: &OutputConfig, level: NoticeLevel, message: &str) {
    term::notify(output.color, level, message);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[error] {e}");
            std::process::exit(2);
        }
    };
    init_tracing(&config.output);

    let offline = cli.offline || config.store.offline;
    let output = config.output.clone();
    if let Err(e) = run(cli, &config, offline).await {
        tracing::error!(error = %e, "command failed");
        app_notify(&output, NoticeLevel::Error, &format!("{e:#}"));
        std::process::exit(1);
    }
}
