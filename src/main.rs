use clap::Parser;
use lity::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lity=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { path, name }) => {
            lity::cli::init::run(path, name).await?;
        }
        Some(Commands::Serve { host, port }) => {
            lity::cli::serve::run(&cli.config, host, port).await?;
        }
        Some(Commands::Migrate) => {
            lity::cli::migrate::run(&cli.config).await?;
        }
        Some(Commands::User { command }) => {
            lity::cli::user::run(&cli.config, command).await?;
        }
        Some(Commands::Seed {
            email,
            username,
            password,
        }) => {
            lity::cli::seed::run(&cli.config, &email, &username, &password).await?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}
