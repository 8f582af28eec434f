use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use sales_web::config::{Environment, Settings};
use sales_web::data::SalesWebContext;
use sales_web::logging::init_logging;
use sales_web::services::SeedingService;
use sales_web::Startup;

#[derive(Parser)]
#[command(name = "sales_web")]
#[command(about = "Sales management web application: departments, sellers and sales records")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to appsettings.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Environment name: Development, Staging or Production
    #[arg(long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (default)
    Serve {
        /// Port to listen on, overriding the settings
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending database migrations and exit
    Migrate,
    /// Apply migrations and insert the default data into an empty database
    Seed,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let environment = match &cli.environment {
        Some(name) => name.parse::<Environment>()?,
        None => Environment::from_env()?,
    };
    let settings = Settings::load(cli.config.as_deref(), environment)
        .with_context(|| format!("Failed to load settings for {environment}"))?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut settings = load_settings(&cli)?;
    let _guard = init_logging(&settings.logging)?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            info!(environment = %settings.environment, "Starting SalesWeb");
            Startup::new(settings).run().await?;
        }
        Commands::Migrate => {
            let context = SalesWebContext::open(&settings.connection_strings.sales_web_context)?;
            let applied = context.migrate().await?;
            info!(applied, "Migrations complete");
        }
        Commands::Seed => {
            let context = SalesWebContext::open(&settings.connection_strings.sales_web_context)?;
            context.migrate().await?;
            if SeedingService::new(context).seed().await? {
                info!("Database seeded");
            } else {
                info!("Database already has data, nothing seeded");
            }
        }
    }

    Ok(())
}
