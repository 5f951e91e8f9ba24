//! Quillblog - a small blog engine

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quillblog::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{SqlxSessionRepository, SqlxUserRepository},
        DynDatabasePool,
    },
    models::CreateUserInput,
    services::{create_mailer, UserService},
};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Parser)]
#[command(name = "quillblog")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.yml", env = "QUILLBLOG_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web server (default)
    Serve,

    /// Apply pending database migrations and exit
    Migrate,

    /// Create a staff account with superuser rights
    CreateSuperuser(SuperuserArgs),
}

#[derive(Debug, Args)]
struct SuperuserArgs {
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    username: String,
    #[arg(long, env = "QUILLBLOG_SUPERUSER_PASSWORD")]
    password: String,
    #[arg(long, default_value = "")]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillblog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_with_env(&cli.config)?;
    config.validate()?;
    tracing::info!("Configuration loaded from {}", cli.config.display());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Migrate => {
            let pool = connect(&config).await?;
            let applied = db::migrations::run_migrations(&pool).await?;
            tracing::info!("{} migration(s) applied", applied);
            Ok(())
        }
        Commands::CreateSuperuser(args) => create_superuser(&config, args).await,
    }
}

async fn connect(config: &Config) -> Result<DynDatabasePool> {
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);
    Ok(pool)
}

async fn serve(config: Config) -> Result<()> {
    let pool = connect(&config).await?;
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let mailer = create_mailer(&config.email)?;
    let state = AppState::new(&config, pool, mailer)?;
    if let Some(path) = &config.theme.path {
        tracing::info!("Templates overridden from {}", path.display());
    }

    {
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(e) = user_service.cleanup_expired_sessions().await {
                    tracing::warn!("Session cleanup failed: {}", e);
                }
            }
        });
    }

    let app = api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn create_superuser(config: &Config, args: SuperuserArgs) -> Result<()> {
    let pool = connect(config).await?;
    db::migrations::run_migrations(&pool).await?;

    let users = UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool),
    );
    let user = users
        .create_superuser(CreateUserInput {
            email: args.email,
            username: args.username,
            password: args.password,
            first_name: args.first_name,
            last_name: args.last_name,
            ..Default::default()
        })
        .await?;

    println!("Superuser {} ({}) created.", user.email, user.username);
    Ok(())
}
