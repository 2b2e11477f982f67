use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use portal_auth::config::{AuthConfig, ConfigError};
use portal_auth::forms::{self, ValidationErrors};
use portal_auth::{
    AuthGateway, FileStorage, Gender, GatewayError, HttpAuthApi, LoginRequest, RegisterRequest, SessionError,
    SessionStore,
};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{message}")]
    Auth {
        message: &'static str,
        #[source]
        source: GatewayError,
    },
    #[error("{0}")]
    Rejected(String),
    #[error("session storage failed: {0}")]
    Session(#[from] SessionError),
    #[error("not signed in")]
    NotSignedIn,
}

#[derive(Parser, Debug)]
#[command(name = "portal-auth", about = "Sign in to the portal API and manage the local session")]
struct Cli {
    /// Overrides `PORTAL_AUTH_API_URL`.
    #[arg(long)]
    api_url: Option<String>,

    /// Overrides `PORTAL_AUTH_STORAGE_DIR`.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password.
    Login(LoginArgs),
    /// Create an account and sign in.
    Register(RegisterArgs),
    /// Forget the local session.
    Logout,
    /// Show the active session.
    Status,
    /// Print the bearer token.
    Token,
    /// Print the `Authorization` header value.
    Header,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    username: String,

    #[arg(long, env = "PORTAL_AUTH_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "PORTAL_AUTH_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long, default_value = "MALE", help = "MALE, FEMALE or OTHER")]
    gender: Gender,

    #[arg(long, help = "National ID, passport number or similar")]
    identifier: String,

    #[arg(long)]
    phone: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = dotenv {
        if !e.not_found() {
            tracing::warn!(error = %e, ".env file could not be loaded");
        }
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AuthConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url.trim_end_matches('/').to_owned();
    }
    if let Some(storage_dir) = cli.storage_dir {
        config.storage_dir = storage_dir;
    }

    let storage = FileStorage::new(&config.storage_dir);
    let session = SessionStore::with_key(Arc::new(storage), config.session_key.clone());
    tracing::debug!(dir = %config.storage_dir.display(), authenticated = session.is_authenticated(), "session loaded");

    match cli.command {
        Command::Login(args) => run_login(&config, session, args).await,
        Command::Register(args) => run_register(&config, session, args).await,
        Command::Logout => run_logout(&session),
        Command::Status => {
            print_status(&session);
            Ok(())
        }
        Command::Token => {
            println!("{}", session.token().ok_or(CliError::NotSignedIn)?);
            Ok(())
        }
        Command::Header => {
            println!("{}", session.authorization_header().ok_or(CliError::NotSignedIn)?);
            Ok(())
        }
    }
}

fn gateway(config: &AuthConfig, session: SessionStore) -> Result<AuthGateway, CliError> {
    let api = HttpAuthApi::from_config(config)
        .map_err(|source| CliError::Auth { message: "could not build HTTP client", source })?;
    Ok(AuthGateway::new(Arc::new(api), session))
}

async fn run_login(config: &AuthConfig, session: SessionStore, args: LoginArgs) -> Result<(), CliError> {
    let credentials = LoginRequest { username: args.username, password: args.password };
    forms::validate_login(&credentials)?;

    let gateway = gateway(config, session)?;
    let reply = gateway.login(&credentials).await.map_err(|source| {
        tracing::debug!(error = %source, "login failed");
        CliError::Auth { message: forms::login_failure_message(&source), source }
    })?;
    if !reply.success {
        return Err(CliError::Rejected(forms::rejection_message(&reply)));
    }

    println!("{}", forms::login_outcome_message(&reply));
    Ok(())
}

async fn run_register(config: &AuthConfig, session: SessionStore, args: RegisterArgs) -> Result<(), CliError> {
    let profile = RegisterRequest {
        email: args.email,
        password: args.password,
        first_name: args.first_name,
        last_name: args.last_name,
        gender: args.gender,
        identifier: args.identifier,
        phone: args.phone,
    };
    forms::validate_register(&profile)?;

    let gateway = gateway(config, session)?;
    let reply = gateway.register(&profile).await.map_err(|source| {
        tracing::debug!(error = %source, "registration failed");
        CliError::Auth { message: forms::register_failure_message(&source), source }
    })?;
    if !reply.success {
        return Err(CliError::Rejected(forms::rejection_message(&reply)));
    }

    println!("{}", forms::register_outcome_message(&reply));
    Ok(())
}

fn run_logout(session: &SessionStore) -> Result<(), CliError> {
    let was_signed_in = session.is_authenticated();
    session.clear()?;
    println!("{}", if was_signed_in { "Signed out." } else { "No active session." });
    Ok(())
}

fn print_status(session: &SessionStore) {
    let Some(current) = session.snapshot() else {
        println!("not signed in");
        return;
    };

    println!("signed in as {} <{}> (user {})", current.display_name(), current.email, current.user_id);
    if !current.roles.is_empty() {
        println!("roles: {}", current.roles.join(", "));
    }
    if !current.expires_at.is_empty() {
        let marker = match current.is_expired_at(OffsetDateTime::now_utc()) {
            Some(true) => " (expired)",
            _ => "",
        };
        println!("expires: {}{marker}", current.expires_at);
    }
}
