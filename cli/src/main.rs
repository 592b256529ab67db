use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use portal::{
    AuthError, ConfigError, FileTokenStore, GatewayConfig, HttpIdentityProvider, Identity, Session, SessionCountdown,
    SessionGateway, SignUpOutcome,
};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

const TOKEN_FILE_NAME: &str = ".portal/token";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("[{code}] {msg}", code = .0.error_code(), msg = .0.message())]
    Auth(#[from] AuthError),
    #[error("not signed in")]
    NotSignedIn,
    #[error("no token file; pass --token-file or set PORTAL_TOKEN_FILE")]
    NoTokenFile,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "portal-cli", about = "Admin portal session CLI")]
struct Cli {
    /// Overrides PORTAL_API_URL from the gateway configuration.
    #[arg(long)]
    api_url: Option<String>,

    #[arg(long, env = "PORTAL_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    SignOut,
    Whoami,
    Status,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = GatewayConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url);
    }
    let token_file = cli
        .token_file
        .or_else(|| default_token_file(std::env::var_os("HOME").map(PathBuf::from)))
        .ok_or(CliError::NoTokenFile)?;

    let provider = Arc::new(HttpIdentityProvider::new(&config)?);
    let store = Arc::new(FileTokenStore::new(token_file));
    let gateway = SessionGateway::new(provider, store, config);

    let result = run(&gateway, cli.command).await;
    gateway.shutdown().await;
    result
}

async fn run(gateway: &SessionGateway, command: Command) -> Result<(), CliError> {
    gateway.initialize().await?;

    match command {
        Command::SignIn { email, password } => {
            gateway.sign_in(&email, &password).await?;
            let user = gateway.current_user().ok_or(CliError::NotSignedIn)?;
            eprintln!("signed in as {}", user.display_name());
            print_json(&user_json(&user)?)
        }
        Command::SignUp { email, password, full_name } => {
            match gateway.sign_up(&email, &password, full_name.as_deref()).await? {
                SignUpOutcome::SignedIn(session) => {
                    eprintln!("account created, signed in as {}", session.user.display_name());
                    print_json(&user_json(&session.user)?)
                }
                SignUpOutcome::ConfirmationRequired(user) => {
                    eprintln!("account created; confirm {} before signing in", user.email);
                    print_json(&user_json(&user)?)
                }
            }
        }
        Command::SignOut => {
            gateway.sign_out().await?;
            println!("signed out");
            Ok(())
        }
        Command::Whoami => {
            let user = gateway.current_user().ok_or(CliError::NotSignedIn)?;
            print_json(&user_json(&user)?)
        }
        Command::Status => print_json(&status_json(&gateway.session(), &gateway.time_remaining())),
    }
}

fn default_token_file(home: Option<PathBuf>) -> Option<PathBuf> {
    home.filter(|h| !h.as_os_str().is_empty()).map(|h| h.join(TOKEN_FILE_NAME))
}

fn user_json(user: &Identity) -> Result<Value, CliError> {
    Ok(serde_json::to_value(user)?)
}

fn status_json(session: &Session, countdown: &SessionCountdown) -> Value {
    json!({
        "phase": format!("{:?}", session.phase()).to_lowercase(),
        "loading": session.is_loading,
        "email": session.current_user.as_ref().map(|u| u.email.as_str()),
        "remaining": countdown.remaining,
        "expiring_soon": countdown.expiring_soon,
        "valid": countdown.valid,
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
