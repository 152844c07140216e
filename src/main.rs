use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tinylink::types::{ChangePasswordRequest, RegisterRequest, UpdateProfileRequest};
use tinylink::{ApiClient, ApiError, AuthSession, ClientConfig, FileStore, HttpAuthStore, KeyValueStore, OpResult, SharedStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{0}")]
    Failed(String),
}

#[derive(Parser, Debug)]
#[command(name = "tinylink", about = "TinyLink URL shortener client")]
struct Cli {
    #[arg(long, env = "API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "TINYLINK_STORAGE_PATH", help = "Client storage file (client id and session token)")]
    storage: Option<PathBuf>,

    #[arg(long, default_value_t = false, help = "Run without persistent client storage")]
    no_storage: bool,

    #[arg(long, env = "TINYLINK_ACCEPT_INVALID_CERTS", default_value_t = false, help = "Accept self-signed TLS certificates")]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Shorten a URL.
    Shorten {
        url: String,
        #[arg(long)]
        alias: Option<String>,
    },
    /// Show how many shortening requests are left.
    Remaining,
    /// Print the anonymous client id.
    ClientId,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TINYLINK_PASSWORD")]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "TINYLINK_PASSWORD")]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Resolve the stored session and print the current user.
    Whoami,
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Logout,
    DeleteAccount,
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long = "new")]
        new_password: String,
    },
    TwoFactor(TwoFactorCommand),
}

#[derive(Args, Debug)]
struct TwoFactorCommand {
    #[command(subcommand)]
    command: TwoFactorSubcommand,
}

#[derive(Subcommand, Debug)]
enum TwoFactorSubcommand {
    Enable {
        #[arg(long)]
        code: Option<String>,
    },
    Disable {
        #[arg(long)]
        code: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);
    let storage = open_storage(&config, cli.no_storage);
    let api = ApiClient::new(&config, storage)?;
    let store = Arc::new(HttpAuthStore::new(api.clone()));
    let session = AuthSession::new(store, api.clone());

    run(&session, &api, cli.command).await
}

fn build_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(path) = &cli.storage {
        config.storage_path = Some(path.clone());
    }
    if cli.insecure {
        config.accept_invalid_certs = true;
    }
    config
}

fn open_storage(config: &ClientConfig, disabled: bool) -> SharedStore {
    if disabled {
        return None;
    }
    let path = config.storage_path.as_ref()?;
    match FileStore::open(path) {
        Ok(store) => {
            let store: Arc<dyn KeyValueStore> = Arc::new(store);
            Some(store)
        }
        Err(e) => {
            tracing::warn!(error = %e, "client storage unavailable, continuing without persistence");
            None
        }
    }
}

async fn run(session: &AuthSession, api: &ApiClient, command: Command) -> Result<(), CliError> {
    match command {
        Command::Shorten { url, alias } => {
            let record = api.shorten_url(&url, alias.as_deref()).await?;
            print_json(&record)
        }
        Command::Remaining => {
            let remaining = api.get_remaining_requests().await;
            print_json(&json!({ "remainingRequests": remaining }))
        }
        Command::ClientId => print_json(&json!({
            "clientId": api.identity().get_or_create(),
            "persistent": api.identity().is_persistent(),
        })),
        Command::Login { email, password } => finish(session.login(&email, &password).await),
        Command::Register { email, password, first_name, last_name } => {
            let profile = RegisterRequest {
                email,
                confirm_password: Some(password.clone()),
                password,
                first_name,
                last_name,
            };
            finish(session.register(profile).await)
        }
        Command::Whoami => {
            let authenticated = session.check_auth_status().await;
            print_json(&json!({
                "isAuthenticated": authenticated,
                "isPremium": session.is_premium(),
                "user": session.user(),
            }))
        }
        Command::UpdateProfile { name, email } => {
            finish(session.update_profile(UpdateProfileRequest { name, email }).await)
        }
        Command::Logout => {
            session.logout().await;
            print_json(&OpResult::ok())
        }
        Command::DeleteAccount => finish(session.delete_account().await),
        Command::ChangePassword { current, new_password } => {
            let request = ChangePasswordRequest {
                current_password: current,
                confirm_new_password: new_password.clone(),
                new_password,
            };
            finish(session.change_password(request).await)
        }
        Command::TwoFactor(two_factor) => {
            let (enable, code) = match two_factor.command {
                TwoFactorSubcommand::Enable { code } => (true, code),
                TwoFactorSubcommand::Disable { code } => (false, code),
            };
            let status = session.toggle_two_factor_auth(enable, code.as_deref()).await?;
            print_json(&status)
        }
    }
}

/// Print an envelope and turn a failed one into a non-zero exit.
fn finish(result: OpResult) -> Result<(), CliError> {
    print_json(&result)?;
    result
        .into_result()
        .map(|_| ())
        .map_err(CliError::Failed)
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
