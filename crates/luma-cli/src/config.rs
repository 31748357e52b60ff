//! Account configuration
//!
//! The master key is derived elsewhere; the CLI takes it as configured
//! input (flag or environment) together with the control-plane endpoint
//! and auth token.

use anyhow::Context;
use clap::Args;
use luma_api::{ApiClient, ApiConfig};
use luma_crypto::SecretKey;
use luma_store::Store;
use luma_uploader::AccountKeys;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct AccountArgs {
    /// Control-plane endpoint URL
    #[arg(long, env = "LUMA_ENDPOINT", default_value = "http://localhost:8080", global = true)]
    pub endpoint: String,

    /// Account auth token
    #[arg(long, env = "LUMA_TOKEN", default_value = "", global = true, hide_env_values = true)]
    pub token: String,

    /// Account master key, standard base64
    #[arg(long, env = "LUMA_MASTER_KEY", default_value = "", global = true, hide_env_values = true)]
    pub master_key: String,

    /// Path of the local state database
    #[arg(long, env = "LUMA_DB", global = true)]
    pub db: Option<PathBuf>,
}

/// Everything a command needs to talk to the account
pub struct Account {
    pub client: Arc<ApiClient>,
    pub store: Arc<Store>,
    pub keys: Arc<AccountKeys>,
}

impl Account {
    pub fn build(args: &AccountArgs) -> anyhow::Result<Self> {
        if args.token.is_empty() {
            anyhow::bail!("missing auth token (set --token or LUMA_TOKEN)");
        }
        if args.master_key.is_empty() {
            anyhow::bail!("missing master key (set --master-key or LUMA_MASTER_KEY)");
        }

        let master_key =
            SecretKey::from_base64(&args.master_key).context("invalid master key")?;

        let db_path = match &args.db {
            Some(path) => path.clone(),
            None => default_db_path(),
        };
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let client = ApiClient::new(ApiConfig::new(args.endpoint.as_str(), args.token.as_str()))
            .context("building api client")?;
        let store = Store::open(&db_path)
            .with_context(|| format!("opening state db {}", db_path.display()))?;

        Ok(Self {
            client: Arc::new(client),
            store: Arc::new(store),
            keys: Arc::new(AccountKeys::new(master_key)),
        })
    }
}

fn default_db_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".luma").join("state.db"),
        None => PathBuf::from("luma-state.db"),
    }
}
