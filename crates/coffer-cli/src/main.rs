//! `Coffer` CLI: local encrypted secret storage.
//!
//! Opens a redb file, builds a vault from `COFFER_*` environment settings,
//! and runs one operation against it. Values read back with `get` are
//! printed bare so the output can be captured by scripts.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use coffer_core::{EncryptionKey, EvictionPolicy, OwnerScope, Value, Vault, VaultConfig};
use coffer_storage::RedbStore;
use tracing::debug;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

// ── CLI structure ────────────────────────────────────────────────────

/// Coffer: typed, encrypted secrets with eviction policies.
#[derive(Parser)]
#[command(
    name = "coffer",
    version,
    about = "Coffer CLI: store, read, and evict encrypted secrets",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         COFFER_DB_PATH           Database file (default: ./coffer.redb)\n  \
         COFFER_DEFAULT_KEY       Key ID for new secrets (default: default)\n  \
         COFFER_ENCRYPTION_KEY    Base64 key for the default key ID\n  \
         COFFER_ENCRYPTION_KEYS   Extra keys as id=base64,id=base64\n  \
         COFFER_TRACK_ACCESS      Count reads (default: true)\n  \
         COFFER_DEFAULT_POLICY    Eviction policy JSON for new secrets\n  \
         COFFER_VALUE_TYPES       Value types to enable (default: int,map,json,string)\n  \
         COFFER_LOG_LEVEL         Log filter (default: warn)\n\n\
         {DIM}Examples:{RESET}\n  \
         export COFFER_ENCRYPTION_KEY=$(coffer keygen)\n  \
         coffer put stripe sk_live_123 --owner team:billing\n  \
         coffer put otp 493021 --int --policy '{{\"type\":\"access_count\",\"max\":1}}'\n  \
         coffer get stripe --owner team:billing"
    ),
)]
struct Cli {
    /// Path to the database file.
    #[arg(long, env = "COFFER_DB_PATH", default_value = "./coffer.redb", global = true)]
    db: PathBuf,

    /// Log filter (overridden by `RUST_LOG`).
    #[arg(long, env = "COFFER_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a secret, replacing any existing one.
    Put {
        /// Secret key.
        key: String,
        /// Secret value (text unless --int or --json is given).
        value: String,
        /// Store the value as an integer.
        #[arg(long, conflicts_with = "json")]
        int: bool,
        /// Parse the value as JSON (objects are stored as documents, arrays as structure).
        #[arg(long)]
        json: bool,
        /// Owning entity as kind:id.
        #[arg(long, value_parser = parse_owner)]
        owner: Option<OwnerScope>,
        /// Eviction policy JSON, e.g. '{"type":"time_based","seconds":3600}'.
        #[arg(long)]
        policy: Option<String>,
    },
    /// Print a secret's value.
    Get {
        /// Secret key.
        key: String,
        /// Owning entity as kind:id.
        #[arg(long, value_parser = parse_owner)]
        owner: Option<OwnerScope>,
    },
    /// Print whether a live secret exists.
    Has {
        /// Secret key.
        key: String,
        /// Owning entity as kind:id.
        #[arg(long, value_parser = parse_owner)]
        owner: Option<OwnerScope>,
    },
    /// Delete a secret.
    Forget {
        /// Secret key.
        key: String,
        /// Owning entity as kind:id.
        #[arg(long, value_parser = parse_owner)]
        owner: Option<OwnerScope>,
    },
    /// Delete every secret whose eviction policy has fired.
    Evict,
    /// Print a new random base64 encryption key.
    Keygen,
}

fn parse_owner(raw: &str) -> Result<OwnerScope, String> {
    match raw.split_once(':') {
        Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(OwnerScope::new(kind, id)),
        _ => Err(format!("expected kind:id, got '{raw}'")),
    }
}

// ── Output helpers ───────────────────────────────────────────────────

fn success(msg: &str) {
    println!("  {GREEN}✓{RESET} {msg}");
}

fn notice(msg: &str) {
    eprintln!("  {YELLOW}!{RESET} {msg}");
}

/// Text prints bare, integers as digits, structures as pretty JSON.
fn render(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Int(int) => int.to_string(),
        other => other
            .to_json()
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
            .unwrap_or_else(|| format!("{other:?}")),
    }
}

// ── Entry point ──────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    match run(cli.db, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(db: PathBuf, cmd: Commands) -> Result<ExitCode> {
    match cmd {
        Commands::Keygen => {
            println!("{}", EncryptionKey::generate().to_base64());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Put {
            key,
            value,
            int,
            json,
            owner,
            policy,
        } => {
            let vault = open_vault(&db)?;
            cmd_put(&vault, &key, &value, int, json, owner.as_ref(), policy.as_deref()).await
        }
        Commands::Get { key, owner } => cmd_get(&open_vault(&db)?, &key, owner.as_ref()).await,
        Commands::Has { key, owner } => {
            let exists = open_vault(&db)?.has(&key, owner.as_ref()).await?;
            println!("{exists}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Forget { key, owner } => {
            if open_vault(&db)?.forget(&key, owner.as_ref()).await? {
                success(&format!("forgot {BOLD}{key}{RESET}"));
            } else {
                notice(&format!("no secret stored under {key}"));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Evict => {
            let evicted = open_vault(&db)?.evict().await?;
            success(&format!("evicted {evicted} secret(s)"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn open_vault(db: &Path) -> Result<Vault> {
    let config = VaultConfig::from_env().context("invalid COFFER_* configuration")?;
    let store = RedbStore::open(db).with_context(|| format!("cannot open {}", db.display()))?;
    debug!(path = %db.display(), "opened secret store");
    Vault::from_config(Arc::new(store), &config).context("cannot build vault from configuration")
}

async fn cmd_put(
    vault: &Vault,
    key: &str,
    raw: &str,
    int: bool,
    json: bool,
    owner: Option<&OwnerScope>,
    policy: Option<&str>,
) -> Result<ExitCode> {
    let value = if int {
        let parsed: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("'{raw}' is not an integer"))?;
        Value::Int(parsed)
    } else if json {
        let parsed: serde_json::Value = serde_json::from_str(raw).context("value is not valid JSON")?;
        Value::from_serialize(&parsed)?
    } else {
        Value::from(raw)
    };

    let policy = match policy {
        Some(descriptor) => Some(
            serde_json::from_str::<EvictionPolicy>(descriptor).context("invalid eviction policy")?,
        ),
        None => None,
    };

    let record = vault.put(key, value, owner, policy.as_ref()).await?;
    success(&format!(
        "stored {BOLD}{key}{RESET} as {} (key id {})",
        record.value_type, record.encryption_key_id
    ));
    Ok(ExitCode::SUCCESS)
}

async fn cmd_get(vault: &Vault, key: &str, owner: Option<&OwnerScope>) -> Result<ExitCode> {
    let Some(value) = vault.get(key, owner).await? else {
        let scope = owner.map(|o| format!(" for {o}")).unwrap_or_default();
        bail!("no secret stored under {key}{scope}");
    };
    println!("{}", render(&value));
    Ok(ExitCode::SUCCESS)
}
