//! layerbak: layered passphrase encryption for metadata backups
//!
//! Commands:
//!   backup --input <FILE|->     - encrypt and store (or write) a backup
//!   restore <SOURCE> --output   - decrypt a stored or local backup
//!   list                        - show stored backups, newest first
//!   config show                 - display current configuration

mod output;
mod supplied;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::style::{style, Stylize};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;

use layerbak_core::config::{default_config_path, LayerbakConfig};
use layerbak_core::{LayerChain, PassphraseMap};
use layerbak_crypto::CryptoError;
use layerbak_secrets::{collect_passphrases, TerminalPrompt};
use layerbak_storage::{build_operator, BackupNaming, BackupStore};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "layerbak",
    version,
    about = "Multi-layer encrypted metadata backups",
    long_about = "layerbak: wrap backups in independent passphrase-keyed AES-256 layers"
)]
struct Cli {
    /// Path to config.toml (default: ~/.config/layerbak/config.toml)
    #[arg(long, short = 'c', env = "LAYERBAK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter (overrides [logging].level; RUST_LOG wins over both)
    #[arg(long, env = "LAYERBAK_LOG")]
    log: Option<String>,

    /// Log format (overrides [logging].format)
    #[arg(long, env = "LAYERBAK_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file (or stdin) and store it as a timestamped backup
    ///
    /// Passphrases not given with --passphrase or LAYERBAK_PASSPHRASE_<L> are
    /// prompted for, twice each.
    Backup {
        /// Plaintext to back up ("-" for stdin)
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// Object name in the store (default: <name_prefix>_YYYYMMDD_HHMMSS.<extension>)
        #[arg(long)]
        name: Option<String>,
        /// Write the encrypted backup to this new file instead of the store
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Write bare layered ciphertext without the envelope header
        #[arg(long)]
        raw: bool,
        /// Pre-supplied passphrase, LAYER=SECRET (repeatable)
        #[arg(long = "passphrase", value_name = "LAYER=SECRET")]
        passphrases: Vec<String>,
    },

    /// Decrypt a backup into a local file
    Restore {
        /// Local file, object name in the store, or "latest"
        source: String,
        /// Destination file; an existing file is kept as <FILE>.backup
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// Source is bare layered ciphertext without the envelope header
        #[arg(long)]
        raw: bool,
        /// Pre-supplied passphrase, LAYER=SECRET (repeatable)
        #[arg(long = "passphrase", value_name = "LAYER=SECRET")]
        passphrases: Vec<String>,
    },

    /// List stored backups, newest first
    List,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (defaults merged with the config file)
    Show,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let (config, found) = load_config(&config_path).await?;

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = match cli.log_format {
        Some(f) => f,
        None => LogFormat::from_str(&config.logging.format, true).unwrap_or(LogFormat::Text),
    };
    init_logging(level, format);

    if !found {
        tracing::warn!(path = %config_path.display(), "config file not found, using defaults");
    }

    match cli.command {
        Commands::Backup { input, name, output, raw, passphrases } => {
            cmd_backup(&config, &input, name.as_deref(), output.as_deref(), raw, &passphrases).await
        }
        Commands::Restore { source, output, raw, passphrases } => {
            cmd_restore(&config, &source, &output, raw, &passphrases).await
        }
        Commands::List => cmd_list(&config).await,
        Commands::Config { action: ConfigAction::Show } => {
            cmd_config_show(&config, &config_path, found)
        }
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stderr keeps stdout clean for `config show` and piped output
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<(LayerbakConfig, bool)> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = LayerbakConfig::from_toml(&content)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((LayerbakConfig::default(), false))
    }
}

fn open_store(config: &LayerbakConfig) -> Result<BackupStore> {
    let op = build_operator(&config.storage).context("building storage operator")?;
    Ok(BackupStore::new(
        op,
        &config.storage.prefix,
        BackupNaming::from_config(&config.backup),
    ))
}

/// Supplied passphrases first, then prompt for the rest.
fn passphrases_for(chain: &LayerChain, flags: &[String], verify: bool) -> Result<PassphraseMap> {
    let provided = supplied::gather(chain, flags, |key| std::env::var(key).ok())?;
    let mut prompt = TerminalPrompt;
    collect_passphrases(chain, provided, verify, &mut prompt).context("collecting passphrases")
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ── `layerbak backup` ─────────────────────────────────────────────────────────

async fn cmd_backup(
    config: &LayerbakConfig,
    input: &Path,
    name: Option<&str>,
    output: Option<&Path>,
    raw: bool,
    flags: &[String],
) -> Result<()> {
    let chain = config.layer_chain().context("invalid [layers] configuration")?;
    if let Some(path) = output {
        if path.exists() {
            anyhow::bail!("refusing to overwrite existing file: {}", path.display());
        }
    }

    let plaintext = if input == Path::new("-") {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("reading backup input from stdin")?;
        buf
    } else {
        tokio::fs::read(input)
            .await
            .with_context(|| format!("reading backup input: {}", input.display()))?
    };

    let passphrases = passphrases_for(&chain, flags, true)?;
    let envelope = config.backup.envelope && !raw;

    let spinner = make_spinner("backup");
    spinner.set_message(format!(
        "encrypting {} bytes with {} layers ({} salts)",
        plaintext.len(),
        passphrases.len(),
        chain.salt_mode()
    ));
    let sealed = if envelope {
        layerbak_crypto::seal(&plaintext, &passphrases, &chain)
    } else {
        layerbak_crypto::multi_encrypt(&plaintext, &passphrases, &chain)
    };
    let blob = match sealed {
        Ok(blob) => blob,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("encrypting backup");
        }
    };
    drop(passphrases);
    let blob_len = blob.len();

    let destination = match output {
        Some(path) => {
            spinner.set_message(format!("writing {}", path.display()));
            output::write_new(path, &blob)?;
            path.display().to_string()
        }
        None => {
            let store = open_store(config)?;
            let name = name
                .map(str::to_string)
                .unwrap_or_else(|| store.naming().name_now());
            spinner.set_message(format!("uploading {name}"));
            store.put(&name, blob).await?
        }
    };
    spinner.finish_and_clear();

    println!(
        "{} {} ({} → {} bytes, {} layers{})",
        style("Backup written:").green().bold(),
        destination,
        plaintext.len(),
        blob_len,
        chain.len(),
        if envelope { "" } else { ", raw" },
    );
    Ok(())
}

// ── `layerbak restore` ────────────────────────────────────────────────────────

async fn cmd_restore(
    config: &LayerbakConfig,
    source: &str,
    output: &Path,
    raw: bool,
    flags: &[String],
) -> Result<()> {
    let chain = config.layer_chain().context("invalid [layers] configuration")?;

    let local = Path::new(source);
    let blob = if source != "latest" && local.is_file() {
        tokio::fs::read(local)
            .await
            .with_context(|| format!("reading backup: {}", local.display()))?
    } else {
        let store = open_store(config)?;
        let name = if source == "latest" {
            store
                .latest()
                .await?
                .context("no backups found in the configured store")?
                .name
        } else {
            source.to_string()
        };
        println!("Restoring {name}");
        store.get(&name).await?
    };

    let passphrases = passphrases_for(&chain, flags, false)?;
    let envelope = config.backup.envelope && !raw;

    let spinner = make_spinner("restore");
    spinner.set_message(format!("decrypting {} bytes", blob.len()));
    let opened = if envelope {
        layerbak_crypto::open(&blob, &passphrases, &chain)
    } else {
        layerbak_crypto::multi_decrypt(&blob, &passphrases, &chain)
    };
    spinner.finish_and_clear();
    drop(passphrases);

    let plaintext = match opened {
        Ok(p) => p,
        Err(e) => {
            print_decrypt_hint(&e);
            return Err(e).context("decrypting backup; nothing was written");
        }
    };

    let previous = output::write_atomically(output, &plaintext)?;
    if let Some(saved) = previous {
        println!("Previous file kept at {}", saved.display());
    }
    println!(
        "{} {} ({} bytes)",
        style("Restored:").green().bold(),
        output.display(),
        plaintext.len()
    );
    Ok(())
}

fn print_decrypt_hint(err: &CryptoError) {
    let layer = err
        .failed_layer()
        .map(|l| format!(" (layer {l})"))
        .unwrap_or_default();
    eprintln!("{}{layer}", style("Decryption failed").red().bold());
    eprintln!(
        "{}",
        style(
            "Every passphrase must match the one used for that layer at backup time, \
             and the layer count and salt mode must match the backup's configuration."
        )
        .yellow()
    );
}

// ── `layerbak list` ───────────────────────────────────────────────────────────

async fn cmd_list(config: &LayerbakConfig) -> Result<()> {
    let store = open_store(config)?;
    let backups = store.list().await?;

    if backups.is_empty() {
        println!(
            "No backups found ({:?} backend, prefix {:?})",
            config.storage.backend, config.storage.prefix
        );
        return Ok(());
    }

    println!("{:<20} NAME", "DATE");
    for entry in &backups {
        println!(
            "{:<20} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.name
        );
    }
    println!("{} backup(s)", backups.len());
    Ok(())
}

// ── `layerbak config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &LayerbakConfig, config_path: &Path, found: bool) -> Result<()> {
    if found {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
