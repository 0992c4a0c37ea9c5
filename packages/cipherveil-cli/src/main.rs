//! Cipherveil command line
//!
//! Local front end for the Cipherveil core:
//!
//! 1. **Messages**: send through a classical cipher chain sealed with
//!    AES-GCM, list an inbox, read with the stage keys.
//!
//! 2. **Storage upkeep**: create key files, migrate legacy plaintext rows,
//!    report how much of the database is encrypted.
//!
//! 3. **Images and files**: hide a sealed message in a PNG, reveal it, and
//!    encrypt or decrypt whole files as `.enc` containers.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, Report, WrapErr};
use color_eyre::{Result, Section};

use cipherveil_core::envelope::{decrypt_file, encrypt_file};
use cipherveil_core::stego::{hide_message, load_carrier, reveal_message};
use cipherveil_core::storage::{inspect_key_file, KeyFileStatus, KeyOrigin};
use cipherveil_core::{ChainKeys, Config, KeyProvider, MessageStore, Messenger, StageKind};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cipherveil", version, about = "Layered message encryption and stego images")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "CIPHERVEIL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the database and key files (overrides the config)
    #[arg(short, long, env = "CIPHERVEIL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the master and biometric key files
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Encrypt and store a message
    Send {
        /// Sender username
        #[arg(long)]
        from: String,
        /// Receiver username
        #[arg(long)]
        to: String,
        /// Message text
        message: String,
        /// Stage order, e.g. substitution,shift,stream-xor
        #[arg(long, value_delimiter = ',', required = true)]
        order: Vec<StageKind>,
        #[command(flatten)]
        keys: StageKeyArgs,
    },

    /// List messages to or from a user
    Inbox {
        /// Username
        user: String,
    },

    /// Decrypt a stored message
    Read {
        /// Message id
        id: i64,
        #[command(flatten)]
        keys: StageKeyArgs,
    },

    /// Delete one message
    Delete {
        /// Message id
        id: i64,
    },

    /// Delete every message
    Clear {
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },

    /// Encrypt legacy plaintext fields in place
    Migrate,

    /// Show field encryption coverage
    Report,

    /// Hide a message in an image (output is always PNG)
    Hide {
        /// Cover image
        source: PathBuf,
        /// Output .png path
        output: PathBuf,
        /// Message text
        message: String,
    },

    /// Recover a message hidden with `hide`
    Reveal {
        /// Stego image
        image: PathBuf,
    },

    /// Print how many bytes an image can hide
    Capacity {
        /// Cover image
        image: PathBuf,
    },

    /// Encrypt a file into a `key::blob` container
    EncryptFile {
        /// File to encrypt
        input: PathBuf,
        /// Output path (defaults to INPUT.enc)
        output: Option<PathBuf>,
    },

    /// Decrypt a container written by `encrypt-file`
    DecryptFile {
        /// Container file
        input: PathBuf,
        /// Output path (defaults to INPUT without .enc)
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Create missing key files
    Init,
    /// Check the key files without creating them
    Status,
}

/// Per-stage keys; only the stages in use need one
#[derive(Args, Debug)]
struct StageKeyArgs {
    /// Substitution (Vigenère) key
    #[arg(long, env = "CIPHERVEIL_SUBSTITUTION_KEY", hide_env_values = true)]
    substitution_key: Option<String>,

    /// Shift amount, 1-25
    #[arg(long)]
    shift: Option<u8>,

    /// Stream XOR key
    #[arg(long, env = "CIPHERVEIL_XOR_KEY", hide_env_values = true)]
    xor_key: Option<String>,
}

impl StageKeyArgs {
    fn chain_keys(&self) -> ChainKeys {
        let mut keys = ChainKeys::new();
        if let Some(key) = &self.substitution_key {
            keys = keys.with_substitution(key.as_str());
        }
        if let Some(shift) = self.shift {
            keys = keys.with_shift(shift);
        }
        if let Some(key) = &self.xor_key {
            keys = keys.with_stream_xor(key.as_str());
        }
        keys
    }
}

// ── Entry Point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cipherveil=info,cipherveil_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let info = cipherveil_core::build_info();
    tracing::debug!(
        version = info.version,
        target = info.target,
        schema_version = info.schema_version,
        "cipherveil core"
    );

    run(Cli::parse()).map_err(with_hint)
}

/// Attach the core error code, and a hint when the input needs fixing
fn with_hint(report: Report) -> Report {
    let Some(err) = report.downcast_ref::<cipherveil_core::Error>() else {
        return report;
    };
    let code = err.code();
    if err.requires_user_action() {
        report.suggestion(format!(
            "error {}: check the keys, stage order or file paths passed on the command line",
            code
        ))
    } else {
        report.note(format!("error {}", code))
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Keys { action } => keys(&config, action),
        Command::Send {
            from,
            to,
            message,
            order,
            keys,
        } => {
            let stages = keys.chain_keys().stages_for(&order)?;
            let id = messenger(&config)?.send(&from, &to, &message, &stages)?;
            println!("Stored message {}", id);
            Ok(())
        }
        Command::Inbox { user } => {
            let entries = messenger(&config)?.inbox(&user)?;
            if entries.is_empty() {
                println!("No messages for {}", user);
            }
            for entry in entries {
                let order = entry
                    .algorithm_order
                    .map(|kinds| {
                        kinds
                            .iter()
                            .map(StageKind::as_str)
                            .collect::<Vec<_>>()
                            .join(" → ")
                    })
                    .unwrap_or_else(|| "unreadable envelope".into());
                println!(
                    "[{}] {}  {} → {}  ({}){}",
                    entry.id,
                    entry.timestamp,
                    entry.sender,
                    entry.receiver,
                    order,
                    if entry.suspect { "  [!] undecryptable field" } else { "" }
                );
            }
            Ok(())
        }
        Command::Read { id, keys } => {
            let msg = messenger(&config)?.read(id, &keys.chain_keys())?;
            println!("From: {}", msg.sender);
            println!("To:   {}", msg.receiver);
            println!("At:   {}", msg.timestamp);
            println!();
            println!("{}", msg.plaintext);
            Ok(())
        }
        Command::Delete { id } => {
            if open_store(&config)?.delete_message(id)? {
                println!("Deleted message {}", id);
                Ok(())
            } else {
                bail!("no message with id {}", id)
            }
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every message without --yes");
            }
            let removed = open_store(&config)?.clear_messages()?;
            println!("Deleted {} message(s)", removed);
            Ok(())
        }
        Command::Migrate => {
            let sealed = open_store(&config)?.migrate_plaintext()?;
            println!("Encrypted {} plaintext field(s)", sealed);
            Ok(())
        }
        Command::Report => {
            let report = open_store(&config)?.encryption_report()?;
            println!("Rows:                 {}", report.rows);
            println!("Encrypted fields:     {}", report.encrypted_fields);
            println!("Plaintext fields:     {}", report.plaintext_fields);
            println!("Undecryptable fields: {}", report.undecryptable_fields);
            if report.fully_encrypted() {
                println!("All fields are encrypted.");
            } else if report.plaintext_fields > 0 {
                println!("Run `cipherveil migrate` to encrypt the plaintext fields.");
            }
            Ok(())
        }
        Command::Hide {
            source,
            output,
            message,
        } => {
            hide_message(&source, &message, &output)?;
            println!("Message hidden in {}", output.display());
            Ok(())
        }
        Command::Reveal { image } => {
            println!("{}", reveal_message(&image)?);
            Ok(())
        }
        Command::Capacity { image } => {
            let carrier = load_carrier(&image)?;
            let (w, h) = carrier.dimensions();
            println!(
                "{}x{}: up to {} payload bytes",
                w,
                h,
                carrier.max_payload_len()
            );
            Ok(())
        }
        Command::EncryptFile { input, output } => {
            let output = output.unwrap_or_else(|| {
                let mut name = input.clone().into_os_string();
                name.push(".enc");
                PathBuf::from(name)
            });
            encrypt_file(&input, &output)?;
            println!("Encrypted {} → {}", input.display(), output.display());
            Ok(())
        }
        Command::DecryptFile { input, output } => {
            let output = match output {
                Some(path) => path,
                None if input.extension().is_some_and(|ext| ext == "enc") => {
                    input.with_extension("")
                }
                None => bail!(
                    "{} has no .enc extension; pass an output path",
                    input.display()
                ),
            };
            decrypt_file(&input, &output)?;
            println!("Decrypted {} → {}", input.display(), output.display());
            Ok(())
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .wrap_err_with(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    let config = match &cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };
    config.validate()?;

    tracing::debug!("Using data directory {}", config.data_dir.display());
    Ok(config)
}

fn keys(config: &Config, action: KeysAction) -> Result<()> {
    let paths = [
        ("master", config.resolve_master_key()),
        ("biometric", config.resolve_biometric_key()),
    ];

    match action {
        KeysAction::Init => {
            let provider = KeyProvider::load(&config.key_config())?;
            let origins = [provider.master_origin(), provider.biometric_origin()];
            for ((name, path), origin) in paths.iter().zip(origins) {
                let verb = match origin {
                    KeyOrigin::Generated => "created",
                    KeyOrigin::Loaded => "exists ",
                };
                println!("{:<9} key {}  {}", name, verb, path.display());
            }
        }
        KeysAction::Status => {
            for (name, path) in &paths {
                let status = match inspect_key_file(path) {
                    KeyFileStatus::Missing => "missing".to_string(),
                    KeyFileStatus::Valid => "ok".to_string(),
                    KeyFileStatus::Corrupted(reason) => format!("corrupted ({})", reason),
                };
                println!("{:<9} key {}  {}", name, status, path.display());
            }
        }
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<MessageStore> {
    let provider = KeyProvider::load(&config.key_config())?;
    let path = config.resolve_database();
    let store = MessageStore::open(Some(&path), provider.field_cipher())
        .wrap_err_with(|| format!("opening database {}", path.display()))?;
    Ok(store)
}

fn messenger(config: &Config) -> Result<Messenger> {
    let store = open_store(config)?;
    Ok(Messenger::new(Arc::new(store), config.min_chain_stages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use cipherveil_core::Error;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_order_names_are_exact() {
        let parse = |order: &str| {
            Cli::try_parse_from([
                "cipherveil", "send", "--from", "alice", "--to", "bob", "hi", "--order", order,
            ])
        };
        assert!(parse("substitution,caesar").is_ok());
        assert!(parse("Shift").is_err());
    }

    #[test]
    fn test_hint_carries_error_code() {
        let _ = color_eyre::install();

        let report = with_hint(Report::new(Error::Capacity {
            required: 24,
            available: 3,
        }));
        assert!(matches!(
            report.downcast_ref::<Error>(),
            Some(Error::Capacity { .. })
        ));
        assert!(format!("{:?}", report).contains("error 500"));

        let report = with_hint(Report::new(Error::DatabaseError("locked".into())));
        assert!(format!("{:?}", report).contains("error 603"));

        let plain = with_hint(color_eyre::eyre::eyre!("no message with id 7"));
        assert!(plain.downcast_ref::<Error>().is_none());
    }
}
