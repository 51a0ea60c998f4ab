use std::path::{Path, PathBuf};

use attest_app::db;
use attest_app::loader::Loader;
use attest_app::secure_store::EncryptedStore;
use attest_app::trust_store::TrustStore;
use attest_crypto::{keystore, Identity};
use attest_protocol::SignedMessage;

const USAGE: &str = "\
Usage: attest [--data-dir <dir>] [--passphrase <pass>] <command>

Commands:
  sign <text>...    sign a message, print the wire-format output
  export            print the bare base64 public key
  load <input>      verify a signed message or import a public key
  trusted           list trusted keys

The keystore passphrase comes from --passphrase or ATTEST_PASSPHRASE;
it is required for `sign` and `export`.";

/// Command-line arguments.
struct Args {
    data_dir: String,
    passphrase: Option<String>,
    command: Command,
}

enum Command {
    Sign { text: String },
    Export,
    Load { input: String },
    Trusted,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut data_dir = String::new();
    let mut passphrase = std::env::var("ATTEST_PASSPHRASE").ok();
    let mut positional: Vec<String> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--data-dir" => data_dir = args.next().unwrap_or_default(),
            "--passphrase" => passphrase = args.next(),
            _ => positional.push(arg),
        }
    }

    if data_dir.is_empty() {
        data_dir = dirs_fallback("attest");
    }

    let command = match positional.first().map(String::as_str) {
        Some("sign") if positional.len() > 1 => Command::Sign {
            text: positional[1..].join(" "),
        },
        Some("export") => Command::Export,
        Some("load") if positional.len() > 1 => Command::Load {
            input: positional[1..].join(" "),
        },
        Some("trusted") => Command::Trusted,
        _ => return Err(USAGE.to_string()),
    };

    Ok(Args {
        data_dir,
        passphrase,
        command,
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "attest failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), String> {
    std::fs::create_dir_all(&args.data_dir).map_err(|e| format!("create data dir: {e}"))?;
    let data_dir = PathBuf::from(&args.data_dir);

    match args.command {
        Command::Sign { text } => {
            let identity = open_identity(&data_dir, args.passphrase.as_deref())?;
            println!("{}", SignedMessage::create(&identity, &text).to_wire());
        }
        Command::Export => {
            let identity = open_identity(&data_dir, args.passphrase.as_deref())?;
            println!("{}", identity.public_key_b64().map_err(|e| e.to_string())?);
        }
        Command::Load { input } => {
            let store = open_trust_store(&data_dir)?;
            let loader = Loader::spawn(store);
            let outcome = loader.load(input).await;
            println!("{outcome}");
        }
        Command::Trusted => {
            let store = open_trust_store(&data_dir)?;
            for key in store.list().map_err(|e| e.to_string())? {
                println!("{}", key.public_key);
            }
        }
    }

    Ok(())
}

/// Unlock the keychain and load (or create) the identity.
///
/// Malformed stored key material is fatal here: signing with a silently
/// regenerated key would break every trust relationship already handed out.
fn open_identity(data_dir: &Path, passphrase: Option<&str>) -> Result<Identity, String> {
    let passphrase = passphrase
        .ok_or("a passphrase is required (use --passphrase or set ATTEST_PASSPHRASE)")?;
    let store = EncryptedStore::open(&data_dir.join("keychain.bin"), passphrase)
        .map_err(|e| e.to_string())?;
    keystore::get_or_create(&store).map_err(|e| e.to_string())
}

fn open_trust_store(data_dir: &Path) -> Result<TrustStore, String> {
    let db_path = data_dir.join("trust.db");
    let db = db::open_db(&db_path.to_string_lossy()).map_err(|e| e.to_string())?;
    Ok(TrustStore::new(db))
}

fn dirs_fallback(subpath: &str) -> String {
    let base = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    format!("{base}/.local/share/{subpath}")
}
