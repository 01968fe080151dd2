use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use wbu_core::db::SqliteDatabase;
use wbu_core::{
    paths, read_header, BackupEncryption, BackupManager, BackupSettings, CryptoEngine,
};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "wbu")]
#[command(about = "Encrypted backup and restore of the local message store", long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true, env = "WBU_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty message store, optionally seeding it from a SQL file
    InitDb {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        sql: Option<PathBuf>,
    },

    /// Export the store into an encrypted backup
    Export {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        handle: String,
        /// Output directory (defaults to the settings or the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        password_file: Option<PathBuf>,
    },

    /// Restore an encrypted backup into the store
    Import {
        #[arg(long)]
        db: PathBuf,
        #[arg(long)]
        artifact: PathBuf,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        password_file: Option<PathBuf>,
    },

    /// Print the header of a backup as JSON
    Inspect {
        artifact: PathBuf,
    },

    /// Encrypt an arbitrary file into a backup artifact
    Encrypt {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        password_file: Option<PathBuf>,
    },

    /// Decrypt a backup artifact
    Decrypt {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        password_file: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<BackupSettings> {
    if let Some(path) = path {
        return BackupSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()));
    }
    let default_path = paths::default_settings_path()?;
    if default_path.exists() {
        debug!(path = %default_path.display(), "using default settings file");
        return BackupSettings::load(&default_path)
            .with_context(|| format!("failed to load settings from {}", default_path.display()));
    }
    Ok(BackupSettings::default())
}

fn read_password(file: Option<&Path>) -> Result<Zeroizing<String>> {
    if let Some(file) = file {
        let raw = Zeroizing::new(
            fs::read_to_string(file)
                .with_context(|| format!("failed to read password file {}", file.display()))?,
        );
        return Ok(Zeroizing::new(raw.trim_end_matches(['\r', '\n']).to_string()));
    }
    if let Ok(pw) = std::env::var("WBU_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }
    let pw = rpassword::prompt_password("Backup password: ")
        .map_err(|e| anyhow!("password prompt: {e}"))?;
    if pw.is_empty() {
        return Err(anyhow!("empty password"));
    }
    Ok(Zeroizing::new(pw))
}

fn open_db(path: &Path) -> Result<SqliteDatabase> {
    SqliteDatabase::open(path).with_context(|| format!("failed to open store {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wbu=info,wbu_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb { db, sql } => {
            let store = open_db(&db)?;
            if let Some(sql) = sql {
                let script = fs::read_to_string(&sql)
                    .with_context(|| format!("failed to read {}", sql.display()))?;
                store.execute_batch(&script).context("seeding store failed")?;
            }
            info!(path = %db.display(), "store ready");
        }

        Commands::Export {
            db,
            user_id,
            handle,
            out,
            password_file,
        } => {
            let out_dir = match out.or_else(|| settings.output_dir.clone()) {
                Some(dir) => dir,
                None => paths::default_output_dir()?,
            };
            let password = read_password(password_file.as_deref())?;
            let engine = CryptoEngine::init()?;
            let store = open_db(&db)?;
            let summary = BackupManager::new(&engine, settings)
                .export(&store, &user_id, &handle, &password, &out_dir)
                .context("backup export failed")?;

            let tables: serde_json::Map<String, serde_json::Value> = summary
                .tables
                .iter()
                .map(|t| (t.table.to_string(), serde_json::json!(t.rows)))
                .collect();
            let report = serde_json::json!({
                "artifact": summary.artifact.display().to_string(),
                "rows": summary.total_rows(),
                "tables": tables,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Import {
            db,
            artifact,
            user_id,
            password_file,
        } => {
            let password = read_password(password_file.as_deref())?;
            let engine = CryptoEngine::init()?;
            let store = open_db(&db)?;
            let summary = BackupManager::new(&engine, settings)
                .import(&store, &artifact, &user_id, &password)
                .context("backup import failed")?;

            let report = serde_json::json!({
                "user_id": summary.metadata.user_id,
                "created": summary.metadata.creation_time.to_rfc3339(),
                "rows": summary.total_rows(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Inspect { artifact } => {
            let header = read_header(&artifact)
                .with_context(|| format!("failed to read header of {}", artifact.display()))?;
            println!("{}", serde_json::to_string_pretty(&header)?);
        }

        Commands::Encrypt {
            input,
            output,
            user_id,
            password_file,
        } => {
            let password = read_password(password_file.as_deref())?;
            let engine = CryptoEngine::init()?;
            BackupEncryption::new(&engine, settings.kdf)
                .encrypt_backup(&input, &output, &password, &user_id)
                .context("encryption failed")?;
            println!("{}", output.display());
        }

        Commands::Decrypt {
            input,
            output,
            user_id,
            password_file,
        } => {
            let password = read_password(password_file.as_deref())?;
            let engine = CryptoEngine::init()?;
            BackupEncryption::new(&engine, settings.kdf)
                .decrypt_backup(&input, &output, &password, &user_id)
                .context("decryption failed")?;
            println!("{}", output.display());
        }
    }

    Ok(())
}
