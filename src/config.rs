use crate::services::uploader::DEFAULT_UPLOAD_TIMEOUT;
use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, path::PathBuf, time::Duration};

/// Bucket name used by the disk and memory backends when none is configured.
const LOCAL_BUCKET: &str = "local";

/// Where uploaded documents are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Google Cloud Storage bucket.
    Gcs,
    /// Amazon S3 (or compatible) bucket.
    S3,
    /// Directory tree under `storage_dir`.
    Disk,
    /// Process memory; contents vanish on exit.
    Memory,
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub bucket: Option<String>,
    pub backend: BackendKind,
    pub storage_dir: PathBuf,
    pub upload_timeout: Duration,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Exam archive upload service")]
pub struct Args {
    /// Host to bind to (overrides ARCHIVE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ARCHIVE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Target bucket (overrides GCLOUD_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Storage backend (overrides ARCHIVE_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Root directory for the disk backend (overrides ARCHIVE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<PathBuf>,

    /// Deadline for a single upload attempt in seconds (overrides ARCHIVE_UPLOAD_TIMEOUT_SECS)
    #[arg(long)]
    pub upload_timeout_secs: Option<u64>,

    /// Largest accepted request body in bytes (overrides ARCHIVE_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        Self::resolve(Args::parse(), |name| env::var(name))
    }

    /// Merge `args` over values found through `lookup`, then over defaults.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var = |name: &str| -> Result<Option<String>> {
            match lookup(name) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        // --- Environment fallback ---
        let env_host = var("ARCHIVE_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match var("ARCHIVE_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing ARCHIVE_PORT value `{}`", value))?,
            None => 8080,
        };
        let env_bucket = var("GCLOUD_BUCKET")?.filter(|b| !b.trim().is_empty());
        let env_backend = match var("ARCHIVE_BACKEND")? {
            Some(value) => BackendKind::from_str(&value, true).map_err(|err| {
                anyhow::anyhow!("parsing ARCHIVE_BACKEND value `{}`: {}", value, err)
            })?,
            None => BackendKind::Gcs,
        };
        let env_storage = var("ARCHIVE_STORAGE_DIR")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/archive"));
        let env_timeout = match var("ARCHIVE_UPLOAD_TIMEOUT_SECS")? {
            Some(value) => value
                .parse::<u64>()
                .with_context(|| format!("parsing ARCHIVE_UPLOAD_TIMEOUT_SECS value `{}`", value))?,
            None => DEFAULT_UPLOAD_TIMEOUT.as_secs(),
        };
        let env_max_upload = match var("ARCHIVE_MAX_UPLOAD_BYTES")? {
            Some(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing ARCHIVE_MAX_UPLOAD_BYTES value `{}`", value))?,
            None => 64 * 1024 * 1024,
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            bucket: args.bucket.or(env_bucket),
            backend: args.backend.unwrap_or(env_backend),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            upload_timeout: Duration::from_secs(args.upload_timeout_secs.unwrap_or(env_timeout)),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        };

        if cfg.upload_timeout.is_zero() {
            bail!("upload timeout must be at least one second");
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bucket name, falling back to a fixed local name for backends that do
    /// not need one.
    pub fn bucket_name(&self) -> &str {
        self.bucket.as_deref().unwrap_or(LOCAL_BUCKET)
    }

    /// Bucket name for cloud backends, which have no sensible default.
    pub fn require_bucket(&self) -> Result<&str> {
        match self.bucket.as_deref() {
            Some(bucket) => Ok(bucket),
            None => bail!(
                "the {:?} backend needs a bucket: set GCLOUD_BUCKET or pass --bucket",
                self.backend
            ),
        }
    }
}
