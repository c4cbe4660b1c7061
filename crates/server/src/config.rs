#![forbid(unsafe_code)]

//! Server configuration: command-line flags with environment fallbacks, an
//! optional YAML file underneath them, and built-in defaults underneath that.

use clap::{Parser, ValueEnum};
use qc_storage::DEFAULT_MAX_UPLOAD_BYTES;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Default, Parser)]
#[command(name = "qc_server", version, about = "Transformer QC tracker HTTP server")]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, env = "QC_BIND")]
    pub bind: Option<String>,

    /// Directory holding the record collections.
    #[arg(long, env = "QC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for uploaded files. Defaults to `<data-dir>/uploads`.
    #[arg(long, env = "QC_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    #[arg(long, env = "QC_BACKEND", value_enum)]
    pub backend: Option<Backend>,

    #[arg(long, env = "QC_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<u64>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "QC_LOG_JSON", value_parser = clap::builder::BoolishValueParser::new())]
    pub log_json: bool,

    /// YAML file with the same keys as the flags (snake_case).
    #[arg(long, env = "QC_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind: Option<String>,
    data_dir: Option<PathBuf>,
    upload_dir: Option<PathBuf>,
    backend: Option<Backend>,
    max_upload_bytes: Option<u64>,
    log_json: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid bind address `{0}`")]
    Bind(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub backend: Backend,
    pub max_upload_bytes: u64,
    pub log_json: bool,
}

impl ServerConfig {
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let file = match cli.config.as_deref() {
            Some(path) => load_file(path)?,
            None => FileConfig::default(),
        };

        let bind = cli
            .bind
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Bind(bind.clone()))?;

        let data_dir = cli
            .data_dir
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let upload_dir = cli
            .upload_dir
            .or(file.upload_dir)
            .unwrap_or_else(|| data_dir.join("uploads"));

        Ok(Self {
            bind,
            data_dir,
            upload_dir,
            backend: cli.backend.or(file.backend).unwrap_or_default(),
            max_upload_bytes: cli
                .max_upload_bytes
                .or(file.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_json: cli.log_json || file.log_json.unwrap_or(false),
        })
    }
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
