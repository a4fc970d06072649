use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl StoreKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "memory" | "mem" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub store: StoreKind,
    pub db_path: PathBuf,
    /// Set when `ENABLE_FILE_LOGS` is on.
    pub file_log_dir: Option<PathBuf>,
    pub engine_config_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let store = std::env::var("PROFICIENCY_STORE")
            .ok()
            .as_deref()
            .and_then(StoreKind::parse)
            .unwrap_or(StoreKind::Sqlite);

        let db_path = std::env::var("PROFICIENCY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Path::new("./data/proficiency.db").to_path_buf());

        let file_log_dir = env_bool("ENABLE_FILE_LOGS", false).then(|| {
            std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs"))
        });

        let engine_config_path = std::env::var("PROFICIENCY_CONFIG_PATH").ok().map(PathBuf::from);

        Self {
            log_level,
            store,
            db_path,
            file_log_dir,
            engine_config_path,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
