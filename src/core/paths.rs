use std::path::PathBuf;
use std::sync::OnceLock;

// Cache the paths to avoid repeated environment lookups
static LACHESIS_HOME: OnceLock<PathBuf> = OnceLock::new();
static LACHESIS_INDEXES_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the Lachesis home directory.
/// Checks LACHESIS_HOME environment variable, falls back to ~/.lachesis
pub fn lachesis_home() -> PathBuf {
    LACHESIS_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("LACHESIS_HOME") {
                PathBuf::from(path)
            } else {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".lachesis")
            }
        })
        .clone()
}

/// Get the directory annotation indexes are kept in.
/// Checks LACHESIS_INDEXES_DIR, falls back to LACHESIS_HOME/indexes
pub fn lachesis_indexes_dir() -> PathBuf {
    LACHESIS_INDEXES_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("LACHESIS_INDEXES_DIR") {
                PathBuf::from(path)
            } else {
                lachesis_home().join("indexes")
            }
        })
        .clone()
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    lachesis_home().join("config.toml")
}

/// Default annotation index location.
pub fn default_index_path() -> PathBuf {
    lachesis_indexes_dir().join("annotation.idx")
}
