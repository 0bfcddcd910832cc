use std::path::PathBuf;

use common::crypto::KdfParams;

#[derive(Debug)]
pub struct Config {
    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// directory for encrypted content blobs, if not set then
    ///  `./coffer-content` will be used
    pub content_dir: Option<PathBuf>,

    // key derivation configuration
    /// Argon2id parameters for private-key blob encryption;
    ///  tune to deployment hardware
    pub kdf: KdfParams,

    // misc
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            content_dir: None,
            kdf: KdfParams::default(),
            log_level: tracing::Level::INFO,
        }
    }
}

impl Config {
    pub fn content_dir(&self) -> PathBuf {
        self.content_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./coffer-content"))
    }
}
