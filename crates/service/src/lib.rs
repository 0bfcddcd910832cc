/**
 * Service configuration: data store locations, KDF
 *  parameters, log level.
 */
pub mod config;
/**
 * Encrypted content blob storage. The backend only
 *  ever holds ciphertext.
 */
pub mod content;
/**
 * SQLite implementation of the ledger contracts
 *  defined in coffer-common.
 */
pub mod database;
/**
 * The operation surface: register, create, download,
 *  rename, share, revoke, delete, list.
 */
pub mod drive;
/**
 * Re-keying coordination after membership shrinks.
 */
pub mod rekey;
/**
 * Per-login session key material with explicit
 *  lifetime and clearing.
 */
pub mod session;
/**
 * Tracing subscriber setup.
 */
pub mod telemetry;

pub use config::Config;
pub use content::ContentStore;
pub use database::Database;
pub use drive::{Drive, DriveError};
pub use rekey::RekeyCoordinator;
pub use session::Session;
