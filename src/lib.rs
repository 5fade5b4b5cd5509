pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod config;
pub mod error;

pub use application::cli::Args;
pub use error::PoserError;

pub type Result<T> = std::result::Result<T, PoserError>;

/// Number of octets in a hardware address.
pub const IDENTIFIER_LEN: usize = 6;
/// Settle delay after disabling an adapter, before re-enabling it.
pub const DEFAULT_DISABLE_SETTLE_MS: u64 = 1800;
/// Settle delay after re-enabling an adapter, before reading it back.
pub const DEFAULT_ENABLE_SETTLE_MS: u64 = 800;
/// Rotation interval used when the configured value is malformed.
pub const DEFAULT_ROTATION_MINUTES: u64 = 5;
