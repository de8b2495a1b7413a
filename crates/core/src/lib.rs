//! spice2nc Core Library
//!
//! Shared utilities for the spice2nc fetcher:
//! - Configuration file discovery and loading (XDG-compliant)
//! - Output path preparation

mod config;
pub mod fs;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::ensure_parent_dir;

/// Application name used for XDG paths and the default config filename
pub const APP_NAME: &str = "spice2nc";

/// Config filename searched for in standard locations
pub const CONFIG_FILENAME: &str = "spice2nc.toml";

/// Environment variable holding an explicit config path
pub const CONFIG_ENV_VAR: &str = "SPICE2NC_CONFIG";

/// SPICE station data endpoint
pub const DEFAULT_API_URL: &str = "https://publikacje.inoz.us.edu.pl/SPICE/metno.php";

/// Default HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
