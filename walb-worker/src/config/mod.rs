//! Worker policy configuration.
//!
//! The configuration is an INI document with `[general]`, `[apply]`,
//! `[merge]` and one `[repl_servers.<name>]` section per replication target:
//!
//! ```
//! use walb_worker::config::Config;
//!
//! let config = Config::from_ini_str(r#"
//! [general]
//! addr = 192.168.0.1
//! port = 10000
//! max_concurrent_tasks = 10
//!
//! [merge]
//! max_size = 1M
//!
//! [repl_servers.repl0]
//! addr = 192.168.0.2
//! port = 10001
//! interval = 3d
//! compress = snappy:3:4
//! "#).unwrap();
//!
//! assert_eq!(config.merge.max_size, 1024 * 1024);
//! assert_eq!(config.repl_servers["repl0"].interval.as_secs(), 3 * 86400);
//! ```
//!
//! Loading is all-or-nothing: any malformed value yields a [`ConfigError`]
//! and no `Config` is produced.

mod defaults;
mod file;
mod parser;
mod settings;
mod units;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigError};
pub use parser::REPL_SECTION_PREFIX;
pub use settings::{ApplySettings, Config, GeneralSettings, MergeSettings, ReplServerSettings};
pub use units::{
    parse_compress_opt, parse_period, parse_size_unit, Codec, CompressOpt, UnitParseError,
};
