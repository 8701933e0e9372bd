//! Peerchat CLI Library
//!
//! Terminal front end for a peerchat session:
//! - `cli`: command-line arguments
//! - `config`: TOML application configuration
//! - `loopback`: an in-process transport with simulated peers
//! - `prompt`: the line-oriented interactive interface

pub mod cli;
pub mod config;
pub mod error;
pub mod loopback;
pub mod prompt;

pub use cli::{Cli, Commands};
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use loopback::{LoopbackConfig, LoopbackTransport};
