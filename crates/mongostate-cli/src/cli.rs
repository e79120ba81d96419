//! mongostate - declarative MongoDB index management
//!
//! # Commands
//!
//! - `plan` - Validate a declared index and print the createIndexes command
//! - `create` - Create an index and print it as the server reports it
//! - `read` - Print an index in declared shape, optionally checking drift
//! - `delete` - Drop an index (succeeds when it is already gone)
//! - `replace` - Drop and recreate an index

mod commands;
#[cfg(test)]
mod cli_tests;
mod logging;

use clap::{Args, Parser, Subcommand};
use logging::{LogFormat, LoggingConfig};
use mongostate_core::{ClientConfig, IndexIdentity};
use std::path::PathBuf;
use std::process::ExitCode;

/// Declarative MongoDB index management
#[derive(Parser, Debug)]
#[command(name = "mongostate")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty, env = "MONGOSTATE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

/// Connection settings; a URI takes precedence over the discrete fields
#[derive(Args, Debug, Clone, PartialEq)]
struct ConnectionArgs {
    /// Full connection URI (mongodb:// or mongodb+srv://)
    #[arg(long, global = true, env = "MONGOSTATE_URI", hide_env_values = true)]
    uri: Option<String>,

    /// Server host
    #[arg(long, global = true, env = "MONGOSTATE_HOST", default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(long, global = true, env = "MONGOSTATE_PORT", default_value_t = mongostate_core::DEFAULT_PORT)]
    port: u16,

    #[arg(long, global = true, env = "MONGOSTATE_USERNAME")]
    username: Option<String>,

    #[arg(long, global = true, env = "MONGOSTATE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Authentication database
    #[arg(long, global = true, env = "MONGOSTATE_AUTH_SOURCE")]
    auth_source: Option<String>,

    #[arg(long, global = true, env = "MONGOSTATE_REPLICA_SET")]
    replica_set: Option<String>,

    /// Connect with TLS
    #[arg(long, global = true, env = "MONGOSTATE_TLS")]
    tls: bool,

    /// Timeout for connecting and for each operation, in seconds
    #[arg(long, global = true, env = "MONGOSTATE_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u32,
}

impl ConnectionArgs {
    fn to_client_config(&self) -> ClientConfig {
        let mut config = match &self.uri {
            Some(uri) => ClientConfig::with_uri(uri.clone()),
            None => ClientConfig::with_host(self.host.clone(), self.port),
        };
        config.username = self.username.clone();
        config.password = self.password.clone();
        config.auth_source = self.auth_source.clone();
        config.replica_set = self.replica_set.clone();
        config.tls(self.tls).timeout(self.timeout_secs)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a declared index and print the createIndexes command
    Plan {
        /// Declared index JSON file
        file: PathBuf,
    },

    /// Create an index and print it as the server reports it
    Create {
        /// Declared index JSON file
        file: PathBuf,
    },

    /// Print an index in declared shape
    Read {
        /// Index identifier: database.collection.index_name
        id: IndexIdentity,

        /// Declared index JSON file to check for drift; exits with 2 on drift
        #[arg(long)]
        compare: Option<PathBuf>,
    },

    /// Drop an index; succeeds when it is already gone
    Delete {
        /// Index identifier: database.collection.index_name
        id: IndexIdentity,
    },

    /// Drop and recreate an index
    Replace {
        /// Declared index JSON file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(LoggingConfig::default().with_format(cli.log_format))?;

    commands::run(cli).await
}
