use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// azmachine - single Azure VM provisioning service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Run the HTTP API
    Serve {
        /// API port (default: SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a machine with its NIC and disks
    Create {
        /// Machine name; resource names are derived from it
        name: String,

        /// JSON file holding the provisioning spec
        #[arg(short, long)]
        spec: PathBuf,

        /// Go through a running server (AZMACHINE_API_URL) instead of in-process
        #[arg(long)]
        remote: bool,

        /// Give up and roll back after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Delete a machine and everything named after it
    Delete {
        /// Machine name
        name: String,

        /// JSON file holding the provisioning spec
        #[arg(short, long)]
        spec: PathBuf,

        /// Go through a running server (AZMACHINE_API_URL) instead of in-process
        #[arg(long)]
        remote: bool,
    },

    /// Show the status of a machine
    Status {
        /// Machine name
        name: String,

        /// JSON file holding the provisioning spec
        #[arg(short, long)]
        spec: PathBuf,

        /// Go through a running server (AZMACHINE_API_URL) instead of in-process
        #[arg(long)]
        remote: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_arguments() {
        let args = Args::try_parse_from([
            "azmachine-server",
            "create",
            "vm-1",
            "--spec",
            "spec.json",
            "--timeout",
            "900",
        ])
        .unwrap();

        match args.mode {
            Mode::Create {
                name,
                spec,
                remote,
                timeout,
                output,
            } => {
                assert_eq!(name, "vm-1");
                assert_eq!(spec, PathBuf::from("spec.json"));
                assert!(!remote);
                assert_eq!(timeout, Some(900));
                assert_eq!(output, "table");
            }
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn test_spec_is_required() {
        assert!(Args::try_parse_from(["azmachine-server", "delete", "vm-1"]).is_err());
    }
}
