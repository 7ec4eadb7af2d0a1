use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hbcli",
    about = "Invoke named commands on a hostbridge host",
    version
)]
pub struct Cli {
    /// Per-call timeout in milliseconds (overrides the config file)
    #[arg(long, global = true, conflicts_with = "no_timeout")]
    pub timeout_ms: Option<u64>,
    /// Wait for answers forever
    #[arg(long, global = true)]
    pub no_timeout: bool,
    /// Config file to use instead of the discovered one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send a JSON payload and print the decoded response
    Invoke {
        /// Command name
        command: String,
        /// JSON payload (defaults to {})
        payload: Option<String>,
    },
    /// Send a JSON payload and only wait for completion
    Void {
        command: String,
        payload: Option<String>,
    },
    /// Send raw text and print the raw response
    Text {
        command: String,
        /// Text payload (defaults to empty)
        text: Option<String>,
    },
    /// List the commands the host answers
    List,
    /// Run a scripted set of concurrent calls and print a transcript
    Demo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_invoke_with_global_flags() {
        let cli = Cli::try_parse_from(["hbcli", "invoke", "add", r#"{"a":1,"b":2}"#, "--timeout-ms", "50"]).unwrap();
        assert_eq!(cli.timeout_ms, Some(50));
        match cli.command {
            Command::Invoke { command, payload } => {
                assert_eq!(command, "add");
                assert_eq!(payload.as_deref(), Some(r#"{"a":1,"b":2}"#));
            }
            _ => panic!("expected invoke"),
        }
    }

    #[test]
    fn test_timeout_flags_conflict() {
        let parsed = Cli::try_parse_from(["hbcli", "--timeout-ms", "5", "--no-timeout", "list"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_text_payload_optional() {
        let cli = Cli::try_parse_from(["hbcli", "text", "echo"]).unwrap();
        assert!(matches!(cli.command, Command::Text { text: None, .. }));
    }
}
