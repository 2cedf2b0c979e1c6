//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Fetch new mail from a POP3 mailbox and print it as JSON.
#[derive(Debug, Parser)]
#[command(name = "popledger", version, about, long_about = None)]
pub struct Cli {
    /// Account configuration file (default: `$POPLEDGER_CONFIG` or
    /// `<config dir>/popledger/config.json`)
    pub config: Option<PathBuf>,

    /// Fetch every message, not only the ones not seen before
    #[arg(long)]
    pub all: bool,

    /// Seen-uid state file (default: `<data dir>/popledger/seen_uids.json`)
    #[arg(long, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Log protocol traffic at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["popledger"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.all);
        assert!(cli.state.is_none());
    }

    #[test]
    fn test_config_and_all() {
        let cli = Cli::try_parse_from(["popledger", "work.json", "--all"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("work.json")));
        assert!(cli.all);
    }

    #[test]
    fn test_state_override() {
        let cli = Cli::try_parse_from(["popledger", "--state", "/tmp/seen.json", "-v"]).unwrap();
        assert_eq!(cli.state, Some(PathBuf::from("/tmp/seen.json")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_clap_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
