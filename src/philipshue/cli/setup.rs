use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "philipshue", bin_name = "philipshue", version)]
#[command(about = "Interactive shell for the Philips Hue bridge API", long_about = None)]
#[command(after_help = "\
Examples (at the > prompt):
  lights                               list all lights
  lights(1).state(on=True, bri=200)    change a light's state
  lights(1).state(ct=mired(2700))      warm white
  lights(1).state(**rgb_to_xybri(1, 0, 0))
  groups(http_method='post', name='Kitchen', lights=['1', '2'])")]
pub struct Cli {
    /// Credentials file [default: ~/.philipshue.ini]
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log bridge requests and state changes to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Logs go to stderr so they never interleave with command output on stdout.
/// `--verbose` forces debug level; otherwise `RUST_LOG` applies, defaulting to warnings.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["philipshue"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_config_and_verbose() {
        let cli = Cli::try_parse_from(["philipshue", "--config", "/tmp/hue.ini", "-v"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/hue.ini")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["philipshue", "lights"]).is_err());
    }
}
