//! The terminal front end: argument parsing, logging setup, and the line editor.
//!
//! Everything below this module is thin wiring. Session behavior lives in the library
//! (`philipshue::session`) and is tested there with scripted input and an in-memory bridge.

mod editor;
pub mod setup;

use clap::Parser;
use directories::BaseDirs;
use editor::LineEditor;
use philipshue::bridge::http::HttpConnector;
use philipshue::config::{CredentialStore, CONFIG_FILENAME, HISTORY_FILENAME};
use philipshue::error::{HueError, Result};
use philipshue::interrupt::InterruptFlag;
use philipshue::session::Session;
use philipshue::styles::Appearance;
use setup::{init_tracing, Cli};
use std::path::PathBuf;
use tracing::{debug, warn};

pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let home = BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    let config_path = resolve_config_path(cli.config, home.as_deref())?;
    let history_path = home.map(|h| h.join(HISTORY_FILENAME));
    debug!(config = %config_path.display(), "resolved credentials file");

    let appearance = Appearance::detect();
    let connector = HttpConnector::new().map_err(|e| HueError::Config(e.to_string()))?;
    let editor = LineEditor::new(&appearance, history_path)?;
    let interrupts = install_interrupt_handler();

    let mut session = Session::new(
        connector,
        CredentialStore::new(config_path),
        editor,
        std::io::stdout(),
        appearance,
    )?
    .with_interrupts(interrupts);
    session.run()
}

/// SIGINT during a command cancels the command. Outside a command the line editor owns
/// Ctrl-C, so a signal there keeps its usual meaning.
fn install_interrupt_handler() -> InterruptFlag {
    let flag = InterruptFlag::new();
    let handler_flag = flag.clone();
    let installed = ctrlc::set_handler(move || {
        if !handler_flag.raise() {
            std::process::exit(130);
        }
    });
    if let Err(e) = installed {
        warn!(error = %e, "could not install the interrupt handler");
    }
    flag
}

fn resolve_config_path(
    explicit: Option<PathBuf>,
    home: Option<&std::path::Path>,
) -> Result<PathBuf> {
    match (explicit, home) {
        (Some(path), _) => Ok(path),
        (None, Some(home)) => Ok(home.join(CONFIG_FILENAME)),
        (None, None) => Err(HueError::Config(
            "could not determine the home directory; pass --config".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_path_resolution() {
        let explicit = PathBuf::from("/etc/hue.ini");
        assert_eq!(
            resolve_config_path(Some(explicit.clone()), Some(Path::new("/home/me"))).unwrap(),
            explicit
        );
        assert_eq!(
            resolve_config_path(None, Some(Path::new("/home/me"))).unwrap(),
            Path::new("/home/me").join(".philipshue.ini")
        );
        assert!(matches!(
            resolve_config_path(None, None),
            Err(HueError::Config(_))
        ));
    }
}
