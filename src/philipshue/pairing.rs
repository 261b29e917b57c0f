//! First-run pairing with a bridge.
//!
//! 1. Show whatever the discovery service reports (best effort).
//! 2. Ask for the bridge address.
//! 3. Once the link button is pressed, register and receive a username.
//! 4. Save the credentials.
//!
//! Any failure in steps 3 and 4 is reported and the flow starts over. Interrupting a prompt
//! or closing input aborts pairing altogether.

use crate::bridge::{default_devicetype, Connector};
use crate::config::{CredentialStore, Credentials};
use crate::error::{ErrorKind, HueError};
use crate::format::format_value;
use crate::input::{LineSource, ReadOutcome};
use crate::messages::Messages;
use crate::styles::Appearance;
use std::io::Write;
use thiserror::Error;
use tracing::{info, warn};

pub const ADDRESS_PROMPT: &str = "Enter the Bridge IP address: ";
pub const LINK_BUTTON_PROMPT: &str = "Press the link button on the bridge, then press Return: ";

#[derive(Error, Debug)]
pub enum PairingError {
    #[error("pairing aborted")]
    Aborted,

    #[error(transparent)]
    Hue(#[from] HueError),
}

impl From<std::io::Error> for PairingError {
    fn from(err: std::io::Error) -> Self {
        PairingError::Hue(HueError::Io(err))
    }
}

pub struct Pairing<'a, C: Connector, L: LineSource, W: Write> {
    pub connector: &'a C,
    pub store: &'a CredentialStore,
    pub input: &'a mut L,
    pub out: &'a mut W,
    pub appearance: &'a Appearance,
    pub messages: &'a Messages,
}

impl<C: Connector, L: LineSource, W: Write> Pairing<'_, C, L, W> {
    pub fn run(&mut self) -> Result<Credentials, PairingError> {
        let devicetype = default_devicetype();
        loop {
            self.show_discovered()?;

            let address = match self.input.read_line(ADDRESS_PROMPT)? {
                ReadOutcome::Line(line) => line.trim().to_string(),
                ReadOutcome::Interrupted | ReadOutcome::Eof => return Err(PairingError::Aborted),
            };
            if address.is_empty() {
                continue;
            }

            match self.input.read_line(LINK_BUTTON_PROMPT)? {
                ReadOutcome::Line(_) => {}
                ReadOutcome::Interrupted | ReadOutcome::Eof => return Err(PairingError::Aborted),
            }

            let username = match self.connector.register(&address, &devicetype) {
                Ok(username) => username,
                Err(err) => {
                    self.report(ErrorKind::Setup, &err.to_string())?;
                    continue;
                }
            };

            let credentials = Credentials::new(address, username);
            if let Err(err) = self.store.save(&credentials) {
                self.report(ErrorKind::Io, &err.to_string())?;
                continue;
            }
            info!(bridge = %credentials.bridge_location, "paired with bridge");
            return Ok(credentials);
        }
    }

    fn show_discovered(&mut self) -> Result<(), PairingError> {
        match self.connector.discover() {
            Ok(bridges) => {
                writeln!(self.out, "Detected Philips Hue Bridges:")?;
                writeln!(
                    self.out,
                    "{}",
                    format_value(&bridges, &self.appearance.theme, self.appearance.depth())
                )?;
                self.out.flush()?;
            }
            Err(err) => warn!(error = %err, "bridge discovery failed"),
        }
        Ok(())
    }

    fn report(&mut self, kind: ErrorKind, message: &str) -> Result<(), PairingError> {
        writeln!(self.out, "{}", self.messages.error(kind, message)?)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::memory::MemoryBridge;
    use crate::bridge::BridgeError;
    use crate::config::CONFIG_FILENAME;
    use crate::input::ScriptedInput;
    use serde_json::json;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: CredentialStore,
        appearance: Appearance,
        messages: Messages,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join(CONFIG_FILENAME));
        let appearance = Appearance::plain();
        let messages = Messages::new(&appearance).unwrap();
        Fixture {
            _dir: dir,
            store,
            appearance,
            messages,
        }
    }

    fn pair(
        fx: &Fixture,
        bridge: &MemoryBridge,
        input: &mut ScriptedInput,
    ) -> (Result<Credentials, PairingError>, String) {
        let mut out = Vec::new();
        let result = Pairing {
            connector: bridge,
            store: &fx.store,
            input,
            out: &mut out,
            appearance: &fx.appearance,
            messages: &fx.messages,
        }
        .run();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_pairing_saves_credentials() {
        let fx = fixture();
        let bridge = MemoryBridge::new()
            .with_discovery(Ok(json!([
                {"id": "001788fffe000000", "internalipaddress": "192.168.1.10"}
            ])))
            .queue_registration(Ok("abc123".to_string()));
        let mut input = ScriptedInput::lines(["192.168.1.10", ""]);

        let (result, out) = pair(&fx, &bridge, &mut input);

        assert_eq!(
            result.unwrap(),
            Credentials::new("192.168.1.10", "abc123")
        );
        assert!(out.starts_with("Detected Philips Hue Bridges:\n"));
        assert!(out.contains("'internalipaddress': '192.168.1.10'"));
        assert_eq!(input.prompts, vec![ADDRESS_PROMPT, LINK_BUTTON_PROMPT]);

        let content = fs::read_to_string(fx.store.path()).unwrap();
        assert!(content.contains("bridge_location = 192.168.1.10"));
        assert!(content.contains("bridge_username = abc123"));
        assert_eq!(
            fx.store.load().unwrap(),
            Some(Credentials::new("192.168.1.10", "abc123"))
        );

        let (address, devicetype) = &bridge.registrations()[0];
        assert_eq!(address, "192.168.1.10");
        assert!(devicetype.starts_with("philipshue#"));
    }

    #[test]
    fn test_link_button_error_restarts() {
        let fx = fixture();
        let bridge = MemoryBridge::new()
            .queue_registration(Err(BridgeError::remote(Some(101), "link button not pressed")))
            .queue_registration(Ok("second-try".to_string()));
        let mut input = ScriptedInput::lines(["10.0.0.5", "", "10.0.0.5", ""]);

        let (result, out) = pair(&fx, &bridge, &mut input);

        assert_eq!(result.unwrap().bridge_username, "second-try");
        assert!(out.contains("SetupError: link button not pressed\n"));
        assert_eq!(bridge.registrations().len(), 2);
    }

    #[test]
    fn test_empty_address_restarts_without_registering() {
        let fx = fixture();
        let bridge = MemoryBridge::new().queue_registration(Ok("tok".to_string()));
        let mut input = ScriptedInput::lines(["   ", "10.0.0.6", ""]);

        let (result, _) = pair(&fx, &bridge, &mut input);

        assert_eq!(result.unwrap().bridge_location, "10.0.0.6");
        assert_eq!(
            input.prompts,
            vec![ADDRESS_PROMPT, ADDRESS_PROMPT, LINK_BUTTON_PROMPT]
        );
        assert_eq!(bridge.registrations().len(), 1);
    }

    #[test]
    fn test_interrupt_and_eof_abort() {
        let fx = fixture();
        let bridge = MemoryBridge::new();

        let mut input = ScriptedInput::new([ReadOutcome::Interrupted]);
        let (result, _) = pair(&fx, &bridge, &mut input);
        assert!(matches!(result, Err(PairingError::Aborted)));

        let mut input = ScriptedInput::lines(["10.0.0.7"]);
        let (result, _) = pair(&fx, &bridge, &mut input);
        assert!(matches!(result, Err(PairingError::Aborted)));
        assert!(bridge.registrations().is_empty());
        assert_eq!(fx.store.load().unwrap(), None);
    }

    #[test]
    fn test_discovery_failure_is_not_fatal() {
        let fx = fixture();
        let bridge = MemoryBridge::new()
            .with_discovery(Err(BridgeError::Connection("offline".to_string())))
            .queue_registration(Ok("tok".to_string()));
        let mut input = ScriptedInput::lines(["10.0.0.8", ""]);

        let (result, out) = pair(&fx, &bridge, &mut input);

        assert!(result.is_ok());
        assert!(!out.contains("Detected"));
    }
}
