//! # Session Loop
//!
//! ```text
//! Uninitialized ──(credentials found)──────────────▶ Connecting
//!       │                                               ▲   │
//!       └──(none)──▶ AwaitingCredentials ──(paired)─────┘   │
//!                          │                                ▼
//!                       (abort)                           Ready ◀─┐
//!                          ▼                                │ └──(command)
//!                    Terminated(0) ◀──(end of input)────────┤
//!                    Terminated(1) ◀──(connection failure)──┘
//! ```
//!
//! [`Session::step`] performs exactly one transition; [`Session::run`] steps until the
//! session terminates and returns the exit code.

use crate::bridge::{Connector, Method, Transport};
use crate::config::{CredentialStore, Credentials};
use crate::error::Result;
use crate::format::format_output;
use crate::input::{LineSource, ReadOutcome};
use crate::interpreter::{CommandError, Interpreter};
use crate::interrupt::InterruptFlag;
use crate::messages::Messages;
use crate::pairing::{Pairing, PairingError};
use crate::styles::Appearance;
use std::io::Write;
use std::time::Instant;
use tracing::{debug, warn};

pub const PROMPT: &str = "> ";

#[derive(Debug)]
pub enum State<T> {
    Uninitialized,
    AwaitingCredentials,
    Connecting(Credentials),
    Ready(T),
    Terminated(i32),
}

impl<T> State<T> {
    pub fn name(&self) -> &'static str {
        match self {
            State::Uninitialized => "uninitialized",
            State::AwaitingCredentials => "awaiting-credentials",
            State::Connecting(_) => "connecting",
            State::Ready(_) => "ready",
            State::Terminated(_) => "terminated",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            State::Terminated(code) => Some(*code),
            _ => None,
        }
    }
}

pub struct Session<C: Connector, L: LineSource, W: Write> {
    connector: C,
    store: CredentialStore,
    input: L,
    out: W,
    appearance: Appearance,
    messages: Messages,
    interrupts: InterruptFlag,
    state: State<C::Transport>,
}

impl<C: Connector, L: LineSource, W: Write> Session<C, L, W> {
    pub fn new(
        connector: C,
        store: CredentialStore,
        input: L,
        out: W,
        appearance: Appearance,
    ) -> Result<Self> {
        let messages = Messages::new(&appearance)?;
        Ok(Self {
            connector,
            store,
            input,
            out,
            appearance,
            messages,
            interrupts: InterruptFlag::new(),
            state: State::Uninitialized,
        })
    }

    /// Shares `flag` with a signal handler so Ctrl-C during a command cancels its output.
    pub fn with_interrupts(mut self, flag: InterruptFlag) -> Self {
        self.interrupts = flag;
        self
    }

    pub fn state(&self) -> &State<C::Transport> {
        &self.state
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn input(&self) -> &L {
        &self.input
    }

    /// Steps until the session terminates; returns the exit code.
    pub fn run(&mut self) -> Result<i32> {
        loop {
            if let Some(code) = self.state.exit_code() {
                return Ok(code);
            }
            self.step()?;
        }
    }

    pub fn step(&mut self) -> Result<()> {
        let state = std::mem::replace(&mut self.state, State::Terminated(0));
        let next = match state {
            State::Uninitialized => self.load_credentials(),
            State::AwaitingCredentials => self.pair()?,
            State::Connecting(credentials) => self.connect(&credentials)?,
            State::Ready(transport) => self.read_eval_print(transport)?,
            State::Terminated(code) => State::Terminated(code),
        };
        debug!(state = next.name(), "session transition");
        self.state = next;
        Ok(())
    }

    fn load_credentials(&self) -> State<C::Transport> {
        match self.store.load() {
            Ok(Some(credentials)) => State::Connecting(credentials),
            Ok(None) => State::AwaitingCredentials,
            Err(err) => {
                warn!(
                    path = %self.store.path().display(),
                    error = %err,
                    "could not read credentials"
                );
                State::AwaitingCredentials
            }
        }
    }

    fn pair(&mut self) -> Result<State<C::Transport>> {
        let result = Pairing {
            connector: &self.connector,
            store: &self.store,
            input: &mut self.input,
            out: &mut self.out,
            appearance: &self.appearance,
            messages: &self.messages,
        }
        .run();
        match result {
            Ok(credentials) => Ok(State::Connecting(credentials)),
            Err(PairingError::Aborted) => Ok(State::Terminated(0)),
            Err(PairingError::Hue(err)) => Err(err),
        }
    }

    fn connect(&mut self, credentials: &Credentials) -> Result<State<C::Transport>> {
        let address = &credentials.bridge_location;
        let line = self.messages.status(&format!("Connecting to {address}..."))?;
        writeln!(self.out, "{line}")?;
        self.out.flush()?;

        let transport = self.connector.connect(credentials);
        match transport.request(Method::Get, &["lights".to_string()], None) {
            Ok(lights) => {
                let count = lights.as_object().map_or(0, |m| m.len());
                let line = self
                    .messages
                    .status(&format!("Connected to {address}. {count} lights found."))?;
                writeln!(self.out, "{line}")?;
                self.out.flush()?;
                Ok(State::Ready(transport))
            }
            Err(err) => {
                let err = CommandError::from(err);
                writeln!(self.out, "{}", self.messages.error(err.kind(), &err.to_string())?)?;
                self.out.flush()?;
                Ok(State::Terminated(1))
            }
        }
    }

    fn read_eval_print(&mut self, transport: C::Transport) -> Result<State<C::Transport>> {
        let line = match self.input.read_line(PROMPT)? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted | ReadOutcome::Eof => return Ok(State::Terminated(0)),
        };
        let command = line.trim();
        if command.is_empty() {
            return Ok(State::Ready(transport));
        }
        self.input.add_history(command)?;

        let started = Instant::now();
        self.interrupts.arm();
        let result = Interpreter::new(&transport).evaluate(command);
        let interrupted = self.interrupts.disarm();
        let elapsed = started.elapsed();

        if interrupted {
            debug!(command, "command interrupted");
            return Ok(State::Ready(transport));
        }

        match result {
            Ok(output) => {
                let text = format_output(&output, &self.appearance.theme, self.appearance.depth());
                writeln!(self.out, "{text}")?;
            }
            Err(err) => {
                writeln!(self.out, "{}", self.messages.error(err.kind(), &err.to_string())?)?;
                if err.is_fatal() {
                    self.out.flush()?;
                    return Ok(State::Terminated(1));
                }
            }
        }
        writeln!(self.out, "{}", self.messages.timing(elapsed)?)?;
        self.out.flush()?;
        Ok(State::Ready(transport))
    }
}
