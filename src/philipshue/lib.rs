//! # Philipshue Architecture
//!
//! Philipshue is an interactive shell for the Philips Hue bridge REST API. Each line typed at
//! the `> ` prompt is a small expression (`lights(1).state(on=True)`) that is parsed, turned
//! into at most one HTTP request, and answered with the bridge's JSON, pretty-printed.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Arguments, logging, rustyline editor, exit codes         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session (session.rs, pairing.rs)                           │
//! │  - Credentials → pairing → connect → read-eval-print        │
//! │  - Reads through `LineSource`, writes to any `io::Write`    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Interpreter (interpreter/)                                 │
//! │  - Lexer, parser, name check, evaluation to requests        │
//! │  - Helpers: mired, rgb_to_xybri (color.rs)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bridge (bridge/)                                           │
//! │  - `Transport` / `Connector` traits                         │
//! │  - HttpConnector (production), MemoryBridge (testing)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No Terminal Assumptions Below the CLI
//!
//! The session writes to a generic writer and reads from a [`input::LineSource`], so the whole
//! loop, pairing included, runs in tests against scripted input and an in-memory bridge.
//! Only `cli/` knows about stdout, the line editor and `std::process::exit`.
//!
//! ## Testing Strategy
//!
//! 1. **Interpreter, color, format**: unit tests of the language and the printer. Most of the
//!    coverage lives here.
//! 2. **Session and pairing**: scripted conversations against [`bridge::memory::MemoryBridge`],
//!    asserting on printed output, recorded requests and the exit code.
//! 3. **CLI**: argument parsing unit tests plus `tests/cli.rs`, which drives the binary.
//!
//! ## Module Overview
//!
//! - [`bridge`]: request methods, error mapping, transports
//! - [`color`]: color temperature and RGB conversions
//! - [`config`]: the credentials file
//! - [`error`]: crate errors and the printed error kinds
//! - [`format`]: pretty-printing of JSON results
//! - [`input`]: the line source abstraction
//! - [`interpreter`]: the command language
//! - [`interrupt`]: Ctrl-C while a command runs
//! - [`messages`]: error, status and timing lines
//! - [`pairing`]: first-run registration with a bridge
//! - [`session`]: the state machine driving the shell
//! - [`styles`]: color themes

pub mod bridge;
pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod input;
pub mod interpreter;
pub mod interrupt;
pub mod messages;
pub mod pairing;
pub mod session;
pub mod styles;
