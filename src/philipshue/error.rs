use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Readline error: {0}")]
    Readline(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

pub type Result<T> = std::result::Result<T, HueError>;

/// The error categories shown to the user, printed as `<Kind>: <message>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Value,
    Remote,
    Connection,
    Io,
    Setup,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::Value => "ValueError",
            ErrorKind::Remote => "RemoteError",
            ErrorKind::Connection => "ConnectionError",
            ErrorKind::Io => "IOError",
            ErrorKind::Setup => "SetupError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
