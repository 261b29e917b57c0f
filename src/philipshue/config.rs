//! # Credential Store
//!
//! Bridge credentials live in a small INI file, `~/.philipshue.ini` by default:
//!
//! ```text
//! [DEFAULT]
//! bridge_location = 192.168.1.10
//! bridge_username = 1028d66426293e821ecfd9ef1a0731df
//! ```
//!
//! The file may hold other keys and sections; saving rewrites only the two credential keys
//! and leaves everything else (including comments) untouched. Saves go through a temporary
//! file in the same directory followed by a rename, so a reader never sees one key without
//! the other.

use crate::error::{HueError, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILENAME: &str = ".philipshue.ini";
pub const HISTORY_FILENAME: &str = ".philipshue.hist";
pub const DEFAULT_SECTION: &str = "DEFAULT";
pub const LOCATION_KEY: &str = "bridge_location";
pub const USERNAME_KEY: &str = "bridge_username";

/// Address and access token of a paired bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub bridge_location: String,
    pub bridge_username: String,
}

impl Credentials {
    pub fn new(bridge_location: impl Into<String>, bridge_username: impl Into<String>) -> Self {
        Self {
            bridge_location: bridge_location.into(),
            bridge_username: bridge_username.into(),
        }
    }
}

/// Reads and writes [`Credentials`] at a fixed path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when the file is missing or lacks either credential key.
    pub fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no credentials file");
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let doc = IniDocument::parse(&content);
        let location = doc.get(DEFAULT_SECTION, LOCATION_KEY);
        let username = doc.get(DEFAULT_SECTION, USERNAME_KEY);
        match (location, username) {
            (Some(location), Some(username)) => Ok(Some(Credentials::new(location, username))),
            _ => {
                debug!(path = %self.path.display(), "credentials file is incomplete");
                Ok(None)
            }
        }
    }

    /// Writes both credential keys, preserving whatever else the file contains.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut doc = if self.path.exists() {
            IniDocument::parse(&fs::read_to_string(&self.path)?)
        } else {
            IniDocument::default()
        };
        doc.set(DEFAULT_SECTION, LOCATION_KEY, &credentials.bridge_location)?;
        doc.set(DEFAULT_SECTION, USERNAME_KEY, &credentials.bridge_username)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(doc.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| HueError::Io(e.error))?;

        info!(path = %self.path.display(), "saved bridge credentials");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Section(String),
    Entry { key: String, value: String },
    Other(String),
}

/// A line-preserving INI document.
///
/// Keys are case-insensitive and stored lowercase. Entries before the first section header
/// belong to `DEFAULT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    lines: Vec<Line>,
}

impl IniDocument {
    pub fn parse(content: &str) -> Self {
        let lines = content.lines().map(parse_line).collect();
        Self { lines }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_ascii_lowercase();
        let mut current = DEFAULT_SECTION;
        for line in &self.lines {
            match line {
                Line::Section(name) => current = name.as_str(),
                Line::Entry { key: k, value } if current == section && *k == key => {
                    return Some(value.as_str());
                }
                _ => {}
            }
        }
        None
    }

    /// Sets `key` in `section`, replacing an existing entry or appending one to the section.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        if value.contains(['\n', '\r']) {
            return Err(HueError::Config(format!(
                "value for {key} cannot span multiple lines"
            )));
        }
        let key = key.to_ascii_lowercase();
        let entry = Line::Entry {
            key: key.clone(),
            value: value.trim().to_string(),
        };

        let mut current = DEFAULT_SECTION;
        let mut existing = None;
        let mut insert_at = None;
        for (i, line) in self.lines.iter().enumerate() {
            match line {
                Line::Section(name) => {
                    current = name.as_str();
                    if current == section {
                        insert_at = Some(i + 1);
                    }
                }
                Line::Entry { key: k, .. } if current == section => {
                    if *k == key {
                        existing = Some(i);
                        break;
                    }
                    insert_at = Some(i + 1);
                }
                _ => {}
            }
        }

        match (existing, insert_at) {
            (Some(i), _) => self.lines[i] = entry,
            (None, Some(i)) => self.lines.insert(i, entry),
            (None, None) => {
                let mut head = vec![Line::Section(section.to_string()), entry];
                if !self.lines.is_empty() {
                    head.push(Line::Other(String::new()));
                }
                head.append(&mut self.lines);
                self.lines = head;
            }
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Section(name) => out.push_str(&format!("[{name}]")),
                Line::Entry { key, value } => out.push_str(&format!("{key} = {value}")),
                Line::Other(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
        return Line::Other(raw.to_string());
    }
    if let Some(name) = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return Line::Section(name.trim().to_string());
    }
    match trimmed.find(['=', ':']) {
        Some(pos) if pos > 0 => Line::Entry {
            key: trimmed[..pos].trim().to_ascii_lowercase(),
            value: trimmed[pos + 1..].trim().to_string(),
        },
        _ => Line::Other(raw.to_string()),
    }
}
