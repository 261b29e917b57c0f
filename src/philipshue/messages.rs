//! One-line messages the shell prints around command output.

use crate::error::{ErrorKind, Result};
use crate::styles::Appearance;
use outstanding::Renderer;
use serde::Serialize;
use std::time::Duration;

const ERROR_TEMPLATE: &str = r#"{{ kind | style("error_kind") }}: {{ message }}"#;
const TIMING_TEMPLATE: &str = r#"{{ text | style("timing") }}"#;
const STATUS_TEMPLATE: &str = r#"{{ text | style("status") }}"#;

#[derive(Serialize)]
struct ErrorData<'a> {
    kind: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct TextData<'a> {
    text: &'a str,
}

pub struct Messages {
    renderer: Renderer,
}

impl Messages {
    pub fn new(appearance: &Appearance) -> Result<Self> {
        let mut renderer = Renderer::new(&appearance.theme, appearance.depth());
        renderer.add_template("error", ERROR_TEMPLATE)?;
        renderer.add_template("timing", TIMING_TEMPLATE)?;
        renderer.add_template("status", STATUS_TEMPLATE)?;
        Ok(Self { renderer })
    }

    /// `NameError: name 'x' is not defined`
    pub fn error(&self, kind: ErrorKind, message: &str) -> Result<String> {
        Ok(self.renderer.render(
            "error",
            &ErrorData {
                kind: kind.label(),
                message,
            },
        )?)
    }

    /// `Time taken: 12.345 ms`
    pub fn timing(&self, elapsed: Duration) -> Result<String> {
        let text = format!("Time taken: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
        Ok(self.renderer.render("timing", &TextData { text: &text })?)
    }

    pub fn status(&self, text: &str) -> Result<String> {
        Ok(self.renderer.render("status", &TextData { text })?)
    }
}
