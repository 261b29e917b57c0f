use crate::error::Result;

/// What a prompt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C.
    Interrupted,
    /// Ctrl-D or closed input.
    Eof,
}

/// Where interactive input comes from. The binary uses a line editor; tests use a script.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    fn add_history(&mut self, _line: &str) -> Result<()> {
        Ok(())
    }
}

/// Replays a fixed list of outcomes, then reports end of input.
#[cfg(any(test, feature = "test_utils"))]
#[derive(Debug, Default)]
pub struct ScriptedInput {
    outcomes: std::collections::VecDeque<ReadOutcome>,
    pub prompts: Vec<String>,
    pub history: Vec<String>,
}

#[cfg(any(test, feature = "test_utils"))]
impl ScriptedInput {
    pub fn new(outcomes: impl IntoIterator<Item = ReadOutcome>) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(lines.into_iter().map(|l| ReadOutcome::Line(l.to_string())))
    }
}

#[cfg(any(test, feature = "test_utils"))]
impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn add_history(&mut self, line: &str) -> Result<()> {
        self.history.push(line.to_string());
        Ok(())
    }
}
