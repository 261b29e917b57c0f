use philipshue::error::{HueError, Result};
use philipshue::input::{LineSource, ReadOutcome};
use philipshue::interpreter::lexer::{tokenize_partial, Token, TokenKind};
use philipshue::interpreter::{Helper as HueFunction, VOCABULARY};
use philipshue::styles::{names, Appearance};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::{Hinter, HistoryHinter};
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Helper;
use rustyline::{CompletionType, Config, EditMode, Editor};
use std::borrow::Cow::{self, Borrowed, Owned};
use std::cell::Cell;
use std::path::PathBuf;
use tracing::{debug, warn};

struct HueHelper {
    appearance: Appearance,
    hinter: HistoryHinter,
    /// Byte offset of the bracket matching the one at the cursor.
    matched_bracket: Cell<Option<usize>>,
}

impl Helper for HueHelper {}

impl Completer for HueHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .char_indices()
            .rev()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map_or(0, |(i, c)| i + c.len_utf8());
        let prefix = &line[start..pos];
        if prefix.is_empty() {
            return Ok((pos, Vec::new()));
        }
        let helpers = HueFunction::ALL.map(|h| h.name());
        let candidates = VOCABULARY
            .iter()
            .chain(helpers.iter())
            .filter(|word| word.starts_with(prefix))
            .map(|word| Pair {
                display: word.to_string(),
                replacement: word.to_string(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for HueHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, ctx: &rustyline::Context<'_>) -> Option<String> {
        self.hinter.hint(line, pos, ctx)
    }
}

impl Validator for HueHelper {}

impl Highlighter for HueHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default && self.appearance.depth().is_colored() {
            Owned(self.appearance.style(names::PROMPT, prompt))
        } else {
            Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if self.appearance.depth().is_colored() {
            Owned(self.appearance.style(names::HINT, hint))
        } else {
            Borrowed(hint)
        }
    }

    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !self.appearance.depth().is_colored() {
            return Borrowed(line);
        }
        Owned(highlight_line(line, &self.appearance, self.matched_bracket.get()))
    }

    fn highlight_char(&self, line: &str, pos: usize, kind: CmdKind) -> bool {
        match kind {
            // The line as finally submitted carries no bracket mark.
            CmdKind::ForcedRefresh => {
                self.matched_bracket.set(None);
                false
            }
            CmdKind::MoveCursor => {
                let matched = matching_bracket(line, pos);
                self.matched_bracket.set(matched);
                matched.is_some()
            }
            CmdKind::Other => {
                self.matched_bracket.set(matching_bracket(line, pos));
                true
            }
        }
    }
}

/// `(open, close, search forward)` for bracket tokens.
fn bracket_pair(kind: &TokenKind) -> Option<(TokenKind, TokenKind, bool)> {
    match kind {
        TokenKind::LParen => Some((TokenKind::LParen, TokenKind::RParen, true)),
        TokenKind::RParen => Some((TokenKind::LParen, TokenKind::RParen, false)),
        TokenKind::LBracket => Some((TokenKind::LBracket, TokenKind::RBracket, true)),
        TokenKind::RBracket => Some((TokenKind::LBracket, TokenKind::RBracket, false)),
        TokenKind::LBrace => Some((TokenKind::LBrace, TokenKind::RBrace, true)),
        TokenKind::RBrace => Some((TokenKind::LBrace, TokenKind::RBrace, false)),
        _ => None,
    }
}

fn is_bracket(kind: &TokenKind) -> bool {
    bracket_pair(kind).is_some()
}

/// Finds the partner of the bracket under the cursor, or else just before it. Brackets
/// inside string literals are not brackets.
fn matching_bracket(line: &str, pos: usize) -> Option<usize> {
    let (tokens, _) = tokenize_partial(line);
    let at = tokens
        .iter()
        .position(|t| t.start == pos && is_bracket(&t.kind))
        .or_else(|| {
            tokens
                .iter()
                .position(|t| t.end == pos && is_bracket(&t.kind))
        })?;
    let (open, close, forward) = bracket_pair(&tokens[at].kind)?;
    let (toward, away) = if forward { (&open, &close) } else { (&close, &open) };

    let mut depth = 0usize;
    let mut scan = |token: &Token| {
        if token.kind == *toward {
            depth += 1;
        } else if token.kind == *away {
            depth -= 1;
            if depth == 0 {
                return Some(token.start);
            }
        }
        None
    };
    if forward {
        tokens[at..].iter().find_map(&mut scan)
    } else {
        tokens[..=at].iter().rev().find_map(&mut scan)
    }
}

/// Colors a partially typed command token by token; text from the first lexing error on is
/// marked invalid. The bracket starting at `bracket`, if any, gets the bracket style.
fn highlight_line(line: &str, appearance: &Appearance, bracket: Option<usize>) -> String {
    let (tokens, error_at) = tokenize_partial(line);
    let mut out = String::with_capacity(line.len() * 2);
    let mut cursor = 0;
    for token in tokens {
        out.push_str(&line[cursor..token.start]);
        let text = &line[token.start..token.end];
        let style = match &token.kind {
            kind if bracket == Some(token.start) && is_bracket(kind) => {
                Some(names::BRACKET)
            }
            TokenKind::Ident(name) if HueFunction::from_name(name).is_some() => {
                Some(names::FUNCTION)
            }
            TokenKind::Ident(name)
                if matches!(
                    name.as_str(),
                    "True" | "False" | "None" | "true" | "false" | "null"
                ) =>
            {
                Some(names::CONSTANT)
            }
            TokenKind::Ident(_) | TokenKind::Eof => None,
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::Minus => Some(names::NUMBER),
            TokenKind::Str(_) => Some(names::STRING),
            _ => Some(names::PUNCT),
        };
        match style {
            Some(name) => out.push_str(&appearance.style(name, text)),
            None => out.push_str(text),
        }
        cursor = token.end;
    }
    match error_at {
        Some(offset) => {
            out.push_str(&line[cursor..offset]);
            out.push_str(&appearance.style(names::INVALID, &line[offset..]));
        }
        None => out.push_str(&line[cursor..]),
    }
    out
}

/// Interactive input with history, hints, completion and live highlighting.
pub struct LineEditor {
    editor: Editor<HueHelper, DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl LineEditor {
    pub fn new(appearance: &Appearance, history_path: Option<PathBuf>) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .build();

        let helper = HueHelper {
            appearance: appearance.clone(),
            hinter: HistoryHinter::new(),
            matched_bracket: Cell::new(None),
        };

        let mut editor = Editor::with_config(config).map_err(readline_error)?;
        editor.set_helper(Some(helper));

        if let Some(path) = &history_path {
            if editor.load_history(path).is_err() {
                debug!(path = %path.display(), "no previous history");
            }
        }
        Ok(Self {
            editor,
            history_path,
        })
    }
}

impl LineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(readline_error(err)),
        }
    }

    fn add_history(&mut self, line: &str) -> Result<()> {
        self.editor
            .add_history_entry(line)
            .map_err(readline_error)?;
        if let Some(path) = &self.history_path {
            if let Err(e) = self.editor.save_history(path) {
                warn!(path = %path.display(), error = %e, "failed to save history");
            }
        }
        Ok(())
    }
}

fn readline_error(err: ReadlineError) -> HueError {
    HueError::Readline(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outstanding::{Background, ColorDepth, TerminalProfile};

    fn colored() -> Appearance {
        Appearance::new(TerminalProfile {
            background: Background::Dark,
            color_depth: ColorDepth::TrueColor,
        })
    }

    fn strip_ansi(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    #[test]
    fn test_highlight_preserves_text() {
        let appearance = colored();
        for line in [
            "lights(1).state(on=True, bri=200)",
            "  rgb_to_xybri(0.5, -1, 'x')  ",
            "lights('unterminated",
            "ümlaut[\"k\"]",
        ] {
            let out = highlight_line(line, &appearance, None);
            assert_eq!(strip_ansi(&out), line);
        }
    }

    #[test]
    fn test_highlight_styles_tokens() {
        let appearance = colored();
        let out = highlight_line("mired(2700)", &appearance, None);
        assert!(out.contains(&appearance.style(names::FUNCTION, "mired")));
        assert!(out.contains(&appearance.style(names::NUMBER, "2700")));

        let out = highlight_line("lights(;", &appearance, None);
        assert!(out.ends_with(&appearance.style(names::INVALID, ";")));
    }

    #[test]
    fn test_matching_bracket() {
        let line = "lights(1).state(xy=[0.1, 0.2])";
        // Cursor on the first '(' and just after its ')'.
        assert_eq!(matching_bracket(line, 6), Some(8));
        assert_eq!(matching_bracket(line, 9), Some(6));
        // Nested pairs match their own partner.
        assert_eq!(matching_bracket(line, 15), Some(29));
        assert_eq!(matching_bracket(line, 19), Some(28));
        assert_eq!(matching_bracket(line, 3), None);
        assert_eq!(matching_bracket("lights(2", 6), None);
        // Brackets in strings do not count.
        assert_eq!(matching_bracket("lights(')')", 6), Some(10));
    }

    #[test]
    fn test_highlight_marks_matched_bracket() {
        let appearance = colored();
        let line = "lights(1)";
        let out = highlight_line(line, &appearance, matching_bracket(line, 9));
        assert!(out.contains(&appearance.style(names::BRACKET, "(")));
        assert!(out.ends_with(&appearance.style(names::PUNCT, ")")));
        assert_eq!(strip_ansi(&out), line);
    }
}
