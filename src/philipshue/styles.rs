use console::Color;
use once_cell::sync::Lazy;
use outstanding::{AdaptiveTheme, ColorDepth, Paint, TerminalProfile, Theme};

/// Environment variable that overrides the detected color depth.
pub const COLOR_DEPTH_VAR: &str = "PHILIPSHUE_COLOR_DEPTH";

pub mod names {
    // Output tokens
    pub const PUNCT: &str = "punct";
    pub const KEY: &str = "key";
    pub const STRING: &str = "string";
    pub const NUMBER: &str = "number";
    pub const CONSTANT: &str = "constant";
    pub const FUNCTION: &str = "function";

    // Shell chrome
    pub const ERROR_KIND: &str = "error_kind";
    pub const TIMING: &str = "timing";
    pub const STATUS: &str = "status";
    pub const PROMPT: &str = "prompt";
    pub const HINT: &str = "hint";
    pub const INVALID: &str = "invalid";
    pub const BRACKET: &str = "bracket";
}

fn with_chrome(theme: Theme) -> Theme {
    theme
        .add(names::ERROR_KIND, Paint::ansi(Color::Red).bold())
        .add(names::TIMING, Paint::ansi(Color::Blue).bold())
        .add(names::STATUS, Paint::ansi(Color::Green))
        .add(names::PROMPT, Paint::new().bold())
        .add(names::INVALID, Paint::ansi(Color::Red))
        .add(names::BRACKET, Paint::ansi(Color::Blue).bold())
}

/// Light-on-dark palette.
fn monokai() -> Theme {
    with_chrome(
        Theme::new()
            .add(names::PUNCT, Paint::rgb(248, 248, 242))
            .add(names::KEY, Paint::rgb(230, 219, 116))
            .add(names::STRING, Paint::rgb(230, 219, 116))
            .add(names::NUMBER, Paint::rgb(174, 129, 255))
            .add(names::CONSTANT, Paint::rgb(102, 217, 239))
            .add(names::FUNCTION, Paint::rgb(166, 226, 46))
            .add(names::HINT, Paint::rgb(117, 113, 94).italic()),
    )
}

/// Dark-on-light palette.
fn monokai_light() -> Theme {
    with_chrome(
        Theme::new()
            .add(names::PUNCT, Paint::rgb(39, 40, 34))
            .add(names::KEY, Paint::rgb(153, 143, 47))
            .add(names::STRING, Paint::rgb(153, 143, 47))
            .add(names::NUMBER, Paint::rgb(126, 87, 194))
            .add(names::CONSTANT, Paint::rgb(0, 137, 179))
            .add(names::FUNCTION, Paint::rgb(103, 157, 0))
            .add(names::HINT, Paint::rgb(160, 160, 150).italic()),
    )
}

pub static HUE_THEME: Lazy<AdaptiveTheme> =
    Lazy::new(|| AdaptiveTheme::new(monokai_light(), monokai()));

/// The terminal profile and the theme resolved for it. Computed once at startup.
#[derive(Debug, Clone)]
pub struct Appearance {
    pub profile: TerminalProfile,
    pub theme: Theme,
}

impl Appearance {
    pub fn new(profile: TerminalProfile) -> Self {
        Self {
            profile,
            theme: HUE_THEME.resolve(profile.background).clone(),
        }
    }

    pub fn detect() -> Self {
        Self::new(TerminalProfile::detect(COLOR_DEPTH_VAR))
    }

    /// No escape codes at all.
    pub fn plain() -> Self {
        Self::new(TerminalProfile::plain())
    }

    pub fn depth(&self) -> ColorDepth {
        self.profile.color_depth
    }

    pub fn style(&self, name: &str, text: &str) -> String {
        self.theme.apply(name, text, self.depth())
    }
}
