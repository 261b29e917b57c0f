//! # Outstanding - Styled Terminal Output
//!
//! A small system for styling terminal output with named styles, themes that adapt to the
//! terminal background, and graceful degradation across color depths.
//!
//! ## The Problem
//!
//! Interactive tools want colored output, but:
//! - Terminals differ in how many colors they support (none, 16, 256, 24-bit)
//! - A palette that reads well on a dark background is unreadable on a light one
//! - Sprinkling ANSI codes through formatting code couples layout and presentation
//!
//! ## The Solution
//!
//! Outstanding separates concerns:
//! - **Profiles** ([`TerminalProfile`]) describe what the terminal can do. They are computed
//!   once from an [`EnvSnapshot`] and passed around explicitly.
//! - **Styles** are named [`Paint`] values collected in a [`Theme`]
//! - **Templates** (via minijinja) apply styles with a `style` filter
//!
//! ## Quick Example
//!
//! ```rust
//! use outstanding::{AdaptiveTheme, Paint, Renderer, TerminalProfile, Theme};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Data {
//!     kind: String,
//!     message: String,
//! }
//!
//! let theme = AdaptiveTheme::new(
//!     Theme::new().add("kind", Paint::rgb(200, 40, 90).bold()),
//!     Theme::new().add("kind", Paint::rgb(249, 38, 114).bold()),
//! );
//! let profile = TerminalProfile::plain();
//!
//! let mut renderer = Renderer::new(theme.resolve(profile.background), profile.color_depth);
//! renderer
//!     .add_template("error", r#"{{ kind | style("kind") }}: {{ message }}"#)
//!     .unwrap();
//!
//! let data = Data { kind: "NameError".into(), message: "name 'x' is not defined".into() };
//! let output = renderer.render("error", &data).unwrap();
//! assert_eq!(output, "NameError: name 'x' is not defined");
//! ```
//!
//! ## Terminal Detection
//!
//! Detection reads two optional environment variables:
//! - `COLORFGBG` (`fg;bg`, as exported by rxvt, Konsole and others) for the background
//! - an application-chosen variable for the color depth (`1`, `4`, `8`, `24` or
//!   `DEPTH_<n>_BIT`)
//!
//! [`TerminalProfile::from_env`] is a pure function, so detection is testable without a
//! terminal. Anything unparsable degrades to [`Background::Unknown`] and
//! [`ColorDepth::None`].

use console::{Color, Style};
use minijinja::{Environment, Error, Value};
use serde::Serialize;
use std::collections::HashMap;
use std::io::IsTerminal;

/// Prefix shown when a style name is not found.
pub const MISSING_STYLE_INDICATOR: &str = "(!?)";

/// What is known about the terminal background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Unknown,
    Dark,
    Light,
}

/// How many colors the terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ColorDepth {
    #[default]
    None,
    Ansi16,
    Ansi256,
    TrueColor,
}

impl ColorDepth {
    /// Parses `1`, `4`, `8`, `24` or the `DEPTH_<n>_BIT` spelling.
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        let bits = upper
            .strip_prefix("DEPTH_")
            .unwrap_or(&upper)
            .trim_end_matches("_BIT");
        match bits.parse::<u8>().ok()? {
            1 => Some(ColorDepth::None),
            4 => Some(ColorDepth::Ansi16),
            8 => Some(ColorDepth::Ansi256),
            24 => Some(ColorDepth::TrueColor),
            _ => None,
        }
    }

    pub fn is_colored(self) -> bool {
        self != ColorDepth::None
    }
}

/// The slice of the process environment that terminal detection looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub colorfgbg: Option<String>,
    pub color_depth: Option<String>,
    pub is_terminal: bool,
}

impl EnvSnapshot {
    /// Captures the current process environment, reading the color depth from `depth_var`.
    pub fn capture(depth_var: &str) -> Self {
        Self {
            colorfgbg: std::env::var("COLORFGBG").ok(),
            color_depth: std::env::var(depth_var).ok(),
            is_terminal: std::io::stdout().is_terminal(),
        }
    }
}

/// Background and color depth of the output terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalProfile {
    pub background: Background,
    pub color_depth: ColorDepth,
}

impl TerminalProfile {
    /// A profile that never emits escape codes.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Derives a profile from an environment snapshot.
    ///
    /// An unset depth variable means 256 colors on a terminal and none when piped. A depth
    /// value that cannot be parsed disables color.
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let background = env
            .colorfgbg
            .as_deref()
            .map(parse_background)
            .unwrap_or_default();
        let color_depth = match env.color_depth.as_deref() {
            Some(raw) => ColorDepth::parse(raw).unwrap_or(ColorDepth::None),
            None if env.is_terminal => ColorDepth::Ansi256,
            None => ColorDepth::None,
        };
        Self {
            background,
            color_depth,
        }
    }

    pub fn detect(depth_var: &str) -> Self {
        Self::from_env(&EnvSnapshot::capture(depth_var))
    }
}

/// `COLORFGBG` is `fg;bg` or `fg;default;bg`, with ANSI palette indexes.
fn parse_background(colorfgbg: &str) -> Background {
    let fields: Vec<&str> = colorfgbg.split(';').map(str::trim).collect();
    if fields.len() < 2 {
        return Background::Unknown;
    }
    let (Ok(fg), Ok(bg)) = (fields[0].parse::<i32>(), fields[fields.len() - 1].parse::<i32>())
    else {
        return Background::Unknown;
    };
    match bg.cmp(&fg) {
        std::cmp::Ordering::Greater => Background::Light,
        std::cmp::Ordering::Less => Background::Dark,
        std::cmp::Ordering::Equal => Background::Unknown,
    }
}

/// A foreground color, either one of the eight basic ANSI colors or an RGB triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Ansi(Color),
    Rgb(u8, u8, u8),
}

/// A style that knows how to degrade to whatever color depth the terminal has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Paint {
    fg: Option<Tint>,
    bold: bool,
    italic: bool,
}

impl Paint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            fg: Some(Tint::Rgb(r, g, b)),
            ..Self::default()
        }
    }

    pub fn ansi(color: Color) -> Self {
        Self {
            fg: Some(Tint::Ansi(color)),
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Returns `text` wrapped in the escape codes for `depth`, or unchanged for
    /// [`ColorDepth::None`].
    pub fn paint(&self, text: &str, depth: ColorDepth) -> String {
        if !depth.is_colored() || (self.fg.is_none() && !self.bold && !self.italic) {
            return text.to_string();
        }

        if let (ColorDepth::TrueColor, Some(Tint::Rgb(r, g, b))) = (depth, self.fg) {
            let mut codes = Vec::new();
            if self.bold {
                codes.push("1".to_string());
            }
            if self.italic {
                codes.push("3".to_string());
            }
            codes.push(format!("38;2;{r};{g};{b}"));
            return format!("\x1b[{}m{}\x1b[0m", codes.join(";"), text);
        }

        let mut style = Style::new().force_styling(true);
        style = match (self.fg, depth) {
            (Some(Tint::Ansi(color)), _) => style.fg(color),
            (Some(Tint::Rgb(r, g, b)), ColorDepth::Ansi16) => {
                let (color, bright) = rgb_to_ansi16((r, g, b));
                let style = style.fg(color);
                if bright {
                    style.bright()
                } else {
                    style
                }
            }
            (Some(Tint::Rgb(r, g, b)), _) => style.color256(rgb_to_ansi256((r, g, b))),
            (None, _) => style,
        };
        if self.bold {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        style.apply_to(text).to_string()
    }
}

/// A collection of named styles.
///
/// Styles are registered by name and applied by name, either directly or via the `style`
/// filter in templates. When a style name is not found, a configurable indicator is
/// prepended to the text to help catch typos (defaults to `(!?)`).
///
/// # Example
///
/// ```rust
/// use outstanding::{ColorDepth, Paint, Styles};
///
/// let styles = Styles::new()
///     .add("error", Paint::rgb(220, 50, 47).bold())
///     .add("dim", Paint::rgb(128, 128, 128));
///
/// let plain = styles.apply("error", "Something went wrong", ColorDepth::None);
/// assert_eq!(plain, "Something went wrong");
///
/// let unknown = styles.apply("typo", "Hello", ColorDepth::None);
/// assert!(unknown.starts_with("(!?)"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Styles {
    styles: HashMap<String, Paint>,
}

impl Styles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named style. If a style with the same name exists, it is replaced.
    pub fn add(mut self, name: &str, paint: Paint) -> Self {
        self.styles.insert(name.to_string(), paint);
        self
    }

    /// Applies a named style to text at the given depth.
    pub fn apply(&self, name: &str, text: &str, depth: ColorDepth) -> String {
        match self.styles.get(name) {
            Some(paint) => paint.paint(text, depth),
            None => format!("{MISSING_STYLE_INDICATOR} {text}"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Paint> {
        self.styles.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.styles.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// A named collection of styles.
#[derive(Debug, Clone, Default)]
pub struct Theme {
    styles: Styles,
}

impl Theme {
    pub fn new() -> Self {
        Self {
            styles: Styles::new(),
        }
    }

    /// Adds a named style, returning an updated theme for chaining.
    pub fn add(mut self, name: &str, paint: Paint) -> Self {
        self.styles = self.styles.add(name, paint);
        self
    }

    pub fn styles(&self) -> &Styles {
        &self.styles
    }

    pub fn apply(&self, name: &str, text: &str, depth: ColorDepth) -> String {
        self.styles.apply(name, text, depth)
    }
}

/// A pair of themes, one for light backgrounds and one for everything else.
#[derive(Debug, Clone)]
pub struct AdaptiveTheme {
    light: Theme,
    dark: Theme,
}

impl AdaptiveTheme {
    /// `light` is used on light backgrounds; `dark` on dark or unknown ones.
    pub fn new(light: Theme, dark: Theme) -> Self {
        Self { light, dark }
    }

    pub fn resolve(&self, background: Background) -> &Theme {
        match background {
            Background::Light => &self.light,
            Background::Dark | Background::Unknown => &self.dark,
        }
    }
}

/// A renderer with pre-registered templates.
///
/// Templates are compiled once and rendered repeatedly against one theme and depth.
///
/// # Example
///
/// ```rust
/// use outstanding::{ColorDepth, Paint, Renderer, Theme};
/// use serde::Serialize;
///
/// let theme = Theme::new().add("timing", Paint::rgb(102, 217, 239).bold());
/// let mut renderer = Renderer::new(&theme, ColorDepth::None);
/// renderer
///     .add_template("timing", r#"Time taken: {{ ms | style("timing") }}"#)
///     .unwrap();
///
/// #[derive(Serialize)]
/// struct Timing { ms: String }
///
/// let out = renderer.render("timing", &Timing { ms: "1.000 ms".into() }).unwrap();
/// assert_eq!(out, "Time taken: 1.000 ms");
/// ```
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new(theme: &Theme, depth: ColorDepth) -> Self {
        let mut env = Environment::new();
        register_style_filter(&mut env, theme, depth);
        Self { env }
    }

    /// Registers a named template. The template is compiled immediately.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), Error> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
    }

    /// Renders a registered template with the given data.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, Error> {
        let tmpl = self.env.get_template(name)?;
        tmpl.render(data)
    }
}

fn register_style_filter(env: &mut Environment<'static>, theme: &Theme, depth: ColorDepth) {
    let styles = theme.styles.clone();
    env.add_filter("style", move |value: Value, name: String| -> String {
        styles.apply(&name, &value.to_string(), depth)
    });
}

/// Converts an RGB triplet to the nearest ANSI 256-color palette index.
pub fn rgb_to_ansi256((r, g, b): (u8, u8, u8)) -> u8 {
    if r == g && g == b {
        if r < 8 {
            16
        } else if r > 248 {
            231
        } else {
            232 + ((r as u16 - 8) * 24 / 247) as u8
        }
    } else {
        let red = (r as u16 * 5 / 255) as u8;
        let green = (g as u16 * 5 / 255) as u8;
        let blue = (b as u16 * 5 / 255) as u8;
        16 + 36 * red + 6 * green + blue
    }
}

/// Converts an RGB triplet to one of the eight basic ANSI colors, plus whether the bright
/// variant should be used.
pub fn rgb_to_ansi16((r, g, b): (u8, u8, u8)) -> (Color, bool) {
    let index = (r >= 128) as usize | ((g >= 128) as usize) << 1 | ((b >= 128) as usize) << 2;
    let color = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ][index];
    let bright = r.max(g).max(b) >= 200 || (index == 0 && r.max(g).max(b) >= 64);
    (color, bright)
}
