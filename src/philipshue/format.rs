//! Pretty-printing of bridge responses.
//!
//! Values are shown as Python literals (`True`, `None`, single-quoted strings) and laid out
//! like Python's `pprint`: anything that fits in the remaining width stays on one line,
//! otherwise each mapping entry or sequence item goes on its own line, aligned one column
//! past the opening bracket.
//!
//! ```text
//! {'1': {'name': 'Desk lamp',
//!        'state': {'bri': 254,
//!                  'on': True,
//!                  'reachable': True,
//!                  'xy': [0.3127, 0.329]},
//!        'type': 'Extended color light'}}
//! ```

use crate::interpreter::Output;
use crate::styles::names;
use outstanding::{ColorDepth, Theme};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

pub const WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Punct,
    Key,
    String,
    Number,
    Constant,
    Function,
}

impl TokenClass {
    pub fn style_name(&self) -> &'static str {
        match self {
            TokenClass::Punct => names::PUNCT,
            TokenClass::Key => names::KEY,
            TokenClass::String => names::STRING,
            TokenClass::Number => names::NUMBER,
            TokenClass::Constant => names::CONSTANT,
            TokenClass::Function => names::FUNCTION,
        }
    }
}

/// A piece of output text; `class` is `None` for layout whitespace.
#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    class: Option<TokenClass>,
    text: String,
}

#[derive(Default)]
struct Fragments(Vec<Fragment>);

impl Fragments {
    fn push(&mut self, class: TokenClass, text: impl Into<String>) {
        self.0.push(Fragment {
            class: Some(class),
            text: text.into(),
        });
    }

    fn space(&mut self, text: impl Into<String>) {
        self.0.push(Fragment {
            class: None,
            text: text.into(),
        });
    }

    fn paint(self, theme: &Theme, depth: ColorDepth) -> String {
        self.0
            .into_iter()
            .map(|f| match f.class {
                Some(class) => styled(theme, class, &f.text, depth),
                None => f.text,
            })
            .collect()
    }
}

fn styled(theme: &Theme, class: TokenClass, text: &str, depth: ColorDepth) -> String {
    if depth.is_colored() {
        theme.apply(class.style_name(), text, depth)
    } else {
        text.to_string()
    }
}

pub fn format_output(output: &Output, theme: &Theme, depth: ColorDepth) -> String {
    match output {
        Output::Json(value) => format_value(value, theme, depth),
        Output::Function(name) => styled(
            theme,
            TokenClass::Function,
            &format!("<function {name}>"),
            depth,
        ),
    }
}

pub fn format_value(value: &Value, theme: &Theme, depth: ColorDepth) -> String {
    let mut out = Fragments::default();
    layout(value, 0, 0, &mut out);
    out.paint(theme, depth)
}

fn layout(value: &Value, indent: usize, allowance: usize, out: &mut Fragments) {
    let available = WIDTH.saturating_sub(indent + allowance);
    let breakable = match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    };
    if !breakable || flat_width(value) <= available {
        flat(value, out);
        return;
    }

    match value {
        Value::Object(map) => {
            out.push(TokenClass::Punct, "{");
            let inner = indent + 1;
            let last = map.len() - 1;
            for (i, (key, entry)) in map.iter().enumerate() {
                let key_repr = python_str(key);
                let key_width = key_repr.width();
                out.push(TokenClass::Key, key_repr);
                out.push(TokenClass::Punct, ":");
                out.space(" ");
                let entry_allowance = if i == last { allowance + 1 } else { 1 };
                layout(entry, inner + key_width + 2, entry_allowance, out);
                if i != last {
                    out.push(TokenClass::Punct, ",");
                    out.space(format!("\n{}", " ".repeat(inner)));
                }
            }
            out.push(TokenClass::Punct, "}");
        }
        Value::Array(items) => {
            out.push(TokenClass::Punct, "[");
            let inner = indent + 1;
            let last = items.len() - 1;
            for (i, item) in items.iter().enumerate() {
                let item_allowance = if i == last { allowance + 1 } else { 1 };
                layout(item, inner, item_allowance, out);
                if i != last {
                    out.push(TokenClass::Punct, ",");
                    out.space(format!("\n{}", " ".repeat(inner)));
                }
            }
            out.push(TokenClass::Punct, "]");
        }
        _ => flat(value, out),
    }
}

fn flat_width(value: &Value) -> usize {
    let mut out = Fragments::default();
    flat(value, &mut out);
    out.0.iter().map(|f| f.text.width()).sum()
}

fn flat(value: &Value, out: &mut Fragments) {
    match value {
        Value::Null => out.push(TokenClass::Constant, "None"),
        Value::Bool(true) => out.push(TokenClass::Constant, "True"),
        Value::Bool(false) => out.push(TokenClass::Constant, "False"),
        Value::Number(n) => out.push(TokenClass::Number, n.to_string()),
        Value::String(s) => out.push(TokenClass::String, python_str(s)),
        Value::Array(items) => {
            out.push(TokenClass::Punct, "[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(TokenClass::Punct, ",");
                    out.space(" ");
                }
                flat(item, out);
            }
            out.push(TokenClass::Punct, "]");
        }
        Value::Object(map) => {
            out.push(TokenClass::Punct, "{");
            for (i, (key, entry)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(TokenClass::Punct, ",");
                    out.space(" ");
                }
                out.push(TokenClass::Key, python_str(key));
                out.push(TokenClass::Punct, ":");
                out.space(" ");
                flat(entry, out);
            }
            out.push(TokenClass::Punct, "}");
        }
    }
}

/// Quotes a string the way Python's `repr` does.
pub fn python_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use outstanding::Paint;
    use serde_json::json;

    fn plain(value: &Value) -> String {
        format_value(value, &Theme::new(), ColorDepth::None)
    }

    #[test]
    fn test_scalars() {
        assert_eq!(plain(&json!(null)), "None");
        assert_eq!(plain(&json!(true)), "True");
        assert_eq!(plain(&json!(false)), "False");
        assert_eq!(plain(&json!(370)), "370");
        assert_eq!(plain(&json!(0.5)), "0.5");
        assert_eq!(plain(&json!("Desk")), "'Desk'");
    }

    #[test]
    fn test_python_string_quoting() {
        assert_eq!(python_str("it's"), "\"it's\"");
        assert_eq!(python_str("say \"hi\""), "'say \"hi\"'");
        assert_eq!(python_str("both ' and \""), "'both \\' and \"'");
        assert_eq!(python_str("a\nb\\"), "'a\\nb\\\\'");
        assert_eq!(python_str("\u{1}"), "'\\x01'");
        assert_eq!(python_str("Küche"), "'Küche'");
    }

    #[test]
    fn test_short_values_stay_flat() {
        let value = json!({"on": true, "bri": 254, "xy": [0.3, 0.3], "name": null});
        assert_eq!(
            plain(&value),
            "{'bri': 254, 'name': None, 'on': True, 'xy': [0.3, 0.3]}"
        );
        assert_eq!(plain(&json!([])), "[]");
        assert_eq!(plain(&json!({})), "{}");
    }

    #[test]
    fn test_long_values_break_like_pprint() {
        let value = json!({
            "1": {
                "name": "Desk lamp",
                "state": {"bri": 254, "on": true, "reachable": true, "xy": [0.3127, 0.329]},
                "type": "Extended color light"
            }
        });
        let expected = "\
{'1': {'name': 'Desk lamp',
       'state': {'bri': 254,
                 'on': True,
                 'reachable': True,
                 'xy': [0.3127, 0.329]},
       'type': 'Extended color light'}}";
        assert_eq!(plain(&value), expected);
    }

    #[test]
    fn test_long_lists_put_items_on_lines() {
        let names: Vec<String> = (0..12).map(|i| format!("light number {i}")).collect();
        let out = plain(&json!(names));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 12);
        assert_eq!(lines[0], "['light number 0',");
        assert_eq!(lines[1], " 'light number 1',");
        assert_eq!(lines[11], " 'light number 11']");
    }

    #[test]
    fn test_lines_fit_width_when_possible() {
        let value = json!({
            "config": {"name": "Philips hue", "zigbeechannel": 15, "mac": "00:17:88:00:00:00",
                       "dhcp": true, "ipaddress": "192.168.1.10", "netmask": "255.255.255.0",
                       "gateway": "192.168.1.1", "swversion": "1941132080"}
        });
        for line in plain(&value).lines() {
            assert!(line.width() <= WIDTH, "too wide: {line}");
        }
    }

    #[test]
    fn test_function_output() {
        let out = format_output(&Output::Function("mired"), &Theme::new(), ColorDepth::None);
        assert_eq!(out, "<function mired>");
    }

    #[test]
    fn test_coloring_by_token_class() {
        let theme = Theme::new()
            .add(names::KEY, Paint::rgb(1, 1, 1))
            .add(names::STRING, Paint::rgb(2, 2, 2))
            .add(names::NUMBER, Paint::rgb(3, 3, 3))
            .add(names::CONSTANT, Paint::rgb(4, 4, 4))
            .add(names::PUNCT, Paint::rgb(5, 5, 5));
        let out = format_value(
            &json!({"k": ["s", 1, true]}),
            &theme,
            ColorDepth::TrueColor,
        );
        assert!(out.contains("\x1b[38;2;1;1;1m'k'\x1b[0m"));
        assert!(out.contains("\x1b[38;2;2;2;2m's'\x1b[0m"));
        assert!(out.contains("\x1b[38;2;3;3;3m1\x1b[0m"));
        assert!(out.contains("\x1b[38;2;4;4;4mTrue\x1b[0m"));
        assert!(out.contains("\x1b[38;2;5;5;5m{\x1b[0m"));

        let plain_out = format_value(&json!({"k": ["s", 1, true]}), &theme, ColorDepth::None);
        assert_eq!(plain_out, "{'k': ['s', 1, True]}");
    }
}
