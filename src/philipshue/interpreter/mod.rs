//! # Command Interpreter
//!
//! Commands are short expressions in a small, closed grammar (see [`parser`]). Nothing is
//! evaluated outside of it: the only names are `bridge` and the two color helpers, and
//! everything else is a literal.
//!
//! ## Resolution
//!
//! A command rooted at `bridge` resolves as written. A command rooted at a helper name is a
//! helper. Any other root is the first path segment under the bridge, so `lights(1)` means
//! `bridge.lights(1)`.
//!
//! On a bridge resource:
//!
//! | Expression               | Effect                                    |
//! |--------------------------|-------------------------------------------|
//! | `r.name`, `r[x]`         | extends the path                          |
//! | `r(1, "state")`          | extends the path with each argument       |
//! | `r()`                    | GET                                       |
//! | `r(on=True)`             | PUT with the keywords as JSON body        |
//! | `r(http_method="post")`  | request with the given method             |
//!
//! A command that ends on a resource is sent as a GET. Argument expressions cannot refer to
//! the bridge, so a command issues at most one request. Lexing, parsing and name checks all
//! happen before that request.

pub mod lexer;
pub mod parser;

use crate::bridge::{BridgeError, Method, Transport};
use crate::color::{mired_from_kelvin, xy_brightness_from_rgb, ColorError};
use crate::error::ErrorKind;
use parser::{Arg, Expr, ParseError};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const BRIDGE_NAME: &str = "bridge";
pub const HTTP_METHOD_KEYWORD: &str = "http_method";

/// Words offered by completion: the bridge's top-level resources and common state fields.
pub const VOCABULARY: &[&str] = &[
    "bridge",
    "lights",
    "groups",
    "config",
    "schedules",
    "scenes",
    "sensors",
    "rules",
    "resourcelinks",
    "capabilities",
    "state",
    "action",
    "name",
    "on",
    "bri",
    "hue",
    "sat",
    "ct",
    "xy",
    "effect",
    "alert",
    "transitiontime",
    "http_method",
    "True",
    "False",
    "None",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    Mired,
    RgbToXybri,
}

impl Helper {
    pub const ALL: [Helper; 2] = [Helper::Mired, Helper::RgbToXybri];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Helper::Mired => "mired",
            Helper::RgbToXybri => "rgb_to_xybri",
        }
    }

    fn call(&self, args: &[Value]) -> Result<Value, CommandError> {
        match self {
            Helper::Mired => match args {
                [kelvin] => Ok(Value::from(mired_from_kelvin(number(kelvin)?)?)),
                _ => Err(CommandError::Value(format!(
                    "mired() takes exactly one argument ({} given)",
                    args.len()
                ))),
            },
            Helper::RgbToXybri => {
                let components = match args {
                    [Value::Array(items)] => items.as_slice(),
                    _ => args,
                };
                match components {
                    [r, g, b] => {
                        let color = xy_brightness_from_rgb(number(r)?, number(g)?, number(b)?)?;
                        Ok(color.to_light_state())
                    }
                    _ => Err(CommandError::Value(
                        "rgb_to_xybri() takes three components or one sequence of three"
                            .to_string(),
                    )),
                }
            }
        }
    }
}

/// The result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Json(Value),
    /// A helper evaluated without calling it.
    Function(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("{0}")]
    Syntax(String),

    #[error("{0}")]
    Name(String),

    #[error("{0}")]
    Value(String),

    #[error("{message}")]
    Remote { code: Option<u64>, message: String },

    #[error("{0}")]
    Connection(String),
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Syntax(_) => ErrorKind::Syntax,
            CommandError::Name(_) => ErrorKind::Name,
            CommandError::Value(_) => ErrorKind::Value,
            CommandError::Remote { .. } => ErrorKind::Remote,
            CommandError::Connection(_) => ErrorKind::Connection,
        }
    }

    /// Connection failures end the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CommandError::Connection(_))
    }
}

impl From<BridgeError> for CommandError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Remote { code, message } => CommandError::Remote { code, message },
            BridgeError::Connection(message) => CommandError::Connection(message),
        }
    }
}

impl From<ColorError> for CommandError {
    fn from(err: ColorError) -> Self {
        CommandError::Value(err.to_string())
    }
}

impl From<ParseError> for CommandError {
    fn from(err: ParseError) -> Self {
        CommandError::Syntax(format!("{} (column {})", err.message, err.column))
    }
}

/// Intermediate values while walking an expression.
#[derive(Debug)]
enum Eval {
    Resource(Vec<String>),
    Helper(Helper),
    Json(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Command,
    Argument,
}

/// Evaluates commands against one bridge.
pub struct Interpreter<'t, T: Transport> {
    transport: &'t T,
}

impl<'t, T: Transport> Interpreter<'t, T> {
    pub fn new(transport: &'t T) -> Self {
        Self { transport }
    }

    pub fn evaluate(&self, text: &str) -> Result<Output, CommandError> {
        let expr = parser::parse(text)?;
        if root_name(&expr).is_none() {
            return Err(CommandError::Syntax(
                "a command must start with a name".to_string(),
            ));
        }
        check_names(&expr, Scope::Command)?;

        match self.eval(&expr, Scope::Command)? {
            Eval::Resource(path) => Ok(Output::Json(self.request(Method::Get, &path, None)?)),
            Eval::Helper(helper) => Ok(Output::Function(helper.name())),
            Eval::Json(value) => Ok(Output::Json(value)),
        }
    }

    fn request(
        &self,
        method: Method,
        path: &[String],
        body: Option<&Value>,
    ) -> Result<Value, CommandError> {
        debug!(%method, path = %path.join("/"), "evaluating request");
        Ok(self.transport.request(method, path, body)?)
    }

    fn eval(&self, expr: &Expr, scope: Scope) -> Result<Eval, CommandError> {
        match expr {
            Expr::Name(name) => match (Helper::from_name(name), scope) {
                (Some(helper), _) => Ok(Eval::Helper(helper)),
                (None, Scope::Command) if name == BRIDGE_NAME => Ok(Eval::Resource(Vec::new())),
                (None, Scope::Command) => Ok(Eval::Resource(vec![name.clone()])),
                (None, Scope::Argument) => Err(undefined(name)),
            },
            Expr::Literal(value) => Ok(Eval::Json(value.clone())),
            Expr::List(items) | Expr::Tuple(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Eval::Json(Value::Array(values)))
            }
            Expr::Dict(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let key = dict_key(&self.eval_value(key)?)?;
                    map.insert(key, self.eval_value(value)?);
                }
                Ok(Eval::Json(Value::Object(map)))
            }
            Expr::Attr(base, name) => match self.eval(base, scope)? {
                Eval::Resource(mut path) => {
                    path.push(name.clone());
                    Ok(Eval::Resource(path))
                }
                Eval::Helper(_) => Err(CommandError::Name(format!(
                    "'function' object has no attribute '{name}'"
                ))),
                Eval::Json(value) => Err(CommandError::Name(format!(
                    "'{}' object has no attribute '{name}'",
                    type_name(&value)
                ))),
            },
            Expr::Index(base, index) => {
                let base = self.eval(base, scope)?;
                let index = self.eval_value(index)?;
                match base {
                    Eval::Resource(mut path) => {
                        path.push(path_segment(&index)?);
                        Ok(Eval::Resource(path))
                    }
                    Eval::Helper(_) => Err(CommandError::Name(
                        "'function' object is not subscriptable".to_string(),
                    )),
                    Eval::Json(value) => index_json(value, &index).map(Eval::Json),
                }
            }
            Expr::Call(base, args) => match self.eval(base, scope)? {
                Eval::Resource(path) => self.call_resource(path, args),
                Eval::Helper(helper) => {
                    let mut values = Vec::with_capacity(args.len());
                    for arg in args {
                        match arg {
                            Arg::Positional(expr) => values.push(self.eval_value(expr)?),
                            Arg::Keyword(..) | Arg::Splat(_) => {
                                return Err(CommandError::Value(format!(
                                    "{}() takes no keyword arguments",
                                    helper.name()
                                )))
                            }
                        }
                    }
                    Ok(Eval::Json(helper.call(&values)?))
                }
                Eval::Json(value) => Err(CommandError::Name(format!(
                    "'{}' object is not callable",
                    type_name(&value)
                ))),
            },
        }
    }

    /// Evaluates an argument expression down to plain JSON.
    fn eval_value(&self, expr: &Expr) -> Result<Value, CommandError> {
        match self.eval(expr, Scope::Argument)? {
            Eval::Json(value) => Ok(value),
            Eval::Helper(helper) => Err(CommandError::Value(format!(
                "{}() must be called to produce a value",
                helper.name()
            ))),
            Eval::Resource(_) => Err(CommandError::Name(
                "bridge resources cannot be used as arguments".to_string(),
            )),
        }
    }

    fn call_resource(&self, mut path: Vec<String>, args: &[Arg]) -> Result<Eval, CommandError> {
        if args.is_empty() {
            return Ok(Eval::Json(self.request(Method::Get, &path, None)?));
        }

        let mut body = Map::new();
        let mut has_keywords = false;
        for arg in args {
            match arg {
                Arg::Positional(expr) => path.push(path_segment(&self.eval_value(expr)?)?),
                Arg::Keyword(key, expr) => {
                    has_keywords = true;
                    body.insert(key.clone(), self.eval_value(expr)?);
                }
                Arg::Splat(expr) => {
                    has_keywords = true;
                    match self.eval_value(expr)? {
                        Value::Object(fields) => {
                            for (key, value) in fields {
                                if body.contains_key(&key) {
                                    return Err(CommandError::Value(format!(
                                        "got multiple values for keyword argument '{key}'"
                                    )));
                                }
                                body.insert(key, value);
                            }
                        }
                        other => {
                            return Err(CommandError::Value(format!(
                                "argument after ** must be a mapping, not {}",
                                type_name(&other)
                            )))
                        }
                    }
                }
            }
        }
        if !has_keywords {
            return Ok(Eval::Resource(path));
        }

        let method = match body.remove(HTTP_METHOD_KEYWORD) {
            Some(Value::String(name)) => Method::parse(&name).ok_or_else(|| {
                CommandError::Value(format!("unsupported http_method '{name}'"))
            })?,
            Some(other) => {
                return Err(CommandError::Value(format!(
                    "http_method must be a string, not {}",
                    type_name(&other)
                )))
            }
            None if body.is_empty() => Method::Get,
            None => Method::Put,
        };
        let body = Value::Object(body);
        let body = method.has_body().then_some(&body);
        Ok(Eval::Json(self.request(method, &path, body)?))
    }
}

fn root_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Name(name) => Some(name.as_str()),
        Expr::Attr(base, _) | Expr::Index(base, _) | Expr::Call(base, _) => root_name(base),
        _ => None,
    }
}

/// Rejects unresolvable names anywhere in the expression, before anything is evaluated.
fn check_names(expr: &Expr, scope: Scope) -> Result<(), CommandError> {
    match expr {
        Expr::Name(name) => {
            if scope == Scope::Argument && Helper::from_name(name).is_none() {
                return Err(undefined(name));
            }
            Ok(())
        }
        Expr::Literal(_) => Ok(()),
        Expr::List(items) | Expr::Tuple(items) => items
            .iter()
            .try_for_each(|item| check_names(item, Scope::Argument)),
        Expr::Dict(entries) => entries.iter().try_for_each(|(key, value)| {
            check_names(key, Scope::Argument)?;
            check_names(value, Scope::Argument)
        }),
        Expr::Attr(base, _) => check_names(base, scope),
        Expr::Index(base, index) => {
            check_names(base, scope)?;
            check_names(index, Scope::Argument)
        }
        Expr::Call(base, args) => {
            check_names(base, scope)?;
            args.iter().try_for_each(|arg| match arg {
                Arg::Positional(expr) | Arg::Keyword(_, expr) | Arg::Splat(expr) => {
                    check_names(expr, Scope::Argument)
                }
            })
        }
    }
}

fn undefined(name: &str) -> CommandError {
    CommandError::Name(format!("name '{name}' is not defined"))
}

fn number(value: &Value) -> Result<f64, CommandError> {
    value
        .as_f64()
        .ok_or_else(|| CommandError::Value(format!("expected a number, not {}", type_name(value))))
}

fn path_segment(value: &Value) -> Result<String, CommandError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(CommandError::Name(format!(
            "a {} cannot be part of a resource path",
            type_name(other)
        ))),
    }
}

fn dict_key(value: &Value) -> Result<String, CommandError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(CommandError::Value(format!(
            "unhashable type: '{}'",
            type_name(other)
        ))),
    }
}

fn index_json(value: Value, index: &Value) -> Result<Value, CommandError> {
    match (value, index) {
        (Value::Object(mut map), Value::String(key)) => map
            .remove(key)
            .ok_or_else(|| CommandError::Name(format!("key '{key}' not found"))),
        (Value::Array(mut items), Value::Number(n)) if n.is_i64() => {
            let len = items.len() as i64;
            let i = n.as_i64().unwrap_or_default();
            let resolved = if i < 0 { len + i } else { i };
            if (0..len).contains(&resolved) {
                Ok(items.swap_remove(resolved as usize))
            } else {
                Err(CommandError::Name(format!("index {i} out of range")))
            }
        }
        (value, index) => Err(CommandError::Name(format!(
            "cannot index {} with {}",
            type_name(&value),
            type_name(index)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
