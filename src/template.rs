//! Template variable interpolation.
//!
//! Targets, search terms and annotation queries may reference dashboard
//! variables as `$name`, `${name}`, `${name:format}` or `[[name]]`. The host
//! decides how multi-value selections are rendered through a [`VariableFormat`].

use std::collections::HashMap;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::models::{ScopedVars, VariableValue};

lazy_static! {
    static ref VARIABLE_PATTERN: Regex =
        Regex::new(r"\$(\w+)|\$\{(\w+)(?::(\w+))?\}|\[\[(\w+)(?::(\w+))?\]\]").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableFormat {
    Regex,
    Glob,
    Pipe,
    Csv,
    Raw,
}

impl FromStr for VariableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regex" => Ok(VariableFormat::Regex),
            "glob" => Ok(VariableFormat::Glob),
            "pipe" => Ok(VariableFormat::Pipe),
            "csv" => Ok(VariableFormat::Csv),
            "raw" => Ok(VariableFormat::Raw),
            other => Err(format!("unknown variable format: {}", other)),
        }
    }
}

impl VariableFormat {
    pub fn render(self, value: &VariableValue) -> String {
        match (self, value) {
            (VariableFormat::Regex, VariableValue::Single(v)) => regex_escape(v),
            (VariableFormat::Regex, VariableValue::Multi(values)) => {
                let escaped: Vec<String> = values.iter().map(|v| regex_escape(v)).collect();
                format!("({})", escaped.join("|"))
            }
            (VariableFormat::Glob, VariableValue::Multi(values)) if values.len() > 1 => {
                format!("{{{}}}", values.join(","))
            }
            (VariableFormat::Pipe, _) => value.values().join("|"),
            _ => value.values().join(","),
        }
    }
}

/// Escapes the characters the host treats as regex syntax.
fn regex_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if "\\^$*+?.()|[]{}/".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Resolves variable placeholders inside a string.
pub trait Interpolator: Send + Sync {
    fn replace(&self, text: &str, scoped_vars: Option<&ScopedVars>, format: VariableFormat) -> String;
}

/// Default interpolator backed by dashboard-level variables. Scoped
/// variables passed per call take precedence over them.
#[derive(Debug, Clone, Default)]
pub struct TemplateSrv {
    variables: HashMap<String, VariableValue>,
}

impl TemplateSrv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    fn lookup<'a>(&'a self, name: &str, scoped_vars: Option<&'a ScopedVars>) -> Option<&'a VariableValue> {
        scoped_vars
            .and_then(|vars| vars.get(name))
            .map(|var| &var.value)
            .or_else(|| self.variables.get(name))
    }
}

impl Interpolator for TemplateSrv {
    fn replace(&self, text: &str, scoped_vars: Option<&ScopedVars>, format: VariableFormat) -> String {
        VARIABLE_PATTERN
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str())
                    .unwrap_or_default();

                let explicit = caps
                    .get(3)
                    .or_else(|| caps.get(5))
                    .and_then(|m| m.as_str().parse::<VariableFormat>().ok());

                match self.lookup(name, scoped_vars) {
                    Some(value) => explicit.unwrap_or(format).render(value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
