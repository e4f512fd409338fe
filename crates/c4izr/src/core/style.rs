//! draw.io style strings
//!
//! A style is a `;`-separated list of `key=value` pairs and bare tokens,
//! e.g. `ellipse;shape=cloud;whiteSpace=wrap;fillColor=#dae8fc;`.

use chumsky::prelude::*;
use std::fmt;

/// Parsed draw.io style, entries kept in source order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Style {
    entries: Vec<(String, Option<String>)>,
}

fn segments<'src>() -> impl Parser<'src, &'src str, Vec<&'src str>> {
    none_of(';')
        .repeated()
        .to_slice()
        .separated_by(just(';'))
        .collect::<Vec<_>>()
        .then_ignore(end())
}

impl Style {
    /// Parse a style string; never fails, empty segments are dropped
    pub fn parse(input: &str) -> Self {
        let raw = segments()
            .parse(input)
            .into_result()
            .unwrap_or_else(|_| input.split(';').collect());

        let entries = raw
            .into_iter()
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
                None => (segment.to_string(), None),
            })
            .collect();

        Self { entries }
    }

    /// Value of a `key=value` entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, v)| k == key && v.is_some())
            .and_then(|(_, v)| v.as_deref())
    }

    /// Returns true if a bare token with this name is present
    pub fn has_token(&self, token: &str) -> bool {
        self.entries
            .iter()
            .any(|(k, v)| v.is_none() && k.eq_ignore_ascii_case(token))
    }

    /// First entry when it is a bare token, e.g. `ellipse` or `text`
    pub fn leading_token(&self) -> Option<&str> {
        match self.entries.first() {
            Some((k, None)) => Some(k.as_str()),
            _ => None,
        }
    }

    /// The shape name: `shape=...` if present, else the leading bare token
    pub fn shape(&self) -> Option<&str> {
        self.get("shape").or_else(|| self.leading_token())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            match value {
                Some(value) => write!(f, "{}={};", key, value)?,
                None => write!(f, "{};", key)?,
            }
        }
        Ok(())
    }
}
