//! Path template compilation and matching.
//!
//! # Responsibilities
//! - Turn `{name}` placeholders into single-segment captures
//! - Remember parameter names in capture order
//! - Match a request path and bind captures to names
//!
//! # Design Decisions
//! - Text outside placeholders is passed to the regex engine as written, so
//!   templates can pin their own end (`servers$`) or optional suffixes
//! - Patterns are anchored only where the template anchors them; versioned
//!   paths always start with `^`
//! - A `{` without a matching `}` is a startup error, never a request error

use std::collections::HashMap;

use regex::Regex;

use crate::http::handler::Handler;
use crate::routing::error::RouteError;

/// Capture used for every placeholder: one path segment.
const SEGMENT_CAPTURE: &str = "([^/]+)";

/// A compiled template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    params: Vec<String>,
}

impl PathPattern {
    /// Compile `template`, replacing each `{name}` with a segment capture.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let mut pattern = String::with_capacity(template.len() + 8);
        let mut params = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let position = template.len() - rest.len() + open;
            let close = rest[open..]
                .find('}')
                .map(|offset| open + offset)
                .ok_or_else(|| RouteError::UnclosedParam {
                    template: template.to_string(),
                    position,
                })?;

            pattern.push_str(&rest[..open]);
            pattern.push_str(SEGMENT_CAPTURE);
            params.push(rest[open + 1..close].to_string());
            rest = &rest[close + 1..];
        }
        pattern.push_str(rest);

        let regex = Regex::new(&pattern).map_err(|source| RouteError::InvalidPattern {
            template: template.to_string(),
            source,
        })?;

        Ok(Self { regex, params })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Bind captured segments to parameter names, or `None` if `path`
    /// does not match.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.get(i + 1)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// A resolved dispatch unit: pattern, parameter names and wrapped handler.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pattern: PathPattern,
    handler: Handler,
}

impl CompiledRoute {
    pub fn new(path: &str, handler: Handler) -> Result<Self, RouteError> {
        Ok(Self {
            pattern: PathPattern::compile(path)?,
            handler,
        })
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        self.pattern.captures(path)
    }
}
