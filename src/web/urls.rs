//! URL construction from named routes. Handlers and templates ask for a
//! route by name instead of concatenating path strings; an unknown route or a
//! missing parameter is a hard error the caller must handle, never a silently
//! empty URL.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("base URL cannot carry path segments")]
    InvalidBase,
    #[error("no route named {0:?} is registered")]
    UnknownRoute(String),
    #[error("route {route:?} is missing a value for parameter {param:?}")]
    MissingParam { route: String, param: String },
}

/// Value substituted into a `{param}` template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteParam {
    Text(String),
    Number(i64),
}

impl fmt::Display for RouteParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteParam::Text(value) => f.write_str(value),
            RouteParam::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for RouteParam {
    fn from(value: &str) -> Self {
        RouteParam::Text(value.to_string())
    }
}

impl From<String> for RouteParam {
    fn from(value: String) -> Self {
        RouteParam::Text(value)
    }
}

impl From<i64> for RouteParam {
    fn from(value: i64) -> Self {
        RouteParam::Number(value)
    }
}

/// Registry mapping route names to path templates like
/// `/admin/invites/{id}/revoke`. Template segments wrapped in braces are
/// filled from the parameters handed to [`RouteSet::url_to`].
#[derive(Debug)]
pub struct RouteSet {
    base: Url,
    templates: HashMap<String, String>,
}

impl RouteSet {
    /// A base URL that cannot carry path segments (`mailto:`, `data:`) is
    /// rejected here so that resolution below cannot fail on it.
    pub fn new(base: Url) -> Result<Self, UrlError> {
        if base.cannot_be_a_base() {
            return Err(UrlError::InvalidBase);
        }
        Ok(Self {
            base,
            templates: HashMap::new(),
        })
    }

    pub fn add(&mut self, name: &str, template: &str) -> &mut Self {
        self.templates.insert(name.to_string(), template.to_string());
        self
    }

    /// Resolves a named route against the base URL. Parameter values are
    /// pushed as whole path segments, so the `url` crate percent-encodes
    /// anything that would otherwise change the path structure.
    pub fn url_to(&self, name: &str, params: &[(&str, RouteParam)]) -> Result<Url, UrlError> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| UrlError::UnknownRoute(name.to_string()))?;

        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| UrlError::InvalidBase)?;
            segments.clear();
            for segment in template.split('/').filter(|s| !s.is_empty()) {
                match segment
                    .strip_prefix('{')
                    .and_then(|inner| inner.strip_suffix('}'))
                {
                    Some(param) => {
                        let value = params
                            .iter()
                            .find(|(key, _)| *key == param)
                            .map(|(_, value)| value)
                            .ok_or_else(|| UrlError::MissingParam {
                                route: name.to_string(),
                                param: param.to_string(),
                            })?;
                        segments.push(&value.to_string());
                    }
                    None => {
                        segments.push(segment);
                    }
                }
            }
        }
        Ok(url)
    }
}
