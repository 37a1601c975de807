//! Route pattern matching.
//!
//! # Responsibilities
//! - Match exact paths (`/about`)
//! - Match a single trailing named segment (`/snippet/view/{id}`)
//! - Capture the segment as a string parameter
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - A parameter segment is never empty and never spans a `/`
//! - No regex to guarantee O(n) matching

/// Parameters captured while matching a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    pairs: Vec<(String, String)>,
}

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn single(name: &str, value: &str) -> Self {
        Self {
            pairs: vec![(name.to_string(), value.to_string())],
        }
    }
}

/// A compiled route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// The whole path must be equal.
    Exact(String),
    /// `prefix` followed by one non-empty segment bound to `name`.
    Param { prefix: String, name: String },
}

impl PathPattern {
    /// Compile a pattern. A last segment written as `{name}` becomes a
    /// parameter; anything else is matched literally.
    pub fn parse(pattern: &str) -> Self {
        if let Some(split) = pattern.rfind('/') {
            let (prefix, last) = pattern.split_at(split + 1);
            if let Some(name) = last.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if !name.is_empty() && !name.contains(['{', '}']) {
                    return PathPattern::Param {
                        prefix: prefix.to_string(),
                        name: name.to_string(),
                    };
                }
            }
        }
        PathPattern::Exact(pattern.to_string())
    }

    /// Returns the captured parameters if `path` matches.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        match self {
            PathPattern::Exact(expected) => (path == expected).then(RouteParams::default),
            PathPattern::Param { prefix, name } => {
                let value = path.strip_prefix(prefix.as_str())?;
                if value.is_empty() || value.contains('/') {
                    return None;
                }
                Some(RouteParams::single(name, value))
            }
        }
    }
}
