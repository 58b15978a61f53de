#![forbid(unsafe_code)]

use super::diff::{FieldPath, PathSegment};
use crate::MutationIntent;
use std::str::FromStr;

/// What the equivalence engine is allowed to disregard.
pub trait ComparisonPolicy: Send + Sync {
    fn skip_intent(&self, _intent: &MutationIntent) -> bool {
        false
    }

    /// Fields for which this returns true are removed from both sides
    /// before comparing, together with everything below them.
    fn skip_field(&self, _path: &FieldPath) -> bool {
        false
    }
}

/// Compares every intent and every field.
#[derive(Clone, Copy, Debug, Default)]
pub struct Strict;

impl ComparisonPolicy for Strict {}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PatternSegment {
    AnyKey,
    Key(String),
    AnyIndex,
    Index(usize),
}

/// A field path pattern such as `status.conditions[*].lastTransitionTime`
/// or `metadata.annotations["example.com/key"]`. `*` matches any key and
/// `[*]` any index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPattern {
    raw: String,
    segments: Vec<PatternSegment>,
}

impl FieldPattern {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &FieldPath) -> bool {
        let segments = path.segments();
        segments.len() == self.segments.len()
            && self
                .segments
                .iter()
                .zip(segments)
                .all(|(pattern, segment)| match (pattern, segment) {
                    (PatternSegment::AnyKey, PathSegment::Key(_)) => true,
                    (PatternSegment::Key(want), PathSegment::Key(got)) => want == got,
                    (PatternSegment::AnyIndex, PathSegment::Index(_)) => true,
                    (PatternSegment::Index(want), PathSegment::Index(got)) => want == got,
                    _ => false,
                })
    }
}

impl FromStr for FieldPattern {
    type Err = PatternError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = |reason: &'static str| PatternError {
            pattern: raw.to_string(),
            reason,
        };
        let mut segments = Vec::new();
        let chars: Vec<char> = raw.chars().collect();
        let mut pos = 0;
        let mut expect_key = true;
        while pos < chars.len() {
            match chars[pos] {
                '[' => {
                    let close = chars[pos..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| pos + offset)
                        .ok_or_else(|| err("unclosed '['"))?;
                    let inner: String = chars[pos + 1..close].iter().collect();
                    let segment =
                        parse_bracket(&inner).ok_or_else(|| err("invalid bracket segment"))?;
                    segments.push(segment);
                    pos = close + 1;
                    expect_key = false;
                }
                '.' => {
                    if expect_key {
                        return Err(err("empty segment"));
                    }
                    pos += 1;
                    expect_key = true;
                }
                _ => {
                    if !expect_key {
                        return Err(err("missing '.' between segments"));
                    }
                    let end = chars[pos..]
                        .iter()
                        .position(|c| *c == '.' || *c == '[')
                        .map(|offset| pos + offset)
                        .unwrap_or(chars.len());
                    let key: String = chars[pos..end].iter().collect();
                    segments.push(if key == "*" {
                        PatternSegment::AnyKey
                    } else {
                        PatternSegment::Key(key)
                    });
                    pos = end;
                    expect_key = false;
                }
            }
        }
        if segments.is_empty() || expect_key {
            return Err(err("pattern must end with a segment"));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}

fn parse_bracket(inner: &str) -> Option<PatternSegment> {
    if inner == "*" {
        return Some(PatternSegment::AnyIndex);
    }
    if let Some(quoted) = inner.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        return Some(PatternSegment::Key(quoted.to_string()));
    }
    inner.parse().ok().map(PatternSegment::Index)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid field pattern {pattern:?}: {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: &'static str,
}

/// Skips listed field patterns and, optionally, every Event intent.
#[derive(Clone, Debug, Default)]
pub struct IgnoreFields {
    patterns: Vec<FieldPattern>,
    ignore_events: bool,
}

const NONDETERMINISTIC_FIELDS: &[&str] = &[
    "metadata.creationTimestamp",
    "metadata.resourceVersion",
    "metadata.uid",
    "metadata.managedFields",
    "status.conditions[*].lastTransitionTime",
];

impl IgnoreFields {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|raw| raw.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
            ignore_events: false,
        })
    }

    /// Server-populated fields that differ between otherwise identical runs.
    pub fn nondeterministic() -> Self {
        let patterns = NONDETERMINISTIC_FIELDS
            .iter()
            .filter_map(|raw| raw.parse().ok())
            .collect();
        Self {
            patterns,
            ignore_events: false,
        }
    }

    pub fn ignore_events(mut self, ignore: bool) -> Self {
        self.ignore_events = ignore;
        self
    }

    pub fn with_pattern(mut self, pattern: FieldPattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}

impl ComparisonPolicy for IgnoreFields {
    fn skip_intent(&self, intent: &MutationIntent) -> bool {
        self.ignore_events && intent.target().type_id().resource == "events"
    }

    fn skip_field(&self, path: &FieldPath) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }
}
