//! Status - Opaque lifecycle label reported by a describe call

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a remote resource (e.g. "CREATING", "AVAILABLE")
///
/// Statuses have no ordering semantics; they are only compared for
/// membership in caller-supplied sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(String);

impl Status {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Status {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<str> for Status {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Status {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Collect statuses in order, dropping duplicates
pub(crate) fn status_list<I, S>(states: I) -> Vec<Status>
where
    I: IntoIterator<Item = S>,
    S: Into<Status>,
{
    let mut out: Vec<Status> = Vec::new();
    for state in states {
        let state = state.into();
        if !out.contains(&state) {
            out.push(state);
        }
    }
    out
}

/// Render a status list for error messages
pub(crate) fn format_states(states: &[Status]) -> String {
    states
        .iter()
        .map(Status::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
