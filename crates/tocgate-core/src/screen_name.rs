//! Screen names and their canonical identifier form.

use std::fmt;

/// A user's screen name as they typed it.
///
/// Display form preserves case and spacing; [`ScreenName::ident`] is the
/// canonical form used as a map key (lowercase, spaces stripped), matching
/// how the backend compares names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScreenName(String);

impl ScreenName {
    /// Wrap a display screen name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The display form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical identifier: lowercased, spaces removed.
    pub fn ident(&self) -> String {
        self.0.chars().filter(|c| *c != ' ').map(|c| c.to_ascii_lowercase()).collect()
    }
}

impl fmt::Display for ScreenName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ScreenName {
    fn from(name: String) -> Self {
        Self(name)
    }
}
