//! API version numbers.
//!
//! Versions are decimals such as `1.2`. The integer part is the major
//! version; a route is inherited by later versions of the same major only.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::ParseFloatError;
use std::str::FromStr;

/// A declared or requested API version.
#[derive(Debug, Clone, Copy)]
pub struct ApiVersion(f64);

impl ApiVersion {
    pub const fn new(version: f64) -> Self {
        Self(version)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Lowest version number belonging to the next major release.
    pub fn next_major(self) -> f64 {
        (self.0.trunc() + 1.0).trunc()
    }
}

impl fmt::Display for ApiVersion {
    /// Shortest decimal form: `2.0` renders as `2`, `1.2` as `1.2`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ApiVersion {
    type Err = ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<f64>().map(Self)
    }
}

impl From<f64> for ApiVersion {
    fn from(version: f64) -> Self {
        Self(version)
    }
}

impl PartialEq for ApiVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ApiVersion {}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for ApiVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Every version served, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSet(BTreeSet<ApiVersion>);

impl VersionSet {
    pub fn contains(&self, version: ApiVersion) -> bool {
        self.0.contains(&version)
    }

    pub fn iter(&self) -> impl Iterator<Item = ApiVersion> + '_ {
        self.0.iter().copied()
    }

    /// Versions `v` with `from <= v < from.next_major()`.
    pub fn same_major_from(&self, from: ApiVersion) -> impl Iterator<Item = ApiVersion> + '_ {
        let next_major = from.next_major();
        self.0
            .range(from..)
            .copied()
            .take_while(move |v| v.value() < next_major)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ApiVersion> for VersionSet {
    fn from_iter<I: IntoIterator<Item = ApiVersion>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
