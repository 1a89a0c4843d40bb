//! Grouping of identifiers (IP addresses in practice) by a three-level
//! location path and flattening of that grouping into human-readable keys.
//!
//! The grouping is a single ordered map keyed by the full
//! `(country, region, city)` path rather than a map of maps of maps; every
//! question we ask of it ("which paths exist", "who lives at this path") is
//! about full paths, and an ordered map means the flattened output never
//! depends on the order records arrived in.

use std::collections::{btree_map, BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Placeholder filed in place of any attribute the resolver couldn't tell us.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// Separator used when flattening a path into a composite key.
pub const KEY_SEPARATOR: &str = ", ";

/// The categorical attributes of a single identifier, outermost first.  Any
/// of them may be missing; that is never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationAttributes {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

impl LocationAttributes {
    /// What a resolver hands back when it couldn't look anything up.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn new(country: Option<&str>, region: Option<&str>, city: Option<&str>) -> Self {
        LocationAttributes {
            country: country.map(str::to_string),
            region: region.map(str::to_string),
            city: city.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub identifier: String,
    pub attributes: LocationAttributes,
}

impl LocationRecord {
    pub fn new(identifier: impl Into<String>, attributes: LocationAttributes) -> Self {
        LocationRecord {
            identifier: identifier.into(),
            attributes,
        }
    }
}

/// Knobs for how paths are derived and flattened.
#[derive(Clone, Debug)]
pub struct AggregateOptions {
    /// Filed in place of an absent attribute.  Present attributes are used
    /// verbatim, even when they are the empty string.
    pub placeholder: String,
    pub separator: String,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        AggregateOptions {
            placeholder: UNKNOWN_PLACEHOLDER.to_string(),
            separator: KEY_SEPARATOR.to_string(),
        }
    }
}

/// A fully resolved `(country, region, city)` path.  Field order matters: the
/// derived `Ord` sorts by country, then region, then city.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationPath {
    pub country: String,
    pub region: String,
    pub city: String,
}

impl LocationPath {
    pub fn from_attributes(attributes: &LocationAttributes, placeholder: &str) -> Self {
        let or_placeholder =
            |value: &Option<String>| value.clone().unwrap_or_else(|| placeholder.to_string());
        LocationPath {
            country: or_placeholder(&attributes.country),
            region: or_placeholder(&attributes.region),
            city: or_placeholder(&attributes.city),
        }
    }

    pub fn composite_key(&self, separator: &str) -> String {
        [
            self.country.as_str(),
            self.region.as_str(),
            self.city.as_str(),
        ]
        .join(separator)
    }
}

/// Identifiers grouped by the full location path derived from their record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationGrouping {
    placeholder: String,
    groups: BTreeMap<LocationPath, BTreeSet<String>>,
}

impl LocationGrouping {
    pub fn new(placeholder: impl Into<String>) -> Self {
        LocationGrouping {
            placeholder: placeholder.into(),
            groups: BTreeMap::new(),
        }
    }

    /// File the record's identifier under its path, returning false if it was
    /// already there.
    pub fn insert(&mut self, record: &LocationRecord) -> bool {
        let path = LocationPath::from_attributes(&record.attributes, &self.placeholder);
        self.groups
            .entry(path)
            .or_default()
            .insert(record.identifier.clone())
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn paths(&self) -> btree_map::Keys<'_, LocationPath, BTreeSet<String>> {
        self.groups.keys()
    }

    pub fn identifiers_at(&self, path: &LocationPath) -> Option<&BTreeSet<String>> {
        self.groups.get(path)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, LocationPath, BTreeSet<String>> {
        self.groups.iter()
    }

    /// Flatten into one key per path.  Leaf sets are never empty because we
    /// only create them on insertion, so every path contributes.
    pub fn composite_keys(&self, separator: &str) -> BTreeSet<String> {
        self.groups
            .iter()
            .filter(|(_, identifiers)| !identifiers.is_empty())
            .map(|(path, _)| path.composite_key(separator))
            .collect()
    }
}

pub fn group_locations<'a, I>(records: I, options: &AggregateOptions) -> LocationGrouping
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    let mut grouping = LocationGrouping::new(options.placeholder.clone());
    for record in records {
        if !grouping.insert(record) {
            trace!(identifier = %record.identifier, "duplicate identifier at path");
        }
    }
    grouping
}

/// Group `records` by location and return the sorted, deduplicated set of
/// composite keys like `"US, CA, San Francisco"`.
pub fn aggregate<'a, I>(records: I, options: &AggregateOptions) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a LocationRecord>,
{
    group_locations(records, options).composite_keys(&options.separator)
}
