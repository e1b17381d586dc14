use nalgebra::Point3;
use std::fmt;

/// Canonical, scheme-independent identity of an atom.
///
/// The key is the concatenation of the three coordinate fields of an atom
/// record with leading whitespace trimmed. Two numbering schemes (the
/// structure library's internal order and the serialized line order) both
/// resolve to this key, so everything downstream of the identity index
/// works with keys only.
///
/// Keys are collision-resistant, not collision-proof: two atoms at the same
/// printed coordinates share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialKey(String);

impl SpatialKey {
    /// Builds a key from the three raw coordinate fields of a record.
    pub fn from_fields(x: &str, y: &str, z: &str) -> Self {
        let mut key = String::with_capacity(x.len() + y.len() + z.len());
        key.push_str(x.trim_start());
        key.push_str(y.trim_start());
        key.push_str(z.trim_start());
        Self(key)
    }

    /// Builds the key an `%8.3f` serialization of `position` would produce.
    pub fn from_position(position: &Point3<f64>) -> Self {
        Self(format!(
            "{:.3}{:.3}{:.3}",
            position.x, position.y, position.z
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-width residue tag (chain, sequence number, insertion code) as it
/// appears on an atom record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueTag(String);

impl ResidueTag {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResidueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim())
    }
}
