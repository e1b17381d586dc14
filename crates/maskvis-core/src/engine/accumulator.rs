use super::error::AttributionError;
use super::units::StructuralUnit;
use crate::core::models::key::SpatialKey;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    sum: f64,
    count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct AttributionAccumulator {
    tallies: BTreeMap<SpatialKey, Tally>,
}

impl AttributionAccumulator {
    pub fn for_atoms(keys: impl IntoIterator<Item = SpatialKey>) -> Self {
        Self {
            tallies: keys.into_iter().map(|k| (k, Tally::default())).collect(),
        }
    }

    pub fn add(&mut self, key: &SpatialKey, share: f64) -> bool {
        match self.tallies.get_mut(key) {
            Some(tally) => {
                tally.sum += share;
                tally.count += 1;
                true
            }
            None => {
                trace!(%key, "Share for untracked atom dropped.");
                false
            }
        }
    }

    pub fn credit(&mut self, unit: &StructuralUnit, delta: f64) -> usize {
        let share = unit.share(delta);
        unit.core()
            .iter()
            .filter(|key| self.add(key, share))
            .count()
    }

    pub fn sum(&self, key: &SpatialKey) -> Option<f64> {
        self.tallies.get(key).map(|t| t.sum)
    }

    pub fn count(&self, key: &SpatialKey) -> Option<u32> {
        self.tallies.get(key).map(|t| t.count)
    }

    pub fn finalize(self) -> Attribution {
        Attribution(
            self.tallies
                .into_iter()
                .map(|(key, tally)| {
                    let value = if tally.count == 0 {
                        0.0
                    } else {
                        tally.sum / f64::from(tally.count)
                    };
                    (key, value)
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribution(BTreeMap<SpatialKey, f64>);

impl Attribution {
    pub fn get(&self, key: &SpatialKey) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SpatialKey, f64)> {
        self.0.iter().map(|(k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nonzero_count(&self) -> usize {
        self.0.values().filter(|&&v| v != 0.0).count()
    }

    pub fn total_over<'k>(&self, keys: impl IntoIterator<Item = &'k SpatialKey>) -> f64 {
        keys.into_iter().filter_map(|k| self.get(k)).sum()
    }

    pub fn average(&self, other: &Attribution) -> Result<Attribution, AttributionError> {
        self.ensure_same_atoms(other)?;
        Ok(Attribution(
            self.0
                .iter()
                .zip(other.0.values())
                .map(|((key, a), b)| (key.clone(), (a + b) / 2.0))
                .collect(),
        ))
    }

    pub(crate) fn ensure_same_atoms(&self, other: &Attribution) -> Result<(), AttributionError> {
        if self.0.len() != other.0.len() || !self.0.keys().eq(other.0.keys()) {
            return Err(AttributionError::MismatchedAttributions {
                single: self.0.len(),
                fragment: other.0.len(),
            });
        }
        Ok(())
    }
}

impl From<BTreeMap<SpatialKey, f64>> for Attribution {
    fn from(map: BTreeMap<SpatialKey, f64>) -> Self {
        Self(map)
    }
}

impl FromIterator<(SpatialKey, f64)> for Attribution {
    fn from_iter<I: IntoIterator<Item = (SpatialKey, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
