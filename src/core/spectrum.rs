use serde::Serialize;

use crate::core::types::{MoleculeId, SourceTag, SpectrumKey};

/// Ascending list of chemical shifts (ppm)
///
/// Construction sorts the input and drops non-finite values, so a `ShiftSet`
/// is always ordered no matter how the source file listed its peaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ShiftSet(Vec<f64>);

impl ShiftSet {
    #[must_use]
    pub fn new(mut values: Vec<f64>) -> Self {
        values.retain(|v| v.is_finite());
        values.sort_by(f64::total_cmp);
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

impl From<Vec<f64>> for ShiftSet {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<f64> for ShiftSet {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A normalized spectrum produced by one of the source readers
///
/// A record always holds at least one shift; [`SpectrumRecord::new`] refuses
/// empty shift sets.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRecord {
    pub source: SourceTag,
    pub key: SpectrumKey,
    shifts: ShiftSet,
}

impl SpectrumRecord {
    /// Returns `None` when `shifts` is empty
    #[must_use]
    pub fn new(
        source: SourceTag,
        molecule_id: MoleculeId,
        spectrum_id: impl Into<String>,
        shifts: ShiftSet,
    ) -> Option<Self> {
        if shifts.is_empty() {
            return None;
        }
        Some(Self {
            source,
            key: SpectrumKey::new(molecule_id, spectrum_id),
            shifts,
        })
    }

    #[must_use]
    pub fn molecule_id(&self) -> &MoleculeId {
        &self.key.molecule_id
    }

    #[must_use]
    pub fn spectrum_id(&self) -> &str {
        &self.key.spectrum_id
    }

    #[must_use]
    pub fn shifts(&self) -> &ShiftSet {
        &self.shifts
    }

    #[must_use]
    pub fn into_parts(self) -> (SpectrumKey, ShiftSet) {
        (self.key, self.shifts)
    }
}

/// Display name of one molecule in one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoleculeName {
    pub molecule_id: MoleculeId,
    pub display_name: String,
}

impl MoleculeName {
    pub fn new(molecule_id: MoleculeId, display_name: impl Into<String>) -> Self {
        Self {
            molecule_id,
            display_name: display_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_set_sorts_input() {
        let shifts = ShiftSet::new(vec![45.2, 12.0, 170.1, 33.3]);
        assert_eq!(shifts.as_slice(), &[12.0, 33.3, 45.2, 170.1]);
    }

    #[test]
    fn test_shift_set_drops_non_finite() {
        let shifts = ShiftSet::new(vec![f64::NAN, 2.0, f64::INFINITY, 1.0]);
        assert_eq!(shifts.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_record_rejects_empty_shifts() {
        let id = SourceTag::Hmdb.qualify("1");
        assert!(SpectrumRecord::new(SourceTag::Hmdb, id, "1", ShiftSet::default()).is_none());
    }

    #[test]
    fn test_record_accessors() {
        let id = SourceTag::Mmcd.qualify("7");
        let record =
            SpectrumRecord::new(SourceTag::Mmcd, id.clone(), "1", vec![3.0, 1.0].into()).unwrap();
        assert_eq!(record.molecule_id(), &id);
        assert_eq!(record.spectrum_id(), "1");
        assert_eq!(record.shifts().as_slice(), &[1.0, 3.0]);
    }
}
