//! Pointing tables: the schedule of observation opportunities for a field.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::SurveyError;
use crate::photometry::Band;

/// One scheduled observation opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pointing {
    /// Observation epoch (e.g. MJD)
    pub time: f64,
    /// Filter used for this observation
    pub band: Band,
    /// 5σ limiting magnitude reached by this observation
    pub limiting_magnitude: f64,
    /// Nominal cadence of the band this pointing was scheduled with
    #[serde(default)]
    pub cadence: Option<f64>,
}

impl Pointing {
    pub fn new(time: f64, band: impl Into<Band>, limiting_magnitude: f64) -> Self {
        Self {
            time,
            band: band.into(),
            limiting_magnitude,
            cadence: None,
        }
    }
}

/// Time-ordered collection of pointings for a single field
///
/// Construction sorts pointings by time with a stable sort, so pointings
/// sharing an epoch keep their input order. The table is not mutated after
/// construction; truncation returns a new table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointingTable {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pointings: Vec<Pointing>,
}

impl PointingTable {
    /// Build a table from user supplied pointings
    pub fn new(pointings: Vec<Pointing>) -> Result<Self, SurveyError> {
        Self::with_coordinates(pointings, 0.0, 0.0)
    }

    /// Build a table from pointings observed at a fixed sky position
    pub fn with_coordinates(
        mut pointings: Vec<Pointing>,
        ra_deg: f64,
        dec_deg: f64,
    ) -> Result<Self, SurveyError> {
        for (index, pointing) in pointings.iter().enumerate() {
            if !pointing.time.is_finite() {
                return Err(SurveyError::InvalidPointing {
                    index,
                    reason: format!("time must be finite, got {}", pointing.time),
                });
            }
            if !pointing.limiting_magnitude.is_finite() {
                return Err(SurveyError::InvalidPointing {
                    index,
                    reason: format!(
                        "limiting magnitude must be finite, got {}",
                        pointing.limiting_magnitude
                    ),
                });
            }
            if pointing.band.as_str().is_empty() {
                return Err(SurveyError::InvalidPointing {
                    index,
                    reason: "band label is empty".to_string(),
                });
            }
        }

        pointings.sort_by(|a, b| a.time.total_cmp(&b.time));

        Ok(Self {
            ra_deg,
            dec_deg,
            pointings,
        })
    }

    pub fn len(&self) -> usize {
        self.pointings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pointing> {
        self.pointings.iter()
    }

    pub fn pointings(&self) -> &[Pointing] {
        &self.pointings
    }

    /// Distinct bands appearing in the table
    pub fn bands(&self) -> BTreeSet<Band> {
        self.pointings.iter().map(|p| p.band.clone()).collect()
    }

    /// Row indices of every pointing, grouped by band
    ///
    /// Indices within a band are in table (time) order.
    pub fn indices_by_band(&self) -> BTreeMap<Band, Vec<usize>> {
        let mut groups: BTreeMap<Band, Vec<usize>> = BTreeMap::new();
        for (index, pointing) in self.pointings.iter().enumerate() {
            groups.entry(pointing.band.clone()).or_default().push(index);
        }
        groups
    }

    /// Keep only pointings at or before `end_time`
    pub fn truncated(&self, end_time: f64) -> Self {
        Self {
            ra_deg: self.ra_deg,
            dec_deg: self.dec_deg,
            pointings: self
                .pointings
                .iter()
                .filter(|p| p.time <= end_time)
                .cloned()
                .collect(),
        }
    }

    /// Read a pointing table from CSV with columns
    /// `time,band,limiting_magnitude[,cadence]`
    pub fn read_csv(path: &Path) -> Result<Self, SurveyError> {
        let mut reader = csv::Reader::from_path(path)?;
        let pointings = reader
            .deserialize()
            .collect::<Result<Vec<Pointing>, csv::Error>>()?;
        Self::new(pointings)
    }

    /// Write the pointings to CSV in the layout accepted by [`Self::read_csv`]
    pub fn write_csv(&self, path: &Path) -> Result<(), SurveyError> {
        let mut writer = csv::Writer::from_path(path)?;
        for pointing in &self.pointings {
            writer.serialize(pointing)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PointingTable {
    type Item = &'a Pointing;
    type IntoIter = std::slice::Iter<'a, Pointing>;

    fn into_iter(self) -> Self::IntoIter {
        self.pointings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_table() -> PointingTable {
        PointingTable::new(vec![
            Pointing::new(3.0, "r", 23.5),
            Pointing::new(1.0, "g", 24.0),
            Pointing::new(2.0, "r", 23.5),
            Pointing::new(1.0, "r", 23.4),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_sorts_stably_by_time() {
        let table = sample_table();
        let order: Vec<(f64, &str)> = table.iter().map(|p| (p.time, p.band.as_str())).collect();
        assert_eq!(order, vec![(1.0, "g"), (1.0, "r"), (2.0, "r"), (3.0, "r")]);
    }

    #[test]
    fn test_indices_by_band() {
        let table = sample_table();
        let groups = table.indices_by_band();

        assert_eq!(groups[&Band::new("g")], vec![0]);
        assert_eq!(groups[&Band::new("r")], vec![1, 2, 3]);
    }

    #[test]
    fn test_truncated_is_inclusive() {
        let table = sample_table().truncated(2.0);
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|p| p.time <= 2.0));
    }

    #[test]
    fn test_rejects_non_finite_time() {
        let err = PointingTable::new(vec![
            Pointing::new(1.0, "g", 24.0),
            Pointing::new(f64::NAN, "g", 24.0),
        ])
        .unwrap_err();
        assert!(matches!(err, SurveyError::InvalidPointing { index: 1, .. }));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pointings.csv");
        let table = sample_table();

        table.write_csv(&path).unwrap();
        let loaded = PointingTable::read_csv(&path).unwrap();

        assert_eq!(loaded.pointings(), table.pointings());
    }

    #[test]
    fn test_read_csv_without_cadence_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pointings.csv");
        std::fs::write(&path, "time,band,limiting_magnitude\n5.0,g,24.1\n4.0,i,22.0\n").unwrap();

        let table = PointingTable::read_csv(&path).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.pointings()[0].band.as_str(), "i");
        assert_eq!(table.pointings()[0].cadence, None);
    }
}
