//! The demographic grid requested from every source for a GBD round.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CascadeError, Result};
use crate::integrand::{FEMALE, MALE};

/// Oldest age any age group reaches.
pub const MAX_AGE: f64 = 125.0;
pub const ALL_AGES: i64 = 22;
pub const AGE_STANDARDIZED: i64 = 27;

/// Age bounds, in years, of the GBD age groups any supported round uses, and of the aggregate
/// groups covariates are published on.
const AGE_GROUP_BOUNDS: [(i64, f64, f64); 39] = [
    (2, 0.0, 0.019_178_08),
    (3, 0.019_178_08, 0.076_712_33),
    (4, 0.076_712_33, 1.0),
    (5, 1.0, 5.0),
    (6, 5.0, 10.0),
    (7, 10.0, 15.0),
    (8, 15.0, 20.0),
    (9, 20.0, 25.0),
    (10, 25.0, 30.0),
    (11, 30.0, 35.0),
    (12, 35.0, 40.0),
    (13, 40.0, 45.0),
    (14, 45.0, 50.0),
    (15, 50.0, 55.0),
    (16, 55.0, 60.0),
    (17, 60.0, 65.0),
    (18, 65.0, 70.0),
    (19, 70.0, 75.0),
    (20, 75.0, 80.0),
    (30, 80.0, 85.0),
    (31, 85.0, 90.0),
    (32, 90.0, 95.0),
    (34, 2.0, 5.0),
    (235, 95.0, MAX_AGE),
    (238, 1.0, 2.0),
    (388, 0.076_712_33, 0.5),
    (389, 0.5, 1.0),
    (ALL_AGES, 0.0, MAX_AGE),
    // Aggregates
    (1, 0.0, 5.0),
    (21, 80.0, MAX_AGE),
    (23, 5.0, 15.0),
    (24, 15.0, 50.0),
    (25, 50.0, 70.0),
    (26, 70.0, MAX_AGE),
    (28, 0.0, 1.0),
    (37, 20.0, MAX_AGE),
    (39, 0.0, 15.0),
    (41, 50.0, MAX_AGE),
    (158, 0.0, 20.0),
];

const ROUND_5_AGES: [i64; 23] = [
    2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 30, 31, 32, 235,
];
const ROUND_7_AGES: [i64; 25] = [
    2, 3, 388, 389, 238, 34, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 30, 31, 32,
    235,
];

/// Lookup from age group id to `[age_lower, age_upper)` in years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroups(BTreeMap<i64, (f64, f64)>);

impl AgeGroups {
    pub fn gbd() -> Self {
        let mut bounds: BTreeMap<i64, (f64, f64)> = AGE_GROUP_BOUNDS
            .iter()
            .map(|&(id, lower, upper)| (id, (lower, upper)))
            .collect();
        bounds.insert(AGE_STANDARDIZED, (0.0, MAX_AGE));
        Self(bounds)
    }

    pub fn bounds(&self, age_group_id: i64) -> Result<(f64, f64)> {
        self.0
            .get(&age_group_id)
            .copied()
            .ok_or(CascadeError::UnknownAgeGroup(age_group_id))
    }
}

impl Default for AgeGroups {
    fn default() -> Self {
        Self::gbd()
    }
}

/// Demographic ids to request from the sources for one GBD round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub gbd_round_id: i64,
    pub age_group_ids: Vec<i64>,
    pub year_ids: Vec<i64>,
    pub sex_ids: Vec<i64>,
    /// Best estimation location hierarchy version for the round.
    pub location_set_version_id: i64,
    pub age_groups: AgeGroups,
}

impl Demographics {
    pub fn for_round(gbd_round_id: i64) -> Result<Self> {
        let (age_group_ids, year_ids, location_set_version_id): (Vec<i64>, Vec<i64>, i64) =
            match gbd_round_id {
                5 => (
                    ROUND_5_AGES.to_vec(),
                    vec![1990, 1995, 2000, 2005, 2010, 2017],
                    319,
                ),
                6 => (
                    ROUND_5_AGES.to_vec(),
                    vec![1990, 1995, 2000, 2005, 2010, 2015, 2019],
                    544,
                ),
                7 => (
                    ROUND_7_AGES.to_vec(),
                    vec![1990, 1995, 2000, 2005, 2010, 2015, 2019, 2020, 2021, 2022],
                    1020,
                ),
                other => return Err(CascadeError::UnknownRound(other)),
            };
        Ok(Self {
            gbd_round_id,
            age_group_ids,
            year_ids,
            sex_ids: vec![MALE, FEMALE],
            location_set_version_id,
            age_groups: AgeGroups::gbd(),
        })
    }
}

/// Name of the decomposition step sources are versioned by.
pub fn decomp_step_from_id(decomp_step_id: i64) -> Result<String> {
    match decomp_step_id {
        1..=5 => Ok(format!("step{decomp_step_id}")),
        6 => Ok("iterative".to_string()),
        other => Err(CascadeError::UnknownDecompStep(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_round_age_group_has_bounds() -> anyhow::Result<()> {
        for round in [5, 6, 7] {
            let demographics = Demographics::for_round(round)?;
            for id in &demographics.age_group_ids {
                let (lower, upper) = demographics.age_groups.bounds(*id)?;
                assert!(lower < upper, "age group {id} should have a positive width");
            }
            assert_eq!(demographics.sex_ids, vec![MALE, FEMALE]);
        }
        Ok(())
    }

    #[test]
    fn resolution_is_deterministic() -> anyhow::Result<()> {
        assert_eq!(Demographics::for_round(6)?, Demographics::for_round(6)?);
        assert!(matches!(
            Demographics::for_round(2),
            Err(CascadeError::UnknownRound(2))
        ));
        Ok(())
    }

    #[test]
    fn aggregate_age_groups_span_all_ages() -> anyhow::Result<()> {
        let ages = AgeGroups::gbd();
        assert_eq!(ages.bounds(ALL_AGES)?, (0.0, MAX_AGE));
        assert_eq!(ages.bounds(AGE_STANDARDIZED)?, (0.0, MAX_AGE));
        assert_eq!(ages.bounds(1)?, (0.0, 5.0));
        assert_eq!(ages.bounds(21)?, (80.0, MAX_AGE));
        assert_eq!(ages.bounds(28)?, (0.0, 1.0));
        assert!(ages.bounds(999).is_err());
        Ok(())
    }

    #[test]
    fn decomp_steps() -> anyhow::Result<()> {
        assert_eq!(decomp_step_from_id(4)?, "step4");
        assert_eq!(decomp_step_from_id(6)?, "iterative");
        assert!(decomp_step_from_id(0).is_err());
        Ok(())
    }
}
