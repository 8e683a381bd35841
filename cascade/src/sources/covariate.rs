//! Country covariate estimates on the GBD age/year/location grid.

use std::collections::BTreeSet;

use itertools::izip;
use log::{info, warn};
use polars::prelude::DataFrame;

use crate::column_names as COL;
use crate::demographics::AgeGroups;
use crate::error::Result;
use crate::frame::{f64_column, has_column, required_i64};

#[derive(Debug, Clone)]
pub struct CovariateData {
    pub covariate_id: i64,
    pub raw: DataFrame,
}

/// One covariate estimate. `location_id` is `None` when the covariate does not vary by
/// location.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateRecord {
    pub location_id: Option<i64>,
    pub sex_id: i64,
    pub age_group_id: i64,
    pub age_lower: f64,
    pub age_upper: f64,
    pub year_id: i64,
    pub mean_value: f64,
}

/// Covariate records sorted by `(location_id, sex_id, year_id, age_lower)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateSeries {
    pub covariate_id: i64,
    records: Vec<CovariateRecord>,
}

impl CovariateData {
    pub fn new(covariate_id: i64, raw: DataFrame) -> Self {
        Self { covariate_id, raw }
    }

    /// Records with age bounds attached. Estimates without a mean value are dropped.
    pub fn configure_for_dismod(&self, age_groups: &AgeGroups) -> Result<CovariateSeries> {
        let raw = &self.raw;
        if raw.height() == 0 {
            warn!("Covariate {} has no estimates", self.covariate_id);
            return Ok(CovariateSeries::new(self.covariate_id, vec![]));
        }
        let location_ids = if has_column(raw, COL::LOCATION_ID) {
            required_i64(raw, COL::LOCATION_ID)?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; raw.height()]
        };

        let mut records = Vec::with_capacity(raw.height());
        let mut unknown_age_groups = BTreeSet::new();
        let mut dropped = 0;
        for (location_id, sex_id, age_group_id, year_id, mean_value) in izip!(
            location_ids,
            required_i64(raw, COL::SEX_ID)?,
            required_i64(raw, COL::AGE_GROUP_ID)?,
            required_i64(raw, COL::YEAR_ID)?,
            f64_column(raw, COL::MEAN_VALUE)?
        ) {
            let Some(mean_value) = mean_value else {
                continue;
            };
            let Ok((age_lower, age_upper)) = age_groups.bounds(age_group_id) else {
                unknown_age_groups.insert(age_group_id);
                dropped += 1;
                continue;
            };
            records.push(CovariateRecord {
                location_id,
                sex_id,
                age_group_id,
                age_lower,
                age_upper,
                year_id,
                mean_value,
            });
        }
        if !unknown_age_groups.is_empty() {
            warn!(
                "Covariate {}: dropped {dropped} estimates in unknown age groups {unknown_age_groups:?}",
                self.covariate_id
            );
        }
        info!(
            "Covariate {} has {} estimates",
            self.covariate_id,
            records.len()
        );
        Ok(CovariateSeries::new(self.covariate_id, records))
    }
}

impl CovariateSeries {
    pub fn new(covariate_id: i64, mut records: Vec<CovariateRecord>) -> Self {
        records.sort_by(|a, b| {
            (a.location_id, a.sex_id, a.year_id)
                .cmp(&(b.location_id, b.sex_id, b.year_id))
                .then(a.age_lower.total_cmp(&b.age_lower))
                .then(a.age_upper.total_cmp(&b.age_upper))
        });
        Self {
            covariate_id,
            records,
        }
    }

    pub fn records(&self) -> &[CovariateRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records at any of `location_ids`, plus location-invariant records.
    pub fn restrict_to_locations(&self, location_ids: &[i64]) -> Self {
        let records = self
            .records
            .iter()
            .filter(|r| match r.location_id {
                Some(location_id) => location_ids.contains(&location_id),
                None => true,
            })
            .cloned()
            .collect();
        Self::new(self.covariate_id, records)
    }
}
