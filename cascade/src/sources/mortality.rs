//! All-cause (ASDR) and cause-specific (CSMR) mortality estimates.

use itertools::izip;
use log::{info, warn};
use polars::prelude::DataFrame;

use crate::column_names as COL;
use crate::demographics::AgeGroups;
use crate::error::Result;
use crate::frame::{f64_column, required_i64};
use crate::integrand::Integrand;
use crate::observations::{observations_to_df, ObservationRow};

/// z-score of the 95% uncertainty interval the estimates are published with.
const UI_Z_SCORE: f64 = 1.96;

/// All-cause mortality rates, modelled as `mtall`.
#[derive(Debug, Clone)]
pub struct Asdr {
    pub raw: DataFrame,
}

/// Cause-specific mortality rates, modelled as `mtspecific`.
#[derive(Debug, Clone)]
pub struct Csmr {
    pub cause_id: Option<i64>,
    pub raw: DataFrame,
}

impl Asdr {
    pub fn new(raw: DataFrame) -> Self {
        Self { raw }
    }

    pub fn configure_for_dismod(&self, age_groups: &AgeGroups) -> Result<DataFrame> {
        let rows = mortality_rows(&self.raw, Integrand::Mtall, age_groups)?;
        info!("ASDR normalised to {} rows", rows.len());
        observations_to_df(&rows)
    }
}

impl Csmr {
    pub fn new(cause_id: i64, raw: DataFrame) -> Self {
        Self {
            cause_id: Some(cause_id),
            raw,
        }
    }

    /// No cause was configured, so there is no cause-specific mortality to add.
    pub fn empty() -> Self {
        Self {
            cause_id: None,
            raw: DataFrame::empty(),
        }
    }

    pub fn configure_for_dismod(&self, age_groups: &AgeGroups) -> Result<DataFrame> {
        let rows = mortality_rows(&self.raw, Integrand::Mtspecific, age_groups)?;
        info!(
            "CSMR for cause {:?} normalised to {} rows",
            self.cause_id,
            rows.len()
        );
        observations_to_df(&rows)
    }
}

/// One row per estimate spanning its age group and calendar year. Estimates without a mean or
/// an uncertainty interval are dropped.
fn mortality_rows(
    raw: &DataFrame,
    measure: Integrand,
    age_groups: &AgeGroups,
) -> Result<Vec<ObservationRow>> {
    if raw.height() == 0 {
        return Ok(vec![]);
    }
    let location_ids = required_i64(raw, COL::LOCATION_ID)?;
    let year_ids = required_i64(raw, COL::YEAR_ID)?;
    let age_group_ids = required_i64(raw, COL::AGE_GROUP_ID)?;
    let sex_ids = required_i64(raw, COL::SEX_ID)?;
    let means = f64_column(raw, COL::MEAN)?;
    let uppers = f64_column(raw, COL::UPPER)?;
    let lowers = f64_column(raw, COL::LOWER)?;

    let mut rows = Vec::with_capacity(raw.height());
    let mut dropped = 0usize;
    for (location_id, year_id, age_group_id, sex_id, mean, upper, lower) in izip!(
        location_ids,
        year_ids,
        age_group_ids,
        sex_ids,
        means,
        uppers,
        lowers
    ) {
        let (Some(mean), Some(upper), Some(lower)) = (mean, upper, lower) else {
            dropped += 1;
            continue;
        };
        let (age_lower, age_upper) = age_groups.bounds(age_group_id)?;
        rows.push(ObservationRow {
            location_id,
            sex_id,
            age_group_id: Some(age_group_id),
            age_lower,
            age_upper,
            time_lower: year_id as f64,
            time_upper: (year_id + 1) as f64,
            measure,
            meas_value: mean,
            meas_std: (upper - lower) / (2.0 * UI_Z_SCORE),
            hold_out: Some(0),
        });
    }
    if dropped > 0 {
        warn!("Dropped {dropped} {measure} estimates with a missing mean or interval");
    }
    Ok(rows)
}
