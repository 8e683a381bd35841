//! Population-weighted interpolation of covariates onto arbitrary age/time windows.
//!
//! Covariates are estimated on the GBD grid (age groups × calendar years), while observations
//! cover whatever age and time ranges the study reported. For each target window the engine
//! takes every covariate estimate whose bin intersects the window and averages them, weighting
//! each by the population living inside the intersection.
//!
//! A window no covariate estimate intersects gets `0.0`. That value is indistinguishable from a
//! genuine zero covariate downstream, so every occurrence is logged; check the logs before
//! trusting a covariate column full of zeros.
//!
//! Contributions are summed in a fixed order: by sex in the order of the matching tier, then
//! location-invariant estimates before those at the target location, then year and age within
//! each group. Identical inputs give bit-identical outputs.

use std::collections::BTreeMap;

use itertools::izip;
use log::{debug, warn};
use polars::prelude::{DataFrame, NamedFrom, Series};

use crate::column_names as COL;
use crate::error::Result;
use crate::frame::{required_f64, required_i64};
use crate::integrand::{BOTH_SEX, FEMALE, MALE};
use crate::sources::{CovariateRecord, CovariateSeries, PopulationRecord, PopulationWeights};

/// Value given to a window no covariate estimate intersects.
pub const NO_OVERLAP_VALUE: f64 = 0.0;

/// The age/time window one interpolated value is computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetWindow {
    pub location_id: i64,
    pub sex_id: i64,
    pub age_lower: f64,
    pub age_upper: f64,
    pub time_lower: f64,
    pub time_upper: f64,
}

impl TargetWindow {
    /// One window per row of a frame with location, sex, age and time bounds.
    pub fn from_df(df: &DataFrame) -> Result<Vec<Self>> {
        if df.height() == 0 {
            return Ok(vec![]);
        }
        Ok(izip!(
            required_i64(df, COL::LOCATION_ID)?,
            required_i64(df, COL::SEX_ID)?,
            required_f64(df, COL::AGE_LOWER)?,
            required_f64(df, COL::AGE_UPPER)?,
            required_f64(df, COL::TIME_LOWER)?,
            required_f64(df, COL::TIME_UPPER)?
        )
        .map(
            |(location_id, sex_id, age_lower, age_upper, time_lower, time_upper)| TargetWindow {
                location_id,
                sex_id,
                age_lower,
                age_upper,
                time_lower,
                time_upper,
            },
        )
        .collect())
    }
}

/// Interpolated covariate values for each row of `data`, as a column called `name`.
pub fn get_interpolated_covariate_values(
    data: &DataFrame,
    covariate: &CovariateSeries,
    population: &PopulationWeights,
    name: &str,
) -> Result<Series> {
    let targets = TargetWindow::from_df(data)?;
    Ok(Series::new(
        name,
        interpolate_covariate(&targets, covariate, population),
    ))
}

/// One interpolated value per target, in target order.
pub fn interpolate_covariate(
    targets: &[TargetWindow],
    covariate: &CovariateSeries,
    population: &PopulationWeights,
) -> Vec<f64> {
    let index = CovariateIndex::new(covariate);
    let mut no_overlap = 0usize;
    let mut no_population = 0usize;
    let values = targets
        .iter()
        .map(|target| match index.interpolate(target, population) {
            Interpolated::Weighted(value) => value,
            Interpolated::Unweighted(value) => {
                no_population += 1;
                value
            }
            Interpolated::NoOverlap => {
                no_overlap += 1;
                NO_OVERLAP_VALUE
            }
        })
        .collect();

    if no_overlap > 0 {
        warn!(
            "Covariate {}: {no_overlap} of {} windows intersect no estimate and were set to {NO_OVERLAP_VALUE}",
            covariate.covariate_id,
            targets.len()
        );
    }
    if no_population > 0 {
        warn!(
            "Covariate {}: {no_population} of {} windows have no population weight; \
             their estimates were averaged by overlap only",
            covariate.covariate_id,
            targets.len()
        );
    }
    debug!(
        "Interpolated covariate {} onto {} windows",
        covariate.covariate_id,
        targets.len()
    );
    values
}

enum Interpolated {
    Weighted(f64),
    Unweighted(f64),
    NoOverlap,
}

/// Covariate records grouped by `(location_id, sex_id)`, each group in series order.
struct CovariateIndex<'a> {
    groups: BTreeMap<(Option<i64>, i64), Vec<&'a CovariateRecord>>,
}

/// One intersecting covariate estimate and its weights.
struct Contribution {
    value: f64,
    /// Population mass inside the intersection, pro-rated by time overlap.
    weight: f64,
    /// Fraction of the estimate's bin inside the window.
    overlap: f64,
}

impl<'a> CovariateIndex<'a> {
    fn new(covariate: &'a CovariateSeries) -> Self {
        let mut groups: BTreeMap<(Option<i64>, i64), Vec<&'a CovariateRecord>> = BTreeMap::new();
        for record in covariate.records() {
            groups
                .entry((record.location_id, record.sex_id))
                .or_default()
                .push(record);
        }
        Self { groups }
    }

    fn interpolate(&self, target: &TargetWindow, population: &PopulationWeights) -> Interpolated {
        let contributions = sex_tiers(target.sex_id)
            .iter()
            .map(|tier| self.contributions(target, tier, population))
            .find(|contributions| !contributions.is_empty());
        let Some(contributions) = contributions else {
            return Interpolated::NoOverlap;
        };

        let total_weight = contributions.iter().fold(0.0, |acc, c| acc + c.weight);
        if total_weight > 0.0 {
            return Interpolated::Weighted(
                contributions
                    .iter()
                    .fold(0.0, |acc, c| acc + c.value * (c.weight / total_weight)),
            );
        }
        let total_overlap = contributions.iter().fold(0.0, |acc, c| acc + c.overlap);
        Interpolated::Unweighted(
            contributions
                .iter()
                .fold(0.0, |acc, c| acc + c.value * (c.overlap / total_overlap)),
        )
    }

    fn contributions(
        &self,
        target: &TargetWindow,
        sexes: &[i64],
        population: &PopulationWeights,
    ) -> Vec<Contribution> {
        let mut contributions = vec![];
        for &sex_id in sexes {
            // Location-invariant estimates sort before location-specific ones.
            for location in [None, Some(target.location_id)] {
                let Some(records) = self.groups.get(&(location, sex_id)) else {
                    continue;
                };
                contributions.extend(
                    records
                        .iter()
                        .filter_map(|record| contribution(record, target, population)),
                );
            }
        }
        contributions
    }
}

/// Covariate sexes to try for a target sex, most specific first.
fn sex_tiers(sex_id: i64) -> Vec<Vec<i64>> {
    match sex_id {
        BOTH_SEX => vec![vec![BOTH_SEX], vec![MALE, FEMALE]],
        sex_id => vec![vec![sex_id], vec![BOTH_SEX]],
    }
}

fn contribution(
    record: &CovariateRecord,
    target: &TargetWindow,
    population: &PopulationWeights,
) -> Option<Contribution> {
    let year_lower = record.year_id as f64;
    let time_overlap = overlap_fraction(
        year_lower,
        year_lower + 1.0,
        target.time_lower,
        target.time_upper,
    )?;
    let age_overlap = overlap_fraction(
        record.age_lower,
        record.age_upper,
        target.age_lower,
        target.age_upper,
    )?;

    let location_id = record.location_id.unwrap_or(target.location_id);
    let sex_id = if record.sex_id == BOTH_SEX {
        target.sex_id
    } else {
        record.sex_id
    };
    let mass = population_mass(
        &population_bins(population, location_id, sex_id, record.year_id),
        record.age_lower.max(target.age_lower),
        record.age_upper.min(target.age_upper),
    );
    Some(Contribution {
        value: record.mean_value,
        weight: time_overlap * mass,
        overlap: time_overlap * age_overlap,
    })
}

/// Population bins for a sex, falling back to both sexes for a single sex and to the two
/// single sexes for both sexes.
fn population_bins(
    population: &PopulationWeights,
    location_id: i64,
    sex_id: i64,
    year_id: i64,
) -> Vec<&PopulationRecord> {
    let bins = population.bins(location_id, sex_id, year_id);
    if !bins.is_empty() {
        return bins.iter().collect();
    }
    match sex_id {
        BOTH_SEX => population
            .bins(location_id, MALE, year_id)
            .iter()
            .chain(population.bins(location_id, FEMALE, year_id))
            .collect(),
        _ => population.bins(location_id, BOTH_SEX, year_id).iter().collect(),
    }
}

/// Population living in `[lower, upper]`, pro-rating bins that are partly inside.
fn population_mass(bins: &[&PopulationRecord], lower: f64, upper: f64) -> f64 {
    bins.iter()
        .filter_map(|bin| {
            overlap_fraction(bin.age_lower, bin.age_upper, lower, upper)
                .map(|fraction| bin.population * fraction)
        })
        .fold(0.0, |acc, mass| acc + mass)
}

/// Fraction of the bin `[bin_lower, bin_upper)` covered by the window `[lower, upper]`, or
/// `None` when they do not intersect. A zero-width window covers the whole bin containing it.
fn overlap_fraction(bin_lower: f64, bin_upper: f64, lower: f64, upper: f64) -> Option<f64> {
    if bin_upper <= bin_lower {
        return (lower <= bin_lower && bin_lower <= upper).then_some(1.0);
    }
    if upper <= lower {
        return (bin_lower <= lower && lower < bin_upper).then_some(1.0);
    }
    let overlap = upper.min(bin_upper) - lower.max(bin_lower);
    (overlap > 0.0).then(|| overlap / (bin_upper - bin_lower))
}
