//! Population estimates, used only as interpolation weights.

use std::collections::BTreeMap;

use itertools::izip;
use log::info;
use polars::prelude::DataFrame;

use crate::column_names as COL;
use crate::demographics::AgeGroups;
use crate::error::Result;
use crate::frame::{required_f64, required_i64};

#[derive(Debug, Clone)]
pub struct Population {
    pub raw: DataFrame,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub location_id: i64,
    pub sex_id: i64,
    pub age_group_id: i64,
    pub age_lower: f64,
    pub age_upper: f64,
    pub year_id: i64,
    pub population: f64,
}

/// Population bins keyed by `(location_id, sex_id, year_id)`, each list sorted by age.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationWeights {
    bins: BTreeMap<(i64, i64, i64), Vec<PopulationRecord>>,
}

impl Population {
    pub fn new(raw: DataFrame) -> Self {
        Self { raw }
    }

    pub fn weights(&self, age_groups: &AgeGroups) -> Result<PopulationWeights> {
        let raw = &self.raw;
        if raw.height() == 0 {
            return Ok(PopulationWeights::default());
        }
        let mut records = Vec::with_capacity(raw.height());
        for (location_id, sex_id, age_group_id, year_id, population) in izip!(
            required_i64(raw, COL::LOCATION_ID)?,
            required_i64(raw, COL::SEX_ID)?,
            required_i64(raw, COL::AGE_GROUP_ID)?,
            required_i64(raw, COL::YEAR_ID)?,
            required_f64(raw, COL::POPULATION)?
        ) {
            let (age_lower, age_upper) = age_groups.bounds(age_group_id)?;
            records.push(PopulationRecord {
                location_id,
                sex_id,
                age_group_id,
                age_lower,
                age_upper,
                year_id,
                population,
            });
        }
        info!("Population has {} records", records.len());
        Ok(PopulationWeights::new(records))
    }
}

impl PopulationWeights {
    pub fn new(records: Vec<PopulationRecord>) -> Self {
        let mut bins: BTreeMap<(i64, i64, i64), Vec<PopulationRecord>> = BTreeMap::new();
        for record in records {
            bins.entry((record.location_id, record.sex_id, record.year_id))
                .or_default()
                .push(record);
        }
        for records in bins.values_mut() {
            records.sort_by(|a, b| {
                a.age_lower
                    .total_cmp(&b.age_lower)
                    .then(a.age_upper.total_cmp(&b.age_upper))
                    .then(a.age_group_id.cmp(&b.age_group_id))
            });
        }
        Self { bins }
    }

    /// Population bins for one location, sex and year, sorted by age.
    pub fn bins(&self, location_id: i64, sex_id: i64, year_id: i64) -> &[PopulationRecord] {
        self.bins
            .get(&(location_id, sex_id, year_id))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Only the populations of `location_id`.
    pub fn restrict_to_location(&self, location_id: i64) -> Self {
        Self {
            bins: self
                .bins
                .iter()
                .filter(|((location, _, _), _)| *location == location_id)
                .map(|(key, records)| (*key, records.clone()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}
