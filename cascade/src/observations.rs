//! Normalised observation rows: the unit the modelling engine consumes.

use polars::prelude::*;

use crate::column_names as COL;
use crate::error::Result;
use crate::integrand::Integrand;

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub location_id: i64,
    pub sex_id: i64,
    /// Present for rows that came from a GBD age group grid.
    pub age_group_id: Option<i64>,
    pub age_lower: f64,
    pub age_upper: f64,
    pub time_lower: f64,
    pub time_upper: f64,
    pub measure: Integrand,
    pub meas_value: f64,
    pub meas_std: f64,
    /// Missing hold-out flags become 0 once the dataset is assembled.
    pub hold_out: Option<i64>,
}

/// Builds a frame with the columns of `COL::OBSERVATION_COLUMNS`, in that order. An empty slice
/// gives an empty frame with the same schema so frames from every source can be concatenated.
pub fn observations_to_df(rows: &[ObservationRow]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new(
            COL::LOCATION_ID,
            rows.iter().map(|r| r.location_id).collect::<Vec<i64>>(),
        ),
        Series::new(
            COL::SEX_ID,
            rows.iter().map(|r| r.sex_id).collect::<Vec<i64>>(),
        ),
        Series::new(
            COL::AGE_GROUP_ID,
            rows.iter().map(|r| r.age_group_id).collect::<Vec<Option<i64>>>(),
        ),
        Series::new(
            COL::AGE_LOWER,
            rows.iter().map(|r| r.age_lower).collect::<Vec<f64>>(),
        ),
        Series::new(
            COL::AGE_UPPER,
            rows.iter().map(|r| r.age_upper).collect::<Vec<f64>>(),
        ),
        Series::new(
            COL::TIME_LOWER,
            rows.iter().map(|r| r.time_lower).collect::<Vec<f64>>(),
        ),
        Series::new(
            COL::TIME_UPPER,
            rows.iter().map(|r| r.time_upper).collect::<Vec<f64>>(),
        ),
        Series::new(
            COL::MEASURE,
            rows.iter().map(|r| r.measure.as_str()).collect::<Vec<&str>>(),
        ),
        Series::new(
            COL::MEAS_VALUE,
            rows.iter().map(|r| r.meas_value).collect::<Vec<f64>>(),
        ),
        Series::new(
            COL::MEAS_STD,
            rows.iter().map(|r| r.meas_std).collect::<Vec<f64>>(),
        ),
        Series::new(
            COL::HOLD_OUT,
            rows.iter().map(|r| r.hold_out).collect::<Vec<Option<i64>>>(),
        ),
    ])?;
    Ok(df)
}
