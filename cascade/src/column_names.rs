//! This module stores the column names of every frame the crate reads or produces: the raw
//! frames returned by an `InputSource`, the normalised observation frames, and the assembled
//! dataset handed to the modelling engine. Note that the raw names must stay synchronised with
//! whatever upstream extract writes the source files!

// Shared identifiers
pub const LOCATION_ID: &str = "location_id";
pub const PARENT_ID: &str = "parent_id";
pub const SEX_ID: &str = "sex_id";
pub const AGE_GROUP_ID: &str = "age_group_id";
pub const YEAR_ID: &str = "year_id";
pub const MEASURE_ID: &str = "measure_id";

// Raw mortality (ASDR / CSMR) estimates
pub const MEAN: &str = "mean";
pub const UPPER: &str = "upper";
pub const LOWER: &str = "lower";

// Raw crosswalk version
pub const AGE_START: &str = "age_start";
pub const AGE_END: &str = "age_end";
pub const YEAR_START: &str = "year_start";
pub const YEAR_END: &str = "year_end";
pub const STANDARD_ERROR: &str = "standard_error";
pub const IS_OUTLIER: &str = "is_outlier";

// Raw covariate estimates
pub const MEAN_VALUE: &str = "mean_value";

// Raw population estimates
pub const POPULATION: &str = "population";

// Normalised observation rows
pub const AGE_LOWER: &str = "age_lower";
pub const AGE_UPPER: &str = "age_upper";
pub const TIME_LOWER: &str = "time_lower";
pub const TIME_UPPER: &str = "time_upper";
pub const MEASURE: &str = "measure";
pub const MEAS_VALUE: &str = "meas_value";
pub const MEAS_STD: &str = "meas_std";
pub const HOLD_OUT: &str = "hold_out";

/// Column order of a normalised observation frame.
pub const OBSERVATION_COLUMNS: [&str; 11] = [
    LOCATION_ID,
    SEX_ID,
    AGE_GROUP_ID,
    AGE_LOWER,
    AGE_UPPER,
    TIME_LOWER,
    TIME_UPPER,
    MEASURE,
    MEAS_VALUE,
    MEAS_STD,
    HOLD_OUT,
];

// Derived columns of the assembled dataset
pub const DENSITY: &str = "density";
pub const ETA: &str = "eta";
pub const NU: &str = "nu";
pub const S_SEX: &str = "s_sex";
pub const S_ONE: &str = "s_one";

// Covariate reference values
pub const REAL_COVARIATE_ID: &str = "real_covariate_id";
pub const REFERENCE: &str = "reference";
pub const MAX_DIFFERENCE: &str = "max_difference";

// Modelling engine predictions
pub const C_LOCATION_ID: &str = "c_location_id";
pub const C_AGE_GROUP_ID: &str = "c_age_group_id";
pub const C_YEAR_ID: &str = "c_year_id";
pub const C_SEX_ID: &str = "c_sex_id";
pub const INTEGRAND_NAME: &str = "integrand_name";
pub const AVG_INTEGRAND: &str = "avg_integrand";
pub const SAMPLE_INDEX: &str = "sample_index";
