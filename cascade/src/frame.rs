//! Helpers for pulling typed columns out of polars `DataFrame`s.

use polars::prelude::{DataFrame, DataType};

use crate::error::{CascadeError, Result};

/// Integer column, cast to `i64` so sources may store narrower ints.
pub fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().collect())
}

/// Float column, cast to `f64`.
pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

pub fn str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Integer column that must not contain nulls.
pub fn required_i64(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    require(i64_column(df, name)?, name)
}

/// Float column that must not contain nulls.
pub fn required_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    require(f64_column(df, name)?, name)
}

fn require<T>(values: Vec<Option<T>>, name: &str) -> Result<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| CascadeError::NullValue {
                column: name.to_string(),
                row,
            })
        })
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|column| *column == name)
}
