//! Model predictions reshaped into the GBD upload schema.

use std::collections::BTreeMap;

use itertools::izip;
use log::info;
use polars::prelude::*;

use crate::column_names as COL;
use crate::error::Result;
use crate::frame::{required_f64, required_i64, str_column};
use crate::integrand::{Integrand, INCIDENCE_MEASURE_ID};

/// Quantiles reported as the uncertainty interval.
const LOWER_QUANTILE: f64 = 0.025;
const UPPER_QUANTILE: f64 = 0.975;

/// Summarises predictions, one row per demographic cell and draw, into mean and 95% interval
/// per `(location_id, age_group_id, year_id, sex_id, measure_id)`.
///
/// Input columns are `c_location_id`, `c_age_group_id`, `c_year_id`, `c_sex_id`,
/// `integrand_name` and `avg_integrand`; rows sharing a cell are draws. Susceptible incidence is
/// reported under its own measure id and again as GBD incidence. Output rows are ordered by
/// measure, age group, year and sex, with location varying fastest.
pub fn format_predictions_for_ihme(predictions: &DataFrame) -> Result<DataFrame> {
    let mut draws: BTreeMap<(i64, i64, i64, i64, i64), Vec<f64>> = BTreeMap::new();
    if predictions.height() > 0 {
        for (location_id, age_group_id, year_id, sex_id, integrand_name, value) in izip!(
            required_i64(predictions, COL::C_LOCATION_ID)?,
            required_i64(predictions, COL::C_AGE_GROUP_ID)?,
            required_i64(predictions, COL::C_YEAR_ID)?,
            required_i64(predictions, COL::C_SEX_ID)?,
            str_column(predictions, COL::INTEGRAND_NAME)?,
            required_f64(predictions, COL::AVG_INTEGRAND)?
        ) {
            let integrand = Integrand::parse(integrand_name.as_deref().unwrap_or_default())?;
            let mut measure_ids = vec![integrand.measure_id()];
            if integrand == Integrand::Sincidence {
                measure_ids.push(INCIDENCE_MEASURE_ID);
            }
            for measure_id in measure_ids {
                draws
                    .entry((measure_id, age_group_id, year_id, sex_id, location_id))
                    .or_default()
                    .push(value);
            }
        }
    }

    let mut location_ids = vec![];
    let mut age_group_ids = vec![];
    let mut year_ids = vec![];
    let mut sex_ids = vec![];
    let mut measure_ids = vec![];
    let mut means = vec![];
    let mut uppers = vec![];
    let mut lowers = vec![];
    for ((measure_id, age_group_id, year_id, sex_id, location_id), mut values) in draws {
        values.sort_by(f64::total_cmp);
        location_ids.push(location_id);
        age_group_ids.push(age_group_id);
        year_ids.push(year_id);
        sex_ids.push(sex_id);
        measure_ids.push(measure_id);
        means.push(values.iter().sum::<f64>() / values.len() as f64);
        uppers.push(quantile(&values, UPPER_QUANTILE));
        lowers.push(quantile(&values, LOWER_QUANTILE));
    }

    let df = DataFrame::new(vec![
        Series::new(COL::LOCATION_ID, location_ids),
        Series::new(COL::AGE_GROUP_ID, age_group_ids),
        Series::new(COL::YEAR_ID, year_ids),
        Series::new(COL::SEX_ID, sex_ids),
        Series::new(COL::MEASURE_ID, measure_ids),
        Series::new(COL::MEAN, means),
        Series::new(COL::UPPER, uppers),
        Series::new(COL::LOWER, lowers),
    ])?;
    info!(
        "Formatted {} predictions into {} rows",
        predictions.height(),
        df.height()
    );
    Ok(df)
}

/// Linearly interpolated quantile of sorted, non-empty `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let position = q * (values.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    values[below] + (values[above] - values[below]) * (position - below as f64)
}

#[cfg(test)]
mod tests {
    use polars::df;
    use strum::IntoEnumIterator;

    use super::*;

    /// One draw per location for eleven integrands.
    fn predictions() -> DataFrame {
        let integrands: Vec<Integrand> = Integrand::iter()
            .filter(|integrand| !matches!(integrand, Integrand::Relrisk | Integrand::Mtstandard))
            .collect();
        let mut locations = vec![];
        let mut names = vec![];
        let mut values = vec![];
        for integrand in &integrands {
            for location_id in 70..73i64 {
                locations.push(location_id);
                names.push(integrand.as_str());
                values.push(location_id as f64 / 100.0);
            }
        }
        let rows = locations.len();
        df!(
            COL::C_LOCATION_ID => locations,
            COL::C_AGE_GROUP_ID => vec![2i64; rows],
            COL::C_YEAR_ID => vec![1990i64; rows],
            COL::C_SEX_ID => vec![2i64; rows],
            COL::INTEGRAND_NAME => names,
            COL::AVG_INTEGRAND => values,
        )
        .unwrap()
    }

    #[test]
    fn susceptible_incidence_is_also_reported_as_incidence() -> anyhow::Result<()> {
        let predictions = predictions();
        assert_eq!(predictions.height(), 33);
        let formatted = format_predictions_for_ihme(&predictions)?;
        assert_eq!(
            formatted.get_column_names(),
            vec![
                COL::LOCATION_ID,
                COL::AGE_GROUP_ID,
                COL::YEAR_ID,
                COL::SEX_ID,
                COL::MEASURE_ID,
                COL::MEAN,
                COL::UPPER,
                COL::LOWER
            ]
        );
        assert_eq!(formatted.height(), 36);
        let locations = required_i64(&formatted, COL::LOCATION_ID)?;
        assert_eq!(locations, [70, 71, 72].repeat(12));
        let measure_ids = required_i64(&formatted, COL::MEASURE_ID)?;
        assert_eq!(measure_ids.iter().filter(|id| **id == 6).count(), 3);
        assert_eq!(measure_ids.iter().filter(|id| **id == 41).count(), 3);
        assert!(measure_ids.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }

    #[test]
    fn a_single_draw_has_no_interval() -> anyhow::Result<()> {
        let formatted = format_predictions_for_ihme(&predictions())?;
        let means = required_f64(&formatted, COL::MEAN)?;
        assert_eq!(required_f64(&formatted, COL::LOWER)?, means);
        assert_eq!(required_f64(&formatted, COL::UPPER)?, means);
        Ok(())
    }

    #[test]
    fn draws_are_summarised_by_mean_and_quantiles() -> anyhow::Result<()> {
        let values: Vec<f64> = (0..=40).map(f64::from).collect();
        let rows = values.len();
        let predictions = df!(
            COL::C_LOCATION_ID => vec![70i64; rows],
            COL::C_AGE_GROUP_ID => vec![2i64; rows],
            COL::C_YEAR_ID => vec![1990i64; rows],
            COL::C_SEX_ID => vec![1i64; rows],
            COL::INTEGRAND_NAME => vec!["prevalence"; rows],
            COL::AVG_INTEGRAND => values,
            COL::SAMPLE_INDEX => (0..rows as i64).collect::<Vec<_>>(),
        )?;
        let formatted = format_predictions_for_ihme(&predictions)?;
        assert_eq!(formatted.height(), 1);
        assert_eq!(required_i64(&formatted, COL::MEASURE_ID)?, vec![5]);
        assert_eq!(required_f64(&formatted, COL::MEAN)?, vec![20.0]);
        assert_eq!(required_f64(&formatted, COL::LOWER)?, vec![1.0]);
        assert_eq!(required_f64(&formatted, COL::UPPER)?, vec![39.0]);
        Ok(())
    }

    #[test]
    fn unknown_integrands_are_errors() {
        let predictions = df!(
            COL::C_LOCATION_ID => &[70i64],
            COL::C_AGE_GROUP_ID => &[2i64],
            COL::C_YEAR_ID => &[1990i64],
            COL::C_SEX_ID => &[1i64],
            COL::INTEGRAND_NAME => &["mulcov_0"],
            COL::AVG_INTEGRAND => &[0.1f64],
        )
        .unwrap();
        assert!(format_predictions_for_ihme(&predictions).is_err());
    }
}
