//! Bias-adjusted observational data from a crosswalk version.

use itertools::izip;
use log::{info, warn};
use polars::prelude::DataFrame;

use crate::column_names as COL;
use crate::error::Result;
use crate::frame::{has_column, i64_column, required_f64, required_i64};
use crate::integrand::Integrand;
use crate::observations::{observations_to_df, ObservationRow};

#[derive(Debug, Clone)]
pub struct CrosswalkVersion {
    pub crosswalk_version_id: i64,
    pub exclude_outliers: bool,
    pub raw: DataFrame,
}

impl CrosswalkVersion {
    pub fn new(crosswalk_version_id: i64, exclude_outliers: bool, raw: DataFrame) -> Self {
        Self {
            crosswalk_version_id,
            exclude_outliers,
            raw,
        }
    }

    /// Observation rows for every measure not in `measures_to_exclude`. Year ranges are
    /// inclusive in the extract, so `time_upper` is one past `year_end`. Rows whose age or year
    /// range is inverted are dropped.
    pub fn configure_for_dismod(&self, measures_to_exclude: &[Integrand]) -> Result<DataFrame> {
        let rows = self.rows(measures_to_exclude)?;
        info!(
            "Crosswalk version {} normalised to {} of {} rows",
            self.crosswalk_version_id,
            rows.len(),
            self.raw.height()
        );
        observations_to_df(&rows)
    }

    fn rows(&self, measures_to_exclude: &[Integrand]) -> Result<Vec<ObservationRow>> {
        let raw = &self.raw;
        if raw.height() == 0 {
            return Ok(vec![]);
        }
        let outliers = if has_column(raw, COL::IS_OUTLIER) {
            i64_column(raw, COL::IS_OUTLIER)?
        } else {
            vec![None; raw.height()]
        };
        let hold_outs = if has_column(raw, COL::HOLD_OUT) {
            i64_column(raw, COL::HOLD_OUT)?
        } else {
            vec![None; raw.height()]
        };

        let mut rows = vec![];
        let mut inverted = 0;
        for (
            location_id,
            sex_id,
            measure_id,
            age_start,
            age_end,
            year_start,
            year_end,
            mean,
            standard_error,
            is_outlier,
            hold_out,
        ) in izip!(
            required_i64(raw, COL::LOCATION_ID)?,
            required_i64(raw, COL::SEX_ID)?,
            required_i64(raw, COL::MEASURE_ID)?,
            required_f64(raw, COL::AGE_START)?,
            required_f64(raw, COL::AGE_END)?,
            required_f64(raw, COL::YEAR_START)?,
            required_f64(raw, COL::YEAR_END)?,
            required_f64(raw, COL::MEAN)?,
            required_f64(raw, COL::STANDARD_ERROR)?,
            outliers,
            hold_outs
        ) {
            if self.exclude_outliers && is_outlier == Some(1) {
                continue;
            }
            let measure = Integrand::from_measure_id(measure_id)?;
            if measures_to_exclude.contains(&measure) {
                continue;
            }
            if age_start > age_end || year_start > year_end {
                inverted += 1;
                continue;
            }
            rows.push(ObservationRow {
                location_id,
                sex_id,
                age_group_id: None,
                age_lower: age_start,
                age_upper: age_end,
                time_lower: year_start,
                time_upper: year_end + 1.0,
                measure,
                meas_value: mean,
                meas_std: standard_error,
                hold_out,
            });
        }
        if inverted > 0 {
            warn!(
                "Crosswalk version {}: dropped {inverted} rows with lower bounds above upper bounds",
                self.crosswalk_version_id
            );
        }
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use polars::df;
    use polars::prelude::{NamedFrom, Series};

    use super::*;
    use crate::error::CascadeError;
    use crate::frame::str_column;

    pub(crate) fn raw() -> DataFrame {
        df!(
            COL::LOCATION_ID => &[70i64, 71, 72, 70],
            COL::SEX_ID => &[2i64, 2, 1, 2],
            COL::MEASURE_ID => &[5i64, 6, 11, 5],
            COL::AGE_START => &[0.0f64, 10.0, 20.0, 0.0],
            COL::AGE_END => &[1.0f64, 20.0, 30.0, 1.0],
            COL::YEAR_START => &[1990.0f64, 1995.0, 2000.0, 1990.0],
            COL::YEAR_END => &[1990.0f64, 1999.0, 2000.0, 1990.0],
            COL::MEAN => &[0.1f64, 0.02, 1.5, 0.9],
            COL::STANDARD_ERROR => &[0.01f64, 0.005, 0.2, 0.1],
            COL::IS_OUTLIER => &[0i64, 0, 0, 1],
        )
        .unwrap()
    }

    #[test]
    fn outliers_and_excluded_measures_are_dropped() -> anyhow::Result<()> {
        let crosswalk = CrosswalkVersion::new(17, true, raw());
        let df = crosswalk.configure_for_dismod(&[Integrand::Relrisk])?;
        assert_eq!(df.height(), 2);
        assert_eq!(
            str_column(&df, COL::MEASURE)?,
            vec![Some("prevalence".to_string()), Some("Sincidence".to_string())]
        );
        assert_eq!(required_f64(&df, COL::TIME_UPPER)?, vec![1991.0, 2000.0]);
        assert_eq!(i64_column(&df, COL::HOLD_OUT)?, vec![None, None]);
        Ok(())
    }

    #[test]
    fn outliers_are_kept_on_request() -> anyhow::Result<()> {
        let crosswalk = CrosswalkVersion::new(17, false, raw());
        assert_eq!(crosswalk.configure_for_dismod(&[])?.height(), 4);
        Ok(())
    }

    #[test]
    fn inverted_windows_are_dropped() -> anyhow::Result<()> {
        let mut raw = raw();
        raw.with_column(Series::new(COL::AGE_END, &[1.0f64, 5.0, 30.0, 1.0]))?;
        raw.with_column(Series::new(COL::YEAR_END, &[1990.0f64, 1999.0, 1999.0, 1990.0]))?;
        let crosswalk = CrosswalkVersion::new(17, false, raw);
        let df = crosswalk.configure_for_dismod(&[])?;
        assert_eq!(required_i64(&df, COL::LOCATION_ID)?, vec![70, 70]);
        Ok(())
    }

    #[test]
    fn unknown_measure_ids_are_errors() {
        let mut raw = raw();
        raw.with_column(Series::new(COL::MEASURE_ID, &[5i64, 6, 1, 5]))
            .unwrap();
        let crosswalk = CrosswalkVersion::new(17, true, raw);
        assert!(matches!(
            crosswalk.configure_for_dismod(&[]),
            Err(CascadeError::UnknownMeasureId(1))
        ));
    }
}
