//! Assembly of the measurement inputs for one model run.
//!
//! [`MeasurementInputs`] moves through three states. Raw extracts are fetched concurrently by
//! [`MeasurementInputs::get_raw_inputs`], then [`MeasurementInputs::configure_inputs_for_dismod`]
//! normalises them into one observation table with likelihood parameters and interpolated
//! covariates attached. Calling an operation out of order is an error, never a silent no-op.

use std::future::Future;

use futures::future::join_all;
use itertools::{Itertools, MinMaxResult};
use log::{debug, info, warn};
use polars::prelude::*;
use tokio::try_join;

use crate::column_names as COL;
use crate::config::Config;
use crate::demographics::{decomp_step_from_id, Demographics, MAX_AGE};
use crate::error::{CascadeError, Result};
use crate::frame::{required_f64, required_i64, str_column};
use crate::integrand::{sex_covariate, Integrand, BOTH_SEX};
use crate::interpolation::{
    get_interpolated_covariate_values, interpolate_covariate, TargetWindow, NO_OVERLAP_VALUE,
};
use crate::measure_config::MeasureConfig;
use crate::settings::{CovariateKind, CovariateSpec, Settings};
use crate::sources::{
    Asdr, CovariateData, CovariateSeries, CrosswalkVersion, Csmr, InputSource, LocationDag,
    Population, PopulationWeights, SourceRequest,
};

/// Identifies what to pull for one model run.
#[derive(Debug, Clone, PartialEq)]
pub struct InputsParams {
    pub model_version_id: i64,
    pub gbd_round_id: i64,
    pub decomp_step_id: i64,
    pub crosswalk_version_id: i64,
    pub csmr_cause_id: Option<i64>,
    pub csmr_process_version_id: Option<i64>,
    /// Defaults to the round's best hierarchy when `None`.
    pub location_set_version_id: Option<i64>,
    pub country_covariate_ids: Vec<i64>,
    pub exclude_outliers: bool,
}

impl InputsParams {
    pub fn from_settings(settings: &Settings, config: &Config) -> Self {
        Self {
            model_version_id: settings.model.model_version_id,
            gbd_round_id: settings.gbd_round_id,
            decomp_step_id: settings.model.decomp_step_id,
            crosswalk_version_id: settings.model.crosswalk_version_id,
            csmr_cause_id: settings.model.add_csmr_cause,
            csmr_process_version_id: settings.model.csmr_process_version_id,
            location_set_version_id: settings.location_set_version_id,
            country_covariate_ids: settings.country_covariate_ids(),
            exclude_outliers: config.exclude_outliers,
        }
    }
}

/// Raw extracts, each in its own slot.
#[derive(Debug, Clone)]
struct RawInputs {
    asdr: Asdr,
    csmr: Csmr,
    crosswalk_version: CrosswalkVersion,
    covariates: Vec<CovariateData>,
    population: Population,
    location_dag: LocationDag,
}

#[derive(Debug, Clone)]
struct ConfiguredInputs {
    assembled: AssembledData,
    measure_config: MeasureConfig,
    covariates: Vec<CovariateSeries>,
    population: PopulationWeights,
}

#[derive(Debug, Clone)]
enum InputsState {
    Uninitialized,
    Raw(RawInputs),
    Configured {
        raw: RawInputs,
        configured: ConfiguredInputs,
    },
}

impl InputsState {
    fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Raw(_) => "raw",
            Self::Configured { .. } => "configured",
        }
    }
}

/// The observation table handed to the modelling engine. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct AssembledData {
    df: DataFrame,
    covariate_specs: Vec<CovariateSpec>,
}

impl AssembledData {
    pub fn df(&self) -> &DataFrame {
        &self.df
    }

    pub fn covariate_specs(&self) -> &[CovariateSpec] {
        &self.covariate_specs
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn into_df(self) -> DataFrame {
        self.df
    }
}

/// Centre and spread of one covariate around a parent location, used to bound its prior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovariateReference {
    pub covariate_id: i64,
    pub reference: f64,
    pub max_difference: f64,
}

impl CovariateReference {
    pub fn to_df(references: &[Self]) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            Series::new(
                COL::REAL_COVARIATE_ID,
                references.iter().map(|r| r.covariate_id).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::REFERENCE,
                references.iter().map(|r| r.reference).collect::<Vec<_>>(),
            ),
            Series::new(
                COL::MAX_DIFFERENCE,
                references.iter().map(|r| r.max_difference).collect::<Vec<_>>(),
            ),
        ])?)
    }
}

pub struct MeasurementInputs<S: InputSource> {
    pub params: InputsParams,
    pub decomp_step: String,
    pub location_set_version_id: i64,
    demographics: Demographics,
    source: S,
    state: InputsState,
}

impl<S: InputSource> MeasurementInputs<S> {
    pub fn new(params: InputsParams, source: S) -> Result<Self> {
        let demographics = Demographics::for_round(params.gbd_round_id)?;
        let decomp_step = decomp_step_from_id(params.decomp_step_id)?;
        let location_set_version_id = params
            .location_set_version_id
            .unwrap_or(demographics.location_set_version_id);
        debug!("params: {params:?}");
        Ok(Self {
            params,
            decomp_step,
            location_set_version_id,
            demographics,
            source,
            state: InputsState::Uninitialized,
        })
    }

    pub fn from_settings(settings: &Settings, config: &Config, source: S) -> Result<Self> {
        Self::new(InputsParams::from_settings(settings, config), source)
    }

    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Name of the current state: `uninitialized`, `raw` or `configured`.
    pub fn state(&self) -> &'static str {
        self.state.name()
    }

    fn request(&self) -> SourceRequest {
        SourceRequest {
            demographics: self.demographics.clone(),
            decomp_step: self.decomp_step.clone(),
            gbd_round_id: self.params.gbd_round_id,
        }
    }

    /// Fetches every raw extract concurrently. Nothing is kept unless every fetch succeeds.
    pub async fn get_raw_inputs(&mut self) -> Result<()> {
        info!(
            "Getting raw inputs for model version {}",
            self.params.model_version_id
        );
        let request = &self.request();
        let params = &self.params;
        let source = &self.source;

        let csmr = async {
            match params.csmr_cause_id {
                Some(cause_id) => fetch(
                    "csmr",
                    source.csmr(request, cause_id, params.csmr_process_version_id),
                )
                .await
                .map(|raw| Csmr::new(cause_id, raw)),
                None => {
                    info!("No CSMR cause configured, skipping CSMR");
                    Ok(Csmr::empty())
                }
            }
        };
        let covariates = async {
            join_all(params.country_covariate_ids.iter().map(|&covariate_id| async move {
                fetch(
                    format!("covariate {covariate_id}"),
                    source.covariate(request, covariate_id),
                )
                .await
                .map(|raw| CovariateData::new(covariate_id, raw))
            }))
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()
        };

        let (asdr, csmr, crosswalk, covariates, population, hierarchy) = try_join!(
            fetch("asdr", source.asdr(request)),
            csmr,
            fetch(
                "crosswalk version",
                source.crosswalk_version(params.crosswalk_version_id)
            ),
            covariates,
            fetch("population", source.population(request)),
            fetch(
                "location hierarchy",
                source.location_hierarchy(self.location_set_version_id)
            ),
        )?;
        let location_dag = LocationDag::from_df(self.location_set_version_id, &hierarchy)?;

        self.state = InputsState::Raw(RawInputs {
            asdr: Asdr::new(asdr),
            csmr,
            crosswalk_version: CrosswalkVersion::new(
                self.params.crosswalk_version_id,
                self.params.exclude_outliers,
                crosswalk,
            ),
            covariates,
            population: Population::new(population),
            location_dag,
        });
        info!("Raw inputs ready");
        Ok(())
    }

    fn raw(&self, operation: &'static str) -> Result<&RawInputs> {
        match &self.state {
            InputsState::Raw(raw) | InputsState::Configured { raw, .. } => Ok(raw),
            state @ InputsState::Uninitialized => Err(CascadeError::InputsNotReady {
                operation,
                state: state.name(),
            }),
        }
    }

    fn configured(&self, operation: &'static str) -> Result<(&RawInputs, &ConfiguredInputs)> {
        match &self.state {
            InputsState::Configured { raw, configured } => Ok((raw, configured)),
            state => Err(CascadeError::InputsNotReady {
                operation,
                state: state.name(),
            }),
        }
    }

    /// Builds the assembled dataset from the raw extracts. May be called again with different
    /// settings; the raw extracts are reused.
    pub fn configure_inputs_for_dismod(&mut self, settings: &Settings) -> Result<&AssembledData> {
        let raw = self.raw("configure inputs for dismod")?;
        let configured = configure(raw, settings, &self.demographics)?;
        let raw = raw.clone();
        self.state = InputsState::Configured { raw, configured };
        self.assembled()
    }

    pub fn location_dag(&self) -> Result<&LocationDag> {
        Ok(&self.raw("read the location hierarchy")?.location_dag)
    }

    pub fn assembled(&self) -> Result<&AssembledData> {
        Ok(&self.configured("read the assembled data")?.1.assembled)
    }

    pub fn measure_config(&self) -> Result<&MeasureConfig> {
        Ok(&self.configured("read the measure configuration")?.1.measure_config)
    }

    /// The normalised series for a covariate, if it was requested.
    pub fn covariate_series(&self, covariate_id: i64) -> Result<Option<&CovariateSeries>> {
        Ok(self
            .configured("read covariate series")?
            .1
            .covariates
            .iter()
            .find(|series| series.covariate_id == covariate_id))
    }

    pub fn population(&self) -> Result<&PopulationWeights> {
        Ok(&self.configured("read population weights")?.1.population)
    }

    /// For each requested country covariate: its value at `parent_location_id` over the whole
    /// age/time range of the assembled data, and the largest deviation from it among the parent
    /// and its children. Covariates with no estimates there get 0.0 for both.
    pub fn get_covariate_reference_max_diff(
        &self,
        parent_location_id: i64,
    ) -> Result<Vec<CovariateReference>> {
        let (raw, configured) = self.configured("compute covariate references")?;
        let mut locations = vec![parent_location_id];
        locations.extend(raw.location_dag.successors(parent_location_id));

        let target = self.reference_window(parent_location_id, configured.assembled.df())?;
        let population = configured.population.restrict_to_location(parent_location_id);

        let references = self
            .params
            .country_covariate_ids
            .iter()
            .map(|&covariate_id| {
                let series = configured
                    .covariates
                    .iter()
                    .find(|series| series.covariate_id == covariate_id)
                    .map(|series| series.restrict_to_locations(&locations))
                    .unwrap_or_else(|| CovariateSeries::new(covariate_id, vec![]));
                if series.is_empty() {
                    warn!(
                        "Covariate {covariate_id} has no estimates for location \
                         {parent_location_id} or its children; reference set to 0.0"
                    );
                    return CovariateReference {
                        covariate_id,
                        reference: 0.0,
                        max_difference: 0.0,
                    };
                }
                let reference = interpolate_covariate(&[target], &series, &population)
                    .first()
                    .copied()
                    .unwrap_or(NO_OVERLAP_VALUE);
                let max_difference = series
                    .records()
                    .iter()
                    .map(|record| (record.mean_value - reference).abs())
                    .fold(0.0, f64::max);
                CovariateReference {
                    covariate_id,
                    reference,
                    max_difference,
                }
            })
            .collect();
        Ok(references)
    }

    /// Both sexes at `location_id`, over the age and time span of `data`. With no data the span
    /// is every age over the round's years.
    fn reference_window(&self, location_id: i64, data: &DataFrame) -> Result<TargetWindow> {
        let (age_lower, age_upper) = span(
            required_f64(data, COL::AGE_LOWER)?,
            required_f64(data, COL::AGE_UPPER)?,
        )
        .unwrap_or((0.0, MAX_AGE));
        let years = self.demographics.year_ids.iter().copied().minmax();
        let round_span = match years {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(year) => Some((year as f64, year as f64 + 1.0)),
            MinMaxResult::MinMax(first, last) => Some((first as f64, last as f64 + 1.0)),
        };
        let (time_lower, time_upper) = span(
            required_f64(data, COL::TIME_LOWER)?,
            required_f64(data, COL::TIME_UPPER)?,
        )
        .or(round_span)
        .unwrap_or((0.0, 0.0));
        Ok(TargetWindow {
            location_id,
            sex_id: BOTH_SEX,
            age_lower,
            age_upper,
            time_lower,
            time_upper,
        })
    }
}

/// Runs one fetch, naming the source if it fails.
async fn fetch<T>(
    source_name: impl Into<String>,
    future: impl Future<Output = anyhow::Result<T>>,
) -> Result<T> {
    let source_name = source_name.into();
    debug!("Fetching {source_name}");
    future
        .await
        .map_err(|e| CascadeError::source_unavailable(source_name, e))
}

/// Smallest of `lowers` and largest of `uppers`.
fn span(lowers: Vec<f64>, uppers: Vec<f64>) -> Option<(f64, f64)> {
    let lower = lowers.into_iter().reduce(f64::min)?;
    let upper = uppers.into_iter().reduce(f64::max)?;
    Some((lower, upper))
}

fn configure(
    raw: &RawInputs,
    settings: &Settings,
    demographics: &Demographics,
) -> Result<ConfiguredInputs> {
    let measure_config = MeasureConfig::from_settings(settings)?;
    let age_groups = &demographics.age_groups;

    let frames = [
        raw.crosswalk_version
            .configure_for_dismod(measure_config.measures_to_exclude())?,
        raw.asdr.configure_for_dismod(age_groups)?,
        raw.csmr.configure_for_dismod(age_groups)?,
    ];
    let mut data = concat(
        frames.into_iter().map(|df| df.lazy()).collect::<Vec<_>>(),
        UnionArgs::default(),
    )?
    .collect()?;
    info!("Concatenated observations with shape: {:?}", data.shape());

    add_likelihood_columns(&mut data, &measure_config)?;

    let population = raw.population.weights(age_groups)?;
    let covariates = raw
        .covariates
        .iter()
        .map(|covariate| covariate.configure_for_dismod(age_groups))
        .collect::<Result<Vec<_>>>()?;
    let covariate_specs = settings.covariate_specs();
    for spec in covariate_specs
        .iter()
        .filter(|spec| spec.kind == CovariateKind::Country)
    {
        let unfetched;
        let series = match covariates
            .iter()
            .find(|series| series.covariate_id == spec.covariate_id)
        {
            Some(series) => series,
            None => {
                warn!(
                    "Covariate {} was not fetched; interpolating from no estimates",
                    spec.covariate_id
                );
                unfetched = CovariateSeries::new(spec.covariate_id, vec![]);
                &unfetched
            }
        };
        let values = get_interpolated_covariate_values(&data, series, &population, &spec.name)?;
        data.with_column(values)?;
    }

    let mut data = data.drop(COL::AGE_GROUP_ID)?;
    let s_sex = required_i64(&data, COL::SEX_ID)?
        .into_iter()
        .map(sex_covariate)
        .collect::<Result<Vec<f64>>>()?;
    data.with_column(Series::new(COL::S_SEX, s_sex))?;
    data.with_column(Series::new(COL::S_ONE, vec![1.0f64; data.height()]))?;
    let hold_out = data
        .column(COL::HOLD_OUT)?
        .fill_null(FillNullStrategy::Zero)?;
    data.with_column(hold_out)?;

    info!("Assembled data with shape: {:?}", data.shape());
    Ok(ConfiguredInputs {
        assembled: AssembledData {
            df: data,
            covariate_specs,
        },
        measure_config,
        covariates,
        population,
    })
}

/// Attaches density, eta and nu for each row's measure.
fn add_likelihood_columns(data: &mut DataFrame, measure_config: &MeasureConfig) -> Result<()> {
    let integrands = str_column(data, COL::MEASURE)?
        .into_iter()
        .map(|measure| Integrand::parse(measure.as_deref().unwrap_or_default()))
        .collect::<Result<Vec<_>>>()?;
    let densities: Vec<&str> = integrands
        .iter()
        .map(|&integrand| measure_config.density(integrand).as_str())
        .collect();
    let etas: Vec<f64> = integrands
        .iter()
        .map(|&integrand| measure_config.eta(integrand))
        .collect();
    let nus: Vec<f64> = integrands
        .iter()
        .map(|&integrand| measure_config.nu(integrand))
        .collect();
    data.with_column(Series::new(COL::DENSITY, densities))?;
    data.with_column(Series::new(COL::ETA, etas))?;
    data.with_column(Series::new(COL::NU, nus))?;
    Ok(())
}
