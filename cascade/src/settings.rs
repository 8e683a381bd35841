//! Model settings, as saved with a model version. Every optional field resolves to its documented
//! default when the settings are deserialised, so nothing downstream has to ask whether a field
//! was set.

use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::column_names as COL;
use crate::error::Result;
use crate::integrand::Density;

/// Study covariate id of the sex covariate.
pub const SEX_STUDY_COVARIATE_ID: i64 = 0;
/// Study covariate id of the constant (bias) covariate.
pub const ONE_STUDY_COVARIATE_ID: i64 = 1604;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Settings {
    pub gbd_round_id: i64,
    /// Resolved from the round when absent.
    #[serde(default)]
    pub location_set_version_id: Option<i64>,
    pub model: ModelSettings,
    #[serde(default)]
    pub policies: Policies,
    #[serde(default)]
    pub eta: EtaSettings,
    #[serde(default)]
    pub data_eta_by_integrand: Vec<IntegrandValue<f64>>,
    #[serde(default)]
    pub data_density_by_integrand: Vec<IntegrandValue<Density>>,
    #[serde(default)]
    pub students_dof: DofSettings,
    #[serde(default)]
    pub log_students_dof: DofSettings,
    #[serde(default)]
    pub country_covariate: Vec<CountryCovariateSettings>,
    #[serde(default)]
    pub study_covariate: Vec<StudyCovariateSettings>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model_version_id: i64,
    pub decomp_step_id: i64,
    pub crosswalk_version_id: i64,
    /// Cause to pull cause-specific mortality for; none skips CSMR.
    #[serde(default)]
    pub add_csmr_cause: Option<i64>,
    #[serde(default)]
    pub csmr_process_version_id: Option<i64>,
    /// GBD measure ids whose data are dropped.
    #[serde(default)]
    pub exclude_data_for_param: Vec<i64>,
    /// Density for every measure without a per-integrand density.
    #[serde(default)]
    pub data_density: Option<Density>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Policies {
    pub exclude_relative_risk: bool,
}

impl Default for Policies {
    fn default() -> Self {
        Self {
            exclude_relative_risk: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EtaSettings {
    /// Eta for every measure without a per-integrand eta.
    pub data: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DofSettings {
    pub data: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IntegrandValue<T> {
    pub integrand_measure_id: i64,
    pub value: T,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CountryCovariateSettings {
    pub country_covariate_id: i64,
    #[serde(default)]
    pub measure_id: Option<i64>,
    #[serde(default)]
    pub mulcov_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StudyCovariateSettings {
    pub study_covariate_id: i64,
    #[serde(default)]
    pub measure_id: Option<i64>,
    #[serde(default)]
    pub mulcov_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CovariateKind {
    Study,
    Country,
}

/// A covariate the model uses, and the column its values land in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CovariateSpec {
    pub covariate_id: i64,
    pub name: String,
    pub kind: CovariateKind,
}

impl Settings {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Country covariate ids to pull, in settings order, without repeats.
    pub fn country_covariate_ids(&self) -> Vec<i64> {
        self.country_covariate
            .iter()
            .map(|c| c.country_covariate_id)
            .unique()
            .collect()
    }

    /// One spec per distinct covariate; a covariate used by several multipliers appears once.
    pub fn covariate_specs(&self) -> Vec<CovariateSpec> {
        let study = self
            .study_covariate
            .iter()
            .unique_by(|c| c.study_covariate_id)
            .map(|c| CovariateSpec {
                covariate_id: c.study_covariate_id,
                name: c
                    .name
                    .clone()
                    .unwrap_or_else(|| study_covariate_name(c.study_covariate_id)),
                kind: CovariateKind::Study,
            });
        let country = self
            .country_covariate
            .iter()
            .unique_by(|c| c.country_covariate_id)
            .map(|c| CovariateSpec {
                covariate_id: c.country_covariate_id,
                name: c
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("c_covariate_{}", c.country_covariate_id)),
                kind: CovariateKind::Country,
            });
        study.chain(country).collect()
    }
}

fn study_covariate_name(study_covariate_id: i64) -> String {
    match study_covariate_id {
        SEX_STUDY_COVARIATE_ID => COL::S_SEX.to_string(),
        ONE_STUDY_COVARIATE_ID => COL::S_ONE.to_string(),
        other => format!("s_covariate_{other}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MINIMAL: &str = r#"{
        "gbd_round_id": 6,
        "model": {
            "model_version_id": 472515,
            "decomp_step_id": 4,
            "crosswalk_version_id": 17
        }
    }"#;

    #[test]
    fn unset_fields_resolve_to_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_json_str(MINIMAL)?;
        assert_eq!(settings.location_set_version_id, None);
        assert_eq!(settings.model.add_csmr_cause, None);
        assert!(settings.model.exclude_data_for_param.is_empty());
        assert!(settings.policies.exclude_relative_risk);
        assert_eq!(settings.eta.data, None);
        assert_eq!(settings.students_dof.data, None);
        assert!(settings.covariate_specs().is_empty());
        Ok(())
    }

    #[test]
    fn covariate_specs_are_named_and_deduplicated() -> anyhow::Result<()> {
        let settings = Settings::from_json_str(
            r#"{
                "gbd_round_id": 6,
                "model": {"model_version_id": 1, "decomp_step_id": 4, "crosswalk_version_id": 17},
                "country_covariate": [
                    {"country_covariate_id": 28, "measure_id": 5},
                    {"country_covariate_id": 28, "measure_id": 9},
                    {"country_covariate_id": 57, "name": "c_ldi"}
                ],
                "study_covariate": [{"study_covariate_id": 0}]
            }"#,
        )?;
        assert_eq!(settings.country_covariate_ids(), vec![28, 57]);
        let specs = settings.covariate_specs();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].name, "s_sex");
        assert_eq!(specs[0].kind, CovariateKind::Study);
        assert_eq!(specs[1].name, "c_covariate_28");
        assert_eq!(specs[2].name, "c_ldi");
        assert_eq!(specs[2].kind, CovariateKind::Country);
        Ok(())
    }

    #[test]
    fn densities_deserialise_by_name() -> anyhow::Result<()> {
        let settings = Settings::from_json_str(
            r#"{
                "gbd_round_id": 6,
                "model": {"model_version_id": 1, "decomp_step_id": 4, "crosswalk_version_id": 17,
                          "data_density": "log_gaussian"},
                "data_density_by_integrand": [{"integrand_measure_id": 5, "value": "students"}]
            }"#,
        )?;
        assert_eq!(settings.model.data_density, Some(Density::LogGaussian));
        assert_eq!(settings.data_density_by_integrand[0].value, Density::Students);
        Ok(())
    }
}
