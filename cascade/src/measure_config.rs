//! Per-measure statistical configuration for data likelihoods.
//!
//! Each lookup is a total function over [`Integrand`]: an explicit per-integrand value wins, then
//! the global value from the settings, then the built-in default (NaN eta, gaussian density, NaN
//! nu). No lookup can fail.

use std::collections::BTreeMap;

use log::debug;

use crate::error::Result;
use crate::integrand::{Density, Integrand};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureConfig {
    eta_default: f64,
    eta_by_integrand: BTreeMap<Integrand, f64>,
    density_default: Density,
    density_by_integrand: BTreeMap<Integrand, Density>,
    students_dof: f64,
    log_students_dof: f64,
    measures_to_exclude: Vec<Integrand>,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            eta_default: f64::NAN,
            eta_by_integrand: BTreeMap::new(),
            density_default: Density::Gaussian,
            density_by_integrand: BTreeMap::new(),
            students_dof: f64::NAN,
            log_students_dof: f64::NAN,
            measures_to_exclude: vec![],
        }
    }
}

impl MeasureConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut config = Self::default();

        // A zero global eta means unset.
        if let Some(eta) = settings.eta.data.filter(|eta| *eta != 0.0) {
            config.eta_default = eta;
        }
        for set_eta in &settings.data_eta_by_integrand {
            let integrand = Integrand::from_measure_id(set_eta.integrand_measure_id)?;
            config.eta_by_integrand.insert(integrand, set_eta.value);
        }

        if let Some(density) = settings.model.data_density {
            config.density_default = density;
        }
        for set_density in &settings.data_density_by_integrand {
            let integrand = Integrand::from_measure_id(set_density.integrand_measure_id)?;
            config.density_by_integrand.insert(integrand, set_density.value);
        }

        config.students_dof = settings.students_dof.data.unwrap_or(f64::NAN);
        config.log_students_dof = settings.log_students_dof.data.unwrap_or(f64::NAN);

        // Measure ids the engine has no integrand for cannot have data to exclude.
        config.measures_to_exclude = settings
            .model
            .exclude_data_for_param
            .iter()
            .filter_map(|&measure_id| Integrand::from_measure_id(measure_id).ok())
            .collect();
        if settings.policies.exclude_relative_risk
            && !config.measures_to_exclude.contains(&Integrand::Relrisk)
        {
            config.measures_to_exclude.push(Integrand::Relrisk);
        }

        debug!("measure config: {config:?}");
        Ok(config)
    }

    pub fn eta(&self, integrand: Integrand) -> f64 {
        match self.eta_by_integrand.get(&integrand) {
            Some(eta) => *eta,
            None => self.eta_default,
        }
    }

    pub fn density(&self, integrand: Integrand) -> Density {
        match self.density_by_integrand.get(&integrand) {
            Some(density) => *density,
            None => self.density_default,
        }
    }

    /// Degrees of freedom for the measure's density; NaN unless that density is a Student's-t.
    ///
    /// The degrees of freedom follow the density, not the measure name: with a global
    /// `students` density every measure gets `students_dof`, where a lookup keyed by measure
    /// name would leave them all NaN.
    pub fn nu(&self, integrand: Integrand) -> f64 {
        match self.density(integrand) {
            Density::Students => self.students_dof,
            Density::LogStudents => self.log_students_dof,
            _ => f64::NAN,
        }
    }

    pub fn measures_to_exclude(&self) -> &[Integrand] {
        &self.measures_to_exclude
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::settings::tests::MINIMAL;

    #[test]
    fn lookups_are_total_with_documented_defaults() -> anyhow::Result<()> {
        let settings = Settings::from_json_str(MINIMAL)?;
        let config = MeasureConfig::from_settings(&settings)?;
        for integrand in Integrand::iter() {
            assert!(config.eta(integrand).is_nan());
            assert_eq!(config.density(integrand), Density::Gaussian);
            assert!(config.nu(integrand).is_nan());
        }
        assert_eq!(config.measures_to_exclude(), &[Integrand::Relrisk]);
        Ok(())
    }

    #[test]
    fn per_integrand_values_override_global_values() -> anyhow::Result<()> {
        let settings = Settings::from_json_str(
            r#"{
                "gbd_round_id": 6,
                "model": {"model_version_id": 1, "decomp_step_id": 4, "crosswalk_version_id": 17,
                          "data_density": "log_gaussian", "exclude_data_for_param": [9, 2]},
                "policies": {"exclude_relative_risk": false},
                "eta": {"data": 1e-5},
                "data_eta_by_integrand": [{"integrand_measure_id": 5, "value": 1e-4}],
                "data_density_by_integrand": [{"integrand_measure_id": 5, "value": "log_students"}],
                "log_students_dof": {"data": 5.0}
            }"#,
        )?;
        let config = MeasureConfig::from_settings(&settings)?;
        assert_eq!(config.eta(Integrand::Prevalence), 1e-4);
        assert_eq!(config.eta(Integrand::Mtall), 1e-5);
        assert_eq!(config.density(Integrand::Prevalence), Density::LogStudents);
        assert_eq!(config.density(Integrand::Mtall), Density::LogGaussian);
        assert_eq!(config.nu(Integrand::Prevalence), 5.0);
        assert!(config.nu(Integrand::Mtall).is_nan());
        assert_eq!(config.measures_to_exclude(), &[Integrand::Mtexcess]);
        Ok(())
    }

    #[test]
    fn zero_global_eta_is_unset() -> anyhow::Result<()> {
        let settings = Settings::from_json_str(
            r#"{
                "gbd_round_id": 6,
                "model": {"model_version_id": 1, "decomp_step_id": 4, "crosswalk_version_id": 17,
                          "data_density": "students"},
                "eta": {"data": 0.0},
                "students_dof": {"data": 5.0}
            }"#,
        )?;
        let config = MeasureConfig::from_settings(&settings)?;
        assert!(config.eta(Integrand::Prevalence).is_nan());
        assert_eq!(config.nu(Integrand::Prevalence), 5.0);
        assert_eq!(config.nu(Integrand::Mtall), 5.0);
        Ok(())
    }
}
