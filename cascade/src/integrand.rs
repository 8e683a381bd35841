//! Measures as the modelling engine names them (integrands), their GBD measure ids, the data
//! densities the engine understands, and the sex encodings.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{CascadeError, Result};

pub const MALE: i64 = 1;
pub const FEMALE: i64 = 2;
pub const BOTH_SEX: i64 = 3;

/// Sex as a study covariate in the model's native encoding.
pub fn sex_covariate(sex_id: i64) -> Result<f64> {
    match sex_id {
        MALE => Ok(0.5),
        FEMALE => Ok(-0.5),
        BOTH_SEX => Ok(0.0),
        other => Err(CascadeError::UnknownSex(other)),
    }
}

/// GBD measure id of incidence, reported alongside susceptible incidence on upload.
pub const INCIDENCE_MEASURE_ID: i64 = 6;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Integrand {
    Sincidence,
    #[strum(serialize = "remission")]
    #[serde(rename = "remission")]
    Remission,
    #[strum(serialize = "mtexcess")]
    #[serde(rename = "mtexcess")]
    Mtexcess,
    #[strum(serialize = "mtother")]
    #[serde(rename = "mtother")]
    Mtother,
    #[strum(serialize = "mtwith")]
    #[serde(rename = "mtwith")]
    Mtwith,
    #[strum(serialize = "susceptible")]
    #[serde(rename = "susceptible")]
    Susceptible,
    #[strum(serialize = "withC")]
    #[serde(rename = "withC")]
    WithC,
    #[strum(serialize = "prevalence")]
    #[serde(rename = "prevalence")]
    Prevalence,
    Tincidence,
    #[strum(serialize = "mtspecific")]
    #[serde(rename = "mtspecific")]
    Mtspecific,
    #[strum(serialize = "mtall")]
    #[serde(rename = "mtall")]
    Mtall,
    #[strum(serialize = "mtstandard")]
    #[serde(rename = "mtstandard")]
    Mtstandard,
    #[strum(serialize = "relrisk")]
    #[serde(rename = "relrisk")]
    Relrisk,
}

impl Integrand {
    /// Maps a GBD measure id onto the integrand it is modelled as. GBD incidence (6) is
    /// modelled as susceptible incidence.
    pub fn from_measure_id(measure_id: i64) -> Result<Self> {
        let integrand = match measure_id {
            5 => Integrand::Prevalence,
            6 | 41 => Integrand::Sincidence,
            7 => Integrand::Remission,
            9 => Integrand::Mtexcess,
            11 => Integrand::Relrisk,
            12 => Integrand::Mtstandard,
            13 => Integrand::Mtwith,
            14 => Integrand::Mtall,
            15 => Integrand::Mtspecific,
            16 => Integrand::Mtother,
            39 => Integrand::Susceptible,
            40 => Integrand::WithC,
            42 => Integrand::Tincidence,
            other => return Err(CascadeError::UnknownMeasureId(other)),
        };
        Ok(integrand)
    }

    /// The GBD measure id results for this integrand are uploaded under.
    pub fn measure_id(self) -> i64 {
        match self {
            Integrand::Prevalence => 5,
            Integrand::Remission => 7,
            Integrand::Mtexcess => 9,
            Integrand::Relrisk => 11,
            Integrand::Mtstandard => 12,
            Integrand::Mtwith => 13,
            Integrand::Mtall => 14,
            Integrand::Mtspecific => 15,
            Integrand::Mtother => 16,
            Integrand::Susceptible => 39,
            Integrand::WithC => 40,
            Integrand::Sincidence => 41,
            Integrand::Tincidence => 42,
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| CascadeError::UnknownMeasure(name.to_string()))
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Likelihood densities for data and priors.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Density {
    Uniform,
    #[default]
    Gaussian,
    Laplace,
    Students,
    LogGaussian,
    LogLaplace,
    LogStudents,
}

impl Density {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_integrand_round_trips_through_its_measure_id() -> anyhow::Result<()> {
        for integrand in Integrand::iter() {
            assert_eq!(Integrand::from_measure_id(integrand.measure_id())?, integrand);
        }
        Ok(())
    }

    #[test]
    fn incidence_is_modelled_as_susceptible_incidence() -> anyhow::Result<()> {
        assert_eq!(
            Integrand::from_measure_id(INCIDENCE_MEASURE_ID)?,
            Integrand::Sincidence
        );
        assert!(Integrand::from_measure_id(1).is_err());
        Ok(())
    }

    #[test]
    fn names_match_the_engine() -> anyhow::Result<()> {
        assert_eq!(Integrand::WithC.to_string(), "withC");
        assert_eq!(Integrand::parse("mtall")?, Integrand::Mtall);
        assert!(matches!(
            Integrand::parse("incidence"),
            Err(CascadeError::UnknownMeasure(_))
        ));
        assert_eq!(Density::LogStudents.as_str(), "log_students");
        assert_eq!("log_gaussian".parse::<Density>()?, Density::LogGaussian);
        Ok(())
    }

    #[test]
    fn sex_encoding() -> anyhow::Result<()> {
        assert_eq!(sex_covariate(MALE)?, 0.5);
        assert_eq!(sex_covariate(FEMALE)?, -0.5);
        assert_eq!(sex_covariate(BOTH_SEX)?, 0.0);
        assert!(sex_covariate(4).is_err());
        Ok(())
    }
}
