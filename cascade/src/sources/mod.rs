//! Raw data sources and the adapters that normalise what they return.
//!
//! Retrieval is behind [`InputSource`]; every method hands back one raw tabular extract. The
//! typed wrappers ([`Asdr`], [`Csmr`], [`CrosswalkVersion`], [`CovariateData`], [`Population`],
//! [`LocationDag`]) own those extracts and turn them into rows the modelling engine can use.

use polars::prelude::DataFrame;

use crate::demographics::Demographics;

pub mod covariate;
pub mod crosswalk;
pub mod local;
pub mod locations;
pub mod mortality;
pub mod population;

pub use covariate::{CovariateData, CovariateRecord, CovariateSeries};
pub use crosswalk::CrosswalkVersion;
pub use local::LocalSource;
pub use locations::LocationDag;
pub use mortality::{Asdr, Csmr};
pub use population::{Population, PopulationRecord, PopulationWeights};

/// What every demographic source is asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRequest {
    pub demographics: Demographics,
    pub decomp_step: String,
    pub gbd_round_id: i64,
}

/// Retrieval of raw extracts. An empty frame signals absent data where the domain allows it;
/// an `Err` means the source itself could not be read.
#[allow(async_fn_in_trait)]
pub trait InputSource {
    /// All-cause mortality rates.
    async fn asdr(&self, request: &SourceRequest) -> anyhow::Result<DataFrame>;

    /// Cause-specific mortality rates for `cause_id`.
    async fn csmr(
        &self,
        request: &SourceRequest,
        cause_id: i64,
        process_version_id: Option<i64>,
    ) -> anyhow::Result<DataFrame>;

    async fn crosswalk_version(&self, crosswalk_version_id: i64) -> anyhow::Result<DataFrame>;

    async fn covariate(
        &self,
        request: &SourceRequest,
        covariate_id: i64,
    ) -> anyhow::Result<DataFrame>;

    async fn population(&self, request: &SourceRequest) -> anyhow::Result<DataFrame>;

    async fn location_hierarchy(&self, location_set_version_id: i64)
        -> anyhow::Result<DataFrame>;
}
