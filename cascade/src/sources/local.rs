use std::path::PathBuf;

use anyhow::anyhow;
use log::info;
use polars::prelude::*;

use crate::column_names as COL;
use crate::config::Config;
use crate::integrand::BOTH_SEX;
use crate::sources::{InputSource, SourceRequest};

/// This module contains the names of the files that hold each extract, relative to the
/// configured base path.
pub mod paths {
    pub const ASDR: &str = "asdr.parquet";
    pub const POPULATION: &str = "population.parquet";
    pub const COVARIATES: &str = "covariates";
    pub const LOCATION_HIERARCHIES: &str = "location_hierarchies";

    pub fn csmr(cause_id: i64, process_version_id: Option<i64>) -> String {
        match process_version_id {
            Some(version) => format!("csmr_{cause_id}_{version}.parquet"),
            None => format!("csmr_{cause_id}.parquet"),
        }
    }

    pub fn crosswalk_version(crosswalk_version_id: i64) -> String {
        format!("crosswalk_version_{crosswalk_version_id}.parquet")
    }

    pub fn covariate(covariate_id: i64) -> String {
        format!("{COVARIATES}/{covariate_id}.parquet")
    }

    pub fn location_hierarchy(location_set_version_id: i64) -> String {
        format!("{LOCATION_HIERARCHIES}/{location_set_version_id}.parquet")
    }
}
use paths as PATHS;

/// Reads parquet extracts from `Config::base_path`, keeping only the requested demographics.
#[derive(Debug, Clone, Default)]
pub struct LocalSource {
    config: Config,
}

type IdFilter = (&'static str, Vec<i64>);

impl LocalSource {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn full_path(&self, path: &str) -> PathBuf {
        PathBuf::from(&self.config.base_path).join(path)
    }

    /// Performs a load of a given parquet file, filtering integer id columns.
    async fn load(&self, path: &str, filters: Vec<IdFilter>) -> anyhow::Result<DataFrame> {
        let full_path = self.full_path(path);
        info!("Attempting to load dataframe from {}", full_path.display());
        tokio::task::spawn_blocking(move || -> anyhow::Result<DataFrame> {
            let mut df = LazyFrame::scan_parquet(&full_path, ScanArgsParquet::default())?;
            for (column, ids) in filters {
                let ids = Series::new("ids", ids);
                df = df.filter(col(column).cast(DataType::Int64).is_in(lit(ids)));
            }
            df.collect()
                .map_err(|e| anyhow!("Failed to load '{}': {e}", full_path.display()))
        })
        .await?
    }

    fn mortality_filters(request: &SourceRequest) -> Vec<IdFilter> {
        let demographics = &request.demographics;
        vec![
            (COL::AGE_GROUP_ID, demographics.age_group_ids.clone()),
            (COL::YEAR_ID, demographics.year_ids.clone()),
            (COL::SEX_ID, demographics.sex_ids.clone()),
        ]
    }
}

impl InputSource for LocalSource {
    async fn asdr(&self, request: &SourceRequest) -> anyhow::Result<DataFrame> {
        self.load(PATHS::ASDR, Self::mortality_filters(request)).await
    }

    async fn csmr(
        &self,
        request: &SourceRequest,
        cause_id: i64,
        process_version_id: Option<i64>,
    ) -> anyhow::Result<DataFrame> {
        self.load(
            &PATHS::csmr(cause_id, process_version_id),
            Self::mortality_filters(request),
        )
        .await
    }

    async fn crosswalk_version(&self, crosswalk_version_id: i64) -> anyhow::Result<DataFrame> {
        self.load(&PATHS::crosswalk_version(crosswalk_version_id), vec![])
            .await
    }

    /// Covariates are read for every year so data between estimation years can be matched.
    async fn covariate(
        &self,
        _request: &SourceRequest,
        covariate_id: i64,
    ) -> anyhow::Result<DataFrame> {
        self.load(&PATHS::covariate(covariate_id), vec![]).await
    }

    /// Population for every year, on the round's age grid, for both sexes and their sum.
    async fn population(&self, request: &SourceRequest) -> anyhow::Result<DataFrame> {
        let mut sex_ids = request.demographics.sex_ids.clone();
        sex_ids.push(BOTH_SEX);
        let filters = vec![
            (COL::AGE_GROUP_ID, request.demographics.age_group_ids.clone()),
            (COL::SEX_ID, sex_ids),
        ];
        self.load(PATHS::POPULATION, filters).await
    }

    async fn location_hierarchy(
        &self,
        location_set_version_id: i64,
    ) -> anyhow::Result<DataFrame> {
        self.load(&PATHS::location_hierarchy(location_set_version_id), vec![])
            .await
    }
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;
    use crate::demographics::{decomp_step_from_id, Demographics};

    fn request() -> anyhow::Result<SourceRequest> {
        Ok(SourceRequest {
            demographics: Demographics::for_round(6)?,
            decomp_step: decomp_step_from_id(4)?,
            gbd_round_id: 6,
        })
    }

    fn write_parquet(path: &std::path::Path, df: &mut DataFrame) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        ParquetWriter::new(file).finish(df)?;
        Ok(())
    }

    #[tokio::test]
    async fn asdr_is_filtered_to_the_demographics() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut asdr = df!(
            COL::LOCATION_ID => &[70i64, 70, 70],
            COL::YEAR_ID => &[1990i64, 1991, 1990],
            COL::AGE_GROUP_ID => &[2i32, 2, 22],
            COL::SEX_ID => &[2i64, 2, 2],
            COL::MEAN => &[0.1f64, 0.1, 0.1],
            COL::UPPER => &[0.2f64, 0.2, 0.2],
            COL::LOWER => &[0.0f64, 0.0, 0.0],
        )?;
        write_parquet(&dir.path().join(PATHS::ASDR), &mut asdr)?;

        let source = LocalSource::new(Config {
            base_path: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        });
        let loaded = source.asdr(&request()?).await?;
        assert_eq!(loaded.height(), 1, "only 1990 in age group 2 is requested");
        Ok(())
    }

    #[tokio::test]
    async fn covariates_are_read_from_their_own_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut covariate = df!(
            COL::LOCATION_ID => &[70i64],
            COL::YEAR_ID => &[1992i64],
            COL::AGE_GROUP_ID => &[22i64],
            COL::SEX_ID => &[3i64],
            COL::MEAN_VALUE => &[1.5f64],
        )?;
        write_parquet(&dir.path().join(PATHS::covariate(28)), &mut covariate)?;

        let source = LocalSource::new(Config {
            base_path: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        });
        assert_eq!(source.covariate(&request()?, 28).await?.height(), 1);
        assert!(source.covariate(&request()?, 29).await.is_err());
        Ok(())
    }
}
