//! Error types.

pub type Result<T> = std::result::Result<T, CascadeError>;

#[derive(thiserror::Error, Debug)]
pub enum CascadeError {
    #[error("Wrapped anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),
    #[error("Source '{source_name}' is unavailable: {source}")]
    SourceUnavailable {
        source_name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Cannot {operation} while measurement inputs are {state}")]
    InputsNotReady {
        operation: &'static str,
        state: &'static str,
    },
    #[error("Unknown GBD round: {0}")]
    UnknownRound(i64),
    #[error("Unknown decomp step id: {0}")]
    UnknownDecompStep(i64),
    #[error("Unknown GBD measure id: {0}")]
    UnknownMeasureId(i64),
    #[error("Unknown measure name: {0}")]
    UnknownMeasure(String),
    #[error("Unknown age group id: {0}")]
    UnknownAgeGroup(i64),
    #[error("Unknown sex id: {0}")]
    UnknownSex(i64),
    #[error("Invalid location hierarchy: {0}")]
    InvalidHierarchy(String),
    #[error("Column '{column}' has a null value at row {row}")]
    NullValue { column: String, row: usize },
    #[error("Wrapped polars error: {0}")]
    PolarsError(#[from] polars::error::PolarsError),
    #[error("std IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl CascadeError {
    pub(crate) fn source_unavailable(source_name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            source,
        }
    }
}
