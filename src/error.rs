/// Error surfaced at the binary boundary: a message plus the process exit code.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Typed failures of one load/join/render pass.
///
/// Every variant is local to the pass that raised it; nothing is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// A required document could not be fetched or parsed.
    #[error("failed to load '{location}': {cause}")]
    DataLoad { location: String, cause: String },

    /// A record field is missing or does not coerce to a finite number.
    #[error("invalid value for `{field}`: {raw_value}{}", row_note(.row))]
    InvalidRecord {
        field: String,
        raw_value: String,
        row: Option<RowRef>,
    },

    /// A fold was asked for the domain of an empty dataset.
    #[error("dataset '{dataset}' is empty")]
    EmptyDataset { dataset: String },

    /// The geometry document parsed but is not a usable feature collection.
    #[error("unusable geometry in '{location}': {cause}")]
    Geometry { location: String, cause: String },
}

/// Position of a rejected record inside its source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRef {
    /// Zero-based index into the record array.
    pub index: usize,
    pub location: String,
}

fn row_note(row: &Option<RowRef>) -> String {
    match row {
        Some(r) => format!(" (row {} of {})", r.index, r.location),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn data_load(location: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::DataLoad {
            location: location.into(),
            cause: cause.to_string(),
        }
    }

    pub fn invalid_record(field: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self::InvalidRecord {
            field: field.into(),
            raw_value: raw_value.into(),
            row: None,
        }
    }

    /// Attach the record position to an `InvalidRecord`; other variants pass through.
    pub fn at_row(self, index: usize, location: &str) -> Self {
        match self {
            Self::InvalidRecord { field, raw_value, .. } => Self::InvalidRecord {
                field,
                raw_value,
                row: Some(RowRef {
                    index,
                    location: location.to_string(),
                }),
            },
            other => other,
        }
    }

    pub fn empty(dataset: impl Into<String>) -> Self {
        Self::EmptyDataset {
            dataset: dataset.into(),
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::InvalidRecord { .. } | PipelineError::Geometry { .. } => 2,
            PipelineError::EmptyDataset { .. } => 3,
            PipelineError::DataLoad { .. } => 4,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_exit_codes() {
        let err: AppError = PipelineError::empty("trends").into();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "dataset 'trends' is empty");

        let err: AppError = PipelineError::invalid_record("mean_del", "\"bad\"").into();
        assert_eq!(err.exit_code(), 2);

        let err: AppError = PipelineError::invalid_record("mean_del", "\"bad\"").at_row(2, "del.json").into();
        assert_eq!(err.to_string(), "invalid value for `mean_del`: \"bad\" (row 2 of del.json)");

        let err: AppError = PipelineError::data_load("./data/x.json", "not found").into();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("./data/x.json"));
    }
}
