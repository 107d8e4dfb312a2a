use time::OffsetDateTime;

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("no data returned for {0}")]
    NoData(String),
    #[error("sample at row {row} ({ts}) precedes the previous sample")]
    UnorderedSamples { row: usize, ts: OffsetDateTime },
    #[error("row {row} has {got} values, expected {expected}")]
    RowShape { row: usize, got: usize, expected: usize },
    #[error("timestamp {0} cannot be localized")]
    TimestampOutOfRange(OffsetDateTime),
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),
    #[error("parameter '{0}' has neither a configured value nor a default")]
    MissingParameter(String),
    #[error("parameter '{name}' has invalid value '{value}'")]
    InvalidParameter { name: String, value: String },
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    #[error("column '{0}' not present in table")]
    MissingColumn(String),
    #[error("column '{0}' already present in table")]
    DuplicateColumn(String),
    #[error("value undefined: {0}")]
    MissingValue(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
