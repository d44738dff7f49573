use thiserror::Error;

/// Errors raised while decoding a wireless report into [`crate::model::GenericCtrl`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    #[error("unknown report id {0:#04x}")]
    UnknownReportId(u8),
    #[error("report too short: need at least {need} bytes, got {got}")]
    ShortReport { need: usize, got: usize },
    #[error("report-init stage requested a subtype change, no sample produced")]
    SubtypeChangeRequested,
    #[error("no calibration data available for this axis")]
    NoCalibrationData,
}

/// Errors raised while applying mapping rules.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum MappingError {
    #[error("source index {0} has no corresponding plane/bit")]
    InvalidSourceIndex(u8),
    #[error("destination index {0} has no corresponding plane/bit")]
    InvalidDestinationIndex(u8),
}

/// Errors raised while encoding a generic/wired controller frame.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EncodeError {
    #[error("output buffer too small: need at least {need} bytes, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("unsupported axis count {0} for this console's wire format")]
    UnsupportedAxisCount(usize),
}

/// Errors raised while reading or mutating the in-memory config model.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("wired port {0} is out of range")]
    PortOutOfRange(usize),
    #[error("source slot {0} is out of range")]
    SourceOutOfRange(usize),
    #[error("mapping rule list is full (max {max} rules)")]
    RuleListFull { max: usize },
    #[error("config magic mismatch, defaults were written in place")]
    MagicMismatch,
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
pub type MappingResult<T> = std::result::Result<T, MappingError>;
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
