/// Errors arising from constructing or coercing values in this crate's
/// data model.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A `%value` claimed to be `binary` but did not decode as base64.
    #[error("invalid base64 in binary value: {0}")]
    InvalidBinary(#[from] base64::DecodeError),
    /// A `%value` claimed to be `date` but did not parse as RFC 3339.
    #[error("invalid RFC 3339 timestamp in date value: {0}")]
    InvalidDate(#[from] chrono::ParseError),
}
