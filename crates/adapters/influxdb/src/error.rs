//! InfluxDB adapter error types.

use sunsink_domain::error::SunsinkError;

/// Errors specific to the InfluxDB adapter.
#[derive(Debug, thiserror::Error)]
pub enum InfluxError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or its body could not be read.
    #[error("request to InfluxDB failed")]
    Request(#[source] reqwest::Error),

    /// InfluxDB answered with a non-success status.
    #[error("InfluxDB answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        /// Start of the response body, usually a JSON error message.
        body: String,
    },

    /// The query ran but Flux reported an error table.
    #[error("query failed: {0}")]
    Query(String),

    /// The CSV response could not be interpreted.
    #[error("malformed query response")]
    Response(#[source] ResponseError),
}

/// Details about why a CSV response could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// A table is not valid CSV.
    #[error("unreadable CSV table")]
    Csv(#[source] csv::Error),

    /// A data row appeared before any header row naming `_value`.
    #[error("no _value column in table header")]
    MissingValueColumn,

    /// A data row is shorter than its header.
    #[error("row {line} has no field at column {column}")]
    ShortRow { line: usize, column: usize },

    /// The `_value` field is not a number.
    #[error("row {line} has non-numeric value {value:?}")]
    InvalidValue { line: usize, value: String },
}

impl InfluxError {
    /// Convert into a [`SunsinkError::Telemetry`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> SunsinkError {
        SunsinkError::Telemetry(Box::new(self))
    }
}

impl From<InfluxError> for SunsinkError {
    fn from(err: InfluxError) -> Self {
        err.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_status_error() {
        let err = InfluxError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "unauthorized access".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "InfluxDB answered 401 Unauthorized: unauthorized access"
        );
    }

    #[test]
    fn should_display_invalid_value_error() {
        let err = ResponseError::InvalidValue {
            line: 4,
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "row 4 has non-numeric value \"abc\"");
    }

    #[test]
    fn should_convert_to_telemetry_error() {
        let err: SunsinkError = InfluxError::Query("bad".to_string()).into();
        assert!(matches!(err, SunsinkError::Telemetry(_)));
    }

    #[test]
    fn should_keep_source_through_conversion() {
        let err: SunsinkError = InfluxError::Response(ResponseError::MissingValueColumn).into();
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("malformed query response"));
    }
}
