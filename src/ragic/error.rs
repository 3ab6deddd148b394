use thiserror::Error;

/// Errors that can occur when compiling queries against or reading from Ragic
#[derive(Debug, Error)]
pub enum RagicError {
    /// Required connection parameters are absent (base URL, namespace, API key)
    #[error("Configuration error: {0} must be set")]
    ConfigurationMissing(String),

    /// Connection parameters present but unusable (bad URL, bad header bytes)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The structure file does not exist
    #[error("Structure file {0} does not exist")]
    StructureNotFound(String),

    /// The structure file exists but could not be parsed
    #[error("Invalid structure file {path}: {source}")]
    StructureInvalid {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Tab name not declared in the structure file
    #[error("Unknown tab '{0}'")]
    UnknownTab(String),

    /// Table name not declared under the given tab
    #[error("Unknown table '{table}' in tab '{tab}'")]
    UnknownTable { tab: String, table: String },

    /// Filter or ordering references a column the table does not declare
    #[error("Field '{field}' not found in table '{table}'")]
    FieldNotFound { table: String, field: String },

    /// Fetch attempted before any query was defined
    #[error("Query not ready: define a query before fetching")]
    QueryNotReady,

    /// Network failure (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Backend payload is not a JSON object of record objects
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A numeric column holds a value that is not a number
    #[error("Column '{column}' declared as number holds non-numeric value '{value}'")]
    Coercion { column: String, value: String },

    /// Polars error while building or combining tables
    #[error("DataFrame error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagicError {
    /// True for failures of the HTTP exchange itself, as opposed to caller errors
    pub fn is_transport(&self) -> bool {
        matches!(self, RagicError::Transport(_) | RagicError::Http { .. })
    }
}

/// Type alias for Results using RagicError
pub type Result<T> = std::result::Result<T, RagicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let http = RagicError::Http {
            status: 503,
            url: "https://example.invalid/acct/tab/1".to_string(),
        };
        assert!(http.is_transport());
        assert!(!RagicError::QueryNotReady.is_transport());
        assert_eq!(
            http.to_string(),
            "HTTP 503 from https://example.invalid/acct/tab/1"
        );
    }
}
