//! Error types for shard-report

use thiserror::Error;

/// Top-level report error
#[derive(Error, Debug)]
pub enum ReportError {
    /// The target database is not a sharded-cluster metadata database
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Store access error: {0}")]
    StoreAccess(#[from] StoreError),

    /// Metadata had a shape the engine cannot interpret safely
    #[error("Unexpected metadata shape: {0}")]
    DataShape(String),

    #[error("Section '{section}' is not part of the {report} report")]
    UnknownSection {
        section: String,
        report: &'static str,
    },

    #[error("Render error: {0}")]
    Render(String),
}

/// Errors raised at the metadata store seam
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to connect to {uri}: {message}")]
    Connect { uri: String, message: String },

    #[error("Query on '{collection}' failed: {source}")]
    Query {
        collection: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode record from '{collection}': {message}")]
    Decode { collection: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl StoreError {
    /// Wrap a driver error raised while querying `collection`
    pub fn query<E>(collection: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Query {
            collection: collection.to_string(),
            source: Box::new(source),
        }
    }

    pub fn decode(collection: &str, message: impl Into<String>) -> Self {
        StoreError::Decode {
            collection: collection.to_string(),
            message: message.into(),
        }
    }
}

impl ReportError {
    /// Whether this error is an operational condition the user can act on,
    /// as opposed to an engine defect.
    pub fn is_operational(&self) -> bool {
        !matches!(self, ReportError::DataShape(_))
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts() {
        let err: ReportError = StoreError::Runtime("boom".to_string()).into();
        assert!(matches!(err, ReportError::StoreAccess(_)));
        assert!(err.is_operational());
        assert_eq!(err.to_string(), "Store access error: Runtime error: boom");
    }

    #[test]
    fn test_data_shape_is_not_operational() {
        let err = ReportError::DataShape("chunk uuid missing".to_string());
        assert!(!err.is_operational());
    }

    #[test]
    fn test_unknown_section_message() {
        let err = ReportError::UnknownSection {
            section: "nope".to_string(),
            report: "status",
        };
        assert_eq!(err.to_string(), "Section 'nope' is not part of the status report");
    }
}
