use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use rowstream_core::error::Error;
    /// let err = Error::Schema("unknown column".into());
    /// let err = err.with_context("while decoding record `Trip`");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self) as Box<dyn std::error::Error + Send + Sync>,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Schema(msg) => {
                if msg.contains("null") {
                    vec![
                        "Mark the field nullable in Record::schema()".into(),
                        "Or make sure to_row() never emits Scalar::Null for it".into(),
                    ]
                } else {
                    vec![
                        "Check that Record::schema() matches the fields emitted by to_row()".into(),
                        "Verify the stored object was written with the same record type".into(),
                    ]
                }
            }
            Error::Config(msg) => {
                if msg.contains("batch_size") || msg.contains("row_group_size") {
                    vec!["Sizes are counted in rows and must be greater than zero".into()]
                } else {
                    vec![]
                }
            }
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
