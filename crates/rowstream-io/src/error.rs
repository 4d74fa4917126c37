use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error(transparent)]
    Core(#[from] rowstream_core::error::Error),

    /// The remote handle for `location` could not be established.
    #[error("cannot open {location}: {source}")]
    Open {
        location: String,
        #[source]
        source: Box<Error>,
    },

    /// The decoder rejected the file footer/schema at startup.
    #[error("decoder init failed: {0}")]
    DecodeInit(String),

    /// The encoder rejected the record type or output at startup.
    #[error("encoder init failed: {0}")]
    EncodeInit(String),

    #[error("decode error: {0}")]
    Decode(String),

    /// `index` is the position of the failing record within a `write_chunk` call.
    #[error("encode error{}: {message}", record_suffix(.index))]
    Encode {
        index: Option<usize>,
        message: String,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Operation attempted after `close`.
    #[error("{0} is closed")]
    Closed(&'static str),

    #[error(transparent)]
    Close(#[from] CloseError),

    #[error("other error: {0}")]
    Other(String),
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" at record {}", i),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn open(location: impl fmt::Display, source: Error) -> Self {
        Error::Open {
            location: location.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn encode(message: impl fmt::Display) -> Self {
        Error::Encode {
            index: None,
            message: message.to_string(),
        }
    }

    /// Attach the position of the failing record to an encode error.
    /// Storage and lifecycle errors pass through unchanged.
    pub(crate) fn at_record(self, idx: usize) -> Self {
        match self {
            Error::Encode { message, .. } => Error::Encode {
                index: Some(idx),
                message,
            },
            other => other,
        }
    }

    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            Error::Decode(msg) => Error::Decode(format!("{}: {}", ctx, msg)),
            Error::DecodeInit(msg) => Error::DecodeInit(format!("{}: {}", ctx, msg)),
            Error::EncodeInit(msg) => Error::EncodeInit(format!("{}: {}", ctx, msg)),
            Error::Encode { index, message } => Error::Encode {
                index,
                message: format!("{}: {}", ctx, message),
            },
            Error::Storage(msg) => Error::Storage(format!("{}: {}", ctx, msg)),
            other => other,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::Open { location, .. } => vec![
                format!("Check that {} exists and is accessible", location),
                "Verify the bucket name and credentials of the object store".into(),
            ],
            Error::DecodeInit(_) => vec![
                "The object may not be a Parquet file, or its footer is truncated".into(),
                "Check that the record type matches the schema the file was written with".into(),
            ],
            Error::Encode { index: Some(i), .. } => vec![
                format!("Records before index {} were written; later ones were not", i),
                "Buffer and retry the remaining records if all-or-nothing is required".into(),
            ],
            Error::Closed(_) => vec!["Open a new reader/writer; instances cannot be reused after close".into()],
            Error::Close(c) if c.format.is_some() && c.storage.is_none() => vec![
                "Storage close succeeded but the encoder did not finish; the object may be incomplete".into(),
            ],
            _ => vec![],
        }
    }
}

/// Failures from the two independent halves of a close: the remote handle and
/// the format engine. Both are attempted; neither masks the other.
#[derive(Debug, Default)]
pub struct CloseError {
    pub storage: Option<Box<Error>>,
    pub format: Option<Box<Error>>,
}

impl CloseError {
    pub(crate) fn from_parts(storage: Result<()>, format: Result<()>) -> std::result::Result<(), Self> {
        let storage = storage.err().map(Box::new);
        let format = format.err().map(Box::new);
        if storage.is_none() && format.is_none() {
            Ok(())
        } else {
            Err(CloseError { storage, format })
        }
    }
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "close failed")?;
        if let Some(e) = &self.storage {
            write!(f, "; storage: {}", e)?;
        }
        if let Some(e) = &self.format {
            write!(f, "; format: {}", e)?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.storage
            .as_deref()
            .or(self.format.as_deref())
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_error_keeps_both_parts() {
        let err = CloseError::from_parts(
            Err(Error::Storage("upload failed".into())),
            Err(Error::encode("footer")),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("storage: storage error: upload failed"), "{}", msg);
        assert!(msg.contains("format: encode error: footer"), "{}", msg);
        assert!(CloseError::from_parts(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn encode_index_in_message() {
        let err = Error::encode("bad").at_record(3);
        assert_eq!(err.to_string(), "encode error at record 3: bad");
        assert!(!err.suggestions().is_empty());
        assert!(matches!(Error::Closed("writer").at_record(1), Error::Closed(_)));
    }
}
