use thiserror::Error;

/// Faults that stop a run before or during scanning.
/// Record-level defects never surface here; they are dropped and counted.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Upload exceeds the configured size limit
    #[error("Playlist muito grande: {size_mb:.1}MB (limite {limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: usize },

    /// Archive opened fine but holds no .m3u/.m3u8 entry
    #[error("ZIP sem arquivo M3U")]
    NoPlaylistInArchive,

    /// Archive could not be read
    #[error("Arquivo ZIP inválido: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not line-oriented text (protects against binary uploads)
    #[error("Playlist line {line} exceeds max length of {limit} bytes")]
    LineTooLong { line: u64, limit: usize },
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Why a run ended without a `done` notification
#[derive(Error, Debug)]
pub enum RunError {
    /// The consumer dropped its receiver; nothing more can be delivered
    #[error("run cancelled by consumer")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] IngestError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = IngestError::TooLarge {
            size_mb: 612.34,
            limit_mb: 500,
        };
        assert_eq!(err.to_string(), "Playlist muito grande: 612.3MB (limite 500MB)");

        let err = IngestError::LineTooLong { line: 7, limit: 32 };
        assert!(err.to_string().contains("line 7"));
    }
}
