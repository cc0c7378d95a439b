use std::borrow::Cow;

/// Errors raised by the [`Storage`](crate::Storage) engine.
#[evo_derive::evo_error]
pub enum StorageError {
    #[error("File not found{}: {message}", format_context(.context))]
    FileNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Path escapes the storage sandbox{}: {message}", format_context(.context))]
    PathTraversalAttempt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Disk I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Decompression failure{}: {source}", format_context(.context))]
    Decompress { source: lz4_flex::block::DecompressError, context: Option<Cow<'static, str>> },
}
