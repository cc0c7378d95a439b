use std::borrow::Cow;

#[evo_derive::evo_error]
pub enum PersistenceError {
    /// Stored bytes exist but cannot be turned back into a snapshot.
    #[error("Corrupt snapshot{}: {message}", format_context(.context))]
    Corrupt { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Snapshot encoding failed{}: {source}", format_context(.context))]
    Encode { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Storage failure{}: {source}", format_context(.context))]
    Storage { source: evo_storage::StorageError, context: Option<Cow<'static, str>> },

    /// The backing store refused the operation.
    #[error("Store unavailable{}: {message}", format_context(.context))]
    Unavailable { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
