use std::borrow::Cow;

/// Errors that can occur during event bus operations.
#[evo_derive::evo_error]
pub enum EventBusError {
    /// An internal downcast failed; the type registry is inconsistent.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The event type is already registered with a different channel kind.
    #[error("Channel kind mismatch{}: {message}", format_context(.context))]
    ChannelKindMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

}
