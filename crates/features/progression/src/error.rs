use std::borrow::Cow;

#[evo_derive::evo_error]
pub enum GrowthError {
    /// NaN or infinity reached the growth model.
    #[error("Non-finite input{}: {message}", format_context(.context))]
    NonFinite { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A value or rate below zero.
    #[error("Negative input{}: {message}", format_context(.context))]
    Negative { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid domain{}: {message}", format_context(.context))]
    InvalidDomain { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A stored snapshot violates the profile invariants and cannot be restored.
    #[error("Invalid snapshot{}: {message}", format_context(.context))]
    InvalidSnapshot { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
