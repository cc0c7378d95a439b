use evo_derive::evo_error;
use std::borrow::Cow;

#[evo_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Decode error{}: {message}", format_context(.context))]
    Decode { message: Cow<'static, str>, context: Option<std::borrow::Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {}
