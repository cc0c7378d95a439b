use std::borrow::Cow;

#[evo_derive::evo_error]
pub enum SchedulerError {
    /// The requested lifecycle step is not legal from the current state.
    #[error("Invalid transition{}: {message}", format_context(.context))]
    InvalidTransition { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid scheduler configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Growth failure{}: {source}", format_context(.context))]
    Growth { source: evo_progression::GrowthError, context: Option<Cow<'static, str>> },

    #[error("Persistence failure{}: {source}", format_context(.context))]
    Persistence { source: evo_persistence::PersistenceError, context: Option<Cow<'static, str>> },

    #[error("Event bus failure{}: {source}", format_context(.context))]
    EventBus { source: evo_event_bus::EventBusError, context: Option<Cow<'static, str>> },

    /// The engine task has exited.
    #[error("Engine closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
