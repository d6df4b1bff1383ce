//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use helpdesk_core::async_effect;
///
/// async_effect! {
///     match api.list_tickets().await {
///         Ok(tickets) => Some(PollingListAction::TicketsLoaded { tickets }),
///         Err(error) => Some(PollingListAction::LoadFailed { message: error.to_string() }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}
