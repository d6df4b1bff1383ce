//! # Helpdesk Core
//!
//! Reducer, effect and environment abstractions shared by the helpdesk
//! client controllers (ticket list polling, ticket creation form).
//!
//! ## Core Concepts
//!
//! - **State**: What a controller currently shows (a ticket snapshot, a form phase)
//! - **Action**: Every input a controller reacts to (timer ticks, remote results, user intents)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Description of a side effect (a remote call), never its execution
//! - **Environment**: Injected dependencies (clock, remote API, navigator)
//!
//! The `Store` in `helpdesk-runtime` owns a reducer, executes the effects it
//! returns and feeds their resulting actions back in.
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_core::*;
//!
//! impl Reducer for CounterReducer {
//!     type State = CounterState;
//!     type Action = CounterAction;
//!     type Environment = CounterEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut CounterState,
//!         action: CounterAction,
//!         env: &CounterEnvironment,
//!     ) -> SmallVec<[Effect<CounterAction>; 4]> {
//!         state.count += 1;
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for controller logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold every state transition of a controller and are deterministic,
/// so they can be tested without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for controller logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// Most transitions produce zero or one effect, so effects are returned in
    /// a `SmallVec` that stays on the stack for up to four entries.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns descriptions of the effects
        /// the runtime must execute. Must not perform I/O itself.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned by reducers. The runtime decides when and how
/// to run them, which keeps reducers testable by inspecting what they return.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Boxed future an effect resolves, yielding an optional feedback action
    pub type EffectFuture<Action> = Pin<Box<dyn Future<Output = Option<Action>> + Send>>;

    /// Description of a side effect, executed later by the Store runtime
    ///
    /// Periodic work is not an effect: it is scheduled on the store with
    /// `Store::schedule_repeating`.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Async computation; a `Some` result is fed back into the reducer
        Future(EffectFuture<Action>),
    }

    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => f.write_str("Effect::None"),
                Effect::Future(_) => f.write_str("Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Whether this effect does nothing when executed
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Take the future out of a `Future` effect
        #[must_use]
        pub fn into_future(self) -> Option<EffectFuture<Action>> {
            match self {
                Effect::None => None,
                Effect::Future(fut) => Some(fut),
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// External dependencies are abstracted behind traits and injected through
/// the reducer's `Environment` parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use helpdesk_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time from the operating system
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
