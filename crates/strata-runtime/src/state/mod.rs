//! State container primitives: reducer injection, combination and
//! listener subscriptions.
//!
//! ```text
//!  inject / eject          combine()                 replace_reducer()
//! ┌────────────────┐     ┌────────────────┐     ┌──────────────────────┐
//! │ReducerInjector │ ──► │CombinedReducer │ ──► │   StateContainer     │
//! │ SliceKey → fn  │     │ fresh object   │     │ state + reducer      │
//! └────────────────┘     └────────────────┘     │ apply(): all-or-none │
//!                                               └──────────────────────┘
//! ```
//!
//! The store owns one of each and re-combines after every injection, so
//! previously injected slices are never dropped.

mod container;
mod injector;
mod subscription;

pub use container::{StateContainer, INIT_ACTION, REPLACE_ACTION};
pub use injector::{CombinedReducer, ReducerInjector, SliceReducer};
pub use subscription::{Listener, Subscription};

pub(crate) use subscription::ListenerSet;
