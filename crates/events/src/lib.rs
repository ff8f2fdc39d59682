//! Transaction events and an in-process bus to fan them out
//!
//! Every executed transaction produces:
//! - one [`ResultEvent`] per evaluation attempt
//! - at most one [`NullifierEvent`], for accepted resource transactions
//! - exactly one [`CompleteEvent`]

pub mod bus;
pub mod event;

pub use bus::EventBus;
pub use event::{CompleteEvent, Event, EventKind, NullifierEvent, ResultEvent};
