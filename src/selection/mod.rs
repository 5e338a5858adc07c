pub mod registry;

pub use registry::{SelectionCommand, SelectionContext, SelectionEntry, SelectionEvent, SelectionRegistry, SubscriptionId};
