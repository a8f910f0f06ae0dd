//! Editing model for a table field: a rectangular grid of text cells kept in
//! sync with the host field that stores it.

mod channel;
mod editor;
mod model;
pub mod view;

pub use channel::{PersistenceChannel, Subscription, ValueListener};
pub use editor::{EditorCommand, TableEditor};
pub use model::{EditPolicy, GridModel, ReconcileOutcome};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
