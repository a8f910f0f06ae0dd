use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::Grid,
    error::GridError,
    protocol::{decode_field_value, encode_field_value},
};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::channel::PersistenceChannel;

/// Optional guards on destructive edits. All off by default, so the header
/// row may be deleted and the grid may shrink to nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditPolicy {
    pub protect_header_row: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The incoming grid replaced the local one.
    Replaced,
    /// The incoming grid equals the local one; nothing was published.
    Unchanged,
    /// The channel already holds a newer value; the incoming one was dropped.
    Superseded,
    /// No value was present.
    Ignored,
}

/// Owns the grid. Each successful edit writes the full table to the channel
/// and publishes it to watchers while holding the state lock, so the stored
/// and rendered tables cannot drift apart.
pub struct GridModel {
    channel: Arc<dyn PersistenceChannel>,
    policy: EditPolicy,
    state: watch::Sender<Grid>,
}

impl GridModel {
    pub fn new(grid: Grid, channel: Arc<dyn PersistenceChannel>, policy: EditPolicy) -> Self {
        let (state, _) = watch::channel(grid);
        Self {
            channel,
            policy,
            state,
        }
    }

    pub fn grid(&self) -> Grid {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Grid> {
        self.state.subscribe()
    }

    pub fn row_count(&self) -> usize {
        self.state.borrow().row_count()
    }

    pub fn column_count(&self) -> usize {
        self.state.borrow().column_count()
    }

    pub fn set_cell(
        &self,
        row: usize,
        col: usize,
        text: impl Into<String>,
    ) -> Result<Grid, GridError> {
        let text = text.into();
        self.apply("set_cell", move |grid| grid.with_cell(row, col, text))
    }

    pub fn add_row(&self) -> Result<Grid, GridError> {
        self.apply("add_row", |grid| Ok(grid.with_row_appended()))
    }

    pub fn delete_row(&self, index: usize) -> Result<Grid, GridError> {
        let protect_header_row = self.policy.protect_header_row;
        self.apply("delete_row", |grid| {
            if protect_header_row && index == 0 && grid.row_count() > 0 {
                return Err(GridError::HeaderRowProtected);
            }
            grid.without_row(index)
        })
    }

    pub fn add_column(&self) -> Result<Grid, GridError> {
        self.apply("add_column", |grid| Ok(grid.with_column_appended()))
    }

    pub fn delete_column(&self, index: usize) -> Result<Grid, GridError> {
        self.apply("delete_column", |grid| grid.without_column(index))
    }

    /// Replaces the local grid with a value written elsewhere. There is no
    /// merge: the incoming table wins outright. Nothing is written back.
    ///
    /// A value the channel no longer holds is dropped as superseded. The
    /// check runs under the state lock, so a local edit cannot land between
    /// it and the replacement.
    pub fn reconcile_external(
        &self,
        incoming: Option<&Value>,
    ) -> Result<ReconcileOutcome, GridError> {
        let Some(incoming_grid) = decode_field_value(incoming)? else {
            debug!("external change carried no table value");
            return Ok(ReconcileOutcome::Ignored);
        };

        let mut outcome = ReconcileOutcome::Unchanged;
        self.state.send_if_modified(|grid| {
            if self.channel.get_value().as_ref() != incoming {
                outcome = ReconcileOutcome::Superseded;
                return false;
            }
            if *grid == incoming_grid {
                return false;
            }
            *grid = incoming_grid.clone();
            outcome = ReconcileOutcome::Replaced;
            true
        });

        match outcome {
            ReconcileOutcome::Replaced => info!(
                rows = incoming_grid.row_count(),
                columns = incoming_grid.column_count(),
                "applied external table change"
            ),
            ReconcileOutcome::Superseded => {
                debug!("skipping external table change already replaced in storage")
            }
            ReconcileOutcome::Unchanged | ReconcileOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    fn apply<F>(&self, op: &'static str, edit: F) -> Result<Grid, GridError>
    where
        F: FnOnce(&Grid) -> Result<Grid, GridError>,
    {
        let mut outcome = None;
        self.state.send_if_modified(|grid| {
            let edited = edit(grid);
            let modified = match &edited {
                Ok(next) => {
                    self.channel.set_value(encode_field_value(next));
                    *grid = next.clone();
                    true
                }
                Err(_) => false,
            };
            outcome = Some(edited);
            modified
        });

        // `send_if_modified` runs its closure exactly once.
        let Some(result) = outcome else {
            unreachable!("table edit closure did not run");
        };
        match &result {
            Ok(grid) => debug!(
                op,
                rows = grid.row_count(),
                columns = grid.column_count(),
                "table edited"
            ),
            Err(error) => debug!(op, %error, "table edit rejected"),
        }
        result
    }
}

#[cfg(test)]
#[path = "tests/model_tests.rs"]
mod tests;
