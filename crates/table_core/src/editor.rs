use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::Grid,
    error::GridError,
    protocol::{decode_field_value, encode_field_value},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    channel::{PersistenceChannel, Subscription},
    model::{EditPolicy, GridModel},
};

/// Intents raised by the table view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    SetCell { row: usize, col: usize, text: String },
    AddRow,
    DeleteRow { index: usize },
    AddColumn,
    DeleteColumn { index: usize },
}

/// A mounted editor: one [`GridModel`] bound to one field, with a single
/// change listener that lives exactly as long as the editor.
pub struct TableEditor {
    model: Arc<GridModel>,
    subscription: Option<Subscription>,
}

impl TableEditor {
    /// Loads the stored table (or the default 2x3 table), writes it back so
    /// the field always holds a well-formed value, and starts listening for
    /// changes made by other writers.
    pub fn mount(channel: Arc<dyn PersistenceChannel>, policy: EditPolicy) -> Self {
        let grid = initial_grid(channel.get_value());
        channel.set_value(encode_field_value(&grid));

        let model = Arc::new(GridModel::new(grid, Arc::clone(&channel), policy));
        let listener_model = Arc::downgrade(&model);
        let subscription = channel.on_value_changed(Box::new(move |value| {
            let Some(model) = listener_model.upgrade() else {
                debug!("external change arrived after the editor was torn down");
                return;
            };
            match model.reconcile_external(value.as_ref()) {
                Ok(outcome) => debug!(?outcome, "external change reconciled"),
                Err(error) => warn!(%error, "ignoring malformed external table value"),
            }
        }));

        info!(
            rows = model.row_count(),
            columns = model.column_count(),
            "table editor mounted"
        );
        Self {
            model,
            subscription: Some(subscription),
        }
    }

    pub fn model(&self) -> &GridModel {
        &self.model
    }

    pub fn grid(&self) -> Grid {
        self.model.grid()
    }

    /// Read-only view of the current table for rendering.
    pub fn subscribe(&self) -> watch::Receiver<Grid> {
        self.model.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn dispatch(&self, command: EditorCommand) -> Result<Grid, GridError> {
        match command {
            EditorCommand::SetCell { row, col, text } => self.model.set_cell(row, col, text),
            EditorCommand::AddRow => self.model.add_row(),
            EditorCommand::DeleteRow { index } => self.model.delete_row(index),
            EditorCommand::AddColumn => self.model.add_column(),
            EditorCommand::DeleteColumn { index } => self.model.delete_column(index),
        }
    }

    pub fn unmount(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            info!("table editor unmounted");
        }
    }
}

impl Drop for TableEditor {
    fn drop(&mut self) {
        self.release();
    }
}

fn initial_grid(stored: Option<Value>) -> Grid {
    match decode_field_value(stored.as_ref()) {
        Ok(Some(grid)) => grid,
        Ok(None) => {
            info!("no stored table; starting from the default layout");
            Grid::default()
        }
        Err(error) => {
            warn!(%error, "stored table is malformed; starting from the default layout");
            Grid::default()
        }
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
