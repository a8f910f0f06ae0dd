use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::{domain::FieldKey, protocol::TableFieldValue};
use storage::{FieldStore, SqliteBackend};
use table_core::{view::render_table, EditPolicy, EditorCommand, TableEditor};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url, Settings};

#[derive(Parser, Debug)]
#[command(name = "table-cli", about = "Edit table fields kept in a SQLite field store")]
struct Cli {
    #[arg(long, default_value = "table.toml")]
    config: PathBuf,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    entry: Option<String>,
    #[arg(long)]
    field: Option<String>,
    /// Refuse to delete row 0.
    #[arg(long)]
    protect_header_row: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Print the table.
    Show,
    /// Print the stored value as JSON.
    Export,
    /// List every stored field.
    List,
    SetCell {
        row: usize,
        col: usize,
        text: String,
    },
    AddRow,
    DeleteRow {
        index: usize,
    },
    AddColumn,
    DeleteColumn {
        index: usize,
    },
}

impl Command {
    fn editor_command(&self) -> Option<EditorCommand> {
        match self {
            Self::SetCell { row, col, text } => Some(EditorCommand::SetCell {
                row: *row,
                col: *col,
                text: text.clone(),
            }),
            Self::AddRow => Some(EditorCommand::AddRow),
            Self::DeleteRow { index } => Some(EditorCommand::DeleteRow { index: *index }),
            Self::AddColumn => Some(EditorCommand::AddColumn),
            Self::DeleteColumn { index } => Some(EditorCommand::DeleteColumn { index: *index }),
            Self::Show | Self::Export | Self::List => None,
        }
    }
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = load_settings(&self.config);
        if let Some(v) = &self.database_url {
            settings.database_url = v.clone();
        }
        if let Some(v) = &self.entry {
            settings.default_entry = v.clone();
        }
        if let Some(v) = &self.field {
            settings.default_field = v.clone();
        }
        if self.protect_header_row {
            settings.protect_header_row = true;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    let database_url = normalize_database_url(&settings.database_url);
    let backend = SqliteBackend::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify the path and its permissions"
        );
        error
    })?;
    backend.health_check().await?;
    let store = FieldStore::open(Arc::new(backend))?;

    if cli.command == Command::List {
        for field in store.list_fields().await? {
            println!("{}\t{}", field.key, field.updated_at.to_rfc3339());
        }
        return Ok(());
    }

    let key = FieldKey::new(settings.default_entry, settings.default_field);
    let handle = store.open_field(key.clone()).await?;
    let editor = TableEditor::mount(
        Arc::new(handle),
        EditPolicy {
            protect_header_row: settings.protect_header_row,
        },
    );

    let outcome = run_command(&editor, &cli.command);
    editor.unmount();
    store.flush().await?;
    let output = outcome.with_context(|| format!("failed to edit field {key}"))?;

    info!(%key, "done");
    print!("{output}");
    Ok(())
}

fn run_command(editor: &TableEditor, command: &Command) -> Result<String> {
    if let Some(editor_command) = command.editor_command() {
        let grid = editor.dispatch(editor_command)?;
        return Ok(render_table(&grid));
    }

    match command {
        Command::Export => {
            let value = TableFieldValue::new(editor.grid()).to_json();
            Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
        }
        _ => Ok(render_table(&editor.grid())),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
