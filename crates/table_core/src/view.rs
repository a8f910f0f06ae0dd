//! Plain-text rendering of a grid. Row 0 is drawn as the header.

use shared::domain::Grid;

const MIN_CELL_WIDTH: usize = 3;

pub fn render_table(grid: &Grid) -> String {
    if grid.row_count() == 0 || grid.column_count() == 0 {
        return format!(
            "(empty table: {} rows x {} columns)\n",
            grid.row_count(),
            grid.column_count()
        );
    }

    let widths: Vec<usize> = (0..grid.column_count())
        .map(|col| {
            grid.rows()
                .iter()
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or_default()
                .max(MIN_CELL_WIDTH)
        })
        .collect();

    let mut out = String::new();
    for (index, row) in grid.rows().iter().enumerate() {
        out.push_str(&render_row(row, &widths));
        out.push('\n');
        if index == 0 {
            out.push_str(&render_separator(&widths));
            out.push('\n');
        }
    }
    out
}

fn render_row(row: &[String], widths: &[usize]) -> String {
    let cells: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!(" {cell:<width$} ", width = *width))
        .collect();
    format!("|{}|", cells.join("|"))
}

fn render_separator(widths: &[usize]) -> String {
    let dashes: Vec<String> = widths.iter().map(|width| "-".repeat(width + 2)).collect();
    format!("|{}|", dashes.join("|"))
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
