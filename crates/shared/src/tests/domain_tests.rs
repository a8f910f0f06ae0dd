use super::*;

fn grid(rows: &[&[&str]]) -> Grid {
    Grid::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
    .expect("rectangular grid")
}

fn assert_rectangular(grid: &Grid) {
    let width = grid.column_count();
    assert!(
        grid.rows().iter().all(|row| row.len() == width),
        "grid is not rectangular: {grid:?}"
    );
}

#[test]
fn default_grid_is_two_by_three_empty_cells() {
    let grid = Grid::default();
    assert_eq!(grid.row_count(), 2);
    assert_eq!(grid.column_count(), 3);
    assert!(grid.rows().iter().flatten().all(String::is_empty));
}

#[test]
fn with_cell_replaces_only_the_target_cell() {
    let original = grid(&[&["a", "b"], &["c", "d"]]);
    let updated = original.with_cell(1, 1, "X").expect("set cell");

    assert_eq!(updated, grid(&[&["a", "b"], &["c", "X"]]));
    assert_eq!(original, grid(&[&["a", "b"], &["c", "d"]]));
}

#[test]
fn with_cell_rejects_out_of_range_indices() {
    let original = grid(&[&["a", "b"]]);

    assert_eq!(
        original.with_cell(1, 0, "x"),
        Err(GridError::IndexOutOfRange {
            axis: Axis::Row,
            index: 1,
            len: 1
        })
    );
    assert_eq!(
        original.with_cell(0, 2, "x"),
        Err(GridError::IndexOutOfRange {
            axis: Axis::Column,
            index: 2,
            len: 2
        })
    );
}

#[test]
fn appended_column_is_empty_in_every_row() {
    let updated = grid(&[&["a", "b"]]).with_column_appended();
    assert_eq!(updated, grid(&[&["a", "b", ""]]));
}

#[test]
fn appended_row_matches_current_width() {
    let updated = grid(&[&["a", "b"], &["c", "d"]]).with_row_appended();
    assert_eq!(updated.row_count(), 3);
    assert_eq!(updated.rows()[2], vec![String::new(), String::new()]);
}

#[test]
fn add_then_delete_last_column_restores_grid() {
    let original = grid(&[&["h1", "h2"], &["a", "b"], &["c", "d"]]);
    let widened = original.with_column_appended();
    let restored = widened
        .without_column(widened.column_count() - 1)
        .expect("delete column");
    assert_eq!(restored, original);
}

#[test]
fn add_then_delete_last_row_restores_grid() {
    let original = grid(&[&["h1", "h2"], &["a", "b"]]);
    let grown = original.with_row_appended();
    let restored = grown.without_row(grown.row_count() - 1).expect("delete row");
    assert_eq!(restored, original);
}

#[test]
fn header_row_and_last_rows_can_be_deleted() {
    let original = grid(&[&["h"], &["a"]]);
    let without_header = original.without_row(0).expect("delete header");
    assert_eq!(without_header, grid(&[&["a"]]));

    let empty = without_header.without_row(0).expect("delete last row");
    assert!(empty.is_empty());
    assert_eq!(empty.column_count(), 0);
}

#[test]
fn grid_can_shrink_to_zero_columns() {
    let narrow = grid(&[&["a"], &["b"]]).without_column(0).expect("delete");
    assert_eq!(narrow.row_count(), 2);
    assert_eq!(narrow.column_count(), 0);
    assert!(matches!(
        narrow.without_column(0),
        Err(GridError::IndexOutOfRange {
            axis: Axis::Column,
            ..
        })
    ));
}

#[test]
fn adding_a_row_to_an_empty_grid_keeps_it_rectangular() {
    let empty = Grid::new(0, 0);
    let grown = empty.with_row_appended().with_column_appended();
    assert_eq!(grown, grid(&[&[""]]));
}

#[test]
fn rectangularity_survives_mixed_edit_sequences() {
    let mut current = Grid::default();
    current = current.with_column_appended();
    assert_rectangular(&current);
    current = current.with_row_appended();
    assert_rectangular(&current);
    current = current.with_cell(2, 3, "z").expect("set");
    assert_rectangular(&current);
    current = current.without_column(1).expect("delete column");
    assert_rectangular(&current);
    current = current.without_row(0).expect("delete row");
    assert_rectangular(&current);
    current = current.with_column_appended().with_row_appended();
    assert_rectangular(&current);

    assert_eq!(current.row_count(), 3);
    assert_eq!(current.column_count(), 4);
    assert_eq!(current.cell(1, 2), Some("z"));
}

#[test]
fn ragged_rows_are_rejected() {
    let err = Grid::from_rows(vec![
        vec!["a".to_string()],
        vec!["b".to_string(), "c".to_string()],
    ])
    .expect_err("ragged");
    assert!(matches!(err, GridError::MalformedPersistedValue(_)));
}

#[test]
fn field_key_displays_entry_and_field() {
    let key = FieldKey::new("entry-1", "table");
    assert_eq!(key.to_string(), "entry-1/table");
}
