use crate::schedule::cell::TableCell;
use tracing::warn;

/// Largest row or column index accepted from a detector. Schedule photos hold
/// a few dozen rows and columns; anything past this is a corrupt payload.
pub const MAX_GRID_DIM: usize = 1024;

/// Dense text table rebuilt from sparse cell detections.
///
/// Every position the detector did not report holds the empty string, so
/// downstream lookups never need to distinguish "missing" from "blank".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
    col_count: usize,
}

impl Grid {
    /// Builds a grid sized to the largest observed row and column index.
    ///
    /// Cells may arrive in any order. When two cells claim the same position
    /// the later one wins. An empty cell list produces a 1×1 grid holding a
    /// single empty string. Cells whose row or column index reaches
    /// [`MAX_GRID_DIM`] are dropped.
    pub fn from_cells(cells: &[TableCell]) -> Self {
        let (cells, dropped): (Vec<&TableCell>, Vec<&TableCell>) = cells
            .iter()
            .partition(|cell| cell.row < MAX_GRID_DIM && cell.col < MAX_GRID_DIM);
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), limit = MAX_GRID_DIM, "Dropping cells with out-of-range indices");
        }

        let row_count = cells.iter().map(|cell| cell.row + 1).max().unwrap_or(1);
        let col_count = cells.iter().map(|cell| cell.col + 1).max().unwrap_or(1);
        let mut rows = vec![vec![String::new(); col_count]; row_count];
        for cell in cells {
            rows[cell.row][cell.col] = cell.text.clone();
        }
        Self { rows, col_count }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Text at (row, col), or the empty string outside the grid.
    pub fn get(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|record| record.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// One full row, if it exists.
    pub fn row(&self, row: usize) -> Option<&[String]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Iterates over `(row index, column-0 text)` pairs.
    pub fn row_headers(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, record)| (index, record.first().map(String::as_str).unwrap_or("")))
    }
}
