use model::records::row::Row;

/// Rows waiting for one bulk insert into one table.
///
/// The buffer always knows its table and column list; rows are only ever
/// written to the table they were buffered for.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchState {
    table: String,
    columns: Vec<String>,
    ignore_conflicts: bool,
    rows: Vec<Row>,
    bytes: usize,
}

impl BatchState {
    pub fn new(table: &str, columns: Vec<String>, ignore_conflicts: bool) -> Self {
        Self {
            table: table.to_string(),
            columns,
            ignore_conflicts,
            rows: Vec::new(),
            bytes: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn ignore_conflicts(&self) -> bool {
        self.ignore_conflicts
    }

    pub fn set_ignore_conflicts(&mut self, ignore: bool) {
        self.ignore_conflicts = ignore;
    }

    /// Whether rows shaped by `columns` for `table` can join this buffer.
    pub fn accepts(&self, table: &str, columns: &[String]) -> bool {
        self.table == table && self.columns == columns
    }

    /// Appends a row and returns the buffer footprint afterwards.
    pub fn push(&mut self, row: Row) -> usize {
        self.bytes += row.size_bytes();
        self.rows.push(row);
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Empties the buffer, handing back its rows.
    pub fn take(&mut self) -> Vec<Row> {
        self.bytes = 0;
        std::mem::take(&mut self.rows)
    }
}
