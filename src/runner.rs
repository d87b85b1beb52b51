use crate::{result::Result, table::ResultTable};

/// Trait for executing one verbatim SQL statement against different database backends
/// and buffering its complete result
pub trait QueryRunner {
    /// Execute `sql` and return the table together with its row count.
    ///
    /// The count is the number of rows returned when the statement has result
    /// columns, and the number of rows affected otherwise.
    fn fetch_all_with_count(&mut self, sql: &str) -> Result<(ResultTable, u64)>;

    /// Execute `sql` and return every row.
    ///
    /// A failed statement is always an `Err`; a statement that matched nothing is
    /// an `Ok` table with zero rows.
    fn fetch_all(&mut self, sql: &str) -> Result<ResultTable> {
        self.fetch_all_with_count(sql).map(|(table, _)| table)
    }

    /// Like `fetch_all`, additionally printing the table to stdout when `display_results` is set
    fn fetch_all_display(&mut self, sql: &str, display_results: bool) -> Result<ResultTable> {
        let table = self.fetch_all(sql)?;
        if display_results {
            println!("{table}");
        }
        Ok(table)
    }
}
