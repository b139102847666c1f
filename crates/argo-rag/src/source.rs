//! SQLite row source

use std::cell::RefCell;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row, Statement};

use argo_core::{CellValue, Error, Result, RowPage, RowSource};

/// Where the previous page of a table ended.
struct PageCursor {
    table: String,
    next_offset: usize,
    last_rowid: i64,
}

/// Read-only row source backed by a SQLite database file
///
/// Rows come back in rowid order. Sequential pages of the same table resume
/// after the last rowid seen instead of re-scanning skipped rows. Tables
/// declared `WITHOUT ROWID` fall back to plain `LIMIT/OFFSET` paging.
pub struct SqliteSource {
    conn: Connection,
    cursor: RefCell<Option<PageCursor>>,
}

impl SqliteSource {
    /// Open the database at `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::SourceRead(format!("cannot open {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "opened sqlite source");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already opened connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            cursor: RefCell::new(None),
        }
    }

    fn fetch_by_rowid(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> rusqlite::Result<Option<RowPage>> {
        let resume_after = self
            .cursor
            .borrow()
            .as_ref()
            .filter(|c| c.table == table && c.next_offset == offset)
            .map(|c| c.last_rowid);

        let sql = match resume_after {
            Some(_) => format!(
                "SELECT rowid, * FROM {} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
                quote_ident(table)
            ),
            None => format!(
                "SELECT rowid, * FROM {} ORDER BY rowid LIMIT ?2 OFFSET ?1",
                quote_ident(table)
            ),
        };
        // no rowid column to order by
        let Ok(mut stmt) = self.conn.prepare(&sql) else {
            return Ok(None);
        };
        let key = resume_after.unwrap_or(offset as i64);

        let columns = column_names(&stmt).split_off(1);
        let mut last_rowid = None;
        let mut rows = Vec::new();
        for row in stmt.query_map(params![key, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, cells(row, 1)?))
        })? {
            let (rowid, values) = row?;
            last_rowid = Some(rowid);
            rows.push(values);
        }

        *self.cursor.borrow_mut() = last_rowid.map(|last_rowid| PageCursor {
            table: table.to_string(),
            next_offset: offset + rows.len(),
            last_rowid,
        });
        Ok(Some(RowPage { columns, rows }))
    }

    fn fetch_by_offset(
        &self,
        table: &str,
        offset: usize,
        limit: usize,
    ) -> rusqlite::Result<RowPage> {
        let sql = format!("SELECT * FROM {} LIMIT ?1 OFFSET ?2", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = column_names(&stmt);
        let rows = stmt
            .query_map(params![limit as i64, offset as i64], |row| cells(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(RowPage { columns, rows })
    }
}

impl RowSource for SqliteSource {
    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )
            .map_err(|e| Error::SourceRead(e.to_string()))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| Error::SourceRead(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::SourceRead(e.to_string()))?;
        Ok(names)
    }

    fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<RowPage> {
        let read_error = |e: rusqlite::Error| Error::TableRead {
            table: table.to_string(),
            detail: e.to_string(),
        };

        match self.fetch_by_rowid(table, offset, limit).map_err(read_error)? {
            Some(page) => Ok(page),
            None => {
                tracing::debug!(table, offset, "table has no rowid, paging by offset");
                self.fetch_by_offset(table, offset, limit).map_err(read_error)
            }
        }
    }

    fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| Error::SourceRead(format!("failed to close source: {}", e)))
    }
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

/// Cells of `row` from column `skip` onwards.
fn cells(row: &Row<'_>, skip: usize) -> rusqlite::Result<Vec<CellValue>> {
    (skip..row.as_ref().column_count())
        .map(|i| row.get_ref(i).map(cell_from_ref))
        .collect()
}

fn cell_from_ref(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Real(f),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Blob(bytes.to_vec()),
    }
}

/// Quotes SQL identifiers, escaping embedded quotes.
fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE floats (platform TEXT, cycle INTEGER, pressure REAL, raw BLOB);
             INSERT INTO floats VALUES ('5900400', 1, 10.5, x'0a0b');
             INSERT INTO floats VALUES ('5900400', 2, NULL, NULL);
             INSERT INTO floats VALUES ('5900401', 1, 3.0, NULL);
             CREATE TABLE \"odd \"\"name\"\"\" (a INTEGER);",
        )
        .unwrap();
        SqliteSource::from_connection(conn)
    }

    #[test]
    fn test_table_names_are_sorted_user_tables() {
        let source = fixture();
        let names = source.table_names().unwrap();
        assert_eq!(names, vec!["floats".to_string(), "odd \"name\"".to_string()]);
    }

    #[test]
    fn test_fetch_page_reads_typed_values() {
        let source = fixture();
        let page = source.fetch_page("floats", 0, 2).unwrap();

        assert_eq!(page.columns, vec!["platform", "cycle", "pressure", "raw"]);
        assert_eq!(page.len(), 2);
        assert_eq!(
            page.rows[0],
            vec![
                CellValue::Text("5900400".to_string()),
                CellValue::Integer(1),
                CellValue::Real(10.5),
                CellValue::Blob(vec![0x0a, 0x0b]),
            ]
        );
        assert_eq!(page.rows[1][2], CellValue::Null);
    }

    #[test]
    fn test_fetch_page_offsets() {
        let source = fixture();
        let page = source.fetch_page("floats", 2, 500).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.rows[0][0], CellValue::Text("5900401".to_string()));

        let page = source.fetch_page("floats", 3, 500).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_quoted_table_name() {
        let source = fixture();
        let page = source.fetch_page("odd \"name\"", 0, 10).unwrap();
        assert_eq!(page.columns, vec!["a"]);
        assert!(page.is_empty());
    }

    #[test]
    fn test_missing_table_is_a_table_error() {
        let source = fixture();
        let err = source.fetch_page("nope", 0, 10).unwrap_err();
        assert!(matches!(err, Error::TableRead { ref table, .. } if table == "nope"));
    }

    #[test]
    fn test_open_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteSource::open(dir.path().join("missing.db")).err().unwrap();
        assert!(matches!(err, Error::SourceRead(_)));
    }

    #[test]
    fn test_sequential_pages_follow_rowid_order() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE casts (id INTEGER PRIMARY KEY, depth REAL);
             INSERT INTO casts VALUES (30, 3.0);
             INSERT INTO casts VALUES (10, 1.0);
             INSERT INTO casts VALUES (50, 5.0);
             INSERT INTO casts VALUES (20, 2.0);
             INSERT INTO casts VALUES (40, 4.0);",
        )
        .unwrap();
        let source = SqliteSource::from_connection(conn);

        let mut ids = Vec::new();
        let mut offset = 0;
        loop {
            let page = source.fetch_page("casts", offset, 2).unwrap();
            if page.is_empty() {
                break;
            }
            assert_eq!(page.columns, vec!["id", "depth"]);
            offset += page.len();
            ids.extend(page.rows.into_iter().map(|row| row[0].clone()));
        }
        let expected: Vec<_> = [10, 20, 30, 40, 50].into_iter().map(CellValue::Integer).collect();
        assert_eq!(ids, expected);

        // a page for another table or offset does not reuse the cursor
        let err = source.fetch_page("floats", 0, 10).unwrap_err();
        assert!(matches!(err, Error::TableRead { ref table, .. } if table == "floats"));
        let page = source.fetch_page("casts", 1, 1).unwrap();
        assert_eq!(page.rows[0][0], CellValue::Integer(20));
    }

    #[test]
    fn test_without_rowid_table_pages_by_offset() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sensors (code TEXT PRIMARY KEY, unit TEXT) WITHOUT ROWID;
             INSERT INTO sensors VALUES ('PRES', 'dbar');
             INSERT INTO sensors VALUES ('TEMP', 'degC');
             INSERT INTO sensors VALUES ('PSAL', 'psu');",
        )
        .unwrap();
        let source = SqliteSource::from_connection(conn);

        let first = source.fetch_page("sensors", 0, 2).unwrap();
        let rest = source.fetch_page("sensors", 2, 2).unwrap();
        assert_eq!(first.columns, vec!["code", "unit"]);
        assert_eq!(first.len(), 2);
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn test_close() {
        assert!(fixture().close().is_ok());
    }
}
