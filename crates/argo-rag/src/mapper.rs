//! Row-to-document mapper

use argo_core::{
    CellValue, Document, Error, MappedCorpus, Result, RowSource, TableReport, DEFAULT_PAGE_SIZE,
};
use argo_core::source::quote_text;

/// Turns every table of a row source into flat text documents.
///
/// Tables are read page by page so large tables never sit in memory whole.
/// Each table is numbered from 0, giving ids `"{table}_{ordinal}"`.
#[derive(Debug, Clone)]
pub struct RowDocumentMapper {
    limit_per_table: Option<usize>,
    page_size: usize,
}

impl RowDocumentMapper {
    /// Create a mapper with an optional per-table row cap. A cap of zero
    /// means no cap.
    pub fn new(limit_per_table: Option<usize>) -> Self {
        Self {
            limit_per_table: limit_per_table.filter(|&n| n > 0),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn limit_per_table(&self) -> Option<usize> {
        self.limit_per_table
    }

    /// Map every table of `source`, then close it.
    ///
    /// A table that fails to read is logged and recorded in its report and
    /// the next table proceeds. Failing to list the tables is fatal.
    pub fn map_source<S: RowSource>(&self, source: S) -> Result<MappedCorpus> {
        let tables = match source.table_names() {
            Ok(tables) => tables,
            Err(e) => {
                if let Err(close_err) = source.close() {
                    tracing::warn!(error = %close_err, "failed to close source after error");
                }
                return Err(match e {
                    Error::TableRead { detail, .. } => Error::SourceRead(detail),
                    other => other,
                });
            }
        };

        let mut corpus = MappedCorpus::default();
        for table in &tables {
            tracing::info!(table = %table, "reading table");
            let report = self.map_table(&source, table, &mut corpus.documents);
            if let Some(ref error) = report.error {
                tracing::warn!(table = %table, error = %error, "skipping rest of table");
            } else if report.truncated {
                tracing::warn!(
                    table = %table,
                    limit = self.limit_per_table.unwrap_or_default(),
                    "reached row limit"
                );
            }
            tracing::info!(table = %table, rows = report.documents, "loaded rows");
            corpus.tables.push(report);
        }

        source.close()?;
        Ok(corpus)
    }

    fn map_table<S: RowSource>(
        &self,
        source: &S,
        table: &str,
        documents: &mut Vec<Document>,
    ) -> TableReport {
        let mut report = TableReport::new(table);
        let mut offset = 0;

        loop {
            let page = match source.fetch_page(table, offset, self.page_size) {
                Ok(page) => page,
                Err(e) => {
                    report.error = Some(e.to_string());
                    return report;
                }
            };
            if page.is_empty() {
                return report;
            }

            for values in &page.rows {
                let id = Document::row_id(table, report.documents);
                let text = render_document_text(table, &page.columns, values);
                documents.push(Document { id, text });
                report.documents += 1;

                if self.limit_reached(report.documents) {
                    report.truncated = true;
                    return report;
                }
            }

            if page.len() < self.page_size {
                return report;
            }
            offset += page.len();
        }
    }

    fn limit_reached(&self, count: usize) -> bool {
        self.limit_per_table.is_some_and(|limit| count >= limit)
    }
}

/// Render one row as `Table: {table}\nRow: {'col': value, ...}`.
pub fn render_document_text(table: &str, columns: &[String], values: &[CellValue]) -> String {
    let fields = columns
        .iter()
        .zip(values)
        .map(|(column, value)| format!("{}: {}", quote_text(column), value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Table: {}\nRow: {{{}}}", table, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argo_core::RowPage;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory source that counts fetches and can fail chosen tables.
    struct FakeSource {
        tables: Vec<(String, usize)>,
        failing: Vec<String>,
        fetches: RefCell<HashMap<String, usize>>,
        closed: RefCell<bool>,
    }

    impl FakeSource {
        fn new(tables: &[(&str, usize)]) -> Self {
            Self {
                tables: tables.iter().map(|(t, n)| (t.to_string(), *n)).collect(),
                failing: Vec::new(),
                fetches: RefCell::new(HashMap::new()),
                closed: Default::default(),
            }
        }

        fn failing(mut self, table: &str) -> Self {
            self.failing.push(table.to_string());
            self
        }

        fn fetch_count(&self, table: &str) -> usize {
            self.fetches.borrow().get(table).copied().unwrap_or(0)
        }
    }

    impl RowSource for &FakeSource {
        fn table_names(&self) -> Result<Vec<String>> {
            Ok(self.tables.iter().map(|(t, _)| t.clone()).collect())
        }

        fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<RowPage> {
            *self.fetches.borrow_mut().entry(table.to_string()).or_default() += 1;
            if self.failing.iter().any(|t| t == table) {
                return Err(Error::TableRead {
                    table: table.to_string(),
                    detail: "disk I/O error".to_string(),
                });
            }
            let total = self
                .tables
                .iter()
                .find(|(t, _)| t == table)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            let end = (offset + limit).min(total);
            let rows = (offset.min(end)..end)
                .map(|i| vec![CellValue::Integer(i as i64)])
                .collect();
            Ok(RowPage {
                columns: vec!["n".to_string()],
                rows,
            })
        }

        fn close(self) -> Result<()> {
            *self.closed.borrow_mut() = true;
            Ok(())
        }
    }

    #[test]
    fn test_render_document_text() {
        let text = render_document_text(
            "T",
            &["a".to_string(), "name".to_string(), "note".to_string()],
            &[
                CellValue::Integer(1),
                CellValue::Text("x".to_string()),
                CellValue::Null,
            ],
        );
        assert_eq!(text, "Table: T\nRow: {'a': 1, 'name': 'x', 'note': None}");
    }

    #[test]
    fn test_all_rows_under_limit() {
        let source = FakeSource::new(&[("alpha", 7)]);
        let corpus = RowDocumentMapper::new(Some(10))
            .with_page_size(3)
            .map_source(&source)
            .unwrap();

        let ids: Vec<_> = corpus.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["alpha_0", "alpha_1", "alpha_2", "alpha_3", "alpha_4", "alpha_5", "alpha_6"]
        );
        assert_eq!(corpus.tables[0].documents, 7);
        assert!(!corpus.tables[0].truncated);
        // 3 + 3 + 1, the short page ends the table
        assert_eq!(source.fetch_count("alpha"), 3);
        assert!(*source.closed.borrow());
    }

    #[test]
    fn test_limit_stops_paging_mid_page() {
        let source = FakeSource::new(&[("big", 1200), ("small", 2)]);
        let corpus = RowDocumentMapper::new(Some(600))
            .with_page_size(500)
            .map_source(&source)
            .unwrap();

        let big: Vec<_> = corpus
            .documents
            .iter()
            .filter(|d| d.id.starts_with("big_"))
            .collect();
        assert_eq!(big.len(), 600);
        assert_eq!(big.last().unwrap().id, "big_599");
        assert_eq!(source.fetch_count("big"), 2);
        assert!(corpus.tables[0].truncated);

        // the next table still starts from ordinal 0
        assert_eq!(corpus.documents[600].id, "small_0");
        assert_eq!(corpus.tables[1].documents, 2);
    }

    #[test]
    fn test_limit_on_page_boundary_does_not_fetch_again() {
        let source = FakeSource::new(&[("t", 2000)]);
        let corpus = RowDocumentMapper::new(Some(1000))
            .with_page_size(500)
            .map_source(&source)
            .unwrap();
        assert_eq!(corpus.documents.len(), 1000);
        assert_eq!(source.fetch_count("t"), 2);
    }

    #[test]
    fn test_no_limit_reads_everything() {
        let source = FakeSource::new(&[("t", 1001)]);
        let corpus = RowDocumentMapper::new(None)
            .with_page_size(500)
            .map_source(&source)
            .unwrap();
        assert_eq!(corpus.documents.len(), 1001);
        assert_eq!(source.fetch_count("t"), 3);
        assert!(!corpus.tables[0].truncated);
    }

    #[test]
    fn test_zero_limit_means_no_limit() {
        let mapper = RowDocumentMapper::new(Some(0));
        assert_eq!(mapper.limit_per_table(), None);
    }

    #[test]
    fn test_empty_table_contributes_nothing() {
        let source = FakeSource::new(&[("empty", 0), ("one", 1)]);
        let corpus = RowDocumentMapper::new(Some(5)).map_source(&source).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.tables[0].documents, 0);
        assert!(corpus.tables[0].error.is_none());
        assert_eq!(source.fetch_count("empty"), 1);
    }

    #[test]
    fn test_table_error_is_recovered() {
        let source = FakeSource::new(&[("broken", 10), ("fine", 2)]).failing("broken");
        let corpus = RowDocumentMapper::new(None).map_source(&source).unwrap();

        assert_eq!(corpus.failed_tables().count(), 1);
        assert!(corpus.tables[0].error.as_deref().unwrap().contains("disk I/O error"));
        let ids: Vec<_> = corpus.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["fine_0", "fine_1"]);
        assert!(*source.closed.borrow());
    }
}
