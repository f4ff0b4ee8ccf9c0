//! Delimited text reader
//!
//! Turns header-first delimited text into a `Table` of raw string cells.
//! Only file-level problems are errors here; cell contents are interpreted
//! later by the ingestion step.

use indexmap::IndexMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input is not valid UTF-8 after byte {valid_up_to}")]
    Encoding { valid_up_to: usize },
    #[error("input has no header row")]
    MissingHeader,
    #[error("quoted field opened on line {line} is never closed")]
    UnterminatedQuote { line: usize },
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Table {
        Table {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: vec![],
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Builds a table from string-keyed records. The first record's keys, in
    /// order, become the headers; a key missing from a later record leaves an
    /// empty cell, and keys the first record lacks are ignored.
    pub fn from_records<R, K, V>(records: impl IntoIterator<Item = R>) -> Table
    where
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Table::default();
        for (n, record) in records.into_iter().enumerate() {
            let mut fields: IndexMap<String, String> = record
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
            if n == 0 {
                table.headers = fields.keys().cloned().collect();
            }
            let row = table
                .headers
                .iter()
                .map(|h| fields.swap_remove(h).unwrap_or_default())
                .collect();
            table.rows.push(row);
        }
        table
    }

    pub fn read(path: impl AsRef<Path>, delimiter: char) -> Result<Table, IngestError> {
        let bytes = std::fs::read(path)?;
        Table::parse(&bytes, delimiter)
    }

    /// Parses delimited text with a header row.
    ///
    /// Fields may be double-quoted (`""` escapes a quote, quoted fields may
    /// span lines). LF, CRLF and bare CR end a record; blank lines are
    /// skipped. A leading byte-order mark is ignored.
    pub fn parse(input: &[u8], delimiter: char) -> Result<Table, IngestError> {
        let text = std::str::from_utf8(input).map_err(|e| IngestError::Encoding {
            valid_up_to: e.valid_up_to(),
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut records: Vec<Vec<String>> = vec![];
        let mut record: Vec<String> = vec![];
        let mut field = String::new();
        let mut in_quotes = false;
        let mut quote_line = 0;
        let mut line = 1;

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if in_quotes {
                match c {
                    '"' if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    '"' => in_quotes = false,
                    '\n' => {
                        line += 1;
                        field.push(c);
                    }
                    _ => field.push(c),
                }
                continue;
            }

            match c {
                '"' if field.is_empty() => {
                    in_quotes = true;
                    quote_line = line;
                }
                '\r' | '\n' => {
                    if c == '\r' && chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    record.push(std::mem::take(&mut field));
                    finish_record(&mut records, std::mem::take(&mut record));
                    line += 1;
                }
                c if c == delimiter => record.push(std::mem::take(&mut field)),
                _ => field.push(c),
            }
        }

        if in_quotes {
            return Err(IngestError::UnterminatedQuote { line: quote_line });
        }
        if !field.is_empty() || !record.is_empty() {
            record.push(field);
            finish_record(&mut records, record);
        }

        let mut records = records.into_iter();
        let headers = records.next().ok_or(IngestError::MissingHeader)?;
        Ok(Table {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows: records.collect(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn finish_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.len() == 1 && record[0].trim().is_empty();
    if !blank {
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_rows() {
        let t = Table::parse(b"time,a,b\n1,2,3\r\n\n4,5,6", ',').unwrap();
        assert_eq!(t.headers(), &["time", "a", "b"]);
        assert_eq!(t.rows(), &[vec!["1", "2", "3"], vec!["4", "5", "6"]]);
    }

    #[test]
    fn quoted_fields() {
        let t = Table::parse(b"t;\"note\"\n1;\"a;b \"\"c\"\"\nd\"\n", ';').unwrap();
        assert_eq!(t.headers(), &["t", "note"]);
        assert_eq!(t.rows()[0][1], "a;b \"c\"\nd");
    }

    #[test]
    fn file_level_errors() {
        assert!(matches!(
            Table::parse(&[b't', b'\n', 0xff, 0xfe], ','),
            Err(IngestError::Encoding { valid_up_to: 2 })
        ));
        assert!(matches!(Table::parse(b"\n\n", ','), Err(IngestError::MissingHeader)));
        assert!(matches!(
            Table::parse(b"t,a\n1,\"open\n", ','),
            Err(IngestError::UnterminatedQuote { line: 2 })
        ));
    }

    #[test]
    fn records_follow_first_key_order() {
        let t = Table::from_records(vec![
            vec![("t", "1"), ("a", "1.5")],
            vec![("a", "2.5"), ("t", "2"), ("extra", "x")],
            vec![("t", "3")],
        ]);
        assert_eq!(t.headers(), &["t", "a"]);
        assert_eq!(t.rows()[1], vec!["2", "2.5"]);
        assert_eq!(t.rows()[2], vec!["3", ""]);
    }
}
