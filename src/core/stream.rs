//! Record-boundary-aware CSV streaming
//!
//! Product descriptions carry raw HTML with embedded newlines, so one logical
//! CSV record can span many physical lines. [`RecordStream`] reads physical
//! lines and only yields a record once the running count of `"` bytes is
//! even. Everything works on raw bytes, which keeps the streamer independent
//! of the file encoding: Shift-JIS never uses `0x22` as a trail byte.
//!
//! [`GroupReader`] sits on top and bundles a product's main row with the
//! continuation rows that follow it (rows whose first column is empty).

use miette::Diagnostic;
use std::io::BufRead;
use thiserror::Error;

/// Default bound on physical lines buffered for a single logical record
pub const DEFAULT_MAX_RECORD_LINES: usize = 10_000;

#[derive(Debug, Error, Diagnostic)]
pub enum StreamError {
    #[error("IO error: {0}")]
    #[diagnostic(code(rts::stream::io))]
    Io(#[from] std::io::Error),

    #[error("Unbalanced quotes in record starting at line {first_line} ({lines} line(s) buffered)")]
    #[diagnostic(
        code(rts::stream::unbalanced_quotes),
        help("A quoted field is never closed. Check the row starting at this line, or raise max_record_lines if the field is genuinely that long")
    )]
    UnbalancedQuotes { first_line: usize, lines: usize },

    #[error("Input is empty (no header row)")]
    #[diagnostic(code(rts::stream::empty_input))]
    EmptyInput,
}

/// One logical CSV record, with its original bytes and line terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRecord {
    /// Raw bytes, including the trailing line terminator when present
    pub bytes: Vec<u8>,
    /// 1-based physical line number of the first line
    pub first_line: usize,
    /// Number of physical lines the record spans
    pub line_count: usize,
}

impl LogicalRecord {
    /// Size in bytes, terminator included
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn ends_with_newline(&self) -> bool {
        self.bytes.last() == Some(&b'\n')
    }

    /// The record without its trailing `\n` / `\r\n`
    pub fn content(&self) -> &[u8] {
        let bytes = self.bytes.strip_suffix(b"\n").unwrap_or(&self.bytes);
        bytes.strip_suffix(b"\r").unwrap_or(bytes)
    }

    /// Raw bytes of the first column, unquoted
    pub fn first_field(&self) -> Vec<u8> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(self.content());
        let mut record = csv::ByteRecord::new();
        match rdr.read_byte_record(&mut record) {
            Ok(true) => record.get(0).map(<[u8]>::to_vec).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// First column as text, for display and grouping
    pub fn handle(&self) -> String {
        String::from_utf8_lossy(&self.first_field()).trim().to_string()
    }

    /// A continuation row belongs to the most recently opened product group
    pub fn is_continuation(&self) -> bool {
        self.handle().is_empty()
    }
}

/// Yields logical records from a buffered reader
pub struct RecordStream<R> {
    reader: R,
    max_record_lines: usize,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> RecordStream<R> {
    pub fn new(reader: R, max_record_lines: usize) -> Self {
        Self {
            reader,
            max_record_lines: max_record_lines.max(1),
            line_no: 0,
            done: false,
        }
    }

    /// Read the next logical record, or `None` at end of input
    pub fn next_record(&mut self) -> Result<Option<LogicalRecord>, StreamError> {
        if self.done {
            return Ok(None);
        }

        let mut buf = Vec::new();
        let first_line = self.line_no + 1;
        let mut lines = 0usize;
        let mut quotes = 0usize;

        loop {
            let start = buf.len();
            let read = self.reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                self.done = true;
                if lines == 0 {
                    return Ok(None);
                }
                if quotes % 2 != 0 {
                    return Err(StreamError::UnbalancedQuotes { first_line, lines });
                }
                break;
            }

            self.line_no += 1;
            lines += 1;
            quotes += buf[start..].iter().filter(|&&b| b == b'"').count();

            if quotes % 2 == 0 {
                break;
            }
            if lines >= self.max_record_lines {
                self.done = true;
                return Err(StreamError::UnbalancedQuotes { first_line, lines });
            }
        }

        Ok(Some(LogicalRecord {
            bytes: buf,
            first_line,
            line_count: lines,
        }))
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<LogicalRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// A product's main row plus all of its continuation rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductGroup {
    /// Handle of the main row (empty for orphan continuation rows)
    pub handle: String,
    pub records: Vec<LogicalRecord>,
}

impl ProductGroup {
    /// Total size of the group in bytes
    pub fn byte_len(&self) -> usize {
        self.records.iter().map(LogicalRecord::len).sum()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

/// Groups data records into product groups
///
/// The header must already have been consumed from the underlying stream.
pub struct GroupReader<R> {
    stream: RecordStream<R>,
    pending: Option<LogicalRecord>,
}

impl<R: BufRead> GroupReader<R> {
    pub fn new(stream: RecordStream<R>) -> Self {
        Self {
            stream,
            pending: None,
        }
    }

    pub fn next_group(&mut self) -> Result<Option<ProductGroup>, StreamError> {
        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.stream.next_record()? {
                Some(record) => record,
                None => return Ok(None),
            },
        };

        let handle = first.handle();
        if handle.is_empty() {
            tracing::warn!(
                line = first.first_line,
                "continuation row without a preceding product row"
            );
        }

        let mut group = ProductGroup {
            handle,
            records: vec![first],
        };

        while let Some(record) = self.stream.next_record()? {
            if record.is_continuation() {
                group.records.push(record);
            } else {
                self.pending = Some(record);
                break;
            }
        }

        Ok(Some(group))
    }
}

impl<R: BufRead> Iterator for GroupReader<R> {
    type Item = Result<ProductGroup, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_group().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn records(input: &str) -> Vec<LogicalRecord> {
        RecordStream::new(Cursor::new(input.as_bytes().to_vec()), 100)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_simple_records() {
        let recs = records("a,b\n1,2\n3,4\n");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[1].bytes, b"1,2\n");
        assert_eq!(recs[2].first_line, 3);
    }

    #[test]
    fn test_multiline_quoted_field_is_one_record() {
        let recs = records("h,body\nabc,\"<p>one\ntwo\nthree</p>\"\ndef,x\n");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[1].line_count, 3);
        assert_eq!(recs[1].first_line, 2);
        assert_eq!(recs[2].first_line, 5);
        assert_eq!(recs[1].handle(), "abc");
    }

    #[test]
    fn test_escaped_quotes_keep_parity() {
        let recs = records("h,b\nx,\"say \"\"hi\"\"\nagain\"\n");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].line_count, 2);
    }

    #[test]
    fn test_last_record_without_newline() {
        let recs = records("h\nlast");
        assert_eq!(recs.len(), 2);
        assert!(!recs[1].ends_with_newline());
        assert_eq!(recs[1].content(), b"last");
    }

    #[test]
    fn test_crlf_content() {
        let recs = records("h,b\r\nabc,1\r\n");
        assert_eq!(recs[1].content(), b"abc,1");
        assert_eq!(recs[1].handle(), "abc");
    }

    #[test]
    fn test_quoted_handle() {
        let recs = records("h,b\n\"a,b\",1\n\"\",2\n");
        assert_eq!(recs[1].handle(), "a,b");
        assert!(recs[2].is_continuation());
    }

    #[test]
    fn test_full_width_space_handle_is_continuation() {
        let recs = records("h,b\nabc,1\n\u{3000},2\n");
        assert_eq!(recs[2].handle(), "");
        assert!(recs[2].is_continuation());
        assert!(!recs[1].is_continuation());
    }

    #[test]
    fn test_unbalanced_quotes_at_eof() {
        let mut stream = RecordStream::new(Cursor::new(b"h\n\"open\nmore\n".to_vec()), 100);
        assert!(stream.next_record().unwrap().is_some());
        let err = stream.next_record().unwrap_err();
        assert!(matches!(
            err,
            StreamError::UnbalancedQuotes {
                first_line: 2,
                lines: 2
            }
        ));
        assert!(stream.next_record().unwrap().is_none());
    }

    #[test]
    fn test_unbalanced_quotes_bounded() {
        let mut input = String::from("h\n\"never closed\n");
        for _ in 0..50 {
            input.push_str("filler\n");
        }
        let mut stream = RecordStream::new(Cursor::new(input.into_bytes()), 5);
        stream.next_record().unwrap();
        let err = stream.next_record().unwrap_err();
        assert!(matches!(err, StreamError::UnbalancedQuotes { lines: 5, .. }));
    }

    #[test]
    fn test_groups_follow_handles() {
        let input = "Handle,SKU\nabc,abc\n,abc-2s\n,\ndef,def\n,def-t\nxyz,xyz\n";
        let mut stream = RecordStream::new(Cursor::new(input.as_bytes().to_vec()), 100);
        stream.next_record().unwrap();
        let groups: Vec<ProductGroup> = GroupReader::new(stream)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].handle, "abc");
        assert_eq!(groups[0].record_count(), 3);
        assert_eq!(groups[1].handle, "def");
        assert_eq!(groups[1].record_count(), 2);
        assert_eq!(groups[2].handle, "xyz");
        assert_eq!(groups[2].byte_len(), "xyz,xyz\n".len());
    }

    #[test]
    fn test_leading_orphan_rows_form_own_group() {
        let input = "Handle,SKU\n,orphan\nabc,abc\n";
        let mut stream = RecordStream::new(Cursor::new(input.as_bytes().to_vec()), 100);
        stream.next_record().unwrap();
        let groups: Vec<ProductGroup> = GroupReader::new(stream)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].handle, "");
        assert_eq!(groups[1].handle, "abc");
    }
}
