//! Schema normalizer: raw CSV bytes to a typed [`Dataset`].
//!
//! Detection order is fixed so that identical bytes always normalize to the
//! identical dataset:
//!
//! 1. binary guard (null bytes in the leading chunk)
//! 2. encoding: UTF-8 with BOM stripping, plain UTF-8, then Latin-1 as a
//!    total fallback of last resort
//! 3. delimiter: comma, semicolon, tab, pipe; consistent column count over
//!    a leading sample wins, ties broken by maximum column count
//! 4. per-column type inference: numeric iff every non-absent cell parses

use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::dataset::{is_absent_marker, parse_number, ColumnType, Dataset, Value};
use crate::error::{ParseError, ParseResult};

/// Delimiters attempted, in priority order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Rows sampled for delimiter detection.
const DETECTION_SAMPLE_LINES: usize = 5;

/// Leading bytes inspected by the binary guard.
const BINARY_CHECK_BYTES: usize = 1024;

/// Result of normalizing one file, with detection metadata.
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    /// The typed dataset.
    pub dataset: Dataset,
    /// Encoding that decoded the bytes.
    pub encoding: &'static str,
    /// Delimiter the table was parsed with.
    pub delimiter: char,
}

/// Normalize raw bytes into a typed dataset.
pub fn normalize_bytes(name: &str, bytes: &[u8]) -> ParseResult<NormalizedFile> {
    if looks_binary(bytes) {
        return Err(ParseError::BinaryContent);
    }

    let (content, encoding) = decode(bytes);
    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let delimiter = detect_delimiter(&content)?;
    let dataset = parse_table(name, &content, delimiter)?;

    Ok(NormalizedFile {
        dataset,
        encoding,
        delimiter: delimiter as char,
    })
}

/// Normalize a CSV file from disk. The dataset is named after the file.
pub fn normalize_file<P: AsRef<Path>>(path: P) -> ParseResult<NormalizedFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.csv");
    normalize_bytes(name, &bytes)
}

/// Null bytes in the leading chunk mark the file as binary.
fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(BINARY_CHECK_BYTES).any(|&b| b == 0)
}

/// Decode bytes with the fixed encoding ladder.
///
/// Latin-1 is decoded as WHATWG windows-1252, which is total over all byte
/// values: parsing never fails purely on encoding, but non-Latin input may
/// come out garbled. Known limitation, not masked.
fn decode(bytes: &[u8]) -> (String, &'static str) {
    if let Some(stripped) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        if let Ok(s) = std::str::from_utf8(stripped) {
            return (s.to_string(), "utf-8-sig");
        }
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return (s.to_string(), "utf-8");
    }
    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    (decoded.into_owned(), "latin-1")
}

/// Pick the delimiter whose column count is consistent across the leading
/// sample, preferring more columns; candidate priority breaks exact ties.
fn detect_delimiter(content: &str) -> ParseResult<u8> {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(DETECTION_SAMPLE_LINES)
        .collect();
    if sample.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| line.bytes().filter(|&b| b == candidate).count())
            .collect();
        let consistent = counts.windows(2).all(|w| w[0] == w[1]);
        let columns = counts[0] + 1;
        if consistent && columns > 1 && best.map_or(true, |(_, c)| columns > c) {
            best = Some((candidate, columns));
        }
    }
    if let Some((delimiter, _)) = best {
        return Ok(delimiter);
    }

    // No candidate splits the sample consistently (ragged rows, quoted
    // fields). Fall back to the densest split of the header line.
    let first = sample[0];
    let mut fallback: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let count = first.bytes().filter(|&b| b == candidate).count();
        if count > 0 && fallback.map_or(true, |(_, c)| count > c) {
            fallback = Some((candidate, count));
        }
    }
    fallback.map(|(d, _)| d).ok_or(ParseError::NoDelimiter)
}

/// Parse the decoded content into a typed dataset.
fn parse_table(name: &str, content: &str, delimiter: u8) -> ParseResult<Dataset> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    for (i, header) in headers.iter().enumerate() {
        if headers[..i].contains(header) {
            return Err(ParseError::DuplicateColumn(header.clone()));
        }
    }

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Rows shorter than the header pad with absent cells; extra
        // trailing fields are ignored.
        let row: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        raw_rows.push(row);
    }

    let types: Vec<ColumnType> = (0..headers.len())
        .map(|col| {
            let numeric = raw_rows.iter().all(|row| {
                let cell = row[col].trim();
                is_absent_marker(cell) || parse_number(cell).is_some()
            });
            if numeric {
                ColumnType::Numeric
            } else {
                ColumnType::Text
            }
        })
        .collect();

    let rows: Vec<Vec<Value>> = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&types)
                .map(|(cell, ty)| Value::typed(cell, *ty))
                .collect()
        })
        .collect();

    Ok(Dataset {
        name: name.to_string(),
        columns: headers,
        types,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3").unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3").unwrap(), b';');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3").unwrap(), b'\t');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3").unwrap(), b'|');
    }

    #[test]
    fn test_detect_delimiter_prefers_more_columns() {
        // Comma splits into 2 consistent columns, semicolon into 3.
        let content = "a;b;c,d\n1;2;3,4";
        assert_eq!(detect_delimiter(content).unwrap(), b';');
    }

    #[test]
    fn test_detect_delimiter_none() {
        assert!(matches!(
            detect_delimiter("justoneword\nanother"),
            Err(ParseError::NoDelimiter)
        ));
    }

    #[test]
    fn test_normalize_simple_csv() {
        let parsed = normalize_bytes("a.csv", b"ID,score\n1,10\n2,20").unwrap();
        assert_eq!(parsed.delimiter, ',');
        assert_eq!(parsed.encoding, "utf-8");
        let ds = parsed.dataset;
        assert_eq!(ds.columns, vec!["ID", "score"]);
        assert_eq!(ds.row_count(), 2);
        assert!(ds.is_numeric("ID"));
        assert!(ds.is_numeric("score"));
        assert_eq!(ds.cell(1, "score"), Some(&Value::Number(20.0)));
    }

    #[test]
    fn test_normalize_strips_bom() {
        let bytes = b"\xEF\xBB\xBFID;v\n1;2";
        let parsed = normalize_bytes("bom.csv", bytes).unwrap();
        assert_eq!(parsed.encoding, "utf-8-sig");
        assert_eq!(parsed.dataset.columns[0], "ID");
    }

    #[test]
    fn test_normalize_latin1_fallback() {
        // "Société;1" with 0xE9 (é in ISO-8859-1), invalid as UTF-8.
        let bytes = b"name;v\nSoci\xE9t\xE9;1";
        let parsed = normalize_bytes("latin.csv", bytes).unwrap();
        assert_eq!(parsed.encoding, "latin-1");
        assert_eq!(
            parsed.dataset.cell(0, "name"),
            Some(&Value::Text("Société".into()))
        );
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let result = normalize_bytes("dup.csv", b"ID,score,ID\n1,2,3");
        assert!(matches!(result, Err(ParseError::DuplicateColumn(ref c)) if c == "ID"));
    }

    #[test]
    fn test_binary_content_rejected() {
        let result = normalize_bytes("bin.csv", b"ID,score\n1,\x002");
        assert!(matches!(result, Err(ParseError::BinaryContent)));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            normalize_bytes("empty.csv", b""),
            Err(ParseError::EmptyFile)
        ));
        assert!(matches!(
            normalize_bytes("blank.csv", b"  \n \n"),
            Err(ParseError::EmptyFile)
        ));
    }

    #[test]
    fn test_header_only_file_is_valid() {
        let parsed = normalize_bytes("header.csv", b"ID,score\n").unwrap();
        assert_eq!(parsed.dataset.columns, vec!["ID", "score"]);
        assert_eq!(parsed.dataset.row_count(), 0);
    }

    #[test]
    fn test_type_inference_mixed_column_is_text() {
        let ds = normalize_bytes("m.csv", b"ID,v\n1,10\n2,abc")
            .unwrap()
            .dataset;
        assert!(ds.is_numeric("ID"));
        assert!(!ds.is_numeric("v"));
        // Numeric-looking cells in a text column stay text.
        assert_eq!(ds.cell(0, "v"), Some(&Value::Text("10".into())));
    }

    #[test]
    fn test_type_inference_ignores_absent_cells() {
        let ds = normalize_bytes("g.csv", b"ID,v\n1,10\n2,\n3,NA")
            .unwrap()
            .dataset;
        assert!(ds.is_numeric("v"));
        assert_eq!(ds.cell(1, "v"), Some(&Value::Absent));
        assert_eq!(ds.cell(2, "v"), Some(&Value::Absent));
    }

    #[test]
    fn test_short_rows_pad_with_absent() {
        let ds = normalize_bytes("s.csv", b"a,b,c\n1,2\n").unwrap().dataset;
        assert_eq!(ds.cell(0, "c"), Some(&Value::Absent));
    }

    #[test]
    fn test_quoted_values() {
        let ds = normalize_bytes("q.csv", b"name,v\n\"Smith, John\",3\n\"Doe, Jane\",4")
            .unwrap()
            .dataset;
        assert_eq!(ds.cell(0, "name"), Some(&Value::Text("Smith, John".into())));
        assert_eq!(ds.cell(1, "v"), Some(&Value::Number(4.0)));
    }
}
