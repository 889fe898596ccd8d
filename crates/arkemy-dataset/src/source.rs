//! Source adapters producing a [`RawTable`]
//!
//! Delimited text is the only codec shipped; the loader itself works on
//! [`RawTable`] so other codecs can be put in front of it.

use crate::error::{LoadError, LoadResult};
use crate::table::RawTable;
use csv::{ReaderBuilder, Trim};
use std::io::Read;
use std::path::Path;

/// Extensions [`read_path`] has a codec for
pub const READABLE_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Whether [`read_path`] can decode this file
#[must_use]
pub fn is_readable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| READABLE_EXTENSIONS.iter().any(|r| ext.eq_ignore_ascii_case(r)))
}

/// Read delimited text with a header row
///
/// Empty cells become `None`. Rows shorter than the header are padded.
///
/// # Errors
/// Returns [`LoadError::Malformed`] on invalid UTF-8 or broken quoting.
pub fn read_csv<R: Read>(reader: R, origin: &Path) -> LoadResult<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let malformed = |e: csv::Error| LoadError::Malformed {
        path: origin.to_path_buf(),
        message: e.to_string(),
    };

    let headers = rdr.headers().map_err(malformed)?.clone();
    let mut table = RawTable::new(headers.iter());

    for record in rdr.records() {
        let record = record.map_err(malformed)?;
        let row = record
            .iter()
            .map(|cell| {
                if cell.trim().is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        table.push_row(row);
    }

    tracing::debug!(
        path = %origin.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "read delimited source"
    );
    Ok(table)
}

/// Read a dataset file, picking the codec from its extension
///
/// # Errors
/// Fails on IO errors, malformed content, or extensions without a reader.
pub fn read_path(path: &Path) -> LoadResult<RawTable> {
    if !is_readable(path) {
        return Err(LoadError::UnsupportedFormat(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(|e| LoadError::io_error(path, e))?;
    read_csv(std::io::BufReader::new(file), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_are_none() {
        let data = "record_kind,hours_used\nactual,\nactual,8\n";
        let table = read_csv(data.as_bytes(), Path::new("mem.csv")).unwrap();
        assert_eq!(table.columns(), ["record_kind", "hours_used"]);
        assert_eq!(table.rows()[0][1], None);
        assert_eq!(table.rows()[1][1].as_deref(), Some("8"));
    }

    #[test]
    fn quoted_commas_survive() {
        let data = "name,fee\n\"Smith, Jane\",\"1,5\"\n";
        let table = read_csv(data.as_bytes(), Path::new("mem.csv")).unwrap();
        assert_eq!(table.rows()[0][0].as_deref(), Some("Smith, Jane"));
        assert_eq!(table.rows()[0][1].as_deref(), Some("1,5"));
    }

    #[test]
    fn parquet_is_unsupported() {
        let err = read_path(Path::new("data/unified_NOK.parquet")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn readable_extensions_ignore_case() {
        assert!(is_readable(Path::new("unified_NOK.CSV")));
        assert!(!is_readable(Path::new("unified_NOK.pq")));
        assert!(!is_readable(Path::new("unified_NOK")));
    }
}
