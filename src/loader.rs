use crate::error::Result;
use crate::types::RawTable;
use csv::{ByteRecord, ReaderBuilder};
use std::io::Read;
use std::path::Path;

/// Read a CSV file into a raw table. Header text is kept verbatim so the
/// normalizer sees exactly what the source wrote.
pub fn load_raw<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    log::info!("reading {}", path.display());
    let rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    collect(rdr)
}

/// Same as [`load_raw`] for any reader (used for in-memory sources).
pub fn read_raw<R: Read>(reader: R) -> Result<RawTable> {
    let rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    collect(rdr)
}

/// Cells that are not valid UTF-8 (Latin-1 spreadsheet exports) are decoded
/// lossily; records the CSV reader cannot parse are skipped and counted.
fn collect<R: Read>(mut rdr: csv::Reader<R>) -> Result<RawTable> {
    let headers: Vec<String> = decode(rdr.byte_headers()?);
    let mut rows = Vec::new();
    let mut unreadable_rows = 0;
    for (i, result) in rdr.byte_records().enumerate() {
        match result {
            Ok(record) => rows.push(decode(&record)),
            Err(e) => {
                log::warn!("record {} skipped: {}", i + 1, e);
                unreadable_rows += 1;
            }
        }
    }
    log::debug!("read {} raw rows with {} columns", rows.len(), headers.len());
    Ok(RawTable {
        headers,
        rows,
        unreadable_rows,
    })
}

fn decode(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_headers_verbatim_including_newlines() {
        let data = "Country,\"Measles \nTotal\",Year\nChad,\"1,200\",2020\n";
        let table = read_raw(data.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Country", "Measles \nTotal", "Year"]);
        assert_eq!(table.rows, vec![vec!["Chad", "1,200", "2020"]]);
    }

    #[test]
    fn tolerates_ragged_rows() {
        let data = "country,region,year\nChad,AFR\n";
        let table = read_raw(data.as_bytes()).unwrap();
        assert_eq!(table.rows[0].len(), 2);
    }

    #[test]
    fn latin1_cells_do_not_lose_the_table() {
        let data: &[u8] = b"country,region,year,measles_total\nChad,AFR,2020,5\nC\xf4te d'Ivoire,AFR,2020,7\n";
        let table = read_raw(data).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], "Chad");
        assert!(table.rows[1][0].starts_with('C'));
        assert!(table.rows[1][0].ends_with("te d'Ivoire"));
        assert_eq!(table.unreadable_rows, 0);
    }
}
