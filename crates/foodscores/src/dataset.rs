use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::types::{FIELDNAMES, Inspection, InspectionRow, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing column '{0}' in CSV header")]
    MissingColumn(&'static str),
    #[error("Invalid record on line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: ParseError,
    },
}

/// Merge batches of inspections, collapsing duplicates.
pub fn union<I, B>(batches: I) -> HashSet<Inspection>
where
    I: IntoIterator<Item = B>,
    B: IntoIterator<Item = Inspection>,
{
    let mut inspections = HashSet::new();
    for batch in batches {
        let before = inspections.len();
        inspections.extend(batch);
        log::debug!("merged batch, {} new inspections", inspections.len() - before);
    }
    inspections
}

/// Inspections in canonical order.
pub fn sorted(inspections: impl IntoIterator<Item = Inspection>) -> Vec<Inspection> {
    let mut inspections: Vec<Inspection> = inspections.into_iter().collect();
    inspections.sort();
    inspections
}

pub fn write_csv<W: Write>(inspections: &[Inspection], output: W) -> Result<(), DatasetError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer.write_record(FIELDNAMES)?;
    for inspection in inspections {
        writer.serialize(inspection.to_row())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(inspections: &[Inspection], output: W) -> Result<(), DatasetError> {
    let rows: Vec<InspectionRow> = inspections.iter().map(Inspection::to_row).collect();
    serde_json::to_writer_pretty(output, &rows)?;
    Ok(())
}

/// Read inspections from CSV written by [`write_csv`].
///
/// Columns are located by header name. Invalid UTF-8 is replaced rather than
/// rejected.
pub fn read_csv<R: Read>(input: R) -> Result<Vec<Inspection>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);

    let headers = reader.byte_headers()?.clone();
    let mut columns = [0usize; FIELDNAMES.len()];
    for (slot, name) in columns.iter_mut().zip(FIELDNAMES) {
        *slot = headers
            .iter()
            .position(|h| h == name.as_bytes())
            .ok_or(DatasetError::MissingColumn(name))?;
    }

    let mut inspections = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let field = |i: usize| {
            String::from_utf8_lossy(record.get(columns[i]).unwrap_or_default()).into_owned()
        };

        let row = InspectionRow {
            name: field(0),
            address_street: field(1),
            address_suite: field(2),
            address_zip: field(3),
            inspection_date: field(4),
            inspection_score: field(5),
            inspection_type: field(6),
        };

        let line = record.position().map_or(0, |p| p.line());
        let inspection =
            Inspection::from_row(row).map_err(|source| DatasetError::Parse { line, source })?;
        inspections.push(inspection);
    }

    Ok(inspections)
}

pub fn read_csv_file(path: impl AsRef<Path>) -> Result<Vec<Inspection>, DatasetError> {
    let path = path.as_ref();
    log::info!("Reading inspections from {}", path.display());
    let file = File::open(path).inspect_err(|e| log::error!("Open error: {e:?}"))?;
    read_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn inspection(name: &str, day: u32, score: i32) -> Inspection {
        Inspection::new(
            name,
            "100 Main St",
            "",
            "75201",
            NaiveDate::from_ymd_opt(2015, 1, day).unwrap(),
            score,
            "routine",
        )
    }

    fn to_csv(inspections: &[Inspection]) -> String {
        let mut out = Vec::new();
        write_csv(inspections, &mut out).expect("Failed to write CSV");
        String::from_utf8(out).expect("CSV is UTF-8")
    }

    #[test]
    fn test_union_collapses_duplicates() {
        let a = vec![inspection("A", 1, 90), inspection("B", 2, 80)];
        let b = vec![inspection("B", 2, 80), inspection("C", 3, 70)];

        let merged = union([a, b]);

        assert_eq!(merged.len(), 3);
        assert!(merged.contains(&inspection("B", 2, 80)));
    }

    #[test]
    fn test_sorted_is_idempotent() {
        let once = sorted(vec![
            inspection("C", 3, 70),
            inspection("A", 1, 90),
            inspection("B", 1, 80),
        ]);
        let twice = sorted(once.clone());

        assert_eq!(once, twice);
        assert_eq!(once[0], inspection("B", 1, 80));
        assert_eq!(once[1], inspection("A", 1, 90));
    }

    #[test]
    fn test_write_csv_header_and_rows() {
        let csv = to_csv(&[inspection("Joe's, Diner", 15, 92)]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines,
            vec![
                "name,address_street,address_suite,address_zip,inspection_date,inspection_score,inspection_type",
                "\"Joe's, Diner\",100 Main St,,75201,2015-01-15,92,routine",
            ]
        );
    }

    #[test]
    fn test_write_csv_empty_still_has_header() {
        let csv = to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_read_back_written_csv() {
        let original = vec![
            inspection("Joe's \"Famous\" Diner", 15, 92),
            inspection("Café", 16, 100),
        ];

        let read = read_csv(to_csv(&original).as_bytes()).expect("Failed to read CSV");
        assert_eq!(read, original);
    }

    #[test]
    fn test_read_csv_columns_in_any_order() {
        let input = "inspection_type,inspection_score,inspection_date,address_zip,address_suite,address_street,name\n\
                     routine,92,2015-01-15,75201,,100 Main St,A\n";

        let read = read_csv(input.as_bytes()).expect("Failed to read CSV");
        assert_eq!(read, vec![inspection("A", 15, 92)]);
    }

    #[test]
    fn test_read_csv_replaces_invalid_utf8() {
        let mut input = b"name,address_street,address_suite,address_zip,inspection_date,inspection_score,inspection_type\n".to_vec();
        input.extend_from_slice(b"Caf\xe9,100 Main St,,75201,2015-01-15,92,routine\n");

        let read = read_csv(input.as_slice()).expect("Failed to read CSV");
        assert_eq!(read[0].name(), "Caf\u{FFFD}");
    }

    #[test]
    fn test_read_csv_rejects_bad_score() {
        let input = "name,address_street,address_suite,address_zip,inspection_date,inspection_score,inspection_type\n\
                     A,100 Main St,,75201,2015-01-15,high,routine\n";

        let err = read_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::Parse {
                line: 2,
                source: ParseError::InvalidScore(_)
            }
        ));
    }

    #[test]
    fn test_read_csv_missing_column() {
        let input = "name,address_street\nA,100 Main St\n";

        let err = read_csv(input.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn("address_suite")));
    }

    #[test]
    fn test_merge_is_independent_of_input_order() {
        let first = to_csv(&[inspection("A", 1, 90), inspection("B", 2, 80)]);
        let second = to_csv(&[inspection("B", 2, 80), inspection("A", 1, 90)]);

        let load = |csv: &str| read_csv(csv.as_bytes()).expect("Failed to read CSV");

        let forward = to_csv(&sorted(union([load(&first), load(&second)])));
        let backward = to_csv(&sorted(union([load(&second), load(&first)])));

        assert_eq!(forward, backward);
        assert_eq!(forward.lines().count(), 3);
    }
}
