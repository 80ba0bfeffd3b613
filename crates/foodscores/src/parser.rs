use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{Inspection, RawInspection, ValidationError};
use crate::utils::{cell_text, clean_text};

use scraper::{ElementRef, Html, Selector};

pub(crate) const COL_NAME: &str = "Name";
pub(crate) const COL_ADDRESS: &str = "Address";
pub(crate) const COL_SUITE: &str = "Suite#";
pub(crate) const COL_ZIP: &str = "Zip";
pub(crate) const COL_INSPECTED: &str = "Inspected";
pub(crate) const COL_SCORE: &str = "Score";
pub(crate) const COL_INSPECTION_TYPE: &str = "Inspection Type";

static SEL_RESULTS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body > table").expect("invalid selector: results table"));
static SEL_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("invalid selector: link"));

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("No results table found in page")]
    MissingTable,
    #[error("Results table has no header row")]
    MissingHeader,
    #[error("Row {row} is missing column '{column}'")]
    MissingColumn { row: usize, column: &'static str },
    #[error("Row {row} is invalid: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: ValidationError,
    },
}

/// Inspections found on one page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsPage {
    pub inspections: Vec<Inspection>,
    pub has_next: bool,
}

pub fn parse_results_page(html: &str) -> Result<ResultsPage, ScrapeError> {
    let document = Html::parse_document(html);

    let table = document
        .select(&SEL_RESULTS_TABLE)
        .next()
        .ok_or(ScrapeError::MissingTable)?;

    let mut rows = table_rows(table).into_iter();

    let header: Vec<String> = rows
        .next()
        .map(|tr| row_cells(tr).map(|td| cell_text(td).trim().to_string()).collect())
        .unwrap_or_default();
    if header.iter().all(String::is_empty) {
        return Err(ScrapeError::MissingHeader);
    }

    let mut inspections = Vec::new();
    for (index, tr) in rows.enumerate() {
        let row = index + 1;
        let fields: HashMap<&str, String> = header
            .iter()
            .map(String::as_str)
            .zip(row_cells(tr).map(|td| clean_text(&cell_text(td))))
            .collect();

        let raw = raw_inspection(row, fields)?;
        let inspection =
            Inspection::try_from(raw).map_err(|source| ScrapeError::InvalidRow { row, source })?;
        log::trace!("{}", inspection);
        inspections.push(inspection);
    }

    let has_next = document
        .select(&SEL_LINK)
        .any(|a| a.text().collect::<String>() == "Next");

    Ok(ResultsPage {
        inspections,
        has_next,
    })
}

fn raw_inspection(
    row: usize,
    mut fields: HashMap<&str, String>,
) -> Result<RawInspection, ScrapeError> {
    let mut take = |column: &'static str| {
        fields
            .remove(column)
            .ok_or(ScrapeError::MissingColumn { row, column })
    };

    Ok(RawInspection {
        name: take(COL_NAME)?,
        address: take(COL_ADDRESS)?,
        suite: take(COL_SUITE)?,
        zip: take(COL_ZIP)?,
        inspected: take(COL_INSPECTED)?,
        score: take(COL_SCORE)?,
        inspection_type: take(COL_INSPECTION_TYPE)?,
    })
}

// html5ever inserts <tbody> around bare rows, so look one level down as well.
fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn row_cells<'a>(tr: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "<tr><td>Name</td><td>Address</td><td>Suite#</td><td>Zip</td>\
        <td>Inspected</td><td>Score</td><td>Inspection Type</td></tr>";

    fn page(rows: &str, next: bool) -> String {
        let nav = if next {
            r#"<a href="SearchScoresAction.cfm?PageNum_q_search=2">Next</a>"#
        } else {
            ""
        };
        format!(
            "<html><head><title>Food Inspection Scores</title></head><body>\
             <table>{HEADER}{rows}</table>{nav}</body></html>"
        )
    }

    #[test]
    fn test_parse_single_row() {
        let html = page(
            "<tr><td>Joe's Diner</td><td><a href=\"map.cfm\">100 Main St</a></td><td></td>\
             <td>75201</td><td>01/15/2015</td><td>92</td><td>Routine</td></tr>",
            false,
        );

        let results = parse_results_page(&html).expect("Failed to parse results page");

        assert_eq!(results.inspections.len(), 1);
        assert!(!results.has_next);

        let inspection = &results.inspections[0];
        assert_eq!(inspection.name(), "Joe's Diner");
        assert_eq!(inspection.address(), "100 Main St");
        assert_eq!(inspection.suite(), "");
        assert_eq!(inspection.zipcode(), "75201");
        assert_eq!(inspection.date(), NaiveDate::from_ymd_opt(2015, 1, 15).unwrap());
        assert_eq!(inspection.score(), 92);
        assert_eq!(inspection.inspection_type(), "routine");
    }

    #[test]
    fn test_parse_cleans_cells() {
        let html = page(
            "<tr><td>App#1234   Taco   Hut </td><td>  200 Elm\n St</td><td>B</td>\
             <td>75202</td><td>12/01/2014</td><td> 85 </td><td>COMPLAINT</td></tr>",
            true,
        );

        let results = parse_results_page(&html).expect("Failed to parse results page");

        assert!(results.has_next);
        let inspection = &results.inspections[0];
        assert_eq!(inspection.name(), "Taco Hut");
        assert_eq!(inspection.address(), "200 Elm St");
        assert_eq!(inspection.suite(), "B");
        assert_eq!(inspection.score(), 85);
        assert_eq!(inspection.inspection_type(), "complaint");
    }

    #[test]
    fn test_parse_header_only_page() {
        let results = parse_results_page(&page("", false)).expect("Failed to parse");
        assert!(results.inspections.is_empty());
    }

    #[test]
    fn test_missing_table() {
        let html = "<html><body><p>No records found</p></body></html>";
        let err = parse_results_page(html).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingTable));
    }

    #[test]
    fn test_missing_header() {
        let html = "<html><body><table></table></body></html>";
        let err = parse_results_page(html).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingHeader));
    }

    #[test]
    fn test_row_missing_column() {
        let html = page(
            "<tr><td>Joe's Diner</td><td>100 Main St</td><td></td><td>75201</td></tr>",
            false,
        );

        let err = parse_results_page(&html).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::MissingColumn {
                row: 1,
                column: "Inspected"
            }
        ));
    }

    #[test]
    fn test_row_with_bad_score() {
        let html = page(
            "<tr><td>Joe's Diner</td><td>100 Main St</td><td></td><td>75201</td>\
             <td>01/15/2015</td><td>N/A</td><td>Routine</td></tr>",
            false,
        );

        let err = parse_results_page(&html).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::InvalidRow {
                row: 1,
                source: ValidationError::InvalidScore(_)
            }
        ));
    }

    #[test]
    fn test_next_link_must_match_exactly() {
        let html = page("", false).replace(
            "</body>",
            r##"<a href="?PageNum_q_search=0">Previous</a><a href="#">Next page</a></body>"##,
        );

        let results = parse_results_page(&html).expect("Failed to parse");
        assert!(!results.has_next);
    }

    #[test]
    fn test_next_link_with_padding_is_not_next() {
        let html = page("", false).replace(
            "</body>",
            r#"<a href="?PageNum_q_search=2">Next </a></body>"#,
        );

        let results = parse_results_page(&html).expect("Failed to parse");
        assert!(!results.has_next);
    }
}
