use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::types::Inspection;

use chrono::NaiveDate;
use regex::Regex;
use scraper::ElementRef;

// Some establishment names carry an "App#<NNN>" token.
static RE_APP_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)app#\s*\d+").expect("invalid regex: app number"));

/// Strip `App#<digits>` tokens, collapse whitespace runs and trim.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let stripped = RE_APP_NUMBER.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of a results table cell.
///
/// Some cells wrap their value in a broken anchor, so when the first child
/// element is an `<a>` its text wins. Otherwise only the cell's own text nodes
/// are used.
pub fn cell_text(cell: ElementRef) -> String {
    if let Some(first) = cell.children().find_map(ElementRef::wrap)
        && first.value().name() == "a"
    {
        return first.text().collect();
    }

    let mut own = String::new();
    for text in cell.children().filter_map(|c| c.value().as_text()) {
        own.push_str(text);
    }
    own
}

#[derive(Debug, Default, Clone)]
pub struct InspectionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl InspectionFilter {
    pub fn apply(&self, mut inspections: Vec<Inspection>) -> Vec<Inspection> {
        if let Some(start) = self.start_date {
            inspections.retain(|i| i.date() >= start);
        }
        if let Some(end) = self.end_date {
            inspections.retain(|i| i.date() <= end);
        }
        inspections
    }

    pub fn validate(self) -> Result<Self, String> {
        if let Some(start) = self.start_date
            && let Some(end) = self.end_date
            && start > end
        {
            return Err(format!(
                "Start date ({start}) cannot be after end date ({end})"
            ));
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct InspectionStats {
    pub by_type: BTreeMap<String, usize>,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub total: usize,
}

impl InspectionStats {
    pub fn from_inspections(inspections: &[Inspection]) -> InspectionStats {
        let mut by_type = BTreeMap::new();
        for inspection in inspections {
            *by_type
                .entry(inspection.inspection_type().to_string())
                .or_insert(0) += 1;
        }

        InspectionStats {
            by_type,
            earliest: inspections.iter().map(Inspection::date).min(),
            latest: inspections.iter().map(Inspection::date).max(),
            total: inspections.len(),
        }
    }
}

impl std::fmt::Display for InspectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Statistics:")?;
        for (inspection_type, count) in &self.by_type {
            writeln!(f, "  {:<24} {}", inspection_type, count)?;
        }
        if let (Some(earliest), Some(latest)) = (self.earliest, self.latest) {
            writeln!(f, "  Date range:              {} to {}", earliest, latest)?;
        }
        write!(f, "  Total:                   {}", self.total)
    }
}
