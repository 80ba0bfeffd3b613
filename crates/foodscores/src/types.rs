use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Column names of the CSV representation, in output order.
pub const FIELDNAMES: [&str; 7] = [
    "name",
    "address_street",
    "address_suite",
    "address_zip",
    "inspection_date",
    "inspection_score",
    "inspection_type",
];

/// Date format used by the inspection search results (`01/15/2015`).
pub const SCRAPED_DATE_FORMAT: &str = "%m/%d/%Y";

/// Date format used in CSV files (`2015-01-15`).
pub const CSV_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid inspection date '{0}', expected MM/DD/YYYY")]
    InvalidDate(String),
    #[error("Invalid inspection score '{0}'")]
    InvalidScore(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid inspection_date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Invalid inspection_score '{0}'")]
    InvalidScore(String),
}

/// A single inspection of an establishment.
///
/// Two inspections are equal when every field is equal. They sort by
/// `(date, inspection_type, score, name, address, suite, zipcode)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Inspection {
    name: String,
    address: String,
    suite: String,
    zipcode: String,
    date: NaiveDate,
    score: i32,
    inspection_type: String,
}

impl Inspection {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        suite: impl Into<String>,
        zipcode: impl Into<String>,
        date: NaiveDate,
        score: i32,
        inspection_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            suite: suite.into(),
            zipcode: zipcode.into(),
            date,
            score,
            inspection_type: inspection_type.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn zipcode(&self) -> &str {
        &self.zipcode
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn inspection_type(&self) -> &str {
        &self.inspection_type
    }

    /// Hash over all seven fields that does not vary between processes, so
    /// batches produced by separate runs agree on identity.
    pub fn identity_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn to_row(&self) -> InspectionRow {
        InspectionRow {
            name: self.name.clone(),
            address_street: self.address.clone(),
            address_suite: self.suite.clone(),
            address_zip: self.zipcode.clone(),
            inspection_date: self.date.format(CSV_DATE_FORMAT).to_string(),
            inspection_score: self.score.to_string(),
            inspection_type: self.inspection_type.clone(),
        }
    }

    pub fn from_row(row: InspectionRow) -> Result<Self, ParseError> {
        let date = NaiveDate::parse_from_str(&row.inspection_date, CSV_DATE_FORMAT)
            .map_err(|_| ParseError::InvalidDate(row.inspection_date.clone()))?;
        let score = row
            .inspection_score
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidScore(row.inspection_score.clone()))?;

        Ok(Self {
            name: row.name,
            address: row.address_street,
            suite: row.address_suite,
            zipcode: row.address_zip,
            date,
            score,
            inspection_type: row.inspection_type,
        })
    }

    fn sort_key(&self) -> (NaiveDate, &str, i32, &str, &str, &str, &str) {
        (
            self.date,
            &self.inspection_type,
            self.score,
            &self.name,
            &self.address,
            &self.suite,
            &self.zipcode,
        )
    }
}

impl Ord for Inspection {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Inspection {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Inspection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} · {}", self.date, self.name, self.address)?;
        if !self.suite.is_empty() {
            write!(f, " #{}", self.suite)?;
        }
        write!(
            f,
            ", {} · {} · {}",
            self.zipcode, self.inspection_type, self.score
        )
    }
}

impl TryFrom<InspectionRow> for Inspection {
    type Error = ParseError;

    fn try_from(row: InspectionRow) -> Result<Self, Self::Error> {
        Inspection::from_row(row)
    }
}

/// The flat text form of an [`Inspection`] as it appears in CSV and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRow {
    pub name: String,
    pub address_street: String,
    pub address_suite: String,
    pub address_zip: String,
    pub inspection_date: String,
    pub inspection_score: String,
    pub inspection_type: String,
}

/// One row of the search results table, keyed by the site's column labels and
/// already cleaned, but not yet coerced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawInspection {
    pub name: String,
    pub address: String,
    pub suite: String,
    pub zip: String,
    pub inspected: String,
    pub score: String,
    pub inspection_type: String,
}

impl TryFrom<RawInspection> for Inspection {
    type Error = ValidationError;

    fn try_from(raw: RawInspection) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(raw.inspected.trim(), SCRAPED_DATE_FORMAT)
            .map_err(|_| ValidationError::InvalidDate(raw.inspected.clone()))?;
        let score = raw
            .score
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidScore(raw.score.clone()))?;

        Ok(Inspection {
            inspection_type: raw.inspection_type.to_lowercase(),
            name: raw.name,
            address: raw.address,
            suite: raw.suite,
            zipcode: raw.zip,
            date,
            score,
        })
    }
}
