pub mod dataset;
mod parser;
pub mod scraper;
pub mod types;
pub mod utils;

pub use parser::{ResultsPage, ScrapeError, parse_results_page};
pub use scraper::{PageFetcher, ScraperError, WebScraper};
pub use types::{Inspection, InspectionRow, RawInspection};

/// City of Dallas food inspection search endpoint.
pub(crate) const BASE_URL: &str =
    "http://www2.dallascityhall.com/FoodInspection/SearchScoresAction.cfm";

/// Query parameter selecting a page of an existing search.
pub(crate) const PAGE_PARAM: &str = "PageNum_q_search";
