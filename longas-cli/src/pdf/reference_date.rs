//! Reference date lookup in the first page's text

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::occupancy::{DATE_FORMAT, ReferenceDate};

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("date pattern is a valid regex"));

/// First `DD/MM/YYYY` in `text`, if it is a real calendar date
pub fn find_date(text: &str) -> Option<NaiveDate> {
    let found = DATE_PATTERN.find(text)?;
    match NaiveDate::parse_from_str(found.as_str(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(err) => {
            log::warn!(
                "Ignoring invalid date '{}' on first page: {}",
                found.as_str(),
                err
            );
            None
        }
    }
}

/// Date of the first page text, or `today` flagged as a fallback
pub fn resolve(first_page_text: Option<&str>, today: NaiveDate) -> ReferenceDate {
    match first_page_text.and_then(find_date) {
        Some(date) => ReferenceDate::from_document(date),
        None => {
            log::info!(
                "No reference date found in document, using {}",
                today.format(DATE_FORMAT)
            );
            ReferenceDate::fallback(today)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occupancy::DateSource;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn test_first_date_wins() {
        let text =
            "Relatório de Longa Permanência\nEmitido em 14/03/2025 08:12\nPeríodo 01/03/2025";
        let date = resolve(Some(text), today());

        assert_eq!(date.date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(date.source, DateSource::Document);
    }

    #[test]
    fn test_missing_date_falls_back_to_today() {
        let date = resolve(Some("Sem data nesta página"), today());
        assert_eq!(date.date, today());
        assert!(date.used_fallback());
    }

    #[test]
    fn test_unreadable_page_falls_back_to_today() {
        let date = resolve(None, today());
        assert_eq!(date, ReferenceDate::fallback(today()));
    }

    #[test]
    fn test_impossible_calendar_date_falls_back() {
        assert_eq!(find_date("gerado 31/02/2025"), None);
        assert!(resolve(Some("gerado 31/02/2025"), today()).used_fallback());
    }

    #[test]
    fn test_short_year_is_not_a_match() {
        assert_eq!(find_date("14/03/25"), None);
    }
}
