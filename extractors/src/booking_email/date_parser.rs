use chrono::NaiveDate;
use regex::Regex;
use shared_types::PartialDate;
use std::sync::OnceLock;

/// Dated values further than this from the reference date are treated as garbled.
const PLAUSIBLE_WINDOW_DAYS: i64 = 730;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn month_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4})\b)?")
            .expect("invalid month-first date regex")
    })
}

fn day_first_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\b\.?(?:,?\s+(\d{4})\b)?")
            .expect("invalid day-first date regex")
    })
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("invalid ISO date regex"))
}

fn numeric_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").expect("invalid numeric date regex")
    })
}

/// Maps a 3-9 letter month name or abbreviation (`Sep`, `Sept`, `September`) to 1-12.
pub fn month_from_name(word: &str) -> Option<u32> {
    let word = word.trim_end_matches('.').to_lowercase();
    if !(3..=9).contains(&word.len()) {
        return None;
    }

    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(&word))
        .map(|idx| idx as u32 + 1)
}

fn build(year: Option<i32>, month: u32, day: u32) -> Option<PartialDate> {
    // 2000 is a leap year, so Feb 29 survives until a real year is known.
    NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, day)?;
    Some(PartialDate { year, month, day })
}

fn parse_year(text: &str) -> Option<i32> {
    let year: i32 = text.parse().ok()?;
    Some(if year < 100 { 2000 + year } else { year })
}

/// Every date found in `text`, in order of appearance. Overlapping matches
/// from different notations keep the leftmost one.
pub fn find_dates(text: &str) -> Vec<PartialDate> {
    let mut found: Vec<(usize, usize, PartialDate)> = Vec::new();

    for caps in month_first_re().captures_iter(text) {
        let Some(month) = month_from_name(&caps[1]) else {
            continue;
        };
        let day = caps[2].parse().unwrap_or(0);
        let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
        if let (Some(date), Some(whole)) = (build(year, month, day), caps.get(0)) {
            found.push((whole.start(), whole.end(), date));
        }
    }

    for caps in day_first_re().captures_iter(text) {
        let Some(month) = month_from_name(&caps[2]) else {
            continue;
        };
        let day = caps[1].parse().unwrap_or(0);
        let year = caps.get(3).and_then(|m| parse_year(m.as_str()));
        if let (Some(date), Some(whole)) = (build(year, month, day), caps.get(0)) {
            found.push((whole.start(), whole.end(), date));
        }
    }

    for caps in iso_re().captures_iter(text) {
        let year = parse_year(&caps[1]);
        let month = caps[2].parse().unwrap_or(0);
        let day = caps[3].parse().unwrap_or(0);
        if let (Some(date), Some(whole)) = (build(year, month, day), caps.get(0)) {
            found.push((whole.start(), whole.end(), date));
        }
    }

    for caps in numeric_re().captures_iter(text) {
        let month = caps[1].parse().unwrap_or(0);
        let day = caps[2].parse().unwrap_or(0);
        let year = parse_year(&caps[3]);
        if let (Some(date), Some(whole)) = (build(year, month, day), caps.get(0)) {
            found.push((whole.start(), whole.end(), date));
        }
    }

    found.sort_by_key(|(start, end, _)| (*start, std::cmp::Reverse(*end)));

    let mut dates = Vec::new();
    let mut covered_until = 0;
    for (start, end, date) in found {
        if start < covered_until {
            continue;
        }
        covered_until = end;
        dates.push(date);
    }
    dates
}

/// First date in `text`.
pub fn parse_date_text(text: &str) -> Option<PartialDate> {
    find_dates(text).into_iter().next()
}

/// A dated value must lie within about two years of `reference`.
pub fn is_plausible(date: NaiveDate, reference: NaiveDate) -> bool {
    (date - reference).num_days().abs() <= PLAUSIBLE_WINDOW_DAYS
}

/// First date in `text`, rejected when it carries a year outside the plausible window.
pub fn parse_plausible_date(text: &str, reference: NaiveDate) -> Option<PartialDate> {
    let date = parse_date_text(text)?;
    match date.to_date() {
        Some(full) if !is_plausible(full, reference) => None,
        _ => Some(date),
    }
}
