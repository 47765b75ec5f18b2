//! A small mail search language shared by every mail source.
//!
//! Terms are separated by whitespace and must all match:
//! `from:airbnb.com subject:"Reservation confirmed" newer_than:30d`.
//! Bare words or quoted phrases match the subject or body.

use chrono::{Duration, NaiveDate};
use extractors::parse_header_date;
use shared_types::RawMessage;

use super::MailError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    From(String),
    Subject(String),
    Text(String),
    NewerThanDays(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailQuery {
    terms: Vec<QueryTerm>,
}

/// Splits on whitespace, keeping double-quoted runs together.
fn tokenize(input: &str) -> Result<Vec<String>, MailError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err(MailError::Query(format!("unbalanced quote in {input:?}")));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_days(value: &str) -> Result<u32, MailError> {
    value
        .strip_suffix('d')
        .unwrap_or(value)
        .parse()
        .map_err(|_| MailError::Query(format!("newer_than expects days like 30d, got {value:?}")))
}

impl MailQuery {
    pub fn parse(input: &str) -> Result<Self, MailError> {
        let mut terms = Vec::new();
        for token in tokenize(input)? {
            let term = match token.split_once(':') {
                Some(("from", value)) if !value.is_empty() => QueryTerm::From(value.to_lowercase()),
                Some(("subject", value)) if !value.is_empty() => {
                    QueryTerm::Subject(value.to_lowercase())
                }
                Some(("newer_than", value)) => QueryTerm::NewerThanDays(parse_days(value)?),
                _ => QueryTerm::Text(token.to_lowercase()),
            };
            terms.push(term);
        }
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[QueryTerm] {
        &self.terms
    }

    pub fn newer_than_days(&self) -> Option<u32> {
        self.terms.iter().find_map(|term| match term {
            QueryTerm::NewerThanDays(days) => Some(*days),
            _ => None,
        })
    }

    /// Adds a recency window unless the query already has one.
    pub fn with_default_window(mut self, days: u32) -> Self {
        if self.newer_than_days().is_none() {
            self.terms.push(QueryTerm::NewerThanDays(days));
        }
        self
    }

    /// Evaluates the query against a fetched message. Messages without a
    /// parseable date are not excluded by the recency window.
    pub fn matches(&self, message: &RawMessage, today: NaiveDate) -> bool {
        let from = message.from.to_lowercase();
        let subject = message.subject.to_lowercase();

        self.terms.iter().all(|term| match term {
            QueryTerm::From(value) => from.contains(value.as_str()),
            QueryTerm::Subject(value) => subject.contains(value.as_str()),
            QueryTerm::Text(value) => {
                subject.contains(value.as_str()) || message.body.to_lowercase().contains(value.as_str())
            }
            QueryTerm::NewerThanDays(days) => match message.date.as_deref().and_then(parse_header_date) {
                Some(date) => date >= today - Duration::days(i64::from(*days)),
                None => true,
            },
        })
    }

    /// IMAP `SEARCH` criteria for this query.
    pub fn imap_criteria(&self, today: NaiveDate) -> String {
        let quote = |value: &str| format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""));

        let criteria: Vec<String> = self
            .terms
            .iter()
            .map(|term| match term {
                QueryTerm::From(value) => format!("FROM {}", quote(value)),
                QueryTerm::Subject(value) => format!("SUBJECT {}", quote(value)),
                QueryTerm::Text(value) => format!("TEXT {}", quote(value)),
                QueryTerm::NewerThanDays(days) => {
                    let since = today - Duration::days(i64::from(*days));
                    format!("SINCE {}", since.format("%d-%b-%Y"))
                }
            })
            .collect();

        if criteria.is_empty() {
            "ALL".to_string()
        } else {
            criteria.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 10).unwrap()
    }

    fn message(from: &str, subject: &str, date: Option<&str>) -> RawMessage {
        RawMessage {
            id: "m1".to_string(),
            from: from.to_string(),
            subject: subject.to_string(),
            body: "Confirmation code HMABC12345".to_string(),
            date: date.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_terms() {
        let query =
            MailQuery::parse(r#"from:airbnb.com subject:"Reservation confirmed" newer_than:30d code"#)
                .unwrap();
        assert_eq!(
            query.terms(),
            &[
                QueryTerm::From("airbnb.com".to_string()),
                QueryTerm::Subject("reservation confirmed".to_string()),
                QueryTerm::NewerThanDays(30),
                QueryTerm::Text("code".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(MailQuery::parse(r#"subject:"open"#).is_err());
        assert!(MailQuery::parse("newer_than:soon").is_err());
    }

    #[test]
    fn test_matches_all_terms() {
        let query = MailQuery::parse(r#"from:airbnb subject:"reservation confirmed" hmabc"#)
            .unwrap()
            .with_default_window(30);
        let hit = message(
            "Airbnb <automated@airbnb.com>",
            "Reservation confirmed - Ana arrives Sep 4",
            Some("Fri, 01 Aug 2025 09:15:00 -0700"),
        );
        assert!(query.matches(&hit, today()));

        let old = message(
            "Airbnb <automated@airbnb.com>",
            "Reservation confirmed - Ana arrives Sep 4",
            Some("Tue, 01 Apr 2025 09:15:00 -0700"),
        );
        assert!(!query.matches(&old, today()));

        let other_sender = message("noreply@vrbo.com", "Reservation confirmed", None);
        assert!(!query.matches(&other_sender, today()));
    }

    #[test]
    fn test_default_window_does_not_override() {
        let query = MailQuery::parse("newer_than:7d").unwrap().with_default_window(30);
        assert_eq!(query.newer_than_days(), Some(7));
        assert_eq!(query.terms().len(), 1);
    }

    #[test]
    fn test_imap_criteria() {
        let query = MailQuery::parse(r#"from:lodgify.com subject:"New Confirmed Booking" newer_than:10d"#)
            .unwrap();
        assert_eq!(
            query.imap_criteria(today()),
            r#"FROM "lodgify.com" SUBJECT "new confirmed booking" SINCE 31-Jul-2025"#
        );
        assert_eq!(MailQuery::default().imap_criteria(today()), "ALL");
    }
}
