//! Parser for the ECB euro foreign exchange reference rates XML.
//!
//! The document nests one `Cube time="YYYY-MM-DD"` element per business day,
//! each holding `Cube currency=".." rate=".."` children:
//!
//! ```xml
//! <gesmes:Envelope xmlns:gesmes="..." xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
//!   <Cube>
//!     <Cube time="2023-01-03">
//!       <Cube currency="USD" rate="1.0545"/>
//!     </Cube>
//!   </Cube>
//! </gesmes:Envelope>
//! ```
//!
//! Elements are matched on their local name, so namespace prefixes are irrelevant.

use crate::core::currency::CurrencySet;
use crate::core::snapshot::normalize_code;
use chrono::NaiveDate;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::{debug, trace};

pub type RatesByDate = BTreeMap<NaiveDate, BTreeMap<String, Decimal>>;

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("document has no root element")]
    NoRoot,

    #[error("document ended with {0} unclosed element(s)")]
    Truncated(usize),
}

/// Result of parsing a feed document.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    /// Date groups encountered in the document, in or out of the window.
    pub groups_seen: usize,
    pub rates: RatesByDate,
}

struct OpenGroup {
    /// `None` when the group is skipped: bad date or outside the window.
    date: Option<NaiveDate>,
    depth: usize,
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn group_date(element: &BytesStart, window: &RangeInclusive<NaiveDate>) -> Option<NaiveDate> {
    let time = attribute(element, b"time")?;
    let date = match NaiveDate::parse_from_str(&time, "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            debug!("Skipping date group with unparseable time '{}': {}", time, e);
            return None;
        }
    };
    window.contains(&date).then_some(date)
}

fn currency_entry(element: &BytesStart, currencies: &CurrencySet) -> Option<(String, Decimal)> {
    let code = normalize_code(&attribute(element, b"currency")?);
    if !currencies.contains(&code) {
        trace!("Skipping unrecognized currency {}", code);
        return None;
    }
    let rate = attribute(element, b"rate")?;
    match Decimal::from_str_exact(&rate) {
        Ok(rate) => Some((code, rate)),
        Err(e) => {
            debug!("Skipping {} with unparseable rate '{}': {}", code, rate, e);
            None
        }
    }
}

/// Collects the rates of every date group inside `window`, keeping only
/// `currencies`.
///
/// Broken groups and entries are skipped. Only a document that is not
/// well-formed XML fails. A date listed more than once is merged, with later
/// entries winning per currency. An in-window group without any recognized
/// currency still yields an (empty) entry for its date.
pub fn parse_feed(
    document: &[u8],
    window: &RangeInclusive<NaiveDate>,
    currencies: &CurrencySet,
) -> Result<ParsedFeed, FeedParseError> {
    let mut reader = Reader::from_reader(document);
    reader.trim_text(true);

    let mut parsed = ParsedFeed::default();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut group: Option<OpenGroup> = None;

    loop {
        buf.clear();
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| FeedParseError::Xml {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;

        let (element, element_depth, is_empty) = match &event {
            Event::Start(e) => {
                depth += 1;
                (e, depth, false)
            }
            Event::Empty(e) => (e, depth + 1, true),
            Event::End(_) => {
                if group.as_ref().is_some_and(|g| g.depth == depth) {
                    group = None;
                }
                depth = depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };
        seen_root = true;

        if element.local_name().as_ref() == b"Cube" {
            if element.try_get_attribute("time").ok().flatten().is_some() {
                if group.is_none() {
                    parsed.groups_seen += 1;
                    let date = group_date(element, window);
                    if let Some(date) = date {
                        parsed.rates.entry(date).or_default();
                    }
                    if !is_empty {
                        group = Some(OpenGroup {
                            date,
                            depth: element_depth,
                        });
                    }
                }
            } else if let Some(OpenGroup {
                date: Some(date),
                depth: group_depth,
            }) = &group
            {
                if element_depth == group_depth + 1 {
                    if let Some((code, rate)) = currency_entry(element, currencies) {
                        parsed.rates.entry(*date).or_default().insert(code, rate);
                    }
                }
            }
        }
    }

    if !seen_root {
        return Err(FeedParseError::NoRoot);
    }
    if depth != 0 {
        return Err(FeedParseError::Truncated(depth));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gesmes:Envelope xmlns:gesmes="http://www.gesmes.org/xml/2002-08-01" xmlns="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
<gesmes:subject>Reference rates</gesmes:subject>
<gesmes:Sender><gesmes:name>European Central Bank</gesmes:name></gesmes:Sender>
<Cube>"#;
    const FOOTER: &str = "</Cube>\n</gesmes:Envelope>";

    fn document(groups: &str) -> String {
        format!("{HEADER}\n{groups}\n{FOOTER}")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn window() -> RangeInclusive<NaiveDate> {
        date(2023, 1, 1)..=date(2023, 1, 31)
    }

    fn currencies() -> CurrencySet {
        CurrencySet::new(["USD", "GBP", "JPY"])
    }

    #[test]
    fn test_parses_groups_and_filters_currencies() {
        let xml = document(
            r#"<Cube time="2023-01-03">
  <Cube currency="USD" rate="1.0545"/>
  <Cube currency="JPY" rate="140.660"/>
  <Cube currency="XAU" rate="0.0005"/>
</Cube>
<Cube time="2023-01-02">
  <Cube currency="usd" rate="1.0660"/>
</Cube>"#,
        );

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        assert_eq!(parsed.groups_seen, 2);
        assert_eq!(
            parsed.rates.keys().copied().collect::<Vec<_>>(),
            vec![date(2023, 1, 2), date(2023, 1, 3)]
        );

        let jan3 = &parsed.rates[&date(2023, 1, 3)];
        assert_eq!(jan3.len(), 2);
        assert_eq!(jan3["USD"], dec("1.0545"));
        assert_eq!(jan3["JPY"].to_string(), "140.660");
        assert!(!jan3.contains_key("XAU"));

        assert_eq!(parsed.rates[&date(2023, 1, 2)]["USD"], dec("1.0660"));
    }

    #[test]
    fn test_window_is_inclusive() {
        let xml = document(
            r#"<Cube time="2022-12-31"><Cube currency="USD" rate="1.0666"/></Cube>
<Cube time="2023-01-01"><Cube currency="USD" rate="1.1"/></Cube>
<Cube time="2023-01-31"><Cube currency="USD" rate="1.2"/></Cube>
<Cube time="2023-02-01"><Cube currency="USD" rate="1.3"/></Cube>"#,
        );

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        assert_eq!(parsed.groups_seen, 4);
        assert_eq!(
            parsed.rates.keys().copied().collect::<Vec<_>>(),
            vec![date(2023, 1, 1), date(2023, 1, 31)]
        );
    }

    #[test]
    fn test_inverted_window_yields_nothing() {
        let xml = document(r#"<Cube time="2023-01-02"><Cube currency="USD" rate="1.0660"/></Cube>"#);
        let inverted = date(2023, 1, 31)..=date(2023, 1, 1);

        let parsed = parse_feed(xml.as_bytes(), &inverted, &currencies()).unwrap();
        assert!(parsed.rates.is_empty());
    }

    #[test]
    fn test_broken_groups_and_entries_are_skipped() {
        let xml = document(
            r#"<Cube time="not-a-date"><Cube currency="USD" rate="9.9"/></Cube>
<Cube time=""><Cube currency="USD" rate="9.9"/></Cube>
<Cube time="2023-01-04">
  <Cube currency="USD" rate="abc"/>
  <Cube currency="GBP"/>
  <Cube rate="1.0"/>
  <Cube currency="JPY" rate="141.2"/>
</Cube>"#,
        );

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        assert_eq!(parsed.rates.len(), 1);
        let jan4 = &parsed.rates[&date(2023, 1, 4)];
        assert_eq!(jan4.len(), 1);
        assert_eq!(jan4["JPY"], dec("141.2"));
    }

    #[test]
    fn test_group_without_recognized_currency_is_kept_empty() {
        let xml = document(
            r#"<Cube time="2023-01-05"><Cube currency="XAU" rate="0.0005"/></Cube>
<Cube time="2023-01-06"/>"#,
        );

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        assert_eq!(parsed.rates.len(), 2);
        assert!(parsed.rates[&date(2023, 1, 5)].is_empty());
        assert!(parsed.rates[&date(2023, 1, 6)].is_empty());
    }

    #[test]
    fn test_repeated_date_is_merged() {
        let xml = document(
            r#"<Cube time="2023-01-02"><Cube currency="USD" rate="1.0660"/></Cube>
<Cube time="2023-01-02"><Cube currency="GBP" rate="0.8800"/><Cube currency="USD" rate="1.0661"/></Cube>"#,
        );

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        let jan2 = &parsed.rates[&date(2023, 1, 2)];
        assert_eq!(jan2.len(), 2);
        assert_eq!(jan2["USD"], dec("1.0661"));
        assert_eq!(jan2["GBP"], dec("0.8800"));
    }

    #[test]
    fn test_only_direct_children_are_entries() {
        let xml = document(
            r#"<Cube time="2023-01-02">
  <Extra><Cube currency="GBP" rate="0.1"/></Extra>
  <Cube currency="USD" rate="1.0660"/>
</Cube>"#,
        );

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        let jan2 = &parsed.rates[&date(2023, 1, 2)];
        assert_eq!(jan2.keys().collect::<Vec<_>>(), vec!["USD"]);
    }

    #[test]
    fn test_prefixed_elements_are_recognized() {
        let xml = r#"<ex:Envelope xmlns:ex="http://www.ecb.int/vocabulary/2002-08-01/eurofxref">
<ex:Cube><ex:Cube time="2023-01-02"><ex:Cube currency="USD" rate="1.0660"/></ex:Cube></ex:Cube>
</ex:Envelope>"#;

        let parsed = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap();
        assert_eq!(parsed.rates[&date(2023, 1, 2)]["USD"], dec("1.0660"));
    }

    #[test]
    fn test_mismatched_tags_are_fatal() {
        let xml = r#"<Envelope><Cube><Cube time="2023-01-02"></Envelope>"#;
        let err = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap_err();
        assert!(matches!(err, FeedParseError::Xml { .. }), "{err:?}");
    }

    #[test]
    fn test_truncated_document_is_fatal() {
        let xml = r#"<Envelope><Cube><Cube time="2023-01-02"><Cube currency="USD" rate="1.0"/>"#;
        let err = parse_feed(xml.as_bytes(), &window(), &currencies()).unwrap_err();
        assert!(
            matches!(
                err,
                FeedParseError::Truncated(_) | FeedParseError::Xml { .. }
            ),
            "{err:?}"
        );
    }

    #[test]
    fn test_document_without_root_is_fatal() {
        let err = parse_feed(b"", &window(), &currencies()).unwrap_err();
        assert!(matches!(err, FeedParseError::NoRoot));

        let err = parse_feed(b"just some text", &window(), &currencies()).unwrap_err();
        assert!(matches!(err, FeedParseError::NoRoot));
    }
}
