//! The forum JSON export: five parallel maps keyed by row index, folded
//! into clean report entries. Rows with unparseable dates, over-long or
//! markup-only texts are skipped rather than failing the whole import.

use crate::error::IngestError;
use rowseq::{RowInput, Value};
use rowseq_text::TextFilter;
use serde::Deserialize;
use serde_json::Value as Json;
use std::{collections::BTreeMap, fs, path::Path};
use time::{Date, Month};

///
/// ForumExport
///

#[derive(Debug, Deserialize)]
pub struct ForumExport {
    date: BTreeMap<String, Json>,
    is_report: BTreeMap<String, Json>,
    main_place: BTreeMap<String, String>,
    place: BTreeMap<String, String>,
    text: BTreeMap<String, String>,
}

///
/// ReportEntry
///

#[derive(Clone, Debug, PartialEq)]
pub struct ReportEntry {
    pub date: i64,
    pub is_report: bool,
    pub main_place: String,
    pub place: String,
    pub text: String,
    pub emoticons: i64,
}

impl ReportEntry {
    #[must_use]
    pub fn to_row(&self) -> RowInput {
        RowInput::ByName(vec![
            ("date".to_string(), Value::Integer(self.date)),
            ("is_report".to_string(), Value::from(self.is_report)),
            ("main_place".to_string(), Value::from(self.main_place.clone())),
            ("place".to_string(), Value::from(self.place.clone())),
            ("text".to_string(), Value::from(self.text.clone())),
            ("emoticons".to_string(), Value::Integer(self.emoticons)),
        ])
    }
}

impl ForumExport {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let raw = fs::read_to_string(path)?;

        Ok(serde_json::from_str(&raw)?)
    }

    /// Fold the parallel maps into entries, dropping rows the export
    /// rules exclude. The maps key rows by stringified index, so keys
    /// sort numerically here to keep export order.
    #[must_use]
    pub fn entries(&self, filter: &TextFilter, max_text_len: usize) -> Vec<ReportEntry> {
        let mut indices: Vec<(usize, &String)> = self
            .date
            .keys()
            .filter_map(|key| Some((key.parse().ok()?, key)))
            .collect();
        indices.sort_unstable();

        let mut entries = Vec::new();

        for (_, key) in indices {
            let Some(raw_date) = self.date.get(key) else {
                continue;
            };
            let Some(text) = self.text.get(key) else {
                continue;
            };
            if text.chars().count() > max_text_len {
                continue;
            }
            let Some(date) = parse_date(raw_date) else {
                continue;
            };

            let (clean, emoticons) = filter.strip_markup(text);
            if clean.trim().is_empty() {
                continue;
            }

            entries.push(ReportEntry {
                date,
                is_report: self
                    .is_report
                    .get(key)
                    .is_some_and(|value| value.as_bool().unwrap_or(value.as_i64() == Some(1))),
                main_place: self.main_place.get(key).cloned().unwrap_or_default(),
                place: self.place.get(key).cloned().unwrap_or_default(),
                text: clean,
                emoticons: emoticons as i64,
            });
        }

        entries
    }
}

/// Dates arrive either as `dd.mm.yyyy` strings or as epoch milliseconds;
/// both normalize to epoch seconds.
fn parse_date(raw: &Json) -> Option<i64> {
    match raw {
        Json::String(text) => {
            let text = text.trim();
            let mut parts = text.split('.');
            let day: u8 = parts.next()?.parse().ok()?;
            let month: u8 = parts.next()?.parse().ok()?;
            let year: i32 = parts.next()?.parse().ok()?;
            if parts.next().is_some() {
                return None;
            }

            let date =
                Date::from_calendar_date(year, Month::try_from(month).ok()?, day).ok()?;

            Some(date.midnight().assume_utc().unix_timestamp())
        }
        Json::Number(number) => {
            let millis = number.as_i64().or_else(|| {
                let real = number.as_f64()?;
                Some(real as i64)
            })?;

            Some(millis / 1000)
        }
        _ => None,
    }
}
