use std::cmp::Reverse;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    Popularity,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Date => "date",
            SortKey::Popularity => "popularity",
        }
    }

    /// Unknown or missing keys order by date.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim() {
            "popularity" => SortKey::Popularity,
            _ => SortKey::Date,
        }
    }
}

impl<'de> Deserialize<'de> for SortKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(SortKey::parse_lenient)
            .unwrap_or_default())
    }
}

pub trait Sortable {
    fn date(&self) -> NaiveDate;
    fn popularity(&self) -> Option<i64>;
}

impl Sortable for Event {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn popularity(&self) -> Option<i64> {
        self.popularity
    }
}

/// Returns a sorted copy. Both orderings are stable, so ties keep input order.
pub fn sort<R: Sortable + Clone>(records: &[R], key: SortKey) -> Vec<R> {
    let mut out = records.to_vec();
    match key {
        SortKey::Date => out.sort_by_key(|record| record.date()),
        // `None < Some(_)`, so reversing puts unscored records last.
        SortKey::Popularity => out.sort_by_key(|record| Reverse(record.popularity())),
    }
    out
}
