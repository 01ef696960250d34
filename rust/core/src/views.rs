//! Display projections over record lists.
//!
//! Every function here returns a fresh `Vec` and never touches the list it
//! was given. Dates are parsed leniently; entries whose date is missing or
//! unparseable are placed after every dated entry, in their original relative
//! order, whichever direction is requested.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::prelude::*;
use crate::records::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Suffix used by the table API's `order=<field>.<dir>` parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses the date shapes the backend and the admin forms produce. Values with
/// an offset are normalized to UTC.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    // Postgres `timestamptz` text form, e.g. `2024-03-01 10:00:00+00`.
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_utc());
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Records that have a natural display date.
pub trait Dated {
    fn date_key(&self) -> Option<&str>;
}

fn compare_dates(
    a: Option<NaiveDateTime>,
    b: Option<NaiveDateTime>,
    direction: SortDirection,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => direction.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sorted_by_date<R: Clone>(
    items: &[R],
    key: impl Fn(&R) -> Option<&str>,
    direction: SortDirection,
) -> Vec<R> {
    let mut keyed: Vec<(Option<NaiveDateTime>, &R)> = items
        .iter()
        .map(|item| (key(item).and_then(parse_date), item))
        .collect();
    // `sort_by` is stable, which keeps undated entries deterministic.
    keyed.sort_by(|(a, _), (b, _)| compare_dates(*a, *b, direction));
    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

pub fn ascending_by_date<R: Dated + Clone>(items: &[R]) -> Vec<R> {
    sorted_by_date(items, R::date_key, SortDirection::Ascending)
}

pub fn descending_by_date<R: Dated + Clone>(items: &[R]) -> Vec<R> {
    sorted_by_date(items, R::date_key, SortDirection::Descending)
}

pub fn filtered<R: Clone>(items: &[R], predicate: impl Fn(&R) -> bool) -> Vec<R> {
    items.iter().filter(|item| predicate(item)).cloned().collect()
}

/// The first `limit` events of the ascending schedule.
pub fn upcoming(events: &[Event], limit: usize) -> Vec<Event> {
    let mut schedule = ascending_by_date(events);
    schedule.truncate(limit);
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: &'static str,
        date: &'static str,
    }

    impl Dated for Item {
        fn date_key(&self) -> Option<&str> {
            Some(self.date)
        }
    }

    fn item(name: &'static str, date: &'static str) -> Item {
        Item { name, date }
    }

    fn names(items: &[Item]) -> Vec<&'static str> {
        items.iter().map(|i| i.name).collect()
    }

    #[test]
    fn ascending_and_descending() {
        let list = vec![item("march", "2024-03-01"), item("january", "2024-01-01")];

        assert_eq!(names(&ascending_by_date(&list)), vec!["january", "march"]);
        assert_eq!(names(&descending_by_date(&list)), vec!["march", "january"]);
        // The source list is untouched.
        assert_eq!(names(&list), vec!["march", "january"]);
    }

    #[test]
    fn mixed_formats_compare_as_instants() {
        let list = vec![
            item("evening", "2024-03-01T20:00"),
            item("morning", "2024-03-01T09:30:00+00:00"),
            item("midnight", "2024-03-01"),
            item("db", "2024-02-29 23:00:00+00"),
        ];
        assert_eq!(
            names(&ascending_by_date(&list)),
            vec!["db", "midnight", "morning", "evening"]
        );
    }

    #[test]
    fn unparseable_dates_sort_last_and_stay_stable() {
        let list = vec![
            item("bad-1", "next sunday"),
            item("late", "2024-05-01"),
            item("empty", ""),
            item("early", "2024-01-01"),
            item("bad-2", "2024-13-45"),
        ];

        let asc = ascending_by_date(&list);
        assert_eq!(names(&asc), vec!["early", "late", "bad-1", "empty", "bad-2"]);
        let desc = descending_by_date(&list);
        assert_eq!(names(&desc), vec!["late", "early", "bad-1", "empty", "bad-2"]);

        for _ in 0..3 {
            assert_eq!(ascending_by_date(&list), asc);
            assert_eq!(descending_by_date(&list), desc);
        }
    }

    #[test]
    fn custom_key_and_filter() {
        let list = vec![item("a", "2024-02-01"), item("b", "2023-02-01")];
        let sorted = sorted_by_date(&list, |i| Some(i.date), SortDirection::Ascending);
        assert_eq!(names(&sorted), vec!["b", "a"]);

        let recent = filtered(&list, |i| i.date.starts_with("2024"));
        assert_eq!(names(&recent), vec!["a"]);
    }

    #[test]
    fn upcoming_takes_the_earliest_events() {
        let events: Vec<Event> = ["2024-06-01", "2024-01-10", "2024-03-05", "2024-02-20"]
            .iter()
            .enumerate()
            .map(|(i, date)| Event {
                id: (i as i64).into(),
                title: format!("event {i}"),
                date: date.to_string(),
                ..Default::default()
            })
            .collect();

        let dates: Vec<String> = upcoming(&events, 3).into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec!["2024-01-10", "2024-02-20", "2024-03-05"]);
        assert_eq!(upcoming(&events, 10).len(), 4);
    }

    #[test]
    fn parse_date_shapes() {
        assert!(parse_date("2024-03-01").is_some());
        assert!(parse_date("2024-03-01T19:30").is_some());
        assert!(parse_date("2024-03-01T19:30:00.123456").is_some());
        assert!(parse_date("2024-03-01T19:30:00Z").is_some());
        assert!(parse_date("  ").is_none());
        assert!(parse_date("01/03/2024").is_none());
    }
}
