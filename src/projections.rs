use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::debug;
use serde::{Serialize, Serializer};

use crate::models::{ApprovalStatus, BookingRecord, BookingStatus, BookingView, Client};


/// Parses a booking timestamp.
///
/// Accepts RFC 3339, ISO 8601 date-times with minute precision and a `Z` or
/// numeric offset, a naive `YYYY-MM-DDTHH:MM[:SS[.fff]]` read as UTC, or a
/// bare `YYYY-MM-DD` read as UTC midnight. Anything else yields `None`.
pub fn parse_scheduled_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%dT%H:%M%:z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // A `Z` suffix is UTC, same as no zone at all.
    let local = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(local, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Exact match against the record's status text.
    Exactly(String),
}

impl StatusFilter {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("") | Some("all") => StatusFilter::All,
            Some(status) => StatusFilter::Exactly(status.to_string()),
        }
    }

    fn matches(&self, record: &BookingRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Exactly(wanted) => record
                .status
                .as_ref()
                .is_some_and(|status| status.as_str() == wanted),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassificationFilters {
    /// Lowercased search term; empty matches everything.
    search_term: String,
    pub status: StatusFilter,
}

impl ClassificationFilters {
    pub fn new(search_term: Option<&str>, status: Option<&str>) -> Self {
        Self {
            search_term: search_term.unwrap_or_default().to_lowercase(),
            status: StatusFilter::parse(status),
        }
    }

    fn matches_search(&self, record: &BookingRecord) -> bool {
        if self.search_term.is_empty() {
            return true;
        }
        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&self.search_term))
        };
        contains(&record.client_name) || contains(&record.service_type)
    }

    fn matches(&self, record: &BookingRecord) -> bool {
        self.matches_search(record) && self.status.matches(record)
    }
}

/// Upcoming/previous buckets plus dashboard metrics
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ClassificationResult {
    #[serde(serialize_with = "serialize_labelled")]
    pub upcoming: Vec<BookingRecord>,
    #[serde(serialize_with = "serialize_labelled")]
    pub previous: Vec<BookingRecord>,
    pub total_events: usize,
    pub confirmed_events: usize,
    pub pending_approval: usize,
    pub upcoming_count: usize,
    pub completed_events: usize,
    pub total_revenue: f64,
}

fn serialize_labelled<S: Serializer>(records: &[BookingRecord], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(records.iter().cloned().map(BookingView::from))
}

/// Classifies bookings into upcoming and previous events relative to a
/// reference instant and derives summary metrics.
/// Holds only a borrow of the records; nothing is mutated or cached.
pub struct BookingClassifier<'a> {
    records: &'a [BookingRecord],
}

impl<'a> BookingClassifier<'a> {
    pub fn new(records: &'a [BookingRecord]) -> Self {
        Self { records }
    }

    /// Records passing the search and status filters, in input order.
    pub fn filtered(&self, filters: &ClassificationFilters) -> Vec<&'a BookingRecord> {
        self.records.iter().filter(|record| filters.matches(record)).collect()
    }

    /// `now` defaults to the wall clock when omitted.
    pub fn classify(&self, now: Option<DateTime<Utc>>, filters: &ClassificationFilters) -> ClassificationResult {
        let now = now.unwrap_or_else(Utc::now);

        let mut upcoming = Vec::new();
        let mut previous = Vec::new();
        for record in self.filtered(filters) {
            if is_upcoming(record, now) {
                upcoming.push(record.clone());
            } else {
                previous.push(record.clone());
            }
        }

        let completed: Vec<&BookingRecord> = previous
            .iter()
            .filter(|record| record.has_status(&BookingStatus::Completed))
            .collect();
        let total_revenue = completed.iter().map(|record| record.recognized_revenue()).sum();

        let result = ClassificationResult {
            total_events: self.records.len(),
            confirmed_events: self
                .records
                .iter()
                .filter(|record| record.has_status(&BookingStatus::Confirmed))
                .count(),
            pending_approval: self
                .records
                .iter()
                .filter(|record| record.has_approval(&ApprovalStatus::Pending))
                .count(),
            upcoming_count: upcoming.len(),
            completed_events: completed.len(),
            total_revenue,
            upcoming,
            previous,
        };

        debug!(
            "classified {} bookings at {}: {} upcoming, {} previous",
            result.total_events,
            now.to_rfc3339(),
            result.upcoming_count,
            result.previous.len()
        );

        result
    }
}

/// Scheduled at or after `now`. Missing or unparsable schedules are never upcoming.
fn is_upcoming(record: &BookingRecord, now: DateTime<Utc>) -> bool {
    let Some(raw) = record.scheduled_at.as_deref() else {
        return false;
    };
    match parse_scheduled_at(raw) {
        Some(scheduled) => scheduled >= now,
        None => {
            debug!("booking {} has unparsable scheduled_at {:?}", record.id, raw);
            false
        }
    }
}

/// Case-insensitive match on name, email, company or phone.
pub fn filter_clients<'a>(clients: &'a [Client], term: &str) -> Vec<&'a Client> {
    let term = term.to_lowercase();
    if term.is_empty() {
        return clients.iter().collect();
    }

    clients
        .iter()
        .filter(|client| {
            client.full_name.to_lowercase().contains(&term)
                || [&client.email, &client.company, &client.phone]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&term))
        })
        .collect()
}
