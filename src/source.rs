use std::path::Path;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use log::info;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ApiError, StartupError};
use crate::models::{
    approval_label, status_label, ApprovalStatus, BookingRecord, BookingStatus, BookingUpdate, Client, NewBooking,
};

/// Supplies "now" to the classifier.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Where booking records come from.
pub trait BookingSource: Send + Sync {
    fn list_bookings(&self) -> Vec<BookingRecord>;
}

/// In-memory booking collection in insertion order
pub struct BookingStore {
    records: RwLock<Vec<BookingRecord>>,
}

impl BookingSource for BookingStore {
    fn list_bookings(&self) -> Vec<BookingRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BookingStore {
    pub fn new(records: Vec<BookingRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn get(&self, id: &str) -> Option<BookingRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Adds a booking from the new-booking form. Date and time are read as UTC.
    pub fn create(&self, input: NewBooking, now: DateTime<Utc>) -> Result<BookingRecord, ApiError> {
        let client_name = required_text(&input.client_name, "client name")?;
        let service = required_text(&input.service, "service")?;
        let scheduled_at = parse_schedule(&input.date, &input.time)?;

        let record = BookingRecord {
            id: Uuid::new_v4().to_string(),
            client_name: Some(client_name.clone()),
            service_type: Some(service),
            status: Some(BookingStatus::Pending),
            approval_status: Some(ApprovalStatus::Pending),
            scheduled_at: Some(scheduled_at.to_rfc3339()),
            revenue: None,
            created_at: now.to_rfc3339(),
            notes: input.notes.filter(|notes| !notes.trim().is_empty()),
        };

        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        info!("Booking created: {} for {}", record.id, client_name);
        Ok(record)
    }

    /// Applies the edit form. The record is untouched unless every field validates.
    pub fn update(&self, id: &str, input: BookingUpdate) -> Result<BookingRecord, ApiError> {
        let client_name = input
            .client_name
            .as_deref()
            .map(|name| required_text(name, "client name"))
            .transpose()?;
        let service = input
            .service
            .as_deref()
            .map(|service| required_text(service, "service"))
            .transpose()?;
        let scheduled_at = match (input.date.as_deref(), input.time.as_deref()) {
            (Some(date), Some(time)) => Some(parse_schedule(date, time)?),
            (None, None) => None,
            _ => {
                return Err(ApiError::Validation(
                    "date and time must be changed together".to_string(),
                ))
            }
        };
        let status = match input.status {
            Some(raw) => match BookingStatus::from(raw) {
                BookingStatus::Unrecognized(other) => {
                    return Err(ApiError::Validation(format!("unknown booking status '{}'", other)))
                }
                known => Some(known),
            },
            None => None,
        };
        if let Some(revenue) = input.revenue {
            if !revenue.is_finite() || revenue < 0.0 {
                return Err(ApiError::Validation(format!(
                    "revenue must be a non-negative amount, got {}",
                    revenue
                )));
            }
        }

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| ApiError::BookingNotFound(id.to_string()))?;

        if let Some(name) = client_name {
            record.client_name = Some(name);
        }
        if let Some(service) = service {
            record.service_type = Some(service);
        }
        if let Some(scheduled_at) = scheduled_at {
            record.scheduled_at = Some(scheduled_at.to_rfc3339());
        }
        if let Some(status) = status {
            record.status = Some(status);
        }
        if let Some(revenue) = input.revenue {
            record.revenue = Some(revenue);
        }
        if let Some(notes) = input.notes {
            record.notes = Some(notes).filter(|notes| !notes.trim().is_empty());
        }

        info!("Booking {} updated ({})", id, status_label(record.status.as_ref()));
        Ok(record.clone())
    }

    /// Approve or reject. Only bookings still awaiting approval can change.
    pub fn set_approval(&self, id: &str, approval: ApprovalStatus) -> Result<BookingRecord, ApiError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| ApiError::BookingNotFound(id.to_string()))?;

        if !record.has_approval(&ApprovalStatus::Pending) {
            return Err(ApiError::Validation(format!(
                "booking {} is not awaiting approval ({})",
                id,
                approval_label(record.approval_status.as_ref())
            )));
        }

        info!("Booking {} approval set to {}", id, approval.label());
        record.approval_status = Some(approval);
        Ok(record.clone())
    }

    pub fn delete(&self, id: &str) -> Result<BookingRecord, ApiError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let idx = records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| ApiError::BookingNotFound(id.to_string()))?;

        let removed = records.remove(idx);
        info!("Booking deleted: {} ({})", id, status_label(removed.status.as_ref()));
        Ok(removed)
    }
}

fn required_text(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Form date (`YYYY-MM-DD`) and time (`HH:MM`) as a UTC instant.
fn parse_schedule(date: &str, time: &str) -> Result<DateTime<Utc>, ApiError> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("date must be YYYY-MM-DD, got '{}'", date)))?;
    let at = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| ApiError::Validation(format!("time must be HH:MM, got '{}'", time)))?;
    Ok(day.and_time(at).and_utc())
}

/// In-memory client directory
pub struct ClientStore {
    clients: RwLock<Vec<Client>>,
}

impl ClientStore {
    pub fn new(clients: Vec<Client>) -> Self {
        Self {
            clients: RwLock::new(clients),
        }
    }

    pub fn list_clients(&self) -> Vec<Client> {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn delete(&self, id: &str) -> Result<Client, ApiError> {
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        let idx = clients
            .iter()
            .position(|client| client.id == id)
            .ok_or_else(|| ApiError::ClientNotFound(id.to_string()))?;

        let removed = clients.remove(idx);
        info!("Client deleted: {} ({})", removed.full_name, removed.id);
        Ok(removed)
    }
}

/// Reads a JSON array seed file.
pub fn load_json_seed<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StartupError> {
    let contents = std::fs::read_to_string(path).map_err(|source| StartupError::SeedRead {
        path: path.to_path_buf(),
        source,
    })?;
    let items: Vec<T> = serde_json::from_str(&contents).map_err(|source| StartupError::SeedParse {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loaded {} records from {}", items.len(), path.display());
    Ok(items)
}

/// Demo bookings scheduled relative to `now`.
pub fn demo_bookings(now: DateTime<Utc>) -> Vec<BookingRecord> {
    let created_at = now.to_rfc3339();
    let demo = |id: &str, client: &str, service: &str, status, approval, offset_days: i64, revenue: f64| {
        BookingRecord {
            id: id.to_string(),
            client_name: Some(client.to_string()),
            service_type: Some(service.to_string()),
            status: Some(status),
            approval_status: Some(approval),
            scheduled_at: Some((now + Duration::days(offset_days)).to_rfc3339()),
            revenue: Some(revenue),
            created_at: created_at.clone(),
            notes: None,
        }
    };

    vec![
        demo("1", "Ambassador Johnson", "Diplomatic Meeting", BookingStatus::Confirmed, ApprovalStatus::Approved, 7, 150000.0),
        demo("2", "Minister Chen", "State Reception", BookingStatus::Pending, ApprovalStatus::Pending, 14, 250000.0),
        demo("3", "Sarah Williams", "Corporate Event", BookingStatus::Completed, ApprovalStatus::Approved, -7, 180000.0),
    ]
}

pub fn demo_clients() -> Vec<Client> {
    let client = |id: &str, name: &str, email: &str, phone: &str, company: &str, notes: &str, created_at: &str| Client {
        id: id.to_string(),
        full_name: name.to_string(),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        company: Some(company.to_string()),
        notes: Some(notes.to_string()),
        created_at: created_at.to_string(),
    };

    vec![
        client(
            "1",
            "Ambassador Johnson",
            "ambassador.johnson@embassy.com",
            "+1 (555) 123-4567",
            "Embassy of Example",
            "High-profile diplomatic meetings",
            "2024-01-15T10:00:00Z",
        ),
        client(
            "2",
            "CEO Sarah Williams",
            "sarah.williams@megacorp.com",
            "+1 (555) 234-5678",
            "MegaCorp International",
            "Corporate events and business summits",
            "2024-01-16T10:00:00Z",
        ),
        client(
            "3",
            "Minister David Chen",
            "minister.chen@gov.example",
            "+1 (555) 345-6789",
            "Ministry of Trade",
            "Government protocol events",
            "2024-01-17T10:00:00Z",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn form(date: &str, time: &str) -> NewBooking {
        NewBooking {
            client_name: "Governor Otieno".to_string(),
            service: "protocol".to_string(),
            date: date.to_string(),
            time: time.to_string(),
            notes: Some("Motorcade at the north gate".to_string()),
        }
    }

    #[test]
    fn test_create_booking() {
        let store = BookingStore::new(Vec::new());
        let record = store.create(form("2024-06-10", "18:30"), now()).unwrap();

        assert_eq!(record.status, Some(BookingStatus::Pending));
        assert_eq!(record.approval_status, Some(ApprovalStatus::Pending));
        assert_eq!(record.scheduled_at.as_deref(), Some("2024-06-10T18:30:00+00:00"));
        assert_eq!(record.created_at, now().to_rfc3339());
        assert_eq!(record.revenue, None);
        assert!(Uuid::parse_str(&record.id).is_ok());
        assert_eq!(store.list_bookings(), vec![record]);
    }

    #[test]
    fn test_create_rejects_bad_form() {
        let store = BookingStore::new(Vec::new());

        let mut missing_name = form("2024-06-10", "18:30");
        missing_name.client_name = "   ".to_string();
        assert!(matches!(store.create(missing_name, now()), Err(ApiError::Validation(_))));
        assert!(matches!(store.create(form("10/06/2024", "18:30"), now()), Err(ApiError::Validation(_))));
        assert!(matches!(store.create(form("2024-06-10", "25:00"), now()), Err(ApiError::Validation(_))));
        assert!(store.list_bookings().is_empty());
    }

    #[test]
    fn test_approve_reject_delete() {
        let store = BookingStore::new(demo_bookings(now()));

        let approved = store.set_approval("2", ApprovalStatus::Approved).unwrap();
        assert_eq!(approved.approval_status, Some(ApprovalStatus::Approved));
        assert_eq!(store.get("2").unwrap().approval_status, Some(ApprovalStatus::Approved));

        // Already decided bookings stay as they are.
        assert!(matches!(store.set_approval("2", ApprovalStatus::Rejected), Err(ApiError::Validation(_))));
        assert!(matches!(store.set_approval("1", ApprovalStatus::Rejected), Err(ApiError::Validation(_))));
        assert_eq!(store.get("1").unwrap().approval_status, Some(ApprovalStatus::Approved));

        let fresh = store.create(form("2024-06-10", "18:30"), now()).unwrap();
        let rejected = store.set_approval(&fresh.id, ApprovalStatus::Rejected).unwrap();
        assert_eq!(rejected.approval_status, Some(ApprovalStatus::Rejected));
        store.delete(&fresh.id).unwrap();

        let removed = store.delete("3").unwrap();
        assert_eq!(removed.id, "3");
        let remaining: Vec<String> = store.list_bookings().into_iter().map(|r| r.id).collect();
        assert_eq!(remaining, vec!["1", "2"]);

        assert!(matches!(store.delete("3"), Err(ApiError::BookingNotFound(_))));
        assert!(matches!(
            store.set_approval("missing", ApprovalStatus::Approved),
            Err(ApiError::BookingNotFound(_))
        ));
    }

    #[test]
    fn test_update_booking() {
        let store = BookingStore::new(demo_bookings(now()));
        let edit = BookingUpdate {
            client_name: Some(" Ambassador R. Johnson ".to_string()),
            date: Some("2024-05-20".to_string()),
            time: Some("10:00".to_string()),
            status: Some("completed".to_string()),
            revenue: Some(175000.0),
            ..BookingUpdate::default()
        };

        let updated = store.update("1", edit).unwrap();

        assert_eq!(updated.client_name.as_deref(), Some("Ambassador R. Johnson"));
        assert_eq!(updated.service_type.as_deref(), Some("Diplomatic Meeting"));
        assert_eq!(updated.scheduled_at.as_deref(), Some("2024-05-20T10:00:00+00:00"));
        assert_eq!(updated.status, Some(BookingStatus::Completed));
        assert_eq!(updated.revenue, Some(175000.0));
        assert_eq!(updated.approval_status, Some(ApprovalStatus::Approved));
        assert_eq!(store.get("1"), Some(updated));
    }

    #[test]
    fn test_update_rejects_bad_edit_without_changes() {
        let store = BookingStore::new(demo_bookings(now()));
        let before = store.get("2").unwrap();

        let bad_edits = [
            BookingUpdate { service: Some(" ".to_string()), ..BookingUpdate::default() },
            BookingUpdate { date: Some("2024-07-01".to_string()), ..BookingUpdate::default() },
            BookingUpdate {
                date: Some("2024-07-01".to_string()),
                time: Some("7pm".to_string()),
                ..BookingUpdate::default()
            },
            BookingUpdate { status: Some("on-hold".to_string()), ..BookingUpdate::default() },
            BookingUpdate {
                status: Some("completed".to_string()),
                revenue: Some(-1.0),
                ..BookingUpdate::default()
            },
        ];
        for edit in bad_edits {
            assert!(matches!(store.update("2", edit), Err(ApiError::Validation(_))));
        }
        assert_eq!(store.get("2"), Some(before));

        assert!(matches!(
            store.update("missing", BookingUpdate::default()),
            Err(ApiError::BookingNotFound(_))
        ));
    }

    #[test]
    fn test_delete_client() {
        let store = ClientStore::new(demo_clients());
        assert_eq!(store.delete("2").unwrap().full_name, "CEO Sarah Williams");
        assert_eq!(store.list_clients().len(), 2);
        assert!(matches!(store.delete("2"), Err(ApiError::ClientNotFound(_))));
    }

    #[test]
    fn test_load_json_seed_tolerates_sparse_records() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"[
                {{"id": "a", "client_name": "Ambassador Johnson", "status": "confirmed", "scheduled_at": "2024-07-01T09:00:00Z", "revenue": 150000}},
                {{"id": "b", "status": "on-hold", "approval_status": null, "scheduled_at": null}}
            ]"#
        )
        .unwrap();

        let records: Vec<BookingRecord> = load_json_seed(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Some(BookingStatus::Confirmed));
        assert_eq!(records[0].revenue, Some(150000.0));
        assert_eq!(records[1].status, Some(BookingStatus::Unrecognized("on-hold".to_string())));
        assert_eq!(records[1].approval_status, None);
        assert_eq!(records[1].client_name, None);
        assert_eq!(records[1].recognized_revenue(), 0.0);
    }

    #[test]
    fn test_load_json_seed_errors() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "not json").unwrap();
        let parse = load_json_seed::<Client>(temp_file.path());
        assert!(matches!(parse, Err(StartupError::SeedParse { .. })));

        let missing = load_json_seed::<Client>(Path::new("/nonexistent/clients.json"));
        assert!(matches!(missing, Err(StartupError::SeedRead { .. })));
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(now()).now(), now());
    }
}
