use serde::{Deserialize, Serialize};

/// Booking lifecycle status.
///
/// Text outside the known set is kept verbatim so status filters can still
/// match it exactly; it renders as "Unknown".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Unrecognized(String),
}

impl BookingStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Unrecognized(_) => "Unknown",
        }
    }
}

impl From<String> for BookingStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => BookingStatus::Pending,
            "confirmed" => BookingStatus::Confirmed,
            "completed" => BookingStatus::Completed,
            "cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Unrecognized(value),
        }
    }
}

impl From<BookingStatus> for String {
    fn from(value: BookingStatus) -> Self {
        match value {
            BookingStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Approval workflow state, orthogonal to [`BookingStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Unrecognized(String),
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
            ApprovalStatus::Unrecognized(_) => "Unknown",
        }
    }
}

impl From<String> for ApprovalStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => ApprovalStatus::Pending,
            "approved" => ApprovalStatus::Approved,
            "rejected" => ApprovalStatus::Rejected,
            _ => ApprovalStatus::Unrecognized(value),
        }
    }
}

impl From<ApprovalStatus> for String {
    fn from(value: ApprovalStatus) -> Self {
        match value {
            ApprovalStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Label for a status that may be missing entirely.
pub fn status_label(status: Option<&BookingStatus>) -> &'static str {
    status.map(BookingStatus::label).unwrap_or("Unknown")
}

pub fn approval_label(status: Option<&ApprovalStatus>) -> &'static str {
    status.map(ApprovalStatus::label).unwrap_or("Unknown")
}

/// Booking record as supplied by the data source.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookingRecord {
    pub id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    /// Raw timestamp text; parsed during classification.
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookingRecord {
    /// Revenue with absent, negative and non-finite amounts coerced to 0.
    pub fn recognized_revenue(&self) -> f64 {
        match self.revenue {
            Some(amount) if amount.is_finite() && amount > 0.0 => amount,
            _ => 0.0,
        }
    }

    pub fn has_status(&self, status: &BookingStatus) -> bool {
        self.status.as_ref() == Some(status)
    }

    pub fn has_approval(&self, approval: &ApprovalStatus) -> bool {
        self.approval_status.as_ref() == Some(approval)
    }
}

/// Record as sent to the dashboard, with display labels for both statuses.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BookingView {
    #[serde(flatten)]
    pub record: BookingRecord,
    pub status_label: &'static str,
    pub approval_label: &'static str,
}

impl From<BookingRecord> for BookingView {
    fn from(record: BookingRecord) -> Self {
        Self {
            status_label: status_label(record.status.as_ref()),
            approval_label: approval_label(record.approval_status.as_ref()),
            record,
        }
    }
}

/// Form payload for a new booking
#[derive(Debug, Deserialize, Clone)]
pub struct NewBooking {
    pub client_name: String,
    pub service: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Edit form payload; absent fields are left unchanged.
/// `date` and `time` must be supplied together.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BookingUpdate {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Client directory entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Client {
    pub id: String,
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

/// API Response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn success(message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}
