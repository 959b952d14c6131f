use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Product,
    ServiceType,
    Address,
    Description,
    VisitDate,
    VisitTime,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Product,
        Field::ServiceType,
        Field::Address,
        Field::Description,
        Field::VisitDate,
        Field::VisitTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Product => "product",
            Field::ServiceType => "service_type",
            Field::Address => "address",
            Field::Description => "description",
            Field::VisitDate => "visit_date",
            Field::VisitTime => "visit_time",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Minimum length (in UTF-16 code units) and the message shown when it is not met.
    fn min_length(&self) -> (usize, &'static str) {
        match self {
            Field::Product => (1, "Product is required"),
            Field::ServiceType => (1, "Service type is required"),
            Field::Address => (5, "Address is required"),
            Field::Description => (10, "Description must be at least 10 characters"),
            Field::VisitDate => (1, "Please select a date"),
            Field::VisitTime => (1, "Please select a time"),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type FieldErrors = BTreeMap<Field, String>;

pub const INVALID_DATE_MESSAGE: &str = "Please select a valid date";
pub const INVALID_TIME_MESSAGE: &str = "Please enter time as HH:MM (24-hour)";

/// Raw, unvalidated contents of a booking form.
///
/// Snapshots are immutable from the outside: every edit goes through one of the
/// `with_*` handlers, which consume the snapshot and hand back the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingForm {
    pub product: String,
    pub service_type: String,
    pub address: String,
    pub description: String,
    pub visit_date: String,
    pub visit_time: String,
}

impl BookingForm {
    /// A fresh form with the visit date pre-filled to `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            visit_date: today.format(DATE_FORMAT).to_string(),
            ..Self::default()
        }
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Product => &self.product,
            Field::ServiceType => &self.service_type,
            Field::Address => &self.address,
            Field::Description => &self.description,
            Field::VisitDate => &self.visit_date,
            Field::VisitTime => &self.visit_time,
        }
    }

    pub fn with_field(mut self, field: Field, value: impl Into<String>) -> Self {
        let slot = match field {
            Field::Product => &mut self.product,
            Field::ServiceType => &mut self.service_type,
            Field::Address => &mut self.address,
            Field::Description => &mut self.description,
            Field::VisitDate => &mut self.visit_date,
            Field::VisitTime => &mut self.visit_time,
        };
        *slot = value.into();
        self
    }

    /// Date picker handler.
    pub fn with_visit_date(self, date: NaiveDate) -> Self {
        self.with_field(Field::VisitDate, date.format(DATE_FORMAT).to_string())
    }

    /// Time picker handler. Seconds are dropped.
    pub fn with_visit_time(self, time: NaiveTime) -> Self {
        self.with_field(Field::VisitTime, time.format(TIME_FORMAT).to_string())
    }

    /// Checks every field at once. Each field contributes at most one error.
    pub fn validate(&self) -> Result<BookingRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        for field in Field::ALL {
            let (min, message) = field.min_length();
            if self.get(field).encode_utf16().count() < min {
                errors.insert(field, message.to_string());
            }
        }

        let visit_date = if errors.contains_key(&Field::VisitDate) {
            None
        } else {
            let parsed = parse_visit_date(&self.visit_date);
            if parsed.is_none() {
                errors.insert(Field::VisitDate, INVALID_DATE_MESSAGE.to_string());
            }
            parsed
        };

        let visit_time = if errors.contains_key(&Field::VisitTime) {
            None
        } else {
            let parsed = parse_visit_time(&self.visit_time);
            if parsed.is_none() {
                errors.insert(Field::VisitTime, INVALID_TIME_MESSAGE.to_string());
            }
            parsed
        };

        match (visit_date, visit_time) {
            (Some(visit_date), Some(visit_time)) if errors.is_empty() => Ok(BookingRequest {
                product: self.product.clone(),
                service_type: self.service_type.clone(),
                address: self.address.clone(),
                description: self.description.clone(),
                visit_date,
                visit_time,
            }),
            _ => Err(errors),
        }
    }
}

/// Strict `YYYY-MM-DD`; chrono alone would also accept unpadded months and days.
fn parse_visit_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

fn parse_visit_time(s: &str) -> Option<NaiveTime> {
    let (hour, minute) = s.split_once(':')?;
    if hour.len() != 2 || minute.len() != 2 {
        return None;
    }
    if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

/// A booking form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub product: String,
    pub service_type: String,
    pub address: String,
    pub description: String,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
}

impl BookingRequest {
    pub fn visit_date_time(&self) -> String {
        format!(
            "{}T{}",
            self.visit_date.format(DATE_FORMAT),
            self.visit_time.format(TIME_FORMAT)
        )
    }

    pub fn to_payload(&self) -> ServiceRequestPayload {
        ServiceRequestPayload {
            product: self.product.clone(),
            service_type: self.service_type.clone(),
            address: self.address.clone(),
            description: self.description.clone(),
            visit_date: self.visit_date.format(DATE_FORMAT).to_string(),
            visit_time: self.visit_time.format(TIME_FORMAT).to_string(),
            visit_date_time: self.visit_date_time(),
        }
    }
}

/// JSON body of `POST /api/services`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequestPayload {
    pub product: String,
    pub service_type: String,
    pub address: String,
    pub description: String,
    pub visit_date: String,
    pub visit_time: String,
    pub visit_date_time: String,
}
