//! Record collections gated by [`RecordFilter`](crate::RecordFilter).
//!
//! The list views (employees, attendance, requests) are fed by other query
//! components; the filter only needs the three organizational fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hrgate_core::EmployeeId;

/// A record placed in the organization by location, business unit and the
/// position of the employee it concerns.
pub trait ScopedRecord {
    fn location(&self) -> &str;
    fn business_unit(&self) -> &str;
    fn position(&self) -> &str;
}

impl<R: ScopedRecord + ?Sized> ScopedRecord for &R {
    fn location(&self) -> &str {
        (**self).location()
    }

    fn business_unit(&self) -> &str {
        (**self).business_unit()
    }

    fn position(&self) -> &str {
        (**self).position()
    }
}

/// Organizational placement shared by every record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub position: String,
    #[serde(default, alias = "sede")]
    pub location: String,
    #[serde(default)]
    pub business_unit: String,
}

impl Placement {
    pub fn new(position: impl Into<String>, location: impl Into<String>, business_unit: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            location: location.into(),
            business_unit: business_unit.into(),
        }
    }
}

impl ScopedRecord for Placement {
    fn location(&self) -> &str {
        &self.location
    }

    fn business_unit(&self) -> &str {
        &self.business_unit
    }

    fn position(&self) -> &str {
        &self.position
    }
}

macro_rules! impl_scoped_via_placement {
    ($t:ty) => {
        impl ScopedRecord for $t {
            fn location(&self) -> &str {
                &self.placement.location
            }

            fn business_unit(&self) -> &str {
                &self.placement.business_unit
            }

            fn position(&self) -> &str {
                &self.placement.position
            }
        }
    };
}

/// Employee list row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub full_name: String,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(default)]
    pub is_active: bool,
}

/// One attendance entry (a day's marks for one employee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: EmployeeId,
    pub full_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub check_in: Option<DateTime<Utc>>,
    #[serde(default)]
    pub check_out: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub placement: Placement,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Vacation,
    Leave,
    Document,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Employee request (vacation, leave, document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: Uuid,
    pub employee_id: EmployeeId,
    pub full_name: String,
    pub kind: RequestKind,
    pub status: RequestStatus,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    #[serde(flatten)]
    pub placement: Placement,
}

impl_scoped_via_placement!(EmployeeRecord);
impl_scoped_via_placement!(AttendanceRecord);
impl_scoped_via_placement!(RequestRecord);
