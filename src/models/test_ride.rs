use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

text_enum!(TestRideStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// A booked test ride, with the bike and showroom names resolved for display.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TestRide {
    pub id: i64,
    pub user: i64,
    pub bike: i64,
    pub bike_name: String,
    pub bike_brand: String,
    pub showroom: i64,
    pub showroom_name: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub status: TestRideStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTestRide {
    pub user_id: i64,
    pub bike_id: i64,
    pub showroom_id: i64,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub notes: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TestRidePatch {
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub status: Option<TestRideStatus>,
    pub notes: Option<String>,
}

impl TestRidePatch {
    pub fn is_empty(&self) -> bool {
        self.preferred_date.is_none()
            && self.preferred_time.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }
}

/// Who is asking for a status change. Owners may only cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAuthority {
    Staff,
    Owner,
}

impl StatusAuthority {
    /// Whether moving a ride from `from` to `to` is allowed. Re-sending the
    /// current status is never a change.
    pub fn permits(self, from: TestRideStatus, to: TestRideStatus) -> bool {
        from == to || self == StatusAuthority::Staff || to == TestRideStatus::Cancelled
    }
}

/// Result of applying a [`TestRidePatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum TestRideUpdate {
    Updated(TestRide),
    NotFound,
    StatusRefused {
        from: TestRideStatus,
        to: TestRideStatus,
    },
}
