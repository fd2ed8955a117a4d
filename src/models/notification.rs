use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum!(NotificationType {
    TestRideConfirmed => "test_ride_confirmed",
    TestRideCancelled => "test_ride_cancelled",
    PriceDrop => "price_drop",
    NewBike => "new_bike",
    ReviewResponse => "review_response",
});

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user: i64,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_bike: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub related_bike_id: Option<i64>,
}
