use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum!(ListingCondition {
    Excellent => "excellent",
    Good => "good",
    Fair => "fair",
    Poor => "poor",
});

/// A user-submitted second-hand bike. Brand and model are free text, not
/// catalog references. Only approved listings are publicly visible.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UsedBikeListing {
    pub id: i64,
    pub user: i64,
    pub brand: String,
    pub model_name: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: u32,
    pub condition: ListingCondition,
    pub description: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub city: String,
    pub state: String,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUsedBikeListing {
    pub user_id: i64,
    pub brand: String,
    pub model_name: String,
    pub year: i32,
    pub price: Decimal,
    pub mileage: u32,
    pub condition: ListingCondition,
    pub description: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub city: String,
    pub state: String,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub is_approved: bool,
}
