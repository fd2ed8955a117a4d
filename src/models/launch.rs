use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A model a brand has announced but not yet released.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UpcomingLaunch {
    pub id: i64,
    pub brand: i64,
    pub brand_name: String,
    pub model_name: String,
    pub expected_price_min: Option<Decimal>,
    pub expected_price_max: Option<Decimal>,
    pub expected_launch_date: NaiveDate,
    pub description: String,
    pub image: Option<String>,
    pub features: Vec<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUpcomingLaunch {
    pub brand_id: i64,
    pub model_name: String,
    pub expected_price_min: Option<Decimal>,
    pub expected_price_max: Option<Decimal>,
    pub expected_launch_date: NaiveDate,
    pub description: String,
    pub image: Option<String>,
    pub features: Vec<String>,
    pub is_featured: bool,
}
