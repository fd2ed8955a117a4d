use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Showroom {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
    pub email: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub brand_ids: Vec<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShowroom {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
    pub email: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub brand_ids: Vec<i64>,
    pub is_active: bool,
}

impl NewShowroom {
    pub fn new(name: impl Into<String>, city: impl Into<String>) -> Self {
        NewShowroom {
            name: name.into(),
            address: String::new(),
            city: city.into(),
            state: String::new(),
            pincode: String::new(),
            phone: String::new(),
            email: String::new(),
            latitude: None,
            longitude: None,
            brand_ids: Vec::new(),
            is_active: true,
        }
    }
}
