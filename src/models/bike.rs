use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

text_enum!(FuelType {
    Petrol => "petrol",
    Electric => "electric",
    Hybrid => "hybrid",
});

text_enum!(BikeCondition {
    New => "new",
    Used => "used",
    CertifiedUsed => "certified_used",
});

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBrand {
    pub name: String,
    pub description: String,
}

impl NewBrand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// A catalog bike with its brand name and review aggregates joined in.
///
/// `average_rating` and `total_reviews` are computed by the store on every
/// read from the current review rows; they have no column of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct Bike {
    pub id: i64,
    pub brand_id: i64,
    pub brand_name: String,
    pub model_name: String,
    pub year: i32,
    pub price: Decimal,
    pub fuel_type: FuelType,
    pub engine_capacity: i32,
    pub mileage: Decimal,
    pub condition: BikeCondition,
    pub description: String,
    pub specifications: Map<String, Value>,
    pub features: Vec<String>,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_trending: bool,
    pub stock_quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub average_rating: f64,
    pub total_reviews: i64,
}

impl Bike {
    /// "<brand> <model>", as shown in suggestion dropdowns.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand_name, self.model_name)
    }
}

/// Listing projection of a bike.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BikeSummary {
    pub id: i64,
    pub brand: i64,
    pub brand_name: String,
    pub model_name: String,
    pub year: i32,
    pub price: Decimal,
    pub fuel_type: FuelType,
    pub engine_capacity: i32,
    pub mileage: Decimal,
    pub condition: BikeCondition,
    pub main_image: Option<String>,
    pub is_featured: bool,
    pub is_trending: bool,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Bike> for BikeSummary {
    fn from(bike: &Bike) -> Self {
        BikeSummary {
            id: bike.id,
            brand: bike.brand_id,
            brand_name: bike.brand_name.clone(),
            model_name: bike.model_name.clone(),
            year: bike.year,
            price: bike.price,
            fuel_type: bike.fuel_type,
            engine_capacity: bike.engine_capacity,
            mileage: bike.mileage,
            condition: bike.condition,
            main_image: bike.main_image.clone(),
            is_featured: bike.is_featured,
            is_trending: bike.is_trending,
            average_rating: bike.average_rating,
            total_reviews: bike.total_reviews,
            created_at: bike.created_at,
        }
    }
}

/// Full bike record, used by the detail and compare endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BikeDetail {
    #[serde(flatten)]
    pub summary: BikeSummary,
    pub description: String,
    pub specifications: Map<String, Value>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub stock_quantity: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bike> for BikeDetail {
    fn from(bike: &Bike) -> Self {
        BikeDetail {
            summary: BikeSummary::from(bike),
            description: bike.description.clone(),
            specifications: bike.specifications.clone(),
            features: bike.features.clone(),
            images: bike.images.clone(),
            stock_quantity: bike.stock_quantity,
            updated_at: bike.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBike {
    pub brand_id: i64,
    pub model_name: String,
    pub year: i32,
    pub price: Decimal,
    pub fuel_type: FuelType,
    pub engine_capacity: i32,
    pub mileage: Decimal,
    pub condition: BikeCondition,
    pub description: String,
    pub specifications: Map<String, Value>,
    pub features: Vec<String>,
    pub main_image: Option<String>,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_trending: bool,
    pub stock_quantity: u32,
}

impl NewBike {
    pub fn new(
        brand_id: i64,
        model_name: impl Into<String>,
        price: Decimal,
        fuel_type: FuelType,
    ) -> Self {
        NewBike {
            brand_id,
            model_name: model_name.into(),
            year: 2024,
            price,
            fuel_type,
            engine_capacity: 110,
            mileage: Decimal::from(50),
            condition: BikeCondition::New,
            description: String::new(),
            specifications: Map::new(),
            features: Vec::new(),
            main_image: None,
            images: Vec::new(),
            is_featured: false,
            is_trending: false,
            stock_quantity: 1,
        }
    }
}

/// Sort keys accepted by the bike listing (`?ordering=-price`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BikeOrdering {
    Price,
    CreatedAt,
    Year,
    Mileage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BikeSort {
    pub key: BikeOrdering,
    pub descending: bool,
}

impl Default for BikeSort {
    fn default() -> Self {
        BikeSort {
            key: BikeOrdering::CreatedAt,
            descending: true,
        }
    }
}

impl std::str::FromStr for BikeSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (descending, field) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let key = match field {
            "price" => BikeOrdering::Price,
            "created_at" => BikeOrdering::CreatedAt,
            "year" => BikeOrdering::Year,
            "mileage" => BikeOrdering::Mileage,
            other => return Err(format!("Cannot order by \"{}\".", other)),
        };
        Ok(BikeSort { key, descending })
    }
}

/// Field-level filters for the bike listing. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct BikeFilter {
    pub brand_id: Option<i64>,
    pub fuel_type: Option<FuelType>,
    pub condition: Option<BikeCondition>,
    pub year: Option<i32>,
    pub is_featured: Option<bool>,
    pub is_trending: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_cc: Option<i32>,
    pub max_cc: Option<i32>,
    pub search: Option<String>,
    pub sort: BikeSort,
}
