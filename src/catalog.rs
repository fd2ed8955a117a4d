//! Read-side catalog queries: similar bikes, search suggestions, compare and
//! the dashboard snapshot.
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::{Database, SimilarityCriteria};
use crate::error::ApiError;
use crate::models::bike::{Bike, BikeDetail, BikeSummary};
use crate::models::launch::UpcomingLaunch;
use crate::models::money::{ceil_hundredths, floor_hundredths};

pub const SIMILAR_LIMIT: usize = 6;
pub const SUGGESTION_LIMIT: usize = 10;
/// Queries shorter than this (in characters) get no suggestions.
pub const MIN_QUERY_LEN: usize = 2;
pub const DASHBOARD_LIMIT: usize = 6;

const COMPARE_MIN: usize = 2;
const COMPARE_MAX: usize = 3;

/// Typeahead entry for the search box.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub id: i64,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
}

impl From<&Bike> for Suggestion {
    fn from(bike: &Bike) -> Self {
        Suggestion {
            id: bike.id,
            name: bike.display_name(),
            price: bike.price,
            image: bike.main_image.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_bikes: i64,
    pub total_showrooms: i64,
    pub total_reviews: i64,
    pub featured_bikes: Vec<BikeSummary>,
    pub trending_bikes: Vec<BikeSummary>,
    pub upcoming_launches: Vec<UpcomingLaunch>,
}

/// Inclusive `[0.8·price, 1.2·price]` as whole hundredths. Stored prices
/// are whole hundredths, so rounding the bounds inward is exact.
pub fn price_band(price: Decimal) -> (i64, i64) {
    let low = price * Decimal::new(8, 1);
    let high = price * Decimal::new(12, 1);
    (
        ceil_hundredths(low).unwrap_or(0),
        floor_hundredths(high).unwrap_or(i64::MAX),
    )
}

/// Up to six bikes sharing the brand, the fuel type or the ±20% price band
/// of `bike_id`, newest first. An unknown `bike_id` yields an empty list.
pub async fn similar_bikes(db: &Database, bike_id: i64) -> Result<Vec<BikeSummary>, ApiError> {
    let Some(reference) = db.get_bike(bike_id).await? else {
        debug!("[CATALOG] Similar bikes requested for missing bike {}", bike_id);
        return Ok(Vec::new());
    };

    let criteria = SimilarityCriteria {
        exclude_id: reference.id,
        brand_id: reference.brand_id,
        fuel_type: reference.fuel_type,
        price_range: price_band(reference.price),
    };
    let bikes = db.similar_bikes(&criteria, SIMILAR_LIMIT).await?;
    Ok(bikes.iter().map(BikeSummary::from).collect())
}

pub async fn search_suggestions(db: &Database, query: &str) -> Result<Vec<Suggestion>, ApiError> {
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }
    let bikes = db.search_bikes_by_name(query, SUGGESTION_LIMIT).await?;
    Ok(bikes.iter().map(Suggestion::from).collect())
}

/// Full records for two or three bikes, in the order they were requested.
///
/// Ids arrive as raw query values; a non-integer is a 400. Every requested
/// id must resolve, so a repeated id is reported as not found.
pub async fn compare_bikes(db: &Database, raw_ids: &[String]) -> Result<Vec<BikeDetail>, ApiError> {
    if !(COMPARE_MIN..=COMPARE_MAX).contains(&raw_ids.len()) {
        return Err(ApiError::BadRequest("Please select 2-3 bikes to compare".to_string()));
    }
    let ids = raw_ids
        .iter()
        .map(|raw| raw.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::BadRequest("Bike ids must be integers".to_string()))?;

    let bikes = db.bikes_by_ids(&ids).await?;
    if bikes.len() != ids.len() {
        return Err(ApiError::NotFound("One or more bikes not found".to_string()));
    }

    ids.iter()
        .map(|id| {
            bikes
                .iter()
                .find(|bike| bike.id == *id)
                .map(BikeDetail::from)
                .ok_or_else(|| ApiError::NotFound("One or more bikes not found".to_string()))
        })
        .collect()
}

pub async fn dashboard_stats(db: &Database) -> Result<DashboardStats, ApiError> {
    let snapshot = db.dashboard_snapshot(DASHBOARD_LIMIT).await?;
    Ok(DashboardStats {
        total_bikes: snapshot.total_bikes,
        total_showrooms: snapshot.total_showrooms,
        total_reviews: snapshot.total_reviews,
        featured_bikes: snapshot.featured_bikes.iter().map(BikeSummary::from).collect(),
        trending_bikes: snapshot.trending_bikes.iter().map(BikeSummary::from).collect(),
        upcoming_launches: snapshot.upcoming_launches,
    })
}
