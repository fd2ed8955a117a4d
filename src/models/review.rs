// src/models/review.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A star rating, 1 through 5 inclusive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < Self::MIN {
            Err(format!("Ensure this value is greater than or equal to {}.", Self::MIN))
        } else if value > Self::MAX {
            Err(format!("Ensure this value is less than or equal to {}.", Self::MAX))
        } else {
            Ok(Rating(value as u8))
        }
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub bike_id: i64,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub is_verified_purchase: bool,
    pub helpful_votes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub user_id: i64,
    pub bike_id: i64,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub is_verified_purchase: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::try_from(0).is_err());
        assert!(Rating::try_from(6).is_err());
        assert_eq!(Rating::try_from(5).map(i64::from), Ok(5));
        assert!(serde_json::from_str::<Rating>("7").is_err());
    }
}
