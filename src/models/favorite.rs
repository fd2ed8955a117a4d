use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bike::BikeSummary;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Favorite {
    pub id: i64,
    pub bike: BikeSummary,
    pub created_at: DateTime<Utc>,
}

/// What a toggle did to the (user, bike) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteToggle {
    Added,
    Removed,
}

impl FavoriteToggle {
    pub fn message(self) -> &'static str {
        match self {
            FavoriteToggle::Added => "Added to favorites",
            FavoriteToggle::Removed => "Removed from favorites",
        }
    }
}
