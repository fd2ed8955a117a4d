//! Demo catalog for local runs (`MOTOMART_SEED=1`).
use chrono::{Months, NaiveDate, Utc};
use log::info;
use rusqlite::Error;
use rust_decimal::Decimal;
use serde_json::json;

use crate::db::Database;
use crate::models::bike::{BikeCondition, BikeFilter, FuelType, NewBike, NewBrand};
use crate::models::launch::NewUpcomingLaunch;
use crate::models::review::{NewReview, Rating};
use crate::models::showroom::NewShowroom;
use crate::models::used_listing::{ListingCondition, NewUsedBikeListing};

struct BikeSeed {
    brand: usize,
    model: &'static str,
    price: i64,
    fuel: FuelType,
    cc: i32,
    mileage: i64,
    featured: bool,
    trending: bool,
}

const BRANDS: &[(&str, &str)] = &[
    ("Honda", "Japanese maker of commuter scooters and motorcycles."),
    ("Royal Enfield", "Retro-styled singles and twins."),
    ("Ather", "Connected electric scooters."),
    ("Bajaj", "Sport commuters and naked streetbikes."),
];

const BIKES: &[BikeSeed] = &[
    BikeSeed { brand: 0, model: "Activa 6G", price: 76_234, fuel: FuelType::Petrol, cc: 110, mileage: 50, featured: true, trending: false },
    BikeSeed { brand: 0, model: "Shine 100", price: 64_900, fuel: FuelType::Petrol, cc: 99, mileage: 65, featured: false, trending: true },
    BikeSeed { brand: 1, model: "Classic 350", price: 193_080, fuel: FuelType::Petrol, cc: 349, mileage: 35, featured: true, trending: true },
    BikeSeed { brand: 1, model: "Himalayan 450", price: 285_000, fuel: FuelType::Petrol, cc: 452, mileage: 30, featured: false, trending: true },
    BikeSeed { brand: 2, model: "450X", price: 149_999, fuel: FuelType::Electric, cc: 0, mileage: 0, featured: true, trending: false },
    BikeSeed { brand: 2, model: "Rizta", price: 109_999, fuel: FuelType::Electric, cc: 0, mileage: 0, featured: false, trending: false },
    BikeSeed { brand: 3, model: "Pulsar N160", price: 131_000, fuel: FuelType::Petrol, cc: 164, mileage: 45, featured: false, trending: true },
    BikeSeed { brand: 3, model: "Freedom 125", price: 95_000, fuel: FuelType::Hybrid, cc: 125, mileage: 102, featured: true, trending: false },
];

/// Populates an empty catalog. Returns `false` (and writes nothing) when
/// bikes already exist, so repeated runs are harmless.
pub async fn seed_demo_data(db: &Database) -> Result<bool, Error> {
    if !db.list_bikes(&BikeFilter::default()).await?.is_empty() {
        info!("[SEED] Catalog already populated, skipping");
        return Ok(false);
    }

    let mut brand_ids = Vec::with_capacity(BRANDS.len());
    for (name, description) in BRANDS {
        let mut brand = NewBrand::new(*name);
        brand.description = description.to_string();
        brand_ids.push(db.insert_brand(&brand).await?.id);
    }

    let mut bike_ids = Vec::with_capacity(BIKES.len());
    for seed in BIKES {
        let mut bike = NewBike::new(brand_ids[seed.brand], seed.model, Decimal::from(seed.price), seed.fuel);
        bike.engine_capacity = seed.cc;
        bike.mileage = Decimal::from(seed.mileage);
        bike.is_featured = seed.featured;
        bike.is_trending = seed.trending;
        bike.stock_quantity = 5;
        bike.features = vec!["Digital console".to_string(), "Disc brake".to_string()];
        bike.specifications.insert("displacement".to_string(), json!(format!("{} cc", seed.cc)));
        bike_ids.push(db.insert_bike(&bike).await?.id);
    }

    let mut certified = NewBike::new(brand_ids[1], "Meteor 350", Decimal::from(165_000), FuelType::Petrol);
    certified.year = 2022;
    certified.condition = BikeCondition::CertifiedUsed;
    certified.engine_capacity = 349;
    certified.mileage = Decimal::from(36);
    bike_ids.push(db.insert_bike(&certified).await?.id);

    let mut showroom = NewShowroom::new("MotoMart Koramangala", "Bengaluru");
    showroom.address = "80 Feet Road, 4th Block".to_string();
    showroom.state = "Karnataka".to_string();
    showroom.pincode = "560034".to_string();
    showroom.phone = "+91 80 4000 1234".to_string();
    showroom.email = "koramangala@motomart.example".to_string();
    showroom.latitude = Some(Decimal::new(12_934_533, 6));
    showroom.longitude = Some(Decimal::new(77_626_579, 6));
    showroom.brand_ids = brand_ids.clone();
    db.insert_showroom(&showroom).await?;

    for (user_id, bike_id, stars, title) in [
        (1_i64, bike_ids[0], 5_i64, "Perfect city scooter"),
        (2, bike_ids[0], 4, "Reliable"),
        (1, bike_ids[2], 4, "Thumping good fun"),
    ] {
        let rating = Rating::try_from(stars)
            .map_err(|e| Error::ToSqlConversionFailure(e.into()))?;
        db.insert_review(&NewReview {
            user_id,
            bike_id,
            rating,
            title: title.to_string(),
            comment: String::new(),
            is_verified_purchase: true,
        })
        .await?;
    }

    let today = Utc::now().date_naive();
    for (brand, model, months, featured) in [(2, "Zenith", 3, true), (0, "Activa EV", 6, true), (3, "Chetak Urbane", 9, false)] {
        db.insert_upcoming_launch(&NewUpcomingLaunch {
            brand_id: brand_ids[brand],
            model_name: model.to_string(),
            expected_price_min: Some(Decimal::from(100_000)),
            expected_price_max: Some(Decimal::from(140_000)),
            expected_launch_date: launch_date(today, months),
            description: String::new(),
            image: None,
            features: Vec::new(),
            is_featured: featured,
        })
        .await?;
    }

    db.insert_used_listing(&NewUsedBikeListing {
        user_id: 2,
        brand: "Yamaha".to_string(),
        model_name: "FZ-S".to_string(),
        year: 2020,
        price: Decimal::from(78_000),
        mileage: 21_500,
        condition: ListingCondition::Good,
        description: "Single owner, serviced on schedule.".to_string(),
        contact_phone: "+91 98450 00000".to_string(),
        contact_email: "seller@motomart.example".to_string(),
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        main_image: None,
        images: Vec::new(),
        is_approved: true,
    })
    .await?;

    info!("[SEED] Inserted {} brands and {} bikes", brand_ids.len(), bike_ids.len());
    Ok(true)
}

fn launch_date(from: NaiveDate, months: u32) -> NaiveDate {
    from.checked_add_months(Months::new(months)).unwrap_or(from)
}
