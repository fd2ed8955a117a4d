use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, params_from_iter, Connection, Error, OptionalExtension, Row, TransactionBehavior};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::models::bike::{Bike, BikeFilter, BikeOrdering, Brand, FuelType, NewBike, NewBrand};
use crate::models::favorite::{Favorite, FavoriteToggle};
use crate::models::launch::{NewUpcomingLaunch, UpcomingLaunch};
use crate::models::money::{ceil_hundredths, floor_hundredths, from_hundredths, to_hundredths};
#[cfg(test)]
use crate::models::notification::Notification;
use crate::models::notification::{NewNotification, NotificationType};
use crate::models::review::{NewReview, Rating, Review};
use crate::models::showroom::{NewShowroom, Showroom};
use crate::models::test_ride::{
    NewTestRide, StatusAuthority, TestRide, TestRidePatch, TestRideStatus, TestRideUpdate,
};
use crate::models::used_listing::{NewUsedBikeListing, UsedBikeListing};

const SCHEMA: &[(&str, &str)] = &[
    (
        "brands",
        "CREATE TABLE IF NOT EXISTS brands (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );",
    ),
    (
        "bikes",
        "CREATE TABLE IF NOT EXISTS bikes (
            id INTEGER PRIMARY KEY,
            brand_id INTEGER NOT NULL,
            model_name TEXT NOT NULL,
            year INTEGER NOT NULL,
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            fuel_type TEXT NOT NULL CHECK (fuel_type IN ('petrol', 'electric', 'hybrid')),
            engine_capacity INTEGER NOT NULL,
            mileage_hundredths INTEGER NOT NULL CHECK (mileage_hundredths >= 0),
            condition TEXT NOT NULL CHECK (condition IN ('new', 'used', 'certified_used')),
            description TEXT NOT NULL DEFAULT '',
            specifications TEXT NOT NULL DEFAULT '{}',
            features TEXT NOT NULL DEFAULT '[]',
            main_image TEXT,
            images TEXT NOT NULL DEFAULT '[]',
            is_featured INTEGER NOT NULL DEFAULT 0,
            is_trending INTEGER NOT NULL DEFAULT 0,
            stock_quantity INTEGER NOT NULL DEFAULT 1 CHECK (stock_quantity >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (brand_id) REFERENCES brands(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_bikes_created_at ON bikes(created_at);
        CREATE INDEX IF NOT EXISTS idx_bikes_price ON bikes(price_cents);",
    ),
    (
        "showrooms",
        "CREATE TABLE IF NOT EXISTS showrooms (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL,
            state TEXT NOT NULL DEFAULT '',
            pincode TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            latitude TEXT,
            longitude TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS showroom_brands (
            showroom_id INTEGER NOT NULL,
            brand_id INTEGER NOT NULL,
            PRIMARY KEY (showroom_id, brand_id),
            FOREIGN KEY (showroom_id) REFERENCES showrooms(id) ON DELETE CASCADE,
            FOREIGN KEY (brand_id) REFERENCES brands(id) ON DELETE CASCADE
        );",
    ),
    (
        "test_rides",
        "CREATE TABLE IF NOT EXISTS test_rides (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            bike_id INTEGER NOT NULL,
            showroom_id INTEGER NOT NULL,
            preferred_date TEXT NOT NULL,
            preferred_time TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (bike_id) REFERENCES bikes(id) ON DELETE CASCADE,
            FOREIGN KEY (showroom_id) REFERENCES showrooms(id) ON DELETE CASCADE
        );",
    ),
    (
        "reviews",
        "CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            bike_id INTEGER NOT NULL,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            title TEXT NOT NULL,
            comment TEXT NOT NULL,
            is_verified_purchase INTEGER NOT NULL DEFAULT 0,
            helpful_votes INTEGER NOT NULL DEFAULT 0 CHECK (helpful_votes >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (user_id, bike_id),
            FOREIGN KEY (bike_id) REFERENCES bikes(id) ON DELETE CASCADE
        );",
    ),
    (
        "favorites",
        "CREATE TABLE IF NOT EXISTS favorites (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            bike_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (user_id, bike_id),
            FOREIGN KEY (bike_id) REFERENCES bikes(id) ON DELETE CASCADE
        );",
    ),
    (
        "notifications",
        "CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            notification_type TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            related_bike_id INTEGER,
            created_at TEXT NOT NULL,
            FOREIGN KEY (related_bike_id) REFERENCES bikes(id) ON DELETE CASCADE
        );",
    ),
    (
        "upcoming_launches",
        "CREATE TABLE IF NOT EXISTS upcoming_launches (
            id INTEGER PRIMARY KEY,
            brand_id INTEGER NOT NULL,
            model_name TEXT NOT NULL,
            expected_price_min_cents INTEGER,
            expected_price_max_cents INTEGER,
            expected_launch_date TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            image TEXT,
            features TEXT NOT NULL DEFAULT '[]',
            is_featured INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY (brand_id) REFERENCES brands(id) ON DELETE CASCADE
        );",
    ),
    (
        "used_bike_listings",
        "CREATE TABLE IF NOT EXISTS used_bike_listings (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            brand TEXT NOT NULL,
            model_name TEXT NOT NULL,
            year INTEGER NOT NULL,
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            mileage INTEGER NOT NULL CHECK (mileage >= 0),
            condition TEXT NOT NULL CHECK (condition IN ('excellent', 'good', 'fair', 'poor')),
            description TEXT NOT NULL DEFAULT '',
            contact_phone TEXT NOT NULL DEFAULT '',
            contact_email TEXT NOT NULL DEFAULT '',
            city TEXT NOT NULL DEFAULT '',
            state TEXT NOT NULL DEFAULT '',
            main_image TEXT,
            images TEXT NOT NULL DEFAULT '[]',
            is_approved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    ),
];

// Column list shared by every bike query; `bike_from_row` reads it by
// position. Rating aggregates are recomputed from `reviews` on each read.
const BIKE_COLUMNS: &str = "b.id, b.brand_id, br.name, b.model_name, b.year, b.price_cents,
    b.fuel_type, b.engine_capacity, b.mileage_hundredths, b.condition, b.description,
    b.specifications, b.features, b.main_image, b.images, b.is_featured, b.is_trending,
    b.stock_quantity, b.created_at, b.updated_at,
    COALESCE((SELECT AVG(r.rating) FROM reviews r WHERE r.bike_id = b.id), 0.0),
    (SELECT COUNT(*) FROM reviews r WHERE r.bike_id = b.id)";
const BIKE_FROM: &str = "FROM bikes b JOIN brands br ON br.id = b.brand_id";
const NEWEST_FIRST: &str = "ORDER BY b.created_at DESC, b.id DESC";

const TEST_RIDE_SELECT: &str = "SELECT t.id, t.user_id, t.bike_id, b.model_name, br.name,
        t.showroom_id, s.name, t.preferred_date, t.preferred_time, t.status, t.notes,
        t.created_at, t.updated_at
    FROM test_rides t
    JOIN bikes b ON b.id = t.bike_id
    JOIN brands br ON br.id = b.brand_id
    JOIN showrooms s ON s.id = t.showroom_id";

const LAUNCH_SELECT: &str = "SELECT ul.id, ul.brand_id, br.name, ul.model_name,
        ul.expected_price_min_cents, ul.expected_price_max_cents, ul.expected_launch_date,
        ul.description, ul.image, ul.features, ul.is_featured, ul.created_at
    FROM upcoming_launches ul
    JOIN brands br ON br.id = ul.brand_id";

/// Which rows of a user-owned table a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Staff: every row.
    All,
    /// Regular user: only rows whose `user_id` matches.
    Owner(i64),
}

impl Visibility {
    /// Bound to `(?N IS NULL OR user_id = ?N)` in scoped queries.
    fn owner_filter(self) -> Option<i64> {
        match self {
            Visibility::All => None,
            Visibility::Owner(user_id) => Some(user_id),
        }
    }
}

/// Bikes sharing at least one trait with a reference bike.
#[derive(Debug, Clone)]
pub struct SimilarityCriteria {
    pub exclude_id: i64,
    pub brand_id: i64,
    pub fuel_type: FuelType,
    /// Inclusive price range, in hundredths.
    pub price_range: (i64, i64),
}

/// Dashboard figures read under a single lock so they agree with each other.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub total_bikes: i64,
    pub total_showrooms: i64,
    pub total_reviews: i64,
    pub featured_bikes: Vec<Bike>,
    pub trending_bikes: Vec<Bike>,
    pub upcoming_launches: Vec<UpcomingLaunch>,
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> Result<T, Error> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn decimal_text_column(row: &Row<'_>, idx: usize) -> Result<Option<rust_decimal::Decimal>, Error> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| raw.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn money_param(value: rust_decimal::Decimal) -> Result<i64, Error> {
    to_hundredths(value).ok_or_else(|| Error::ToSqlConversionFailure("amount out of range".into()))
}

// Price bounds beyond the i64 range clamp to its ends, so a huge minimum
// matches nothing and a huge maximum matches everything.
fn saturate(bound: rust_decimal::Decimal) -> i64 {
    if bound.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    }
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn bike_from_row(row: &Row<'_>) -> Result<Bike, Error> {
    Ok(Bike {
        id: row.get(0)?,
        brand_id: row.get(1)?,
        brand_name: row.get(2)?,
        model_name: row.get(3)?,
        year: row.get(4)?,
        price: from_hundredths(row.get(5)?),
        fuel_type: row.get(6)?,
        engine_capacity: row.get(7)?,
        mileage: from_hundredths(row.get(8)?),
        condition: row.get(9)?,
        description: row.get(10)?,
        specifications: json_column(row, 11)?,
        features: json_column(row, 12)?,
        main_image: row.get(13)?,
        images: json_column(row, 14)?,
        is_featured: row.get(15)?,
        is_trending: row.get(16)?,
        stock_quantity: row.get(17)?,
        created_at: row.get(18)?,
        updated_at: row.get(19)?,
        average_rating: row.get(20)?,
        total_reviews: row.get(21)?,
    })
}

fn test_ride_from_row(row: &Row<'_>) -> Result<TestRide, Error> {
    Ok(TestRide {
        id: row.get(0)?,
        user: row.get(1)?,
        bike: row.get(2)?,
        bike_name: row.get(3)?,
        bike_brand: row.get(4)?,
        showroom: row.get(5)?,
        showroom_name: row.get(6)?,
        preferred_date: row.get(7)?,
        preferred_time: row.get(8)?,
        status: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn launch_from_row(row: &Row<'_>) -> Result<UpcomingLaunch, Error> {
    Ok(UpcomingLaunch {
        id: row.get(0)?,
        brand: row.get(1)?,
        brand_name: row.get(2)?,
        model_name: row.get(3)?,
        expected_price_min: row.get::<_, Option<i64>>(4)?.map(from_hundredths),
        expected_price_max: row.get::<_, Option<i64>>(5)?.map(from_hundredths),
        expected_launch_date: row.get(6)?,
        description: row.get(7)?,
        image: row.get(8)?,
        features: json_column(row, 9)?,
        is_featured: row.get(10)?,
        created_at: row.get(11)?,
    })
}

#[cfg(test)]
fn notification_from_row(row: &Row<'_>) -> Result<Notification, Error> {
    Ok(Notification {
        id: row.get(0)?,
        user: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        related_bike: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn used_listing_from_row(row: &Row<'_>) -> Result<UsedBikeListing, Error> {
    Ok(UsedBikeListing {
        id: row.get(0)?,
        user: row.get(1)?,
        brand: row.get(2)?,
        model_name: row.get(3)?,
        year: row.get(4)?,
        price: from_hundredths(row.get(5)?),
        mileage: row.get(6)?,
        condition: row.get(7)?,
        description: row.get(8)?,
        contact_phone: row.get(9)?,
        contact_email: row.get(10)?,
        city: row.get(11)?,
        state: row.get(12)?,
        main_image: row.get(13)?,
        images: json_column(row, 14)?,
        is_approved: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn fetch_bike(conn: &Connection, id: i64) -> Result<Option<Bike>, Error> {
    conn.query_row(
        &format!("SELECT {} {} WHERE b.id = ?", BIKE_COLUMNS, BIKE_FROM),
        [id],
        bike_from_row,
    )
    .optional()
}

fn query_bikes(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Bike>, Error> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, bike_from_row)?;
    rows.collect()
}

fn fetch_test_ride(
    conn: &Connection,
    id: i64,
    visibility: Visibility,
) -> Result<Option<TestRide>, Error> {
    conn.query_row(
        &format!("{} WHERE t.id = ?1 AND (?2 IS NULL OR t.user_id = ?2)", TEST_RIDE_SELECT),
        params![id, visibility.owner_filter()],
        test_ride_from_row,
    )
    .optional()
}

fn insert_notification_row(conn: &Connection, notification: &NewNotification) -> Result<i64, Error> {
    conn.execute(
        "INSERT INTO notifications
            (user_id, notification_type, title, message, related_bike_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?)",
        params![
            notification.user_id,
            notification.kind,
            notification.title,
            notification.message,
            notification.related_bike_id,
            Utc::now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// Define a struct to represent a database connection
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    // Create a new database connection
    pub fn new(db_path: &str) -> Result<Self, Error> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        info!("Database connection established at: {}", db_path);
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // Create the database schema
    pub async fn create_schema(&self) -> Result<(), Error> {
        let conn = self.conn.lock().await;
        for (table, ddl) in SCHEMA {
            conn.execute_batch(ddl).map_err(|e| {
                error!("Failed creating {} table: {}", table, e);
                e
            })?;
        }
        Ok(())
    }

    pub async fn insert_brand(&self, brand: &NewBrand) -> Result<Brand, Error> {
        let conn = self.conn.lock().await;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO brands (name, description, created_at) VALUES (?, ?, ?)",
            params![brand.name, brand.description, created_at],
        )?;
        let id = conn.last_insert_rowid();
        info!("[DB] Brand inserted: {} ({})", brand.name, id);
        Ok(Brand {
            id,
            name: brand.name.clone(),
            description: brand.description.clone(),
            created_at,
        })
    }

    pub async fn insert_bike(&self, bike: &NewBike) -> Result<Bike, Error> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO bikes (
                brand_id, model_name, year, price_cents, fuel_type, engine_capacity,
                mileage_hundredths, condition, description, specifications, features,
                main_image, images, is_featured, is_trending, stock_quantity,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                bike.brand_id,
                bike.model_name,
                bike.year,
                money_param(bike.price)?,
                bike.fuel_type,
                bike.engine_capacity,
                money_param(bike.mileage)?,
                bike.condition,
                bike.description,
                serde_json::Value::Object(bike.specifications.clone()).to_string(),
                serde_json::json!(bike.features).to_string(),
                bike.main_image,
                serde_json::json!(bike.images).to_string(),
                bike.is_featured,
                bike.is_trending,
                bike.stock_quantity,
                now,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("[DB] Bike inserted: {} ({})", bike.model_name, id);
        fetch_bike(&conn, id)?.ok_or(Error::QueryReturnedNoRows)
    }

    pub async fn get_bike(&self, id: i64) -> Result<Option<Bike>, Error> {
        let conn = self.conn.lock().await;
        fetch_bike(&conn, id)
    }

    pub async fn bike_exists(&self, id: i64) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT EXISTS(SELECT 1 FROM bikes WHERE id = ?)", [id], |row| row.get(0))
    }

    /// Catalog listing with field filters, substring search and ordering.
    pub async fn list_bikes(&self, filter: &BikeFilter) -> Result<Vec<Bike>, Error> {
        let mut sql = format!("SELECT {} {} WHERE 1 = 1", BIKE_COLUMNS, BIKE_FROM);
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(brand_id) = filter.brand_id {
            sql.push_str(" AND b.brand_id = ?");
            values.push(Box::new(brand_id));
        }
        if let Some(fuel_type) = filter.fuel_type {
            sql.push_str(" AND b.fuel_type = ?");
            values.push(Box::new(fuel_type));
        }
        if let Some(condition) = filter.condition {
            sql.push_str(" AND b.condition = ?");
            values.push(Box::new(condition));
        }
        if let Some(year) = filter.year {
            sql.push_str(" AND b.year = ?");
            values.push(Box::new(year));
        }
        if let Some(is_featured) = filter.is_featured {
            sql.push_str(" AND b.is_featured = ?");
            values.push(Box::new(is_featured));
        }
        if let Some(is_trending) = filter.is_trending {
            sql.push_str(" AND b.is_trending = ?");
            values.push(Box::new(is_trending));
        }
        if let Some(min_price) = filter.min_price {
            sql.push_str(" AND b.price_cents >= ?");
            values.push(Box::new(ceil_hundredths(min_price).unwrap_or_else(|| saturate(min_price))));
        }
        if let Some(max_price) = filter.max_price {
            sql.push_str(" AND b.price_cents <= ?");
            values.push(Box::new(floor_hundredths(max_price).unwrap_or_else(|| saturate(max_price))));
        }
        if let Some(min_cc) = filter.min_cc {
            sql.push_str(" AND b.engine_capacity >= ?");
            values.push(Box::new(min_cc));
        }
        if let Some(max_cc) = filter.max_cc {
            sql.push_str(" AND b.engine_capacity <= ?");
            values.push(Box::new(max_cc));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            sql.push_str(
                " AND (b.model_name LIKE ? ESCAPE '\\'
                    OR br.name LIKE ? ESCAPE '\\'
                    OR b.description LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search);
            values.push(Box::new(pattern.clone()));
            values.push(Box::new(pattern.clone()));
            values.push(Box::new(pattern));
        }

        let column = match filter.sort.key {
            BikeOrdering::Price => "b.price_cents",
            BikeOrdering::CreatedAt => "b.created_at",
            BikeOrdering::Year => "b.year",
            BikeOrdering::Mileage => "b.mileage_hundredths",
        };
        let direction = if filter.sort.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {}, b.id {}", column, direction, direction));

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), bike_from_row)?;
        rows.collect()
    }

    /// Newest-first bikes matching ANY of the criteria, reference excluded.
    pub async fn similar_bikes(
        &self,
        criteria: &SimilarityCriteria,
        limit: usize,
    ) -> Result<Vec<Bike>, Error> {
        let conn = self.conn.lock().await;
        query_bikes(
            &conn,
            &format!(
                "SELECT {} {} WHERE b.id != ?1
                    AND (b.brand_id = ?2 OR b.fuel_type = ?3 OR b.price_cents BETWEEN ?4 AND ?5)
                {} LIMIT ?6",
                BIKE_COLUMNS, BIKE_FROM, NEWEST_FIRST
            ),
            params![
                criteria.exclude_id,
                criteria.brand_id,
                criteria.fuel_type,
                criteria.price_range.0,
                criteria.price_range.1,
                limit as i64,
            ],
        )
    }

    /// Case-insensitive (ASCII) substring match on model or brand name.
    pub async fn search_bikes_by_name(&self, query: &str, limit: usize) -> Result<Vec<Bike>, Error> {
        let conn = self.conn.lock().await;
        query_bikes(
            &conn,
            &format!(
                "SELECT {} {} WHERE b.model_name LIKE ?1 ESCAPE '\\' OR br.name LIKE ?1 ESCAPE '\\'
                {} LIMIT ?2",
                BIKE_COLUMNS, BIKE_FROM, NEWEST_FIRST
            ),
            params![like_pattern(query), limit as i64],
        )
    }

    /// Bikes whose id is in `ids`, newest first. Unknown ids are skipped.
    pub async fn bikes_by_ids(&self, ids: &[i64]) -> Result<Vec<Bike>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} {} WHERE b.id IN ({}) {}",
            BIKE_COLUMNS, BIKE_FROM, placeholders, NEWEST_FIRST
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), bike_from_row)?;
        rows.collect()
    }

    pub async fn dashboard_snapshot(&self, limit: usize) -> Result<DashboardSnapshot, Error> {
        let conn = self.conn.lock().await;
        let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0));
        let total_bikes = count("SELECT COUNT(*) FROM bikes")?;
        let total_showrooms = count("SELECT COUNT(*) FROM showrooms WHERE is_active = 1")?;
        let total_reviews = count("SELECT COUNT(*) FROM reviews")?;

        let flagged = |flag: &str| {
            query_bikes(
                &conn,
                &format!(
                    "SELECT {} {} WHERE b.{} = 1 {} LIMIT ?1",
                    BIKE_COLUMNS, BIKE_FROM, flag, NEWEST_FIRST
                ),
                params![limit as i64],
            )
        };
        let featured_bikes = flagged("is_featured")?;
        let trending_bikes = flagged("is_trending")?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE ul.is_featured = 1 ORDER BY ul.expected_launch_date ASC, ul.id ASC LIMIT ?1",
            LAUNCH_SELECT
        ))?;
        let upcoming_launches = stmt
            .query_map([limit as i64], launch_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DashboardSnapshot {
            total_bikes,
            total_showrooms,
            total_reviews,
            featured_bikes,
            trending_bikes,
            upcoming_launches,
        })
    }

    pub async fn insert_showroom(&self, showroom: &NewShowroom) -> Result<Showroom, Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let created_at = Utc::now();
        tx.execute(
            "INSERT INTO showrooms (
                name, address, city, state, pincode, phone, email,
                latitude, longitude, is_active, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                showroom.name,
                showroom.address,
                showroom.city,
                showroom.state,
                showroom.pincode,
                showroom.phone,
                showroom.email,
                showroom.latitude.map(|d| d.to_string()),
                showroom.longitude.map(|d| d.to_string()),
                showroom.is_active,
                created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        for brand_id in &showroom.brand_ids {
            tx.execute(
                "INSERT OR IGNORE INTO showroom_brands (showroom_id, brand_id) VALUES (?, ?)",
                params![id, brand_id],
            )?;
        }
        tx.commit()?;
        info!("[DB] Showroom inserted: {} ({})", showroom.name, id);

        let mut brand_ids = showroom.brand_ids.clone();
        brand_ids.sort_unstable();
        brand_ids.dedup();
        Ok(Showroom {
            id,
            name: showroom.name.clone(),
            address: showroom.address.clone(),
            city: showroom.city.clone(),
            state: showroom.state.clone(),
            pincode: showroom.pincode.clone(),
            phone: showroom.phone.clone(),
            email: showroom.email.clone(),
            latitude: showroom.latitude,
            longitude: showroom.longitude,
            brand_ids,
            is_active: showroom.is_active,
            created_at,
        })
    }

    pub async fn get_showroom(&self, id: i64) -> Result<Option<Showroom>, Error> {
        let conn = self.conn.lock().await;
        let showroom = conn
            .query_row(
                "SELECT id, name, address, city, state, pincode, phone, email,
                    latitude, longitude, is_active, created_at
                FROM showrooms WHERE id = ?",
                [id],
                |row| {
                    Ok(Showroom {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                        city: row.get(3)?,
                        state: row.get(4)?,
                        pincode: row.get(5)?,
                        phone: row.get(6)?,
                        email: row.get(7)?,
                        latitude: decimal_text_column(row, 8)?,
                        longitude: decimal_text_column(row, 9)?,
                        brand_ids: Vec::new(),
                        is_active: row.get(10)?,
                        created_at: row.get(11)?,
                    })
                },
            )
            .optional()?;

        let Some(mut showroom) = showroom else {
            return Ok(None);
        };
        let mut stmt = conn.prepare(
            "SELECT brand_id FROM showroom_brands WHERE showroom_id = ? ORDER BY brand_id",
        )?;
        showroom.brand_ids = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(Some(showroom))
    }

    pub async fn insert_review(&self, review: &NewReview) -> Result<Review, Error> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO reviews (
                user_id, bike_id, rating, title, comment, is_verified_purchase,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                review.user_id,
                review.bike_id,
                i64::from(review.rating),
                review.title,
                review.comment,
                review.is_verified_purchase,
                now,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("[DB] Review {} inserted for bike {}", id, review.bike_id);
        conn.query_row(
            "SELECT id, user_id, bike_id, rating, title, comment, is_verified_purchase,
                helpful_votes, created_at, updated_at
            FROM reviews WHERE id = ?",
            [id],
            |row| {
                let rating: i64 = row.get(3)?;
                Ok(Review {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    bike_id: row.get(2)?,
                    rating: Rating::try_from(rating).map_err(|e| {
                        Error::FromSqlConversionFailure(3, Type::Integer, e.into())
                    })?,
                    title: row.get(4)?,
                    comment: row.get(5)?,
                    is_verified_purchase: row.get(6)?,
                    helpful_votes: row.get(7)?,
                    created_at: row.get(8)?,
                    updated_at: row.get(9)?,
                })
            },
        )
    }

    /// Adds the (user, bike) favorite if absent, removes it if present.
    ///
    /// Returns `None` when the bike does not exist. The check, insert and
    /// delete run in one IMMEDIATE transaction, and `UNIQUE (user_id,
    /// bike_id)` rejects any second row for the pair.
    pub async fn toggle_favorite(
        &self,
        user_id: i64,
        bike_id: i64,
    ) -> Result<Option<FavoriteToggle>, Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let bike_exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM bikes WHERE id = ?)",
            [bike_id],
            |row| row.get(0),
        )?;
        if !bike_exists {
            return Ok(None);
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO favorites (user_id, bike_id, created_at) VALUES (?, ?, ?)",
            params![user_id, bike_id, Utc::now()],
        )?;
        let outcome = if inserted == 1 {
            FavoriteToggle::Added
        } else {
            tx.execute(
                "DELETE FROM favorites WHERE user_id = ? AND bike_id = ?",
                [user_id, bike_id],
            )?;
            FavoriteToggle::Removed
        };
        tx.commit()?;
        debug!("[DB] Favorite {:?} for user {} bike {}", outcome, user_id, bike_id);
        Ok(Some(outcome))
    }

    pub async fn list_favorites(&self, user_id: i64) -> Result<Vec<Favorite>, Error> {
        let conn = self.conn.lock().await;
        // favorite columns follow the 22 bike columns
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, f.id, f.created_at {}
                JOIN favorites f ON f.bike_id = b.id
            WHERE f.user_id = ?
            ORDER BY f.created_at DESC, f.id DESC",
            BIKE_COLUMNS, BIKE_FROM
        ))?;
        let rows = stmt.query_map([user_id], |row| {
            let bike = bike_from_row(row)?;
            Ok(Favorite {
                id: row.get(22)?,
                bike: (&bike).into(),
                created_at: row.get(23)?,
            })
        })?;
        rows.collect()
    }

    /// Deletes one of the user's favorites by row id; `false` if no such row
    /// belongs to the user.
    pub async fn delete_favorite(&self, user_id: i64, favorite_id: i64) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM favorites WHERE id = ? AND user_id = ?",
            [favorite_id, user_id],
        )?;
        Ok(deleted > 0)
    }

    pub async fn insert_test_ride(&self, ride: &NewTestRide) -> Result<TestRide, Error> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO test_rides (
                user_id, bike_id, showroom_id, preferred_date, preferred_time,
                status, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                ride.user_id,
                ride.bike_id,
                ride.showroom_id,
                ride.preferred_date,
                ride.preferred_time,
                TestRideStatus::Pending,
                ride.notes,
                now,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!("[DB] Test ride {} booked by user {}", id, ride.user_id);
        fetch_test_ride(&conn, id, Visibility::All)?.ok_or(Error::QueryReturnedNoRows)
    }

    pub async fn list_test_rides(&self, visibility: Visibility) -> Result<Vec<TestRide>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE (?1 IS NULL OR t.user_id = ?1) ORDER BY t.created_at DESC, t.id DESC",
            TEST_RIDE_SELECT
        ))?;
        let rows = stmt.query_map(params![visibility.owner_filter()], test_ride_from_row)?;
        rows.collect()
    }

    pub async fn get_test_ride(
        &self,
        id: i64,
        visibility: Visibility,
    ) -> Result<Option<TestRide>, Error> {
        let conn = self.conn.lock().await;
        fetch_test_ride(&conn, id, visibility)
    }

    /// Applies `patch` to a visible ride. The status check against
    /// `authority` runs inside the same transaction as the write. A status
    /// change to confirmed or cancelled also notifies the ride's owner.
    pub async fn update_test_ride(
        &self,
        id: i64,
        visibility: Visibility,
        authority: StatusAuthority,
        patch: &TestRidePatch,
    ) -> Result<TestRideUpdate, Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = fetch_test_ride(&tx, id, visibility)? else {
            return Ok(TestRideUpdate::NotFound);
        };
        if let Some(to) = patch.status {
            if !authority.permits(current.status, to) {
                return Ok(TestRideUpdate::StatusRefused {
                    from: current.status,
                    to,
                });
            }
        }

        tx.execute(
            "UPDATE test_rides SET
                preferred_date = COALESCE(?1, preferred_date),
                preferred_time = COALESCE(?2, preferred_time),
                status = COALESCE(?3, status),
                notes = COALESCE(?4, notes),
                updated_at = ?5
            WHERE id = ?6",
            params![
                patch.preferred_date,
                patch.preferred_time,
                patch.status,
                patch.notes,
                Utc::now(),
                id,
            ],
        )?;

        let notification = match patch.status {
            Some(status) if status == current.status => None,
            Some(TestRideStatus::Confirmed) => Some((
                NotificationType::TestRideConfirmed,
                "Test ride confirmed",
                "confirmed",
            )),
            Some(TestRideStatus::Cancelled) => Some((
                NotificationType::TestRideCancelled,
                "Test ride cancelled",
                "cancelled",
            )),
            _ => None,
        };
        if let Some((kind, title, verb)) = notification {
            insert_notification_row(
                &tx,
                &NewNotification {
                    user_id: current.user,
                    kind,
                    title: title.to_string(),
                    message: format!(
                        "Your test ride of the {} {} on {} has been {}.",
                        current.bike_brand,
                        current.bike_name,
                        patch.preferred_date.unwrap_or(current.preferred_date),
                        verb
                    ),
                    related_bike_id: Some(current.bike),
                },
            )?;
        }

        let updated = fetch_test_ride(&tx, id, Visibility::All)?.ok_or(Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(TestRideUpdate::Updated(updated))
    }

    pub async fn delete_test_ride(&self, id: i64, visibility: Visibility) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM test_rides WHERE id = ?1 AND (?2 IS NULL OR user_id = ?2)",
            params![id, visibility.owner_filter()],
        )?;
        Ok(deleted > 0)
    }

    #[cfg(test)]
    pub(crate) async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, notification_type, title, message, is_read,
                related_bike_id, created_at
            FROM notifications WHERE user_id = ?
            ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([user_id], notification_from_row)?;
        rows.collect()
    }

    pub async fn insert_upcoming_launch(
        &self,
        launch: &NewUpcomingLaunch,
    ) -> Result<UpcomingLaunch, Error> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO upcoming_launches (
                brand_id, model_name, expected_price_min_cents, expected_price_max_cents,
                expected_launch_date, description, image, features, is_featured, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                launch.brand_id,
                launch.model_name,
                launch.expected_price_min.map(money_param).transpose()?,
                launch.expected_price_max.map(money_param).transpose()?,
                launch.expected_launch_date,
                launch.description,
                launch.image,
                serde_json::json!(launch.features).to_string(),
                launch.is_featured,
                Utc::now(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.query_row(&format!("{} WHERE ul.id = ?", LAUNCH_SELECT), [id], launch_from_row)
    }

    pub async fn insert_used_listing(
        &self,
        listing: &NewUsedBikeListing,
    ) -> Result<UsedBikeListing, Error> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO used_bike_listings (
                user_id, brand, model_name, year, price_cents, mileage, condition,
                description, contact_phone, contact_email, city, state, main_image,
                images, is_approved, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                listing.user_id,
                listing.brand,
                listing.model_name,
                listing.year,
                money_param(listing.price)?,
                listing.mileage,
                listing.condition,
                listing.description,
                listing.contact_phone,
                listing.contact_email,
                listing.city,
                listing.state,
                listing.main_image,
                serde_json::json!(listing.images).to_string(),
                listing.is_approved,
                now,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, user_id, brand, model_name, year, price_cents, mileage, condition,
                description, contact_phone, contact_email, city, state, main_image, images,
                is_approved, created_at, updated_at
            FROM used_bike_listings WHERE id = ?",
            [id],
            used_listing_from_row,
        )
    }

    /// Approved listings only, newest first.
    #[cfg(test)]
    pub(crate) async fn list_visible_used_listings(&self) -> Result<Vec<UsedBikeListing>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, brand, model_name, year, price_cents, mileage, condition,
                description, contact_phone, contact_email, city, state, main_image, images,
                is_approved, created_at, updated_at
            FROM used_bike_listings WHERE is_approved = 1
            ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], used_listing_from_row)?;
        rows.collect()
    }
}
