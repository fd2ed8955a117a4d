use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{Permission, RequestContext};
use crate::calculators::{calculate_emi, calculate_fuel_cost, EmiRequest, FuelCostRequest};
use crate::catalog;
use crate::db::Database;
use crate::error::{ApiError, FieldErrors};
use crate::models::bike::{BikeCondition, BikeDetail, BikeFilter, BikeSort, BikeSummary, FuelType};
use crate::models::favorite::FavoriteToggle;
use crate::models::test_ride::{NewTestRide, StatusAuthority, TestRidePatch, TestRideStatus, TestRideUpdate};
use crate::payload::Payload;

/// Mounts every endpoint under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                ApiError::BadRequest(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                ApiError::BadRequest(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|_err, _req| ApiError::not_found().into()))
            .route("/health/", web::get().to(health))
            .route("/calculators/emi/", web::post().to(emi_calculator))
            .route("/calculators/fuel-cost/", web::post().to(fuel_cost_calculator))
            .route("/bikes/", web::get().to(list_bikes))
            .route("/bikes/{id}/", web::get().to(get_bike))
            .route("/bikes/{id}/similar/", web::get().to(similar_bikes))
            .route("/search/suggestions/", web::get().to(search_suggestions))
            .route("/compare/", web::get().to(compare_bikes))
            .route("/dashboard/stats/", web::get().to(dashboard_stats))
            .route("/favorites/", web::get().to(list_favorites))
            .route("/favorites/", web::post().to(toggle_favorite))
            .route("/favorites/{id}/", web::delete().to(delete_favorite))
            .route("/test-rides/", web::get().to(list_test_rides))
            .route("/test-rides/", web::post().to(create_test_ride))
            .route("/test-rides/{id}/", web::get().to(get_test_ride))
            .route("/test-rides/{id}/", web::patch().to(update_test_ride))
            .route("/test-rides/{id}/", web::delete().to(delete_test_ride)),
    );
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

pub async fn emi_calculator(
    ctx: RequestContext,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    let request = EmiRequest::from_json(&body)?;
    let breakdown = calculate_emi(&request)?;
    debug!("[API] EMI for {} over {} months: {}", breakdown.principal, request.tenure_months, breakdown.emi);
    Ok(HttpResponse::Ok().json(breakdown))
}

pub async fn fuel_cost_calculator(
    ctx: RequestContext,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    let request = FuelCostRequest::from_json(&body)?;
    Ok(HttpResponse::Ok().json(calculate_fuel_cost(&request)?))
}

#[derive(Debug, Deserialize)]
pub struct BikeListQuery {
    pub brand: Option<i64>,
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
    pub ordering: Option<String>,
}

impl BikeListQuery {
    fn into_filter(self) -> Result<BikeFilter, ApiError> {
        let sort = match self.ordering.as_deref().filter(|o| !o.is_empty()) {
            Some(ordering) => ordering.parse::<BikeSort>().map_err(ApiError::BadRequest)?,
            None => BikeSort::default(),
        };
        Ok(BikeFilter {
            brand_id: self.brand,
            fuel_type: self.fuel_type,
            condition: self.condition,
            year: self.year,
            is_featured: self.is_featured,
            is_trending: self.is_trending,
            min_price: self.min_price,
            max_price: self.max_price,
            min_cc: self.min_cc,
            max_cc: self.max_cc,
            search: self.search.map(|s| s.trim().to_string()),
            sort,
        })
    }
}

pub async fn list_bikes(
    db: web::Data<Database>,
    ctx: RequestContext,
    query: web::Query<BikeListQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    let filter = query.into_inner().into_filter()?;
    let bikes = db.list_bikes(&filter).await?;
    debug!("[API] Bike listing returned {} rows", bikes.len());
    let summaries: Vec<BikeSummary> = bikes.iter().map(BikeSummary::from).collect();
    Ok(HttpResponse::Ok().json(summaries))
}

pub async fn get_bike(
    db: web::Data<Database>,
    ctx: RequestContext,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    let bike = db.get_bike(*id).await?.ok_or_else(ApiError::not_found)?;
    Ok(HttpResponse::Ok().json(BikeDetail::from(&bike)))
}

pub async fn similar_bikes(
    db: web::Data<Database>,
    ctx: RequestContext,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    Ok(HttpResponse::Ok().json(catalog::similar_bikes(&db, *id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    #[serde(default)]
    pub q: String,
}

pub async fn search_suggestions(
    db: web::Data<Database>,
    ctx: RequestContext,
    query: web::Query<SuggestionQuery>,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    Ok(HttpResponse::Ok().json(catalog::search_suggestions(&db, &query.q).await?))
}

/// Every value of a repeated query key, e.g. `?bike_ids=1&bike_ids=2`.
fn query_values(query_string: &str, key: &str) -> Vec<String> {
    query_string
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .filter(|(k, _)| *k == key)
        .map(|(_, value)| {
            let value = value.replace('+', " ");
            let decoded = urlencoding::decode(&value).map(|decoded| decoded.into_owned());
            decoded.unwrap_or(value)
        })
        .collect()
}

pub async fn compare_bikes(
    req: HttpRequest,
    db: web::Data<Database>,
    ctx: RequestContext,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    let ids = query_values(req.query_string(), "bike_ids");
    Ok(HttpResponse::Ok().json(catalog::compare_bikes(&db, &ids).await?))
}

pub async fn dashboard_stats(
    db: web::Data<Database>,
    ctx: RequestContext,
) -> Result<HttpResponse, ApiError> {
    ctx.authorize(Permission::AuthenticatedOrReadOnly)?;
    Ok(HttpResponse::Ok().json(catalog::dashboard_stats(&db).await?))
}

pub async fn list_favorites(
    db: web::Data<Database>,
    ctx: RequestContext,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;
    Ok(HttpResponse::Ok().json(db.list_favorites(identity.user_id).await?))
}

pub async fn toggle_favorite(
    db: web::Data<Database>,
    ctx: RequestContext,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;
    let mut payload = Payload::new(&body)?;
    let bike_id = payload.pk("bike_id");
    let Some(bike_id) = bike_id else {
        return Err(payload.finish().err().unwrap_or_default().into());
    };

    let outcome = db
        .toggle_favorite(identity.user_id, bike_id)
        .await?
        .ok_or_else(ApiError::not_found)?;
    info!("[API] User {} favorite toggle on bike {}: {:?}", identity.user_id, bike_id, outcome);

    let body = json!({ "message": outcome.message() });
    Ok(match outcome {
        FavoriteToggle::Added => HttpResponse::Created().json(body),
        FavoriteToggle::Removed => HttpResponse::Ok().json(body),
    })
}

pub async fn delete_favorite(
    db: web::Data<Database>,
    ctx: RequestContext,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;
    if !db.delete_favorite(identity.user_id, *id).await? {
        return Err(ApiError::not_found());
    }
    Ok(HttpResponse::NoContent().finish())
}

fn parse_date(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.");
            None
        }
    }
}

fn parse_time(errors: &mut FieldErrors, field: &str, raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    let parsed = NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"));
    match parsed {
        Ok(time) => Some(time),
        Err(_) => {
            errors.add(
                field,
                "Time has wrong format. Use one of these formats instead: hh:mm[:ss[.uuuuuu]].",
            );
            None
        }
    }
}

pub async fn list_test_rides(
    db: web::Data<Database>,
    ctx: RequestContext,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;
    Ok(HttpResponse::Ok().json(db.list_test_rides(identity.visibility()).await?))
}

pub async fn create_test_ride(
    db: web::Data<Database>,
    ctx: RequestContext,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;

    let mut payload = Payload::new(&body)?;
    let bike = payload.pk("bike");
    let showroom = payload.pk("showroom");
    let preferred_date = payload.string("preferred_date");
    let preferred_time = payload.string("preferred_time");
    let notes = payload.optional_string("notes").unwrap_or_default();

    let errors = payload.errors_mut();
    if let Some(bike) = bike {
        if !db.bike_exists(bike).await? {
            errors.add("bike", format!("Invalid pk \"{}\" - object does not exist.", bike));
        }
    }
    if let Some(showroom) = showroom {
        match db.get_showroom(showroom).await? {
            None => errors.add(
                "showroom",
                format!("Invalid pk \"{}\" - object does not exist.", showroom),
            ),
            Some(found) if !found.is_active => {
                errors.add("showroom", "This showroom is not accepting test rides.")
            }
            Some(_) => {}
        }
    }
    let preferred_date = preferred_date.and_then(|raw| parse_date(errors, "preferred_date", &raw));
    let preferred_time = preferred_time.and_then(|raw| parse_time(errors, "preferred_time", &raw));

    let (Some(bike), Some(showroom), Some(preferred_date), Some(preferred_time)) =
        (bike, showroom, preferred_date, preferred_time)
    else {
        return Err(payload.finish().err().unwrap_or_default().into());
    };
    payload.finish()?;

    let ride = db
        .insert_test_ride(&NewTestRide {
            user_id: identity.user_id,
            bike_id: bike,
            showroom_id: showroom,
            preferred_date,
            preferred_time,
            notes,
        })
        .await?;
    Ok(HttpResponse::Created().json(ride))
}

pub async fn get_test_ride(
    db: web::Data<Database>,
    ctx: RequestContext,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;
    let ride = db
        .get_test_ride(*id, identity.visibility())
        .await?
        .ok_or_else(ApiError::not_found)?;
    Ok(HttpResponse::Ok().json(ride))
}

pub async fn update_test_ride(
    db: web::Data<Database>,
    ctx: RequestContext,
    id: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;

    let mut payload = Payload::new(&body)?;
    let preferred_date = payload.optional_string("preferred_date");
    let preferred_time = payload.optional_string("preferred_time");
    let status = payload.optional_choice::<TestRideStatus>("status");
    let notes = payload.optional_string("notes");
    let errors = payload.errors_mut();
    let patch = TestRidePatch {
        preferred_date: preferred_date.and_then(|raw| parse_date(errors, "preferred_date", &raw)),
        preferred_time: preferred_time.and_then(|raw| parse_time(errors, "preferred_time", &raw)),
        status,
        notes,
    };
    payload.finish()?;

    let visibility = identity.visibility();
    if patch.is_empty() {
        let ride = db.get_test_ride(*id, visibility).await?.ok_or_else(ApiError::not_found)?;
        return Ok(HttpResponse::Ok().json(ride));
    }

    let authority = if identity.is_staff {
        StatusAuthority::Staff
    } else {
        StatusAuthority::Owner
    };
    match db.update_test_ride(*id, visibility, authority, &patch).await? {
        TestRideUpdate::Updated(ride) => {
            info!("[API] Test ride {} updated by user {}", ride.id, identity.user_id);
            Ok(HttpResponse::Ok().json(ride))
        }
        TestRideUpdate::NotFound => Err(ApiError::not_found()),
        TestRideUpdate::StatusRefused { from, to } => {
            info!(
                "[API] User {} refused moving test ride {} from {} to {}",
                identity.user_id, *id, from, to
            );
            Err(ApiError::Forbidden(
                "Only staff can confirm, complete or reopen a test ride.".to_string(),
            ))
        }
    }
}

pub async fn delete_test_ride(
    db: web::Data<Database>,
    ctx: RequestContext,
    id: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let identity = ctx.require_identity()?;
    if !db.delete_test_ride(*id, identity.visibility()).await? {
        return Err(ApiError::not_found());
    }
    info!("[API] Test ride {} deleted by user {}", *id, identity.user_id);
    Ok(HttpResponse::NoContent().finish())
}
