use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use motomart::api;
use motomart::auth::{Claims, JwtAuth};
use motomart::db::Database;
use motomart::models::bike::{FuelType, NewBike, NewBrand};
use motomart::models::showroom::NewShowroom;

const SECRET: &[u8] = b"integration-secret";

macro_rules! test_app {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($db.clone()))
                .app_data(web::Data::new(JwtAuth::new(SECRET)))
                .configure(api::configure),
        )
        .await
    };
}

struct Fixture {
    db: Database,
    honda: i64,
    activa: i64,
    shine: i64,
    rizta: i64,
    showroom: i64,
}

async fn fixture() -> Fixture {
    let db = Database::new(":memory:").unwrap();
    db.create_schema().await.unwrap();

    let honda = db.insert_brand(&NewBrand::new("Honda")).await.unwrap().id;
    let ather = db.insert_brand(&NewBrand::new("Ather")).await.unwrap().id;

    let mut activa = NewBike::new(honda, "Activa 6G", Decimal::from(76_000), FuelType::Petrol);
    activa.is_featured = true;
    let activa = db.insert_bike(&activa).await.unwrap().id;
    let shine = db
        .insert_bike(&NewBike::new(honda, "Shine 100", Decimal::from(65_000), FuelType::Petrol))
        .await
        .unwrap()
        .id;
    let rizta = db
        .insert_bike(&NewBike::new(ather, "Rizta", Decimal::from(110_000), FuelType::Electric))
        .await
        .unwrap()
        .id;
    let showroom = db
        .insert_showroom(&NewShowroom::new("Wheels Hub", "Pune"))
        .await
        .unwrap()
        .id;

    Fixture {
        db,
        honda,
        activa,
        shine,
        rizta,
        showroom,
    }
}

fn bearer(user_id: i64, staff: bool) -> (header::HeaderName, String) {
    let mut claims = Claims::new(user_id, format!("user{}", user_id), Duration::hours(1));
    claims.is_staff = staff;
    let token = JwtAuth::new(SECRET).encode(&claims).unwrap();
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

#[actix_web::test]
async fn test_health() {
    let fx = fixture().await;
    let app = test_app!(fx.db);
    let req = test::TestRequest::get().uri("/api/health/").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "ok");
}

#[actix_web::test]
async fn test_emi_calculator() {
    let fx = fixture().await;
    let app = test_app!(fx.db);
    let payload = json!({
        "principal_amount": "100000",
        "down_payment": "20000",
        "interest_rate": "10",
        "tenure_months": 12
    });

    // calculators are POST, so anonymous callers are turned away
    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .insert_header(bearer(1, false))
        .set_json(&payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["principal"], "80000.00");
    assert_eq!(body["emi"], "7033.27");
    assert_eq!(body["total_amount"], "84399.25");
    assert_eq!(body["total_interest"], "4399.25");
}

#[actix_web::test]
async fn test_emi_calculator_validation() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .insert_header(bearer(1, false))
        .set_json(json!({
            "principal_amount": "50000",
            "down_payment": "50000",
            "interest_rate": "9",
            "tenure_months": 24
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["non_field_errors"][0],
        "Down payment must be less than principal amount"
    );

    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .insert_header(bearer(1, false))
        .set_json(json!({
            "principal_amount": "50000",
            "down_payment": "0",
            "interest_rate": "9",
            "tenure_months": 0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["tenure_months"].is_array());

    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .insert_header(bearer(1, false))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_emi_calculator_field_errors() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    // missing principal_amount
    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .insert_header(bearer(1, false))
        .set_json(json!({
            "down_payment": "0",
            "interest_rate": "9",
            "tenure_months": 24
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "principal_amount": ["This field is required."] }));

    // malformed principal_amount and tenure_months
    let req = test::TestRequest::post()
        .uri("/api/calculators/emi/")
        .insert_header(bearer(1, false))
        .set_json(json!({
            "principal_amount": "abc",
            "down_payment": "0",
            "interest_rate": "9",
            "tenure_months": "two years"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "principal_amount": ["A valid number is required."],
            "tenure_months": ["A valid integer is required."]
        })
    );

    let req = test::TestRequest::post()
        .uri("/api/calculators/fuel-cost/")
        .insert_header(bearer(1, false))
        .set_json(json!(["1500", "100", "40"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["non_field_errors"][0],
        "Invalid data. Expected a dictionary, but got list."
    );
}

#[actix_web::test]
async fn test_fuel_cost_calculator() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::post()
        .uri("/api/calculators/fuel-cost/")
        .insert_header(bearer(2, false))
        .set_json(json!({
            "monthly_km": "1500",
            "fuel_price_per_liter": "100",
            "bike_mileage": "40"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["monthly_fuel_needed"], "37.50");
    assert_eq!(body["monthly_cost"], "3750.00");
    assert_eq!(body["yearly_cost"], "45000.00");

    let req = test::TestRequest::post()
        .uri("/api/calculators/fuel-cost/")
        .insert_header(bearer(2, false))
        .set_json(json!({
            "monthly_km": "1500",
            "fuel_price_per_liter": "100",
            "bike_mileage": "0"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_bike_listing_and_detail() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::get()
        .uri(&format!("/api/bikes/?brand={}&ordering=price", fx.honda))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![fx.shine, fx.activa]);
    assert_eq!(body[0]["brand_name"], "Honda");
    assert_eq!(body[0]["price"], "65000.00");

    let req = test::TestRequest::get()
        .uri("/api/bikes/?fuel_type=diesel")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/api/bikes/{}/", fx.rizta))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["model_name"], "Rizta");
    assert!(body["specifications"].is_object());
    assert_eq!(body["total_reviews"], 0);

    let req = test::TestRequest::get().uri("/api/bikes/9999/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_bike_listing_with_huge_price_bounds() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::get()
        .uri("/api/bikes/?min_price=79228162514264337593543950335")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([]));

    let req = test::TestRequest::get()
        .uri("/api/bikes/?max_price=79228162514264337593543950335")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn test_similar_and_suggestions() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::get()
        .uri(&format!("/api/bikes/{}/similar/", fx.activa))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_i64().unwrap())
        .collect();
    // same brand; Rizta is another brand, fuel and outside the price band
    assert_eq!(ids, vec![fx.shine]);

    let req = test::TestRequest::get().uri("/api/bikes/9999/similar/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([]));

    let req = test::TestRequest::get()
        .uri("/api/search/suggestions/?q=a")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([]));

    let req = test::TestRequest::get()
        .uri("/api/search/suggestions/?q=HON")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["name"], "Honda Shine 100");
    assert!(body[0]["image"].is_null());
}

#[actix_web::test]
async fn test_compare() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::get()
        .uri(&format!("/api/compare/?bike_ids={}&bike_ids={}", fx.rizta, fx.activa))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["id"], fx.rizta);
    assert_eq!(body[1]["id"], fx.activa);
    assert!(body[0]["features"].is_array());

    let req = test::TestRequest::get()
        .uri(&format!("/api/compare/?bike_ids={}", fx.rizta))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Please select 2-3 bikes to compare");

    let req = test::TestRequest::get()
        .uri(&format!("/api/compare/?bike_ids={}&bike_ids=9999", fx.rizta))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "One or more bikes not found");
}

#[actix_web::test]
async fn test_dashboard_stats() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::get().uri("/api/dashboard/stats/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total_bikes"], 3);
    assert_eq!(body["total_showrooms"], 1);
    assert_eq!(body["total_reviews"], 0);
    assert_eq!(body["featured_bikes"].as_array().unwrap().len(), 1);
    assert_eq!(body["featured_bikes"][0]["id"], fx.activa);
    assert_eq!(body["trending_bikes"], json!([]));
    assert_eq!(body["upcoming_launches"], json!([]));
}

#[actix_web::test]
async fn test_favorite_toggle() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::post()
        .uri("/api/favorites/")
        .set_json(json!({ "bike_id": fx.activa }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let toggle = || {
        test::TestRequest::post()
            .uri("/api/favorites/")
            .insert_header(bearer(7, false))
            .set_json(json!({ "bike_id": fx.activa }))
            .to_request()
    };

    let resp = test::call_service(&app, toggle()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Added to favorites");

    let req = test::TestRequest::get()
        .uri("/api/favorites/")
        .insert_header(bearer(7, false))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["bike"]["id"], fx.activa);

    let resp = test::call_service(&app, toggle()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Removed from favorites");

    let req = test::TestRequest::post()
        .uri("/api/favorites/")
        .insert_header(bearer(7, false))
        .set_json(json!({ "bike_id": 9999 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_favorite_delete_is_scoped_to_owner() {
    let fx = fixture().await;
    fx.db.toggle_favorite(7, fx.rizta).await.unwrap();
    let favorite_id = fx.db.list_favorites(7).await.unwrap()[0].id;
    let app = test_app!(fx.db);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/favorites/{}/", favorite_id))
        .insert_header(bearer(8, false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/favorites/{}/", favorite_id))
        .insert_header(bearer(7, false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_test_ride_lifecycle() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::post()
        .uri("/api/test-rides/")
        .insert_header(bearer(11, false))
        .set_json(json!({
            "bike": fx.shine,
            "showroom": fx.showroom,
            "preferred_date": "2026-11-02",
            "preferred_time": "10:30",
            "notes": "Weekend slot"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let ride: Value = test::read_body_json(resp).await;
    assert_eq!(ride["status"], "pending");
    assert_eq!(ride["user"], 11);
    assert_eq!(ride["bike_name"], "Shine 100");
    assert_eq!(ride["bike_brand"], "Honda");
    assert_eq!(ride["showroom_name"], "Wheels Hub");
    let ride_uri = format!("/api/test-rides/{}/", ride["id"]);

    // another customer cannot see it
    let req = test::TestRequest::get()
        .uri(&ride_uri)
        .insert_header(bearer(12, false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/test-rides/")
        .insert_header(bearer(12, false))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!([]));

    // staff see every booking
    let req = test::TestRequest::get()
        .uri("/api/test-rides/")
        .insert_header(bearer(1, true))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // re-sending the current status is not a change
    let req = test::TestRequest::patch()
        .uri(&ride_uri)
        .insert_header(bearer(11, false))
        .set_json(json!({ "status": "pending", "notes": "Weekend slot" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "pending");

    // the owner cannot confirm their own ride
    let req = test::TestRequest::patch()
        .uri(&ride_uri)
        .insert_header(bearer(11, false))
        .set_json(json!({ "status": "confirmed" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&ride_uri)
        .insert_header(bearer(1, true))
        .set_json(json!({ "status": "confirmed", "preferred_time": "11:00:00" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["preferred_time"], "11:00:00");
    assert_eq!(body["notes"], "Weekend slot");

    let req = test::TestRequest::patch()
        .uri(&ride_uri)
        .insert_header(bearer(11, false))
        .set_json(json!({ "status": "done" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"][0], "\"done\" is not a valid choice.");

    let req = test::TestRequest::delete()
        .uri(&ride_uri)
        .insert_header(bearer(11, false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_test_ride_validation() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::post()
        .uri("/api/test-rides/")
        .insert_header(bearer(11, false))
        .set_json(json!({
            "bike": 9999,
            "showroom": fx.showroom,
            "preferred_date": "tomorrow",
            "preferred_time": "10:30"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["bike"].is_array());
    assert!(body["preferred_date"].is_array());
    assert!(body.get("showroom").is_none());

    let mut closed = NewShowroom::new("Old Garage", "Pune");
    closed.is_active = false;
    let closed = fx.db.insert_showroom(&closed).await.unwrap().id;
    let req = test::TestRequest::post()
        .uri("/api/test-rides/")
        .insert_header(bearer(11, false))
        .set_json(json!({
            "bike": "abc",
            "showroom": closed,
            "preferred_time": "10:30"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["bike"][0], "Incorrect type. Expected pk value, received str.");
    assert_eq!(body["showroom"][0], "This showroom is not accepting test rides.");
    assert_eq!(body["preferred_date"][0], "This field is required.");
    assert!(body.get("preferred_time").is_none());

    let req = test::TestRequest::get().uri("/api/test-rides/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_invalid_token_is_rejected() {
    let fx = fixture().await;
    let app = test_app!(fx.db);

    let req = test::TestRequest::get()
        .uri("/api/bikes/")
        .insert_header((header::AUTHORIZATION, "Bearer forged.token.value"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
