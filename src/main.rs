use std::io;

use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};
use motomart::api;
use motomart::auth::JwtAuth;
use motomart::config::Settings;
use motomart::db::Database;
use motomart::seed::seed_demo_data;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load configuration
    let settings = Settings::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::other(e)
    })?;

    // Initialize the database
    let db = Database::new(&settings.database_path).map_err(io::Error::other)?;
    db.create_schema().await.map_err(io::Error::other)?;
    info!("Schema ready in {}", settings.database_path);

    if settings.seed_demo_data {
        seed_demo_data(&db).await.map_err(io::Error::other)?;
    }

    let db = web::Data::new(db);
    let jwt = web::Data::new(JwtAuth::new(settings.jwt_secret.as_bytes()));

    info!("listening on http://{}", settings.bind_addr);

    // Start the Actix Web server
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(db.clone())
            .app_data(jwt.clone())
            .configure(api::configure)
    })
    .bind(settings.bind_addr)?
    .run()
    .await
}
