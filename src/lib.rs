pub mod api;
pub mod auth;
pub mod calculators;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod payload;
pub mod seed;
