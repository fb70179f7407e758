pub mod catalog;
pub mod config;
pub mod db;
pub mod karma;
pub mod models;
pub mod notify;
pub mod seed;
pub mod session;
pub mod store;
pub mod trade;
