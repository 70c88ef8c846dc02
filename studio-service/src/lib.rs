//! Studio Service - bookings, invoicing, payments and the editing pipeline of a photography studio.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::AppState;
