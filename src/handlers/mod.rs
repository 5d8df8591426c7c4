//! HTTP handlers

pub mod health;
pub mod models;
pub mod page;
pub mod predict;
pub mod evaluation;
pub mod batch;
