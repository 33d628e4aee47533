//! HTTP request handlers

pub mod auth;
pub mod chat;
pub mod health;
pub mod search;
pub mod suppliers;
pub mod uploads;
