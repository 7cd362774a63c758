//! Client-side personalization for furniture search: stored preferences,
//! search history, wishlist and comparison, and personalized ranking of
//! backend results.

pub mod backend;
pub mod comparison;
pub mod config;
pub mod eid;
pub mod engine;
pub mod errors;
pub mod factory;
pub mod preferences;
pub mod product;
pub mod search_context;
pub mod service;
pub mod storage;
pub mod web;
pub mod wishlist;

#[cfg(test)]
mod tests;
