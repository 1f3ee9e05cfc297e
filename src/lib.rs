//! Showfloor - content backend for an exhibition and events site
//!
//! Events, portfolio, page sections, blog and company profile, with
//! image buckets, deferred uploads and an admin API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod storage;
