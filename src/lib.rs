//! Tech Digest - A daily developer news dashboard
//!
//! This crate fetches GitHub, Hacker News, arXiv and Reddit content for a
//! given day and renders it as a tabbed web page. Each source is fetched
//! independently, so one upstream outage only empties its own tab.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod model;
pub mod routes;
pub mod sources;
