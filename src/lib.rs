pub mod aggregate;
pub mod audit;
pub mod build_report;
pub mod calculator;
pub mod config;
pub mod documents;
pub mod error;
pub mod http_client;
pub mod match_feed;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod round_builder;
pub mod schedule;
pub mod standings;
pub mod stat_extract;
pub mod store;
