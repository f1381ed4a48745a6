// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod models;
pub mod routes;
pub mod sampler;
pub mod units;
pub mod usage_repo;
pub mod worker;
