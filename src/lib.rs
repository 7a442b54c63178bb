// Library for tests to access modules

pub mod config;
pub mod estimator;
pub mod hub;
pub mod models;
pub mod routes;
pub mod source;
pub mod transport;
pub mod version;
