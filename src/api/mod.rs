//! Clients for the external services the pipeline talks to

pub mod alphavantage;
pub mod s3;
