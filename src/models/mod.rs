//! Data models for the chart pipeline
//!
//! Value types passed between the fetch, chart and publish services.

pub mod chart;
pub mod price;
pub mod stats;
pub mod table;

pub use chart::{artifact_name, ChartImage, PublishedArtifact};
pub use price::{DateWindow, PricePoint, PriceSeries};
pub use stats::FetchStats;
pub use table::PriceTable;
