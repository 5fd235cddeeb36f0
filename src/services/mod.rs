pub mod chart_service;
pub mod fetch_service;
pub mod pipeline_service;
pub mod publish_service;
