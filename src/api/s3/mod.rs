pub mod client;

pub use client::S3BlobStore;
