pub mod errors;

pub use errors::clean_error;
