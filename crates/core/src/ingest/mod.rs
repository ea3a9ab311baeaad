pub mod provider;
pub mod types;
pub mod universe;
