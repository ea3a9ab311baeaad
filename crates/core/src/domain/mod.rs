pub mod bar;
pub mod error;
pub mod market;
pub mod recommendation;
