pub mod config;
pub mod driver;
pub mod env;
pub mod error;
pub mod lab;
pub mod topology;

pub use crate::lab::Lab;
