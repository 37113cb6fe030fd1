pub mod financial_data;

pub use financial_data::*;
