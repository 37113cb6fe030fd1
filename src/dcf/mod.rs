pub mod forecast;
pub mod ratios;
pub mod sensitivity;
pub mod valuation;

pub use forecast::*;
pub use ratios::*;
pub use sensitivity::*;
pub use valuation::*;
