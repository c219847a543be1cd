//! Safe SQL builder and bind parameters.

pub mod builder;
pub mod params;
pub use builder::*;
pub use params::PgBindValue;
