pub mod geodesy;
pub mod utm;

pub use geodesy::*;
pub use utm::*;
