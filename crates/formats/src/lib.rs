pub mod features;
pub mod source;

pub use features::*;
pub use source::*;
