pub mod aggregate;
pub mod charts;
pub mod deck;
pub mod filter;
pub mod render;
pub mod symbology;
pub mod table;
pub mod treemap;
pub mod viewport;

pub use aggregate::*;
pub use charts::*;
pub use deck::*;
pub use filter::*;
pub use render::*;
pub use symbology::*;
pub use table::*;
pub use treemap::*;
pub use viewport::*;
