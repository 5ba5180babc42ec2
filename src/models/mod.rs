pub mod enums;
pub mod intake;
pub mod prescription;
pub mod statistics;

pub use enums::*;
pub use intake::*;
pub use prescription::*;
pub use statistics::*;
