mod array;
pub use array::*;
mod interval;
pub use interval::*;
mod json;
pub use json::*;
