mod adjoint;
pub use adjoint::*;
mod control;
pub use control::*;
mod cost;
pub use cost::*;
mod error;
pub use error::*;
mod gradient;
pub use gradient::*;
mod optimizer;
pub use optimizer::*;
mod step_size;
pub use step_size::*;
mod store;
pub use store::*;
mod system;
pub use system::*;
