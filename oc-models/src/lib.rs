mod builder;
pub use builder::*;
mod fhn;
pub use fhn::*;
mod hopf;
pub use hopf::*;
mod linear;
pub use linear::*;
mod model;
pub use model::*;
mod network;
pub use network::*;
mod noise;
pub use noise::*;
mod wilson_cowan;
pub use wilson_cowan::*;
