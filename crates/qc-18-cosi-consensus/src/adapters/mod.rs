//! Adapters layer (Hexagonal Architecture)

mod local_tree;
mod schnorr;

pub use local_tree::*;
pub use schnorr::*;
