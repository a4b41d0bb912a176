//! Vector and matrix primitives for tinyformer.
//!
//! Everything here works on `f64` `ndarray` views and returns owned arrays.
//! Shape mismatches are caller bugs and panic rather than returning errors.

pub mod attention;
pub mod layernorm;
pub mod loss;
pub mod matmul;
pub mod utils;

pub use attention::*;
pub use layernorm::*;
pub use loss::*;
pub use matmul::*;
pub use utils::*;
