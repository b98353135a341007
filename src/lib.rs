pub use ::rowkit_core::*;
pub use ::rowkit_macros::*;
