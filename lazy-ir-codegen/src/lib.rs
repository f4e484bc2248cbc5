//! Lazy-tensor IR generator: emits C++ node classes, dispatch kernels and
//! shape-function declarations from typed operator schemas.

pub mod codegen;
pub mod config;
pub mod error;
pub mod lowering;
pub mod schema;
pub mod signature;

pub use codegen::{Generated, Generator};
pub use config::{BackendIndex, GenConfig};
pub use error::{Error, GenResult};
