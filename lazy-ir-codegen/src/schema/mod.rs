pub mod types;
pub mod view;

pub use types::{BaseCType, CType, LazyArg, NamedCType, ScalarCType, ValueCType};
pub use view::{LazyIrSchema, NativeFunction, NativeFunctionsGroup, OpSource, OperatorName, Return};
