//! Calling-convention signatures for generated dispatch functions.

use crate::config::BackendIndex;
use crate::schema::{LazyArg, NativeFunction, ScalarCType, ValueCType};

/// Supplies the kernel declaration and dispatcher argument list for an op.
pub trait KernelSignature {
    /// Declaration head for the kernel named `name`, without a body.
    fn decl(&self, func: &NativeFunction, backend: &BackendIndex, name: &str) -> String;

    /// Dispatcher-style parameter declarations, in schema order.
    fn dispatcher_args(&self, func: &NativeFunction) -> Vec<String>;
}

/// ATen dispatcher conventions: tensors by const reference, the mutated
/// tensor of an in-place op by mutable reference, lists as `at::ArrayRef`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DispatcherSignature;

impl KernelSignature for DispatcherSignature {
    /// The ATen convention is the same for every backend, so `backend` is unused.
    fn decl(&self, func: &NativeFunction, _backend: &BackendIndex, name: &str) -> String {
        let args = self.dispatcher_args(func).join(", ");
        format!("{} {name}({args})", return_type(func))
    }

    fn dispatcher_args(&self, func: &NativeFunction) -> Vec<String> {
        let schema = &func.schema;
        let mutated = schema
            .is_inplace()
            .then(|| schema.tensor_values().next().map(|(name, _)| name))
            .flatten();

        schema
            .filtered_types()
            .iter()
            .map(|arg| match arg {
                LazyArg::Value { name, .. } if Some(name.as_str()) == mutated => {
                    format!("at::Tensor & {name}")
                }
                LazyArg::Value { name, .. } if schema.is_wrapped_scalar(name) => {
                    format!("const at::Scalar & {name}")
                }
                LazyArg::Value {
                    name,
                    ty: ValueCType::Plain,
                } => format!("const at::Tensor & {name}"),
                LazyArg::Value {
                    name,
                    ty: ValueCType::Optional,
                } => format!("const c10::optional<at::Tensor> & {name}"),
                LazyArg::Scalar { name, ty } => match ty {
                    ScalarCType::Plain(t) => format!("{t} {name}"),
                    ScalarCType::Optional(t) => format!("c10::optional<{t}> {name}"),
                    ScalarCType::Vector(t) => format!("at::ArrayRef<{t}> {name}"),
                    ScalarCType::OptionalVector(t) => {
                        format!("c10::optional<at::ArrayRef<{t}>> {name}")
                    }
                },
            })
            .collect()
    }
}

fn return_type(func: &NativeFunction) -> String {
    let returns = func.schema.returns();
    if func.schema.is_inplace() {
        return "at::Tensor &".to_string();
    }
    match returns {
        [] => "void".to_string(),
        [single] => single.ty.clone(),
        many => {
            let tys: Vec<&str> = many.iter().map(|r| r.ty.as_str()).collect();
            format!("std::tuple<{}>", tys.join(","))
        }
    }
}
