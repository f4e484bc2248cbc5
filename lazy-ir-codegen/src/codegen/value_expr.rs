use crate::schema::{LazyArg, LazyIrSchema, ScalarCType, ValueCType};

const SCALAR_TO_IR_VALUE: &str =
    "torch::lazy::LazyGraphExecutor::Get()->GetIrValueForScalarFromCodegen";

pub struct ValueExprWriter<'a> {
    pub schema: &'a LazyIrSchema,
}

/**
 * Builds the C++ expressions that materialize one schema argument at each
 * of its call sites.
 */
impl<'a> ValueExprWriter<'a> {
    pub fn new(schema: &'a LazyIrSchema) -> Self {
        Self { schema }
    }

    /// Tensor handle variable for a graph value: `lazy_{name}`.
    pub fn handle(&self, name: &str) -> String {
        format!("lazy_{name}")
    }

    /// `torch::lazy::Value` rvalue, for places that accept null values.
    ///
    /// - Plain → `lazy_x.GetIrValue()`
    /// - Optional → `lazy_x ? lazy_x.GetIrValue() : torch::lazy::Value()`
    pub fn ir_value(&self, name: &str, ty: ValueCType) -> String {
        let handle = self.handle(name);
        match ty {
            ValueCType::Plain => format!("{handle}.GetIrValue()"),
            ValueCType::Optional => {
                format!("{handle} ? {handle}.GetIrValue() : torch::lazy::Value()")
            }
        }
    }

    /// Rvalue passed into the node constructor. Vectors are copied so the
    /// node owns its inputs past the call.
    pub fn ctor_arg(&self, arg: &LazyArg) -> String {
        match arg {
            LazyArg::Value { name, ty } => {
                let wrapped = self.schema.is_wrapped_scalar(name);
                match (ty, wrapped) {
                    (ValueCType::Plain, true) => format!("{SCALAR_TO_IR_VALUE}({name})"),
                    (ValueCType::Plain, false) => format!("{}.GetIrValue()", self.handle(name)),
                    (ValueCType::Optional, true) => format!(
                        "{name} ? c10::make_optional({SCALAR_TO_IR_VALUE}(*{name})) : c10::nullopt"
                    ),
                    (ValueCType::Optional, false) => {
                        let handle = self.handle(name);
                        format!(
                            "{handle} ? c10::make_optional({handle}.GetIrValue()) : c10::nullopt"
                        )
                    }
                }
            }
            LazyArg::Scalar { name, ty } => match ty {
                ScalarCType::Vector(elem) => {
                    format!("std::vector<{elem}>({name}.begin(), {name}.end())")
                }
                ScalarCType::OptionalVector(elem) => {
                    format!("torch::lazy::ToOptionalVector<{elem}>({name})")
                }
                ScalarCType::Plain(_) | ScalarCType::Optional(_) => name.clone(),
            },
        }
    }

    /// Argument to a shape/dtype function: the caller's own name.
    pub fn shape_arg<'b>(&self, arg: &'b LazyArg) -> &'b str {
        arg.name()
    }
}
