//! Lowering method of generated node classes.

use crate::schema::{LazyArg, NativeFunction, ValueCType};

/// Supplies the signature and body of a node's lowering method.
pub trait LoweringBody {
    fn signature(&self) -> String;

    /// Body lines, unindented.
    fn body(&self, func: &NativeFunction) -> Vec<String>;
}

/// Lowers each node to a TorchScript builtin call on its operator symbol.
#[derive(Debug, Default, Clone, Copy)]
pub struct TsLowering;

impl LoweringBody for TsLowering {
    fn signature(&self) -> String {
        "torch::lazy::TSOpVector Lower(std::shared_ptr<torch::jit::GraphFunction> function, \
         torch::lazy::TSLoweringContext* loctx) const override"
            .to_string()
    }

    fn body(&self, func: &NativeFunction) -> Vec<String> {
        let schema = &func.schema;
        let args = schema.filtered_types();
        let out = format!("{}_out", schema.aten_name());

        let mut lines = vec![
            "std::vector<torch::jit::NamedValue> arguments;".to_string(),
            format!("arguments.reserve({});", args.len()),
            "size_t i = 0;".to_string(),
        ];
        for arg in args {
            let line = match arg {
                LazyArg::Value {
                    ty: ValueCType::Plain,
                    ..
                } => "arguments.emplace_back(loctx->GetOutputOp(operand(i++)));".to_string(),
                // Absent optionals were never added as operands.
                LazyArg::Value {
                    name,
                    ty: ValueCType::Optional,
                } => format!(
                    "arguments.emplace_back(has_{name} ? loctx->GetOutputOp(operand(i++)) : nullptr);"
                ),
                LazyArg::Scalar { name, .. } => {
                    format!("arguments.emplace_back(\"{name}\", {name});")
                }
            };
            lines.push(line);
        }
        lines.push(format!(
            "torch::lazy::TSOpVector {out} = torch::lazy::LowerTSBuiltin(function, op().op, arguments);"
        ));
        lines.push(format!("CHECK_EQ({out}.size(), {});", schema.returns().len()));
        lines.push(format!("return {out};"));
        lines
    }
}
