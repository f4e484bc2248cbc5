//! Renders node class and dispatch plans into C++ text.

use super::plan::*;
use super::shape::{emit_cached_shapes, ShapeCacheApi};

const INDENT: &str = "  ";

/// Line-oriented text buffer with brace-driven indentation.
pub struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub fn new(depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
        }
    }

    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Emit `text` and indent what follows.
    pub fn open(&mut self, text: impl AsRef<str>) {
        self.line(text);
        self.depth += 1;
    }

    /// Dedent and emit `text`.
    pub fn close(&mut self, text: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub fn finish(self) -> String {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Node class
// ---------------------------------------------------------------------------

pub fn render_node_class(plan: &NodeClassPlan) -> String {
    let NodeClassPlan {
        node_name,
        node_base,
        op_symbol,
        ctor_params,
        base_values,
        num_outputs,
        scalar_fields,
        optional_values,
        lowering_signature,
        lowering_body,
    } = plan;

    let mut params = ctor_params.clone();
    params.push("torch::lazy::hash_t node_hash".to_string());
    params.push("torch::lazy::hash_t dag_hash".to_string());
    params.push("std::vector<Shape>&& shapes".to_string());

    let mut w = CodeWriter::new(0);
    w.line(format!("class {node_name} : public {node_base} {{"));
    w.line(" public:");
    w.depth += 1;

    // Constructor: base init, then scalar members, then presence flags.
    w.line(format!("{node_name}({})", params.join(", ")));
    w.depth += 2;
    w.line(format!(": {node_base}(torch::lazy::OpKind({op_symbol}),"));
    w.depth += 1;
    w.line(format!("{{{}}}, std::move(shapes),", base_values.join(", ")));
    w.line(format!("/* num_outputs */ {num_outputs},"));
    w.line("node_hash,");
    let base_tail = if scalar_fields.is_empty() {
        "dag_hash)"
    } else {
        "dag_hash),"
    };
    w.line(base_tail);
    w.depth -= 1;
    for (i, field) in scalar_fields.iter().enumerate() {
        let sep = if i + 1 < scalar_fields.len() { "," } else { "" };
        w.line(format!("{0}({0}){sep}", field.name));
    }
    w.depth -= 2;
    w.open("{");
    for name in optional_values {
        w.line(format!("has_{name} = !!{name};"));
    }
    w.close("}");
    w.blank();

    w.open("std::string ToString() const override {");
    w.line("std::stringstream ss;");
    w.line(format!("ss << {node_base}::ToString();"));
    for field in scalar_fields {
        let name = &field.name;
        if field.optional {
            w.open(format!("if ({name}.has_value()) {{"));
            w.line(format!("ss << \", {name}=\" << {name}.value();"));
            w.close("} else {");
            w.depth += 1;
            w.line(format!("ss << \", {name}=null\";"));
            w.close("}");
        } else {
            w.line(format!("ss << \", {name}=\" << {name};"));
        }
    }
    w.line("return ss.str();");
    w.close("}");
    w.blank();

    w.open(format!("{lowering_signature} {{"));
    for line in lowering_body {
        w.line(line);
    }
    w.close("}");

    if !scalar_fields.is_empty() || !optional_values.is_empty() {
        w.blank();
    }
    for field in scalar_fields {
        w.line(format!("{} {};", field.cpp_type, field.name));
    }
    for name in optional_values {
        w.line(format!("bool has_{name}: 1;"));
    }
    w.depth -= 1;
    w.line("};");
    w.finish()
}

// ---------------------------------------------------------------------------
// Dispatch function
// ---------------------------------------------------------------------------

pub fn render_dispatch(plan: &DispatchPlan, cache: &dyn ShapeCacheApi) -> String {
    let mut w = CodeWriter::new(0);
    w.open(format!("{} {{", plan.decl));
    w.line("TORCH_LAZY_FN_COUNTER(\"lazy::\");");
    w.line(format!(
        "auto device = torch::lazy::GetBackendDevice({});",
        plan.device_args.join(", ")
    ));

    let tensor_class = &plan.tensor_class;
    for decl in &plan.tensor_decls {
        match decl {
            TensorDecl::Plain { name } => w.line(format!(
                "{tensor_class} lazy_{name} = torch::lazy::GetLtcTensorOrCreateForWrappedNumber({name}, *device);"
            )),
            TensorDecl::Optional { name } => w.line(format!(
                "{tensor_class} lazy_{name} = torch::lazy::TryGetLtcTensor({name}.value_or(at::Tensor()));"
            )),
        }
    }

    w.line(format!(
        "torch::lazy::hash_t node_hash = torch::lazy::MHash({});",
        plan.node_hash_inputs.join(", ")
    ));
    w.line(format!(
        "torch::lazy::hash_t dag_hash = torch::lazy::OperandHashes({{{}}}, node_hash);",
        plan.dag_hash_inputs.join(", ")
    ));

    emit_cached_shapes(&mut w, &plan.shapes, plan.returns, cache);

    let mut ctor_args = plan.ctor_args.clone();
    ctor_args.push("node_hash".to_string());
    ctor_args.push("dag_hash".to_string());
    ctor_args.push("std::move(shapes)".to_string());
    w.line(format!(
        "auto node = torch::lazy::MakeNode<ir::ops::{}>({});",
        plan.node_name,
        ctor_args.join(", ")
    ));

    render_bridge(&mut w, &plan.bridge, tensor_class);
    w.line("return result;");
    w.close("}");
    w.finish()
}

fn render_bridge(w: &mut CodeWriter, bridge: &Bridge, tensor_class: &str) {
    match bridge {
        Bridge::Single { first } => w.line(format!(
            "auto result = torch::lazy::CreateAtenFromLtcTensor(\
             torch::lazy::LazyTensor::Create(std::move(node), lazy_{first}.GetDevice()));"
        )),
        Bridge::Tuple { first, count } => {
            w.line(format!("std::vector<{tensor_class}> lazy_tensors;"));
            w.open(format!("for (int i = 0; i < {count}; i++) {{"));
            w.line(format!(
                "lazy_tensors.push_back(torch::lazy::LazyTensor::Create(\
                 torch::lazy::Value(node, i), lazy_{first}.GetDevice()));"
            ));
            w.close("}");
            w.line(format!(
                "auto result = torch::lazy::TupleAtenFromLtcTensors<{count}>(lazy_tensors);"
            ));
        }
        Bridge::InPlace { first } => {
            w.line(format!("lazy_{first}.SetInPlaceIrValue(node);"));
            w.line(format!("auto& result = {first};"));
        }
    }
}
