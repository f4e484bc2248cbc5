//! Codegen plan IR
//!
//! Two plans per operation:
//! 1. **NodeClassPlan**: IR node class (constructor, scalar members, presence flags)
//! 2. **DispatchPlan**: kernel body (handles, hashes, cached shapes, node, bridge)
//!
//! Produced by `lower`, consumed by `render`. Every expression is already
//! materialized, so rendering cannot fail.

use super::shape::ShapeStrategy;

// ─── (1) Node class ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NodeClassPlan {
    pub node_name: String,
    pub node_base: String,
    /// Interned operator symbol, e.g. `at::aten::add`
    pub op_symbol: String,
    /// `const <type>& <name>` for every argument, schema order
    pub ctor_params: Vec<String>,
    /// Operands forwarded to the base node
    pub base_values: Vec<String>,
    pub num_outputs: usize,
    pub scalar_fields: Vec<ScalarField>,
    /// Optional graph values that need a `has_<name>` flag
    pub optional_values: Vec<String>,
    pub lowering_signature: String,
    pub lowering_body: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub name: String,
    pub cpp_type: String,
    pub optional: bool,
}

// ─── (2) Dispatch function ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub decl: String,
    pub device_args: Vec<String>,
    pub tensor_class: String,
    pub tensor_decls: Vec<TensorDecl>,
    /// Operator identity first, then scalars in declaration order
    pub node_hash_inputs: Vec<String>,
    /// Graph values in declaration order
    pub dag_hash_inputs: Vec<String>,
    pub shapes: ShapeStrategy,
    pub returns: usize,
    pub node_name: String,
    pub ctor_args: Vec<String>,
    pub bridge: Bridge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TensorDecl {
    /// Existing lazy tensor, or a new one wrapping a number
    Plain { name: String },
    /// Lookup tolerating an absent tensor
    Optional { name: String },
}

/// How the node is handed back to the caller. `first` is the first tensor
/// argument; its handle provides the device.
#[derive(Debug, Clone, PartialEq)]
pub enum Bridge {
    Single { first: String },
    Tuple { first: String, count: usize },
    InPlace { first: String },
}
