mod lower;
mod plan;
mod render;
mod shape;
mod symbol;
mod value_expr;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::GenConfig;
use crate::error::{Error, GenResult};
use crate::lowering::{LoweringBody, TsLowering};
use crate::schema::{NativeFunction, OpSource};
use crate::signature::{DispatcherSignature, KernelSignature};

pub use lower::{lower_dispatch, lower_node_class};
pub use plan::{Bridge, DispatchPlan, NodeClassPlan, ScalarField, TensorDecl};
pub use render::{render_dispatch, render_node_class, CodeWriter};
pub use shape::{shape_decl, LazyShapeCache, ShapeCacheApi, ShapeSignature, ShapeStrategy};
pub use symbol::SymbolTable;
pub use value_expr::ValueExprWriter;

/// Text fragments for a batch of operations, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub node_classes: Vec<String>,
    pub dispatch_fns: Vec<String>,
    /// Only for operations without a structured metafunction
    pub shape_decls: Vec<String>,
}

/// Emits node classes, dispatch functions and shape declarations, with the
/// external collaborators injected.
pub struct Generator<'a> {
    cfg: &'a GenConfig,
    lowering: &'a dyn LoweringBody,
    signature: &'a dyn KernelSignature,
    shape_cache: &'a dyn ShapeCacheApi,
}

impl<'a> Generator<'a> {
    pub fn new(cfg: &'a GenConfig) -> Self {
        Self {
            cfg,
            lowering: &TsLowering,
            signature: &DispatcherSignature,
            shape_cache: &LazyShapeCache,
        }
    }

    pub fn with_lowering(mut self, lowering: &'a dyn LoweringBody) -> Self {
        self.lowering = lowering;
        self
    }

    pub fn with_signature(mut self, signature: &'a dyn KernelSignature) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_shape_cache(mut self, shape_cache: &'a dyn ShapeCacheApi) -> Self {
        self.shape_cache = shape_cache;
        self
    }

    pub fn node_class(&self, func: &NativeFunction) -> String {
        render_node_class(&lower_node_class(func, self.cfg, self.lowering))
    }

    pub fn dispatch_fn(&self, func: &NativeFunction) -> GenResult<String> {
        let plan = lower_dispatch(func, self.cfg, self.signature)?;
        Ok(render_dispatch(&plan, self.shape_cache))
    }

    pub fn shape_decl(&self, func: &NativeFunction) -> Option<String> {
        shape_decl(func, self.signature)
    }

    /// Generate every fragment for `ops`. Any failing operation aborts the
    /// whole batch, as does a second operation mapping to an already
    /// generated node class (`relu` and `relu_` outside a group).
    pub fn generate(&self, ops: &[OpSource]) -> GenResult<Generated> {
        let mut generated = Generated::default();
        let mut seen_decls = BTreeSet::new();
        let mut node_owners: BTreeMap<String, String> = BTreeMap::new();

        for op in ops {
            let node_fn = op.node_function();
            let node = node_fn.schema.node_name();
            let op_name = node_fn.schema.name().to_string();
            if let Some(first) = node_owners.get(node) {
                return Err(Error::DuplicateNodeClass {
                    node: node.to_string(),
                    first: first.clone(),
                    second: op_name,
                });
            }
            node_owners.insert(node.to_string(), op_name);
            log::debug!("node class {node}");
            generated.node_classes.push(self.node_class(node_fn));

            for func in op.functions() {
                generated.dispatch_fns.push(self.dispatch_fn(func)?);
                // Variants sharing a base name and arguments share a declaration.
                if let Some(decl) = self.shape_decl(func) {
                    if seen_decls.insert(decl.clone()) {
                        generated.shape_decls.push(decl);
                    }
                }
            }
        }

        log::info!(
            "generated {} node classes, {} dispatch functions, {} shape declarations",
            generated.node_classes.len(),
            generated.dispatch_fns.len(),
            generated.shape_decls.len()
        );
        Ok(generated)
    }
}
