//! Shape inference: structured metafunction or hand-written
//! `compute_shape_<name>`, wrapped in a lookup on the shape cache keyed
//! by `dag_hash`.

use crate::schema::{LazyIrSchema, NativeFunction};
use crate::signature::KernelSignature;

use super::render::CodeWriter;
use super::value_expr::ValueExprWriter;

const SHAPE_FN_NAMESPACE: &str = "torch_lazy_tensors::ir::ops";

/// C++ surface of the shape cache the emitted code talks to.
///
/// Emitted code only does check, compute on miss, insert. A cache that is
/// not safe under concurrent access may compute an entry twice.
pub trait ShapeCacheApi {
    /// Expression producing the cache handle.
    fn acquire(&self) -> String;

    /// Lookup yielding a shared pointer, `nullptr` on miss.
    fn get(&self, cache: &str, key: &str) -> String;

    /// Insert `shapes` (an expression convertible to `std::vector<Shape>`)
    /// and yield the stored pointer.
    fn add(&self, cache: &str, key: &str, shapes: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LazyShapeCache;

impl ShapeCacheApi for LazyShapeCache {
    fn acquire(&self) -> String {
        "torch::lazy::GetShapeCache()".to_string()
    }

    fn get(&self, cache: &str, key: &str) -> String {
        format!("{cache}->Get({key})")
    }

    fn add(&self, cache: &str, key: &str, shapes: &str) -> String {
        format!("{cache}->Add({key}, std::make_shared<std::vector<Shape>>({shapes}))")
    }
}

/// Signature of a hand-written shape function. Named after the base
/// operator so in-place and functional variants share one implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeSignature {
    pub base_name: String,
    pub dispatch_args: Vec<String>,
    pub call_args: Vec<String>,
}

impl ShapeSignature {
    pub fn new(func: &NativeFunction, signature: &dyn KernelSignature) -> Self {
        let schema = &func.schema;
        Self {
            base_name: schema.base_name().to_string(),
            dispatch_args: signature.dispatcher_args(func),
            call_args: shape_args(schema),
        }
    }

    pub fn decl(&self) -> String {
        format!(
            "std::vector<Shape> compute_shape_{}({})",
            self.base_name,
            self.dispatch_args.join(", ")
        )
    }

    pub fn call(&self) -> String {
        format!(
            "{SHAPE_FN_NAMESPACE}::compute_shape_{}({})",
            self.base_name,
            self.call_args.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeStrategy {
    /// `at::meta::<aten_name>(args)` yields dtype and sizes per return
    Meta {
        aten_name: String,
        args: Vec<String>,
        returns: usize,
    },
    /// Hand-written `compute_shape_<base_name>`
    Custom(ShapeSignature),
}

impl ShapeStrategy {
    pub fn for_function(func: &NativeFunction, signature: &dyn KernelSignature) -> Self {
        if func.has_meta() {
            let schema = &func.schema;
            ShapeStrategy::Meta {
                aten_name: schema.aten_name().to_string(),
                args: shape_args(schema),
                returns: schema.returns().len(),
            }
        } else {
            ShapeStrategy::Custom(ShapeSignature::new(func, signature))
        }
    }
}

fn shape_args(schema: &LazyIrSchema) -> Vec<String> {
    let writer = ValueExprWriter::new(schema);
    schema
        .filtered_types()
        .iter()
        .map(|a| writer.shape_arg(a).to_string())
        .collect()
}

/// Forward declaration of the hand-written shape function, if one is needed.
pub fn shape_decl(func: &NativeFunction, signature: &dyn KernelSignature) -> Option<String> {
    match ShapeStrategy::for_function(func, signature) {
        ShapeStrategy::Meta { .. } => None,
        ShapeStrategy::Custom(sig) => Some(format!("{};", sig.decl())),
    }
}

/// Emit the cache lookup leaving `shapes` (a `std::vector<Shape>`) in scope.
pub fn emit_cached_shapes(
    w: &mut CodeWriter,
    strategy: &ShapeStrategy,
    returns: usize,
    cache: &dyn ShapeCacheApi,
) {
    w.line(format!("auto shape_cache = {};", cache.acquire()));
    w.line(format!("auto cached_shapes = {};", cache.get("shape_cache", "dag_hash")));
    w.open("if (cached_shapes == nullptr) {");
    match strategy {
        ShapeStrategy::Meta {
            aten_name,
            args,
            returns,
        } => {
            w.line(format!(
                "auto out_meta = at::meta::{aten_name}({});",
                args.join(", ")
            ));
            let shapes = meta_shapes(*returns);
            let list = format!("std::initializer_list<Shape>{{{}}}", shapes.join(", "));
            w.line(format!(
                "cached_shapes = {};",
                cache.add("shape_cache", "dag_hash", &list)
            ));
        }
        ShapeStrategy::Custom(sig) => {
            w.line(format!(
                "cached_shapes = {};",
                cache.add("shape_cache", "dag_hash", &sig.call())
            ));
        }
    }
    w.close("}");
    // Copy out of the entry: the node constructor takes the vector by move.
    w.line("auto shapes = *cached_shapes;");
    w.line(format!("TORCH_INTERNAL_ASSERT(shapes.size() == {returns});"));
}

fn meta_shapes(returns: usize) -> Vec<String> {
    if returns == 1 {
        return vec!["Shape(out_meta.scalar_type(), out_meta.sizes().vec())".to_string()];
    }
    (0..returns)
        .map(|i| {
            format!(
                "Shape(std::get<{i}>(out_meta).scalar_type(), std::get<{i}>(out_meta).sizes().vec())"
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BaseCType, CType, NamedCType, Return};
    use crate::signature::DispatcherSignature;

    fn make_fn(name: &str, returns: usize) -> NativeFunction {
        let schema = LazyIrSchema::new(
            name,
            vec![
                NamedCType::new("self", CType::Base(BaseCType::Value)),
                NamedCType::new("dim", CType::Base(BaseCType::Plain("int64_t".into()))),
            ],
            &[],
            (0..returns).map(|_| Return::tensor()).collect(),
        )
        .unwrap();
        NativeFunction::new(schema)
    }

    fn render(strategy: &ShapeStrategy, returns: usize) -> String {
        let mut w = CodeWriter::new(0);
        emit_cached_shapes(&mut w, strategy, returns, &LazyShapeCache);
        w.finish()
    }

    #[test]
    fn unstructured_uses_base_name() {
        let f = make_fn("cumsum_", 1);
        let decl = shape_decl(&f, &DispatcherSignature).unwrap();
        assert_eq!(
            decl,
            "std::vector<Shape> compute_shape_cumsum(at::Tensor & self, int64_t dim);"
        );
        let strategy = ShapeStrategy::for_function(&f, &DispatcherSignature);
        let text = render(&strategy, 1);
        assert!(
            text.contains("torch_lazy_tensors::ir::ops::compute_shape_cumsum(self, dim)"),
            "got: {text}"
        );
    }

    #[test]
    fn structured_and_delegates_skip_decl() {
        let f = make_fn("cumsum", 1).structured();
        assert!(shape_decl(&f, &DispatcherSignature).is_none());
        let f = make_fn("cumsum_", 1).delegating_to("cumsum.out");
        assert!(shape_decl(&f, &DispatcherSignature).is_none());
    }

    #[test]
    fn meta_single_return() {
        let f = make_fn("cumsum", 1).structured();
        let text = render(&ShapeStrategy::for_function(&f, &DispatcherSignature), 1);
        assert!(text.contains("auto out_meta = at::meta::cumsum(self, dim);"), "got: {text}");
        assert!(
            text.contains("Shape(out_meta.scalar_type(), out_meta.sizes().vec())"),
            "got: {text}"
        );
        assert!(!text.contains("std::get<"), "got: {text}");
    }

    #[test]
    fn meta_multi_return_indexes_every_output() {
        let f = make_fn("sort", 3).structured();
        let text = render(&ShapeStrategy::for_function(&f, &DispatcherSignature), 3);
        for i in 0..3 {
            assert!(text.contains(&format!("std::get<{i}>(out_meta)")), "got: {text}");
        }
        assert!(!text.contains("std::get<3>"), "got: {text}");
    }

    #[test]
    fn cache_block_checks_then_asserts_arity() {
        let f = make_fn("cumsum", 2);
        let text = render(&ShapeStrategy::for_function(&f, &DispatcherSignature), 2);
        let get = text.find("shape_cache->Get(dag_hash)").unwrap();
        let miss = text.find("if (cached_shapes == nullptr) {").unwrap();
        let add = text.find("shape_cache->Add(dag_hash, ").unwrap();
        let check = text.find("TORCH_INTERNAL_ASSERT(shapes.size() == 2);").unwrap();
        assert!(get < miss && miss < add && add < check, "got: {text}");
        assert!(text.contains("auto shapes = *cached_shapes;"), "got: {text}");
    }

    struct NamedCache;

    impl ShapeCacheApi for NamedCache {
        fn acquire(&self) -> String {
            "my::Cache()".to_string()
        }

        fn get(&self, cache: &str, key: &str) -> String {
            format!("{cache}.find({key})")
        }

        fn add(&self, cache: &str, key: &str, shapes: &str) -> String {
            format!("{cache}.insert({key}, {shapes})")
        }
    }

    #[test]
    fn injected_cache_api_is_used() {
        let f = make_fn("cumsum", 1);
        let strategy = ShapeStrategy::for_function(&f, &DispatcherSignature);
        let mut w = CodeWriter::new(0);
        emit_cached_shapes(&mut w, &strategy, 1, &NamedCache);
        let text = w.finish();
        assert!(text.contains("auto shape_cache = my::Cache();"), "got: {text}");
        assert!(text.contains("shape_cache.find(dag_hash)"), "got: {text}");
        assert!(text.contains("shape_cache.insert(dag_hash, "), "got: {text}");
        assert!(!text.contains("GetShapeCache"), "got: {text}");
    }
}
