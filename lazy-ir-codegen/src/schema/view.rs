//! Per-operation schema view: operator identity, classified arguments and
//! return types.

use std::collections::BTreeSet;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use super::types::{LazyArg, NamedCType, ScalarCType, ValueCType};
use crate::error::{Error, GenResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorName {
    /// Base name as written, including a trailing `_` for in-place variants
    pub base: String,
    pub overload: Option<String>,
    pub inplace: bool,
}

impl OperatorName {
    /// Parse `base[.overload]`, e.g. `add.Tensor` or `relu_`.
    pub fn parse(name: &str) -> GenResult<Self> {
        let (base, overload) = match name.split_once('.') {
            Some((base, overload)) => (base, Some(overload)),
            None => (name, None),
        };
        let valid = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if !valid(base) || overload.is_some_and(|o| !valid(o)) {
            return Err(Error::InvalidOperatorName(name.to_string()));
        }

        let dunder = base.len() > 4 && base.starts_with("__") && base.ends_with("__");
        let inplace = !dunder && base.ends_with('_') && base.len() > 1;

        Ok(Self {
            base: base.to_string(),
            overload: overload.map(str::to_string),
            inplace,
        })
    }

    /// Name without the in-place suffix, shared by `relu` and `relu_`.
    pub fn base_name(&self) -> &str {
        if self.inplace {
            &self.base[..self.base.len() - 1]
        } else {
            &self.base
        }
    }
}

impl std::fmt::Display for OperatorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.overload {
            Some(o) => write!(f, "{}.{o}", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Return {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_return_type")]
    pub ty: String,
}

fn default_return_type() -> String {
    "at::Tensor".to_string()
}

impl Return {
    pub fn tensor() -> Self {
        Self {
            name: None,
            ty: default_return_type(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawLazyIrSchema {
    name: String,
    args: Vec<NamedCType>,
    #[serde(default)]
    wrapped_scalar_names: Vec<String>,
    returns: Vec<Return>,
}

/// Immutable view of one operation. Arguments are classified on
/// construction, so value/scalar partitioning holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLazyIrSchema")]
pub struct LazyIrSchema {
    name: OperatorName,
    node_name: String,
    args: Vec<LazyArg>,
    wrapped_scalar_names: BTreeSet<String>,
    returns: Vec<Return>,
}

impl TryFrom<RawLazyIrSchema> for LazyIrSchema {
    type Error = Error;

    fn try_from(raw: RawLazyIrSchema) -> GenResult<Self> {
        let wrapped: Vec<&str> = raw.wrapped_scalar_names.iter().map(String::as_str).collect();
        LazyIrSchema::new(&raw.name, raw.args, &wrapped, raw.returns)
    }
}

impl LazyIrSchema {
    pub fn new(
        name: &str,
        args: Vec<NamedCType>,
        wrapped_scalar_names: &[&str],
        returns: Vec<Return>,
    ) -> GenResult<Self> {
        let name = OperatorName::parse(name)?;
        let op = name.to_string();
        let args = args
            .iter()
            .map(|a| a.classify(&op))
            .collect::<GenResult<Vec<_>>>()?;

        let wrapped_scalar_names: BTreeSet<String> =
            wrapped_scalar_names.iter().map(|s| s.to_string()).collect();
        // A promoted scalar must arrive as a graph value.
        for wrapped in &wrapped_scalar_names {
            if !args.iter().any(|a| a.is_value() && a.name() == wrapped.as_str()) {
                return Err(Error::UnsupportedArgument {
                    op,
                    arg: wrapped.clone(),
                });
            }
        }

        let node_name = node_name(&name);
        Ok(Self {
            name,
            node_name,
            args,
            wrapped_scalar_names,
            returns,
        })
    }

    pub fn name(&self) -> &OperatorName {
        &self.name
    }

    /// Operator identity as interned upstream, e.g. `relu_`.
    pub fn aten_name(&self) -> &str {
        &self.name.base
    }

    pub fn base_name(&self) -> &str {
        self.name.base_name()
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn is_inplace(&self) -> bool {
        self.name.inplace
    }

    pub fn returns(&self) -> &[Return] {
        &self.returns
    }

    pub fn filtered_types(&self) -> &[LazyArg] {
        &self.args
    }

    pub fn value_types(&self) -> impl Iterator<Item = (&str, ValueCType)> + '_ {
        self.args.iter().filter_map(|a| match a {
            LazyArg::Value { name, ty } => Some((name.as_str(), *ty)),
            LazyArg::Scalar { .. } => None,
        })
    }

    pub fn scalar_types(&self) -> impl Iterator<Item = (&str, &ScalarCType)> + '_ {
        self.args.iter().filter_map(|a| match a {
            LazyArg::Scalar { name, ty } => Some((name.as_str(), ty)),
            LazyArg::Value { .. } => None,
        })
    }

    pub fn wrapped_scalar_names(&self) -> &BTreeSet<String> {
        &self.wrapped_scalar_names
    }

    pub fn is_wrapped_scalar(&self, name: &str) -> bool {
        self.wrapped_scalar_names.contains(name)
    }

    /// Graph values backed by a caller tensor (promoted scalars excluded).
    pub fn tensor_values(&self) -> impl Iterator<Item = (&str, ValueCType)> + '_ {
        self.value_types()
            .filter(|(name, _)| !self.is_wrapped_scalar(name))
    }
}

/// `add.Tensor` -> `AddTensor`, `relu_` -> `Relu`.
fn node_name(name: &OperatorName) -> String {
    let mut full = name.base.clone();
    if let Some(o) = &name.overload {
        full.push('_');
        full.push_str(o);
    }
    full.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NativeFunction {
    pub schema: LazyIrSchema,
    #[serde(default)]
    pub structured: bool,
    #[serde(default)]
    pub structured_delegate: Option<String>,
}

impl NativeFunction {
    pub fn new(schema: LazyIrSchema) -> Self {
        Self {
            schema,
            structured: false,
            structured_delegate: None,
        }
    }

    pub fn structured(mut self) -> Self {
        self.structured = true;
        self
    }

    pub fn delegating_to(mut self, delegate: impl Into<String>) -> Self {
        self.structured_delegate = Some(delegate.into());
        self
    }

    /// Whether shapes come from an `at::meta::` function.
    pub fn has_meta(&self) -> bool {
        self.structured || self.structured_delegate.is_some()
    }
}

/// Functional op with its in-place variant; both share one node class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NativeFunctionsGroup {
    pub functional: NativeFunction,
    #[serde(default)]
    pub inplace: Option<NativeFunction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpSource {
    Function(NativeFunction),
    Group(NativeFunctionsGroup),
}

/// A `functional` key marks a group. Dispatching on it keeps the inner
/// schema error instead of a generic no-variant-matched message.
impl<'de> Deserialize<'de> for OpSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("functional").is_some() {
            serde_json::from_value(value)
                .map(OpSource::Group)
                .map_err(D::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(OpSource::Function)
                .map_err(D::Error::custom)
        }
    }
}

impl OpSource {
    /// Function the node class is generated from.
    pub fn node_function(&self) -> &NativeFunction {
        match self {
            OpSource::Function(f) => f,
            OpSource::Group(g) => &g.functional,
        }
    }

    /// Every function that gets a dispatch entry point.
    pub fn functions(&self) -> Vec<&NativeFunction> {
        match self {
            OpSource::Function(f) => vec![f],
            OpSource::Group(g) => std::iter::once(&g.functional)
                .chain(g.inplace.as_ref())
                .collect(),
        }
    }
}

impl From<NativeFunction> for OpSource {
    fn from(f: NativeFunction) -> Self {
        OpSource::Function(f)
    }
}

impl From<NativeFunctionsGroup> for OpSource {
    fn from(g: NativeFunctionsGroup) -> Self {
        OpSource::Group(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{BaseCType, CType};

    fn value(name: &str) -> NamedCType {
        NamedCType::new(name, CType::Base(BaseCType::Value))
    }

    fn scalar(name: &str, ty: &str) -> NamedCType {
        NamedCType::new(name, CType::Base(BaseCType::Plain(ty.to_string())))
    }

    #[test]
    fn parse_operator_names() {
        let n = OperatorName::parse("add.Tensor").unwrap();
        assert_eq!(n.base, "add");
        assert_eq!(n.overload.as_deref(), Some("Tensor"));
        assert!(!n.inplace);

        let n = OperatorName::parse("relu_").unwrap();
        assert!(n.inplace);
        assert_eq!(n.base_name(), "relu");

        let n = OperatorName::parse("__and__.Tensor").unwrap();
        assert!(!n.inplace);
        assert_eq!(n.base_name(), "__and__");
    }

    #[test]
    fn parse_rejects_bad_names() {
        for bad in ["", ".Tensor", "add.", "add-mul"] {
            let err = OperatorName::parse(bad).unwrap_err();
            assert!(err.to_string().contains("invalid operator name"), "got: {err}");
        }
    }

    #[test]
    fn node_names_are_camel_case() {
        let cases = [
            ("add.Tensor", "AddTensor"),
            ("relu_", "Relu"),
            ("sigmoid_backward", "SigmoidBackward"),
            ("max_pool2d", "MaxPool2d"),
        ];
        for (name, expected) in cases {
            let schema = LazyIrSchema::new(name, vec![value("self")], &[], vec![Return::tensor()])
                .unwrap();
            assert_eq!(schema.node_name(), expected);
        }
    }

    #[test]
    fn partition_values_and_scalars() {
        let schema = LazyIrSchema::new(
            "add.Tensor",
            vec![value("self"), value("other"), scalar("alpha", "at::Scalar")],
            &[],
            vec![Return::tensor()],
        )
        .unwrap();
        let values: Vec<_> = schema.value_types().map(|(n, _)| n).collect();
        let scalars: Vec<_> = schema.scalar_types().map(|(n, _)| n).collect();
        assert_eq!(values, ["self", "other"]);
        assert_eq!(scalars, ["alpha"]);
        assert_eq!(schema.filtered_types().len(), values.len() + scalars.len());
    }

    #[test]
    fn wrapped_scalar_must_be_a_value() {
        let err = LazyIrSchema::new(
            "add.Scalar",
            vec![value("self"), scalar("other", "at::Scalar")],
            &["other"],
            vec![Return::tensor()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("'other'"), "got: {err}");
    }

    #[test]
    fn tensor_values_skip_wrapped_scalars() {
        let schema = LazyIrSchema::new(
            "add.Scalar",
            vec![value("self"), value("other")],
            &["other"],
            vec![Return::tensor()],
        )
        .unwrap();
        let tensors: Vec<_> = schema.tensor_values().map(|(n, _)| n).collect();
        assert_eq!(tensors, ["self"]);
    }

    #[test]
    fn deserialize_group_and_function() {
        let json = r#"[
            {
                "schema": {
                    "name": "abs",
                    "args": [{"name": "self", "ty": {"Base": "Value"}}],
                    "returns": [{}]
                },
                "structured_delegate": "abs.out"
            },
            {
                "functional": {
                    "schema": {
                        "name": "relu",
                        "args": [{"name": "self", "ty": {"Base": "Value"}}],
                        "returns": [{}]
                    }
                },
                "inplace": {
                    "schema": {
                        "name": "relu_",
                        "args": [{"name": "self", "ty": {"Base": "Value"}}],
                        "returns": [{}]
                    }
                }
            }
        ]"#;
        let ops: Vec<OpSource> = serde_json::from_str(json).unwrap();
        assert!(matches!(&ops[0], OpSource::Function(f) if f.has_meta()));
        assert_eq!(ops[1].functions().len(), 2);
        assert_eq!(ops[1].node_function().schema.aten_name(), "relu");
        assert_eq!(ops[0].node_function().schema.returns()[0].ty, "at::Tensor");
    }

    #[test]
    fn op_source_load_keeps_schema_error() {
        let json = r#"[
            {
                "schema": {
                    "name": "cat",
                    "args": [{"name": "tensors", "ty": {"Vector": "Value"}}],
                    "returns": [{}]
                }
            }
        ]"#;
        let err = serde_json::from_str::<Vec<OpSource>>(json).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("cat: unsupported argument type for 'tensors'"), "got: {msg}");

        let json = r#"{
            "functional": {
                "schema": {
                    "name": "stack",
                    "args": [{"name": "tensors", "ty": {"Vector": "Value"}}],
                    "returns": [{}]
                }
            }
        }"#;
        let err = serde_json::from_str::<OpSource>(json).unwrap_err();
        assert!(err.to_string().contains("stack: unsupported argument"), "got: {err}");
    }

    #[test]
    fn deserialize_rejects_vector_of_values() {
        let json = r#"{
            "schema": {
                "name": "cat",
                "args": [{"name": "tensors", "ty": {"Vector": "Value"}}],
                "returns": [{}]
            }
        }"#;
        let err = serde_json::from_str::<NativeFunction>(json).unwrap_err();
        assert!(err.to_string().contains("unsupported argument"), "got: {err}");
    }
}
