//! Typed arguments of a lazy IR schema.
//!
//! `CType` is the raw four-variant shape an argument arrives with. It is
//! classified once into a `LazyArg`, after which every consumer matches
//! exhaustively over graph values and scalars.

use serde::{Deserialize, Serialize};

use crate::error::{Error, GenResult};

/// Element type of an argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseCType {
    /// `torch::lazy::Value` - tracked by the lazy graph
    Value,
    /// Plain C++ data type, e.g. `int64_t` or `at::Scalar`
    Plain(String),
}

impl BaseCType {
    pub fn cpp_type(&self) -> &str {
        match self {
            BaseCType::Value => "torch::lazy::Value",
            BaseCType::Plain(ty) => ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CType {
    Base(BaseCType),
    Optional(BaseCType),
    Vector(BaseCType),
    OptionalVector(BaseCType),
}

impl CType {
    pub fn cpp_type(&self) -> String {
        match self {
            CType::Base(b) => b.cpp_type().to_string(),
            CType::Optional(b) => format!("c10::optional<{}>", b.cpp_type()),
            CType::Vector(b) => format!("std::vector<{}>", b.cpp_type()),
            CType::OptionalVector(b) => format!("c10::optional<std::vector<{}>>", b.cpp_type()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCType {
    pub name: String,
    pub ty: CType,
}

impl NamedCType {
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Classify into a graph value or a scalar. Vectors of graph values have
    /// no node representation and are rejected.
    pub fn classify(&self, op: &str) -> GenResult<LazyArg> {
        let name = self.name.clone();
        let arg = match &self.ty {
            CType::Base(BaseCType::Value) => LazyArg::Value {
                name,
                ty: ValueCType::Plain,
            },
            CType::Optional(BaseCType::Value) => LazyArg::Value {
                name,
                ty: ValueCType::Optional,
            },
            CType::Vector(BaseCType::Value) | CType::OptionalVector(BaseCType::Value) => {
                return Err(Error::UnsupportedArgument {
                    op: op.to_string(),
                    arg: self.name.clone(),
                });
            }
            CType::Base(BaseCType::Plain(t)) => LazyArg::Scalar {
                name,
                ty: ScalarCType::Plain(t.clone()),
            },
            CType::Optional(BaseCType::Plain(t)) => LazyArg::Scalar {
                name,
                ty: ScalarCType::Optional(t.clone()),
            },
            CType::Vector(BaseCType::Plain(t)) => LazyArg::Scalar {
                name,
                ty: ScalarCType::Vector(t.clone()),
            },
            CType::OptionalVector(BaseCType::Plain(t)) => LazyArg::Scalar {
                name,
                ty: ScalarCType::OptionalVector(t.clone()),
            },
        };
        Ok(arg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCType {
    Plain,
    /// Absent values become `kNullValue` at the node base
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarCType {
    Plain(String),
    Optional(String),
    Vector(String),
    OptionalVector(String),
}

impl ScalarCType {
    pub fn cpp_type(&self) -> String {
        match self {
            ScalarCType::Plain(t) => t.clone(),
            ScalarCType::Optional(t) => format!("c10::optional<{t}>"),
            ScalarCType::Vector(t) => format!("std::vector<{t}>"),
            ScalarCType::OptionalVector(t) => format!("c10::optional<std::vector<{t}>>"),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ScalarCType::Optional(_) | ScalarCType::OptionalVector(_))
    }
}

/// A classified schema argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LazyArg {
    Value { name: String, ty: ValueCType },
    Scalar { name: String, ty: ScalarCType },
}

impl LazyArg {
    pub fn name(&self) -> &str {
        match self {
            LazyArg::Value { name, .. } | LazyArg::Scalar { name, .. } => name,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, LazyArg::Value { .. })
    }

    pub fn cpp_type(&self) -> String {
        match self {
            LazyArg::Value {
                ty: ValueCType::Plain,
                ..
            } => "torch::lazy::Value".to_string(),
            LazyArg::Value {
                ty: ValueCType::Optional,
                ..
            } => "c10::optional<torch::lazy::Value>".to_string(),
            LazyArg::Scalar { ty, .. } => ty.cpp_type(),
        }
    }
}
