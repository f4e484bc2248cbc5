use std::fmt;

pub type GenResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Argument type outside the supported set (e.g. a vector of graph values)
    UnsupportedArgument { op: String, arg: String },
    /// Operator has no graph-value argument to anchor device and bridge on
    MissingValueArgument { op: String },
    /// In-place operator declares more than one return
    InplaceArity { op: String, returns: usize },
    /// Operator declares no return, so there is no output to bridge
    MissingReturn { op: String },
    /// Two operators in one batch map to the same node class
    DuplicateNodeClass { node: String, first: String, second: String },
    /// Operator name could not be parsed
    InvalidOperatorName(String),
    /// Config or schema JSON failed to deserialize
    Config(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedArgument { op, arg } => {
                write!(f, "{op}: unsupported argument type for '{arg}'")
            }
            Error::MissingValueArgument { op } => {
                write!(f, "{op}: only tensor ops are supported, no value argument found")
            }
            Error::InplaceArity { op, returns } => write!(
                f,
                "{op}: in-place op must have exactly 1 return, found {returns}"
            ),
            Error::MissingReturn { op } => {
                write!(f, "{op}: operator declares no return, nothing to bridge")
            }
            Error::DuplicateNodeClass {
                node,
                first,
                second,
            } => write!(
                f,
                "{second}: node class {node} already generated for {first}; \
                 pass in-place variants in a group with their functional op"
            ),
            Error::InvalidOperatorName(name) => write!(f, "invalid operator name '{name}'"),
            Error::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e)
    }
}
