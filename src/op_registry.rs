use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::operator::Operator;
use crate::ops;

/// Registry used to construct operators when loading a model.
///
/// The registry maps an operator type, such as
/// `"ExperimentalDetectronPriorGridGenerator"`, to a function which reads the
/// operator's attributes and constructs the operator.
///
/// New registries have no operators registered by default. To create a
/// registry with all built-in operators pre-registered, use
/// [`OpRegistry::with_all_ops`].
#[derive(Default)]
pub struct OpRegistry {
    ops: FxHashMap<&'static str, RegisteredOp>,
}

struct RegisteredOp {
    version: &'static str,
    read: Box<ReadOpFunction>,
}

type ReadOpResult = Result<Arc<dyn Operator + Send + Sync>, ReadOpError>;

type ReadOpFunction = dyn Fn(&Attrs) -> ReadOpResult + Send + Sync;

impl OpRegistry {
    /// Create a new empty registry.
    pub fn new() -> OpRegistry {
        OpRegistry {
            ops: FxHashMap::default(),
        }
    }

    /// Register an operator.
    ///
    /// This replaces any operator previously registered with the same type.
    pub fn register_op<Op: ReadOp + 'static>(&mut self) {
        self.ops.insert(
            Op::op_type(),
            RegisteredOp {
                version: Op::op_version(),
                read: Box::new(|attrs: &Attrs| Op::read_boxed(attrs)),
            },
        );
    }

    /// Construct an operator of type `op_type` from its attributes.
    ///
    /// If `version` is specified, it must match the version of the
    /// registered operator. Attributes which the operator does not read are
    /// ignored.
    pub fn read_op(
        &self,
        op_type: &str,
        version: Option<&str>,
        attrs: &Map<String, Value>,
    ) -> ReadOpResult {
        let registered = self
            .ops
            .get(op_type)
            .ok_or_else(|| ReadOpError::OperatorUnavailable {
                name: op_type.to_string(),
            })?;

        if let Some(version) = version {
            if version != registered.version {
                return Err(ReadOpError::VersionMismatch {
                    name: op_type.to_string(),
                    expected: registered.version.to_string(),
                    actual: version.to_string(),
                });
            }
        }

        let attrs = Attrs::new(attrs);
        let op = (registered.read)(&attrs)?;

        for name in attrs.unused() {
            tracing::warn!(op_type, attr = name, "ignoring unsupported attribute");
        }

        Ok(op)
    }

    /// Return the types of registered operators, in sorted order.
    pub fn op_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.ops.keys().copied().collect();
        types.sort();
        types
    }

    /// Create a new registry with all built-in operators registered.
    pub fn with_all_ops() -> OpRegistry {
        let mut reg = OpRegistry::new();

        macro_rules! register_op {
            ($op:ident) => {
                reg.register_op::<ops::$op>()
            };
        }

        register_op!(ExperimentalDetectronPriorGridGenerator);

        reg
    }
}

/// Error type for errors that occur when constructing an operator.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadOpError {
    /// An attribute has an unsupported or invalid value.
    AttrError {
        /// Name of the attribute.
        attr: String,
        /// Description of the attribute error.
        error: String,
    },
    /// The operator type is not registered.
    OperatorUnavailable { name: String },
    /// The operator is registered with a different version than requested.
    VersionMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

impl ReadOpError {
    fn attr_error(attr: impl AsRef<str>, error: impl AsRef<str>) -> Self {
        Self::AttrError {
            attr: attr.as_ref().to_string(),
            error: error.as_ref().to_string(),
        }
    }
}

impl Display for ReadOpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadOpError::AttrError { attr, error } => {
                write!(f, "error in attribute \"{}\": {}", attr, error)
            }
            ReadOpError::OperatorUnavailable { name } => {
                write!(f, "{name} operator not supported")
            }
            ReadOpError::VersionMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "{name} operator version \"{actual}\" not supported, expected \"{expected}\""
            ),
        }
    }
}

impl Error for ReadOpError {}

/// Construct an operator from the attributes in a model description.
pub trait ReadOp: Operator + Sized + Send + Sync {
    /// Return the operator type used to identify the operator in model
    /// descriptions.
    fn op_type() -> &'static str;

    /// Return the operator set version this implementation follows.
    fn op_version() -> &'static str;

    /// Construct the operator from its attributes.
    fn read(attrs: &Attrs) -> Result<Self, ReadOpError>;

    /// Construct the operator as a `dyn Operator`.
    fn read_boxed(attrs: &Attrs) -> ReadOpResult {
        let op = Self::read(attrs)?;
        Ok(Arc::new(op))
    }
}

/// Wrapper around the attributes of an operator in a model description.
///
/// This provides methods to read attributes by name with a given type. It
/// also records which attributes have been read, so that attributes the
/// operator does not support can be reported.
///
/// Attribute values may be given as JSON values of the expected type, or as
/// strings, as produced by formats which serialize all attributes as text.
pub struct Attrs<'a> {
    attrs: &'a Map<String, Value>,
    used_attrs: RefCell<SmallVec<[&'static str; 6]>>,
}

impl<'a> Attrs<'a> {
    pub fn new(attrs: &'a Map<String, Value>) -> Self {
        Self {
            attrs,
            used_attrs: RefCell::new(Default::default()),
        }
    }

    fn get(&self, name: &'static str) -> Option<&'a Value> {
        self.used_attrs.borrow_mut().push(name);
        self.attrs.get(name)
    }

    /// Get an optional boolean attribute.
    pub fn get_bool(&self, name: &'static str) -> Result<Option<bool>, ReadOpError> {
        let Some(val) = self.get(name) else {
            return Ok(None);
        };
        let bool_val = match val {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(s) => match s.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        bool_val
            .map(Some)
            .ok_or_else(|| ReadOpError::attr_error(name, "expected a boolean"))
    }

    /// Get a required boolean attribute.
    pub fn require_bool(&self, name: &'static str) -> Result<bool, ReadOpError> {
        self.get_bool(name)?
            .ok_or_else(|| ReadOpError::attr_error(name, "required attribute missing"))
    }

    /// Get an optional integer attribute.
    pub fn get_int(&self, name: &'static str) -> Result<Option<i64>, ReadOpError> {
        self.get_number(name, Value::as_i64, "expected an integer")
    }

    /// Get an optional floating point attribute.
    pub fn get_float(&self, name: &'static str) -> Result<Option<f32>, ReadOpError> {
        let val = self.get_number(name, Value::as_f64, "expected a number")?;
        Ok(val.map(|x| x as f32))
    }

    fn get_number<T: FromStr>(
        &self,
        name: &'static str,
        as_number: impl Fn(&Value) -> Option<T>,
        error: &str,
    ) -> Result<Option<T>, ReadOpError> {
        let Some(val) = self.get(name) else {
            return Ok(None);
        };
        let number = match val {
            Value::String(s) => s.trim().parse().ok(),
            val => as_number(val),
        };
        number
            .map(Some)
            .ok_or_else(|| ReadOpError::attr_error(name, error))
    }

    /// Return the names of attributes which have not been read.
    pub fn unused(&self) -> Vec<&'a str> {
        let used = self.used_attrs.borrow();
        self.attrs
            .keys()
            .map(|name| name.as_str())
            .filter(|name| !used.iter().any(|used_name| used_name == name))
            .collect()
    }
}

impl ReadOp for ops::ExperimentalDetectronPriorGridGenerator {
    fn op_type() -> &'static str {
        Self::OP_TYPE
    }

    fn op_version() -> &'static str {
        Self::VERSION
    }

    fn read(attrs: &Attrs) -> Result<Self, ReadOpError> {
        let default = Self::default();
        Ok(Self {
            flatten: attrs.require_bool("flatten")?,
            h: attrs.get_int("h")?.unwrap_or(default.h),
            w: attrs.get_int("w")?.unwrap_or(default.w),
            stride_x: attrs.get_float("stride_x")?.unwrap_or(default.stride_x),
            stride_y: attrs.get_float("stride_y")?.unwrap_or(default.stride_y),
        })
    }
}
