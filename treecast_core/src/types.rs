//! Declared field types and their classification.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::definition::{BundleDefinition, BundleType};
use crate::error::{BundleError, BundleResult};
use crate::metadata::Layer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    Bytes,
    Any,
}

/// Reference from a Directory field to a nested bundle type.
#[derive(Clone)]
pub enum RecordRef {
    /// A statically declared type, resolved through the registry.
    Static {
        type_id: TypeId,
        resolve: fn() -> BundleResult<Arc<BundleDefinition>>,
    },
    /// An already-built definition (synthesized types).
    Built(Arc<BundleDefinition>),
}

impl RecordRef {
    pub fn resolve(&self) -> BundleResult<Arc<BundleDefinition>> {
        match self {
            RecordRef::Static { resolve, .. } => resolve(),
            RecordRef::Built(def) => Ok(def.clone()),
        }
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Static { type_id, .. } => write!(f, "Static({type_id:?})"),
            RecordRef::Built(def) => write!(f, "Built({})", def.name()),
        }
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecordRef::Static { type_id: a, .. }, RecordRef::Static { type_id: b, .. }) => a == b,
            (RecordRef::Built(a), RecordRef::Built(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// The declared type of a field.
///
/// `Dir` and `File` take an argument list so that declarations with the
/// wrong arity can be represented and rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Scalar(ScalarKind),
    Map(Box<TypeExpr>),
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Record(RecordRef),
    Path,
    Dir(Vec<TypeExpr>),
    File(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn str() -> Self {
        TypeExpr::Scalar(ScalarKind::Str)
    }

    pub fn int() -> Self {
        TypeExpr::Scalar(ScalarKind::Int)
    }

    pub fn float() -> Self {
        TypeExpr::Scalar(ScalarKind::Float)
    }

    pub fn bool() -> Self {
        TypeExpr::Scalar(ScalarKind::Bool)
    }

    pub fn bytes() -> Self {
        TypeExpr::Scalar(ScalarKind::Bytes)
    }

    pub fn any() -> Self {
        TypeExpr::Scalar(ScalarKind::Any)
    }

    /// A string-keyed mapping with values of type `value`.
    pub fn map(value: TypeExpr) -> Self {
        TypeExpr::Map(Box::new(value))
    }

    pub fn list(item: TypeExpr) -> Self {
        TypeExpr::List(Box::new(item))
    }

    pub fn set(item: TypeExpr) -> Self {
        TypeExpr::Set(Box::new(item))
    }

    pub fn union(members: Vec<TypeExpr>) -> Self {
        TypeExpr::Union(members)
    }

    /// The statically declared bundle type `T`.
    pub fn record<T: BundleType>() -> Self {
        TypeExpr::Record(RecordRef::Static {
            type_id: TypeId::of::<T>(),
            resolve: T::definition,
        })
    }

    pub fn built(definition: Arc<BundleDefinition>) -> Self {
        TypeExpr::Record(RecordRef::Built(definition))
    }

    /// `Dir` of a single argument.
    pub fn dir(inner: TypeExpr) -> Self {
        TypeExpr::Dir(vec![inner])
    }

    /// `Dir` of a list of bundle records.
    pub fn dir_list(inner: TypeExpr) -> Self {
        TypeExpr::Dir(vec![TypeExpr::list(inner)])
    }

    /// `File` of a single payload shape.
    pub fn file(payload: TypeExpr) -> Self {
        TypeExpr::File(vec![payload])
    }

    fn contains_dir(&self) -> bool {
        match self {
            TypeExpr::Dir(_) => true,
            TypeExpr::Map(inner) | TypeExpr::List(inner) | TypeExpr::Set(inner) => {
                inner.contains_dir()
            }
            TypeExpr::Union(members) | TypeExpr::File(members) => {
                members.iter().any(TypeExpr::contains_dir)
            }
            TypeExpr::Scalar(_) | TypeExpr::Record(_) | TypeExpr::Path => false,
        }
    }

    fn is_text_scalar(&self) -> bool {
        match self {
            TypeExpr::Scalar(ScalarKind::Str | ScalarKind::Int | ScalarKind::Float) => true,
            TypeExpr::Union(members) => {
                !members.is_empty() && members.iter().all(TypeExpr::is_text_scalar)
            }
            _ => false,
        }
    }

    fn is_mapping(&self) -> bool {
        matches!(self, TypeExpr::Map(_))
    }
}

/// How a field participates in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Materialized as a sub-directory holding a nested record.
    Directory,
    /// Materialized as a file holding a payload.
    File,
    /// Plain data, never written or read.
    Value,
}

impl FieldKind {
    pub fn layer(&self) -> Option<Layer> {
        match self {
            FieldKind::Directory => Some(Layer::Directory),
            FieldKind::File => Some(Layer::File),
            FieldKind::Value => None,
        }
    }
}

/// Result of classifying one declared field.
#[derive(Debug, Clone)]
pub(crate) struct Classification {
    pub kind: FieldKind,
    pub nested: Option<Arc<BundleDefinition>>,
    pub is_collection: bool,
    pub inferred_extension: Option<&'static str>,
}

pub(crate) fn classify(ty: &TypeExpr, record: &str, field: &str) -> BundleResult<Classification> {
    let invalid = |reason: &str| BundleError::InvalidAnnotation {
        record: record.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    };

    match ty {
        TypeExpr::Dir(args) => {
            let [arg] = args.as_slice() else {
                return Err(invalid("Dir requires exactly one argument"));
            };
            let (payload, is_collection) = match arg {
                TypeExpr::List(inner) | TypeExpr::Set(inner) => (inner.as_ref(), true),
                other => (other, false),
            };
            let TypeExpr::Record(reference) = payload else {
                return Err(invalid("Dir must reference another bundle type"));
            };
            let nested = reference.resolve().map_err(|err| match err {
                BundleError::InvalidAnnotation {
                    record: target,
                    field,
                    reason,
                } if field.is_empty() => invalid(&format!("refers back to '{target}': {reason}")),
                other => other,
            })?;
            Ok(Classification {
                kind: FieldKind::Directory,
                nested: Some(nested),
                is_collection,
                inferred_extension: None,
            })
        }
        TypeExpr::File(args) => {
            let [payload] = args.as_slice() else {
                return Err(invalid("File requires exactly one argument"));
            };
            if payload.contains_dir() {
                return Err(invalid("File payload cannot contain Dir"));
            }
            Ok(Classification {
                kind: FieldKind::File,
                nested: None,
                is_collection: false,
                inferred_extension: infer_extension(payload),
            })
        }
        _ => Ok(Classification {
            kind: FieldKind::Value,
            nested: None,
            is_collection: false,
            inferred_extension: None,
        }),
    }
}

/// Default extension for a File payload shape, if one can be inferred.
pub fn infer_extension(payload: &TypeExpr) -> Option<&'static str> {
    if payload.is_text_scalar() {
        return Some("txt");
    }
    match payload {
        TypeExpr::Map(_) => Some("json"),
        TypeExpr::List(inner) if inner.is_mapping() => Some("jsonl"),
        TypeExpr::List(inner) if inner.is_text_scalar() => Some("txt"),
        _ => None,
    }
}
