use std::sync::Arc;

use crate::error::{BundleError, BundleResult};
use crate::metadata::{BundleMetadata, Layer, LayerData, RawMetadata, layer_data, normalize_metadata};
use crate::registry;
use crate::types::{FieldKind, TypeExpr, classify};

/// Declaration of one field: its name, declared type and raw metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeExpr,
    pub metadata: RawMetadata,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            metadata: RawMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: RawMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Declaration of a bundle type: a name and an ordered field list.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(self, name: impl Into<String>, ty: TypeExpr) -> Self {
        self.field_with(name, ty, RawMetadata::new())
    }

    pub fn field_with(
        mut self,
        name: impl Into<String>,
        ty: TypeExpr,
        metadata: RawMetadata,
    ) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, ty).with_metadata(metadata));
        self
    }
}

/// A classified field with its normalized metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleField {
    pub name: String,
    pub kind: FieldKind,
    pub declared_type: TypeExpr,
    pub metadata: Vec<BundleMetadata>,
    pub raw_metadata: RawMetadata,
    /// Directory field holding a sequence of records (fan-out).
    pub is_collection: bool,
    /// Definition of the nested type, for Directory fields.
    pub nested: Option<Arc<BundleDefinition>>,
}

impl BundleField {
    /// Metadata for the field's own layer at collection position
    /// `position` (0 for scalar slots).
    pub fn layer_data(&self, position: usize) -> Option<&LayerData> {
        self.kind
            .layer()
            .and_then(|layer| layer_data(&self.metadata, layer, position))
    }

    /// Metadata for an explicit layer.
    pub fn layer_data_for(&self, layer: Layer, position: usize) -> Option<&LayerData> {
        layer_data(&self.metadata, layer, position)
    }

    /// Extension resolved at definition time (explicit or inferred): the
    /// first File-layer record that carries one.
    pub fn extension(&self) -> Option<&str> {
        self.metadata
            .iter()
            .filter(|meta| meta.layer == Layer::File)
            .find_map(|meta| meta.data.extension.as_deref())
    }
}

/// The resolved schema of one bundle type. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleDefinition {
    name: String,
    fields: Vec<BundleField>,
}

impl BundleDefinition {
    /// Classifies every field and normalizes its metadata.
    pub fn build(descriptor: RecordDescriptor) -> BundleResult<Self> {
        let RecordDescriptor { name, fields } = descriptor;
        let mut built: Vec<BundleField> = Vec::with_capacity(fields.len());
        for field in fields {
            if built.iter().any(|seen| seen.name == field.name) {
                return Err(BundleError::InvalidAnnotation {
                    record: name.clone(),
                    field: field.name,
                    reason: "field is declared more than once".to_string(),
                });
            }
            let class = classify(&field.ty, &name, &field.name)?;
            let metadata = match class.kind.layer() {
                Some(layer) => normalize_metadata(layer, &field.metadata, class.inferred_extension)?,
                None => Vec::new(),
            };
            tracing::trace!(record = %name, field = %field.name, kind = ?class.kind, "classified field");
            built.push(BundleField {
                name: field.name,
                kind: class.kind,
                declared_type: field.ty,
                metadata,
                raw_metadata: field.metadata,
                is_collection: class.is_collection,
                nested: class.nested,
            });
        }
        Ok(Self {
            name,
            fields: built,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[BundleField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&BundleField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A statically declared bundle type.
///
/// ```
/// use treecast_core::{BundleType, RecordDescriptor, RawMetadata, TypeExpr};
///
/// struct Report;
///
/// impl BundleType for Report {
///     fn describe() -> RecordDescriptor {
///         RecordDescriptor::new("Report")
///             .field("name", TypeExpr::str())
///             .field_with("body", TypeExpr::file(TypeExpr::str()), RawMetadata::new().name("{name}"))
///     }
/// }
///
/// let def = Report::definition().unwrap();
/// assert_eq!(def.fields().len(), 2);
/// ```
pub trait BundleType: 'static {
    fn describe() -> RecordDescriptor;

    /// The cached definition of this type, built on first use.
    fn definition() -> BundleResult<Arc<BundleDefinition>>
    where
        Self: Sized,
    {
        registry::definition_of::<Self>()
    }
}
