//! Process-wide cache of bundle definitions, keyed by Rust type.
//!
//! Entries are created on first request and live for the rest of the
//! process; there is no eviction.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::definition::{BundleDefinition, BundleType};
use crate::error::{BundleError, BundleResult};

static DEFINITIONS: LazyLock<DashMap<TypeId, Arc<BundleDefinition>>> = LazyLock::new(DashMap::new);

thread_local! {
    /// Types whose definitions are being built on this thread.
    static BUILDING: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
}

/// Returns the definition of `T`, building and caching it on first use.
///
/// Building may recurse into nested types, so no map guard is held while
/// `T::describe` runs. If two threads race, the first insert wins and both
/// get the same `Arc`. A type that reaches itself through its own Dir
/// fields is rejected with [`BundleError::InvalidAnnotation`].
pub fn definition_of<T: BundleType>() -> BundleResult<Arc<BundleDefinition>> {
    let id = TypeId::of::<T>();
    if let Some(cached) = DEFINITIONS.get(&id) {
        return Ok(cached.value().clone());
    }
    let descriptor = T::describe();
    if !BUILDING.with_borrow_mut(|building| building.insert(id)) {
        // the field that holds the reference is filled in by the caller
        return Err(BundleError::InvalidAnnotation {
            record: descriptor.name,
            field: String::new(),
            reason: "recursive bundle types are not supported".to_string(),
        });
    }
    let built = BundleDefinition::build(descriptor);
    BUILDING.with_borrow_mut(|building| building.remove(&id));
    let built = Arc::new(built?);
    tracing::debug!(bundle = %built.name(), "registered bundle definition");
    Ok(DEFINITIONS.entry(id).or_insert(built).value().clone())
}

/// Whether `T` has been built already.
pub fn is_registered<T: BundleType>() -> bool {
    DEFINITIONS.contains_key(&TypeId::of::<T>())
}
