use std::path::Path;

use anyhow::Result;
use treecast_core::{BundleDefinition, FieldKind, Hint};

use crate::config::TreecastConfig;

pub fn run_tree(config: &TreecastConfig, dir: &Path) -> Result<()> {
    let inferred = super::infer_dir(config, dir, None)?;
    println!("{}", inferred.root_type.name());
    print_fields(&inferred.root_type, 1);
    Ok(())
}

fn print_fields(definition: &BundleDefinition, depth: usize) {
    let indent = "  ".repeat(depth);
    for field in definition.fields() {
        let pinned = field
            .layer_data(0)
            .and_then(|data| data.name.as_ref())
            .and_then(Hint::text)
            .unwrap_or(field.name.as_str());
        match (field.kind, &field.nested) {
            (FieldKind::Directory, Some(nested)) => {
                println!("{indent}{}: dir '{pinned}/' -> {}", field.name, nested.name());
                print_fields(nested, depth + 1);
            }
            (FieldKind::File, _) => match field.extension() {
                Some(ext) => println!("{indent}{}: file '{pinned}.{ext}'", field.name),
                None => println!("{indent}{}: file '{pinned}'", field.name),
            },
            _ => println!("{indent}{}: value", field.name),
        }
    }
}
