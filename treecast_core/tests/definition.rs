use std::sync::Arc;

use treecast_core::{
    BundleDefinition, BundleError, BundleType, FieldKind, HintKind, HintSource, HintValue, Layer,
    NamingFn, RawMetadata, RawValue, Record, RecordDescriptor, TypeExpr, Value,
};

struct FileInDir;

impl BundleType for FileInDir {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("FileInDir").field("text", TypeExpr::file(TypeExpr::str()))
    }
}

struct EmbeddedFile;

impl BundleType for EmbeddedFile {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("EmbeddedFile").field("number", TypeExpr::file(TypeExpr::float()))
    }
}

struct EmbeddedDir;

impl BundleType for EmbeddedDir {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("EmbeddedDir")
            .field("embedded_dir", TypeExpr::dir(TypeExpr::record::<EmbeddedFile>()))
    }
}

fn file_name(owner: treecast_core::HintScope<'_>, index: Option<usize>) -> String {
    let slug = owner.text("slug").unwrap_or_default();
    match index {
        Some(index) => format!("{slug}_{index}"),
        None => format!("{slug}_00"),
    }
}

struct MyBundle;

impl BundleType for MyBundle {
    fn describe() -> RecordDescriptor {
        RecordDescriptor::new("MyBundle")
            .field("slug", TypeExpr::str())
            .field("my_dir", TypeExpr::dir(TypeExpr::record::<FileInDir>()))
            .field_with(
                "my_file",
                TypeExpr::file(TypeExpr::int()),
                RawMetadata::new()
                    .extension(".bin")
                    .name(RawValue::callable(file_name)),
            )
            .field("another_dir", TypeExpr::dir(TypeExpr::record::<EmbeddedDir>()))
            .field_with(
                "slug_file",
                TypeExpr::file(TypeExpr::str()),
                RawMetadata::new().name("{slug}"),
            )
            .field_with(
                "static_file",
                TypeExpr::file(TypeExpr::str()),
                RawMetadata::new().name("static"),
            )
    }
}

#[test]
fn fields_keep_declaration_order_and_kinds() -> anyhow::Result<()> {
    let def = MyBundle::definition()?;
    let fields: Vec<_> = def.fields().iter().map(|f| (f.name.as_str(), f.kind)).collect();
    assert_eq!(
        fields,
        [
            ("slug", FieldKind::Value),
            ("my_dir", FieldKind::Directory),
            ("my_file", FieldKind::File),
            ("another_dir", FieldKind::Directory),
            ("slug_file", FieldKind::File),
            ("static_file", FieldKind::File),
        ]
    );

    let my_file = def.field("my_file").unwrap();
    assert_eq!(my_file.metadata[0].layer, Layer::File);
    assert_eq!(my_file.extension(), Some("bin"));
    let hint = my_file.metadata[0].data.name.as_ref().unwrap();
    assert_eq!(hint.kind(), HintKind::Callable);

    let slug_file = def.field("slug_file").unwrap();
    let hint = slug_file.layer_data(0).unwrap().name.as_ref().unwrap();
    assert_eq!(hint.kind(), HintKind::Template);
    assert_eq!(hint.text(), Some("{slug}"));
    assert_eq!(hint.source, HintSource::Owner);

    let static_file = def.field("static_file").unwrap();
    let hint = static_file.layer_data(0).unwrap().name.as_ref().unwrap();
    assert_eq!(hint.value, HintValue::Literal("static".into()));

    let nested = def.field("another_dir").unwrap().nested.clone().unwrap();
    assert_eq!(nested.name(), "EmbeddedDir");
    Ok(())
}

#[test]
fn building_twice_is_structurally_identical() -> anyhow::Result<()> {
    let first = BundleDefinition::build(MyBundle::describe())?;
    let second = BundleDefinition::build(MyBundle::describe())?;
    assert_eq!(first.fields().len(), second.fields().len());
    for (a, b) in first.fields().iter().zip(second.fields()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.declared_type, b.declared_type);
        assert_eq!(a.is_collection, b.is_collection);
        assert_eq!(a.metadata.len(), b.metadata.len());
        for (ma, mb) in a.metadata.iter().zip(&b.metadata) {
            assert_eq!((ma.layer, ma.index), (mb.layer, mb.index));
            assert_eq!(ma.data.extension, mb.data.extension);
            assert_eq!(ma.data.name.as_ref().map(|h| h.kind()), mb.data.name.as_ref().map(|h| h.kind()));
        }
    }
    assert!(Arc::ptr_eq(&MyBundle::definition()?, &MyBundle::definition()?));
    Ok(())
}

#[test]
fn extension_inference_variants() -> anyhow::Result<()> {
    let desc = RecordDescriptor::new("Extensions")
        .field("text", TypeExpr::file(TypeExpr::str()))
        .field(
            "mixed",
            TypeExpr::file(TypeExpr::union(vec![TypeExpr::str(), TypeExpr::int()])),
        )
        .field("settings", TypeExpr::file(TypeExpr::map(TypeExpr::any())))
        .field(
            "records",
            TypeExpr::file(TypeExpr::list(TypeExpr::map(TypeExpr::int()))),
        )
        .field("logs", TypeExpr::file(TypeExpr::list(TypeExpr::str())))
        .field_with(
            "explicit",
            TypeExpr::file(TypeExpr::map(TypeExpr::any())),
            RawMetadata::new().extension("yaml"),
        )
        .field("opaque", TypeExpr::file(TypeExpr::bytes()));
    let def = BundleDefinition::build(desc)?;
    let ext = |name: &str| def.field(name).and_then(|f| f.extension()).map(str::to_string);
    assert_eq!(ext("text").as_deref(), Some("txt"));
    assert_eq!(ext("mixed").as_deref(), Some("txt"));
    assert_eq!(ext("settings").as_deref(), Some("json"));
    assert_eq!(ext("records").as_deref(), Some("jsonl"));
    assert_eq!(ext("logs").as_deref(), Some("txt"));
    assert_eq!(ext("explicit").as_deref(), Some("yaml"));
    assert_eq!(ext("opaque"), None);
    Ok(())
}

#[test]
fn field_source_template_hint() -> anyhow::Result<()> {
    struct Report;
    impl BundleType for Report {
        fn describe() -> RecordDescriptor {
            RecordDescriptor::new("Report")
                .field("name", TypeExpr::str())
                .field("contents", TypeExpr::file(TypeExpr::str()))
        }
    }

    let desc = RecordDescriptor::new("ReportSet").field_with(
        "reports",
        TypeExpr::dir_list(TypeExpr::record::<Report>()),
        RawMetadata::new().name(RawValue::pair("{name}", "field")),
    );
    let def = BundleDefinition::build(desc)?;
    let reports = def.field("reports").unwrap();
    assert!(reports.is_collection);
    assert_eq!(reports.metadata[0].layer, Layer::Directory);
    let hint = reports.metadata[0].data.name.as_ref().unwrap();
    assert_eq!(hint.kind(), HintKind::Template);
    assert_eq!(hint.source, HintSource::Subject);
    Ok(())
}

#[test]
fn invalid_annotations_are_rejected() {
    let desc = RecordDescriptor::new("Bad").field("d", TypeExpr::dir(TypeExpr::str()));
    assert!(matches!(
        BundleDefinition::build(desc),
        Err(BundleError::InvalidAnnotation { .. })
    ));

    let desc = RecordDescriptor::new("Bad").field(
        "f",
        TypeExpr::file(TypeExpr::dir(TypeExpr::record::<FileInDir>())),
    );
    assert!(matches!(
        BundleDefinition::build(desc),
        Err(BundleError::InvalidAnnotation { .. })
    ));

    let desc = RecordDescriptor::new("Bad")
        .field("x", TypeExpr::str())
        .field("x", TypeExpr::int());
    assert!(matches!(
        BundleDefinition::build(desc),
        Err(BundleError::InvalidAnnotation { .. })
    ));
}

#[test]
fn metadata_errors_surface_at_build_time() {
    let desc = RecordDescriptor::new("Bad").field_with(
        "f",
        TypeExpr::file(TypeExpr::str()),
        RawMetadata::new().name(RawValue::pair("x", "parent")),
    );
    assert!(matches!(BundleDefinition::build(desc), Err(BundleError::Metadata(_))));

    let desc = RecordDescriptor::new("Bad").field_with(
        "f",
        TypeExpr::file(TypeExpr::str()),
        RawMetadata::new().extension("."),
    );
    assert!(matches!(BundleDefinition::build(desc), Err(BundleError::Metadata(_))));
}

#[test]
fn records_carry_annotations_and_reject_unknown_fields() -> anyhow::Result<()> {
    struct Report;
    impl BundleType for Report {
        fn describe() -> RecordDescriptor {
            RecordDescriptor::new("Report")
                .field("name", TypeExpr::str())
                .field("body", TypeExpr::file(TypeExpr::str()))
                .field("metadata", TypeExpr::file(TypeExpr::map(TypeExpr::any())))
        }
    }

    let mut annotations = serde_json::Map::new();
    annotations.insert("runtime".into(), true.into());
    let report = Record::of::<Report>()?
        .set("name", "alpha")
        .set("body", "payload")
        .set("metadata", serde_json::json!({"score": 10}))
        .annotations(annotations)
        .build()?;
    assert_eq!(report.get("metadata"), Some(&Value::Json(serde_json::json!({"score": 10}))));
    assert_eq!(report.annotations().unwrap()["runtime"], true);

    let err = Record::of::<Report>()?.set("nope", "x").build().unwrap_err();
    assert!(matches!(err, BundleError::Render(_)));
    Ok(())
}

#[test]
fn naming_callables_compare_by_identity() {
    let f = NamingFn::new(|_, _| "x".to_string());
    let g = NamingFn::new(|_, _| "x".to_string());
    assert_eq!(f, f.clone());
    assert_ne!(f, g);
}
