//! Schema graph compilation
//!
//! Breadth-first traversal from the root schemas. Every reachable record, enum
//! and fixed schema is enqueued exactly once; array elements, map values and
//! union branches are descended into on the way. Records may be mutually
//! recursive: the visited set keys on full names.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::descriptor::{RecordFactory, RecordTypeDescriptor};
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{EnumSchema, FixedSchema, SchemaError, SchemaResult, SchemaType};

/// Compiled type registry
#[derive(Debug, Default)]
pub struct CompiledTypes {
    /// Record descriptors in discovery order
    records: Vec<Arc<RecordTypeDescriptor>>,
    by_name: HashMap<String, usize>,
    enums: Vec<Arc<EnumSchema>>,
    fixed: Vec<Arc<FixedSchema>>,
}

impl CompiledTypes {
    /// Looks up a record descriptor by full name
    pub fn get(&self, full_name: &str) -> Option<&Arc<RecordTypeDescriptor>> {
        self.by_name.get(full_name).map(|i| &self.records[*i])
    }

    /// Record descriptors in discovery order
    pub fn records(&self) -> &[Arc<RecordTypeDescriptor>] {
        &self.records
    }

    pub fn enums(&self) -> &[Arc<EnumSchema>] {
        &self.enums
    }

    pub fn fixed(&self) -> &[Arc<FixedSchema>] {
        &self.fixed
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Replaces the factory of one record type.
    ///
    /// Must be called before instances are handed out; descriptors already
    /// shared keep their previous factory.
    pub fn set_factory(&mut self, full_name: &str, factory: RecordFactory) -> bool {
        let Some(&index) = self.by_name.get(full_name) else {
            return false;
        };
        match Arc::get_mut(&mut self.records[index]) {
            Some(descriptor) => {
                descriptor.set_factory(factory);
                true
            }
            None => false,
        }
    }
}

/// Compiles every record reachable from `roots`.
///
/// # Errors
///
/// - `REC_SCHEMA_UNSUPPORTED_TYPE` for a union nested directly in a union
/// - `REC_SCHEMA_MALFORMED` for a record that was declared but never defined
/// - `REC_SCHEMA_DUPLICATE_FIELD` if a record's field names collide
pub fn compile(roots: &[SchemaType]) -> SchemaResult<CompiledTypes> {
    log_event_with_fields(Event::CompileStart, &[("roots", &roots.len().to_string())]);

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    for root in roots {
        enqueue(root, "<root>", &mut visited, &mut queue)?;
    }

    let mut types = CompiledTypes::default();
    while let Some(node) = queue.pop_front() {
        match node {
            SchemaType::Record(record) => {
                let full_name = record.full_name();
                for field in record.fields() {
                    let context = format!("{}.{}", full_name, field.name);
                    enqueue(&field.schema, &context, &mut visited, &mut queue)?;
                }
                let descriptor = RecordTypeDescriptor::new(record)?;
                types.by_name.insert(full_name, types.records.len());
                types.records.push(Arc::new(descriptor));
            }
            SchemaType::Enum(e) => types.enums.push(e),
            SchemaType::Fixed(f) => types.fixed.push(f),
            _ => {}
        }
    }

    log_event_with_fields(
        Event::CompileComplete,
        &[
            ("records", &types.records.len().to_string()),
            ("enums", &types.enums.len().to_string()),
            ("fixed", &types.fixed.len().to_string()),
        ],
    );
    Ok(types)
}

fn enqueue(
    node: &SchemaType,
    context: &str,
    visited: &mut HashSet<String>,
    queue: &mut VecDeque<SchemaType>,
) -> SchemaResult<()> {
    match node {
        SchemaType::Primitive(_) => Ok(()),
        SchemaType::Record(_) | SchemaType::Enum(_) | SchemaType::Fixed(_) => {
            if visited.insert(node.type_name()) {
                queue.push_back(node.clone());
            }
            Ok(())
        }
        SchemaType::Array(element) => enqueue(element, context, visited, queue),
        SchemaType::Map(value) => enqueue(value, context, visited, queue),
        SchemaType::Union(branches) => {
            for branch in branches {
                if matches!(branch, SchemaType::Union(_)) {
                    return Err(SchemaError::unsupported_type(context, "union nested in union"));
                }
                enqueue(branch, context, visited, queue)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::FieldKind;
    use crate::schema::{RecordSchema, SchemaErrorCode, SchemaParser};

    const GRAPH: &str = r#"[
        {"type":"record","name":"Page","namespace":"web","fields":[
            {"name":"url","type":"string"},
            {"name":"anchors","type":{"type":"array","items":{"type":"record","name":"Anchor","fields":[
                {"name":"text","type":"string"},
                {"name":"target","type":["null","Page"]}]}}},
            {"name":"meta","type":{"type":"map","values":{"type":"record","name":"Meta","fields":[
                {"name":"kind","type":{"type":"enum","name":"Kind","symbols":["A","B"]}}]}}},
            {"name":"digest","type":["null",{"type":"fixed","name":"Digest","size":16}]}]}
    ]"#;

    fn roots() -> Vec<SchemaType> {
        let json: serde_json::Value = serde_json::from_str(GRAPH).unwrap();
        let docs = json.as_array().unwrap().clone();
        SchemaParser::new().parse_documents(&docs).unwrap()
    }

    #[test]
    fn test_breadth_first_discovery() {
        let types = compile(&roots()).unwrap();
        let names: Vec<_> = types.records().iter().map(|d| d.full_name().to_string()).collect();
        assert_eq!(names, vec!["web.Page", "web.Anchor", "web.Meta"]);
        assert_eq!(types.enums().len(), 1);
        assert_eq!(types.fixed().len(), 1);
        assert!(types.get("web.Anchor").is_some());
    }

    #[test]
    fn test_recursive_schema_compiles_once() {
        let node = RecordSchema::declare("Node", None);
        node.define(vec![
            ("value".into(), SchemaType::long()),
            ("children".into(), SchemaType::array(SchemaType::Record(node.clone()))),
        ])
        .unwrap();

        let types = compile(&[SchemaType::Record(node.clone()), SchemaType::Record(node)]).unwrap();
        assert_eq!(types.record_count(), 1);
        assert_eq!(types.records()[0].fields()[1].kind(), FieldKind::List);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let first = compile(&roots()).unwrap();
        let second = compile(&roots()).unwrap();
        assert_eq!(first.record_count(), second.record_count());
        for (a, b) in first.records().iter().zip(second.records()) {
            assert_eq!(**a, **b);
        }
    }

    #[test]
    fn test_nested_union_unsupported() {
        let bad = RecordSchema::new(
            "Bad",
            None,
            vec![(
                "v".into(),
                SchemaType::Union(vec![
                    SchemaType::int(),
                    SchemaType::Union(vec![SchemaType::null(), SchemaType::string()]),
                ]),
            )],
        )
        .unwrap();
        let err = compile(&[SchemaType::Record(bad)]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::UnsupportedSchemaType);
        assert_eq!(err.node(), Some("Bad.v"));
    }

    #[test]
    fn test_undefined_record_is_malformed() {
        let holder = RecordSchema::new(
            "Holder",
            None,
            vec![("later".into(), SchemaType::Record(RecordSchema::declare("Later", None)))],
        )
        .unwrap();
        let err = compile(&[SchemaType::Record(holder)]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedSchema);
    }

    #[test]
    fn test_set_factory_before_sharing() {
        fn stamped(descriptor: &Arc<RecordTypeDescriptor>) -> crate::record::Record {
            let mut record = crate::record::Record::empty(descriptor);
            record.set_readable(0).unwrap();
            record
        }
        let mut types = compile(&roots()).unwrap();
        assert!(types.set_factory("web.Page", stamped));
        assert!(!types.set_factory("web.Missing", stamped));

        let descriptor = types.get("web.Page").unwrap().clone();
        assert!(descriptor.new_instance().is_readable(0));
        // Shared descriptors keep their factory
        assert!(!types.set_factory("web.Page", crate::record::Record::empty));
    }

    #[test]
    fn test_primitive_roots_compile_to_nothing() {
        let types = compile(&[SchemaType::string(), SchemaType::map(SchemaType::long())]).unwrap();
        assert_eq!(types.record_count(), 0);
    }
}
