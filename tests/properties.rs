use proptest::prelude::*;
use schema_rename::{
    audit::inject_audit_fields,
    dictionary::{Provenance, RenameDictionary},
    document::{ColumnDefinition, SchemaDocument},
    reconcile::reconcile,
    rename::{RenameContext, rename_document},
};

fn column_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_string()),
        Just("created_at".to_string()),
        Just("updated_at".to_string()),
        Just("created_by".to_string()),
        Just("updated_by".to_string()),
        Just("facility_id".to_string()),
        "[a-z]{1,6}(_[a-z]{1,4})?",
    ]
}

fn unique_columns() -> impl Strategy<Value = Vec<ColumnDefinition>> {
    proptest::collection::vec(column_name(), 0..10).prop_map(|names| {
        let mut seen = std::collections::HashSet::new();
        names
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .map(|name| ColumnDefinition::new(name, "TEXT"))
            .collect()
    })
}

fn documents() -> impl Strategy<Value = Vec<SchemaDocument>> {
    proptest::collection::vec(
        ("[a-z]{1,5}", unique_columns()).prop_map(|(table, columns)| SchemaDocument::new(table, columns)),
        0..5,
    )
}

fn seeded_dictionary() -> RenameDictionary {
    let mut dict = RenameDictionary::new();
    dict.add_table("users", "app_users", "users", Provenance::PreExisting);
    dict.add_column("users", "uid", "user_id", "", Provenance::PreExisting);
    dict.add_column("users", "id", "user_key", "", Provenance::PreExisting);
    dict
}

fn snapshot(dict: &RenameDictionary) -> Vec<(String, Option<String>, String)> {
    let tables = dict
        .table_entries()
        .map(|(old, entry)| (old.to_string(), None, entry.new.clone()));
    let columns = dict.column_tables().flat_map(|(table, columns)| {
        columns
            .iter()
            .map(move |(old, entry)| (table.to_string(), Some(old.clone()), entry.new.clone()))
    });
    tables.chain(columns).collect()
}

proptest! {
    #[test]
    fn audit_injection_is_idempotent(columns in unique_columns()) {
        let (once, _) = inject_audit_fields(columns.clone());
        let (twice, added) = inject_audit_fields(once.clone());
        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(added, 0);
    }

    #[test]
    fn audit_injection_preserves_relative_order(columns in unique_columns()) {
        let (output, added) = inject_audit_fields(columns.clone());
        prop_assert_eq!(output.len(), columns.len() + added);
        let kept: Vec<&str> = output
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| columns.iter().any(|c| c.name == *name))
            .collect();
        let original: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        prop_assert_eq!(kept, original);
    }

    #[test]
    fn reconcile_never_changes_existing_values(docs in documents()) {
        let mut dict = seeded_dictionary();
        let before = snapshot(&dict);
        reconcile(&mut dict, &docs);
        let after = snapshot(&dict);
        for entry in &before {
            prop_assert!(after.contains(entry));
        }
        prop_assert_eq!(dict.resolve_table("users"), "app_users");
        prop_assert_eq!(dict.resolve_column("users", "id"), "user_key");
    }

    #[test]
    fn reconcile_twice_adds_nothing(docs in documents()) {
        let mut dict = seeded_dictionary();
        reconcile(&mut dict, &docs);
        let once = dict.to_yaml_string().unwrap();
        let second = reconcile(&mut dict, &docs);
        prop_assert!(second.is_empty());
        prop_assert_eq!(dict.to_yaml_string().unwrap(), once);
    }

    #[test]
    fn rename_preserves_column_count_and_is_stable(docs in documents()) {
        let mut dict = seeded_dictionary();
        reconcile(&mut dict, &docs);
        let context = RenameContext::new("doc.yaml", "rules");
        for doc in docs {
            let width = doc.columns.len();
            let first = rename_document(doc, &dict, &context).unwrap();
            prop_assert_eq!(first.document.columns.len(), width);
            let second = rename_document(first.document.clone(), &dict, &context).unwrap();
            prop_assert_eq!(&second.new_table_name, &first.new_table_name);
            prop_assert_eq!(&second.document.columns, &first.document.columns);
        }
    }
}
