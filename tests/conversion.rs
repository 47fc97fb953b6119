use schema_rename::{
    dictionary::{Provenance, RenameDictionary},
    document::SchemaDocument,
    reconcile::{reconcile, suggest_column_name},
    rename::{DEFAULT_RULESET, RenameContext, rename_document},
};

#[test]
fn dictionary_rename_matches_expected_document() {
    let dictionary = RenameDictionary::from_yaml_str(
        "tables: {users: {new: app_users}}\ncolumns: {users: {uid: {new: user_id}}}\n",
    )
    .expect("parse dictionary");
    let document = SchemaDocument::from_yaml_str(
        "table_name: users\ncolumns:\n  - name: uid\n  - name: id\n",
    )
    .expect("parse document");

    let outcome = rename_document(
        document,
        &dictionary,
        &RenameContext::new("users.yaml", DEFAULT_RULESET),
    )
    .expect("rename");

    let expected = SchemaDocument::from_yaml_str(
        "table_name: app_users\ncolumns:\n  - name: user_id\n    old_name: uid\n  - name: id\n",
    )
    .expect("parse expected");
    assert_eq!(outcome.document.table_name, expected.table_name);
    assert_eq!(outcome.document.columns, expected.columns);
    assert_eq!(
        outcome
            .document
            .metadata
            .conversion_info
            .as_ref()
            .map(|info| info.original_table_name.as_str()),
        Some("users")
    );
}

#[test]
fn empty_dictionary_suggests_builtin_synonym() {
    let mut dictionary = RenameDictionary::new();
    let document = SchemaDocument::from_yaml_str("table_name: orders\ncolumns:\n  - name: facility_id\n")
        .expect("parse document");
    reconcile(&mut dictionary, [&document]);

    let entry = dictionary
        .column_entry("orders", "facility_id")
        .expect("column registered");
    assert_eq!(entry.new, "medical_facility_id");
    assert_eq!(entry.provenance(), Some(Provenance::Matched));
}

#[test]
fn resolution_is_deterministic_within_a_snapshot() {
    let mut dictionary = RenameDictionary::new();
    dictionary.add_column("billing", "cust", "customer_id", "", Provenance::PreExisting);
    dictionary.add_column("archive", "cust", "client_id", "", Provenance::PreExisting);

    let first = suggest_column_name(&dictionary, "cust");
    for _ in 0..10 {
        assert_eq!(suggest_column_name(&dictionary, "cust"), first);
        assert_eq!(dictionary.resolve_column("billing", "cust"), "customer_id");
        assert_eq!(dictionary.resolve_table("billing"), "billing");
    }
    assert_eq!(first.target, "client_id");
}

#[test]
fn reconciled_identity_tables_keep_prior_decisions() {
    let mut dictionary = RenameDictionary::from_yaml_str(
        "tables:\n  users:\n    new: app_users\n    description: curated\n",
    )
    .expect("parse dictionary");
    let document = SchemaDocument::from_yaml_str("table_name: users\ndescription: changed\n")
        .expect("parse document");
    let summary = reconcile(&mut dictionary, [&document]);
    assert!(summary.tables_added.is_empty());
    let entry = dictionary.table_entry("users").expect("entry");
    assert_eq!(entry.new, "app_users");
    assert_eq!(entry.description, "curated");
    assert_eq!(entry.provenance(), None);
}
