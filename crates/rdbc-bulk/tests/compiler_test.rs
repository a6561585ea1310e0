//! Tests for rdbc-bulk compiler module

use rdbc_bulk::prelude::*;

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn sample_rows() -> Vec<Row> {
    vec![
        row(&[
            ("id", Value::from(1)),
            ("name", Value::from("A")),
            ("age", Value::from(1)),
        ]),
        row(&[
            ("id", Value::from(2)),
            ("name", Value::from("B")),
            ("age", Value::from(2)),
            ("address", Value::from("X")),
        ]),
    ]
}

// ==================== Bulk update ====================

#[test]
fn test_bulk_update_sparse_columns() {
    let query = build_bulk_update("user", &sample_rows(), &keys(&["id"])).unwrap();

    assert_eq!(
        query.sql(),
        "UPDATE user SET \
         address = (CASE WHEN id = :id_1 THEN :address_1 ELSE address END), \
         age = (CASE WHEN id = :id_0 THEN :age_0 WHEN id = :id_1 THEN :age_1 ELSE age END), \
         name = (CASE WHEN id = :id_0 THEN :name_0 WHEN id = :id_1 THEN :name_1 ELSE name END) \
         WHERE id IN (:id_0, :id_1)"
    );

    let names: Vec<&str> = query.binds().keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["address_1", "age_0", "age_1", "id_0", "id_1", "name_0", "name_1"]
    );
}

#[test]
fn test_bulk_update_placeholder_count_matches_estimate() {
    let rows: Vec<Row> = (0..10)
        .map(|i| {
            row(&[
                ("id", Value::from(i)),
                ("a", Value::from(i)),
                ("b", Value::from(i)),
                ("c", Value::from(i)),
            ])
        })
        .collect();

    let query = build_bulk_update("t", &rows, &keys(&["id"])).unwrap();
    assert_eq!(query.placeholder_count(), 70);
    assert_eq!(
        rdbc_bulk::budget::estimate_bulk_update_fields(10, 4, 1).unwrap(),
        70
    );
}

#[test]
fn test_bulk_update_key_order_is_irrelevant() {
    let rows = vec![row(&[
        ("a", Value::from(1)),
        ("b", Value::from(2)),
        ("v", Value::from(3)),
    ])];

    let first = build_bulk_update("t", &rows, &keys(&["b", "a"])).unwrap();
    let second = build_bulk_update("t", &rows, &keys(&["a", "b", "a"])).unwrap();
    assert_eq!(first, second);
    assert!(first.sql().ends_with("WHERE a IN (:a_0) AND b IN (:b_0)"));
}

#[test]
fn test_bulk_update_failure_conditions() {
    let rows = sample_rows();

    assert_eq!(
        build_bulk_update("", &rows, &keys(&["id"])),
        Err(ValidationError::EmptyTable)
    );
    assert_eq!(
        build_bulk_update("user", &[], &keys(&["id"])),
        Err(ValidationError::EmptyRows)
    );
    assert_eq!(
        build_bulk_update("user", &rows, &[]),
        Err(ValidationError::EmptyKeys)
    );
    assert_eq!(
        build_bulk_update("user", &rows, &keys(&["address"])),
        Err(ValidationError::MissingKey {
            row: 0,
            key: "address".into()
        })
    );
    assert!(matches!(
        build_bulk_update("us er", &rows, &keys(&["id"])),
        Err(ValidationError::InvalidIdentifier { .. })
    ));
}

// ==================== Insert ====================

#[test]
fn test_insert_shaped_from_sample() {
    let query = build_insert("public.user", &sample_rows()[1]).unwrap();
    assert_eq!(
        query.sql(),
        "INSERT INTO public.user (address, age, id, name) VALUES (:address, :age, :id, :name)"
    );
    assert_eq!(query.placeholder_count(), 4);
}

// ==================== Single-row statements ====================

#[test]
fn test_update_with_in_condition() {
    let payload = row(&[("status", Value::from("archived"))]);
    let condition = row(&[
        ("id", Value::array([1, 2, 3])),
        ("tenant", Value::from("acme")),
    ]);

    let query = build_update("orders", &payload, &condition).unwrap();
    assert_eq!(
        query.sql(),
        "UPDATE orders SET status = :val_status WHERE id IN (:cond_id) AND tenant = :cond_tenant"
    );
    assert_eq!(query.placeholder_count(), 5);
}

#[test]
fn test_delete_skips_empty_sequences() {
    let condition = row(&[
        ("id", Value::array(Vec::<i64>::new())),
        ("tenant", Value::from("acme")),
    ]);
    let query = build_delete("orders", &condition).unwrap();
    assert_eq!(query.sql(), "DELETE FROM orders WHERE tenant = :cond_tenant");

    let only_empty = row(&[("id", Value::array(Vec::<i64>::new()))]);
    assert_eq!(
        build_delete("orders", &only_empty),
        Err(ValidationError::EmptyCondition)
    );
}

#[test]
fn test_condition_alone() {
    let query = build_condition(&row(&[("a", Value::Null), ("b", Value::from(true))])).unwrap();
    assert_eq!(query.sql(), "a = :cond_a AND b = :cond_b");
    assert_eq!(query.binds().get("cond_a"), Some(&Value::Null));
}

// ==================== Bulk delete & empty table ====================

#[test]
fn test_bulk_delete_composite_keys() {
    let rows = vec![
        row(&[("a", Value::from(1)), ("b", Value::from(2))]),
        row(&[("a", Value::from(3)), ("b", Value::from(4))]),
    ];
    let query = build_bulk_delete("t", &rows, &keys(&["a", "b"])).unwrap();

    assert_eq!(
        query.sql(),
        "DELETE FROM t WHERE (a = :a_0 AND b = :b_0) OR (a = :a_1 AND b = :b_1)"
    );
    assert_eq!(query.binds().get("b_1"), Some(&Value::from(4)));
}

#[test]
fn test_empty_table() {
    assert_eq!(build_empty_table("t").unwrap().sql(), "DELETE FROM t");
    assert_eq!(build_empty_table(""), Err(ValidationError::EmptyTable));
}

// ==================== split_keys ====================

#[test]
fn test_split_keys_consumes_row() {
    let (values, condition) = split_keys(sample_rows().remove(1), &keys(&["id"]), 1).unwrap();

    assert!(!values.contains_key("id"));
    assert_eq!(values.len(), 3);
    assert_eq!(condition.get("id"), Some(&Value::from(2)));
}
