use std::fs;
use std::path::Path;

use dbslice_core::{CatalogSnapshot, Dialect, Reference, Table};
use dbslice_subset::{Subset, SubsetError, SubsetReport};

fn reference(target: &str) -> Reference {
    Reference::new("public", target, [format!("{target}_id")], false)
}

// a <- b <-> f, c -> b, c -> a, d -> d
fn mixed_schema() -> Vec<Table> {
    vec![
        Table::new("public", "a", ["id"]),
        Table::new("public", "b", ["id"])
            .with_reference(reference("a"))
            .with_reference(reference("f")),
        Table::new("public", "c", ["id"])
            .with_reference(reference("b"))
            .with_reference(reference("a")),
        Table::new("public", "d", ["id"]).with_reference(reference("d")),
        Table::new("public", "f", ["id"]).with_reference(reference("b")),
    ]
}

fn shop_tables() -> Vec<Table> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../dbslice-core/tests/fixtures/shop.catalog.json");
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    let snapshot: CatalogSnapshot = serde_json::from_str(&contents).expect("parse catalog");
    snapshot.into_tables().expect("catalog tables")
}

#[test]
fn mixed_schema_collapses_cycles() {
    let subset = Subset::new(mixed_schema(), Dialect::Postgres).expect("plan subset");
    let condensation = subset.condensation();

    let components: Vec<(Vec<usize>, bool)> = condensation
        .sccs()
        .iter()
        .map(|scc| (scc.tables().to_vec(), scc.has_cycle()))
        .collect();
    assert_eq!(
        components,
        vec![
            (vec![3], true),
            (vec![2], false),
            (vec![1, 4], true),
            (vec![0], false),
        ]
    );

    let edges: Vec<(usize, usize)> = condensation.edges().iter().map(|e| (e.from, e.to)).collect();
    assert_eq!(edges, vec![(2, 3), (1, 2), (1, 3)]);
    assert!(condensation.edges().iter().all(|e| e.from < e.to));
}

#[test]
fn unconditioned_schema_exports_everything() {
    let subset = Subset::new(mixed_schema(), Dialect::Postgres).expect("plan subset");
    assert!(subset.table_queries().iter().all(Option::is_none));
    assert!((0..4).all(|scc| subset.subset_graph(scc).is_none()));
}

#[test]
fn cycled_tables_are_closed_lists() {
    let subset = Subset::new(mixed_schema(), Dialect::Postgres).expect("plan subset");
    assert_eq!(
        subset.cycled_tables(),
        vec![
            vec!["public.d".to_string(), "public.d".to_string()],
            vec![
                "public.b".to_string(),
                "public.f".to_string(),
                "public.b".to_string(),
            ],
        ]
    );
}

#[test]
fn cyclic_subset_is_rejected() {
    let mut tables = mixed_schema();
    tables[0] = Table::new("public", "a", ["id"]).with_subset_condition("public.a.id = 1");

    let err = Subset::new(tables, Dialect::Postgres).expect_err("cyclic subset");
    match err {
        SubsetError::CyclicSubsetNotSupported { root, components } => {
            assert_eq!(root, "public.c");
            assert_eq!(components.len(), 1);
            assert_eq!(components[0].scc, 2);
            assert_eq!(components[0].tables, vec!["public.b", "public.f"]);
            assert_eq!(components[0].cycle_groups, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn topological_order_puts_parents_first() {
    let subset = Subset::new(
        vec![
            Table::new("public", "order_items", ["id"]).with_reference(reference("orders")),
            Table::new("public", "orders", ["id"]).with_reference(reference("customers")),
            Table::new("public", "customers", ["id"]),
        ],
        Dialect::Postgres,
    )
    .expect("plan subset");

    assert_eq!(subset.topological_order().expect("acyclic order"), vec![2, 1, 0]);
}

#[test]
fn topological_order_fails_on_cycles() {
    let subset = Subset::new(mixed_schema(), Dialect::Postgres).expect("plan subset");
    match subset.topological_order().expect_err("cyclic order") {
        SubsetError::TableGraphHasCycles { tables } => {
            assert_eq!(tables, vec!["public.d", "public.b", "public.f"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_reference_target_is_reported() {
    let err = Subset::new(
        vec![Table::new("public", "orders", ["id"]).with_reference(reference("customers"))],
        Dialect::Postgres,
    )
    .expect_err("dangling reference");
    assert!(matches!(err, SubsetError::ReferenceTableNotFound { .. }));
}

#[test]
fn shop_catalog_plans_filtered_tables() {
    let mut tables = shop_tables();
    let customers = tables
        .iter_mut()
        .find(|t| t.is("public", "customers"))
        .expect("customers table");
    customers
        .subset_conditions
        .push("public.customers.status = 'active'".to_string());

    let subset = Subset::new(tables, Dialect::Postgres).expect("plan subset");

    assert_eq!(
        subset.query_for("public", "orders"),
        Some(concat!(
            r#"SELECT "public"."orders".* FROM "public"."orders" "#,
            r#"INNER JOIN "public"."customers" ON "public"."orders"."customer_id" = "public"."customers"."id" "#,
            r#"WHERE (public.customers.status = 'active')"#,
        ))
    );
    assert_eq!(
        subset.query_for("public", "order_items"),
        Some(concat!(
            r#"SELECT "public"."order_items".* FROM "public"."order_items" "#,
            r#"INNER JOIN "public"."orders" ON "public"."order_items"."order_id" = "public"."orders"."id" "#,
            r#"INNER JOIN "public"."customers" ON "public"."orders"."customer_id" = "public"."customers"."id" "#,
            r#"WHERE (public.customers.status = 'active')"#,
        ))
    );
    assert_eq!(subset.query_for("public", "coupons"), None);
    assert_eq!(subset.query_for("public", "products"), None);
    assert_eq!(subset.query_for("public", "employees"), None);
}

#[test]
fn report_serializes_summary_and_queries() {
    let mut tables = shop_tables();
    tables[0]
        .subset_conditions
        .push("public.customers.status = 'active'".to_string());
    let subset = Subset::new(tables, Dialect::Postgres).expect("plan subset");

    let report = subset.report();
    assert_eq!(report.summary.tables, 6);
    assert_eq!(report.summary.edges, 5);
    assert_eq!(report.summary.components, 6);
    assert_eq!(report.summary.cyclic_components, 1);
    assert_eq!(report.summary.planned_tables, 3);
    assert!(report.restore_order.is_none());

    let employees = report
        .components
        .iter()
        .find(|c| c.cyclic)
        .expect("cyclic component");
    assert_eq!(employees.tables, vec!["public.employees"]);
    assert_eq!(
        employees.cycles,
        vec![vec!["public.employees".to_string(), "public.employees".to_string()]]
    );

    let json = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(json["dialect"], "postgres");
    assert_eq!(json["queries"][1]["table"], "coupons");
    assert!(json["queries"][1]["query"].is_null());

    let parsed: SubsetReport = serde_json::from_value(json).expect("parse report");
    assert_eq!(parsed, report);
}
