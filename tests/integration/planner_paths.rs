#![allow(missing_docs)]

use dynafdw::provider::RowProvider;
use dynafdw::query::sort_key::sort_key_candidates;
use dynafdw::query::{
    AccessPathPlanner, ColumnDefinition, ComparisonOperator, KeyCondition, KeyField, KeyTopology,
    Operator, Qualifier, QueryParams, Value,
};
use dynafdw::{ExplainContext, ProviderKind, TableOptions};

fn options() -> TableOptions {
    TableOptions::new("us-east-1", "orders")
}

fn full_topology() -> KeyTopology {
    let columns = vec![
        ColumnDefinition::new("customer").with_option("partition_key", "customer_id"),
        ColumnDefinition::new("placed")
            .with_option("sort_key", "true")
            .with_option("mapped_attr", "placed_at"),
        ColumnDefinition::new("status")
            .with_option("lsi_name", "by-status")
            .with_option("lsi_key", "status"),
        ColumnDefinition::new("store")
            .with_option("gsi_name", "by-store")
            .with_option("gsi_partition_key", "store_id"),
        ColumnDefinition::new("total")
            .with_option("gsi_name", "by-store")
            .with_option("gsi_sort_key", "true"),
    ];
    KeyTopology::from_columns(&columns).expect("valid topology")
}

fn chosen_params(provider: &RowProvider) -> &QueryParams {
    match provider {
        RowProvider::Query(query) => query.params(),
        other => panic!("expected single query, got {}", other.kind()),
    }
}

#[test]
fn equality_on_partition_key_selects_unrefined_query() {
    let topology = full_topology();
    let options = options();
    let planner = AccessPathPlanner::new(&topology, &options);
    for value in [Value::from("c-1"), Value::Int(7), Value::Null] {
        let plan = planner.plan(&[
            Qualifier::eq("customer", value.clone()),
            Qualifier::new("unrelated", Operator::Lt, 3_i64),
        ]);
        let params = chosen_params(&plan.provider);
        assert_eq!(params.index_name, None);
        assert_eq!(params.key_conditions.len(), 1);
        assert_eq!(params.key_conditions["customer_id"], KeyCondition::eq(value));
        assert_eq!(plan.score, 100.0);
    }
}

#[test]
fn strongest_sort_condition_wins() {
    let topology = full_topology();
    let options = options();
    let planner = AccessPathPlanner::new(&topology, &options);
    let plan = planner.plan(&[
        Qualifier::eq("customer", "c-1"),
        Qualifier::new("placed", Operator::Ge, "2024-01-01"),
        Qualifier::new("placed", Operator::Le, "2024-12-31"),
    ]);
    let params = chosen_params(&plan.provider);
    assert_eq!(
        params.key_conditions["placed_at"],
        KeyCondition::between(Value::from("2024-01-01"), Value::from("2024-12-31"))
    );
    assert!((plan.score - (100.0 + 6.0 / 7.0 * 50.0)).abs() < 1e-9);
}

#[test]
fn conflicting_sort_operators_drop_the_refinement() {
    let topology = full_topology();
    let options = options();
    let plan = AccessPathPlanner::new(&topology, &options).plan(&[
        Qualifier::eq("customer", "c-1"),
        Qualifier::eq("placed", "a"),
        Qualifier::eq("placed", "b"),
    ]);
    let params = chosen_params(&plan.provider);
    assert!(!params.key_conditions.contains_key("placed_at"));
    assert_eq!(plan.score, 100.0);
}

#[test]
fn equality_and_like_on_one_sort_key_drop_the_refinement() {
    let topology = full_topology();
    let options = options();
    let plan = AccessPathPlanner::new(&topology, &options).plan(&[
        Qualifier::eq("customer", "c-1"),
        Qualifier::eq("placed", "a"),
        Qualifier::like("placed", "b%"),
    ]);
    let params = chosen_params(&plan.provider);
    assert!(!params.key_conditions.contains_key("placed_at"));
    assert_eq!(params.key_conditions.len(), 1);
    assert_eq!(plan.score, 100.0);
}

#[test]
fn local_index_is_the_last_resort_refinement() {
    let topology = full_topology();
    let options = options();
    let plan = AccessPathPlanner::new(&topology, &options).plan(&[
        Qualifier::eq("customer", "c-1"),
        Qualifier::eq("status", "shipped"),
    ]);
    let params = chosen_params(&plan.provider);
    assert_eq!(params.index_name.as_deref(), Some("by-status"));
    assert_eq!(
        params.key_conditions["status"],
        KeyCondition::eq(Value::from("shipped"))
    );
    assert!((plan.score - 100.5).abs() < 1e-9);
}

#[test]
fn global_index_is_used_without_primary_equality() {
    let topology = full_topology();
    let options = options();
    let plan = AccessPathPlanner::new(&topology, &options).plan(&[
        Qualifier::eq("store", "s-9"),
        Qualifier::like("total", "1%"),
    ]);
    let params = chosen_params(&plan.provider);
    assert_eq!(params.index_name.as_deref(), Some("by-store"));
    assert_eq!(
        params.key_conditions["total"].comparison_operator,
        ComparisonOperator::BeginsWith
    );
    assert!(params.key_conditions.contains_key("store_id"));
}

#[test]
fn multi_valued_partition_key_builds_one_query_per_value() {
    let topology = KeyTopology::new(KeyField::same("pkey"));
    let options = options();
    let plan = AccessPathPlanner::new(&topology, &options)
        .plan(&[Qualifier::in_set("pkey", ["1", "2", "3"])]);
    let RowProvider::MultiQuery(multi) = &plan.provider else {
        panic!("expected multi-query, got {}", plan.provider.kind());
    };
    let values: Vec<Value> = multi
        .queries()
        .iter()
        .map(|query| query.params().key_conditions["pkey"].attribute_value_list[0].clone())
        .collect();
    assert_eq!(values, vec![Value::from("1"), Value::from("2"), Value::from("3")]);
}

#[test]
fn multi_query_carries_sort_refinement_into_each_sub_query() {
    let topology =
        KeyTopology::new(KeyField::same("pkey")).with_sort_key(KeyField::new("skey", "sk"));
    let options = options();
    let plan = AccessPathPlanner::new(&topology, &options).plan(&[
        Qualifier::in_set("pkey", ["a", "b"]),
        Qualifier::new("skey", Operator::Gt, 10_i64),
    ]);
    let RowProvider::MultiQuery(multi) = &plan.provider else {
        panic!("expected multi-query, got {}", plan.provider.kind());
    };
    for query in multi.queries() {
        assert_eq!(
            query.params().key_conditions["sk"],
            KeyCondition::new(ComparisonOperator::Gt, Value::Int(10))
        );
    }
}

#[test]
fn planning_never_fails_without_key_predicates() {
    let topology = full_topology();
    let options = options();
    let planner = AccessPathPlanner::new(&topology, &options);
    let quals = vec![
        Qualifier::like("placed", "%x"),
        Qualifier::new("customer", Operator::Gt, "a"),
    ];
    let plan = planner.plan(&quals);
    assert_eq!(plan.provider.kind(), ProviderKind::ParallelScan);
    assert_eq!(planner.candidates(&quals).len(), 1);
}

#[test]
fn explain_trace_round_trips_to_equivalent_predicate() {
    let topology = full_topology();
    let options = options();
    let planner = AccessPathPlanner::new(&topology, &options);
    let sort_field = KeyField::new("placed", "placed_at");
    let cases = vec![
        vec![Qualifier::new("placed", Operator::Lt, "m")],
        vec![Qualifier::like("placed", "2024-0%")],
        vec![
            Qualifier::new("placed", Operator::Ge, "a"),
            Qualifier::new("placed", Operator::Le, "z"),
        ],
    ];
    for sort_quals in cases {
        let mut quals = vec![Qualifier::eq("customer", "c-1")];
        quals.extend(sort_quals);
        let plan = planner.plan(&quals);
        let condition = chosen_params(&plan.provider).key_conditions["placed_at"].clone();

        let trace = plan.explain(&ExplainContext::new("us-east-1", "orders").verbose(true));
        let described = condition.describe("placed_at");
        assert!(
            trace.iter().any(|line| line.ends_with(&described)),
            "{described} missing from {trace:?}"
        );

        let rebuilt = condition.to_qualifiers("placed");
        let best = sort_key_candidates(&rebuilt, &sort_field)
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .expect("rebuilt predicate translates");
        assert_eq!(best.condition, condition);
    }
}
