#![allow(missing_docs)]

use std::sync::Arc;

use dynafdw::provider::memory::{KeySchema, MemoryStorageClient, RecordedRequest};
use dynafdw::provider::multi_query::MultiQueryRowProvider;
use dynafdw::provider::paginated::{QueryRowProvider, ScanRowProvider};
use dynafdw::query::{KeyCondition, QueryParams, Record, Value};
use dynafdw::{Counters, ExplainContext, Result, RowProvider, StorageClient};

fn item(pk: &str, sk: i64) -> Record {
    Record::from([
        ("pk".to_owned(), Value::from(pk)),
        ("sk".to_owned(), Value::Int(sk)),
        ("payload".to_owned(), Value::from(format!("{pk}/{sk}"))),
    ])
}

fn memory(page_size: usize) -> Arc<MemoryStorageClient> {
    let items = (0..7)
        .map(|i| item("a", i))
        .chain((0..4).map(|i| item("b", i)))
        .chain((0..2).map(|i| item("c", i)));
    Arc::new(
        MemoryStorageClient::new(KeySchema::new("pk").with_sort("sk"))
            .with_items(items)
            .with_page_size(page_size),
    )
}

fn query_for(pk: &str) -> QueryParams {
    QueryParams::default().with_condition("pk", KeyCondition::eq(Value::from(pk)))
}

#[test]
fn query_pages_until_the_continuation_token_disappears() -> Result<()> {
    let memory = memory(3);
    let client: Arc<dyn StorageClient> = memory.clone();
    let provider = RowProvider::Query(QueryRowProvider::new(query_for("a")));

    let rows = provider.rows(&client)?.collect::<Result<Vec<_>>>()?;
    let sort_keys: Vec<Value> = rows.iter().map(|r| r["sk"].clone()).collect();
    assert_eq!(sort_keys, (0..7).map(Value::Int).collect::<Vec<_>>());
    assert_eq!(
        provider.counters(),
        Counters {
            page_count: 3,
            returned_count: 7,
            scanned_count: 7,
        }
    );

    let requests = memory.requests();
    assert_eq!(requests.len(), 3);
    let tokens: Vec<bool> = requests
        .iter()
        .map(|request| match request {
            RecordedRequest::Query(q) => q.exclusive_start_key.is_some(),
            RecordedRequest::Scan(_) => panic!("unexpected scan"),
        })
        .collect();
    assert_eq!(tokens, vec![false, true, true]);
    Ok(())
}

#[test]
fn empty_query_result_is_one_page() -> Result<()> {
    let memory = memory(3);
    let client: Arc<dyn StorageClient> = memory.clone();
    let provider = RowProvider::Query(QueryRowProvider::new(query_for("zzz")));
    assert_eq!(provider.rows(&client)?.count(), 0);
    assert_eq!(provider.counters().page_count, 1);
    assert_eq!(memory.requests().len(), 1);
    Ok(())
}

#[test]
fn scan_reads_the_whole_table() -> Result<()> {
    let memory = memory(5);
    let client: Arc<dyn StorageClient> = memory.clone();
    let provider = RowProvider::Scan(ScanRowProvider::new());
    let rows = provider.rows(&client)?.collect::<Result<Vec<_>>>()?;
    assert_eq!(rows.len(), 13);
    assert_eq!(provider.counters().page_count, 3);
    assert!(memory
        .requests()
        .iter()
        .all(|r| matches!(r, RecordedRequest::Scan(s) if s.segment.is_none())));
    Ok(())
}

#[test]
fn multi_query_counters_are_the_sum_of_sub_queries() -> Result<()> {
    let client: Arc<dyn StorageClient> = memory(2);
    let multi = MultiQueryRowProvider::new(
        "pk",
        vec![Value::from("c"), Value::from("a"), Value::from("b")],
        &QueryParams::default(),
    );
    let provider = RowProvider::MultiQuery(multi);
    let rows = provider.rows(&client)?.collect::<Result<Vec<_>>>()?;

    let partitions: Vec<&str> = rows.iter().filter_map(|r| r["pk"].as_str()).collect();
    let mut expected = vec!["c"; 2];
    expected.extend(vec!["a"; 7]);
    expected.extend(vec!["b"; 4]);
    assert_eq!(partitions, expected);

    let RowProvider::MultiQuery(multi) = &provider else {
        unreachable!()
    };
    let summed: Counters = multi.queries().iter().map(|q| q.counters()).sum();
    assert_eq!(provider.counters(), summed);
    assert_eq!(summed.page_count, 1 + 4 + 2);
    assert_eq!(summed.returned_count, 13);
    Ok(())
}

#[test]
fn multi_query_with_empty_value_set_yields_nothing() -> Result<()> {
    let memory = memory(2);
    let client: Arc<dyn StorageClient> = memory.clone();
    let provider = RowProvider::MultiQuery(MultiQueryRowProvider::new(
        "pk",
        Vec::new(),
        &QueryParams::default(),
    ));
    assert_eq!(provider.rows(&client)?.count(), 0);
    assert!(memory.requests().is_empty());
    assert_eq!(provider.counters(), Counters::default());
    Ok(())
}

#[test]
fn storage_errors_surface_unchanged() -> Result<()> {
    let client: Arc<dyn StorageClient> = memory(2);
    let provider = RowProvider::Query(QueryRowProvider::new(query_for("a").with_index("missing")));
    let mut rows = provider.rows(&client)?;
    let err = rows.next().expect("one item").expect_err("storage error");
    assert!(err.is_storage());
    assert_eq!(err.to_string(), "index 'missing' does not exist on this table");
    assert!(rows.next().is_none());
    Ok(())
}

#[test]
fn explain_renders_multi_query_blocks() {
    let provider = RowProvider::MultiQuery(MultiQueryRowProvider::new(
        "pk",
        vec![Value::from("1"), Value::from("2"), Value::from("3")],
        &QueryParams::default(),
    ));
    let lines = provider.explain(&ExplainContext::new("us-west-2", "events"));
    assert_eq!(lines[0], "DynamoDB: Consolidate 3 Query operations");
    let headers: Vec<&String> = lines
        .iter()
        .filter(|line| line.starts_with("  Query "))
        .collect();
    assert_eq!(headers, ["  Query 0:", "  Query 1:", "  Query 2:"]);
    assert!(lines.contains(&"      DynamoDB: Query table events from us-west-2".to_owned()));
}
