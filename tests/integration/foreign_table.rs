#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::sync::Arc;

use dynafdw::provider::memory::MemoryStorageClient;
use dynafdw::query::{ColumnDefinition, Operator, Qualifier, Record, Value};
use dynafdw::{FdwError, ForeignTable, ProviderKind, Result, TableDefinition};

fn host_options(extra: &[(&str, &str)]) -> BTreeMap<String, String> {
    let mut options: BTreeMap<String, String> = [("aws_region", "us-east-1"), ("table_name", "music")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in extra {
        options.insert(k.to_string(), v.to_string());
    }
    options
}

fn columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("oid"),
        ColumnDefinition::new("artist").with_option("partition_key", "Artist"),
        ColumnDefinition::new("song").with_option("sort_key", "SongTitle"),
        ColumnDefinition::new("year")
            .with_option("lsi_name", "by-year")
            .with_option("lsi_key", "Year"),
        ColumnDefinition::new("document"),
    ]
}

fn songs() -> Vec<Record> {
    let raw = [
        ("Acme Band", "Happy Day", 2001),
        ("Acme Band", "Hey Now", 1999),
        ("Acme Band", "Zebra", 2010),
        ("No One You Know", "Call Me Today", 2004),
        ("No One You Know", "My Dog Spot", 2001),
        ("The Others", "Hello", 2020),
    ];
    raw.iter()
        .map(|(artist, song, year)| {
            Record::from([
                ("Artist".to_owned(), Value::from(*artist)),
                ("SongTitle".to_owned(), Value::from(*song)),
                ("Year".to_owned(), Value::Int(*year)),
            ])
        })
        .collect()
}

fn table(extra: &[(&str, &str)]) -> Result<ForeignTable> {
    let topology = dynafdw::query::KeyTopology::from_columns(&columns())?;
    let client = MemoryStorageClient::for_topology(&topology)
        .with_items(songs())
        .with_page_size(2);
    ForeignTable::bind(&host_options(extra), &columns(), Arc::new(client))
}

#[test]
fn explain_prints_the_query_payload() -> Result<()> {
    let table = table(&[])?;
    let lines = table.explain(
        &[
            Qualifier::eq("artist", "Acme Band"),
            Qualifier::like("song", "Ha%"),
        ],
        false,
    );
    let expected = vec![
        "DynamoDB: pagination provider",
        "  DynamoDB: Query table music from us-east-1",
        "    {",
        "      \"KeyConditions\": {",
        "        \"Artist\": {",
        "          \"AttributeValueList\": [",
        "            \"Acme Band\"",
        "          ],",
        "          \"ComparisonOperator\": \"EQ\"",
        "        },",
        "        \"SongTitle\": {",
        "          \"AttributeValueList\": [",
        "            \"Ha\"",
        "          ],",
        "          \"ComparisonOperator\": \"BEGINS_WITH\"",
        "        }",
        "      }",
        "    }",
    ];
    assert_eq!(lines, expected);
    Ok(())
}

#[test]
fn explain_mentions_the_local_index() -> Result<()> {
    let table = table(&[])?;
    let lines = table.explain(
        &[
            Qualifier::eq("artist", "Acme Band"),
            Qualifier::new("year", Operator::Ge, 2000_i64),
        ],
        true,
    );
    assert!(lines.contains(&"    Index: by-year".to_owned()));
    assert!(lines.contains(&"    Key condition: Year >= 2000".to_owned()));
    Ok(())
}

#[test]
fn explain_full_scan_uses_configured_segments() -> Result<()> {
    let table = table(&[("parallel_scan_count", "3")])?;
    let lines = table.explain(&[], false);
    assert_eq!(
        lines,
        vec![
            "DynamoDB: parallel scan provider; 3 concurrent segments",
            "  DynamoDB: pagination provider",
            "    DynamoDB: Scan table music from us-east-1",
        ]
    );
    Ok(())
}

#[test]
fn execute_filters_through_the_chosen_path() -> Result<()> {
    let table = table(&[])?;

    let mut stream = table.execute(&[
        Qualifier::eq("artist", "Acme Band"),
        Qualifier::new("song", Operator::Gt, "Hb"),
    ])?;
    assert_eq!(stream.kind(), ProviderKind::Query);
    let titles: Vec<Value> = stream
        .by_ref()
        .map(|row| row.map(|r| r["SongTitle"].clone()))
        .collect::<Result<_>>()?;
    assert_eq!(titles, vec![Value::from("Hey Now"), Value::from("Zebra")]);
    assert_eq!(stream.counters().returned_count, 2);
    assert_eq!(stream.counters().page_count, 1);

    let via_index = table.execute(&[
        Qualifier::eq("artist", "Acme Band"),
        Qualifier::new("year", Operator::Lt, 2005_i64),
    ])?;
    let years: Vec<Value> = via_index
        .map(|row| row.map(|r| r["Year"].clone()))
        .collect::<Result<_>>()?;
    assert_eq!(years, vec![Value::Int(1999), Value::Int(2001)]);
    Ok(())
}

#[test]
fn execute_multi_valued_partition_key() -> Result<()> {
    let table = table(&[])?;
    let stream = table.execute(&[Qualifier::in_set(
        "artist",
        ["The Others", "No One You Know"],
    )])?;
    assert_eq!(stream.kind(), ProviderKind::MultiQuery);
    let artists: Vec<Value> = stream
        .map(|row| row.map(|r| r["Artist"].clone()))
        .collect::<Result<_>>()?;
    assert_eq!(
        artists,
        vec![
            Value::from("The Others"),
            Value::from("No One You Know"),
            Value::from("No One You Know"),
        ]
    );
    Ok(())
}

#[test]
fn execute_falls_back_to_parallel_scan() -> Result<()> {
    let table = table(&[("parallel_scan_count", "2")])?;
    let mut stream = table.execute(&[Qualifier::new("year", Operator::Gt, 2000_i64)])?;
    assert_eq!(stream.kind(), ProviderKind::ParallelScan);
    let rows = stream.by_ref().collect::<Result<Vec<_>>>()?;
    assert_eq!(rows.len(), 6);
    assert_eq!(stream.counters().returned_count, 6);
    Ok(())
}

#[test]
fn binding_errors_are_reported() {
    let client = Arc::new(MemoryStorageClient::for_topology(
        &dynafdw::query::KeyTopology::new(dynafdw::query::KeyField::same("pk")),
    ));

    let mut options = host_options(&[]);
    options.remove("table_name");
    let err = ForeignTable::bind(&options, &columns(), client.clone()).unwrap_err();
    assert!(matches!(err, FdwError::MissingOption("table_name")));

    let err = ForeignTable::bind(&host_options(&[]), &[ColumnDefinition::new("doc")], client)
        .unwrap_err();
    assert!(matches!(err, FdwError::InvalidTopology(_)));
}

#[test]
fn table_definition_round_trips_through_toml() -> Result<()> {
    let definition = TableDefinition::from_toml(
        r#"
[options]
aws_region = "eu-central-1"
table_name = "music"

[[columns]]
name = "artist"
options = { partition_key = "Artist" }

[[qualifiers]]
field = "artist"
operator = "IN"
value = ["a", "b"]
"#,
    )?;
    let (options, topology) = definition.bind()?;
    assert_eq!(options.region, "eu-central-1");
    assert_eq!(topology.partition_key.physical_attr, "Artist");
    assert_eq!(
        definition.qualifiers,
        vec![Qualifier::in_set("artist", ["a", "b"])]
    );
    Ok(())
}
