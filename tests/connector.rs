use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use jsontable::schema::Schema;
use jsontable::{
    Batch, BatchSink, CancelToken, Cell, ConnectorConfig, Error, JsonConnector, MemorySink,
    NestingOverflow, Source, StreamStatus, TypeTag,
};
use serde_json::{json, Value};

fn connector() -> JsonConnector {
    JsonConnector::new(ConnectorConfig::default()).unwrap()
}

fn array_of(n: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| format!(r#"{{"id": {i}, "label": "row-{i}"}}"#))
        .collect();
    format!("[{}]", items.join(", "))
}

#[test]
fn test_union_schema_with_missing_column() {
    let table = connector()
        .get_data(Source::from_bytes(r#"[{"a":1,"b":"x"},{"a":2}]"#))
        .unwrap();

    let columns: Vec<(&str, TypeTag, bool)> = table
        .schema
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.type_tag, c.nullable))
        .collect();
    assert_eq!(
        columns,
        vec![("a", TypeTag::Integer, false), ("b", TypeTag::String, true)]
    );
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.value(1, "b"), Some(&Cell::Null));
}

#[test]
fn test_array_of_objects_paths() {
    let table = connector()
        .get_data(Source::from_bytes(
            r#"{"items":[{"sku":"X"},{"sku":"Y","qty":5}]}"#,
        ))
        .unwrap();
    let names: Vec<&str> = table.schema.names().collect();
    assert_eq!(names, vec!["items[0].sku", "items[1].sku", "items[1].qty"]);
    assert_eq!(table.value(0, "items[1].qty"), Some(&Cell::Integer(5)));
}

#[test]
fn test_uniform_array_rows_and_order() {
    let table = connector()
        .get_data(Source::from_bytes(array_of(25)))
        .unwrap();
    assert_eq!(table.num_rows(), 25);
    let names: Vec<&str> = table.schema.names().collect();
    assert_eq!(names, vec!["id", "label"]);
    assert_eq!(table.value(24, "label"), Some(&Cell::String("row-24".into())));
}

#[test]
fn test_malformed_input_observed_once() {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let config = ConnectorConfig::default().with_observer(move |err| {
        sink.lock().unwrap().push(err.kind().to_string());
    });
    let connector = JsonConnector::new(config).unwrap();

    let err = connector
        .get_data(Source::from_bytes(r#"{"a": }"#))
        .unwrap_err();
    match err {
        Error::Parse(parse) => {
            assert_eq!(parse.offset, 6);
            assert_eq!((parse.line, parse.column), (1, 7));
        }
        other => panic!("expected parse error, got {other}"),
    }
    assert_eq!(*seen.lock().unwrap(), vec!["parse".to_string()]);
}

#[test]
fn test_scalar_root_rejected() {
    let err = connector().get_data(Source::from_bytes("42")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedRoot { found: "number" }));

    let err = connector()
        .get_storage_data(Source::from_bytes("42"), MemorySink::new(), 10)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedRoot { .. }));
}

#[test]
fn test_batch_count_and_order() {
    for (n, b) in [(10, 3), (9, 3), (1, 5), (0, 2), (7, 1)] {
        let load = connector()
            .get_storage_data(Source::from_bytes(array_of(n)), MemorySink::new(), b)
            .unwrap();

        let expected_batches = n.div_ceil(b);
        assert_eq!(load.summary.batches, expected_batches, "n={n} b={b}");
        assert_eq!(load.summary.rows, n);

        let batches = load.sink.batches();
        let indices: Vec<usize> = batches.iter().map(|batch| batch.index).collect();
        assert_eq!(indices, (1..=expected_batches).collect::<Vec<_>>());
        if let Some(last) = batches.last() {
            let expected_last = if n % b == 0 { b } else { n % b };
            assert_eq!(last.len(), expected_last);
        }
    }
}

#[test]
fn test_frozen_schema_survives_later_batches() {
    let text = r#"[
        {"id": 1, "price": 10},
        {"id": 2, "price": "11"},
        {"id": 3, "price": "n/a", "added": true}
    ]"#;
    let connector = JsonConnector::new(ConnectorConfig::default().with_read_chunk_size(8)).unwrap();
    let load = connector
        .get_storage_data(Source::from_bytes(text), MemorySink::new(), 1)
        .unwrap();

    let schema = load.summary.schema.clone().unwrap();
    let names: Vec<&str> = schema.names().collect();
    assert_eq!(names, vec!["id", "price"]);
    assert_eq!(schema.column("price").unwrap().type_tag, TypeTag::Integer);
    for batch in load.sink.batches() {
        assert_eq!(batch.rows[0].len(), 2);
    }
    assert_eq!(load.summary.dropped_values, 1);
    assert_eq!(load.summary.coerced_to_null, 1);

    let table = load.sink.into_table();
    assert_eq!(table.value(1, "price"), Some(&Cell::Integer(11)));
    assert_eq!(table.value(2, "price"), Some(&Cell::Null));
}

#[test]
fn test_streamed_nested_values_are_canonical_text() {
    let text = r#"[{"meta": {"b": 1, "a": [true]}, "empty": []}]"#;
    let load = connector()
        .get_storage_data(Source::from_bytes(text), MemorySink::new(), 4)
        .unwrap();
    let table = load.sink.into_table();
    assert_eq!(table.schema.column("empty").unwrap().type_tag, TypeTag::Nested);
    assert_eq!(table.value(0, "empty"), Some(&Cell::String("[]".into())));
    assert_eq!(table.value(0, "meta.a[0]"), Some(&Cell::Boolean(true)));
}

#[test]
fn test_serialize_shape_by_row_count() {
    let connector = connector();

    let one = connector
        .get_data(Source::from_bytes(r#"[{"a": {"b": 1}}]"#))
        .unwrap();
    let text = connector.serialize(&one).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"a": {"b": 1}}));

    let two = connector
        .get_data(Source::from_bytes(r#"[{"a": 1}, {"a": 2}]"#))
        .unwrap();
    let text = connector.serialize(&two).unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(&text).unwrap(),
        json!([{"a": 1}, {"a": 2}])
    );

    let none = connector.get_data(Source::from_bytes("[]")).unwrap();
    assert_eq!(connector.serialize(&none).unwrap(), "[]");
}

#[test]
fn test_flatten_unflatten_roundtrip() {
    let original = json!({
        "order": 17,
        "customer": {"name": "Ines", "address": {"city": "Porto", "geo": [41.1, -8.6]}},
        "lines": [{"sku": "A", "qty": 2}, {"sku": "B", "qty": 1, "note": "gift"}],
        "paid": true
    });
    let connector = connector();
    let table = connector.table_from_value(&original).unwrap();
    let text = connector.serialize(&table).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), original);
}

#[test]
fn test_depth_limit_policies() {
    let mut deep = json!(1);
    for _ in 0..40 {
        deep = json!({ "n": deep });
    }
    let text = deep.to_string();

    let table = connector().get_data(Source::from_bytes(text.clone())).unwrap();
    assert_eq!(table.num_columns(), 1);

    let strict = JsonConnector::new(ConnectorConfig::default().with_max_depth(10)).unwrap();
    let err = strict.get_data(Source::from_bytes(text.clone())).unwrap_err();
    assert!(matches!(err, Error::StructureTooComplex { max_depth: 10, .. }));

    let embedding = JsonConnector::new(
        ConnectorConfig::default()
            .with_max_depth(10)
            .with_nesting_overflow(NestingOverflow::Embed),
    )
    .unwrap();
    let table = embedding.get_data(Source::from_bytes(text)).unwrap();
    let column = &table.schema.columns()[0];
    assert_eq!(column.type_tag, TypeTag::Nested);
}

#[test]
fn test_cancellation_stops_between_batches() {
    struct CancelAfterFirst {
        token: CancelToken,
        batches: usize,
    }

    impl BatchSink for CancelAfterFirst {
        fn append_batch(&mut self, _batch: Batch, _schema: &Schema) -> jsontable::Result<()> {
            self.batches += 1;
            self.token.cancel();
            Ok(())
        }
    }

    let token = CancelToken::new();
    let sink = CancelAfterFirst {
        token: token.clone(),
        batches: 0,
    };
    let load = connector()
        .get_storage_data_with_cancel(Source::from_bytes(array_of(10)), sink, 3, &token)
        .unwrap();

    assert_eq!(load.summary.status, StreamStatus::Cancelled);
    assert_eq!(load.sink.batches, 1);
    assert_eq!(load.summary.rows, 3);
}

#[test]
fn test_sink_error_propagates_and_is_observed() {
    #[derive(Debug)]
    struct FailingSink;

    impl BatchSink for FailingSink {
        fn append_batch(&mut self, _batch: Batch, _schema: &Schema) -> jsontable::Result<()> {
            Err(Error::sink(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let connector = JsonConnector::new(ConnectorConfig::default().with_observer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();

    let err = connector
        .get_storage_data(Source::from_bytes(array_of(2)), FailingSink, 1)
        .unwrap_err();
    assert!(matches!(err, Error::Sink(_)));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_parse_error_mid_stream_keeps_earlier_batches() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let connector = JsonConnector::new(ConnectorConfig::default().with_observer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();

    let mut sink = MemorySink::new();
    let err = connector
        .get_storage_data(Source::from_bytes(r#"[{"a":1},{"a": }]"#), &mut sink, 1)
        .unwrap_err();

    match err {
        Error::Parse(parse) => assert_eq!(parse.offset, 15),
        other => panic!("expected parse error, got {other}"),
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].index, 1);
    assert_eq!(batches[0].rows[0].cells(), &[Cell::Integer(1)]);
}

#[test]
fn test_file_source_by_locator() {
    let path = std::env::temp_dir().join(format!("jsontable-{}.json", std::process::id()));
    std::fs::write(&path, array_of(4)).unwrap();

    let locator = format!("file://{}", path.display());
    let table = connector()
        .get_data(Source::from_locator(&locator).unwrap())
        .unwrap();
    assert_eq!(table.num_rows(), 4);

    let source = Source::from_locator(path.to_str().unwrap()).unwrap();
    let load = connector()
        .get_storage_data(source, MemorySink::new(), 3)
        .unwrap();
    assert_eq!(load.summary.batches, 2);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_file_is_transport_error() {
    let err = connector()
        .get_data(Source::from_locator("/no/such/dir/input.json").unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
