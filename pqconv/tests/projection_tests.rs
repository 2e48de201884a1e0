//! Schema projection, append validation and value coercion.

use std::sync::Arc;

use bytes::Bytes;
use pqconv::{
    ColumnDescriptor, ColumnSchema, ColumnStore, CompressionMethod, DecimalValue, Error,
    FieldSet, LogicalKind, MemPager, PagerStore, Record, RowGroupSource, SerializeOptions,
    TimeUnit, deserialize_all, deserialize_group, deserialize_groups_lazy, serialize,
};
use pqconv_test_utils::init_tracing_for_tests;
use time::macros::{date, datetime};
use time::{Date, Duration, OffsetDateTime};

fn setup() -> (Arc<MemPager>, PagerStore<MemPager>) {
    init_tracing_for_tests();
    let pager = Arc::new(MemPager::new());
    let store = PagerStore::open(Arc::clone(&pager)).unwrap();
    (pager, store)
}

fn stored_schema(store: &PagerStore<MemPager>, source: &str) -> ColumnSchema {
    let reader = store.open_for_read(source).unwrap();
    ColumnSchema::from_arrow(&reader.schema()).unwrap()
}

fn decimal(s: &str) -> DecimalValue {
    s.parse().unwrap()
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Narrow {
    id: i32,
}

impl Record for Narrow {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Wide {
    id: i32,
    name: String,
    score: Option<f64>,
    tags: Vec<String>,
}

impl Record for Wide {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields.field("Name", |r| &r.name, |r| &mut r.name);
        fields.field("Score", |r| &r.score, |r| &mut r.score);
        fields.field("Tags", |r| &r.tags, |r| &mut r.tags);
    }
}

#[derive(Debug, Default)]
struct IdAsText {
    id: String,
}

impl Record for IdAsText {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
    }
}

#[derive(Debug, Default, Clone)]
struct OptionalId {
    id: Option<i32>,
}

impl Record for OptionalId {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Price {
    sku: String,
    amount: DecimalValue,
}

impl Record for Price {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Sku", |r| &r.sku, |r| &mut r.sku);
        fields
            .field("Amount", |r| &r.amount, |r| &mut r.amount)
            .decimal(6, 2);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Ledger {
    amount: DecimalValue,
}

impl Record for Ledger {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Amount", |r| &r.amount, |r| &mut r.amount);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Event {
    at: OffsetDateTime,
    precise: OffsetDateTime,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            at: OffsetDateTime::UNIX_EPOCH,
            precise: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl Record for Event {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("At", |r| &r.at, |r| &mut r.at);
        fields
            .field("Precise", |r| &r.precise, |r| &mut r.precise)
            .timestamp_unit(TimeUnit::Microsecond);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Everything {
    flag: bool,
    small: i16,
    big: i64,
    ratio: f32,
    payload: Bytes,
    day: Date,
    maybe_day: Option<Date>,
    maybe_list: Option<Vec<i64>>,
    sparse: Vec<Option<String>>,
}

impl Default for Everything {
    fn default() -> Self {
        Self {
            flag: false,
            small: 0,
            big: 0,
            ratio: 0.0,
            payload: Bytes::new(),
            day: date!(1970 - 01 - 01),
            maybe_day: None,
            maybe_list: None,
            sparse: Vec::new(),
        }
    }
}

impl Record for Everything {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Flag", |r| &r.flag, |r| &mut r.flag);
        fields.field("Small", |r| &r.small, |r| &mut r.small);
        fields.field("Big", |r| &r.big, |r| &mut r.big);
        fields.field("Ratio", |r| &r.ratio, |r| &mut r.ratio);
        fields.field("Payload", |r| &r.payload, |r| &mut r.payload);
        fields.field("Day", |r| &r.day, |r| &mut r.day);
        fields.field("MaybeDay", |r| &r.maybe_day, |r| &mut r.maybe_day);
        fields.field("MaybeList", |r| &r.maybe_list, |r| &mut r.maybe_list);
        fields.field("Sparse", |r| &r.sparse, |r| &mut r.sparse);
    }
}

#[derive(Debug, Default)]
struct AllIgnored {
    note: String,
}

impl Record for AllIgnored {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Note", |r| &r.note, |r| &mut r.note).ignore();
    }
}

fn narrow(ids: std::ops::Range<i32>) -> Vec<Narrow> {
    ids.map(|id| Narrow { id }).collect()
}

#[test]
fn test_superset_target_fields_take_defaults() {
    let (_, store) = setup();
    serialize::<Narrow, _, _>(&narrow(0..3), &store, "narrow", &SerializeOptions::new()).unwrap();

    let groups = deserialize_groups_lazy::<Wide, _>(&store, "narrow").unwrap();
    assert_eq!(groups.projection().matched_columns(), ["Id"]);
    assert_eq!(
        groups.projection().defaulted_columns(),
        ["Name", "Score", "Tags"]
    );

    let wide: Vec<Wide> = deserialize_all(&store, "narrow").unwrap();
    let expected: Vec<Wide> = (0..3)
        .map(|id| Wide {
            id,
            ..Default::default()
        })
        .collect();
    assert_eq!(wide, expected);
}

#[test]
fn test_subset_target_ignores_extra_columns() {
    let (_, store) = setup();
    let rows = vec![Wide {
        id: 7,
        name: "seven".into(),
        score: Some(0.5),
        tags: vec!["a".into(), "b".into()],
    }];
    serialize::<Wide, _, _>(&rows, &store, "wide", &SerializeOptions::new()).unwrap();

    let back: Vec<Narrow> = deserialize_all(&store, "wide").unwrap();
    assert_eq!(back, [Narrow { id: 7 }]);
}

#[test]
fn test_append_with_different_schema_leaves_destination_unchanged() {
    let (pager, store) = setup();
    let options = SerializeOptions::new().with_row_group_size(2);
    serialize::<Narrow, _, _>(&narrow(0..4), &store, "log", &options).unwrap();
    let blobs = pager.blob_count();

    let extra = vec![Wide::default()];
    let err = serialize::<Wide, _, _>(&extra, &store, "log", &options.clone().with_append(true))
        .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "{err}");

    assert_eq!(pager.blob_count(), blobs);
    assert_eq!(store.open_for_read("log").unwrap().row_group_count(), 2);
    let back: Vec<Narrow> = deserialize_all(&store, "log").unwrap();
    assert_eq!(back, narrow(0..4));
}

#[test]
fn test_append_to_missing_destination() {
    let (_, store) = setup();
    let err = serialize::<Narrow, _, _>(
        &narrow(0..1),
        &store,
        "nowhere",
        &SerializeOptions::new().with_append(true),
    )
    .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "{err}");
    assert!(!store.contains("nowhere"));
}

#[test]
fn test_append_partial_last_group() {
    let (_, store) = setup();
    let options = SerializeOptions::new().with_row_group_size(2);
    serialize::<Narrow, _, _>(&narrow(0..3), &store, "log", &options).unwrap();
    serialize::<Narrow, _, _>(&narrow(3..6), &store, "log", &options.with_append(true)).unwrap();

    // Appending never merges into the short group left by the first call.
    let reader = store.open_for_read("log").unwrap();
    let sizes: Vec<usize> = reader.row_groups().iter().map(|h| h.row_count).collect();
    assert_eq!(sizes, [2, 1, 2, 1]);
    let back: Vec<Narrow> = deserialize_all(&store, "log").unwrap();
    assert_eq!(back, narrow(0..6));
}

#[test]
fn test_replace_existing_container() {
    let (pager, store) = setup();
    let options = SerializeOptions::new().with_row_group_size(2);
    serialize::<Narrow, _, _>(&narrow(0..6), &store, "data", &options).unwrap();
    serialize::<Narrow, _, _>(&narrow(100..101), &store, "data", &options).unwrap();

    let back: Vec<Narrow> = deserialize_all(&store, "data").unwrap();
    assert_eq!(back, narrow(100..101));
    // Catalog plus the single remaining row group.
    assert_eq!(pager.blob_count(), 2);
}

#[test]
fn test_kind_mismatch_on_read_names_column() {
    let (_, store) = setup();
    serialize::<Narrow, _, _>(&narrow(0..2), &store, "ids", &SerializeOptions::new()).unwrap();

    let err = deserialize_all::<IdAsText, _>(&store, "ids").unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }), "{err}");
    assert_eq!(err.column(), Some("Id"));
}

#[test]
fn test_group_index_checked_before_kinds() {
    let (_, store) = setup();
    serialize::<Narrow, _, _>(
        &narrow(0..10),
        &store,
        "ids",
        &SerializeOptions::new().with_row_group_size(2),
    )
    .unwrap();

    for index in [-1, 5, 99] {
        let err = deserialize_group::<IdAsText, _>(&store, "ids", index).unwrap_err();
        assert!(
            matches!(err, Error::IndexOutOfRange { index: i, count: 5 } if i == index),
            "{err}"
        );
    }
    let err = deserialize_group::<IdAsText, _>(&store, "ids", 0).unwrap_err();
    assert_eq!(err.column(), Some("Id"), "{err}");
}

#[test]
fn test_null_read_into_required_field() {
    let (_, store) = setup();
    let rows = [Some(1), Some(2), None, Some(4)].map(|id| OptionalId { id });
    serialize::<OptionalId, _, _>(
        &rows,
        &store,
        "ids",
        &SerializeOptions::new().with_row_group_size(2),
    )
    .unwrap();

    let mut groups = deserialize_groups_lazy::<Narrow, _>(&store, "ids").unwrap();
    assert_eq!(groups.next().unwrap().unwrap(), narrow(1..3));
    let err = groups.next().unwrap().unwrap_err();
    assert_eq!(err.column(), Some("Id"));
    // The iterator ends after an error.
    assert!(groups.next().is_none());

    let err = deserialize_all::<Narrow, _>(&store, "ids").unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }), "{err}");
}

#[test]
fn test_null_written_into_required_column() {
    let (_, store) = setup();
    let schema = ColumnSchema::new(vec![ColumnDescriptor::new("Id", LogicalKind::Int32)]).unwrap();
    let rows = [Some(1), None].map(|id| OptionalId { id });

    let err = serialize::<OptionalId, _, _>(
        &rows,
        &store,
        "ids",
        &SerializeOptions::new().with_schema(schema),
    )
    .unwrap_err();
    assert_eq!(err.column(), Some("Id"), "{err}");
    assert!(!store.contains("ids"));
}

#[test]
fn test_decimal_scale_overflow_writes_nothing() {
    let (pager, store) = setup();
    let rows = vec![
        Price {
            sku: "a".into(),
            amount: decimal("1.5"),
        },
        Price {
            sku: "b".into(),
            amount: decimal("1.234"),
        },
    ];
    let blobs = pager.blob_count();

    let err = serialize::<Price, _, _>(&rows, &store, "prices", &SerializeOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }), "{err}");
    assert_eq!(err.column(), Some("Amount"));
    assert!(!store.contains("prices"));
    assert_eq!(pager.blob_count(), blobs);
}

#[test]
fn test_decimal_precision_overflow() {
    let (_, store) = setup();
    let rows = vec![Price {
        sku: "big".into(),
        amount: decimal("12345.6"),
    }];
    let err = serialize::<Price, _, _>(&rows, &store, "prices", &SerializeOptions::new())
        .unwrap_err();
    assert_eq!(err.column(), Some("Amount"), "{err}");
}

#[test]
fn test_failed_replace_keeps_previous_contents() {
    let (pager, store) = setup();
    let options = SerializeOptions::new().with_row_group_size(1);
    let good = vec![Price {
        sku: "a".into(),
        amount: decimal("9.99"),
    }];
    serialize::<Price, _, _>(&good, &store, "prices", &options).unwrap();
    let blobs = pager.blob_count();

    let mut bad = good.clone();
    bad.push(Price {
        sku: "b".into(),
        amount: decimal("0.001"),
    });
    assert!(serialize::<Price, _, _>(&bad, &store, "prices", &options).is_err());

    assert_eq!(pager.blob_count(), blobs);
    let back: Vec<Price> = deserialize_all(&store, "prices").unwrap();
    assert_eq!(back, good);
}

#[test]
fn test_decimal_padded_to_column_scale() {
    let (_, store) = setup();
    let rows = vec![Price {
        sku: "a".into(),
        amount: decimal("1.5"),
    }];
    serialize::<Price, _, _>(&rows, &store, "prices", &SerializeOptions::new()).unwrap();

    assert_eq!(
        stored_schema(&store, "prices").column("Amount").unwrap().kind,
        LogicalKind::Decimal {
            precision: 6,
            scale: 2
        }
    );
    let back: Vec<Price> = deserialize_all(&store, "prices").unwrap();
    assert_eq!(back[0].amount, decimal("1.50"));
    assert_eq!(back[0].amount.scale(), 2);
}

#[test]
fn test_explicit_schema_overrides_decimal_scale() {
    let (_, store) = setup();
    let schema = ColumnSchema::new(vec![ColumnDescriptor::new(
        "Amount",
        LogicalKind::Decimal {
            precision: 12,
            scale: 4,
        },
    )])
    .unwrap();
    let rows = vec![
        Ledger {
            amount: decimal("10.1234"),
        },
        Ledger {
            amount: decimal("-3"),
        },
    ];

    let written = serialize::<Ledger, _, _>(
        &rows,
        &store,
        "ledger",
        &SerializeOptions::new().with_schema(schema.clone()),
    )
    .unwrap();
    assert_eq!(written, schema);
    assert_eq!(stored_schema(&store, "ledger"), schema);

    // The reflected kind is decimal(38,18); reading a decimal(12,4) column
    // into it is allowed.
    let back: Vec<Ledger> = deserialize_all(&store, "ledger").unwrap();
    assert_eq!(back, rows);
}

#[test]
fn test_explicit_schema_with_unknown_column() {
    let (_, store) = setup();
    let schema = ColumnSchema::new(vec![ColumnDescriptor::new("Missing", LogicalKind::Int32)])
        .unwrap();
    let err = serialize::<Narrow, _, _>(
        &narrow(0..1),
        &store,
        "x",
        &SerializeOptions::new().with_schema(schema),
    )
    .unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch(_)), "{err}");
}

#[test]
fn test_timestamps_truncate_to_column_unit() {
    let (_, store) = setup();
    let base = datetime!(2024-01-02 03:04:05 UTC);
    let at = base + Duration::nanoseconds(123_456_789);
    let before_epoch = OffsetDateTime::UNIX_EPOCH - Duration::microseconds(500);
    let rows = vec![
        Event {
            at,
            precise: at,
        },
        Event {
            at: before_epoch,
            precise: before_epoch,
        },
    ];
    serialize::<Event, _, _>(&rows, &store, "events", &SerializeOptions::new()).unwrap();

    let schema = stored_schema(&store, "events");
    assert_eq!(
        schema.column("At").unwrap().kind,
        LogicalKind::Timestamp(TimeUnit::Millisecond)
    );
    assert_eq!(
        schema.column("Precise").unwrap().kind,
        LogicalKind::Timestamp(TimeUnit::Microsecond)
    );

    let back: Vec<Event> = deserialize_all(&store, "events").unwrap();
    assert_eq!(back[0].at, base + Duration::milliseconds(123));
    assert_eq!(back[0].precise, base + Duration::microseconds(123_456));
    // Truncation floors toward negative infinity.
    assert_eq!(
        back[1].at,
        OffsetDateTime::UNIX_EPOCH - Duration::milliseconds(1)
    );
    assert_eq!(back[1].precise, before_epoch);
}

#[test]
fn test_all_value_shapes_round_trip() {
    let (_, store) = setup();
    let rows: Vec<Everything> = (0..5)
        .map(|i| Everything {
            flag: i % 2 == 0,
            small: -(i as i16),
            big: i64::MAX - i,
            ratio: i as f32 / 4.0,
            payload: Bytes::from(vec![i as u8; i as usize]),
            day: date!(2020 - 02 - 28) + Duration::days(i),
            maybe_day: (i > 2).then(|| date!(2000 - 01 - 01)),
            maybe_list: match i {
                0 => None,
                1 => Some(Vec::new()),
                _ => Some((0..i).collect()),
            },
            sparse: vec![Some(format!("s{i}")), None],
        })
        .collect();

    serialize::<Everything, _, _>(
        &rows,
        &store,
        "everything",
        &SerializeOptions::new().with_row_group_size(2),
    )
    .unwrap();
    let back: Vec<Everything> = deserialize_all(&store, "everything").unwrap();
    assert_eq!(back, rows);
    assert_eq!(back[0].maybe_list, None);
    assert_eq!(back[1].maybe_list, Some(Vec::new()));

    let schema = stored_schema(&store, "everything");
    let list = schema.column("MaybeList").unwrap();
    assert!(list.repeated && list.list_nullable && !list.nullable);
    let sparse = schema.column("Sparse").unwrap();
    assert!(sparse.repeated && !sparse.list_nullable && sparse.nullable);
}

#[test]
fn test_compression_methods() {
    let (_, store) = setup();
    let rows = narrow(0..50);
    for compression in [
        CompressionMethod::None,
        CompressionMethod::Snappy,
        CompressionMethod::Gzip,
        CompressionMethod::Zstd,
    ] {
        let options = SerializeOptions::new()
            .with_compression(compression)
            .with_row_group_size(16);
        serialize::<Narrow, _, _>(&rows, &store, "compressed", &options).unwrap();
        let back: Vec<Narrow> = deserialize_all(&store, "compressed").unwrap();
        assert_eq!(back, rows, "{compression:?}");
    }
}

#[test]
fn test_encoding_options_reach_the_blob() {
    let rows: Vec<Wide> = (0..2000)
        .map(|id| Wide {
            id,
            name: "the same long value".into(),
            ..Default::default()
        })
        .collect();
    let base = SerializeOptions::new()
        .with_compression(CompressionMethod::None)
        .with_row_group_size(rows.len());

    // Fresh pagers, so the catalog blob is the same size in every run.
    let stored_bytes = |options: &SerializeOptions| {
        let (pager, store) = setup();
        serialize::<Wide, _, _>(&rows, &store, "wide", options).unwrap();
        let back: Vec<Wide> = deserialize_all(&store, "wide").unwrap();
        assert_eq!(back, rows);
        pager.total_bytes()
    };

    let dictionary = stored_bytes(&base);
    let plain = stored_bytes(&base.clone().with_dictionary(false));
    let paged = stored_bytes(&base.clone().with_dictionary(false).with_data_page_size_limit(512));
    assert!(dictionary < plain, "{dictionary} vs {plain}");
    assert!(plain < paged, "{plain} vs {paged}");
}

#[test]
fn test_zero_row_group_size_rejected() {
    let (_, store) = setup();
    let err = serialize::<Narrow, _, _>(
        &narrow(0..3),
        &store,
        "zero",
        &SerializeOptions::new().with_row_group_size(0),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidArgumentError(_)), "{err}");
    assert!(!store.contains("zero"));
}

#[test]
fn test_record_without_columns_rejected() {
    let (_, store) = setup();
    let rows = vec![AllIgnored {
        note: "hidden".into(),
    }];
    let err = serialize::<AllIgnored, _, _>(&rows, &store, "nothing", &SerializeOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Schema(_)), "{err}");
}

#[test]
fn test_read_missing_source() {
    let (_, store) = setup();
    assert!(matches!(
        deserialize_all::<Narrow, _>(&store, "absent"),
        Err(Error::NotFound)
    ));
}
