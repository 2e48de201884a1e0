//! Round trips through a pager-backed store.

use std::sync::Arc;

use pqconv::{
    ColumnStore, CompressionMethod, DecimalValue, Error, FieldSet, LogicalKind, MemPager,
    NativeValue, PagerStore, Record, RowGroupSource, SerializeOptions, deserialize_all,
    deserialize_group, deserialize_groups_lazy, reflect, serialize,
};
use pqconv_test_utils::init_tracing_for_tests;
use time::macros::datetime;
use time::{Duration, OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Clone, PartialEq)]
struct SimpleStructure {
    id: i32,
    nullable_id: Option<i32>,
    name: String,
    date: OffsetDateTime,
}

impl Default for SimpleStructure {
    fn default() -> Self {
        Self {
            id: 0,
            nullable_id: None,
            name: String::new(),
            date: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl Record for SimpleStructure {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields.field("NullableId", |r| &r.nullable_id, |r| &mut r.nullable_id);
        fields.field("Name", |r| &r.name, |r| &mut r.name);
        fields.field("Date", |r| &r.date, |r| &mut r.date);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SimpleStructureWithFewProperties {
    id: i32,
    name: String,
}

impl Record for SimpleStructureWithFewProperties {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields.field("Name", |r| &r.name, |r| &mut r.name);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StructureWithIgnoredProperties {
    id: i32,
    name: String,
    ssn: String,
    non_nullable_date_time: PrimitiveDateTime,
    nullable_date_time: Option<PrimitiveDateTime>,
    non_nullable_int: i32,
    nullable_int: Option<i32>,
    non_nullable_decimal: DecimalValue,
    nullable_decimal: Option<DecimalValue>,
}

impl Default for StructureWithIgnoredProperties {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            ssn: String::new(),
            non_nullable_date_time: datetime!(1970-01-01 0:00),
            nullable_date_time: None,
            non_nullable_int: 0,
            nullable_int: None,
            non_nullable_decimal: DecimalValue::default(),
            nullable_decimal: None,
        }
    }
}

impl Record for StructureWithIgnoredProperties {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields.field("Name", |r| &r.name, |r| &mut r.name);
        fields.field("SSN", |r| &r.ssn, |r| &mut r.ssn).ignore();
        fields
            .field(
                "NonNullableDateTime",
                |r| &r.non_nullable_date_time,
                |r| &mut r.non_nullable_date_time,
            )
            .ignore();
        fields
            .field(
                "NullableDateTime",
                |r| &r.nullable_date_time,
                |r| &mut r.nullable_date_time,
            )
            .ignore();
        fields
            .field(
                "NonNullableInt",
                |r| &r.non_nullable_int,
                |r| &mut r.non_nullable_int,
            )
            .ignore();
        fields
            .field("NullableInt", |r| &r.nullable_int, |r| &mut r.nullable_int)
            .ignore();
        fields
            .field(
                "NonNullableDecimal",
                |r| &r.non_nullable_decimal,
                |r| &mut r.non_nullable_decimal,
            )
            .ignore();
        fields
            .field(
                "NullableDecimal",
                |r| &r.nullable_decimal,
                |r| &mut r.nullable_decimal,
            )
            .ignore();
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SimpleRenamed {
    id: i32,
    person_name: String,
}

impl Record for SimpleRenamed {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields
            .field("PersonName", |r| &r.person_name, |r| &mut r.person_name)
            .rename("Name");
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct SimpleRepeated {
    id: i32,
    areas: Vec<i32>,
}

impl Record for SimpleRepeated {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields.field("Areas", |r| &r.areas, |r| &mut r.areas);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StructureWithTestType<T> {
    id: String,
    test_value: T,
}

impl<T: NativeValue> Default for StructureWithTestType<T> {
    fn default() -> Self {
        Self {
            id: String::new(),
            test_value: T::default_native(),
        }
    }
}

impl<T: NativeValue> Record for StructureWithTestType<T> {
    fn describe(fields: &mut FieldSet<Self>) {
        fields.field("Id", |r| &r.id, |r| &mut r.id);
        fields.field("TestValue", |r| &r.test_value, |r| &mut r.test_value);
    }
}

fn store() -> PagerStore<MemPager> {
    init_tracing_for_tests();
    PagerStore::open(Arc::new(MemPager::new())).unwrap()
}

fn snappy(row_group_size: usize) -> SerializeOptions {
    SerializeOptions::new()
        .with_compression(CompressionMethod::Snappy)
        .with_row_group_size(row_group_size)
}

fn simple_structures(ids: std::ops::Range<i32>) -> Vec<SimpleStructure> {
    let now = datetime!(2024-03-10 08:30:15 UTC);
    ids.map(|i| SimpleStructure {
        id: i,
        nullable_id: (i % 2 != 0).then_some(i),
        name: format!("row {i}"),
        date: now + Duration::days(i as i64),
    })
    .collect()
}

#[test]
fn test_serialize_excludes_ignored_properties() {
    let store = store();
    let wall = datetime!(2024-03-10 08:30:15);
    let structures: Vec<_> = (0..10)
        .map(|i| StructureWithIgnoredProperties {
            id: i,
            name: format!("row {i}"),
            ssn: "000-00-0000".into(),
            non_nullable_decimal: "100.534".parse().unwrap(),
            nullable_decimal: Some("99.99".parse().unwrap()),
            non_nullable_date_time: wall,
            nullable_date_time: Some(wall),
            nullable_int: Some(111),
            non_nullable_int: 222,
        })
        .collect();

    let schema =
        serialize::<StructureWithIgnoredProperties, _, _>(&structures, &store, "ignored", &snappy(2))
            .unwrap();
    assert_eq!(schema.names(), ["Id", "Name"]);

    let back: Vec<StructureWithIgnoredProperties> = deserialize_all(&store, "ignored").unwrap();
    assert_eq!(back.len(), 10);
    for (original, read) in structures.iter().zip(&back) {
        assert_eq!(read.id, original.id);
        assert_eq!(read.name, original.name);
        let defaults = StructureWithIgnoredProperties {
            id: read.id,
            name: read.name.clone(),
            ..Default::default()
        };
        assert_eq!(read, &defaults);
    }
}

#[test]
fn test_serialize_deserialize_all_types() {
    let store = store();
    let structures = simple_structures(0..10);

    serialize::<SimpleStructure, _, _>(&structures, &store, "simple", &snappy(2)).unwrap();
    let back: Vec<SimpleStructure> = deserialize_all(&store, "simple").unwrap();
    assert_eq!(back, structures);
}

#[test]
fn test_serialize_append_deserialize() {
    let store = store();
    let first = simple_structures(0..5);
    let second = simple_structures(5..10);

    serialize::<SimpleStructure, _, _>(&first, &store, "appended", &snappy(2)).unwrap();
    serialize::<SimpleStructure, _, _>(
        &second,
        &store,
        "appended",
        &snappy(2).with_append(true),
    )
    .unwrap();

    let reader = store.open_for_read("appended").unwrap();
    assert_eq!(reader.row_group_count(), 6);

    let back: Vec<SimpleStructure> = deserialize_all(&store, "appended").unwrap();
    let expected: Vec<_> = first.into_iter().chain(second).collect();
    assert_eq!(back, expected);
}

#[test]
fn test_serialize_deserialize_renamed_column() {
    let store = store();
    let structures: Vec<_> = (0..10)
        .map(|i| SimpleRenamed {
            id: i,
            person_name: format!("row {i}"),
        })
        .collect();

    let schema =
        serialize::<SimpleRenamed, _, _>(&structures, &store, "renamed", &snappy(2)).unwrap();
    assert_eq!(schema.names(), ["Id", "Name"]);

    let back: Vec<SimpleRenamed> = deserialize_all(&store, "renamed").unwrap();
    assert_eq!(back, structures);

    // A differently shaped type bound to "Name" sees the same values.
    let few: Vec<SimpleStructureWithFewProperties> = deserialize_all(&store, "renamed").unwrap();
    for (original, read) in structures.iter().zip(&few) {
        assert_eq!(read.name, original.person_name);
    }
}

#[test]
fn test_serialize_all_deserialize_few_properties() {
    let store = store();
    let structures = simple_structures(0..10);
    serialize::<SimpleStructure, _, _>(&structures, &store, "few", &snappy(2)).unwrap();

    for r in 0..5 {
        let group: Vec<SimpleStructureWithFewProperties> =
            deserialize_group(&store, "few", r).unwrap();
        assert_eq!(group.len(), 2);
        for (offset, read) in group.iter().enumerate() {
            let original = &structures[2 * r as usize + offset];
            assert_eq!(read.id, original.id);
            assert_eq!(read.name, original.name);
        }
    }

    for index in [5, 99999] {
        let err = deserialize_group::<SimpleStructure, _>(&store, "few", index).unwrap_err();
        assert!(err.is_index_out_of_range(index), "{err}");
    }
}

#[test]
fn test_serialize_read_and_deserialize_by_row_group() {
    let store = store();
    let structures = simple_structures(0..10);
    serialize::<SimpleStructure, _, _>(&structures, &store, "groups", &snappy(2)).unwrap();

    for r in 0..5 {
        let group: Vec<SimpleStructure> = deserialize_group(&store, "groups", r).unwrap();
        let start = 2 * r as usize;
        assert_eq!(group, structures[start..start + 2]);
    }

    let group: Vec<SimpleStructure> = deserialize_group(&store, "groups", 2).unwrap();
    assert_eq!(group[0].id, 4);
    assert_eq!(group[0].name, "row 4");
    assert_eq!(group[1].id, 5);
    assert_eq!(group[1].name, "row 5");

    for index in [-1, 5, 99999] {
        let err = deserialize_group::<SimpleStructure, _>(&store, "groups", index).unwrap_err();
        assert!(
            matches!(err, Error::IndexOutOfRange { index: i, count: 5 } if i == index),
            "{err}"
        );
    }
}

#[test]
fn test_serialize_deserialize_repeated_field() {
    let store = store();
    let structures: Vec<_> = (0..10)
        .map(|i| SimpleRepeated {
            id: i,
            areas: vec![i, 2, 3],
        })
        .collect();

    serialize::<SimpleRepeated, _, _>(&structures, &store, "repeated", &SerializeOptions::new())
        .unwrap();
    let back: Vec<SimpleRepeated> = deserialize_all(&store, "repeated").unwrap();

    assert_eq!(back.len(), 10);
    assert_eq!(back[0].id, 0);
    assert_eq!(back[1].id, 1);
    assert_eq!(back[0].areas, [0, 2, 3]);
    assert_eq!(back[1].areas, [1, 2, 3]);
}

#[test]
fn test_serialize_deserialize_empty_sequence() {
    let store = store();
    let schema = serialize::<SimpleRepeated, _, _>(
        std::iter::empty::<SimpleRepeated>(),
        &store,
        "empty",
        &SerializeOptions::new(),
    )
    .unwrap();

    let reader = store.open_for_read("empty").unwrap();
    assert_eq!(reader.row_group_count(), 0);
    assert_eq!(schema, reflect::<SimpleRepeated>().unwrap());

    let back: Vec<SimpleRepeated> = deserialize_all(&store, "empty").unwrap();
    assert!(back.is_empty());
    let groups = deserialize_groups_lazy::<SimpleRepeated, _>(&store, "empty").unwrap();
    assert_eq!(groups.count(), 0);
}

fn round_trip_test_type<T>(value: T)
where
    T: NativeValue + Clone + PartialEq + std::fmt::Debug,
{
    let store = store();
    let input = StructureWithTestType {
        id: "1".to_owned(),
        test_value: value.clone(),
    };
    let schema = reflect::<StructureWithTestType<T>>().unwrap();

    serialize::<StructureWithTestType<T>, _, _>(
        [input],
        &store,
        "test-type",
        &SerializeOptions::new().with_schema(schema),
    )
    .unwrap();

    let output: Vec<StructureWithTestType<T>> = deserialize_all(&store, "test-type").unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].id, "1");
    assert_eq!(output[0].test_value, value);
}

#[test]
fn test_serialize_structure_with_date_time() {
    round_trip_test_type::<OffsetDateTime>(datetime!(2023-11-05 17:04:09 UTC));
    round_trip_test_type::<PrimitiveDateTime>(datetime!(2023-11-05 17:04:09));
}

#[test]
fn test_serialize_structure_with_nullable_date_time() {
    round_trip_test_type::<Option<OffsetDateTime>>(Some(datetime!(2023-11-05 17:04:09 UTC)));
    round_trip_test_type::<Option<OffsetDateTime>>(None);
}

#[test]
fn test_generic_instantiations_have_distinct_schemas() {
    init_tracing_for_tests();
    let times = reflect::<StructureWithTestType<OffsetDateTime>>().unwrap();
    let strings = reflect::<StructureWithTestType<Option<String>>>().unwrap();
    assert_eq!(
        times.column("TestValue").unwrap().kind,
        LogicalKind::default_timestamp()
    );
    let value = strings.column("TestValue").unwrap();
    assert_eq!(value.kind, LogicalKind::String);
    assert!(value.nullable);
}

#[test]
fn test_serialize_groups() {
    let store = store();
    let structures = simple_structures(0..10);
    serialize::<SimpleStructure, _, _>(&structures, &store, "lazy", &snappy(2)).unwrap();

    let groups = deserialize_groups_lazy::<SimpleStructure, _>(&store, "lazy").unwrap();
    assert_eq!(groups.len(), 5);
    let groups: Vec<Vec<SimpleStructure>> = groups.collect::<pqconv::Result<_>>().unwrap();
    assert_eq!(groups.len(), 5);
    assert!(groups.iter().all(|g| g.len() == 2));

    let flat: Vec<SimpleStructure> = groups.into_iter().flatten().collect();
    assert_eq!(flat, structures);
}

#[test]
fn test_lazy_groups_skip_and_exhaust() {
    let store = store();
    let structures = simple_structures(0..7);
    serialize::<SimpleStructure, _, _>(&structures, &store, "lazy", &snappy(3)).unwrap();

    let mut groups = deserialize_groups_lazy::<SimpleStructure, _>(&store, "lazy").unwrap();
    assert_eq!(groups.row_group_count(), 3);
    assert_eq!(groups.peek_handle().map(|h| h.row_count), Some(3));

    let last = groups.nth(2).unwrap().unwrap();
    assert_eq!(last, structures[6..]);
    assert!(groups.next().is_none());
    assert!(groups.next().is_none());
    assert_eq!(groups.len(), 0);
}

#[test]
fn test_row_group_partitioning() {
    let store = store();
    for (n, k) in [(10, 3), (9, 3), (1, 5000), (5, 1)] {
        let structures = simple_structures(0..n);
        serialize::<SimpleStructure, _, _>(&structures, &store, "parts", &snappy(k)).unwrap();

        let reader = store.open_for_read("parts").unwrap();
        let expected_groups = (n as usize).div_ceil(k);
        assert_eq!(reader.row_group_count(), expected_groups);
        for handle in reader.row_groups() {
            if handle.index + 1 < expected_groups {
                assert_eq!(handle.row_count, k);
            }
        }
        let back: Vec<SimpleStructure> = deserialize_all(&store, "parts").unwrap();
        assert_eq!(back, structures);
    }
}
