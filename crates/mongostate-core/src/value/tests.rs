//! Tests for typed index values

use super::*;
use bson::{doc, oid::ObjectId};
use pretty_assertions::assert_eq;

#[test]
fn test_value_deserialize_keeps_number_types() {
    let value: IndexValue = serde_json::from_str(r#"{"qty": 5, "price": 9.5}"#).unwrap();
    let doc = value.as_document().unwrap();
    assert_eq!(doc.get("qty"), Some(&IndexValue::Int(5)));
    assert_eq!(doc.get("price"), Some(&IndexValue::Float(9.5)));
}

#[test]
fn test_value_deserialize_null_and_nested() {
    let value: IndexValue =
        serde_json::from_str(r#"{"$or": [{"deleted": null}, {"tags": ["a", true]}]}"#).unwrap();
    let expected = IndexValue::Document(ValueDocument::from([(
        "$or".to_string(),
        IndexValue::Array(vec![
            IndexValue::Document(ValueDocument::from([(
                "deleted".to_string(),
                IndexValue::Null,
            )])),
            IndexValue::Document(ValueDocument::from([(
                "tags".to_string(),
                IndexValue::Array(vec![
                    IndexValue::String("a".to_string()),
                    IndexValue::Bool(true),
                ]),
            )])),
        ]),
    )]));
    assert_eq!(value, expected);
}

#[test]
fn test_value_int_to_bson_width() {
    assert_eq!(IndexValue::Int(7).to_bson(), Bson::Int32(7));
    assert_eq!(
        IndexValue::Int(5_000_000_000).to_bson(),
        Bson::Int64(5_000_000_000)
    );
}

#[test]
fn test_value_from_bson_numbers_stay_typed() {
    assert_eq!(IndexValue::from_bson(&Bson::Int32(3)), IndexValue::Int(3));
    assert_eq!(IndexValue::from_bson(&Bson::Int64(3)), IndexValue::Int(3));
    assert_eq!(IndexValue::from_bson(&Bson::Double(2.5)), IndexValue::Float(2.5));
}

#[test]
fn test_value_document_survives_bson_conversion() {
    let filter = doc! { "qty": { "$gte": 10 }, "status": { "$in": ["active", "pending"] } };
    let typed = document_from_bson(&filter);
    assert_eq!(document_to_bson(&typed), filter);
}

#[test]
fn test_value_date_literal_converts_to_native_bson() {
    let json = serde_json::json!({ "$date": "2024-01-01T00:00:00Z" });
    let value = IndexValue::from(json);
    match value.to_bson() {
        Bson::DateTime(dt) => assert_eq!(dt.timestamp_millis(), 1_704_067_200_000),
        other => panic!("expected a datetime, got {other:?}"),
    }
}

#[test]
fn test_value_object_id_round_trips_through_extended_json() {
    let oid = ObjectId::parse_str("65a1b2c3d4e5f60718293a4b").unwrap();
    let value = IndexValue::from_bson(&Bson::ObjectId(oid));
    assert_eq!(
        value.as_document().and_then(|d| d.get("$oid")),
        Some(&IndexValue::String("65a1b2c3d4e5f60718293a4b".to_string()))
    );
    assert_eq!(value.to_bson(), Bson::ObjectId(oid));
}

#[test]
fn test_value_extended_json_literal_detection() {
    let literal = ValueDocument::from([("$date".to_string(), IndexValue::Int(0))]);
    assert!(IndexValue::is_extended_json_literal(&literal));

    let operator = ValueDocument::from([("$gt".to_string(), IndexValue::Int(0))]);
    assert!(!IndexValue::is_extended_json_literal(&operator));

    assert!(!IndexValue::is_extended_json_literal(&ValueDocument::new()));
}

#[test]
fn test_bson_numeric_helpers() {
    assert_eq!(bson_as_i64(&Bson::Double(1.0)), Some(1));
    assert_eq!(bson_as_i64(&Bson::Double(1.5)), None);
    assert_eq!(bson_as_i32(&Bson::Int64(i64::MAX)), None);
    assert_eq!(bson_as_f64(&Bson::Int32(-180)), Some(-180.0));
    assert_eq!(bson_as_i64(&Bson::String("1".into())), None);
}
