//! Integration test: Encoding contract at the inference boundary

use polars::prelude::*;
use std::sync::Arc;
use talent_retention::error::RetentionError;
use talent_retention::export::{load_encoders, schema_hash, ArtifactBundle};
use talent_retention::inference::{JobChangeLabel, Predictor};
use talent_retention::preprocessing::{RawRecord, RawValue, IDENTIFIER_PLACEHOLDER, MISSING_CATEGORY};
use talent_retention::training::{BoosterConfig, Trainer, TrainingConfig};

fn bundle() -> ArtifactBundle {
    let n = 120usize;
    let cities = ["city_103", "city_21", "city_16", "city_114", "city_160", "city_102"];
    let genders = [Some("Male"), Some("Female"), None, Some("Other")];

    let ids: Vec<i64> = (0..n as i64).map(|i| 20_000 + i).collect();
    let city: Vec<&str> = (0..n).map(|i| cities[i % cities.len()]).collect();
    let cdi: Vec<f64> = (0..n).map(|i| 0.5 + (i % 9) as f64 * 0.05).collect();
    let gender: Vec<Option<&str>> = (0..n).map(|i| genders[i % genders.len()]).collect();
    let experience: Vec<Option<f64>> = (0..n).map(|i| if i % 11 == 0 { None } else { Some((i % 20) as f64) }).collect();
    let target: Vec<i64> = (0..n).map(|i| i64::from(cdi[i] < 0.7 && i % 3 != 0)).collect();

    let df = df!(
        "enrollee_id" => ids,
        "city" => city,
        "city_development_index" => cdi,
        "gender" => gender,
        "experience" => experience,
        "target" => target
    )
    .unwrap();

    let config = TrainingConfig::default().with_booster(BoosterConfig::default().with_n_estimators(25));
    Trainer::new(config).fit(&df).unwrap()
}

fn valid_record() -> RawRecord {
    RawRecord::new()
        .with("city", "city_103")
        .with("city_development_index", 0.92)
        .with("gender", "Male")
        .with("experience", 7.0)
}

#[test]
fn test_categorical_position_holds_code() {
    let bundle = bundle();
    let contract = bundle.contract();

    // cities sorted: city_102, city_103, city_114, city_16, city_160, city_21
    assert_eq!(bundle.encoders.encode("city", "city_103").unwrap(), 1);

    let row = contract.encode_record(&valid_record()).unwrap();
    let city_pos = bundle.schema.position("city").unwrap();
    assert_eq!(row[city_pos], 1.0);

    let cdi_pos = bundle.schema.position("city_development_index").unwrap();
    assert_eq!(row[cdi_pos], 0.92);

    let id_pos = bundle.schema.position("enrollee_id").unwrap();
    assert_eq!(row[id_pos], IDENTIFIER_PLACEHOLDER);
}

#[test]
fn test_decode_round_trip() {
    let bundle = bundle();
    let contract = bundle.contract();
    let row = contract.encode_record(&valid_record()).unwrap();

    for (column, expected) in [("city", "city_103"), ("gender", "Male")] {
        let pos = bundle.schema.position(column).unwrap();
        assert_eq!(contract.decode(column, row[pos] as usize).unwrap(), expected);
    }
}

#[test]
fn test_output_order_ignores_insertion_order() {
    let bundle = bundle();
    let contract = bundle.contract();

    let reversed: RawRecord = vec![
        ("experience", RawValue::Number(7.0)),
        ("gender", RawValue::from("Male")),
        ("city_development_index", RawValue::Number(0.92)),
        ("city", RawValue::from("city_103")),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        contract.encode_record(&reversed).unwrap(),
        contract.encode_record(&valid_record()).unwrap()
    );
    assert_eq!(contract.encode_record(&reversed).unwrap().len(), bundle.schema.len());
}

#[test]
fn test_unknown_category_is_rejected_without_side_effects() {
    let bundle = Arc::new(bundle());
    let predictor = Predictor::new(Arc::clone(&bundle));
    let hash_before = schema_hash(&bundle.schema, &bundle.encoders).unwrap();
    let before = predictor.predict(&valid_record()).unwrap();

    let bad = valid_record().with("city", "city_999");
    let err = predictor.predict(&bad).unwrap_err();
    assert!(
        matches!(err, RetentionError::UnknownCategory { ref column, ref value } if column == "city" && value == "city_999")
    );

    assert_eq!(schema_hash(&bundle.schema, &bundle.encoders).unwrap(), hash_before);
    assert_eq!(bundle.encoders.get("city").unwrap().len(), 6);
    assert_eq!(predictor.predict(&valid_record()).unwrap(), before);
}

#[test]
fn test_missing_column_is_schema_mismatch() {
    let bundle = bundle();
    let record = RawRecord::new()
        .with("city", "city_103")
        .with("gender", "Male")
        .with("experience", 7.0);

    let err = bundle.contract().encode_record(&record).unwrap_err();
    assert!(matches!(err, RetentionError::SchemaMismatch(ref m) if m.contains("city_development_index")));
}

#[test]
fn test_nulls_follow_training_semantics() {
    let bundle = bundle();
    let contract = bundle.contract();

    assert!(bundle.encoders.get("gender").unwrap().encode(MISSING_CATEGORY).is_some());

    let record = valid_record().with("gender", RawValue::Missing).with("experience", RawValue::Missing);
    let row = contract.encode_record(&record).unwrap();
    let gender_pos = bundle.schema.position("gender").unwrap();
    let exp_pos = bundle.schema.position("experience").unwrap();
    assert_eq!(contract.decode("gender", row[gender_pos] as usize).unwrap(), MISSING_CATEGORY);
    assert!(row[exp_pos].is_nan());

    let p = Predictor::new(Arc::new(bundle.clone())).predict(&record).unwrap();
    assert!((0.0..=1.0).contains(&p.probability));
}

#[test]
fn test_probability_and_label_agree() {
    let predictor = Predictor::new(Arc::new(bundle()));
    for (i, city) in ["city_103", "city_21", "city_16", "city_114"].iter().enumerate() {
        let record = valid_record()
            .with("city", *city)
            .with("city_development_index", 0.5 + i as f64 * 0.1);
        let prediction = predictor.predict(&record).unwrap();
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.label == JobChangeLabel::WillChange, prediction.probability > 0.5);
    }
}

#[test]
fn test_exported_encoders_match_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encoders.json");
    let bundle = bundle();
    bundle.export_encoders(&path).unwrap();

    let exported = load_encoders(&path).unwrap();
    assert_eq!(exported, bundle.encoders);

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["city"]["city_103"], 1);
}
