//! Integration tests against the fixture schema corpus in tests/fixtures/schema.

use std::path::{Path, PathBuf};

use jocf_validator::{
    ErrorCategory, FileType, JocfValidator, ObjectType, ObjectValidator, SchemaIndex,
};
use serde_json::{json, Value};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn index() -> SchemaIndex {
    SchemaIndex::load_all(fixtures().join("schema")).unwrap()
}

fn validator() -> JocfValidator {
    JocfValidator::from_schema_root(fixtures().join("schema")).unwrap()
}

fn issuance() -> Value {
    json!({
        "object_type": "TX_STOCK_ISSUANCE",
        "id": "tx-1",
        "stock_class_id": "sc-1",
        "date": "2024-01-01",
        "quantity": "100",
        "share_price": { "amount": "10", "currency": "JPY" }
    })
}

fn holder() -> Value {
    json!({
        "object_type": "SECURITY_HOLDER",
        "id": "sh-1",
        "name": "Hanako Yamada",
        "holder_type": "INDIVIDUAL"
    })
}

// === Schema Index ===

mod schema_index {
    use super::*;

    #[test]
    fn every_discriminator_is_indexed() {
        let index = index();
        let file_types: Vec<&str> = index.file_types().iter().map(|t| t.as_str()).collect();
        let object_types: Vec<&str> = index.object_types().iter().map(|t| t.as_str()).collect();

        assert_eq!(file_types, ["JOCF_SECURITY_HOLDERS_FILE", "JOCF_TRANSACTIONS_FILE"]);
        assert_eq!(object_types, ["SECURITY_HOLDER", "TX_STOCK_ISSUANCE", "TX_STOCK_TRANSFER"]);

        for file_type in index.file_types() {
            let schema = index.file_schema(file_type).unwrap();
            assert_eq!(schema["properties"]["file_type"]["const"], file_type.as_str());
        }
        for object_type in index.object_types() {
            let schema = index.object_schema(object_type).unwrap();
            assert_eq!(schema["properties"]["object_type"]["const"], object_type.as_str());
        }
    }

    #[test]
    fn unknown_discriminators_are_absent() {
        let index = index();
        assert!(index.file_schema(&FileType::new("JOCF_STOCK_CLASSES_FILE").unwrap()).is_none());
        assert!(index.object_schema(&ObjectType::new("TX_STOCK_CANCELLATION").unwrap()).is_none());
        assert!(!index.has_object_schema(&ObjectType::new("tx_stock_issuance").unwrap()));
    }

    #[test]
    fn supporting_schemas_are_registered() {
        let index = index();
        assert_eq!(index.schema_count(), 10);
        assert_eq!(index.registry().len(), 10);
        assert!(index
            .schema_by_id("https://jocf.startupstandard.org/jocf/main/schema/types/Monetary.schema.json")
            .is_some());
    }
}

// === Object Validation ===

mod object_validation {
    use super::*;

    #[test]
    fn well_formed_objects_are_valid() {
        let objects = ObjectValidator::new(&index());
        assert!(objects.validate(&issuance()).is_valid());
        assert!(objects.validate(&holder()).is_valid());
        assert!(objects
            .validate(&json!({
                "object_type": "TX_STOCK_TRANSFER",
                "id": "tx-2",
                "security_id": "sec-1",
                "date": "2024-06-30",
                "quantity": "250",
                "consideration": "5000"
            }))
            .is_valid());
    }

    #[test]
    fn removing_any_required_field_is_detected() {
        let objects = ObjectValidator::new(&index());
        for field in ["id", "stock_class_id", "date", "quantity", "share_price"] {
            let mut object = issuance();
            object.as_object_mut().unwrap().remove(field);

            let result = objects.validate(&object);
            assert!(!result.is_valid(), "removing {field} went unnoticed");
            assert!(result.errors().iter().any(|e| e.contains(field)));
        }
    }

    #[test]
    fn referenced_type_violations() {
        let objects = ObjectValidator::new(&index());
        let mut object = issuance();
        object["date"] = json!("January 1st");
        object["share_price"]["currency"] = json!("GBP");

        let result = objects.validate(&object);
        assert_eq!(result.error_count(), 2, "{:?}", result.errors());
        assert!(result.errors().iter().any(|e| e.contains("at /date:")));
        assert!(result.errors().iter().any(|e| e.contains("at /share_price/currency:")));
    }

    #[test]
    fn additional_properties_on_objects() {
        let objects = ObjectValidator::new(&index());
        let mut object = issuance();
        object["memo"] = json!("not in the schema");

        let result = objects.validate(&object);
        assert_eq!(result.error_count(), 1);
        assert!(result.errors()[0].contains("memo"));
    }

    #[test]
    fn one_of_without_match_is_a_single_error() {
        let objects = ObjectValidator::new(&index());
        let result = objects.validate(&json!({
            "object_type": "TX_STOCK_TRANSFER",
            "id": "tx-2",
            "security_id": "sec-1",
            "date": "2024-06-30",
            "quantity": "250",
            "consideration": true
        }));

        assert_eq!(result.error_count(), 1, "{:?}", result.errors());
        assert!(result.errors()[0].contains("/consideration"));
        assert!(result.errors()[0].contains("oneOf candidates"));
    }
}

// === File Validation ===

mod file_validation {
    use super::*;

    #[test]
    fn issuance_missing_date() {
        let mut item = issuance();
        item.as_object_mut().unwrap().remove("date");
        let document = json!({ "file_type": "JOCF_TRANSACTIONS_FILE", "items": [item] });

        let result = validator().validate_value(&document);
        assert!(!result.is_valid());
        assert!(result
            .errors()
            .iter()
            .any(|e| e.contains("items[0]") && e.contains("date")));
    }

    #[test]
    fn issuance_with_date() {
        let document = json!({ "file_type": "JOCF_TRANSACTIONS_FILE", "items": [issuance()] });
        let result = validator().validate_value(&document);
        assert!(result.is_valid(), "{:?}", result.errors());
        assert!(result.errors().is_empty());
    }

    #[test]
    fn items_allow_list() {
        let validator = validator();

        let document = json!({
            "file_type": "JOCF_TRANSACTIONS_FILE",
            "items": [issuance(), holder()]
        });
        let result = validator.validate_value(&document);
        assert_eq!(
            result.errors(),
            ["items[1]: object_type 'SECURITY_HOLDER' is not allowed in items; \
              allowed object_types: [TX_STOCK_ISSUANCE, TX_STOCK_TRANSFER]"]
        );

        let document = json!({
            "file_type": "JOCF_TRANSACTIONS_FILE",
            "items": [issuance(), issuance()]
        });
        assert!(validator.validate_value(&document).is_valid());
    }

    #[test]
    fn independent_defects_in_one_pass() {
        let mut incomplete = holder();
        incomplete.as_object_mut().unwrap().remove("name");
        let document = json!({
            "file_type": "JOCF_SECURITY_HOLDERS_FILE",
            "items": [issuance(), incomplete],
            "unexpected": 1
        });

        let result = validator().validate_value(&document);
        let errors = result.errors();
        assert!(errors.len() >= 4, "{errors:?}");
        assert_eq!(errors[0], "missing required attribute 'issuer_id'");
        assert!(errors.iter().any(|e| e.contains("'TX_STOCK_ISSUANCE' is not allowed")));
        assert!(errors
            .iter()
            .any(|e| e.starts_with("items[1] object validation error") && e.contains("name")));
        assert_eq!(
            errors.last().unwrap(),
            "undeclared top-level attribute 'unexpected' (additionalProperties is false)"
        );
    }

    #[test]
    fn summary_splits_categories() {
        let mut undated = issuance();
        undated.as_object_mut().unwrap().remove("date");
        let document = json!({
            "file_type": "JOCF_TRANSACTIONS_FILE",
            "items": [holder(), undated]
        });

        let result = validator().validate_value(&document);
        let summary = result.summary();
        assert_eq!(summary.total_errors, 2, "{:?}", result.errors());
        assert!(!summary.validation_success);
        assert_eq!(summary.error_categories.type_check_errors, 1);
        assert_eq!(summary.error_categories.object_validation_errors, 1);
        assert_eq!(summary.error_categories.schema_errors, 0);
        assert_eq!(summary.error_categories.other_errors, 0);

        let grouped = result.errors_by_category();
        assert!(grouped[&ErrorCategory::ObjectValidation][0].starts_with("items[1]"));
    }

    #[test]
    fn repeated_validation_is_identical() {
        let validator = validator();
        let document = json!({
            "file_type": "JOCF_SECURITY_HOLDERS_FILE",
            "items": [issuance(), { "object_type": "SECURITY_HOLDER" }, 42],
            "zzz": true,
            "aaa": false
        });
        let first = validator.validate_value(&document);
        let second = validator.validate_value(&document);
        assert_eq!(first, second);
        assert!(first.error_count() > 3);
    }
}

// === Documents on disk ===

mod documents {
    use super::*;

    #[test]
    fn valid_fixture_documents() {
        let aggregated = validator()
            .validate_directory(fixtures().join("documents/valid"))
            .unwrap();
        let summary = aggregated.summary();
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.valid_files, 2);
        assert_eq!(summary.validated_objects, 4);
        assert!(aggregated.is_valid());
    }

    #[test]
    fn invalid_fixture_document() {
        let path = fixtures().join("documents/invalid/transactions_missing_date.jocf.json");
        let result = validator().validate(&path);
        assert!(!result.is_valid());
        assert!(!result.is_input_error());
        assert_eq!(result.file_path(), Some(path.as_path()));

        let json: Value = serde_json::from_str(&result.to_json(false).unwrap()).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn unreadable_documents_are_input_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let broken = dir.path().join("broken.jocf.json");
        std::fs::write(&broken, r#"{"file_type": "JOCF_TRANSACTIONS_FILE", "items": [invalid"#).unwrap();

        let aggregated = validator().validate_many([broken, dir.path().join("missing.jocf.json")]);
        assert!(aggregated.has_input_errors());
        assert!(aggregated
            .results()
            .iter()
            .all(|r| r.is_input_error() && r.errors()[0].starts_with("file validation error")));
    }
}
