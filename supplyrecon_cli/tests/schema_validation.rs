use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use supplyrecon_lib::{CatalogItem, Db, Engine, LegacyEntry, ReconResponse, RunMode};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("CLI crate should be inside workspace")
        .to_path_buf()
}

fn load_schema(name: &str) -> Value {
    let path = workspace_root().join("schema").join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("read schema {}: {}", path.display(), e));
    serde_json::from_str(&text).expect("schema is valid JSON")
}

fn response_validator() -> jsonschema::Validator {
    let schema = load_schema("recon_response.schema.json");
    jsonschema::draft202012::new(&schema).expect("response schema compiles")
}

fn legacy(id: &str, name: &str, min: Option<i64>, max: Option<i64>) -> LegacyEntry {
    LegacyEntry {
        id: id.to_string(),
        nombre_insumo: name.to_string(),
        tipo_anestesia: "GENERAL".to_string(),
        min_excel: min,
        max_excel: max,
    }
}

/// Run the engine against a small in-memory store and serialize the envelope.
fn live_success_response(mode: RunMode) -> Value {
    let mut db = Db::open_in_memory().expect("open db");
    db.init().expect("init db");
    db.upsert_catalog_items(&[
        CatalogItem {
            id: "100".to_string(),
            nombre: "GASA ESTÉRIL 10X10".to_string(),
            activo: true,
        },
        CatalogItem {
            id: "200".to_string(),
            nombre: "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (ADULTO)".to_string(),
            activo: true,
        },
        CatalogItem {
            id: "201".to_string(),
            nombre: "CIRCUITO CIRCULAR CERRADO EXPANDIBLE (NEONATAL)".to_string(),
            activo: true,
        },
    ])
    .expect("seed catalog");
    db.upsert_legacy_entries(&[
        legacy("1", "Gasa estéril 10x10", Some(1), Some(3)),
        legacy("2", "Circuito circular cerrado expandible", None, Some(2)),
        legacy("3", "Torniquete neumático", None, None),
    ])
    .expect("seed legacy");

    let summary = Engine::new(db).run(mode).expect("run succeeds");
    serde_json::to_value(ReconResponse::from_summary(&summary)).expect("serialize response")
}

// ---------------------------------------------------------------------------
// Positive validation: live responses conform to the schema
// ---------------------------------------------------------------------------

#[test]
fn test_success_response_conforms_to_schema() {
    let validator = response_validator();
    let response = live_success_response(RunMode::high_only());

    if let Err(e) = validator.validate(&response) {
        panic!("success response failed validation: {e}");
    }
    assert_eq!(response["estadisticas"]["total_matches"], 3);
    assert_eq!(response["estadisticas"]["registros_sin_mapeo"], 1);
}

#[test]
fn test_medium_mode_response_conforms_to_schema() {
    let validator = response_validator();
    let response = live_success_response(RunMode::with_medium());
    assert!(validator.is_valid(&response));
}

#[test]
fn test_failure_response_conforms_to_schema() {
    let validator = response_validator();
    let response = serde_json::to_value(ReconResponse::failure("catalog table unreachable"))
        .expect("serialize failure");

    if let Err(e) = validator.validate(&response) {
        panic!("failure response failed validation: {e}");
    }
    assert!(response.get("estadisticas").is_none());
}

// ---------------------------------------------------------------------------
// Negative validation: the schema rejects malformed envelopes
// ---------------------------------------------------------------------------

#[test]
fn test_schema_rejects_success_without_statistics() {
    let validator = response_validator();
    let data = json!({ "success": true, "muestra_matches": [], "sin_mapeo_muestra": [] });
    assert!(
        validator.validate(&data).is_err(),
        "success without estadisticas should fail"
    );
}

#[test]
fn test_schema_rejects_failure_without_error() {
    let validator = response_validator();
    assert!(validator.validate(&json!({ "success": false })).is_err());
}

#[test]
fn test_schema_rejects_failure_with_partial_results() {
    let validator = response_validator();
    let data = json!({ "success": false, "error": "boom", "muestra_matches": [] });
    assert!(validator.validate(&data).is_err());
}

#[test]
fn test_schema_rejects_invalid_tier_label() {
    let validator = response_validator();
    let mut response = live_success_response(RunMode::high_only());
    response["muestra_matches"][0]["nivel"] = json!("high");
    assert!(
        validator.validate(&response).is_err(),
        "English tier label should fail the enum"
    );
}

#[test]
fn test_schema_rejects_score_out_of_range() {
    let validator = response_validator();
    let mut response = live_success_response(RunMode::high_only());
    response["muestra_matches"][0]["similitud"] = json!(1.2);
    assert!(validator.validate(&response).is_err());
}

#[test]
fn test_schema_rejects_additional_properties() {
    let validator = response_validator();
    let mut response = live_success_response(RunMode::high_only());
    response["estadisticas"]["extra_field"] = json!(1);
    assert!(
        validator.validate(&response).is_err(),
        "unknown statistics key should fail"
    );
}
