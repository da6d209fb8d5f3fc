use archiflow::contracts::model::{Contract, ContractStatus};
use archiflow::contracts::store::ContractStore;
use archiflow::contracts::transfer::{
    export_contracts_json, export_to_file, import_contracts_json, import_from_file,
};
use archiflow::core::config::ArchiflowConfig;
use archiflow::core::error::ArchiflowError;
use chrono::NaiveDate;
use serde_json::json;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn contract(client: &str, status: ContractStatus) -> Contract {
    let mut c = Contract::new();
    c.client_name = client.to_string();
    c.start_date = date(2024, 4, 1);
    c.end_date = date(2025, 3, 31);
    c.value = 4_200.5;
    c.status = status.to_string();
    c.description = Some(format!("{} engagement", client));
    c
}

fn open_store(tmp: &TempDir, name: &str) -> ContractStore {
    ContractStore::open(&tmp.path().join(name), ArchiflowConfig::default()).expect("open store")
}

#[test]
fn export_then_import_reproduces_the_contracts() {
    let tmp = TempDir::new().expect("tempdir");
    let mut source = open_store(&tmp, "source.db");
    let originals = vec![
        contract("Acme", ContractStatus::Active),
        contract("Beta", ContractStatus::Draft),
    ];
    source.add_contracts(&originals).expect("seed");

    let exported = export_contracts_json(&source).expect("export");
    assert_eq!(exported.as_array().map(Vec::len), Some(2));

    let mut target = open_store(&tmp, "target.db");
    let report = import_contracts_json(&mut target, &exported).expect("import");
    assert!(report.is_clean());
    assert_eq!(report.imported.len(), 2);
    for original in &originals {
        let copy = target
            .get_contract(&original.id)
            .expect("get")
            .expect("imported");
        assert_eq!(&copy, original);
    }
}

#[test]
fn import_keeps_valid_items_when_others_fail() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp, "contracts.db");
    let existing = contract("Existing", ContractStatus::Draft);
    store.add_contract(&existing).expect("seed");

    let payload = json!([
        contract("Good One", ContractStatus::Draft).to_json(),
        { "clientName": "", "startDate": "2024-01-01", "endDate": "2024-02-01" },
        existing.to_json(),
        "not an object",
        { "clientName": "Pending Co", "startDate": "2024-01-01", "endDate": "2024-02-01", "status": "Pending" },
        contract("Good Two", ContractStatus::Completed).to_json(),
    ]);
    let report = import_contracts_json(&mut store, &payload).expect("import");

    assert_eq!(report.imported.len(), 2);
    let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![1, 2, 3, 4]);
    assert_eq!(report.failures[1].id, existing.id);
    assert!(report.failures[1].reason.contains("Duplicate"));
    assert!(report.to_string().starts_with("Imported 2 of 6 contracts"));
    assert_eq!(store.contract_count().expect("count"), 3);
}

#[test]
fn import_requires_a_json_array() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp, "contracts.db");
    let err = import_contracts_json(&mut store, &json!({ "clientName": "Acme" })).unwrap_err();
    assert!(matches!(err, ArchiflowError::ValidationError(_)));
}

#[test]
fn file_export_and_import_use_pretty_json() {
    let tmp = TempDir::new().expect("tempdir");
    let mut source = open_store(&tmp, "source.db");
    source
        .add_contract(&contract("Acme", ContractStatus::Active))
        .expect("seed");

    let path = tmp.path().join("exports").join("contracts.json");
    assert_eq!(export_to_file(&source, &path).expect("export"), 1);
    let text = std::fs::read_to_string(&path).expect("read export");
    assert!(text.contains("\"clientName\": \"Acme\""));

    let mut target = open_store(&tmp, "target.db");
    let report = import_from_file(&mut target, &path).expect("import");
    assert_eq!(report.imported.len(), 1);
    assert!(import_from_file(&mut target, &tmp.path().join("missing.json")).is_err());
}
