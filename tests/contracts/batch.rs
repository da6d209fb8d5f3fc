use archiflow::contracts::batch::BatchOperation;
use archiflow::contracts::events::EventRecorder;
use archiflow::contracts::model::{Contract, ContractStatus};
use archiflow::contracts::store::ContractStore;
use archiflow::core::config::ArchiflowConfig;
use archiflow::core::error::ArchiflowError;
use chrono::NaiveDate;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn contract(client: &str, status: ContractStatus) -> Contract {
    let mut c = Contract::new();
    c.client_name = client.to_string();
    c.start_date = date(2024, 2, 1);
    c.end_date = date(2024, 8, 31);
    c.value = 2_500.0;
    c.status = status.to_string();
    c
}

fn open_store(tmp: &TempDir) -> ContractStore {
    ContractStore::open(&tmp.path().join("contracts.db"), ArchiflowConfig::default())
        .expect("open store")
}

#[test]
fn batch_add_inserts_everything_in_order() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    let batch = vec![
        contract("Acme", ContractStatus::Draft),
        contract("Beta", ContractStatus::Active),
        contract("Gamma", ContractStatus::Completed),
    ];
    let ids = store.add_contracts(&batch).expect("batch add");
    assert_eq!(
        ids,
        batch.iter().map(|c| c.id.clone()).collect::<Vec<_>>()
    );
    assert_eq!(store.contract_count().expect("count"), 3);
}

#[test]
fn one_invalid_element_rolls_back_the_whole_batch() {
    let tmp = TempDir::new().expect("tempdir");
    let recorder = EventRecorder::new();
    let mut store = open_store(&tmp);
    store.subscribe(Box::new(recorder.clone()));
    store
        .add_contract(&contract("Existing", ContractStatus::Draft))
        .expect("seed");
    recorder.take();

    let mut broken = contract("", ContractStatus::Draft);
    broken.client_name.clear();
    let batch = vec![
        contract("Acme", ContractStatus::Draft),
        broken,
        contract("Gamma", ContractStatus::Draft),
    ];

    let err = store.add_contracts(&batch).unwrap_err();
    let ArchiflowError::BatchError(report) = err else {
        panic!("expected a batch error, got {err:?}");
    };
    assert_eq!(report.operation, BatchOperation::Add);
    assert_eq!(report.attempted, 3);
    assert_eq!(report.prepared, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(report.failures[0].reason.contains("Client name"));

    assert_eq!(store.contract_count().expect("count"), 1);
    assert!(!store.contract_exists(&batch[0].id).expect("exists"));
    assert!(recorder.events().is_empty(), "no events for a rolled back batch");
    assert!(store.last_error().is_some());
}

#[test]
fn repeated_id_inside_a_batch_fails_the_batch() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    let first = contract("Acme", ContractStatus::Draft);
    let mut twin = contract("Acme Twin", ContractStatus::Draft);
    twin.id = first.id.clone();

    let err = store.add_contracts(&[first, twin]).unwrap_err();
    assert!(matches!(err, ArchiflowError::BatchError(ref r) if r.failures.len() == 1));
    assert_eq!(store.contract_count().expect("count"), 0);
}

#[test]
fn empty_ids_in_a_batch_are_generated() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    let mut a = contract("Acme", ContractStatus::Draft);
    let mut b = contract("Beta", ContractStatus::Draft);
    a.id.clear();
    b.id.clear();
    let ids = store.add_contracts(&[a, b]).expect("batch add");
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert!(ids.iter().all(|id| !id.is_empty()));
}

#[test]
fn batch_update_is_all_or_nothing() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    let a = contract("Acme", ContractStatus::Draft);
    let b = contract("Beta", ContractStatus::Draft);
    store.add_contracts(&[a.clone(), b.clone()]).expect("seed");

    let mut a2 = a.clone();
    a2.value = 7_777.0;
    let missing = contract("Nobody", ContractStatus::Draft);
    let err = store.update_contracts(&[a2.clone(), missing]).unwrap_err();
    let ArchiflowError::BatchError(report) = err else {
        panic!("expected a batch error");
    };
    assert_eq!(report.operation, BatchOperation::Update);
    assert_eq!(report.failures[0].index, 1);
    let unchanged = store.get_contract(&a.id).expect("get").expect("present");
    assert_eq!(unchanged.value, 2_500.0);

    let mut b2 = b.clone();
    b2.status = ContractStatus::Active.to_string();
    store.update_contracts(&[a2, b2]).expect("clean batch update");
    assert_eq!(
        store.get_contract(&a.id).expect("get").expect("present").value,
        7_777.0
    );
    assert!(
        store
            .get_contract(&b.id)
            .expect("get")
            .expect("present")
            .has_status(ContractStatus::Active)
    );
}

#[test]
fn batch_delete_refuses_when_any_contract_is_active() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    let draft = contract("Draft Co", ContractStatus::Draft);
    let active = contract("Active Co", ContractStatus::Active);
    let done = contract("Done Co", ContractStatus::Completed);
    store
        .add_contracts(&[draft.clone(), active.clone(), done.clone()])
        .expect("seed");

    let err = store
        .delete_contracts(&[draft.id.as_str(), active.id.as_str(), done.id.as_str()])
        .unwrap_err();
    let ArchiflowError::BatchError(report) = err else {
        panic!("expected a batch error");
    };
    assert_eq!(report.prepared, 2);
    assert_eq!(report.failures[0].id, active.id);
    assert!(report.to_string().starts_with("Batch delete rolled back"));
    assert_eq!(store.contract_count().expect("count"), 3);

    store
        .delete_contracts(&[draft.id.clone(), done.id.clone()])
        .expect("delete inactive");
    assert_eq!(store.contract_count().expect("count"), 1);
    assert!(store.contract_exists(&active.id).expect("exists"));
}

#[test]
fn repeated_id_in_a_delete_batch_is_reported_as_repeated() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    let draft = contract("Draft Co", ContractStatus::Draft);
    store.add_contract(&draft).expect("seed");

    let err = store
        .delete_contracts(&[draft.id.as_str(), draft.id.as_str()])
        .unwrap_err();
    let ArchiflowError::BatchError(report) = err else {
        panic!("expected a batch error");
    };
    assert_eq!(report.prepared, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(
        report.failures[0].reason.contains("repeated in batch"),
        "got {}",
        report.failures[0].reason
    );
    assert!(!report.failures[0].reason.contains("Not found"));
    assert!(store.contract_exists(&draft.id).expect("exists"));
}

#[test]
fn empty_batches_succeed_without_changes() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = open_store(&tmp);
    assert!(store.add_contracts(&[]).expect("empty add").is_empty());
    store.update_contracts(&[]).expect("empty update");
    store.delete_contracts::<String>(&[]).expect("empty delete");
    assert_eq!(store.contract_count().expect("count"), 0);
}
