use archiflow::contracts::model::{Contract, ContractStatus};
use archiflow::contracts::store::ContractStore;
use archiflow::core::config::ArchiflowConfig;
use archiflow::core::error::ArchiflowError;
use chrono::NaiveDate;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn today() -> NaiveDate {
    date(2024, 6, 15)
}

fn contract(
    client: &str,
    start: NaiveDate,
    end: NaiveDate,
    value: f64,
    status: ContractStatus,
    description: Option<&str>,
) -> Contract {
    let mut c = Contract::new();
    c.client_name = client.to_string();
    c.start_date = start;
    c.end_date = end;
    c.value = value;
    c.status = status.to_string();
    c.description = description.map(str::to_string);
    c
}

/// Six contracts around 2024-06-15: three Active, one each Completed, Draft, Expired.
fn seeded_store(tmp: &TempDir) -> ContractStore {
    let mut store =
        ContractStore::open(&tmp.path().join("contracts.db"), ArchiflowConfig::default())
            .expect("open store");
    let seed = [
        contract("Acme Corp", date(2024, 1, 1), date(2024, 12, 31), 50_000.0, ContractStatus::Active, Some("Office tower facade")),
        contract("Beta Homes", date(2024, 3, 1), date(2024, 6, 30), 12_000.0, ContractStatus::Active, Some("Kitchen remodel")),
        contract("Gamma Retail", date(2023, 2, 1), date(2024, 2, 1), 8_000.0, ContractStatus::Completed, None),
        contract("Delta 50% Studio", date(2024, 5, 10), date(2024, 9, 30), 3_000.0, ContractStatus::Draft, Some("Concept_sketches")),
        contract("acme labs", date(2023, 6, 1), date(2024, 5, 31), 20_000.0, ContractStatus::Expired, None),
        contract("Zeta Partners", date(2024, 6, 1), date(2024, 6, 20), 5_000.0, ContractStatus::Active, None),
    ];
    store.add_contracts(&seed).expect("seed");
    store
}

fn clients(contracts: &[Contract]) -> Vec<&str> {
    contracts.iter().map(|c| c.client_name.as_str()).collect()
}

#[test]
fn all_contracts_are_ordered_by_start_date_descending() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let all = store.get_all_contracts().expect("all");
    assert_eq!(
        clients(&all),
        vec![
            "Zeta Partners",
            "Delta 50% Studio",
            "Beta Homes",
            "Acme Corp",
            "acme labs",
            "Gamma Retail"
        ]
    );
    assert_eq!(store.contract_count().expect("count"), 6);
    assert_eq!(store.total_contract_value().expect("sum"), 98_000.0);
}

#[test]
fn search_is_case_insensitive_across_fields() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    assert_eq!(
        clients(&store.search_contracts("ACME").expect("search")),
        vec!["Acme Corp", "acme labs"]
    );
    assert_eq!(
        clients(&store.search_contracts("remodel").expect("search")),
        vec!["Beta Homes"]
    );
    assert_eq!(store.search_contracts("active").expect("search").len(), 3);
    assert_eq!(store.search_contracts("   ").expect("blank").len(), 6);
    assert!(store.search_contracts("nothing like this").expect("search").is_empty());
}

#[test]
fn search_folds_non_ascii_case() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store = seeded_store(&tmp);
    store
        .add_contract(&contract(
            "Über Architekten",
            date(2024, 4, 1),
            date(2024, 10, 1),
            7_500.0,
            ContractStatus::Draft,
            Some("Zürich ÉCOLE"),
        ))
        .expect("add");

    for term in ["über", "ÜBER", "Über", "zürich", "école"] {
        assert_eq!(
            clients(&store.search_contracts(term).expect("search")),
            vec!["Über Architekten"],
            "term {term}"
        );
    }
    assert_eq!(
        clients(&store.get_contracts_by_client("über").expect("client")),
        vec!["Über Architekten"]
    );
    assert_eq!(
        clients(&store.get_contracts_by_client("ÜBER ARCH").expect("client")),
        vec!["Über Architekten"]
    );
}

#[test]
fn search_treats_wildcards_literally() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    assert_eq!(
        clients(&store.search_contracts("50%").expect("search")),
        vec!["Delta 50% Studio"]
    );
    assert_eq!(
        clients(&store.search_contracts("t_s").expect("search")),
        vec!["Delta 50% Studio"]
    );
}

#[test]
fn status_filter_is_strict() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    assert_eq!(store.get_contracts_by_status("Active").expect("active").len(), 3);
    assert_eq!(store.get_active_contracts().expect("active").len(), 3);
    assert!(store.get_contracts_by_status("Cancelled").expect("none").is_empty());

    let err = store.get_contracts_by_status("Pending").unwrap_err();
    assert!(matches!(err, ArchiflowError::ValidationError(_)));
    assert!(store.get_contracts_by_status("active").is_err());
}

#[test]
fn client_filter_matches_substrings() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    assert_eq!(
        clients(&store.get_contracts_by_client("acme").expect("client")),
        vec!["Acme Corp", "acme labs"]
    );
    assert_eq!(store.get_contracts_by_client("Partners").expect("client").len(), 1);
}

#[test]
fn date_range_returns_overlapping_contracts() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let hits = store
        .get_contracts_by_date_range(date(2024, 6, 1), date(2024, 6, 10))
        .expect("range");
    assert_eq!(
        clients(&hits),
        vec!["Zeta Partners", "Delta 50% Studio", "Beta Homes", "Acme Corp"]
    );

    let err = store
        .get_contracts_by_date_range(date(2024, 6, 10), date(2024, 6, 1))
        .unwrap_err();
    assert!(matches!(err, ArchiflowError::ValidationError(_)));
}

#[test]
fn value_range_is_inclusive() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let hits = store
        .get_contracts_by_value_range(5_000.0, 20_000.0)
        .expect("range");
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|c| (5_000.0..=20_000.0).contains(&c.value)));
    assert!(store.get_contracts_by_value_range(10.0, 1.0).is_err());
    assert!(store.get_contracts_by_value_range(f64::NAN, 1.0).is_err());
}

#[test]
fn expiring_contracts_are_active_and_sorted_by_end_date() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let soon = store.get_expiring_contracts_on(30, today()).expect("expiring");
    assert_eq!(clients(&soon), vec!["Zeta Partners", "Beta Homes"]);
    assert!(store.get_expiring_contracts_on(3, today()).expect("expiring").is_empty());
    assert_eq!(
        clients(&store.get_expiring_contracts_on(5, today()).expect("expiring")),
        vec!["Zeta Partners"]
    );
    assert!(store.get_expiring_contracts_on(-1, today()).is_err());
}

#[test]
fn statistics_count_overdue_contracts_as_expired() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let stats = store.get_contract_statistics_on(today()).expect("stats");
    assert_eq!(stats.total, 6);
    assert_eq!(stats.active, 3);
    assert_eq!(stats.expired, 2);
    assert_eq!(stats.expiring_soon, 2);
    assert_eq!(stats.expiring_threshold_days, 30);
    assert_eq!(stats.total_value, 98_000.0);
    assert!((stats.average_value - 98_000.0 / 6.0).abs() < 1e-9);
    assert_eq!(stats.by_status["Cancelled"], 0);
}

#[test]
fn statistics_of_an_empty_store_are_zero() {
    let tmp = TempDir::new().expect("tempdir");
    let store =
        ContractStore::open(&tmp.path().join("contracts.db"), ArchiflowConfig::default())
            .expect("open store");
    let stats = store.get_contract_statistics_on(today()).expect("stats");
    assert_eq!(stats.total, 0);
    assert_eq!(stats.average_value, 0.0);
    assert_eq!(stats.by_status.len(), 5);
}

#[test]
fn status_distribution_lists_every_status() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let dist = store.get_status_distribution().expect("distribution");
    assert_eq!(dist.len(), 5);
    assert_eq!(dist["Active"], 3);
    assert_eq!(dist["Completed"], 1);
    assert_eq!(dist["Draft"], 1);
    assert_eq!(dist["Expired"], 1);
    assert_eq!(dist["Cancelled"], 0);
}

#[test]
fn monthly_counts_group_by_start_month() {
    let tmp = TempDir::new().expect("tempdir");
    let store = seeded_store(&tmp);
    let months = store.get_monthly_contract_counts().expect("monthly");
    assert_eq!(months.len(), 6);
    assert_eq!(months["2024-06"], 1);
    assert_eq!(months["2023-02"], 1);
    assert!(months.values().all(|&n| n == 1));
}

#[test]
fn monthly_counts_cover_the_latest_twelve_months_with_data() {
    let tmp = TempDir::new().expect("tempdir");
    let mut store =
        ContractStore::open(&tmp.path().join("contracts.db"), ArchiflowConfig::default())
            .expect("open store");
    let mut seed: Vec<Contract> = (1..=11)
        .map(|m| {
            let start = date(2024, m, 1);
            contract("Monthly", start, start + chrono::Days::new(30), 1_000.0, ContractStatus::Draft, None)
        })
        .collect();
    seed.push(contract("Old", date(2019, 1, 5), date(2019, 3, 1), 1_000.0, ContractStatus::Completed, None));
    seed.push(contract("Old", date(2019, 1, 20), date(2019, 3, 1), 1_000.0, ContractStatus::Completed, None));
    store.add_contracts(&seed).expect("seed");

    // Gaps are skipped, not counted as empty months.
    let months = store.get_monthly_contract_counts().expect("monthly");
    assert_eq!(months.len(), 12);
    assert_eq!(months["2019-01"], 2);
    assert!(!months.contains_key("2023-12"));

    store
        .add_contract(&contract("Latest", date(2024, 12, 1), date(2024, 12, 31), 1_000.0, ContractStatus::Draft, None))
        .expect("add");
    let months = store.get_monthly_contract_counts().expect("monthly");
    assert_eq!(months.len(), 12);
    assert!(!months.contains_key("2019-01"));
    assert_eq!(months.keys().next().map(String::as_str), Some("2024-01"));
    assert_eq!(months["2024-12"], 1);
}
