use std::sync::Arc;
use std::time::Duration;

use roster_core::{
    ClientId, ColumnName, CompanyId, DepartmentId, Employee, EmployeeDirectory, ErrorKind,
    LimiterPolicy, ManualClock, MemoryBucketStore, MemoryColumnConfig, MemoryEmployeeStore, OrgId,
    PositionId, RateLimiter, SearchSettings, Status, TenantContext,
};
use serde_json::Value;

fn employee(id: i64, org: &str, company: i64, first: &str, last: &str, status: Status) -> Employee {
    Employee {
        id,
        org_id: OrgId::new(org),
        company_id: CompanyId(company),
        company: format!("{org} holdings"),
        department_id: DepartmentId(company * 10),
        department: if id % 2 == 0 { "Engineering".into() } else { "Sales".into() },
        position_id: PositionId(company * 100),
        position: "Associate".into(),
        first_name: first.into(),
        last_name: last.into(),
        email: format!("{}.{}@{org}.example", first.to_lowercase(), last.to_lowercase()),
        phone: Some(format!("555-01{id:02}")),
        location: if id % 3 == 0 { "Boston".into() } else { "New York".into() },
        status,
        attributes: [("salary".to_string(), serde_json::json!(100_000 + id))].into(),
    }
}

fn directory_with(limiter: RateLimiter) -> (EmployeeDirectory, Arc<MemoryColumnConfig>) {
    let store = MemoryEmployeeStore::with_employees([
        employee(1, "acme", 1, "Ada", "Lovelace", Status::Active),
        employee(2, "acme", 1, "Grace", "Hopper", Status::Active),
        employee(3, "acme", 1, "Alan", "Turing", Status::Terminated),
        employee(4, "acme", 1, "Edsger", "Dijkstra", Status::Active),
        employee(5, "acme", 1, "Barbara", "Liskov", Status::Terminated),
        employee(6, "globex", 2, "Ada", "Globex", Status::Active),
        employee(7, "globex", 2, "Hank", "Scorpio", Status::Active),
    ]);
    let columns = Arc::new(MemoryColumnConfig::new());
    let directory = EmployeeDirectory::from_parts(
        &SearchSettings::default(),
        Arc::new(limiter),
        Arc::new(store),
        columns.clone(),
    );
    (directory, columns)
}

fn directory() -> (EmployeeDirectory, Arc<MemoryColumnConfig>) {
    directory_with(RateLimiter::default())
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn ctx(org: &str) -> TenantContext {
    TenantContext::new(org, "127.0.0.1")
}

fn column(rows: &[serde_json::Map<String, Value>], key: &str) -> Vec<Value> {
    rows.iter().map(|r| r[key].clone()).collect()
}

#[tokio::test]
async fn status_filter_returns_exactly_the_active_rows() {
    let (dir, columns) = directory();
    columns.set(OrgId::new("acme"), ["id", "status"]);

    let page = dir
        .search(&ctx("acme"), &params(&[("status", "Active"), ("locations", "")]))
        .await
        .unwrap();

    assert_eq!(page.total_count, 3);
    assert_eq!(column(&page.data, "id"), vec![1, 2, 4]);
    assert!(page.data.iter().all(|r| r["status"] == "Active"));
}

#[tokio::test]
async fn organization_columns_shape_every_row() {
    let (dir, columns) = directory();
    columns.set(OrgId::new("acme"), ["name", "department"]);

    let page = dir.search(&ctx("acme"), &params(&[])).await.unwrap();

    assert_eq!(page.data.len(), 5);
    for row in &page.data {
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "department"]);
    }
    assert_eq!(page.data[0]["name"], "Ada Lovelace");
}

#[tokio::test]
async fn default_columns_never_include_attributes() {
    let (dir, _) = directory();
    let page = dir.search(&ctx("acme"), &params(&[])).await.unwrap();

    let expected: Vec<&str> = roster_core::DEFAULT_COLUMNS
        .iter()
        .map(ColumnName::as_str)
        .collect();
    for row in &page.data {
        assert_eq!(row.keys().map(String::as_str).collect::<Vec<_>>(), expected);
        assert!(!row.contains_key("salary"));
    }
}

#[tokio::test]
async fn another_organizations_rows_never_leak() {
    let (dir, columns) = directory();
    columns.set(OrgId::new("acme"), ["id", "name", "company"]);

    // globex's company id injected into an acme search
    let page = dir
        .search(&ctx("acme"), &params(&[("company_ids", "2")]))
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.data.is_empty());

    let page = dir
        .search(&ctx("acme"), &params(&[("q", "ada")]))
        .await
        .unwrap();
    assert_eq!(column(&page.data, "id"), vec![1]);

    let page = dir
        .search(&ctx("acme"), &params(&[("q", "scorpio")]))
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);

    let all = dir.search(&ctx("acme"), &params(&[])).await.unwrap();
    let body = serde_json::to_string(&all).unwrap();
    assert!(!body.contains("globex"));
}

#[tokio::test]
async fn pages_concatenate_to_the_full_result() {
    let (dir, columns) = directory();
    columns.set(OrgId::new("acme"), ["id"]);

    let full = dir
        .search(&ctx("acme"), &params(&[("page_size", "100")]))
        .await
        .unwrap();

    let mut stitched = Vec::new();
    for page in 1..=3 {
        let p = dir
            .search(
                &ctx("acme"),
                &params(&[("page", page.to_string().as_str()), ("page_size", "2")]),
            )
            .await
            .unwrap();
        assert_eq!(p.total_count, full.total_count);
        assert_eq!(p.page, page);
        stitched.extend(p.data);
    }

    assert_eq!(stitched, full.data);
    assert_eq!(stitched.len() as u64, full.total_count);
}

#[tokio::test]
async fn identical_searches_return_identical_pages() {
    let (dir, _) = directory();
    let q = params(&[("q", "a"), ("statuses", "active,terminated")]);
    let first = dir.search(&ctx("acme"), &q).await.unwrap();
    let second = dir.search(&ctx("acme"), &q).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn invalid_parameters_are_rejected_with_the_field() {
    let (dir, _) = directory();
    let err = dir
        .search(&ctx("acme"), &params(&[("limit", "101")]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.to_json()["errors"]["limit"][0], "must be between 1 and 100");
}

#[tokio::test]
async fn rate_limit_is_checked_before_anything_else() {
    let clock = Arc::new(ManualClock::new());
    let limiter = RateLimiter::with_store(
        LimiterPolicy::new(1, 1.0).unwrap(),
        Arc::new(MemoryBucketStore::default()),
        clock.clone(),
    );
    let (dir, _) = directory_with(limiter);

    dir.search(&ctx("acme"), &params(&[])).await.unwrap();
    let err = dir
        .search(&ctx("acme"), &params(&[("page", "zero")]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
    assert_eq!(err.retry_after, Some(Duration::from_secs(1)));

    // a different client has its own bucket
    let other = TenantContext::new("acme", "10.0.0.9");
    assert!(dir.search(&other, &params(&[])).await.is_ok());

    clock.advance(Duration::from_secs(1));
    assert!(dir.search(&ctx("acme"), &params(&[])).await.is_ok());
}

#[test]
fn sixty_requests_then_one_per_second() {
    let clock = Arc::new(ManualClock::new());
    let limiter = RateLimiter::with_store(
        LimiterPolicy::new(60, 1.0).unwrap(),
        Arc::new(MemoryBucketStore::default()),
        clock.clone(),
    );
    let client = ClientId::new("203.0.113.7");

    for _ in 0..60 {
        assert!(limiter.admit(&client).allowed);
    }
    let denied = limiter.admit(&client);
    assert!(!denied.allowed);
    assert_eq!(denied.retry_after, Some(Duration::from_secs(1)));

    clock.advance(Duration::from_secs(5));
    for _ in 0..5 {
        assert!(limiter.admit(&client).allowed);
    }
    assert!(!limiter.admit(&client).allowed);
}
