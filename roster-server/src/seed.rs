//! Sample directory used when `storage.seed_sample_data` is on.
//!
//! Two organizations: `acme` runs Tech Corp and Health Inc with a custom
//! column configuration, `globex` runs Finance Ltd on the defaults.

use std::collections::BTreeMap;

use roster_core::{
    CompanyId, DepartmentId, Employee, MemoryColumnConfig, MemoryEmployeeStore, OrgId, PositionId,
    Status,
};
use roster_sqlite::{SqliteColumnConfig, SqliteEmployeeStore};
use serde_json::json;
use tracing::info;

pub const ACME_COLUMNS: [&str; 6] = ["name", "email", "department", "position", "location", "status"];

struct Row {
    id: i64,
    org: &'static str,
    company: (i64, &'static str),
    department: (i64, &'static str),
    position: (i64, &'static str),
    first: &'static str,
    last: &'static str,
    email: &'static str,
    location: &'static str,
    phone: &'static str,
    status: Status,
    salary: i64,
}

const ROWS: [Row; 7] = [
    Row {
        id: 1,
        org: "acme",
        company: (1, "Tech Corp"),
        department: (1, "Engineering"),
        position: (1, "Senior Developer"),
        first: "John",
        last: "Doe",
        email: "john@techcorp.com",
        location: "New York",
        phone: "555-0101",
        status: Status::Active,
        salary: 125_000,
    },
    Row {
        id: 2,
        org: "acme",
        company: (1, "Tech Corp"),
        department: (1, "Engineering"),
        position: (2, "DevOps Engineer"),
        first: "Jane",
        last: "Smith",
        email: "jane@techcorp.com",
        location: "San Francisco",
        phone: "555-0102",
        status: Status::Active,
        salary: 118_000,
    },
    Row {
        id: 3,
        org: "acme",
        company: (1, "Tech Corp"),
        department: (2, "HR"),
        position: (3, "HR Manager"),
        first: "Mike",
        last: "Johnson",
        email: "mike@techcorp.com",
        location: "New York",
        phone: "555-0103",
        status: Status::Active,
        salary: 96_000,
    },
    Row {
        id: 4,
        org: "acme",
        company: (2, "Health Inc"),
        department: (3, "Medical"),
        position: (4, "Doctor"),
        first: "Sarah",
        last: "Williams",
        email: "sarah@healthinc.com",
        location: "Boston",
        phone: "555-0201",
        status: Status::Active,
        salary: 210_000,
    },
    Row {
        id: 5,
        org: "acme",
        company: (2, "Health Inc"),
        department: (4, "Nursing"),
        position: (5, "Head Nurse"),
        first: "Robert",
        last: "Brown",
        email: "robert@healthinc.com",
        location: "Boston",
        phone: "555-0202",
        status: Status::NotStarted,
        salary: 88_000,
    },
    Row {
        id: 6,
        org: "globex",
        company: (3, "Finance Ltd"),
        department: (5, "Accounting"),
        position: (6, "Senior Accountant"),
        first: "Emily",
        last: "Davis",
        email: "emily@financeltd.com",
        location: "Chicago",
        phone: "555-0301",
        status: Status::Active,
        salary: 102_000,
    },
    Row {
        id: 7,
        org: "globex",
        company: (3, "Finance Ltd"),
        department: (6, "Finance"),
        position: (7, "Financial Analyst"),
        first: "David",
        last: "Miller",
        email: "david@financeltd.com",
        location: "Chicago",
        phone: "555-0302",
        status: Status::Terminated,
        salary: 79_000,
    },
];

pub fn sample_employees() -> Vec<Employee> {
    ROWS.iter()
        .map(|r| Employee {
            id: r.id,
            org_id: OrgId::new(r.org),
            company_id: CompanyId(r.company.0),
            company: r.company.1.to_string(),
            department_id: DepartmentId(r.department.0),
            department: r.department.1.to_string(),
            position_id: PositionId(r.position.0),
            position: r.position.1.to_string(),
            first_name: r.first.to_string(),
            last_name: r.last.to_string(),
            email: r.email.to_string(),
            phone: Some(r.phone.to_string()),
            location: r.location.to_string(),
            status: r.status,
            attributes: BTreeMap::from([("salary".to_string(), json!(r.salary))]),
        })
        .collect()
}

pub fn seed_memory(store: &MemoryEmployeeStore, columns: &MemoryColumnConfig) {
    store.extend(sample_employees());
    columns.set(OrgId::new("acme"), ACME_COLUMNS);
    info!(employees = store.len(), "sample directory seeded");
}

pub async fn seed_sqlite(
    store: &SqliteEmployeeStore,
    columns: &SqliteColumnConfig,
) -> anyhow::Result<()> {
    let employees = sample_employees();
    for employee in &employees {
        store.insert_employee(employee).await?;
    }
    columns
        .set_column_config(&OrgId::new("acme"), &ACME_COLUMNS)
        .await?;
    info!(employees = employees.len(), "sample directory seeded");
    Ok(())
}
