use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filters::{CompanyId, DepartmentId, PositionId, Status};
use crate::tenant::OrgId;

/// One directory record as storage returns it.
///
/// `attributes` holds sensitive extras (salary, national id, ...). No column
/// maps onto it, so it is never projected into a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub org_id: OrgId,
    pub company_id: CompanyId,
    pub company: String,
    pub department_id: DepartmentId,
    pub department: String,
    pub position_id: PositionId,
    pub position: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub location: String,
    pub status: Status,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Fields free text is matched against.
    pub fn searchable_fields(&self) -> [&str; 4] {
        [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.email.as_str(),
            self.phone.as_deref().unwrap_or(""),
        ]
    }
}
