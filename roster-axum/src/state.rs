use std::sync::Arc;

use roster_core::EmployeeDirectory;

#[derive(Clone)]
pub struct RosterAxumState {
    pub directory: Arc<EmployeeDirectory>,
    /// Take the client identity from the first `x-forwarded-for` hop.
    pub trust_forwarded_for: bool,
}

impl RosterAxumState {
    pub fn new(directory: EmployeeDirectory) -> Self {
        Self {
            directory: Arc::new(directory),
            trust_forwarded_for: false,
        }
    }
}
