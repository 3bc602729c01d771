use super::*;

use tabula_core::schema::Trigger;

/// Creates a trigger. On PostgreSQL this renders the trigger function too,
/// so the result must run as a batch.
#[derive(Debug, Clone)]
pub struct CreateTrigger {
    pub table: Name,
    pub trigger: Trigger,
}

impl Statement {
    pub fn create_trigger(table: &str, trigger: &Trigger) -> Self {
        CreateTrigger {
            table: Name::from(table),
            trigger: trigger.clone(),
        }
        .into()
    }
}

impl From<CreateTrigger> for Statement {
    fn from(value: CreateTrigger) -> Self {
        Self::CreateTrigger(value)
    }
}
