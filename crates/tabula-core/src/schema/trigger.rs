use super::name;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerScope {
    #[default]
    Row,
    Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerBody {
    /// Dialect text supplied by the descriptor.
    Custom(String),

    /// Writes one audit row per changed field.
    Audit {
        audit_table: String,
        id_name: String,
        fields: Vec<String>,
    },

    /// Deletes the rows referenced by owned relations.
    Relation { targets: Vec<RelationTarget> },
}

/// One owned relation: `field` references `table.id_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationTarget {
    pub field: String,
    pub table: String,
    pub id_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    pub name: String,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    pub scope: TriggerScope,
    pub body: TriggerBody,
}

impl Trigger {
    pub fn new(
        table: &str,
        timing: TriggerTiming,
        mut events: Vec<TriggerEvent>,
        scope: TriggerScope,
        body: TriggerBody,
    ) -> Trigger {
        events.sort();
        events.dedup();

        let kind = match &body {
            TriggerBody::Custom(text) => text.as_str(),
            TriggerBody::Audit { .. } => "AUDIT",
            TriggerBody::Relation { .. } => "RELATION",
        };
        let events_key: Vec<&str> = events.iter().map(|e| e.as_str()).collect();

        Trigger {
            name: name::object_name(
                name::TRIGGER_PREFIX,
                table,
                std::iter::once(kind).chain(events_key.iter().copied()),
            ),
            timing,
            events,
            scope,
            body,
        }
    }

    /// Splits a multi-event trigger into one trigger per event, for dialects
    /// that only accept a single event.
    pub fn split_events(&self, table: &str) -> Vec<Trigger> {
        if self.events.len() <= 1 {
            return vec![self.clone()];
        }
        self.events
            .iter()
            .map(|event| {
                Trigger::new(
                    table,
                    self.timing,
                    vec![*event],
                    self.scope,
                    self.body.clone(),
                )
            })
            .collect()
    }
}

impl TriggerEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

impl TriggerTiming {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        }
    }
}
