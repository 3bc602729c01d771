use super::{ty::CastType, Comma, Flavor, Formatter, Ident, Literal, Params, ToSql};

use crate::stmt::CreateTrigger;
use tabula_core::schema::{
    DataType, RelationTarget, Trigger, TriggerBody, TriggerEvent, TriggerScope, AUDIT_FIELD,
    AUDIT_MODE, AUDIT_RECORD, AUDIT_TIME, AUDIT_USER, AUDIT_VALUE,
};

impl ToSql for &CreateTrigger {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match f.serializer.flavor {
            Flavor::Sqlite | Flavor::Mysql => row_trigger(self, f),
            Flavor::Postgresql => pg_trigger(self, f),
            Flavor::Mssql => mssql_trigger(self, f),
        }
    }
}

/// SQLite and MySQL: `CREATE TRIGGER .. FOR EACH ROW BEGIN .. END`
fn row_trigger<P: Params>(stmt: &CreateTrigger, f: &mut Formatter<'_, P>) {
    let trigger = &stmt.trigger;
    let table = &stmt.table;
    let events = Events(trigger, " OR ");
    fmt!(f, "CREATE TRIGGER " Ident(&trigger.name) " " trigger.timing.as_str() " " events " ON " table);

    if trigger.scope == TriggerScope::Row || f.serializer.is_sqlite() {
        fmt!(f, " FOR EACH ROW");
    }
    fmt!(f, " BEGIN\n");

    match &trigger.body {
        TriggerBody::Custom(body) => fmt!(f, body.trim() "\n"),
        _ => {
            for event in &trigger.events {
                for stmt in body_statements(trigger, *event) {
                    fmt!(f, stmt ";\n");
                }
            }
        }
    }

    fmt!(f, "END");
}

/// PostgreSQL needs a trigger function next to the trigger itself.
fn pg_trigger<P: Params>(stmt: &CreateTrigger, f: &mut Formatter<'_, P>) {
    let trigger = &stmt.trigger;
    let table = &stmt.table;
    let function = Ident(&trigger.name);

    fmt!(f, "CREATE OR REPLACE FUNCTION " function "() RETURNS trigger AS $$\nBEGIN\n");

    match &trigger.body {
        TriggerBody::Custom(body) => fmt!(f, body.trim() "\n"),
        _ => {
            let guarded = trigger.events.len() > 1;

            for event in &trigger.events {
                if guarded {
                    fmt!(f, "IF TG_OP = " Literal(event.as_str()) " THEN\n");
                }
                for stmt in body_statements(trigger, *event) {
                    fmt!(f, stmt ";\n");
                }
                if guarded {
                    fmt!(f, "END IF;\n");
                }
            }
            fmt!(f, "RETURN NULL;\n");
        }
    }

    let scope = match trigger.scope {
        TriggerScope::Row => "ROW",
        TriggerScope::Statement => "STATEMENT",
    };
    let events = Events(trigger, " OR ");
    let function = Ident(&trigger.name);
    fmt!(
        f,
        "END;\n$$ LANGUAGE plpgsql;\nCREATE TRIGGER " Ident(&trigger.name) " "
        trigger.timing.as_str() " " events " ON " table
        " FOR EACH " scope " EXECUTE PROCEDURE " function "()"
    );
}

/// SQL Server triggers fire once per statement and read the `inserted` and
/// `deleted` pseudo tables.
fn mssql_trigger<P: Params>(stmt: &CreateTrigger, f: &mut Formatter<'_, P>) {
    let trigger = &stmt.trigger;
    let table = &stmt.table;
    let events = Events(trigger, ", ");
    fmt!(
        f,
        "CREATE TRIGGER " Ident(&trigger.name) " ON " table " "
        trigger.timing.as_str() " " events " AS\nBEGIN\nSET NOCOUNT ON;\n"
    );

    match &trigger.body {
        TriggerBody::Custom(body) => fmt!(f, body.trim() "\n"),
        _ => {
            for event in &trigger.events {
                for stmt in body_statements(trigger, *event) {
                    fmt!(f, stmt ";\n");
                }
            }
        }
    }

    fmt!(f, "END");
}

struct Events<'a>(&'a Trigger, &'static str);

impl ToSql for Events<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let mut s = "";
        for event in &self.0.events {
            fmt!(f, s event.as_str());
            s = self.1;
        }
    }
}

fn body_statements(trigger: &Trigger, event: TriggerEvent) -> Vec<BodyStatement<'_>> {
    match &trigger.body {
        TriggerBody::Audit {
            audit_table,
            id_name,
            fields,
        } => {
            let audit = |field| {
                BodyStatement::Audit(AuditRow {
                    audit_table,
                    id_name,
                    event,
                    field,
                })
            };
            match event {
                TriggerEvent::Delete => vec![audit(None)],
                _ => fields.iter().map(|field| audit(Some(field.as_str()))).collect(),
            }
        }
        TriggerBody::Relation { targets } if event == TriggerEvent::Delete => {
            targets.iter().map(BodyStatement::Relation).collect()
        }
        _ => vec![],
    }
}

enum BodyStatement<'a> {
    Audit(AuditRow<'a>),
    Relation(&'a RelationTarget),
}

impl ToSql for BodyStatement<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            BodyStatement::Audit(row) => row.to_sql(f),
            BodyStatement::Relation(target) => {
                fmt!(f, "DELETE FROM " Ident(&target.table) " WHERE " Ident(&target.id_name));
                if f.serializer.is_mssql() {
                    fmt!(f, " IN (SELECT " Ident(&target.field) " FROM deleted)");
                } else {
                    fmt!(f, " = " Old(&target.field));
                }
            }
        }
    }
}

/// One audit record. Inserts and updates write a record per field, deletes
/// write a single record without field and value.
struct AuditRow<'a> {
    audit_table: &'a str,
    id_name: &'a str,
    event: TriggerEvent,
    field: Option<&'a str>,
}

impl ToSql for AuditRow<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let columns = Comma(
            [AUDIT_TIME, AUDIT_USER, AUDIT_MODE, AUDIT_RECORD, AUDIT_FIELD, AUDIT_VALUE].map(Ident),
        );
        let mode = match self.event {
            TriggerEvent::Insert => "I",
            TriggerEvent::Update => "U",
            TriggerEvent::Delete => "D",
        };
        fmt!(f, "INSERT INTO " Ident(self.audit_table) " (" columns ") SELECT " Now ", NULL, " Literal(mode) ", ");

        if self.event == TriggerEvent::Delete {
            fmt!(f, Old(self.id_name) ", NULL, NULL");
        } else {
            fmt!(f, New(self.id_name) ", ");
            match self.field {
                Some(field) => {
                    let value = CastType {
                        ty: DataType::Text,
                        precision: None,
                        scale: None,
                    };
                    fmt!(f, Literal(field) ", CAST(" New(field) " AS " value ")");
                }
                None => fmt!(f, "NULL, NULL"),
            }
        }

        let mssql = f.serializer.is_mssql();
        match self.event {
            TriggerEvent::Insert if mssql => {
                fmt!(f, " FROM inserted i WHERE NOT EXISTS (SELECT 1 FROM deleted)");
                if let Some(field) = self.field {
                    fmt!(f, " AND " New(field) " IS NOT NULL");
                }
            }
            TriggerEvent::Update if mssql => {
                let id = Ident(self.id_name);
                let id_new = New(self.id_name);
                fmt!(f, " FROM inserted i INNER JOIN deleted d ON d." id " = " id_new);
                if let Some(field) = self.field {
                    fmt!(f, " WHERE " Changed(field));
                }
            }
            TriggerEvent::Delete if mssql => {
                fmt!(f, " FROM deleted d WHERE NOT EXISTS (SELECT 1 FROM inserted)");
            }
            TriggerEvent::Insert => {
                fmt!(f, FromDual);
                if let Some(field) = self.field {
                    fmt!(f, " WHERE " New(field) " IS NOT NULL");
                }
            }
            TriggerEvent::Update => {
                fmt!(f, FromDual);
                if let Some(field) = self.field {
                    fmt!(f, " WHERE " Changed(field));
                }
            }
            TriggerEvent::Delete => fmt!(f, FromDual),
        }
    }
}

/// Current time in epoch milliseconds.
struct Now;

impl ToSql for Now {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let sql = match f.serializer.flavor {
            Flavor::Sqlite => "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)",
            Flavor::Postgresql => "CAST(EXTRACT(EPOCH FROM CURRENT_TIMESTAMP) * 1000 AS BIGINT)",
            Flavor::Mysql => "CAST(UNIX_TIMESTAMP(NOW(3)) * 1000 AS SIGNED)",
            Flavor::Mssql => "DATEDIFF_BIG(ms, '1970-01-01', GETUTCDATE())",
        };
        fmt!(f, sql);
    }
}

/// MySQL cannot filter a table-less SELECT.
struct FromDual;

impl ToSql for FromDual {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        if f.serializer.flavor == Flavor::Mysql {
            fmt!(f, " FROM DUAL");
        }
    }
}

/// Column of the row after the change.
struct New<'a>(&'a str);

impl ToSql for New<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let prefix = if f.serializer.is_mssql() { "i." } else { "NEW." };
        fmt!(f, prefix Ident(self.0));
    }
}

/// Column of the row before the change.
struct Old<'a>(&'a str);

impl ToSql for Old<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let prefix = if f.serializer.is_mssql() { "d." } else { "OLD." };
        fmt!(f, prefix Ident(self.0));
    }
}

/// Null-safe inequality of a column before and after the change.
struct Changed<'a>(&'a str);

impl ToSql for Changed<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let (new, old) = (New(self.0), Old(self.0));
        match f.serializer.flavor {
            Flavor::Sqlite => fmt!(f, new " IS NOT " old),
            Flavor::Postgresql => fmt!(f, new " IS DISTINCT FROM " old),
            Flavor::Mysql => fmt!(f, "NOT (" new " <=> " old ")"),
            Flavor::Mssql => {
                let (new2, old2) = (New(self.0), Old(self.0));
                let (new3, old3) = (New(self.0), Old(self.0));
                fmt!(
                    f,
                    "(" new " <> " old " OR (" new2 " IS NULL AND " old2 " IS NOT NULL) OR ("
                    new3 " IS NOT NULL AND " old3 " IS NULL))"
                );
            }
        }
    }
}
