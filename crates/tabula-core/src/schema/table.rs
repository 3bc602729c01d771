use super::{
    db,
    descriptor::{ConstraintDescriptor, TableDescriptor},
    name, Check, DataType, Field, ForeignKey, Key, OnDelete, RelationTarget, State, Trigger,
    TriggerBody, TriggerEvent, TriggerScope, TriggerTiming,
};
use crate::{driver::Capability, driver::Dialect, Error, Result};

use indexmap::IndexMap;

pub const DEFAULT_ID_NAME: &str = "ID";
pub const DEFAULT_VERSION_NAME: &str = "Version";
pub const LOCALE_FIELD: &str = "Locale";

pub const AUDIT_TIME: &str = "Time";
pub const AUDIT_USER: &str = "UserId";
pub const AUDIT_MODE: &str = "Mode";
pub const AUDIT_RECORD: &str = "RecordId";
pub const AUDIT_FIELD: &str = "Field";
pub const AUDIT_VALUE: &str = "Value";

/// A logical table: the registry entry built from a [`TableDescriptor`].
///
/// Keys, foreign keys, checks and triggers listed here belong to the main
/// physical table. Satellite definitions are derived by
/// [`Table::db_tables`].
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,

    pub module: Option<String>,

    pub id_name: String,

    pub version_name: String,

    /// Fields in declaration order, keyed by lower-case name.
    fields: IndexMap<String, Field>,

    pub keys: Vec<Key>,

    pub foreign_keys: Vec<ForeignKey>,

    pub checks: Vec<Check>,

    pub triggers: Vec<Trigger>,

    states: Vec<State>,

    pub auditable: bool,

    /// Id field names of relation targets, keyed by lower-case table name.
    /// Filled in by the catalog once every table is known.
    relation_ids: IndexMap<String, String>,
}

/// Settings that shape the physical tables of a logical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalOptions {
    pub dialect: Dialect,

    /// Bitmask columns per state.
    pub state_columns: usize,

    /// Whether audit tables and triggers are maintained.
    pub audit: bool,
}

impl Table {
    /// Builds a table from its descriptor, resolving dialect specific text
    /// for `dialect`.
    pub fn from_descriptor(desc: &TableDescriptor, dialect: Dialect) -> Result<Table> {
        let name = desc.name.trim();

        if name.is_empty() {
            return Err(Error::schema_definition("<unnamed>", "table name is empty"));
        }
        if name::is_reserved_table_name(name) {
            return Err(Error::schema_definition(
                name,
                "table name ends with a reserved satellite suffix",
            ));
        }
        if desc.fields.is_empty() {
            return Err(Error::schema_definition(name, "table has no fields defined"));
        }

        let id_name = non_empty(desc.id_name.as_deref()).unwrap_or(DEFAULT_ID_NAME);
        let version_name = non_empty(desc.version_name.as_deref()).unwrap_or(DEFAULT_VERSION_NAME);

        if id_name.eq_ignore_ascii_case(version_name) {
            return Err(Error::schema_definition(
                name,
                "id and version fields share a name",
            ));
        }

        let mut table = Table {
            name: name.to_string(),
            module: desc.module.clone(),
            id_name: id_name.to_string(),
            version_name: version_name.to_string(),
            fields: IndexMap::new(),
            keys: vec![Key::primary(name, id_name)],
            foreign_keys: vec![],
            checks: vec![],
            triggers: vec![],
            states: vec![],
            auditable: desc.audit,
            relation_ids: IndexMap::new(),
        };

        for fd in &desc.fields {
            let field_name = fd.name.trim();

            if field_name.is_empty() {
                return Err(Error::schema_definition(name, "field name is empty"));
            }
            if table.is_id_or_version(field_name) {
                return Err(Error::schema_definition(
                    name,
                    format!("field name is reserved: {field_name}"),
                ));
            }
            if fd.extended && fd.translatable {
                return Err(Error::schema_definition(
                    name,
                    format!("field can not be both extended and translatable: {field_name}"),
                ));
            }

            let expression = fd
                .expression
                .as_ref()
                .and_then(|text| text.get(dialect))
                .map(str::to_string);

            let mut field = Field::new(field_name, fd.ty);
            field.precision = fd.precision;
            field.scale = fd.scale;
            field.not_null = fd.not_null;
            field.unique = fd.unique;
            field.relation = non_empty(fd.relation.as_deref()).map(str::to_string);
            field.on_delete = fd.cascade;
            field.editable = fd.editable && field.relation.is_some();
            field.extended = fd.extended;
            field.translatable = fd.translatable;
            field.auditable = fd.audit.unwrap_or(desc.audit) && expression.is_none();
            field.expression = expression;
            field.default = fd.default.clone();
            field.enum_key = fd.enum_key.clone();
            field.label = fd.label.clone();

            if field.ty.has_precision() && field.ty != DataType::Decimal && field.precision == Some(0) {
                return Err(Error::schema_definition(
                    name,
                    format!("string field needs a positive length: {field_name}"),
                ));
            }
            if field.is_computed() && (field.relation.is_some() || field.unique) {
                return Err(Error::schema_definition(
                    name,
                    format!("computed field can not carry keys: {field_name}"),
                ));
            }
            if field.translatable && (field.relation.is_some() || field.unique) {
                return Err(Error::schema_definition(
                    name,
                    format!("translatable field can not carry keys: {field_name}"),
                ));
            }

            let key = super::normalize(field_name);
            if table.fields.contains_key(&key) {
                return Err(Error::schema_definition(
                    name,
                    format!("duplicate field name: {field_name}"),
                ));
            }
            table.fields.insert(key, field);
        }

        // Field level keys of the main table. Extended fields get theirs in
        // the extension table definition.
        let owned: Vec<Field> = table
            .fields
            .values()
            .filter(|field| field.is_stored_in_owner())
            .cloned()
            .collect();

        for field in &owned {
            if field.unique {
                table.add_key(Key::unique(name, vec![field.name.clone()]))?;
            }
            if let Some(target) = &field.relation {
                table.foreign_keys.push(ForeignKey::new(
                    name,
                    vec![field.name.clone()],
                    target,
                    vec![],
                    field.on_delete,
                ));
                if !field.unique {
                    table.add_key(Key::index(name, vec![field.name.clone()]))?;
                }
            }
        }

        for index in &desc.indexes {
            let key = match index.expression.as_ref().and_then(|text| text.get(dialect)) {
                Some(expression) => Key::expression_index(name, expression.to_string(), index.unique),
                None => {
                    let fields = table.owner_fields(&index.fields, "index")?;
                    let mut key = Key::index(name, fields);
                    key.unique = index.unique;
                    key
                }
            };
            table.add_key(key)?;
        }

        for constraint in &desc.constraints {
            match constraint {
                ConstraintDescriptor::Check { expression } => {
                    if let Some(expression) = expression.get(dialect) {
                        let check = Check::new(name, expression);
                        if table.checks.iter().any(|c| c.name == check.name) {
                            return Err(Error::schema_definition(
                                name,
                                format!("duplicate check name: {}", check.name),
                            ));
                        }
                        table.checks.push(check);
                    }
                }
                ConstraintDescriptor::Unique { fields } => {
                    let fields = table.owner_fields(fields, "unique key")?;
                    table.add_key(Key::unique(name, fields))?;
                }
                ConstraintDescriptor::ForeignKey {
                    fields,
                    ref_table,
                    ref_fields,
                    cascade,
                } => {
                    let fields = table.owner_fields(fields, "foreign key")?;
                    let count_ok = if ref_fields.is_empty() {
                        fields.len() == 1
                    } else {
                        fields.len() == ref_fields.len()
                    };
                    if !count_ok {
                        return Err(Error::schema_definition(
                            name,
                            "foreign key field count doesn't match",
                        ));
                    }
                    let fk = ForeignKey::new(name, fields, ref_table, ref_fields.clone(), *cascade);
                    if table.foreign_keys.iter().any(|existing| existing.name == fk.name) {
                        return Err(Error::schema_definition(
                            name,
                            format!("duplicate foreign key name: {}", fk.name),
                        ));
                    }
                    table.foreign_keys.push(fk);
                }
            }
        }

        for trigger in &desc.triggers {
            if let Some(body) = trigger.body.get(dialect) {
                table.triggers.push(Trigger::new(
                    name,
                    trigger.timing,
                    trigger.events.clone(),
                    trigger.scope,
                    TriggerBody::Custom(body.to_string()),
                ));
            }
        }

        if let Some(targets) = table.relation_targets(&owned) {
            table.triggers.push(relation_trigger(name, targets));
        }

        for state in &desc.states {
            let state_name = state.name.trim();
            if state_name.is_empty() || !state_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(Error::schema_definition(
                    name,
                    format!("invalid state name: {state_name}"),
                ));
            }
            if table.state(state_name).is_some() {
                return Err(Error::schema_definition(
                    name,
                    format!("duplicate state: {state_name}"),
                ));
            }
            table.states.push(State {
                name: state_name.to_string(),
                ..state.clone()
            });
        }

        Ok(table)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(&super::normalize(name))
    }

    pub fn field_or_err(&self, name: &str) -> Result<&Field> {
        self.field(name)
            .ok_or_else(|| Error::unknown_field(&self.name, name))
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = &Field> + '_ {
        self.fields.values()
    }

    pub fn is_id_or_version(&self, name: &str) -> bool {
        self.id_name.eq_ignore_ascii_case(name) || self.version_name.eq_ignore_ascii_case(name)
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states
            .iter()
            .find(|state| state.name.eq_ignore_ascii_case(name))
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn has_states(&self) -> bool {
        !self.states.is_empty()
    }

    pub fn has_extension(&self) -> bool {
        self.fields().any(|field| field.extended && !field.is_computed())
    }

    pub fn has_translation(&self) -> bool {
        self.fields().any(|field| field.translatable && !field.is_computed())
    }

    pub fn is_audited(&self, options: &PhysicalOptions) -> bool {
        options.audit && self.fields().any(|field| field.auditable)
    }

    pub fn extension_name(&self) -> String {
        name::extension_table(&self.name)
    }

    pub fn translation_name(&self) -> String {
        name::translation_table(&self.name)
    }

    pub fn state_name(&self) -> String {
        name::state_table(&self.name)
    }

    pub fn audit_name(&self) -> String {
        name::audit_table(&self.name)
    }

    /// Column in the translation table pointing at the owner row.
    pub fn translation_owner_field(&self) -> String {
        name::translation_owner_field(&self.name)
    }

    /// Physical table holding `field`.
    pub fn storage_table(&self, field: &Field) -> String {
        if field.extended {
            self.extension_name()
        } else if field.translatable {
            self.translation_name()
        } else {
            self.name.clone()
        }
    }

    /// Names of all physical tables of this table, main table first.
    pub fn satellite_names(&self, options: &PhysicalOptions) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        if self.has_extension() {
            names.push(self.extension_name());
        }
        if self.has_translation() {
            names.push(self.translation_name());
        }
        if self.has_states() {
            names.push(self.state_name());
        }
        if self.is_audited(options) {
            names.push(self.audit_name());
        }
        names
    }

    /// Physical definitions: main table first, then extension, translation
    /// and state tables. The audit table is returned by
    /// [`Table::audit_table`].
    pub fn db_tables(&self, options: &PhysicalOptions) -> Vec<db::Table> {
        let mut tables = vec![self.main_table(options)];

        if self.has_extension() {
            tables.push(self.extension_table(options));
        }
        if self.has_translation() {
            tables.push(self.translation_table());
        }
        if self.has_states() {
            tables.push(self.state_table(options));
        }
        tables
    }

    pub fn audit_table(&self, options: &PhysicalOptions) -> Option<db::Table> {
        if !self.is_audited(options) {
            return None;
        }
        let name = self.audit_name();
        let mut table = db::Table::new(&name, &self.name, db::TableRole::Audit);
        table.columns = vec![
            db::Column::new(AUDIT_TIME, DataType::DateTime, true),
            db::Column::new(AUDIT_USER, DataType::Long, false),
            db::Column::new(AUDIT_MODE, DataType::String, true).with_precision(Some(1), None),
            db::Column::new(AUDIT_RECORD, DataType::Long, true),
            db::Column::new(AUDIT_FIELD, DataType::String, false).with_precision(Some(30), None),
            db::Column::new(AUDIT_VALUE, DataType::Text, false),
        ];
        table.add_key(Key::index(&name, vec![AUDIT_RECORD.to_string()]));
        Some(table)
    }

    fn main_table(&self, options: &PhysicalOptions) -> db::Table {
        let mut table = db::Table::new(&self.name, &self.name, db::TableRole::Main);
        table.columns.push(db::Column::new(&self.id_name, DataType::Long, true));
        table.columns.push(db::Column::new(&self.version_name, DataType::Long, true));
        table.columns.extend(
            self.fields()
                .filter(|field| field.is_stored_in_owner())
                .map(db::Column::from),
        );
        table.keys = self.keys.clone();
        table.foreign_keys = self.foreign_keys.clone();
        table.checks = self.checks.clone();
        table.triggers = self.triggers.clone();

        let audited: Vec<String> = self
            .fields()
            .filter(|field| field.is_stored_in_owner() && field.auditable)
            .map(|field| field.name.clone())
            .collect();
        if options.audit && !audited.is_empty() {
            table.triggers.push(self.audit_trigger(&self.name, &self.id_name, audited));
        }

        split_triggers(table, options)
    }

    fn extension_table(&self, options: &PhysicalOptions) -> db::Table {
        let name = self.extension_name();
        let mut table = db::Table::new(&name, &self.name, db::TableRole::Extension);
        self.add_owner_link(&mut table);
        table.columns.push(db::Column::new(&self.version_name, DataType::Long, true));

        let extended: Vec<&Field> = self
            .fields()
            .filter(|field| field.extended && !field.is_computed())
            .collect();

        for field in &extended {
            table.columns.push(db::Column::from(*field));

            if field.unique {
                table.add_key(Key::unique(&name, vec![field.name.clone()]));
            }
            if let Some(target) = &field.relation {
                table.foreign_keys.push(ForeignKey::new(
                    &name,
                    vec![field.name.clone()],
                    target,
                    vec![self.relation_id(target)],
                    field.on_delete,
                ));
                if !field.unique {
                    table.add_key(Key::index(&name, vec![field.name.clone()]));
                }
            }
        }

        let owned: Vec<Field> = extended.iter().map(|field| (*field).clone()).collect();
        if let Some(targets) = self.relation_targets(&owned) {
            table.triggers.push(relation_trigger(&name, targets));
        }

        let audited: Vec<String> = extended
            .iter()
            .filter(|field| field.auditable)
            .map(|field| field.name.clone())
            .collect();
        if options.audit && !audited.is_empty() {
            table.triggers.push(self.audit_trigger(&name, &self.id_name, audited));
        }

        split_triggers(table, options)
    }

    fn translation_table(&self) -> db::Table {
        let name = self.translation_name();
        let owner_field = self.translation_owner_field();

        let mut table = db::Table::new(&name, &self.name, db::TableRole::Translation);
        table.columns.push(db::Column::new(&self.id_name, DataType::Long, true));
        table.columns.push(db::Column::new(&owner_field, DataType::Long, true));
        table.columns.push(
            db::Column::new(LOCALE_FIELD, DataType::String, true).with_precision(Some(5), None),
        );
        table.columns.extend(
            self.fields()
                .filter(|field| field.translatable && !field.is_computed())
                .map(|field| {
                    let mut column = db::Column::from(field);
                    column.not_null = false;
                    column
                }),
        );
        table.keys.push(Key::primary(&name, &self.id_name));
        table.add_key(Key::unique(&name, vec![owner_field.clone(), LOCALE_FIELD.to_string()]));
        table.foreign_keys.push(ForeignKey::new(
            &name,
            vec![owner_field],
            &self.name,
            vec![self.id_name.clone()],
            Some(OnDelete::Cascade),
        ));
        table
    }

    fn state_table(&self, options: &PhysicalOptions) -> db::Table {
        let mut table = db::Table::new(self.state_name(), &self.name, db::TableRole::State);
        self.add_owner_link(&mut table);

        for state in &self.states {
            for column in state.columns(options.state_columns) {
                table.columns.push(db::Column::new(column, DataType::Long, false));
            }
        }
        table
    }

    /// Id column that is both primary key and a cascading reference to the
    /// owner row.
    fn add_owner_link(&self, table: &mut db::Table) {
        table.columns.push(db::Column::new(&self.id_name, DataType::Long, true));
        table.keys.push(Key::primary(&table.name, &self.id_name));
        table.foreign_keys.push(ForeignKey::new(
            &table.name,
            vec![self.id_name.clone()],
            &self.name,
            vec![self.id_name.clone()],
            Some(OnDelete::Cascade),
        ));
    }

    fn audit_trigger(&self, table: &str, id_name: &str, fields: Vec<String>) -> Trigger {
        Trigger::new(
            table,
            TriggerTiming::After,
            vec![TriggerEvent::Insert, TriggerEvent::Update, TriggerEvent::Delete],
            TriggerScope::Row,
            TriggerBody::Audit {
                audit_table: self.audit_name(),
                id_name: id_name.to_string(),
                fields,
            },
        )
    }

    /// Records the id field name of every relation target and rewrites the
    /// owned-relation triggers accordingly.
    pub fn resolve_relations(&mut self, id_name_of: impl Fn(&str) -> Option<String>) {
        let targets: Vec<String> = self
            .fields()
            .filter_map(|field| field.relation.clone())
            .chain(self.foreign_keys.iter().map(|fk| fk.ref_table.clone()))
            .collect();
        for target in targets {
            if let Some(id_name) = id_name_of(&target) {
                self.relation_ids.insert(super::normalize(&target), id_name);
            }
        }

        let relation_ids = self.relation_ids.clone();
        for fk in &mut self.foreign_keys {
            if fk.ref_fields.is_empty() {
                if let Some(id_name) = relation_ids.get(&super::normalize(&fk.ref_table)) {
                    fk.ref_fields = vec![id_name.clone()];
                }
            }
        }
        for trigger in &mut self.triggers {
            if let TriggerBody::Relation { targets } = &mut trigger.body {
                for target in targets {
                    if let Some(id_name) = relation_ids.get(&super::normalize(&target.table)) {
                        target.id_name = id_name.clone();
                    }
                }
            }
        }
    }

    fn relation_targets(&self, fields: &[Field]) -> Option<Vec<RelationTarget>> {
        let targets: Vec<RelationTarget> = fields
            .iter()
            .filter(|field| field.editable)
            .filter_map(|field| {
                field.relation.as_ref().map(|table| RelationTarget {
                    field: field.name.clone(),
                    table: table.clone(),
                    id_name: self.relation_id(table),
                })
            })
            .collect();
        (!targets.is_empty()).then_some(targets)
    }

    /// Id field name of a relation target, once resolved.
    fn relation_id(&self, table: &str) -> String {
        self.relation_ids
            .get(&super::normalize(table))
            .cloned()
            .unwrap_or_else(|| DEFAULT_ID_NAME.to_string())
    }

    fn add_key(&mut self, key: Key) -> Result<()> {
        if self.keys.iter().any(|existing| existing.name == key.name) {
            return Err(Error::schema_definition(
                &self.name,
                format!("duplicate key name: {}", key.name),
            ));
        }
        self.keys.push(key);
        Ok(())
    }

    /// Resolves key fields to declared names. Every field must be stored in
    /// the main table.
    fn owner_fields(&self, names: &[String], what: &str) -> Result<Vec<String>> {
        if names.is_empty() {
            return Err(Error::schema_definition(
                &self.name,
                format!("{what} has no fields"),
            ));
        }
        names
            .iter()
            .map(|name| {
                if self.is_id_or_version(name) {
                    let declared = if self.id_name.eq_ignore_ascii_case(name) {
                        &self.id_name
                    } else {
                        &self.version_name
                    };
                    return Ok(declared.clone());
                }
                match self.field(name) {
                    Some(field) if field.is_stored_in_owner() => Ok(field.name.clone()),
                    _ => Err(Error::schema_definition(
                        &self.name,
                        format!("unrecognized {what} field: {name}"),
                    )),
                }
            })
            .collect()
    }
}

fn relation_trigger(table: &str, targets: Vec<RelationTarget>) -> Trigger {
    Trigger::new(
        table,
        TriggerTiming::After,
        vec![TriggerEvent::Delete],
        TriggerScope::Row,
        TriggerBody::Relation { targets },
    )
}

fn split_triggers(mut table: db::Table, options: &PhysicalOptions) -> db::Table {
    if !Capability::for_dialect(options.dialect).multi_event_triggers {
        let name = table.name.clone();
        table.triggers = table
            .triggers
            .iter()
            .flat_map(|trigger| trigger.split_events(&name))
            .collect();
    }
    table
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::{FieldDescriptor, IndexDescriptor};
    use pretty_assertions::assert_eq;

    fn options() -> PhysicalOptions {
        PhysicalOptions {
            dialect: Dialect::Sqlite,
            state_columns: 2,
            audit: true,
        }
    }

    fn orders() -> TableDescriptor {
        TableDescriptor::new("Orders")
            .field(FieldDescriptor::new("Customer", DataType::Long).relation("Customers"))
            .field(FieldDescriptor::new("Status", DataType::Integer).not_null())
            .field(FieldDescriptor::new("Notes", DataType::String).precision(50).extended())
            .field(FieldDescriptor::new("Title", DataType::String).precision(80).translatable())
            .state(State::new("VIEW", true, true, false))
    }

    #[test]
    fn primary_key_on_id_always_exists() {
        let table = Table::from_descriptor(&orders(), Dialect::Sqlite).unwrap();
        let pk = table.keys.iter().find(|key| key.is_primary()).unwrap();
        assert_eq!(pk.fields, vec!["ID".to_string()]);
        assert_eq!(pk.name, name::object_name(name::PRIMARY_KEY_PREFIX, "Orders", ["ID"]));
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let desc = TableDescriptor::new("Orders")
            .field(FieldDescriptor::new("Status", DataType::Integer))
            .field(FieldDescriptor::new("status", DataType::Long));

        let err = Table::from_descriptor(&desc, Dialect::Sqlite).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid schema object Orders: duplicate field name: status"
        );
    }

    #[test]
    fn reserved_field_names_are_rejected() {
        let desc = TableDescriptor::new("Orders").field(FieldDescriptor::new("version", DataType::Long));
        assert!(Table::from_descriptor(&desc, Dialect::Sqlite).is_err());
    }

    #[test]
    fn unknown_index_field_is_rejected() {
        let mut desc = orders();
        desc.indexes.push(IndexDescriptor {
            fields: vec!["Missing".into()],
            unique: false,
            expression: None,
        });
        assert!(Table::from_descriptor(&desc, Dialect::Sqlite).is_err());
    }

    #[test]
    fn physical_tables() {
        let table = Table::from_descriptor(&orders(), Dialect::Sqlite).unwrap();
        let tables = table.db_tables(&options());

        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Orders", "Orders_EXT", "Orders_TRAN", "Orders_STATE"]);

        let main = &tables[0];
        let columns: Vec<&str> = main.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["ID", "Version", "Customer", "Status"]);
        assert_eq!(main.foreign_keys.len(), 1);
        assert_eq!(main.indexes().count(), 1);

        let ext = &tables[1];
        assert_eq!(ext.foreign_keys[0].ref_table, "Orders");
        assert_eq!(ext.foreign_keys[0].on_delete, Some(OnDelete::Cascade));
        assert!(ext.column("Notes").is_some());

        let tran = &tables[2];
        assert!(tran.column("OrdersID").is_some());
        assert!(tran.column("Locale").is_some());
        assert_eq!(tran.constraint_keys().count(), 2);

        let state = &tables[3];
        let columns: Vec<&str> = state.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["ID", "VIEW0", "VIEW1"]);
    }

    #[test]
    fn audit_triggers_split_per_event_on_sqlite() {
        let mut desc = orders();
        desc.audit = true;
        let table = Table::from_descriptor(&desc, Dialect::Sqlite).unwrap();

        let main = &table.db_tables(&options())[0];
        assert_eq!(main.triggers.len(), 3);
        assert!(main.triggers.iter().all(|t| t.events.len() == 1));

        let audit = table.audit_table(&options()).unwrap();
        assert_eq!(audit.name, "Orders_AUDIT");
        assert_eq!(audit.indexes().count(), 1);

        let pg = PhysicalOptions {
            dialect: Dialect::Postgresql,
            ..options()
        };
        assert_eq!(table.db_tables(&pg)[0].triggers.len(), 1);
    }

    #[test]
    fn owned_relation_gets_delete_trigger() {
        let mut desc = TableDescriptor::new("Orders");
        let mut field = FieldDescriptor::new("Address", DataType::Long).relation("Addresses");
        field.editable = true;
        desc.fields.push(field);

        let table = Table::from_descriptor(&desc, Dialect::Sqlite).unwrap();
        let trigger = &table.triggers[0];
        assert_eq!(trigger.events, vec![TriggerEvent::Delete]);
        assert!(matches!(&trigger.body, TriggerBody::Relation { targets } if targets[0].table == "Addresses"));
    }

    #[test]
    fn resolved_relations_fill_references() {
        let mut desc = TableDescriptor::new("Orders");
        let mut field = FieldDescriptor::new("Address", DataType::Long).relation("Addresses");
        field.editable = true;
        desc.fields.push(field);

        let mut table = Table::from_descriptor(&desc, Dialect::Sqlite).unwrap();
        assert!(table.foreign_keys[0].ref_fields.is_empty());

        table.resolve_relations(|name| (name == "Addresses").then(|| "AddressID".to_string()));
        assert_eq!(table.foreign_keys[0].ref_fields, vec!["AddressID".to_string()]);
        assert!(matches!(
            &table.triggers[0].body,
            TriggerBody::Relation { targets } if targets[0].id_name == "AddressID"
        ));
    }
}
