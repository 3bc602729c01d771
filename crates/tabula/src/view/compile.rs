use super::{expr, Order, View, ViewColumn};
use crate::{catalog::SchemaCatalog, Result};

use indexmap::IndexMap;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tabula_core::{
    schema::{
        descriptor::{ColumnDescriptor, ViewDescriptor},
        normalize, DataType, Field, Table, LOCALE_FIELD,
    },
    stmt::{Aggregate, Expr, JoinKind, Select},
    Error, Filter,
};

/// Compiles a [`ViewDescriptor`] against the registered tables.
///
/// Columns are compiled in declaration order. Expression columns are
/// compiled on first use, so they may refer to columns declared after
/// them; a reference chain that loops back onto itself is an error.
pub struct ViewCompiler<'a> {
    pub(super) catalog: &'a SchemaCatalog,
    pub(super) desc: &'a ViewDescriptor,
    source: Arc<Table>,
    select: Select,

    /// Compiled columns, keyed by normalized name.
    pub(super) columns: HashMap<String, ViewColumn>,

    /// Column keys in declaration order.
    declared: Vec<String>,

    /// Every name the descriptor declares, synthetic names avoid these.
    reserved: HashSet<String>,

    /// Expression columns not compiled yet.
    pub(super) pending: HashMap<String, Pending<'a>>,

    /// Expression columns being compiled, innermost last.
    pub(super) visiting: Vec<String>,

    aliases: usize,
}

/// The table a group of column descriptors reads from.
#[derive(Debug, Clone)]
pub(super) struct Scope {
    pub(super) table: Arc<Table>,
    pub(super) alias: String,
    pub(super) level: i32,
    pub(super) parent: Option<String>,

    /// Reached through a join, so every value may be missing.
    pub(super) outer: bool,
}

pub(super) struct Pending<'a> {
    pub(super) desc: &'a ColumnDescriptor,
    pub(super) scope: Scope,
}

impl<'a> ViewCompiler<'a> {
    pub fn compile(catalog: &'a SchemaCatalog, desc: &'a ViewDescriptor) -> Result<View> {
        let name = desc.name.trim();
        if name.is_empty() {
            return Err(Error::schema_definition("<unnamed>", "view name is empty"));
        }

        let source = catalog.table(&desc.source).cloned().ok_or_else(|| {
            Error::schema_definition(name, format!("unknown source table {}", desc.source))
        })?;

        let mut reserved = HashSet::new();
        collect_names(&desc.columns, &mut reserved);

        let mut compiler = ViewCompiler {
            catalog,
            desc,
            source: source.clone(),
            select: Select::new(),
            columns: HashMap::new(),
            declared: vec![],
            reserved,
            pending: HashMap::new(),
            visiting: vec![],
            aliases: 0,
        };
        compiler.select.add_from(&source.name, None);

        let root = Scope {
            alias: source.name.clone(),
            table: source,
            level: 0,
            parent: None,
            outer: false,
        };
        compiler.walk(&desc.columns, &root)?;

        let pending: Vec<String> = compiler
            .declared
            .iter()
            .filter(|key| compiler.pending.contains_key(*key))
            .cloned()
            .collect();
        for key in pending {
            compiler.compile_pending(&key)?;
        }

        compiler.finish()
    }

    pub(super) fn error(&self, message: impl Into<String>) -> Error {
        Error::schema_definition(self.desc.name.trim(), message)
    }

    fn walk(&mut self, columns: &'a [ColumnDescriptor], scope: &Scope) -> Result<()> {
        for column in columns {
            match column {
                ColumnDescriptor::Simple {
                    name,
                    source,
                    locale,
                    aggregate,
                    hidden,
                    label,
                    editable,
                } => {
                    let key = self.declare(name)?;
                    let field = scope.table.field(source).cloned().ok_or_else(|| {
                        self.error(format!("unknown field {}.{source}", scope.table.name))
                    })?;
                    let locale = locale.as_deref().map(str::trim).filter(|l| !l.is_empty());

                    let base = self.field_expr(scope, &field, locale)?;
                    let alias = match base.as_field() {
                        Some(f) if !field.is_computed() => {
                            f.source.clone().unwrap_or_else(|| scope.alias.clone())
                        }
                        _ => scope.alias.clone(),
                    };
                    let (expr, ty) = apply_aggregate(base, *aggregate, field.ty);

                    let column = ViewColumn {
                        name: name.trim().to_string(),
                        label: label.clone().or_else(|| field.label.clone()),
                        expr,
                        aggregate: *aggregate,
                        ty,
                        precision: field.precision,
                        scale: field.scale,
                        nullable: !field.not_null
                            || scope.outer
                            || field.extended
                            || field.translatable,
                        hidden: *hidden,
                        computed: field.is_computed(),
                        read_only: false,
                        editable: false,
                        level: scope.level,
                        parent: scope.parent.clone(),
                        table: scope.table.name.clone(),
                        field: Some(field.name.clone()),
                        alias,
                        locale: locale.map(str::to_string),
                        default: field.default.clone(),
                        enum_key: field.enum_key.clone(),
                    };
                    self.columns.insert(key, settle(column, *editable));
                }
                ColumnDescriptor::Join {
                    name,
                    source,
                    join_type,
                    hidden,
                    label,
                    editable,
                    columns,
                } => {
                    self.join(scope, name.as_deref(), source, *join_type, *hidden, label, *editable, columns)?;
                }
                ColumnDescriptor::ExternalJoin {
                    table,
                    source,
                    join_type,
                    columns,
                } => {
                    self.external_join(scope, table, source, *join_type, columns)?;
                }
                ColumnDescriptor::Id {
                    name,
                    aggregate,
                    hidden,
                    label,
                } => {
                    let key = self.declare(name)?;
                    let base = Expr::field(&scope.alias, &scope.table.id_name);
                    let (expr, ty) = apply_aggregate(base, *aggregate, DataType::Long);

                    let column = ViewColumn {
                        name: name.trim().to_string(),
                        label: label.clone(),
                        expr,
                        aggregate: *aggregate,
                        ty,
                        precision: None,
                        scale: None,
                        nullable: scope.outer,
                        hidden: *hidden,
                        computed: false,
                        read_only: false,
                        editable: false,
                        level: scope.level,
                        parent: scope.parent.clone(),
                        table: scope.table.name.clone(),
                        field: Some(scope.table.id_name.clone()),
                        alias: scope.alias.clone(),
                        locale: None,
                        default: None,
                        enum_key: None,
                    };
                    self.columns.insert(key, settle(column, Some(false)));
                }
                ColumnDescriptor::Expression { name, .. } => {
                    let key = self.declare(name)?;
                    self.pending.insert(
                        key,
                        Pending {
                            desc: column,
                            scope: scope.clone(),
                        },
                    );
                }
                ColumnDescriptor::Aggregate {
                    name,
                    aggregate,
                    label,
                } => {
                    if *aggregate != Aggregate::Count {
                        return Err(self.error(format!(
                            "aggregate column {} supports COUNT only",
                            name.trim()
                        )));
                    }
                    let key = self.declare(name)?;

                    let column = ViewColumn {
                        name: name.trim().to_string(),
                        label: label.clone(),
                        expr: Expr::count_all(),
                        aggregate: Some(Aggregate::Count),
                        ty: DataType::Long,
                        precision: None,
                        scale: None,
                        nullable: false,
                        hidden: false,
                        computed: false,
                        read_only: false,
                        editable: false,
                        level: scope.level,
                        parent: scope.parent.clone(),
                        table: scope.table.name.clone(),
                        field: None,
                        alias: scope.alias.clone(),
                        locale: None,
                        default: None,
                        enum_key: None,
                    };
                    self.columns.insert(key, settle(column, None));
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn join(
        &mut self,
        scope: &Scope,
        name: Option<&str>,
        source: &str,
        join_type: JoinKind,
        hidden: bool,
        label: &Option<String>,
        editable: Option<bool>,
        columns: &'a [ColumnDescriptor],
    ) -> Result<()> {
        let field = scope.table.field(source).cloned().ok_or_else(|| {
            self.error(format!("unknown field {}.{source}", scope.table.name))
        })?;
        let Some(relation) = field.relation.as_deref() else {
            return Err(self.error(format!(
                "field {}.{} is not a relation",
                scope.table.name, field.name
            )));
        };
        if field.is_computed() || field.translatable {
            return Err(self.error(format!(
                "relation {}.{} can not be joined",
                scope.table.name, field.name
            )));
        }
        let target = self.catalog.table(relation).cloned().ok_or_else(|| {
            self.error(format!("unknown relation target {relation}"))
        })?;

        let fk = self.field_expr(scope, &field, None)?;
        let alias = self.next_alias(&target.name);
        let on = Expr::eq(fk.clone(), Expr::field(&alias, &target.id_name));
        let key = format!("{} {}={}", target.name, expr_key(&fk), target.id_name);
        let alias = self.select.add_join(join_type, &target.name, alias, on, key);

        let (column_name, hidden) = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => (name.to_string(), hidden),
            None => (self.synthetic_name(&scope.alias, &field.name), true),
        };
        let key = self.declare(&column_name)?;

        let column = ViewColumn {
            name: column_name.clone(),
            label: label.clone().or_else(|| field.label.clone()),
            alias: fk
                .as_field()
                .and_then(|f| f.source.clone())
                .unwrap_or_else(|| scope.alias.clone()),
            expr: fk,
            aggregate: None,
            ty: field.ty,
            precision: field.precision,
            scale: field.scale,
            nullable: !field.not_null || scope.outer || field.extended,
            hidden,
            computed: false,
            read_only: false,
            editable: false,
            level: scope.level,
            parent: scope.parent.clone(),
            table: scope.table.name.clone(),
            field: Some(field.name.clone()),
            locale: None,
            default: field.default.clone(),
            enum_key: field.enum_key.clone(),
        };
        self.columns.insert(key, settle(column, editable));

        let child = Scope {
            table: target,
            alias,
            level: scope.level + if field.editable { 0 } else { 1 },
            parent: Some(column_name),
            outer: true,
        };
        self.walk(columns, &child)
    }

    fn external_join(
        &mut self,
        scope: &Scope,
        table: &str,
        source: &str,
        join_type: JoinKind,
        columns: &'a [ColumnDescriptor],
    ) -> Result<()> {
        let table = self
            .catalog
            .table(table)
            .cloned()
            .ok_or_else(|| self.error(format!("unknown joined table {table}")))?;
        let field = table
            .field(source)
            .cloned()
            .ok_or_else(|| self.error(format!("unknown field {}.{source}", table.name)))?;

        let refers_back = field
            .relation
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(&scope.table.name));
        if !refers_back {
            return Err(self.error(format!(
                "field {}.{} does not refer to {}",
                table.name, field.name, scope.table.name
            )));
        }
        if field.extended {
            tracing::warn!(
                view = %self.desc.name,
                table = %table.name,
                field = %field.name,
                "skipping inverse join on an extended field"
            );
            return Ok(());
        }

        let alias = self.next_alias(&table.name);
        let on = Expr::eq(
            Expr::field(&alias, &field.name),
            Expr::field(&scope.alias, &scope.table.id_name),
        );
        let key = format!(
            "{} {}.{}={}",
            table.name, scope.alias, scope.table.id_name, field.name
        );
        let alias = self.select.add_join(join_type, &table.name, alias, on, key);

        let child = Scope {
            table,
            alias,
            level: scope.level + 1,
            parent: scope.parent.clone(),
            outer: true,
        };
        self.walk(columns, &child)
    }

    /// Expression reading `field` of the scope table, joining the satellite
    /// that stores it when needed.
    pub(super) fn field_expr(&mut self, scope: &Scope, field: &Field, locale: Option<&str>) -> Result<Expr> {
        if let Some(text) = &field.expression {
            return expr::parse_macro(text, &mut |name| self.scope_field(scope, name, locale));
        }

        let table = &scope.table;
        let alias = if field.extended {
            let ext = table.extension_name();
            let alias = self.next_alias(&ext);
            let on = Expr::eq(
                Expr::field(&alias, &table.id_name),
                Expr::field(&scope.alias, &table.id_name),
            );
            let key = format!("{ext} {}.{}", scope.alias, table.id_name);
            self.select.add_join(JoinKind::Left, ext, alias, on, key)
        } else if field.translatable {
            let Some(locale) = locale else {
                return Err(self.error(format!(
                    "translatable field {}.{} needs a locale",
                    table.name, field.name
                )));
            };
            let tran = table.translation_name();
            let owner = table.translation_owner_field();
            let alias = self.next_alias(&tran);
            let on = Expr::and_from_vec(vec![
                Expr::eq(
                    Expr::field(&alias, &owner),
                    Expr::field(&scope.alias, &table.id_name),
                ),
                Expr::eq(Expr::field(&alias, LOCALE_FIELD), Expr::value(locale)),
            ]);
            let key = format!("{tran} {}.{} {locale}", scope.alias, table.id_name);
            self.select.add_join(JoinKind::Left, tran, alias, on, key)
        } else {
            scope.alias.clone()
        };

        Ok(Expr::field(alias, &field.name))
    }

    /// A stored field, the id or the version of the scope table.
    pub(super) fn scope_field(&mut self, scope: &Scope, name: &str, locale: Option<&str>) -> Result<Option<Expr>> {
        let table = scope.table.clone();
        if table.id_name.eq_ignore_ascii_case(name) {
            return Ok(Some(Expr::field(&scope.alias, &table.id_name)));
        }
        if table.version_name.eq_ignore_ascii_case(name) {
            return Ok(Some(Expr::field(&scope.alias, &table.version_name)));
        }
        match table.field(name) {
            Some(field) if !field.is_computed() => self.field_expr(scope, field, locale).map(Some),
            _ => Ok(None),
        }
    }

    fn declare(&mut self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.error("column name is empty"));
        }
        if self.source.is_id_or_version(name) {
            return Err(self.error(format!("column name is reserved: {name}")));
        }
        let key = normalize(name);
        if self.declared.contains(&key) {
            return Err(self.error(format!("duplicate column {name}")));
        }
        self.declared.push(key.clone());
        Ok(key)
    }

    fn synthetic_name(&self, alias: &str, field: &str) -> String {
        let base = format!("{alias}_{field}");
        let mut candidate = base.clone();
        let mut n = 1;
        loop {
            let key = normalize(&candidate);
            if !self.reserved.contains(&key) && !self.declared.contains(&key) {
                return candidate;
            }
            n += 1;
            candidate = format!("{base}{n}");
        }
    }

    fn next_alias(&mut self, base: &str) -> String {
        self.aliases += 1;
        format!("{base}_{}", self.aliases)
    }

    fn finish(mut self) -> Result<View> {
        let desc = self.desc;
        let name = desc.name.trim().to_string();

        let mut columns = IndexMap::with_capacity(self.declared.len());
        for key in &self.declared {
            if let Some(column) = self.columns.remove(key) {
                columns.insert(key.clone(), column);
            }
        }

        let mut group_by = vec![];
        for column_name in &desc.group_by {
            let column: &ViewColumn = columns
                .get(&normalize(column_name))
                .ok_or_else(|| self.error(format!("unknown grouping column {column_name}")))?;
            if column.is_aggregate() {
                return Err(self.error(format!(
                    "can not group by aggregate column {}",
                    column.name
                )));
            }
            self.select.add_group(column.expr.clone());
            group_by.push(column.name.clone());
        }

        let has_aggregate = columns.values().any(ViewColumn::is_aggregate);
        let grouped = has_aggregate || !group_by.is_empty();
        if grouped {
            if group_by.is_empty() {
                self.select
                    .add_group(Expr::field(&self.source.name, &self.source.id_name));
                self.select
                    .add_group(Expr::field(&self.source.name, &self.source.version_name));
            }
            for column in columns.values() {
                if !column.hidden && !column.is_aggregate() && !column.computed {
                    self.select.add_group(column.expr.clone());
                }
            }
        }

        let filter = match desc.filter.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let names: Vec<&str> = columns.values().map(|c| c.name.as_str()).collect();
                let filter = Filter::parse(text, &names, &self.source.id_name, &self.source.version_name)
                    .map_err(|err| self.error(format!("invalid filter: {err}")))?;
                Some(filter)
            }
            _ => None,
        };

        let mut order = vec![];
        for item in &desc.order {
            let known = self.source.is_id_or_version(&item.column)
                || columns.contains_key(&normalize(&item.column));
            if !known {
                return Err(self.error(format!("unknown order column {}", item.column)));
            }
            order.push(Order {
                column: item.column.trim().to_string(),
                desc: item.desc,
            });
        }

        let read_only = desc.read_only || !group_by.is_empty();
        Ok(View {
            name,
            module: desc.module.clone(),
            source: self.source.name.clone(),
            source_alias: self.source.name.clone(),
            id_name: self.source.id_name.clone(),
            version_name: self.source.version_name.clone(),
            columns,
            group_by,
            filter,
            order,
            read_only,
            cache: desc.cache.clone(),
            edit_form: desc.edit_form.clone(),
            new_row_form: desc.new_row_form.clone(),
            base: self.select,
            grouped,
        })
    }
}

/// Fills in the derived access flags.
pub(super) fn settle(mut column: ViewColumn, editable: Option<bool>) -> ViewColumn {
    column.read_only = column.hidden || column.aggregate.is_some() || column.computed;
    column.editable = editable.unwrap_or(!column.read_only && column.level <= 0);
    column
}

pub(super) fn apply_aggregate(expr: Expr, aggregate: Option<Aggregate>, ty: DataType) -> (Expr, DataType) {
    match aggregate {
        None => (expr, ty),
        Some(func) => {
            let ty = match func {
                Aggregate::Count => DataType::Long,
                Aggregate::Avg => DataType::Double,
                Aggregate::Sum | Aggregate::Min | Aggregate::Max => ty,
            };
            (Expr::aggregate(func, expr), ty)
        }
    }
}

fn expr_key(expr: &Expr) -> String {
    match expr.as_field() {
        Some(field) => format!(
            "{}.{}",
            field.source.as_deref().unwrap_or_default(),
            field.name
        ),
        None => format!("{expr:?}"),
    }
}

fn collect_names(columns: &[ColumnDescriptor], dst: &mut HashSet<String>) {
    for column in columns {
        match column {
            ColumnDescriptor::Simple { name, .. }
            | ColumnDescriptor::Id { name, .. }
            | ColumnDescriptor::Expression { name, .. }
            | ColumnDescriptor::Aggregate { name, .. } => {
                dst.insert(normalize(name));
            }
            ColumnDescriptor::Join { name, columns, .. } => {
                if let Some(name) = name {
                    dst.insert(normalize(name));
                }
                collect_names(columns, dst);
            }
            ColumnDescriptor::ExternalJoin { columns, .. } => collect_names(columns, dst),
        }
    }
}
