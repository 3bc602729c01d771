use super::{Order, View};
use crate::{catalog::ViewFinder, Result};

use tabula_core::{
    stmt::{Aggregate, Expr, Select},
    Filter,
};

impl View {
    /// Builds the `SELECT` returning `columns` (every visible column when
    /// `None`) for the rows matching both the view filter and `filter`.
    ///
    /// The row id and version come first, aliased by their names. A view
    /// with explicit grouping has no single row behind a result row, so it
    /// returns `MIN(id)` and no version.
    pub fn query(
        &self,
        filter: Option<&Filter>,
        order: &[Order],
        columns: Option<&[String]>,
        finder: &dyn ViewFinder,
    ) -> Result<Select> {
        let mut select = self.base.clone();
        let active = self.active_columns(columns)?;
        let explicit = self.has_explicit_grouping();

        if explicit {
            select.add_field(
                Expr::aggregate(Aggregate::Min, self.source_id()),
                Some(self.id_name.clone()),
            );
        } else {
            select.add_field(self.source_id(), Some(self.id_name.clone()));
            select.add_field(self.source_version(), Some(self.version_name.clone()));
        }
        for column in &active {
            select.add_field(column.expr.clone(), Some(column.name.clone()));
        }

        if let Some(filter) = Filter::and_opt(self.filter.clone(), filter.cloned()) {
            self.apply_filter(&mut select, &filter, finder)?;
        }

        let order = if order.is_empty() { &self.order[..] } else { order };
        let mut id_used = false;

        for item in order {
            if item.column.eq_ignore_ascii_case(&self.id_name) {
                let expr = if explicit {
                    Expr::name(&self.id_name)
                } else {
                    self.source_id()
                };
                select.add_order(expr, item.desc);
                id_used = true;
                continue;
            }
            if item.column.eq_ignore_ascii_case(&self.version_name) {
                if explicit {
                    tracing::warn!(view = %self.name, "ignoring order on version of a grouped view");
                } else {
                    select.add_order(self.source_version(), item.desc);
                }
                continue;
            }

            let Some(column) = self.column(&item.column) else {
                tracing::warn!(view = %self.name, column = %item.column, "ignoring order on unknown column");
                continue;
            };

            if column.is_aggregate() || column.computed {
                let selected = active.iter().any(|c| c.name == column.name);
                if column.hidden || !selected {
                    tracing::warn!(
                        view = %self.name,
                        column = %column.name,
                        "ignoring order on a computed column that is not selected"
                    );
                    continue;
                }
                select.add_order(Expr::name(&column.name), item.desc);
            } else {
                select.add_order(column.expr.clone(), item.desc);
            }
        }

        if explicit {
            if !id_used {
                select.add_order(Expr::name(&self.id_name), false);
            }
        } else if !id_used {
            select.add_order(self.source_id(), false);
        }

        Ok(select)
    }

    /// Adds the condition for `filter`. Conditions over aggregates go to
    /// `HAVING`, grouping the hidden columns they read; everything else goes
    /// to `WHERE`.
    pub(crate) fn apply_filter(&self, select: &mut Select, filter: &Filter, finder: &dyn ViewFinder) -> Result<()> {
        let Some(cond) = self.condition(filter, finder)? else {
            return Ok(());
        };

        let on_aggregate = self.grouped
            && self
                .columns()
                .any(|column| column.is_aggregate() && filter.involves_column(&column.name));

        if on_aggregate {
            for column in self.columns() {
                if column.hidden
                    && !column.computed
                    && !column.is_aggregate()
                    && filter.involves_column(&column.name)
                {
                    select.add_group(column.expr.clone());
                }
            }
            select.having = Expr::and_opt(select.having.take(), Some(cond));
        } else {
            select.and_filter(cond);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        catalog::SchemaCatalog,
        view::{Order, View, ViewCompiler},
    };

    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tabula_core::{
        driver::Dialect,
        filter::Operator,
        schema::{
            descriptor::{
                ColumnDescriptor, ExpressionDescriptor, FieldDescriptor, TableDescriptor,
                ViewDescriptor,
            },
            DataType, Table,
        },
        stmt::{Aggregate, Expr, JoinKind, Statement, Value},
        Filter,
    };
    use tabula_sql::Serializer;

    fn catalog() -> SchemaCatalog {
        let customers = TableDescriptor::new("Customers")
            .field(FieldDescriptor::new("Name", DataType::String).precision(40).not_null())
            .field(FieldDescriptor::new("Notes", DataType::Text).extended())
            .field(FieldDescriptor::new("Title", DataType::String).precision(40).translatable());
        let orders = TableDescriptor::new("Orders")
            .field(FieldDescriptor::new("Customer", DataType::Long).relation("Customers"))
            .field(FieldDescriptor::new("Total", DataType::Decimal).precision(12).scale(2))
            .field(FieldDescriptor::new("Status", DataType::Integer));

        let mut catalog = SchemaCatalog::new();
        for desc in [customers, orders] {
            catalog.add_table(Table::from_descriptor(&desc, Dialect::Sqlite).unwrap());
        }
        catalog
    }

    fn compile(catalog: &SchemaCatalog, desc: &ViewDescriptor) -> View {
        ViewCompiler::compile(catalog, desc).unwrap()
    }

    fn sql(select: tabula_core::stmt::Select) -> String {
        let mut params = vec![];
        Serializer::sqlite().serialize(&Statement::Query(select).into(), &mut params)
    }

    fn join(source: &str, columns: Vec<ColumnDescriptor>) -> ColumnDescriptor {
        ColumnDescriptor::Join {
            name: None,
            source: source.into(),
            join_type: JoinKind::Left,
            hidden: false,
            label: None,
            editable: None,
            columns,
        }
    }

    fn customer_total() -> ViewDescriptor {
        ViewDescriptor::new("CustomerTotals", "Orders")
            .column(join(
                "Customer",
                vec![ColumnDescriptor::simple("CustomerName", "Name")],
            ))
            .column(ColumnDescriptor::Simple {
                name: "Sum".into(),
                source: "Total".into(),
                locale: None,
                aggregate: Some(Aggregate::Sum),
                hidden: false,
                label: None,
                editable: None,
            })
            .column(ColumnDescriptor::simple("Status", "Status"))
    }

    #[test]
    fn join_columns_read_the_target() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("OrderView", "Orders")
            .column(ColumnDescriptor::simple("Total", "Total"))
            .column(join(
                "Customer",
                vec![ColumnDescriptor::simple("CustomerName", "Name")],
            ));
        let view = compile(&catalog, &desc);

        let name = view.column("customername").unwrap();
        assert_eq!(name.table, "Customers");
        assert_eq!(name.level, 1);
        assert!(!name.editable);
        assert!(name.nullable);

        // The synthetic join column is hidden and carries the parent link
        let link = view.column("Orders_Customer").unwrap();
        assert!(link.hidden);
        assert_eq!(name.parent.as_deref(), Some("Orders_Customer"));

        assert!(view.column("Total").unwrap().editable);
        assert_eq!(view.visible_columns().count(), 2);
        assert_eq!(view.base.join_count(), 1);
    }

    #[test]
    fn satellite_fields_join_their_table() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("CustomerView", "Customers")
            .column(ColumnDescriptor::simple("Notes", "Notes"))
            .column(ColumnDescriptor::Simple {
                name: "TitleDe".into(),
                source: "Title".into(),
                locale: Some("de".into()),
                aggregate: None,
                hidden: false,
                label: None,
                editable: None,
            });
        let view = compile(&catalog, &desc);
        let text = sql(view.query(None, &[], None, &catalog).unwrap());

        assert!(text.contains(r#"LEFT JOIN "Customers_EXT""#), "{text}");
        assert!(text.contains(r#"LEFT JOIN "Customers_TRAN""#), "{text}");
        assert_eq!(view.column("TitleDe").unwrap().locale.as_deref(), Some("de"));
    }

    #[test]
    fn translatable_field_without_locale_is_rejected() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("CustomerView", "Customers")
            .column(ColumnDescriptor::simple("Title", "Title"));
        let err = ViewCompiler::compile(&catalog, &desc).unwrap_err();
        assert!(err.is_schema_definition());
    }

    #[test]
    fn aggregate_view_groups_by_id_and_plain_columns() {
        let catalog = catalog();
        let view = compile(&catalog, &customer_total());

        assert!(view.is_grouped());
        assert!(!view.read_only);
        assert_eq!(
            view.base.group_by,
            vec![
                Expr::field("Orders", "ID"),
                Expr::field("Orders", "Version"),
                view.column("CustomerName").unwrap().expr.clone(),
                view.column("Status").unwrap().expr.clone(),
            ]
        );
    }

    #[test]
    fn explicit_grouping_selects_min_id() {
        let catalog = catalog();
        let mut desc = customer_total();
        desc.group_by = vec!["CustomerName".into()];
        let view = compile(&catalog, &desc);
        assert!(view.read_only);

        let select = view.query(None, &[], None, &catalog).unwrap();
        assert_eq!(
            select.fields[0].expr,
            Expr::aggregate(Aggregate::Min, Expr::field("Orders", "ID"))
        );
        assert_eq!(select.order_by.last().unwrap().expr, Expr::name("ID"));
        assert!(!select.group_by.contains(&Expr::field("Orders", "ID")));
    }

    #[test]
    fn aggregate_filters_go_to_having() {
        let catalog = catalog();
        let view = compile(&catalog, &customer_total());

        let filter = Filter::compare("Sum", Operator::Gt, 100);
        let select = view.query(Some(&filter), &[], None, &catalog).unwrap();
        assert!(select.having.is_some());
        assert!(select.filter.is_none());

        let filter = Filter::equals("Status", 1);
        let select = view.query(Some(&filter), &[], None, &catalog).unwrap();
        assert!(select.having.is_none());
        assert!(select.filter.is_some());
    }

    #[test]
    fn order_defaults_to_id() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("OrderView", "Orders")
            .column(ColumnDescriptor::simple("Total", "Total"));
        let view = compile(&catalog, &desc);

        let select = view
            .query(None, &[Order::desc("Total"), Order::asc("Missing")], None, &catalog)
            .unwrap();
        assert_eq!(select.order_by.len(), 2);
        assert!(select.order_by[0].desc);
        assert_eq!(select.order_by[1].expr, Expr::field("Orders", "ID"));

        let select = view.query(None, &[Order::desc("ID")], None, &catalog).unwrap();
        assert_eq!(select.order_by.len(), 1);
    }

    #[test]
    fn computed_order_needs_the_column_selected() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("OrderView", "Orders")
            .column(ColumnDescriptor::simple("Total", "Total"))
            .column(ColumnDescriptor::expression(
                "Double",
                ExpressionDescriptor::Multiply(vec![
                    ExpressionDescriptor::Name("Total".into()),
                    ExpressionDescriptor::Number(2.0),
                ]),
            ));
        let view = compile(&catalog, &desc);

        let select = view
            .query(None, &[Order::asc("Double")], Some(&["Total".to_string()][..]), &catalog)
            .unwrap();
        assert_eq!(select.order_by.len(), 1);
        assert_eq!(select.fields.len(), 3);

        let select = view.query(None, &[Order::asc("Double")], None, &catalog).unwrap();
        assert_eq!(select.order_by[0].expr, Expr::name("Double"));
        assert_eq!(view.column("Double").unwrap().ty, DataType::Double);
    }

    #[test]
    fn expression_columns_may_refer_forward() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("OrderView", "Orders")
            .column(ColumnDescriptor::expression(
                "Label",
                ExpressionDescriptor::Macro(r#"'#' || "Doubled""#.into()),
            ))
            .column(ColumnDescriptor::expression(
                "Doubled",
                ExpressionDescriptor::Plus(vec![
                    ExpressionDescriptor::Name("Total".into()),
                    ExpressionDescriptor::Name("Total".into()),
                ]),
            ));
        let view = compile(&catalog, &desc);

        assert_eq!(view.column_names(), vec!["Label", "Doubled"]);
        let label = &view.column("Label").unwrap().expr;
        assert_eq!(
            label,
            &Expr::Bulk(vec![Expr::raw("'#' || "), view.column("Doubled").unwrap().expr.clone()])
        );
        assert!(view.column("Label").unwrap().read_only);
    }

    #[test]
    fn reference_cycles_are_detected() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("Loop", "Orders")
            .column(ColumnDescriptor::expression(
                "A",
                ExpressionDescriptor::Name("B".into()),
            ))
            .column(ColumnDescriptor::expression(
                "B",
                ExpressionDescriptor::Macro(r#""A" + 1"#.into()),
            ));
        let err = ViewCompiler::compile(&catalog, &desc).unwrap_err();
        assert!(err.is_cycle_detected());
    }

    #[test]
    fn duplicate_and_reserved_names_are_rejected() {
        let catalog = catalog();
        let desc = ViewDescriptor::new("Dup", "Orders")
            .column(ColumnDescriptor::simple("Total", "Total"))
            .column(ColumnDescriptor::simple("total", "Status"));
        assert!(ViewCompiler::compile(&catalog, &desc).is_err());

        let desc = ViewDescriptor::new("Reserved", "Orders")
            .column(ColumnDescriptor::simple("Version", "Total"));
        assert!(ViewCompiler::compile(&catalog, &desc).is_err());
    }

    #[test]
    fn view_filter_is_combined_with_the_callers() {
        let catalog = catalog();
        let mut desc = ViewDescriptor::new("Open", "Orders")
            .column(ColumnDescriptor::simple("Status", "Status"))
            .column(ColumnDescriptor::simple("Total", "Total"));
        desc.filter = Some("Status = 1".into());
        let view = compile(&catalog, &desc);

        let filter = Filter::compare("Total", Operator::Ge, 10);
        let select = view.query(Some(&filter), &[], None, &catalog).unwrap();
        assert!(matches!(select.filter, Some(Expr::And(ref list)) if list.len() == 2));
    }

    #[test]
    fn in_view_filters_become_subqueries() {
        let mut catalog = catalog();
        let customers = ViewDescriptor::new("Customers", "Customers")
            .column(ColumnDescriptor::simple("Name", "Name"));
        let customers = compile(&catalog, &customers);
        catalog.add_view(customers);

        let orders = ViewDescriptor::new("Orders", "Orders")
            .column(ColumnDescriptor::simple("Customer", "Customer"));
        let orders = compile(&catalog, &orders);

        let filter = Filter::in_view(
            "Customer",
            "Customers",
            "ID",
            Some(Filter::compare("Name", Operator::Starts, "A_")),
        );
        let select = orders.query(Some(&filter), &[], None, &catalog).unwrap();

        let mut params = vec![];
        let text = Serializer::sqlite().serialize(&Statement::Query(select).into(), &mut params);
        assert!(text.contains(r#""Orders"."Customer" IN (SELECT "Customers"."ID" FROM "Customers""#), "{text}");
        assert_eq!(params, vec![Value::from(r"A\_%")]);
    }

    #[test]
    fn custom_filters_use_the_registered_provider() {
        let mut catalog = catalog();
        let desc = ViewDescriptor::new("Orders", "Orders")
            .column(ColumnDescriptor::simple("Status", "Status"));
        let view = compile(&catalog, &desc);

        // Unknown providers leave the query unrestricted
        let filter = Filter::custom("mine", vec![]);
        assert!(view.condition(&filter, &catalog).unwrap().is_none());

        catalog.register_provider(
            "mine",
            Arc::new(|view: &View, args: &[String]| -> crate::Result<Option<Expr>> {
                assert_eq!(args, ["7".to_string()]);
                Ok(Some(Expr::eq(view.column_expr("Status")?, Value::I64(7))))
            }),
        );
        let filter = Filter::custom("mine", vec!["7".into()]);
        let select = view.query(Some(&filter), &[], None, &catalog).unwrap();
        assert!(select.filter.is_some());
    }
}
