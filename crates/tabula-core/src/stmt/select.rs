use super::{source, Expr, Join, JoinKind, OrderBy, Source};

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// A `SELECT` statement.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub fields: Vec<SelectItem>,
    pub from: Vec<source::From>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    pub fn new() -> Select {
        Select::default()
    }

    pub fn add_from(&mut self, table: impl Into<String>, alias: Option<String>) -> &mut Self {
        self.from.push(source::From {
            source: Source::Table(table.into()),
            alias,
            join: None,
        });
        self
    }

    pub fn add_from_query(&mut self, query: Select, alias: impl Into<String>) -> &mut Self {
        self.from.push(source::From {
            source: Source::Query(Box::new(query)),
            alias: Some(alias.into()),
            join: None,
        });
        self
    }

    /// Adds a join unless one with the same `key` already exists. Returns the
    /// alias to use for the joined table.
    pub fn add_join(
        &mut self,
        kind: JoinKind,
        table: impl Into<String>,
        alias: impl Into<String>,
        on: Expr,
        key: impl Into<String>,
    ) -> String {
        let key = key.into();

        if let Some(existing) = self.find_join(&key) {
            return existing.to_string();
        }

        let alias = alias.into();
        self.from.push(source::From {
            source: Source::Table(table.into()),
            alias: Some(alias.clone()),
            join: Some(Join { kind, on, key }),
        });
        alias
    }

    /// Alias of the join registered under `key`.
    pub fn find_join(&self, key: &str) -> Option<&str> {
        self.from
            .iter()
            .find(|from| from.join.as_ref().is_some_and(|join| join.key == key))
            .and_then(|from| from.reference())
    }

    pub fn join_count(&self) -> usize {
        self.from.iter().filter(|from| from.join.is_some()).count()
    }

    pub fn add_field(&mut self, expr: impl Into<Expr>, alias: Option<String>) -> &mut Self {
        self.fields.push(SelectItem {
            expr: expr.into(),
            alias,
        });
        self
    }

    pub fn and_filter(&mut self, cond: Expr) -> &mut Self {
        self.filter = Expr::and_opt(self.filter.take(), Some(cond));
        self
    }

    pub fn add_group(&mut self, expr: Expr) -> &mut Self {
        if !self.group_by.contains(&expr) {
            self.group_by.push(expr);
        }
        self
    }

    pub fn add_order(&mut self, expr: Expr, desc: bool) -> &mut Self {
        self.order_by.push(OrderBy { expr, desc });
        self
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn has_aggregates(&self) -> bool {
        self.fields.iter().any(|item| item.expr.is_aggregate())
    }

    /// Names of every table read by this query, including sub-queries.
    pub fn tables(&self) -> Vec<String> {
        let mut dst = vec![];
        self.collect_tables(&mut dst);
        dst
    }

    pub(crate) fn collect_tables(&self, dst: &mut Vec<String>) {
        for from in &self.from {
            match &from.source {
                Source::Table(name) => {
                    if !dst.iter().any(|t| t.eq_ignore_ascii_case(name)) {
                        dst.push(name.clone());
                    }
                }
                Source::Query(query) => query.collect_tables(dst),
            }
            if let Some(join) = &from.join {
                join.on.collect_tables(dst);
            }
        }
        for item in &self.fields {
            item.expr.collect_tables(dst);
        }
        for expr in self.filter.iter().chain(self.having.iter()) {
            expr.collect_tables(dst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_with_same_key_is_reused() {
        let mut query = Select::new();
        query.add_from("Orders", None);

        let on = Expr::eq(Expr::field("Orders", "Customer"), Expr::field("c1", "ID"));
        let first = query.add_join(JoinKind::Left, "Customers", "c1", on, "Customers Orders.Customer=ID");

        let on = Expr::eq(Expr::field("Orders", "Customer"), Expr::field("c2", "ID"));
        let second = query.add_join(JoinKind::Left, "Customers", "c2", on, "Customers Orders.Customer=ID");

        assert_eq!(first, "c1");
        assert_eq!(second, "c1");
        assert_eq!(query.join_count(), 1);
    }

    #[test]
    fn tables_are_collected_once() {
        let mut query = Select::new();
        query.add_from("Orders", None);
        query.add_join(
            JoinKind::Inner,
            "Customers",
            "c",
            Expr::Bool(true),
            "k",
        );
        query.add_from("orders", Some("again".into()));

        assert_eq!(query.tables(), vec!["Orders".to_string(), "Customers".to_string()]);
    }

    #[test]
    fn group_by_ignores_duplicates() {
        let mut query = Select::new();
        query.add_group(Expr::field("t", "a"));
        query.add_group(Expr::field("t", "a"));
        assert_eq!(query.group_by.len(), 1);
    }
}
