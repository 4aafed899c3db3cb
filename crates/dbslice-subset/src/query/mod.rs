//! SQL rendering for subset graphs.

mod cycles;
mod dag;

use std::collections::BTreeMap;

use dbslice_core::{Quoting, Table};
use regex::{NoExpand, Regex};

use crate::errors::Result;

pub use cycles::CyclesQueryBuilder;
pub use dag::DagQueryBuilder;

/// Builds the subset queries for one subset graph.
pub trait QueryBuilder {
    /// Queries keyed by table id.
    fn build(&self) -> Result<BTreeMap<usize, String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// `SELECT` over one root table with joins and ANDed conditions.
#[derive(Debug, Clone)]
pub(crate) struct SelectQuery {
    root: String,
    joins: Vec<String>,
    conditions: Vec<String>,
}

impl SelectQuery {
    pub(crate) fn new(root: String) -> Self {
        Self {
            root,
            joins: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub(crate) fn join(&mut self, kind: JoinKind, target: String, on: String) {
        self.joins
            .push(format!("{} {target} ON {on}", kind.as_str()));
    }

    pub(crate) fn push_condition(&mut self, condition: String) {
        self.conditions.push(condition);
    }

    /// Only the root columns are selected once joins are present.
    pub(crate) fn render(&self) -> String {
        let mut sql = if self.joins.is_empty() {
            format!("SELECT * FROM {}", self.root)
        } else {
            format!("SELECT {root}.* FROM {root}", root = self.root)
        };
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }
}

pub(crate) fn and_group(items: &[String]) -> String {
    format!("({})", items.join(" AND "))
}

pub(crate) fn or_group(items: &[String]) -> String {
    format!("({})", items.join(" OR "))
}

/// Rewrites `schema.table.` prefixes (quoted or bare) of one table to an alias.
pub(crate) struct AliasRewriter {
    pattern: Regex,
    replacement: String,
}

impl AliasRewriter {
    pub(crate) fn new(quoting: Quoting, table: &Table, alias: &str) -> Result<Self> {
        let q = regex::escape(&quoting.quote_char().to_string());
        let name = |ident: &str| {
            let ident = regex::escape(ident);
            format!(r"(?:{q}{ident}{q}|\b{ident})")
        };
        let prefix = if table.schema.is_empty() {
            format!(r"{}\.", name(&table.name))
        } else {
            format!(r"{}\.{}\.", name(&table.schema), name(&table.name))
        };
        Ok(Self {
            pattern: Regex::new(&prefix)?,
            replacement: format!("{}.", quoting.ident(alias)),
        })
    }

    pub(crate) fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, NoExpand(&self.replacement))
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use dbslice_core::Dialect;

    use super::*;

    #[test]
    fn renders_plain_select_without_joins() {
        let mut query = SelectQuery::new("\"public\".\"a\"".to_string());
        query.push_condition(and_group(&["public.a.id = 1".to_string()]));
        assert_eq!(
            query.render(),
            "SELECT * FROM \"public\".\"a\" WHERE (public.a.id = 1)"
        );
    }

    #[test]
    fn renders_root_columns_with_joins() {
        let mut query = SelectQuery::new("\"b\"".to_string());
        query.join(JoinKind::Left, "\"a\"".to_string(), "\"b\".\"a_id\" = \"a\".\"id\"".to_string());
        assert_eq!(
            query.render(),
            "SELECT \"b\".* FROM \"b\" LEFT JOIN \"a\" ON \"b\".\"a_id\" = \"a\".\"id\""
        );
    }

    #[test]
    fn rewrites_quoted_and_bare_prefixes() {
        let table = Table::new("public", "a", ["id"]);
        let rewriter =
            AliasRewriter::new(Dialect::Postgres.quoting(), &table, "public_a__0").expect("pattern");
        assert_eq!(
            rewriter.rewrite("public.a.id = 1 AND \"public\".\"a\".\"kind\" = 'x'"),
            "\"public_a__0\".id = 1 AND \"public_a__0\".\"kind\" = 'x'"
        );
    }

    #[test]
    fn rewrite_leaves_other_tables_alone() {
        let table = Table::new("public", "a", ["id"]);
        let rewriter =
            AliasRewriter::new(Dialect::Postgres.quoting(), &table, "public_a__1").expect("pattern");
        let text = "public.ab.id = 1 AND xpublic.a.id = 2 AND public.a_b.id = 3";
        assert_eq!(rewriter.rewrite(text), text);
    }

    #[test]
    fn rewrites_mysql_backticks() {
        let table = Table::new("shop", "orders", ["id"]);
        let rewriter =
            AliasRewriter::new(Dialect::MySql.quoting(), &table, "shop_orders__0").expect("pattern");
        assert_eq!(
            rewriter.rewrite("`shop`.`orders`.`total` > 10"),
            "`shop_orders__0`.`total` > 10"
        );
    }
}
