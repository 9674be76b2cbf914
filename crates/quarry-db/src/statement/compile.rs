//! SQL assembly.
//!
//! `compile_select` is a pure function of builder state: it can be
//! called repeatedly, and it is what nested statements call when they
//! embed themselves as subquery, union, or group text. Clauses are
//! emitted in a fixed order and empty clauses are omitted entirely.

use crate::error::{DbError, DbResult};
use crate::value::Value;

use super::{Cond, Source, Statement};

/// Splits a table reference into `(name, alias)`.
///
/// `"users"` aliases to itself; `"users u"` and `"users AS u"` alias
/// to `u`.
pub(crate) fn parse_table_ref(raw: &str) -> (&str, &str) {
    let mut parts = raw.split_whitespace();
    let name = parts.next().unwrap_or(raw);
    let rest: Vec<&str> = parts.collect();
    match rest.as_slice() {
        [alias] => (name, alias),
        [kw, alias] if kw.eq_ignore_ascii_case("as") => (name, alias),
        _ => (name, name),
    }
}

/// Renders condition fragments, stripping the first connector.
pub(crate) fn render_conditions(conds: &[Cond]) -> String {
    let mut out = String::new();
    for (i, cond) in conds.iter().enumerate() {
        if i > 0 {
            out.push(' ');
            out.push_str(cond.connector.as_str());
            out.push(' ');
        }
        out.push_str(&cond.sql);
    }
    out
}

impl Source {
    pub(crate) fn render(&self) -> String {
        match self {
            Source::Table(raw) => raw.clone(),
            Source::Subquery { sql, alias } => format!("({}) AS {}", sql, alias),
        }
    }

    /// `(name, alias)` for join-key inference; a subquery source uses
    /// its alias for both.
    pub(crate) fn name_and_alias(&self) -> (&str, &str) {
        match self {
            Source::Table(raw) => parse_table_ref(raw),
            Source::Subquery { alias, .. } => (alias, alias),
        }
    }

    /// Bare table name for mutation targets. Mutations never accept a
    /// subquery source.
    pub(crate) fn table_name(&self) -> DbResult<&str> {
        match self {
            Source::Table(raw) => Ok(parse_table_ref(raw).0),
            Source::Subquery { .. } => Err(DbError::TableNotSet),
        }
    }
}

impl Statement {
    /// Compiles the full SELECT for this statement.
    pub(crate) fn compile_select(&self) -> DbResult<String> {
        self.check_misuse()?;

        let source = self.source.as_ref().ok_or(DbError::TableNotSet)?;

        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", projection, source.render());

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_conditions(&self.wheres));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));

            // HAVING is only meaningful under a GROUP BY
            if !self.havings.is_empty() {
                sql.push_str(" HAVING ");
                sql.push_str(&render_conditions(&self.havings));
            }
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        for union in &self.unions {
            sql.push(' ');
            sql.push_str(union);
        }

        Ok(sql)
    }

    /// Renders the WHERE clause alone, with a leading space, for
    /// UPDATE and DELETE. Empty when no conditions are set.
    pub(crate) fn compile_where(&self) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", render_conditions(&self.wheres))
        }
    }

    /// The final binding sequence: where, then having, then union
    /// partitions. Having bindings are skipped when the HAVING clause
    /// is not emitted, keeping values and placeholders in step.
    pub(crate) fn ordered_bindings(&self) -> Vec<Value> {
        let mut bindings = self.where_bindings.clone();
        if !self.group_by.is_empty() && !self.havings.is_empty() {
            bindings.extend(self.having_bindings.iter().cloned());
        }
        bindings.extend(self.union_bindings.iter().cloned());
        bindings
    }

    /// The compiled SELECT text. Pure; callable repeatedly.
    pub fn to_sql(&self) -> DbResult<String> {
        self.compile_select()
    }

    /// The ordered binding sequence matching [`to_sql`](Self::to_sql).
    pub fn bindings(&self) -> Vec<Value> {
        self.ordered_bindings()
    }
}
