//! The condition compiler.
//!
//! Each `filter`/`having` call resolves its arguments into one
//! [`Operand`] at the call boundary, renders one SQL fragment, and
//! pushes the bound values into the matching binding partition.
//! Fragments carry their connector; the assembler strips the first
//! one per clause.

use crate::value::Value;

use super::{compile, Cond, Connector, Statement};

/// The resolved right-hand side of one condition invocation.
#[derive(Debug)]
pub(crate) enum Operand {
    Value(Value),
    List(Vec<Value>),
    Subquery { sql: String, bindings: Vec<Value> },
    Group { sql: String, bindings: Vec<Value> },
}

/// Which clause a condition lands in.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Clause {
    Where,
    Having,
}

impl Statement {
    /// Renders one condition and appends it to the chosen clause.
    ///
    /// Interpretation precedence: group, NULL-test operator (the
    /// operator text carries the whole predicate, nothing is bound),
    /// subquery, value list, defaulted `=`, then plain `column op ?`.
    pub(crate) fn push_condition(
        &mut self,
        clause: Clause,
        connector: Connector,
        column: &str,
        operator: &str,
        operand: Operand,
    ) {
        let mut bound = vec![];
        let sql = match operand {
            Operand::Group { sql, bindings } => {
                bound = bindings;
                format!("({})", sql)
            }
            _ if operator.to_ascii_lowercase().contains("null") => {
                format!("{} {}", column, operator)
            }
            Operand::Subquery { sql, bindings } => {
                bound = bindings;
                let operator = if operator.is_empty() { "IN" } else { operator };
                format!("{} {} ({})", column, operator, sql)
            }
            Operand::List(values) => {
                let operator = if operator.is_empty() { "IN" } else { operator };
                let placeholders = vec!["?"; values.len()].join(", ");
                bound = values;
                format!("{} {} ({})", column, operator, placeholders)
            }
            Operand::Value(value) => {
                bound = vec![value];
                let operator = if operator.is_empty() { "=" } else { operator };
                format!("{} {} ?", column, operator)
            }
        };

        let (conds, bindings) = match clause {
            Clause::Where => (&mut self.wheres, &mut self.where_bindings),
            Clause::Having => (&mut self.havings, &mut self.having_bindings),
        };
        conds.push(Cond { connector, sql });
        bindings.extend(bound);
    }

    /// Renders a nested statement's WHERE text for use as a group,
    /// substituting the `1=1` tautology when the group is empty.
    fn group_operand(sub: Statement) -> Operand {
        let sql = if sub.wheres.is_empty() {
            "1=1".to_string()
        } else {
            compile::render_conditions(&sub.wheres)
        };
        Operand::Group {
            sql,
            bindings: sub.where_bindings,
        }
    }

    fn subquery_operand(&mut self, sub: Statement) -> Option<Operand> {
        match sub.compile_select() {
            Ok(sql) => Some(Operand::Subquery {
                sql,
                bindings: sub.ordered_bindings(),
            }),
            Err(err) => {
                self.record_compile_error(err);
                None
            }
        }
    }

    /// Appends an AND-connected WHERE condition, `column operator ?`.
    ///
    /// An operator containing `null` (any case) renders the predicate
    /// from the operator text alone and binds nothing.
    pub fn filter<V: Into<Value>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.push_condition(
            Clause::Where,
            Connector::And,
            column,
            operator,
            Operand::Value(value.into()),
        );
        self
    }

    /// Appends an OR-connected WHERE condition.
    pub fn or_filter<V: Into<Value>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.push_condition(
            Clause::Where,
            Connector::Or,
            column,
            operator,
            Operand::Value(value.into()),
        );
        self
    }

    /// Equality shorthand: `column = ?`.
    pub fn eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.filter(column, "", value)
    }

    /// Appends `column IS NULL`.
    pub fn filter_null(self, column: &str) -> Self {
        self.filter(column, "IS NULL", Value::Null)
    }

    /// Appends `column IS NOT NULL`.
    pub fn filter_not_null(self, column: &str) -> Self {
        self.filter(column, "IS NOT NULL", Value::Null)
    }

    /// Appends `column IN (?, ?, ..)`, one placeholder per element.
    pub fn filter_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_condition(
            Clause::Where,
            Connector::And,
            column,
            "IN",
            Operand::List(values),
        );
        self
    }

    /// Appends `column NOT IN (?, ?, ..)`.
    pub fn filter_not_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_condition(
            Clause::Where,
            Connector::And,
            column,
            "NOT IN",
            Operand::List(values),
        );
        self
    }

    /// OR-connected variant of [`filter_in`](Self::filter_in).
    pub fn or_filter_in<V: Into<Value>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push_condition(
            Clause::Where,
            Connector::Or,
            column,
            "IN",
            Operand::List(values),
        );
        self
    }

    /// Appends `column operator (subquery)`. An empty operator
    /// defaults to `IN`. The subquery's bindings splice in here.
    pub fn filter_sub<F>(mut self, column: &str, operator: &str, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let sub = f(self.nested());
        if let Some(operand) = self.subquery_operand(sub) {
            self.push_condition(Clause::Where, Connector::And, column, operator, operand);
        }
        self
    }

    /// OR-connected variant of [`filter_sub`](Self::filter_sub).
    pub fn or_filter_sub<F>(mut self, column: &str, operator: &str, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let sub = f(self.nested());
        if let Some(operand) = self.subquery_operand(sub) {
            self.push_condition(Clause::Where, Connector::Or, column, operator, operand);
        }
        self
    }

    /// Appends a parenthesized group of conditions configured on a
    /// nested statement. An empty group renders the `1=1` tautology.
    pub fn filter_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let operand = Self::group_operand(f(self.nested()));
        self.push_condition(Clause::Where, Connector::And, "", "", operand);
        self
    }

    /// OR-connected variant of [`filter_group`](Self::filter_group).
    pub fn or_filter_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let operand = Self::group_operand(f(self.nested()));
        self.push_condition(Clause::Where, Connector::Or, "", "", operand);
        self
    }

    /// Appends an AND-connected HAVING condition. Emitted only when a
    /// GROUP BY is present.
    pub fn having<V: Into<Value>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.push_condition(
            Clause::Having,
            Connector::And,
            column,
            operator,
            Operand::Value(value.into()),
        );
        self
    }

    /// Appends an OR-connected HAVING condition.
    pub fn or_having<V: Into<Value>>(mut self, column: &str, operator: &str, value: V) -> Self {
        self.push_condition(
            Clause::Having,
            Connector::Or,
            column,
            operator,
            Operand::Value(value.into()),
        );
        self
    }

    /// Parenthesized group in the HAVING clause. The closure
    /// configures its conditions through the `filter` family.
    pub fn having_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let operand = Self::group_operand(f(self.nested()));
        self.push_condition(Clause::Having, Connector::And, "", "", operand);
        self
    }

    /// OR-connected variant of [`having_group`](Self::having_group).
    pub fn or_having_group<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let operand = Self::group_operand(f(self.nested()));
        self.push_condition(Clause::Having, Connector::Or, "", "", operand);
        self
    }
}
