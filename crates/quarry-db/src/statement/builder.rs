//! Fluent configuration methods.
//!
//! Every method consumes and returns the statement. Join clauses are
//! rendered to text the moment they are appended; subquery and union
//! closures compile their nested statement immediately and splice its
//! bindings at the call position.

use super::{compile, Misuse, Source, Statement};

impl Statement {
    /// Appends projection columns. Repeated calls are cumulative.
    pub fn select<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Sets the source table. Accepts `"name"`, `"name alias"` or
    /// `"name AS alias"`. May be called once; a second call is
    /// recorded as a misuse and raised at compile time.
    pub fn from(mut self, table: impl Into<String>) -> Self {
        let table = table.into();
        if self.source.is_some() {
            if self.misuse.is_none() {
                self.misuse = Some(Misuse::SourceAlreadySet(table));
            }
        } else {
            self.source = Some(Source::Table(table));
        }
        self
    }

    /// Sets the source to a subquery, embedded as `(sql) AS alias`.
    ///
    /// An empty alias defaults to `t`. The subquery's bindings join
    /// the where partition at this call's position.
    pub fn from_subquery<F>(mut self, alias: &str, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let sub = f(self.nested());
        match sub.compile_select() {
            Ok(sql) => {
                let alias = if alias.is_empty() { "t" } else { alias };
                if self.source.is_some() {
                    if self.misuse.is_none() {
                        self.misuse = Some(Misuse::SourceAlreadySet(alias.to_string()));
                    }
                } else {
                    self.source = Some(Source::Subquery {
                        sql,
                        alias: alias.to_string(),
                    });
                    self.where_bindings.extend(sub.ordered_bindings());
                }
            }
            Err(err) => self.record_compile_error(err),
        }
        self
    }

    /// Inner join with a conventional ON predicate inferred from the
    /// source: `<source_alias>.id = <join_alias>.<source_name>_id`.
    pub fn join(self, table: &str) -> Self {
        self.push_inferred_join("JOIN", table)
    }

    /// Left join with the same inferred ON predicate as [`join`](Self::join).
    pub fn left_join(self, table: &str) -> Self {
        self.push_inferred_join("LEFT JOIN", table)
    }

    /// Inner join with an explicit ON predicate.
    pub fn join_on(mut self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.joins
            .push(format!("JOIN {} ON {} {} {}", table, first, operator, second));
        self
    }

    /// Left join with an explicit ON predicate.
    pub fn left_join_on(mut self, table: &str, first: &str, operator: &str, second: &str) -> Self {
        self.joins.push(format!(
            "LEFT JOIN {} ON {} {} {}",
            table, first, operator, second
        ));
        self
    }

    /// Cross join. No ON or USING clause is emitted.
    pub fn cross_join(mut self, table: &str) -> Self {
        self.joins.push(format!("CROSS JOIN {}", table));
        self
    }

    /// Natural join. No ON or USING clause is emitted.
    pub fn natural_join(mut self, table: &str) -> Self {
        self.joins.push(format!("NATURAL JOIN {}", table));
        self
    }

    /// Inner join on a shared column, rendered as `USING(column)`.
    pub fn join_using(mut self, table: &str, column: &str) -> Self {
        self.joins.push(format!("JOIN {} USING({})", table, column));
        self
    }

    fn push_inferred_join(mut self, kind: &str, table: &str) -> Self {
        match &self.source {
            Some(source) => {
                let (src_name, src_alias) = source.name_and_alias();
                let (_, join_alias) = compile::parse_table_ref(table);
                self.joins.push(format!(
                    "{} {} ON {}.id = {}.{}_id",
                    kind, table, src_alias, join_alias, src_name
                ));
            }
            // inference needs a source table name
            None => {
                if self.misuse.is_none() {
                    self.misuse = Some(Misuse::TableNotSet);
                }
            }
        }
        self
    }

    /// Appends a `UNION` branch compiled from a nested statement.
    pub fn union<F>(self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        self.push_union("UNION", f)
    }

    /// Appends a `UNION ALL` branch compiled from a nested statement.
    pub fn union_all<F>(self, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        self.push_union("UNION ALL", f)
    }

    fn push_union<F>(mut self, keyword: &str, f: F) -> Self
    where
        F: FnOnce(Statement) -> Statement,
    {
        let sub = f(self.nested());
        match sub.compile_select() {
            Ok(sql) => {
                self.unions.push(format!("{} {}", keyword, sql));
                self.union_bindings.extend(sub.ordered_bindings());
            }
            Err(err) => self.record_compile_error(err),
        }
        self
    }

    /// Appends GROUP BY columns. Repeated calls are cumulative.
    pub fn group_by<I>(mut self, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Appends an ORDER BY expression.
    pub fn order_by(mut self, column: &str, desc: bool) -> Self {
        self.order_by
            .push(format!("{} {}", column, if desc { "DESC" } else { "ASC" }));
        self
    }

    /// Sets the row limit, replacing any prior limit/offset pair.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self.offset = None;
        self
    }

    /// Sets the row limit and offset, replacing any prior pair.
    pub fn limit_offset(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}
