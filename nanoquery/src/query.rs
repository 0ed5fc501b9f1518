//! Compiling `SELECT` statements, including joins, grouping, ordering,
//! pagination, unions and subqueries.

use core::fmt::{self, Debug, Display, Formatter};
use core::marker::PhantomData;
use std::mem;
use std::sync::Arc;
use rusqlite::types::Value;
use crate::{
    alias::{AliasCounter, AliasRegistry, ScopeId},
    column::IntoColumn,
    condition::Where,
    projection::Projection,
    fragment::Fragment,
    model::Model,
    error::Result,
};


/// The kind of a `JOIN`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub enum JoinKind {
    /// `INNER JOIN`
    #[default]
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `CROSS JOIN`; usually without an `ON` clause.
    Cross,
}

impl Display for JoinKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match *self {
            JoinKind::Inner => "INNER",
            JoinKind::Left  => "LEFT",
            JoinKind::Cross => "CROSS",
        })
    }
}

/// Sort direction in `ORDER BY`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Debug)]
pub enum Order {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Display for Order {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match *self {
            Order::Asc  => "ASC",
            Order::Desc => "DESC",
        })
    }
}

/// The clause accumulators shared by a query and each of its joins.
struct Clauses<M> {
    filter: Where<M>,
    projection: Projection<M>,
    group_by: Vec<Fragment>,
    having: Where<M>,
    order_by: Vec<Fragment>,
}

impl<M: Model> Clauses<M> {
    fn new(alias: &str) -> Self {
        Clauses {
            filter: Where::new(alias),
            projection: Projection::new(alias),
            group_by: Vec::new(),
            having: Where::new(alias),
            order_by: Vec::new(),
        }
    }

    /// Folds the clauses of an attached join into these.
    fn merge(&mut self, parts: JoinParts) {
        self.filter.absorb(&parts.filter);
        self.projection.extend_items(parts.projection);
        self.group_by.extend(parts.group_by);
        self.having.absorb(&parts.having);
        self.order_by.extend(parts.order_by);
    }
}

impl<M> Debug for Clauses<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Clauses")
            .field("filter", &self.filter)
            .field("projection", &self.projection)
            .field("group_by", &self.group_by)
            .field("having", &self.having)
            .field("order_by", &self.order_by)
            .finish()
    }
}

/// Everything a join contributes to its parent once it is attached.
/// This is model-agnostic, so it can cross the boundary between the
/// join's model and the parent's model.
#[derive(Debug)]
struct JoinParts {
    clause: Fragment,
    filter: Fragment,
    projection: Vec<Fragment>,
    group_by: Vec<Fragment>,
    having: Fragment,
    order_by: Vec<Fragment>,
}

/// Generates the clause builders common to [`Select`] and [`Join`].
macro_rules! impl_clause_methods {
    ($model:ident => $ty:ty; [$($generics:tt)*]) => {
        impl<$($generics)*> $ty {
            /// The alias of the table of this scope.
            pub fn alias(&self) -> &str {
                &self.alias
            }

            /// Adds items to the projection (the `SELECT` list).
            pub fn project<F>(&mut self, build: F) -> Result<&mut Self>
            where
                F: FnOnce(&mut Projection<$model>) -> Result<&mut Projection<$model>>,
            {
                build(&mut self.clauses.projection)?;
                Ok(self)
            }

            /// Adds tests to the `WHERE` clause.
            pub fn filter<F>(&mut self, build: F) -> Result<&mut Self>
            where
                F: FnOnce(&mut Where<$model>) -> Result<&mut Where<$model>>,
            {
                build(&mut self.clauses.filter)?;
                Ok(self)
            }

            /// Adds a column to the `GROUP BY` clause.
            pub fn group_by<C: IntoColumn<$model>>(&mut self, column: C) -> Result<&mut Self> {
                let desc = $model::description();
                let column = column.into_column().resolve(&desc, &self.alias)?;
                self.clauses.group_by.push(column);
                Ok(self)
            }

            /// Adds tests to the `HAVING` clause.
            pub fn having<F>(&mut self, build: F) -> Result<&mut Self>
            where
                F: FnOnce(&mut Where<$model>) -> Result<&mut Where<$model>>,
            {
                build(&mut self.clauses.having)?;
                Ok(self)
            }

            /// Adds a column to the `ORDER BY` clause.
            pub fn order_by<C>(&mut self, column: C, order: Order) -> Result<&mut Self>
            where
                C: IntoColumn<$model>,
            {
                let desc = $model::description();
                let mut column = column.into_column().resolve(&desc, &self.alias)?;
                column.push_sql(&format!(" {order}"));
                self.clauses.order_by.push(column);
                Ok(self)
            }

            /// Compiles a standalone expression over the columns of this
            /// scope, e.g. for comparing an aggregate in `HAVING`. The
            /// operands are separated by spaces and are never aliased.
            pub fn expr<F>(&self, build: F) -> Result<Fragment>
            where
                F: FnOnce(&mut Projection<$model>) -> Result<&mut Projection<$model>>,
            {
                let mut expr = Projection::expression(self.alias.clone());
                build(&mut expr)?;
                Ok(expr.compile())
            }

            /// Joins the table of model `K`, aliased after its default alias.
            ///
            /// The join is configured by `build`, and all of its clauses are
            /// merged into this scope once `build` returns.
            pub fn join<K, F>(&mut self, kind: JoinKind, build: F) -> Result<&mut Self>
            where
                K: Model,
                F: FnOnce(&mut Join<K, $model>) -> Result<&mut Join<K, $model>>,
            {
                let proposal = K::description().default_alias();
                self.join_as(kind, &proposal, build)
            }

            /// Joins the table of model `K`, proposing `alias` for it. The
            /// actual alias may have a numeric suffix if `alias` is taken.
            pub fn join_as<K, F>(&mut self, kind: JoinKind, alias: &str, build: F) -> Result<&mut Self>
            where
                K: Model,
                F: FnOnce(&mut Join<K, $model>) -> Result<&mut Join<K, $model>>,
            {
                let registry = mem::take(&mut self.registry);
                let mut join = Join::new(registry, self.scope, self.alias.clone(), kind, alias);

                // the registry is handed back even if `build` fails
                let outcome = build(&mut join).map(drop);
                let (registry, parts) = join.into_parts();
                self.registry = registry;
                outcome?;

                self.joins.push(parts.clause.clone());
                self.clauses.merge(parts);

                Ok(self)
            }

            /// `INNER JOIN`
            pub fn inner_join<K, F>(&mut self, build: F) -> Result<&mut Self>
            where
                K: Model,
                F: FnOnce(&mut Join<K, $model>) -> Result<&mut Join<K, $model>>,
            {
                self.join(JoinKind::Inner, build)
            }

            /// `LEFT JOIN`
            pub fn left_join<K, F>(&mut self, build: F) -> Result<&mut Self>
            where
                K: Model,
                F: FnOnce(&mut Join<K, $model>) -> Result<&mut Join<K, $model>>,
            {
                self.join(JoinKind::Left, build)
            }
        }
    }
}

/// Builder of a `SELECT` statement over the table of model `M`.
///
/// Clauses can be added in any order; [`Select::compile()`] always emits
/// them in SQL order, and binds parameters in the order of their
/// placeholders. Compiling is repeatable and does not consume the builder.
pub struct Select<M> {
    registry: AliasRegistry,
    scope: ScopeId,
    alias: String,
    table: String,
    from: Option<Fragment>,
    joins: Vec<Fragment>,
    clauses: Clauses<M>,
    limit: Option<i64>,
    offset: Option<i64>,
    unions: Vec<(&'static str, Fragment)>,
}

impl<M: Model> Select<M> {
    /// Selects from the table of `M`, aliased after the default alias of `M`.
    pub fn new() -> Self {
        Self::aliased(&M::description().default_alias())
    }

    /// Selects from the table of `M`, using `alias` (lowercased) for it.
    pub fn aliased(alias: &str) -> Self {
        let desc = M::description();
        let registry = AliasRegistry::new(alias);
        let alias = registry.alias(AliasRegistry::ROOT).to_owned();

        Select {
            scope: AliasRegistry::ROOT,
            table: desc.table,
            from: None,
            joins: Vec::new(),
            clauses: Clauses::new(&alias),
            limit: None,
            offset: None,
            unions: Vec::new(),
            registry,
            alias,
        }
    }

    /// Uses `counter` for disambiguating colliding join aliases, instead
    /// of the process-wide counter.
    pub fn with_counter(mut self, counter: Arc<dyn AliasCounter>) -> Self {
        self.registry.set_counter(counter);
        self
    }

    /// Selects from a subquery instead of the table of `M`, as in
    /// `FROM (subquery) AS alias`. The parameters of the subquery are
    /// bound before those of the outer `WHERE`.
    pub fn from_query(&mut self, subquery: impl Into<Fragment>) -> &mut Self {
        self.from = Some(subquery.into());
        self
    }

    /// Sets the maximal number of rows returned.
    pub fn limit(&mut self, limit: i64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the number of rows skipped.
    pub fn offset(&mut self, offset: i64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Appends `UNION query`.
    pub fn union(&mut self, query: impl Into<Fragment>) -> &mut Self {
        self.unions.push(("UNION", query.into()));
        self
    }

    /// Appends `UNION ALL query`.
    pub fn union_all(&mut self, query: impl Into<Fragment>) -> &mut Self {
        self.unions.push(("UNION ALL", query.into()));
        self
    }

    /// Assembles the statement.
    ///
    /// If nothing was projected, the projection defaults to `alias.*`.
    pub fn compile(&self) -> Fragment {
        let mut stmt = Fragment::new("SELECT ");

        if self.clauses.projection.is_empty() {
            stmt.push_sql(&format!("{}.*", self.alias));
        } else {
            stmt.append(&self.clauses.projection.compile());
        }

        stmt.push_sql(" FROM ");

        match &self.from {
            Some(subquery) => stmt.append_nested(subquery),
            None => stmt.push_sql(&self.table),
        };
        stmt.push_sql(&format!(" AS {}", self.alias));

        for join in &self.joins {
            stmt.push_sql(" ");
            stmt.append(join);
        }

        if !self.clauses.filter.is_empty() {
            stmt.push_sql(" WHERE ");
            stmt.append(&self.clauses.filter.compile());
        }

        if !self.clauses.group_by.is_empty() {
            stmt.push_sql(" GROUP BY ");
            stmt.append(&Fragment::join(&self.clauses.group_by, ", "));
        }

        if !self.clauses.having.is_empty() {
            stmt.push_sql(" HAVING ");
            stmt.append(&self.clauses.having.compile());
        }

        if !self.clauses.order_by.is_empty() {
            stmt.push_sql(" ORDER BY ");
            stmt.append(&Fragment::join(&self.clauses.order_by, ", "));
        }

        match (self.limit, self.offset) {
            (None, None) => {}
            (limit, offset) => {
                // SQLite only accepts OFFSET after a LIMIT; -1 means unlimited
                stmt.push_sql(" LIMIT ");
                stmt.append(&Fragment::placeholder(Value::Integer(limit.unwrap_or(-1))));

                if let Some(offset) = offset {
                    stmt.push_sql(" OFFSET ");
                    stmt.append(&Fragment::placeholder(Value::Integer(offset)));
                }
            }
        }

        for (operator, query) in &self.unions {
            stmt.push_sql(&format!(" {operator} "));
            stmt.append(query);
        }

        tracing::trace!(sql = %stmt.sql, params = stmt.params.len(), "compiled SELECT");

        stmt
    }
}

impl<M: Model> Default for Select<M> {
    fn default() -> Self {
        Select::new()
    }
}

impl<M> Debug for Select<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Select")
            .field("registry", &self.registry)
            .field("alias", &self.alias)
            .field("table", &self.table)
            .field("from", &self.from)
            .field("joins", &self.joins)
            .field("clauses", &self.clauses)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("unions", &self.unions)
            .finish()
    }
}

impl<M: Model> From<&Select<M>> for Fragment {
    fn from(query: &Select<M>) -> Self {
        query.compile()
    }
}

impl<M: Model> From<Select<M>> for Fragment {
    fn from(query: Select<M>) -> Self {
        query.compile()
    }
}

impl_clause_methods!(M => Select<M>; [M: Model]);

/// A join of the table of model `J` into a scope over model `P`.
///
/// A join has its own `ON` condition, and may add to the projection and
/// to every other clause of the query except `LIMIT`/`OFFSET`; those are
/// merged into the enclosing query when the join is attached. Joins can
/// be nested arbitrarily deep, and every joined table gets an alias that
/// is unique within the whole query.
pub struct Join<J, P> {
    registry: AliasRegistry,
    scope: ScopeId,
    alias: String,
    parent_alias: String,
    kind: JoinKind,
    table: String,
    on: Where<J>,
    joins: Vec<Fragment>,
    clauses: Clauses<J>,
    marker: PhantomData<fn() -> P>,
}

impl<J: Model, P: Model> Join<J, P> {
    fn new(
        mut registry: AliasRegistry,
        parent: ScopeId,
        parent_alias: String,
        kind: JoinKind,
        proposal: &str,
    ) -> Self {
        let (scope, alias) = registry.allocate(parent, proposal);

        Join {
            registry,
            scope,
            parent_alias,
            kind,
            table: J::description().table,
            on: Where::new(alias.as_str()),
            joins: Vec::new(),
            clauses: Clauses::new(&alias),
            alias,
            marker: PhantomData,
        }
    }

    /// Adds tests to the `ON` clause.
    pub fn on<F>(&mut self, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Where<J>) -> Result<&mut Where<J>>,
    {
        build(&mut self.on)?;
        Ok(self)
    }

    /// Resolves a column of the parent scope, qualified with the parent's
    /// alias, for use as an operand in the `ON` clause.
    pub fn parent<C: IntoColumn<P>>(&self, column: C) -> Result<Fragment> {
        column.into_column().resolve(&P::description(), &self.parent_alias)
    }

    fn into_parts(self) -> (AliasRegistry, JoinParts) {
        let mut clause = Fragment::new(format!("{} JOIN {} AS {}", self.kind, self.table, self.alias));

        if !self.on.is_empty() {
            clause.push_sql(" ON ");
            clause.append_nested(&self.on.compile());
        }

        for nested in &self.joins {
            clause.push_sql(" ");
            clause.append(nested);
        }

        let mut clauses = self.clauses;
        let parts = JoinParts {
            clause,
            filter: clauses.filter.compile(),
            projection: clauses.projection.take_items(),
            group_by: clauses.group_by,
            having: clauses.having.compile(),
            order_by: clauses.order_by,
        };

        (self.registry, parts)
    }
}

impl<J, P> Debug for Join<J, P> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Join")
            .field("alias", &self.alias)
            .field("parent_alias", &self.parent_alias)
            .field("kind", &self.kind)
            .field("table", &self.table)
            .field("on", &self.on)
            .field("joins", &self.joins)
            .field("clauses", &self.clauses)
            .finish()
    }
}

impl_clause_methods!(J => Join<J, P>; [J: Model, P: Model]);
