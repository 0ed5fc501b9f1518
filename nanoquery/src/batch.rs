//! Generating `INSERT`, `UPDATE` and `DELETE` statements, with multi-row
//! inserts split into chunks that respect a bound-parameter limit.

use core::fmt::{self, Debug, Formatter};
use rusqlite::types::Value;
use crate::{
    column::{IntoColumn, Selector},
    condition::{Operand, Where},
    fragment::Fragment,
    model::{Model, Record},
    value::Scalar,
    error::{Error, Result},
};


/// The default maximal number of parameters bound to a single statement.
/// This is the historic default of `SQLITE_MAX_VARIABLE_NUMBER`.
pub const DEFAULT_MAX_PARAMS: usize = 999;

/// Builder of (possibly many) multi-row `INSERT` statements.
#[derive(Clone, Debug)]
pub struct Insert {
    table: String,
    columns: Vec<String>,
    max_params: usize,
}

impl Insert {
    /// Inserts into the given columns of `table`.
    pub fn new<I>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Insert {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            max_params: DEFAULT_MAX_PARAMS,
        }
    }

    /// Inserts into every column of the table of model `M`.
    pub fn of<M: Model>() -> Self {
        let desc = M::description();
        Insert::new(desc.table.as_str(), desc.column_names())
    }

    /// Sets the bound-parameter ceiling.
    pub fn max_params(mut self, max_params: usize) -> Self {
        self.max_params = max_params;
        self
    }

    /// The number of rows that fit in one statement.
    ///
    /// Statements stay strictly below the ceiling, unless even a single
    /// row reaches it. A row that exceeds the ceiling is an error.
    ///
    /// This is `(max_params - 1) / columns` rather than
    /// `max_params / columns`, so that e.g. 3 rows of 2 columns under a
    /// ceiling of 4 are inserted by 3 single-row statements.
    pub fn rows_per_chunk(&self) -> Result<usize> {
        let columns = self.columns.len();

        if columns == 0 {
            return Err(Error::message(format!("no columns to insert into `{}`", self.table)));
        }
        if columns > self.max_params {
            return Err(Error::ParamLimit {
                columns,
                limit: self.max_params,
            });
        }

        Ok(usize::max(1, (self.max_params - 1) / columns))
    }

    /// Compiles one statement per chunk of `rows`. Each row must have
    /// exactly one value per column. The parameters of the statements,
    /// concatenated, are the values of `rows` in row-major order.
    pub fn compile(&self, rows: &[Vec<Value>]) -> Result<Vec<Fragment>> {
        if rows.is_empty() {
            return Err(Error::EmptyBatch {
                table: self.table.clone(),
            });
        }

        let expected = self.columns.len();

        if let Some(row) = rows.iter().find(|row| row.len() != expected) {
            return Err(Error::RaggedBatch {
                table: self.table.clone(),
                expected,
                actual: row.len(),
                row: format!("{row:?}"),
            });
        }

        let rows_per_chunk = self.rows_per_chunk()?;
        let head = format!("INSERT INTO {} ({}) VALUES ", self.table, self.columns.join(", "));

        let statements: Vec<_> = rows
            .chunks(rows_per_chunk)
            .map(|chunk| {
                let tuples: Vec<_> = chunk
                    .iter()
                    .map(|row| Fragment::placeholders(row.clone()).nested())
                    .collect();

                let mut stmt = Fragment::new(head.as_str());
                stmt.append(&Fragment::join(&tuples, ", "));
                stmt
            })
            .collect();

        tracing::debug!(
            table = %self.table,
            rows = rows.len(),
            columns = expected,
            rows_per_chunk,
            statements = statements.len(),
            "chunked INSERT",
        );

        Ok(statements)
    }

    /// Compiles the insertion of `records`, reflecting each into its
    /// column values.
    pub fn records<R: Record>(&self, records: &[R]) -> Result<Vec<Fragment>> {
        let rows = records
            .iter()
            .map(Record::values)
            .collect::<Result<Vec<_>>>()?;

        self.compile(&rows)
    }
}

/// Builder of an `UPDATE` statement on the table of model `M`.
///
/// Columns in the `WHERE` clause are qualified with the table name.
pub struct Update<M> {
    table: String,
    assignments: Vec<Fragment>,
    filter: Where<M>,
}

impl<M: Model> Update<M> {
    /// Updates the table of `M`.
    pub fn new() -> Self {
        let table = M::description().table;

        Update {
            filter: Where::new(table.as_str()),
            assignments: Vec::new(),
            table,
        }
    }

    /// Adds `column = ?` to the `SET` clause.
    pub fn set<C, T>(&mut self, column: C, value: T) -> Result<&mut Self>
    where
        C: IntoColumn<M>,
        T: Scalar,
    {
        let mut assignment = column.into_column().resolve_unqualified(&M::description())?;
        assignment.push_sql(" = ");
        assignment.append(&Fragment::placeholder(value.to_storable()?));
        self.assignments.push(assignment);
        Ok(self)
    }

    /// Adds tests to the `WHERE` clause.
    pub fn filter<F>(&mut self, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Where<M>) -> Result<&mut Where<M>>,
    {
        build(&mut self.filter)?;
        Ok(self)
    }

    /// Assembles the statement. Fails if nothing is being set.
    pub fn compile(&self) -> Result<Fragment> {
        if self.assignments.is_empty() {
            return Err(Error::message(format!("no columns to update in `{}`", self.table)));
        }

        let mut stmt = Fragment::new(format!("UPDATE {} SET ", self.table));
        stmt.append(&Fragment::join(&self.assignments, ", "));

        if !self.filter.is_empty() {
            stmt.push_sql(" WHERE ");
            stmt.append(&self.filter.compile());
        }

        tracing::trace!(sql = %stmt.sql, params = stmt.params.len(), "compiled UPDATE");

        Ok(stmt)
    }
}

impl<M: Record> Update<M> {
    /// Updates every column of the row of `record`, other than the
    /// primary key, which identifies the row.
    pub fn record(record: &M) -> Result<Self> {
        let desc = M::description();
        let pk = desc.require_primary_key()?;
        let values = record.values()?;
        let mut update = Update::new();

        for (column, value) in desc.stored_columns().zip(values) {
            if column.primary_key.is_none() {
                update.set(Selector::Raw(column.name.clone()), value)?;
            }
        }

        update.filter(|w| w.equal(pk.name.as_str(), Operand::Value(record.key()?)))?;

        Ok(update)
    }
}

impl<M: Model> Default for Update<M> {
    fn default() -> Self {
        Update::new()
    }
}

impl<M> Debug for Update<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Update")
            .field("table", &self.table)
            .field("assignments", &self.assignments)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Builder of a `DELETE` statement on the table of model `M`.
///
/// Columns in the `WHERE` clause are qualified with the table name.
pub struct Delete<M> {
    table: String,
    filter: Where<M>,
}

impl<M: Model> Delete<M> {
    /// Deletes from the table of `M`.
    pub fn new() -> Self {
        let table = M::description().table;

        Delete {
            filter: Where::new(table.as_str()),
            table,
        }
    }

    /// Deletes the rows whose primary key is one of `keys`.
    pub fn keys<I>(keys: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Scalar,
    {
        let desc = M::description();
        let pk = desc.require_primary_key()?;
        let mut delete = Delete::new();

        delete.filter(|w| w.is_in(pk.name.as_str(), keys))?;

        Ok(delete)
    }

    /// Adds tests to the `WHERE` clause.
    pub fn filter<F>(&mut self, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Where<M>) -> Result<&mut Where<M>>,
    {
        build(&mut self.filter)?;
        Ok(self)
    }

    /// Assembles the statement. Without any filter, this deletes every row.
    pub fn compile(&self) -> Fragment {
        let mut stmt = Fragment::new(format!("DELETE FROM {}", self.table));

        if !self.filter.is_empty() {
            stmt.push_sql(" WHERE ");
            stmt.append(&self.filter.compile());
        }

        tracing::trace!(sql = %stmt.sql, params = stmt.params.len(), "compiled DELETE");

        stmt
    }
}

impl<M: Record> Delete<M> {
    /// Deletes the row of `record`, identified by its primary key.
    pub fn record(record: &M) -> Result<Self> {
        Delete::keys([record.key()?])
    }
}

impl<M: Model> Default for Delete<M> {
    fn default() -> Self {
        Delete::new()
    }
}

impl<M> Debug for Delete<M> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Delete")
            .field("table", &self.table)
            .field("filter", &self.filter)
            .finish()
    }
}
