//! Executing compiled statements on SQLite connections.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use rusqlite::types::Value;
use crate::{
    fragment::Fragment,
    model::Record,
    batch::Insert,
    key::{resolve_keys, Outcome},
    error::{Error, Result},
};


/// This extension trait defines methods on [`Connection`] for executing
/// compiled [`Fragment`]s.
#[allow(private_bounds)]
pub trait ConnectionExt: Sealed {
    /// Executes a statement that does not return rows, binding its
    /// parameters positionally.
    ///
    /// Fails if the number of placeholders in the SQL text differs from
    /// the number of parameters.
    fn execute_fragment(&self, fragment: &Fragment) -> Result<Outcome>;

    /// Executes a query, returning each row as a vector of dynamically-typed values.
    fn query_fragment(&self, fragment: &Fragment) -> Result<Vec<Vec<Value>>>;

    /// Inserts `records` in as few statements as the parameter limit
    /// allows, then writes the generated primary keys back into them.
    ///
    /// It opens a single transaction for all of the statements, which
    /// prevents others from observing the data in a partially-inserted state.
    fn insert_records<R: Record>(&mut self, records: &mut [R]) -> Result<()>;
}

impl ConnectionExt for Connection {
    fn execute_fragment(&self, fragment: &Fragment) -> Result<Outcome> {
        let mut stmt = self.prepare_cached(&fragment.sql)?;
        bind(&mut stmt, fragment)?;

        let rows_affected = stmt.raw_execute()?;

        Ok(Outcome {
            last_insert_id: self.last_insert_rowid(),
            rows_affected,
            insert_id: None,
        })
    }

    fn query_fragment(&self, fragment: &Fragment) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self.prepare_cached(&fragment.sql)?;
        bind(&mut stmt, fragment)?;

        let columns = stmt.column_count();
        let mut rows = stmt.raw_query();
        let mut result = Vec::new();

        while let Some(row) = rows.next()? {
            let values = (0..columns)
                .map(|index| row.get::<_, Value>(index))
                .collect::<Result<Vec<_>, _>>()?;

            result.push(values);
        }

        Ok(result)
    }

    fn insert_records<R: Record>(&mut self, records: &mut [R]) -> Result<()> {
        let txn = self.transaction_with_behavior(TransactionBehavior::Immediate)?;
        txn.insert_records(records)?;
        txn.commit().map_err(Error::from)
    }
}

/// This extension trait defines convenience methods on [`Transaction`].
#[allow(private_bounds)]
pub trait TransactionExt: Sealed {
    /// Inserts `records` in as few statements as the parameter limit
    /// allows, then writes the generated primary keys back into them.
    ///
    /// This is an escape hatch for when you can't borrow the [`Connection`]
    /// mutably. It is recommended to use [`ConnectionExt::insert_records()`]
    /// by default, unless you can't provide unique access to the [`Connection`].
    fn insert_records<R: Record>(&self, records: &mut [R]) -> Result<()>;
}

impl TransactionExt for Transaction<'_> {
    fn insert_records<R: Record>(&self, records: &mut [R]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let insert = Insert::of::<R>();
        let statements = insert.records(records)?;
        let chunks = records.chunks_mut(insert.rows_per_chunk()?);

        for (stmt, chunk) in statements.iter().zip(chunks) {
            let mut outcome = self.execute_fragment(stmt)?;
            resolve_keys(&mut outcome, chunk)?;
        }

        Ok(())
    }
}

/// Binds the parameters of `fragment` to a statement prepared from its SQL.
fn bind(stmt: &mut rusqlite::Statement<'_>, fragment: &Fragment) -> Result<()> {
    let expected = stmt.parameter_count();
    let actual = fragment.params.len();

    if expected != actual {
        return Err(Error::ParamCountMismatch { expected, actual });
    }

    for (index, value) in fragment.params.iter().enumerate() {
        stmt.raw_bind_parameter(index + 1, value)?;
    }

    Ok(())
}

trait Sealed {}

impl Sealed for Connection {}
impl Sealed for Transaction<'_> {}
