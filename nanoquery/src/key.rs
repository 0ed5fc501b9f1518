//! Writing primary keys back into records after they have been inserted.

use rusqlite::types::Value;
use crate::{
    model::{PrimaryKeyKind, Record},
    error::{Error, Result},
};


/// The outcome of executing an `INSERT` statement, as reported by the driver.
pub trait InsertOutcome {
    /// The row ID of the last inserted row.
    fn last_insert_id(&self) -> i64;

    /// The number of rows inserted.
    fn rows_affected(&self) -> usize;

    /// Records the key of an inserted row with a caller-assigned key.
    /// Implementations that cannot store it may fail; the failure is ignored.
    fn set_insert_id(&mut self, key: Value) -> Result<()>;
}

/// The plain-data [`InsertOutcome`], returned by
/// [`ConnectionExt::execute_fragment()`](crate::ConnectionExt::execute_fragment).
#[derive(Clone, Default, PartialEq, Debug)]
pub struct Outcome {
    /// The row ID of the last inserted row.
    pub last_insert_id: i64,
    /// The number of rows changed by the statement.
    pub rows_affected: usize,
    /// The key of the last record with a caller-assigned key.
    pub insert_id: Option<Value>,
}

impl InsertOutcome for Outcome {
    fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    fn set_insert_id(&mut self, key: Value) -> Result<()> {
        self.insert_id = Some(key);
        Ok(())
    }
}

/// Assigns primary keys to `records` after they have been inserted, in
/// order, by a single multi-row `INSERT` with the given `outcome`.
///
/// For auto-increment keys, this relies on the database assigning
/// contiguous row IDs to the rows of one statement, so that record `i`
/// gets `last_insert_id - (rows_affected - (i + 1))`. For caller-assigned
/// keys, the key of each record is mirrored onto the outcome instead.
pub fn resolve_keys<O, R>(outcome: &mut O, records: &mut [R]) -> Result<()>
where
    O: ?Sized + InsertOutcome,
    R: Record,
{
    let desc = R::description();
    let kind = desc.require_primary_key()?.primary_key.unwrap_or_default();

    match kind {
        PrimaryKeyKind::AutoIncrement => {
            let last = outcome.last_insert_id();
            let affected = i64::try_from(outcome.rows_affected()).map_err(Error::other)?;

            for (index, record) in (1_i64..).zip(records.iter_mut()) {
                record.set_key(last - (affected - index))?;
            }
        }
        PrimaryKeyKind::Assigned => {
            for record in records.iter() {
                let key = record.key()?;

                if let Err(error) = outcome.set_insert_id(key) {
                    tracing::debug!(model = %desc.type_name, %error, "ignoring failed key write-back");
                }
            }
        }
    }

    Ok(())
}
