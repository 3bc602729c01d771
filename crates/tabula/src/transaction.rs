use crate::Result;

use tabula_core::{driver::operation::Transaction as TransactionOp, Connection};

/// An open database transaction on a borrowed connection.
///
/// If dropped without calling [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), the transaction is rolled back.
pub(crate) struct Transaction<'a> {
    conn: &'a mut dyn Connection,
    open: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(conn: &'a mut dyn Connection) -> Result<Transaction<'a>> {
        conn.exec(TransactionOp::Start.into())?;
        Ok(Transaction { conn, open: true })
    }

    pub(crate) fn conn(&mut self) -> &mut dyn Connection {
        &mut *self.conn
    }

    pub(crate) fn commit(mut self) -> Result<()> {
        self.open = false;
        self.conn.exec(TransactionOp::Commit.into())?;
        Ok(())
    }

    pub(crate) fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.conn.exec(TransactionOp::Rollback.into())?;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(err) = self.conn.exec(TransactionOp::Rollback.into()) {
                tracing::warn!(error = %err, "rollback of dropped transaction failed");
            }
        }
    }
}

/// Runs `f` in a transaction, committing on success.
pub(crate) fn transaction<T>(
    conn: &mut dyn Connection,
    f: impl FnOnce(&mut dyn Connection) -> Result<T>,
) -> Result<T> {
    let mut tx = Transaction::begin(conn)?;

    match f(tx.conn()) {
        Ok(ret) => {
            tx.commit()?;
            Ok(ret)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback() {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}
