//! Session lifecycle: owns the storage handle, the table binding, and the
//! commit boundary every mutating operation flows through.

#[cfg(test)]
mod tests;

use crate::{
    error::Error,
    length::{LengthMode, LengthState},
    schema::{self, Column, ColumnSpec, DataType, DefaultValue, TableSchema},
};
use rusqlite::Connection;
use std::path::Path;

///
/// Binding
///
/// The table a session is currently attached to, plus its length tracking.
///

#[derive(Debug)]
pub(crate) struct Binding {
    pub(crate) table: TableSchema,
    pub(crate) length: LengthState,
}

///
/// Session
///
/// Exclusive handle over one store file. A fresh session is unbound; every
/// positional operation fails `NotBound` until `bind` attaches a table.
///
/// Mutations outside an explicit `begin`..`commit` run as one unit each
/// (delete, renumber, and counter update commit together). Dropping a
/// session commits any open explicit transaction, so a scope can never
/// silently leak an uncommitted mutation.
///

#[derive(Debug)]
pub struct Session {
    conn: Connection,
    binding: Option<Binding>,
    explicit_txn: bool,
}

impl Session {
    /// Open the store at `path`, creating the file if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path)?;

        Ok(Self {
            conn,
            binding: None,
            explicit_txn: false,
        })
    }

    /// Open a private in-memory store. Used by tests and one-shot jobs.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;

        Ok(Self {
            conn,
            binding: None,
            explicit_txn: false,
        })
    }

    /// Scoped acquisition: open, run `f`, then commit-then-close on every
    /// exit path, including the error path.
    pub fn scope<T>(
        path: impl AsRef<Path>,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut session = Self::open(path)?;
        let result = f(&mut session);
        let closed = session.close();

        match result {
            Ok(value) => closed.map(|()| value),
            Err(err) => Err(err),
        }
    }

    /// Attach this session to `table`. Loads the persisted column
    /// descriptors and, in `Cached` mode, primes the counter with a live
    /// count.
    pub fn bind(
        &mut self,
        table: &str,
        key_column: &str,
        mode: LengthMode,
    ) -> Result<(), Error> {
        schema::validate_identifier(table)?;
        schema::validate_identifier(key_column)?;

        if !schema::table_exists(&self.conn, table)? {
            return Err(Error::schema_invalid(format!("no such table `{table}`")));
        }

        let columns = schema::introspect(&self.conn, table)?;
        if !columns.iter().any(|column| column.name == key_column) {
            return Err(Error::schema_invalid(format!(
                "table `{table}` has no column `{key_column}`"
            )));
        }

        let count = match mode {
            LengthMode::Cached => self.count_rows(table)?,
            LengthMode::Live => 0,
        };

        self.binding = Some(Binding {
            table: TableSchema {
                name: table.to_string(),
                key_column: key_column.to_string(),
                columns,
            },
            length: LengthState::prime(mode, count),
        });

        Ok(())
    }

    /// The bound table's schema, if any.
    #[must_use]
    pub fn table(&self) -> Option<&TableSchema> {
        self.binding.as_ref().map(|binding| &binding.table)
    }

    /// Begin an explicit transaction. Mutations stage inside it until
    /// `commit` or `rollback`; nested begins are absorbed.
    pub fn begin(&mut self) -> Result<(), Error> {
        if !self.explicit_txn {
            self.conn.execute_batch("BEGIN")?;
            self.explicit_txn = true;
        }

        Ok(())
    }

    /// Flush everything staged since `begin`. A no-op without one.
    pub fn commit(&mut self) -> Result<(), Error> {
        if self.explicit_txn {
            self.conn.execute_batch("COMMIT")?;
            self.explicit_txn = false;
        }

        Ok(())
    }

    /// Discard everything staged since `begin`. A cached counter is
    /// re-primed from a live count, since the discarded mutations already
    /// adjusted it.
    pub fn rollback(&mut self) -> Result<(), Error> {
        if self.explicit_txn {
            self.conn.execute_batch("ROLLBACK")?;
            self.explicit_txn = false;

            let cached_table = self
                .binding
                .as_ref()
                .filter(|binding| binding.length.stored().is_some())
                .map(|binding| binding.table.name.clone());

            if let Some(table) = cached_table {
                let count = self.count_rows(&table)?;
                if let Some(binding) = &mut self.binding {
                    binding.length.reprime(count);
                }
            }
        }

        Ok(())
    }

    /// Commit any open transaction and release the handle.
    pub fn close(mut self) -> Result<(), Error> {
        self.commit()
    }

    // ---------------------------------------------------------------------
    // Schema operations
    // ---------------------------------------------------------------------

    pub fn create_table(&self, table: &str, columns: &[ColumnSpec]) -> Result<(), Error> {
        schema::create_table(&self.conn, table, columns)
    }

    /// Add one column to an existing table. The binding keeps serving the
    /// descriptors loaded at bind time; re-bind (or `introspect`) to see
    /// the new column.
    pub fn add_column(
        &self,
        table: &str,
        name: &str,
        datatype: DataType,
        not_null: bool,
        default: Option<DefaultValue>,
    ) -> Result<(), Error> {
        schema::add_column(&self.conn, table, name, datatype, not_null, default.as_ref())
    }

    pub fn introspect(&self, table: &str) -> Result<Vec<Column>, Error> {
        schema::introspect(&self.conn, table)
    }

    pub fn drop_table(&self, table: &str) -> Result<(), Error> {
        schema::drop_table(&self.conn, table)
    }

    // ---------------------------------------------------------------------
    // Internal plumbing shared with the positional operations
    // ---------------------------------------------------------------------

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn bound(&self) -> Result<&Binding, Error> {
        self.binding.as_ref().ok_or(Error::NotBound)
    }

    pub(crate) fn bound_mut(&mut self) -> Result<&mut Binding, Error> {
        self.binding.as_mut().ok_or(Error::NotBound)
    }

    pub(crate) fn count_rows(&self, table: &str) -> Result<usize, Error> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;

        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Run `f` as one atomic unit relative to the commit boundary. Inside
    /// an explicit transaction the caller owns the boundary; otherwise the
    /// unit begins and commits here, rolling back if `f` fails so no
    /// partially-renumbered state is ever visible.
    pub(crate) fn unit<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.explicit_txn {
            return f(self);
        }

        self.conn.execute_batch("BEGIN")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(err) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Commit-then-close on unwind as well; errors here have no caller
        // left to report to.
        if self.explicit_txn {
            let _ = self.conn.execute_batch("COMMIT");
        }
    }
}
