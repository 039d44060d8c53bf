//! The positional operations: translation from zero-based positions to
//! storage keys, and the renumbering pass that keeps `key == position + 1`
//! contiguous after every cardinality-changing mutation.

#![expect(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

mod slice;
#[cfg(test)]
mod tests;

pub use slice::Slice;

use crate::{
    error::Error,
    obs::sink::{self, MetricsEvent, OpKind},
    row::{Row, RowInput},
    schema::TableSchema,
    session::Session,
    value::Value,
};
use rusqlite::{OptionalExtension, params_from_iter};

impl Session {
    /// Current length: the cached counter in `Cached` mode, a fresh count
    /// in `Live` mode.
    pub fn len(&self) -> Result<usize, Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Length,
        });

        self.stored_len()
    }

    /// Length without a metrics event; the other operations use this so
    /// their internal bookkeeping never counts as caller length calls.
    fn stored_len(&self) -> Result<usize, Error> {
        let binding = self.bound()?;
        match binding.length.stored() {
            Some(count) => Ok(count),
            None => self.count_rows(&binding.table.name),
        }
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// Full row at `position`, negative positions counting from the end.
    pub fn get(&self, position: i64) -> Result<Row, Error> {
        sink::record(MetricsEvent::Op { kind: OpKind::Get });

        let len = self.stored_len()?;
        let key = normalize_position(position, len)? as i64 + 1;
        let table = &self.bound()?.table;

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            table.column_list(),
            table.name,
            table.key_column
        );
        let row = self
            .conn()
            .query_row(&sql, [key], |r| read_row(table, r))
            .optional()?
            .ok_or(Error::OutOfRange { position, len })?;

        sink::record(MetricsEvent::RowsRead { count: 1 });

        Ok(row)
    }

    /// Rows selected by `slice`, in position order. The stride is applied
    /// to the fetched range, not pushed into the storage predicate.
    pub fn get_slice(&self, slice: impl Into<Slice>) -> Result<Vec<Row>, Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Slice,
        });

        let len = self.stored_len()?;
        let normal = slice.into().normalize(len)?;
        if normal.is_empty() {
            return Ok(Vec::new());
        }

        let table = &self.bound()?.table;
        let sql = format!(
            "SELECT {cols} FROM {table} WHERE {key} >= ?1 AND {key} <= ?2 ORDER BY {key}",
            cols = table.column_list(),
            table = table.name,
            key = table.key_column
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let fetched = stmt
            .query_map([normal.start as i64 + 1, normal.stop as i64], |r| {
                read_row(table, r)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        sink::record(MetricsEvent::RowsRead {
            count: fetched.len() as u64,
        });

        Ok(fetched.into_iter().step_by(normal.step).collect())
    }

    /// The named columns for every row, in table order. Not
    /// position-addressed; this is a projection, not a slice.
    pub fn projection(&self, columns: &[&str]) -> Result<Vec<Row>, Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Projection,
        });

        let table = &self.bound()?.table;
        for name in columns {
            if table.column(name).is_none() {
                return Err(Error::schema_invalid(format!(
                    "unknown column `{name}` for table `{}`",
                    table.name
                )));
            }
        }

        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            columns.join(", "),
            table.name,
            table.key_column
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt
            .query_map([], |r| {
                let mut row = Row::new();
                for (index, name) in columns.iter().enumerate() {
                    row.push(*name, r.get::<_, Value>(index)?);
                }
                Ok(row)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        sink::record(MetricsEvent::RowsRead {
            count: rows.len() as u64,
        });

        Ok(rows)
    }

    /// Replace the row at `position`. Any key supplied in the input is
    /// discarded; the stored key never changes here.
    pub fn set(&mut self, position: i64, row: impl Into<RowInput>) -> Result<(), Error> {
        sink::record(MetricsEvent::Op { kind: OpKind::Set });

        let len = self.stored_len()?;
        let key = normalize_position(position, len)? as i64 + 1;
        let table = self.bound()?.table.clone();

        let pairs = row.into().resolve(&table)?;
        if pairs.is_empty() {
            return Err(Error::type_mismatch("row supplies no writable columns"));
        }

        let assignments = pairs
            .iter()
            .enumerate()
            .map(|(index, (name, _))| format!("{name} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?{}",
            table.name,
            table.key_column,
            pairs.len() + 1
        );

        let mut params: Vec<Value> = pairs.into_iter().map(|(_, value)| value).collect();
        params.push(Value::Integer(key));

        self.unit(|session| {
            session.conn().execute(&sql, params_from_iter(params))?;
            Ok(())
        })
    }

    /// Insert at the end, assigning `key = len + 1`.
    pub fn append(&mut self, row: impl Into<RowInput>) -> Result<i64, Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Append,
        });

        let len = self.stored_len()?;
        let table = self.bound()?.table.clone();
        let pairs = row.into().resolve(&table)?;
        let key = len as i64 + 1;

        let mut names = vec![table.key_column.clone()];
        let mut params = vec![Value::Integer(key)];
        for (name, value) in pairs {
            names.push(name);
            params.push(value);
        }

        let placeholders = (1..=params.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.name,
            names.join(", ")
        );

        self.unit(|session| {
            session.conn().execute(&sql, params_from_iter(params))?;
            session.bound_mut()?.length.record_insert();
            Ok(key)
        })
    }

    /// Append each row in order. Deliberately not one bulk statement: each
    /// row is validated as a standalone append, so a failure partway
    /// through leaves the prior appends applied. Callers wanting
    /// all-or-nothing wrap this in `begin` and `rollback` on failure.
    pub fn extend<I>(&mut self, rows: I) -> Result<usize, Error>
    where
        I: IntoIterator,
        I::Item: Into<RowInput>,
    {
        let mut appended = 0;
        for row in rows {
            self.append(row)?;
            appended += 1;
        }

        Ok(appended)
    }

    /// Delete the row at `position` and close the key gap.
    pub fn delete(&mut self, position: i64) -> Result<(), Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Delete,
        });

        let len = self.stored_len()?;
        let key = normalize_position(position, len)? as i64 + 1;
        let table = self.bound()?.table.clone();

        self.unit(|session| {
            session.delete_keys(&table, &[key])?;
            session.renumber_tail(&table, key)?;
            session.bound_mut()?.length.record_delete(1);
            Ok(())
        })
    }

    /// Delete every row the slice selects, then renumber once from the
    /// lowest deleted key. Returns the number of rows deleted.
    pub fn delete_slice(&mut self, slice: impl Into<Slice>) -> Result<usize, Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Delete,
        });

        let len = self.stored_len()?;
        let normal = slice.into().normalize(len)?;
        if normal.is_empty() {
            return Ok(0);
        }

        let table = self.bound()?.table.clone();
        let keys: Vec<i64> = normal.positions().map(|pos| pos as i64 + 1).collect();

        self.unit(|session| {
            session.delete_keys(&table, &keys)?;
            session.renumber_tail(&table, keys[0])?;
            session.bound_mut()?.length.record_delete(keys.len());
            Ok(keys.len())
        })
    }

    /// Remove and return the last row.
    pub fn pop(&mut self) -> Result<Row, Error> {
        self.pop_at(-1)
    }

    /// Remove and return the row at `position`.
    pub fn pop_at(&mut self, position: i64) -> Result<Row, Error> {
        let row = self.get(position)?;
        self.delete(position)?;

        Ok(row)
    }

    /// Delete the first row, in ascending key order, matching every
    /// predicate. Null-valued predicates match stored nulls (IS
    /// semantics), not textual `"None"` or zero.
    pub fn remove(&mut self, predicates: impl Into<RowInput>) -> Result<(), Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Remove,
        });

        let table = self.bound()?.table.clone();
        let pairs = predicates.into().resolve(&table)?;
        if pairs.is_empty() {
            return Err(Error::type_mismatch("remove needs at least one predicate"));
        }

        let key = self
            .find_first(&table, &pairs, 1, None)?
            .ok_or(Error::NoMatch)?;

        self.unit(|session| {
            session.delete_keys(&table, &[key])?;
            session.renumber_tail(&table, key)?;
            session.bound_mut()?.length.record_delete(1);
            Ok(())
        })
    }

    /// Position of the first row matching every predicate, searched in
    /// ascending key order within `[start, stop)`. `stop = None` means no
    /// upper bound.
    pub fn position(
        &self,
        predicates: impl Into<RowInput>,
        start: i64,
        stop: Option<i64>,
    ) -> Result<usize, Error> {
        sink::record(MetricsEvent::Op {
            kind: OpKind::Position,
        });

        let len = self.stored_len()?;
        let n = len as i64;
        let table = &self.bound()?.table;

        let pairs = predicates.into().resolve(table)?;
        if pairs.is_empty() {
            return Err(Error::type_mismatch("position needs at least one predicate"));
        }

        let lo = wrap_bound(start, n).min(n) + 1;
        let hi = stop.map(|stop| wrap_bound(stop, n).min(n));

        let key = self
            .find_first(table, &pairs, lo, hi)?
            .ok_or(Error::NoMatch)?;

        Ok((key - 1) as usize)
    }

    // ---------------------------------------------------------------------
    // Key-level helpers (always inside a unit for mutations)
    // ---------------------------------------------------------------------

    fn delete_keys(&self, table: &TableSchema, keys: &[i64]) -> Result<(), Error> {
        let mut stmt = self.conn().prepare(&format!(
            "DELETE FROM {} WHERE {} = ?1",
            table.name, table.key_column
        ))?;
        for key in keys {
            stmt.execute([*key])?;
        }

        sink::record(MetricsEvent::RowsDeleted {
            count: keys.len() as u64,
        });

        Ok(())
    }

    /// Re-establish key contiguity: every surviving key at or above
    /// `from_key` is shifted down into the first free slot, in ascending
    /// order so no two rows ever hold the same key mid-pass.
    fn renumber_tail(&self, table: &TableSchema, from_key: i64) -> Result<u64, Error> {
        let mut select = self.conn().prepare(&format!(
            "SELECT {key} FROM {table} WHERE {key} >= ?1 ORDER BY {key}",
            key = table.key_column,
            table = table.name
        ))?;
        let survivors = select
            .query_map([from_key], |r| r.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut update = self.conn().prepare(&format!(
            "UPDATE {table} SET {key} = ?1 WHERE {key} = ?2",
            key = table.key_column,
            table = table.name
        ))?;

        let mut next = from_key;
        let mut moved = 0u64;
        for old in survivors {
            if old != next {
                update.execute([next, old])?;
                moved += 1;
            }
            next += 1;
        }

        sink::record(MetricsEvent::RowsRenumbered { count: moved });

        Ok(moved)
    }

    /// Lowest key in `[lo_key, hi_key]` whose row satisfies all
    /// predicates. `hi_key = None` means no upper bound.
    fn find_first(
        &self,
        table: &TableSchema,
        pairs: &[(String, Value)],
        lo_key: i64,
        hi_key: Option<i64>,
    ) -> Result<Option<i64>, Error> {
        let mut clauses = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        for (name, value) in pairs {
            if value.is_null() {
                clauses.push(format!("{name} IS NULL"));
            } else {
                params.push(value.clone());
                clauses.push(format!("{name} = ?{}", params.len()));
            }
        }

        params.push(Value::Integer(lo_key));
        clauses.push(format!("{} >= ?{}", table.key_column, params.len()));

        if let Some(hi) = hi_key {
            params.push(Value::Integer(hi));
            clauses.push(format!("{} <= ?{}", table.key_column, params.len()));
        }

        let sql = format!(
            "SELECT {key} FROM {table} WHERE {clauses} ORDER BY {key} LIMIT 1",
            key = table.key_column,
            table = table.name,
            clauses = clauses.join(" AND ")
        );

        let key = self
            .conn()
            .query_row(&sql, params_from_iter(params), |r| r.get(0))
            .optional()?;

        Ok(key)
    }
}

fn normalize_position(position: i64, len: usize) -> Result<usize, Error> {
    let n = len as i64;
    let normalized = if position < 0 { position + n } else { position };

    if (0..n).contains(&normalized) {
        Ok(normalized as usize)
    } else {
        Err(Error::OutOfRange { position, len })
    }
}

/// Slice-style wrap for search bounds: negative values normalize by the
/// length, as if gaining `n` until non-negative.
fn wrap_bound(bound: i64, n: i64) -> i64 {
    if bound >= 0 {
        bound
    } else if n == 0 {
        0
    } else {
        bound.rem_euclid(n)
    }
}

fn read_row(table: &TableSchema, r: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut row = Row::new();
    for (index, column) in table.columns.iter().enumerate() {
        row.push(column.name.clone(), r.get::<_, Value>(index)?);
    }

    Ok(row)
}
