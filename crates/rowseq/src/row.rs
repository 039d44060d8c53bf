use crate::{error::Error, schema::TableSchema, value::Value};
use derive_more::{Deref, IntoIterator};

///
/// Row
///
/// Ordered column→value pairs in the bound table's column order. Rows read
/// from storage always include the key column; rows written through the
/// collection never carry one (a supplied key is discarded).
///

#[derive(Clone, Debug, Default, Deref, IntoIterator, PartialEq)]
pub struct Row(#[into_iterator(owned, ref)] Vec<(String, Value)>);

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.0.push((name.into(), value));
    }

    /// Value of the named column, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(column, _)| column.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter().map(|(_, value)| value)
    }
}

impl From<Vec<(String, Value)>> for Row {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        Self(pairs)
    }
}

///
/// RowInput
///
/// A row supplied by the caller, either as a name→value mapping or as a
/// positional sequence following the bound table's column order. The shape
/// is always stated explicitly; it is never inferred from value types.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RowInput {
    ByName(Vec<(String, Value)>),
    ByPosition(Vec<Value>),
}

impl RowInput {
    /// Resolve against the bound schema into name→value pairs, dropping the
    /// key column wherever the input supplies one.
    ///
    /// A positional sequence must cover either every column (the key slot is
    /// then discarded) or every non-key column.
    pub(crate) fn resolve(self, table: &TableSchema) -> Result<Vec<(String, Value)>, Error> {
        match self {
            Self::ByName(pairs) => {
                for (name, _) in &pairs {
                    if table.column(name).is_none() {
                        return Err(Error::schema_invalid(format!(
                            "unknown column `{name}` for table `{}`",
                            table.name
                        )));
                    }
                }

                Ok(pairs
                    .into_iter()
                    .filter(|(name, _)| *name != table.key_column)
                    .collect())
            }
            Self::ByPosition(values) => {
                let total = table.columns.len();
                let writable = total - 1;

                if values.len() == total {
                    Ok(table
                        .columns
                        .iter()
                        .zip(values)
                        .filter(|(column, _)| column.name != table.key_column)
                        .map(|(column, value)| (column.name.clone(), value))
                        .collect())
                } else if values.len() == writable {
                    Ok(table
                        .columns
                        .iter()
                        .filter(|column| column.name != table.key_column)
                        .zip(values)
                        .map(|(column, value)| (column.name.clone(), value))
                        .collect())
                } else {
                    Err(Error::type_mismatch(format!(
                        "positional row has {} values, expected {writable} or {total} \
                         for table `{}`",
                        values.len(),
                        table.name
                    )))
                }
            }
        }
    }
}

impl From<Vec<(String, Value)>> for RowInput {
    fn from(pairs: Vec<(String, Value)>) -> Self {
        Self::ByName(pairs)
    }
}

impl From<Vec<Value>> for RowInput {
    fn from(values: Vec<Value>) -> Self {
        Self::ByPosition(values)
    }
}

impl From<Row> for RowInput {
    fn from(row: Row) -> Self {
        Self::ByName(row.0)
    }
}

/// Build a `RowInput::ByName` from `name => value` pairs.
#[macro_export]
macro_rules! row {
    ($($name:expr => $value:expr),* $(,)?) => {
        $crate::RowInput::ByName(vec![
            $(($name.to_string(), $crate::Value::from($value))),*
        ])
    };
}
