//! Table and column management: typed DDL generation and introspection of
//! persisted column definitions back into structured descriptors.


use crate::{error::Error, value::Value};
use rusqlite::{Connection, OptionalExtension};
use std::{fmt, str::FromStr};

///
/// DataType
///
/// The closed set of declared column types. Tokens parse case-insensitively.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataType {
    Null,
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

impl DataType {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Error> {
        match token.to_ascii_uppercase().as_str() {
            "NULL" => Ok(Self::Null),
            "INTEGER" => Ok(Self::Integer),
            "REAL" => Ok(Self::Real),
            "TEXT" => Ok(Self::Text),
            "BLOB" => Ok(Self::Blob),
            "NUMERIC" => Ok(Self::Numeric),
            _ => Err(Error::schema_invalid(format!(
                "invalid datatype token `{token}`"
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

///
/// DefaultValue
///
/// A typed column default. Booleans are written as the literals 0/1 and
/// therefore read back as integers on introspection.
///

#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl DefaultValue {
    /// SQL literal form used in DDL.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Real(n) => format!("{n:?}"),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Inverse of `to_literal`: infer the native default from the literal
    /// form found in a persisted column definition.
    pub(crate) fn parse_literal(literal: &str) -> Self {
        let literal = literal.trim();

        if literal.eq_ignore_ascii_case("NULL") {
            Self::Null
        } else if let Some(inner) = literal
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        {
            Self::Text(inner.replace("''", "'"))
        } else if let Ok(n) = literal.parse::<i64>() {
            Self::Integer(n)
        } else if let Ok(n) = literal.parse::<f64>() {
            Self::Real(n)
        } else {
            Self::Text(literal.to_string())
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Integer(i64::from(*b)),
            Self::Integer(n) => Value::Integer(*n),
            Self::Real(n) => Value::Real(*n),
            Self::Text(s) => Value::Text(s.clone()),
        }
    }
}

///
/// ColumnSpec
///
/// Caller-side column description used by `create_table`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub datatype: DataType,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        }
    }

    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Designate this column as the surrogate-key column.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    fn to_sql(&self) -> String {
        let mut def = format!("{} {}", self.name, self.datatype);
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        if self.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            def.push_str(" DEFAULT ");
            def.push_str(&default.to_literal());
        }

        def
    }
}

///
/// Column
///
/// A structured descriptor recovered from the persisted table definition.
/// Descriptors are never mutated; `add_column` requires the caller to
/// re-introspect rather than patch a live list.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    pub default: Option<DefaultValue>,
}

impl Column {
    pub(crate) fn plain(name: impl Into<String>, datatype: DataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
        }
    }
}

///
/// TableSchema
///
/// The table a session is bound to: name, key column, and the ordered
/// column descriptors loaded at bind time.
///

#[derive(Clone, Debug, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub key_column: String,
    pub columns: Vec<Column>,
}

impl TableSchema {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub(crate) fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Reject any name that could not be safely interpolated into SQL text.
pub(crate) fn validate_identifier(name: &str) -> Result<(), Error> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::schema_invalid(format!("invalid identifier `{name}`")))
    }
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool, Error> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;

    Ok(found.is_some())
}

pub(crate) fn create_table(
    conn: &Connection,
    table: &str,
    specs: &[ColumnSpec],
) -> Result<(), Error> {
    validate_identifier(table)?;
    if specs.is_empty() {
        return Err(Error::schema_invalid("a table needs at least one column"));
    }
    for spec in specs {
        validate_identifier(&spec.name)?;
    }

    let mut keys = specs.iter().filter(|spec| spec.primary_key);
    let key = keys
        .next()
        .ok_or_else(|| Error::schema_invalid("exactly one primary-key column is required"))?;
    if keys.next().is_some() {
        return Err(Error::schema_invalid(
            "exactly one primary-key column is required",
        ));
    }

    let mut defs: Vec<String> = specs.iter().map(ColumnSpec::to_sql).collect();
    defs.push(format!("PRIMARY KEY ({})", key.name));

    conn.execute(&format!("CREATE TABLE {table} ({})", defs.join(", ")), [])?;

    Ok(())
}

pub(crate) fn add_column(
    conn: &Connection,
    table: &str,
    name: &str,
    datatype: DataType,
    not_null: bool,
    default: Option<&DefaultValue>,
) -> Result<(), Error> {
    validate_identifier(table)?;
    validate_identifier(name)?;

    // Existing rows could never satisfy NOT NULL without a usable default.
    if not_null && !matches!(default, Some(value) if *value != DefaultValue::Null) {
        return Err(Error::schema_invalid(format!(
            "column `{name}` is NOT NULL but has no usable default"
        )));
    }

    let mut def = format!("ALTER TABLE {table} ADD COLUMN {name} {datatype}");
    if not_null {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = default {
        def.push_str(" DEFAULT ");
        def.push_str(&default.to_literal());
    }

    conn.execute(&def, [])?;

    Ok(())
}

pub(crate) fn drop_table(conn: &Connection, table: &str) -> Result<(), Error> {
    validate_identifier(table)?;
    conn.execute(&format!("DROP TABLE {table}"), [])?;

    Ok(())
}

/// Load the persisted column definitions of `table` back into descriptors.
pub(crate) fn introspect(conn: &Connection, table: &str) -> Result<Vec<Column>, Error> {
    let sql: Option<String> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;

    let sql = sql.ok_or_else(|| Error::schema_invalid(format!("no such table `{table}`")))?;

    parse_create_table(&sql)
}

// ---------------------------------------------------------------------
// CREATE TABLE parsing
// ---------------------------------------------------------------------

fn parse_create_table(sql: &str) -> Result<Vec<Column>, Error> {
    let open = sql
        .find('(')
        .ok_or_else(|| Error::schema_invalid("malformed table definition"))?;
    let close = sql
        .rfind(')')
        .ok_or_else(|| Error::schema_invalid("malformed table definition"))?;
    let body = &sql[open + 1..close];

    let mut columns: Vec<Column> = Vec::new();
    let mut table_level_key: Option<String> = None;

    for def in split_top_level(body) {
        let def = def.trim();
        if def.is_empty() {
            continue;
        }

        let upper = def.to_ascii_uppercase();
        if upper.starts_with("PRIMARY KEY") {
            table_level_key = Some(parse_key_constraint(def)?);
        } else if upper.starts_with("UNIQUE")
            || upper.starts_with("CHECK")
            || upper.starts_with("FOREIGN KEY")
            || upper.starts_with("CONSTRAINT")
        {
            // Other table-level constraints carry no column descriptor data.
        } else {
            columns.push(parse_column_def(def)?);
        }
    }

    if let Some(key) = table_level_key {
        for column in &mut columns {
            if column.name == key {
                column.primary_key = true;
            }
        }
    }

    Ok(columns)
}

/// Extract the column name from a table-level `PRIMARY KEY (name)` clause.
fn parse_key_constraint(def: &str) -> Result<String, Error> {
    let open = def.find('(');
    let close = def.rfind(')');

    match (open, close) {
        (Some(open), Some(close)) if open < close => {
            let inner = def[open + 1..close].trim();
            let name = inner.split(',').next().unwrap_or(inner).trim();

            Ok(unquote(name).to_string())
        }
        _ => Err(Error::schema_invalid("malformed PRIMARY KEY constraint")),
    }
}

fn parse_column_def(def: &str) -> Result<Column, Error> {
    let tokens = tokenize(def);
    let name = tokens
        .first()
        .ok_or_else(|| Error::schema_invalid("empty column definition"))?;

    let mut column = Column::plain(unquote(name), DataType::Null);

    if let Some(token) = tokens.get(1) {
        // Strip a parenthesized width suffix, e.g. NUMERIC(10,5).
        let bare = token.split('(').next().unwrap_or(token);
        column.datatype = bare.parse()?;
    }

    let mut index = 2;
    while index < tokens.len() {
        let upper = tokens[index].to_ascii_uppercase();
        let next = tokens.get(index + 1).map(|t| t.to_ascii_uppercase());

        match (upper.as_str(), next.as_deref()) {
            ("NOT", Some("NULL")) => {
                column.not_null = true;
                index += 2;
            }
            ("PRIMARY", Some("KEY")) => {
                column.primary_key = true;
                index += 2;
            }
            ("UNIQUE", _) => {
                column.unique = true;
                index += 1;
            }
            ("DEFAULT", _) => {
                let literal = tokens.get(index + 1).ok_or_else(|| {
                    Error::schema_invalid("DEFAULT clause without a literal")
                })?;
                column.default = Some(DefaultValue::parse_literal(literal));
                index += 2;
            }
            _ => index += 1,
        }
    }

    Ok(column)
}

/// Split the body of a CREATE TABLE statement at top-level commas,
/// respecting parentheses and quoted literals.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current);
    }

    parts
}

/// Split a column definition into tokens, keeping quoted literals and
/// parenthesized groups whole.
fn tokenize(def: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in def.chars() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn unquote(name: &str) -> &str {
    let stripped = name
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| name.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')))
        .or_else(|| name.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')));

    stripped.unwrap_or(name)
}
