/// Query Building and Execution Module
///
/// This module turns table names and records into parameterized SQL and
/// runs single statements, reshaping whatever SQLite returns into an
/// [`Outcome`]. Identifiers are quoted and spliced into the statement text;
/// values are always bound as named parameters.

use crate::core::{Record, Result, Value, VaultError};
use rusqlite::types::ToSql;
use rusqlite::Connection;
use tracing::debug;

/// Named parameters in bind order, e.g. `(":new_0", Value::Integer(31))`.
pub type NamedParams = Vec<(String, Value)>;

/// SQL statement text together with its bound values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: NamedParams,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        SqlQuery {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: NamedParams) -> Self {
        self.params = params;
        self
    }
}

/// How many rows a caller wants back from [`QueryExecutor::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// Every result row
    All,
    /// The first row, or a change indicator for statements without rows
    One,
}

/// Normalized result of running one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// All result rows (`Fetch::All`), possibly none
    Rows(Vec<Record>),
    /// First result row (`Fetch::One`)
    Row(Record),
    /// Rows touched by an INSERT, UPDATE or DELETE; always at least one
    Changed(usize),
    /// A statement without rows or a change count (DDL, most pragmas) succeeded
    Done,
    /// The statement succeeded but produced no row or changed nothing
    Empty,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// Number of changed rows; zero for anything but `Changed`.
    pub fn changed(&self) -> usize {
        match self {
            Outcome::Changed(n) => *n,
            _ => 0,
        }
    }

    pub fn into_rows(self) -> Vec<Record> {
        match self {
            Outcome::Rows(rows) => rows,
            Outcome::Row(row) => vec![row],
            _ => Vec::new(),
        }
    }

    pub fn into_row(self) -> Option<Record> {
        match self {
            Outcome::Row(row) => Some(row),
            Outcome::Rows(rows) => rows.into_iter().next(),
            _ => None,
        }
    }
}

/// Represents different SQL statement types for result shaping
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Pragma,
    Other,
}

impl StatementKind {
    /// Determines the statement type from its leading keyword.
    ///
    /// Leading `--` and `/* */` comments are skipped, and a `WITH` statement
    /// is classified by the first verb after its common table expressions.
    pub fn from_sql(sql: &str) -> Self {
        let body = skip_comments(sql);
        let keyword = leading_word(body).to_uppercase();
        if keyword == "WITH" {
            return main_verb(&body[keyword.len()..]);
        }
        Self::from_keyword(&keyword)
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "SELECT" | "VALUES" => StatementKind::Select,
            "INSERT" | "REPLACE" => StatementKind::Insert,
            "UPDATE" => StatementKind::Update,
            "DELETE" => StatementKind::Delete,
            "CREATE" => StatementKind::Create,
            "PRAGMA" => StatementKind::Pragma,
            _ => StatementKind::Other,
        }
    }

    /// Whether SQLite's change counter is meaningful for this statement
    pub fn reports_changes(self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }
}

fn skip_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |i| &rest[i + 1..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |i| &rest[i + 2..]);
        } else {
            return sql;
        }
    }
}

fn leading_word(sql: &str) -> &str {
    let end = sql
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(sql.len());
    &sql[..end]
}

/// First statement verb outside parentheses, quotes and comments.
fn main_verb(sql: &str) -> StatementKind {
    let mut depth = 0usize;
    let mut rest = sql;
    while !rest.is_empty() {
        rest = skip_comments(rest);
        let Some(c) = rest.chars().next() else { break };
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                rest = rest[1..].find(close).map_or("", |i| &rest[i + 2..]);
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let word = leading_word(rest);
                if depth == 0 {
                    let kind = StatementKind::from_keyword(&word.to_uppercase());
                    if !matches!(kind, StatementKind::Other | StatementKind::Create | StatementKind::Pragma) {
                        return kind;
                    }
                }
                rest = &rest[word.len()..];
                continue;
            }
            _ => {}
        }
        rest = &rest[c.len_utf8()..];
    }
    StatementKind::Other
}

/// Runs single statements on a borrowed connection or transaction.
pub struct QueryExecutor<'a> {
    connection: &'a Connection,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(connection: &'a Connection) -> Self {
        QueryExecutor { connection }
    }

    /// Executes `query` and shapes the result according to `fetch`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Database` if the statement cannot be prepared,
    /// a parameter cannot be bound, or execution fails.
    pub fn run(&self, query: &SqlQuery, fetch: Fetch) -> Result<Outcome> {
        debug!(sql = %query.sql, params = query.params.len(), "executing statement");

        let mut stmt = self.connection.prepare(&query.sql)?;
        let bound: Vec<(&str, &dyn ToSql)> = query
            .params
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        if stmt.column_count() == 0 {
            let changes = stmt.execute(bound.as_slice())?;
            return Ok(match fetch {
                Fetch::All => Outcome::Rows(Vec::new()),
                Fetch::One if !StatementKind::from_sql(&query.sql).reports_changes() => {
                    Outcome::Done
                }
                Fetch::One if changes > 0 => Outcome::Changed(changes),
                Fetch::One => Outcome::Empty,
            });
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(bound.as_slice())?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, column) in columns.iter().enumerate() {
                record.insert(column.as_str(), Value::from(row.get_ref(i)?));
            }
            records.push(record);
            if fetch == Fetch::One {
                break;
            }
        }

        Ok(match fetch {
            Fetch::All => Outcome::Rows(records),
            Fetch::One => records.into_iter().next().map_or(Outcome::Empty, Outcome::Row),
        })
    }
}

/// Quotes an identifier for splicing into statement text.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list<'r>(columns: impl Iterator<Item = &'r str>) -> String {
    columns.map(quote_identifier).collect::<Vec<_>>().join(", ")
}

/// Builds `"a" IS :p0 AND "b" IS :p1` plus its parameters. `IS` rather than
/// `=` so a null criterion matches null cells.
fn conditions(criteria: &Record, prefix: &str) -> (String, NamedParams) {
    let mut clauses = Vec::with_capacity(criteria.len());
    let mut params = Vec::with_capacity(criteria.len());
    for (i, (column, value)) in criteria.iter().enumerate() {
        let name = format!(":{}{}", prefix, i);
        clauses.push(format!("{} IS {}", quote_identifier(column), name));
        params.push((name, value.clone()));
    }
    (clauses.join(" AND "), params)
}

fn where_clause(criteria: &Record, prefix: &str) -> (String, NamedParams) {
    if criteria.is_empty() {
        return (String::new(), Vec::new());
    }
    let (clause, params) = conditions(criteria, prefix);
    (format!(" WHERE {}", clause), params)
}

/// `SELECT * FROM table`
pub fn select_all(table: &str) -> SqlQuery {
    SqlQuery::new(format!("SELECT * FROM {};", quote_identifier(table)))
}

/// INSERT with the record's keys as the column list.
pub fn insert(table: &str, record: &Record) -> Result<SqlQuery> {
    if record.is_empty() {
        return Err(VaultError::EmptyFields("record"));
    }
    let mut placeholders = Vec::with_capacity(record.len());
    let mut params = Vec::with_capacity(record.len());
    for (i, value) in record.values().enumerate() {
        let name = format!(":col_{}", i);
        placeholders.push(name.clone());
        params.push((name, value.clone()));
    }
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_identifier(table),
        column_list(record.columns()),
        placeholders.join(", ")
    );
    Ok(SqlQuery::new(sql).with_params(params))
}

/// Positional INSERT template for a fixed column order, used by bulk loads.
pub fn insert_template(table: &str, columns: &[String]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        quote_identifier(table),
        column_list(columns.iter().map(String::as_str)),
        placeholders.join(", ")
    )
}

/// SELECT with equality conditions ANDed across `criteria`; empty criteria select everything.
pub fn select(table: &str, criteria: &Record) -> SqlQuery {
    let (clause, params) = where_clause(criteria, "eq_");
    SqlQuery::new(format!("SELECT * FROM {}{};", quote_identifier(table), clause))
        .with_params(params)
}

/// UPDATE with `new_`/`old_` namespaced parameters so a column may appear on both sides.
pub fn update(table: &str, old: &Record, new: &Record) -> Result<SqlQuery> {
    if new.is_empty() {
        return Err(VaultError::EmptyFields("update values"));
    }
    if old.is_empty() {
        return Err(VaultError::EmptyFields("update criteria"));
    }

    let mut assignments = Vec::with_capacity(new.len());
    let mut params = Vec::with_capacity(new.len() + old.len());
    for (i, (column, value)) in new.iter().enumerate() {
        let name = format!(":new_{}", i);
        assignments.push(format!("{} = {}", quote_identifier(column), name));
        params.push((name, value.clone()));
    }
    let (clause, old_params) = conditions(old, "old_");
    params.extend(old_params);

    let sql = format!(
        "UPDATE {} SET {} WHERE {};",
        quote_identifier(table),
        assignments.join(", "),
        clause
    );
    Ok(SqlQuery::new(sql).with_params(params))
}

pub fn delete(table: &str, criteria: &Record) -> Result<SqlQuery> {
    if criteria.is_empty() {
        return Err(VaultError::EmptyFields("delete criteria"));
    }
    let (clause, params) = where_clause(criteria, "eq_");
    Ok(SqlQuery::new(format!("DELETE FROM {}{};", quote_identifier(table), clause))
        .with_params(params))
}

/// `SELECT COUNT(*) AS count`, optionally filtered.
pub fn count(table: &str, criteria: Option<&Record>) -> SqlQuery {
    let (clause, params) = criteria
        .map(|c| where_clause(c, "eq_"))
        .unwrap_or_default();
    SqlQuery::new(format!(
        "SELECT COUNT(*) AS count FROM {}{};",
        quote_identifier(table),
        clause
    ))
    .with_params(params)
}

/// Name given to the single-column index on `table.column`.
pub fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column)
}

/// Index name is `idx_<table>_<column>`.
pub fn create_index(table: &str, column: &str, unique: bool) -> SqlQuery {
    let index_name = index_name(table, column);
    SqlQuery::new(format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
        if unique { "UNIQUE " } else { "" },
        quote_identifier(&index_name),
        quote_identifier(table),
        quote_identifier(column)
    ))
}
