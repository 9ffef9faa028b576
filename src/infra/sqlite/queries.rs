use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::params;
use rusqlite::types::Value;

use crate::domain::entities::args::QueryArgs;
use crate::domain::entities::query::{Literal, SqlStatement};
use crate::domain::entities::record::{Record, RecordSet};
use crate::infra::sqlite::schema::open_connection;

fn value_to_literal(value: Value) -> Literal {
    match value {
        Value::Null => Literal::Null,
        Value::Integer(v) => Literal::Int(v),
        Value::Real(v) => Literal::Real(v),
        Value::Text(v) => Literal::Text(v),
        Value::Blob(v) => Literal::Text(String::from_utf8_lossy(&v).into_owned()),
    }
}

pub fn count_rows(db_path: &Path, statement: &SqlStatement) -> Result<i64> {
    let conn = open_connection(db_path)?;
    conn.query_row(
        &statement.sql,
        rusqlite::params_from_iter(statement.params.iter()),
        |row| row.get(0),
    )
    .with_context(|| format!("failed to run count query: {}", statement.sql))
}

pub fn fetch_rows(db_path: &Path, statement: &SqlStatement) -> Result<RecordSet> {
    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(&statement.sql)
        .with_context(|| format!("failed to prepare query: {}", statement.sql))?;

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let names: Arc<[String]> = columns.clone().into();
    let width = columns.len();

    let mut rows = stmt
        .query(rusqlite::params_from_iter(statement.params.iter()))
        .context("failed to run query")?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().context("failed to read row")? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let value: Value = row.get(idx).context("failed to read cell")?;
            values.push(value_to_literal(value));
        }
        records.push(Record::new(Arc::clone(&names), values));
    }

    Ok(RecordSet {
        columns,
        rows: records,
    })
}

pub fn fetch_first_row(db_path: &Path, statement: &SqlStatement) -> Result<Option<Record>> {
    let mut set = fetch_rows(db_path, statement)?;
    if set.rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(set.rows.swap_remove(0)))
}

pub fn load_session_args(
    db_path: &Path,
    grid_name: &str,
    session_key: &str,
) -> Result<Option<QueryArgs>> {
    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(
            "SELECT args_json
             FROM grid_session
             WHERE grid_name = ?1 AND session_key = ?2",
        )
        .context("failed to prepare session query")?;

    let mut rows = stmt
        .query_map(params![grid_name, session_key], |row| row.get::<_, String>(0))
        .context("failed to query session args")?;

    let first = rows.next();
    match first {
        Some(json) => {
            let json = json.context("failed to read session args")?;
            let args = serde_json::from_str(&json)
                .with_context(|| format!("failed to decode session args for {grid_name}"))?;
            Ok(Some(args))
        }
        None => Ok(None),
    }
}

pub fn save_session_args(
    db_path: &Path,
    grid_name: &str,
    session_key: &str,
    args: &QueryArgs,
) -> Result<()> {
    let json = serde_json::to_string(args).context("failed to encode session args")?;
    let conn = open_connection(db_path)?;
    conn.execute(
        "INSERT INTO grid_session(grid_name, session_key, args_json)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(grid_name, session_key) DO UPDATE SET
             args_json = excluded.args_json,
             updated_at = CURRENT_TIMESTAMP",
        params![grid_name, session_key, json],
    )
    .context("failed to upsert session args")?;
    Ok(())
}
