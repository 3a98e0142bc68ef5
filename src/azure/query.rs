//! Log Analytics query bodies and result tables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct Column {
    pub name: String,
}

/// Query result flattened to text, ready for a table widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResp {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Turn a raw query response into a [`TableResp`].
///
/// Exactly one table with at least one column is accepted. The header is
/// `columns` when configured, otherwise the table's own column names.
pub fn normalize(
    response: QueryResponse,
    columns: &[String],
    query: &str,
) -> Result<TableResp, ClientError> {
    if let Some(error) = response.error {
        return Err(ClientError::Service {
            code: error.code,
            message: error.message,
        });
    }

    let mut tables = response.tables;
    let table = match tables.len() {
        0 => {
            return Err(ClientError::NoTables {
                query: query.to_string(),
            });
        }
        1 => tables.remove(0),
        count => {
            return Err(ClientError::TooManyTables {
                count,
                query: query.to_string(),
            });
        }
    };
    if table.columns.is_empty() {
        return Err(ClientError::NoColumns {
            query: query.to_string(),
        });
    }

    let header = if columns.is_empty() {
        table.columns.into_iter().map(|c| c.name).collect()
    } else {
        columns.to_vec()
    };
    let rows = table
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(TableResp { header, rows })
}

/// Display text for one cell. Numbers are rounded to whole values.
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format!("{f:.0}"),
            None => n.to_string(),
        },
        other => other.to_string(),
    }
}
