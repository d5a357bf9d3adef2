//! SQL for the document table. Filters become `json_extract` equality
//! clauses on the stored body.

use anyhow::{bail, Result};
use dreamcars_core::store::{apply_set, document_id, Collection, Document, Filter};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;

/// Row identity plus parsed body
struct Row {
    seq: i64,
    body: Document,
}

/// Build `WHERE` text and its positional parameters.
fn where_clause(collection: Collection, filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
    let mut sql = String::from("collection = ?1");
    let mut params = vec![SqlValue::Text(collection.as_str().to_string())];

    for (field, value) in filter.clauses() {
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("invalid filter field: {:?}", field);
        }

        let param = match value {
            // present and null; a missing field does not match
            Value::Null => {
                sql.push_str(&format!(" AND json_type(body, '$.{}') = 'null'", field));
                continue;
            }
            Value::Bool(b) => SqlValue::Integer(*b as i64),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Real(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        };
        params.push(param);
        sql.push_str(&format!(
            " AND json_extract(body, '$.{}') = ?{}",
            field,
            params.len()
        ));
    }

    Ok((sql, params))
}

fn select_rows(
    conn: &Connection,
    collection: Collection,
    filter: &Filter,
    limit: Option<u32>,
) -> Result<Vec<Row>> {
    let (clause, params) = where_clause(collection, filter)?;
    let mut sql = format!(
        "SELECT seq, body FROM documents WHERE {} ORDER BY seq",
        clause
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(seq, body)| {
            Ok(Row {
                seq,
                body: serde_json::from_str(&body)?,
            })
        })
        .collect()
}

pub fn find(conn: &Connection, collection: Collection, filter: &Filter) -> Result<Vec<Document>> {
    Ok(select_rows(conn, collection, filter, None)?
        .into_iter()
        .map(|row| row.body)
        .collect())
}

pub fn find_one(
    conn: &Connection,
    collection: Collection,
    filter: &Filter,
) -> Result<Option<Document>> {
    Ok(select_rows(conn, collection, filter, Some(1))?
        .into_iter()
        .next()
        .map(|row| row.body))
}

pub fn count(conn: &Connection, collection: Collection, filter: &Filter) -> Result<u64> {
    let (clause, params) = where_clause(collection, filter)?;
    let sql = format!("SELECT COUNT(*) FROM documents WHERE {}", clause);
    let n: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(n as u64)
}

pub fn insert(conn: &Connection, collection: Collection, document: &Document) -> Result<String> {
    let id = document_id(document)?;
    let body = serde_json::to_string(document)?;
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3)",
        (collection.as_str(), &id, &body),
    )?;
    Ok(id)
}

/// Merge `set` into matching rows; returns (matched, modified).
pub fn update(
    conn: &mut Connection,
    collection: Collection,
    filter: &Filter,
    set: &Document,
    limit: Option<u32>,
) -> Result<(u64, u64)> {
    let tx = conn.transaction()?;
    let rows = select_rows(&tx, collection, filter, limit)?;
    let matched = rows.len() as u64;
    let mut modified = 0;

    for mut row in rows {
        if apply_set(&mut row.body, set) {
            tx.execute(
                "UPDATE documents SET body = ?1 WHERE seq = ?2",
                (serde_json::to_string(&row.body)?, row.seq),
            )?;
            modified += 1;
        }
    }

    tx.commit()?;
    Ok((matched, modified))
}

pub fn delete(
    conn: &Connection,
    collection: Collection,
    filter: &Filter,
    limit: Option<u32>,
) -> Result<u64> {
    let (clause, params) = where_clause(collection, filter)?;
    let sql = match limit {
        Some(limit) => format!(
            "DELETE FROM documents WHERE seq IN (SELECT seq FROM documents WHERE {} ORDER BY seq LIMIT {})",
            clause, limit
        ),
        None => format!("DELETE FROM documents WHERE {}", clause),
    };
    let deleted = conn.execute(&sql, params_from_iter(params.iter()))?;
    Ok(deleted as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_params() {
        let filter = Filter::all()
            .eq("owner_email", "a@cars.io")
            .eq("advertise", true)
            .eq("years_of_use", 3);
        let (sql, params) = where_clause(Collection::Products, &filter).unwrap();

        assert_eq!(
            sql,
            "collection = ?1 AND json_extract(body, '$.owner_email') = ?2 \
             AND json_extract(body, '$.advertise') = ?3 AND json_extract(body, '$.years_of_use') = ?4"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[2], SqlValue::Integer(1));

        let (sql, params) =
            where_clause(Collection::Bookings, &Filter::all().eq("transaction_id", Value::Null))
                .unwrap();
        assert_eq!(
            sql,
            "collection = ?1 AND json_type(body, '$.transaction_id') = 'null'"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_where_clause_rejects_odd_fields() {
        let filter = Filter::all().eq("x') OR 1=1 --", "y");
        assert!(where_clause(Collection::Users, &filter).is_err());
    }
}
