//! Minimal SELECT/condition builder over positional SQLite binds.
//!
//! # Responsibility
//! - Compose equality, membership and grouped AND/OR conditions.
//! - Render SQL text plus bind values in one pass so placeholders and
//!   values never drift apart.
//!
//! # Invariants
//! - Column names and join clauses come from code, never from user input;
//!   user input only ever travels as bind values.
//! - An empty membership list renders as a condition that matches nothing.
//! - A membership list travels as one JSON array bind, so its size is not
//!   bounded by SQLite's host parameter limit.

use crate::repo::error::RepoResult;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::{Number, Value as JsonValue};

/// One WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
    /// Every nested condition must hold; empty is always true.
    All(Vec<Condition>),
    /// Any nested condition must hold; empty is always false.
    Any(Vec<Condition>),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn is_in<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::IsNull(column.into())
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::All(conditions)
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::Any(conditions)
    }

    fn render(&self, sql: &mut String, binds: &mut Vec<Value>) {
        match self {
            Self::Eq(column, value) => {
                sql.push_str(column);
                sql.push_str(" = ?");
                binds.push(value.clone());
            }
            Self::In(_, values) if values.is_empty() => sql.push_str("0 = 1"),
            Self::In(column, values) => {
                sql.push_str(column);
                sql.push_str(" IN (SELECT value FROM json_each(?))");
                binds.push(Value::Text(json_array(values)));
            }
            Self::IsNull(column) => {
                sql.push_str(column);
                sql.push_str(" IS NULL");
            }
            Self::All(conditions) => render_group(conditions, " AND ", "1 = 1", sql, binds),
            Self::Any(conditions) => render_group(conditions, " OR ", "0 = 1", sql, binds),
        }
    }
}

/// Encodes membership values as a JSON array for `json_each`.
///
/// Blobs have no JSON form and travel as their lossy UTF-8 text.
fn json_array(values: &[Value]) -> String {
    let members: Vec<JsonValue> = values
        .iter()
        .map(|value| match value {
            Value::Null => JsonValue::Null,
            Value::Integer(number) => JsonValue::from(*number),
            Value::Real(number) => {
                Number::from_f64(*number).map_or(JsonValue::Null, JsonValue::Number)
            }
            Value::Text(text) => JsonValue::from(text.as_str()),
            Value::Blob(bytes) => JsonValue::from(String::from_utf8_lossy(bytes).into_owned()),
        })
        .collect();
    JsonValue::Array(members).to_string()
}

fn render_group(
    conditions: &[Condition],
    separator: &str,
    when_empty: &str,
    sql: &mut String,
    binds: &mut Vec<Value>,
) {
    if conditions.is_empty() {
        sql.push_str(when_empty);
        return;
    }
    sql.push('(');
    for (index, condition) in conditions.iter().enumerate() {
        if index > 0 {
            sql.push_str(separator);
        }
        condition.render(sql, binds);
    }
    sql.push(')');
}

/// SELECT statement under construction.
///
/// Top-level conditions are joined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    from: String,
    columns: Vec<String>,
    joins: Vec<String>,
    conditions: Vec<Condition>,
    order_by: Vec<String>,
}

impl SelectQuery {
    /// Starts a query over `table`, optionally with an alias (`"materials m"`).
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
        }
    }

    pub fn select(&mut self, column: impl Into<String>) -> &mut Self {
        self.columns.push(column.into());
        self
    }

    /// Adds a full join clause, e.g. `INNER JOIN t ON t.a = m.id`.
    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.joins.push(clause.into());
        self
    }

    pub fn filter(&mut self, condition: Condition) -> &mut Self {
        self.conditions.push(condition);
        self
    }

    pub fn where_eq(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.filter(Condition::eq(column, value))
    }

    pub fn where_in<I, V>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filter(Condition::is_in(column, values))
    }

    pub fn order_by(&mut self, expression: impl Into<String>) -> &mut Self {
        self.order_by.push(expression.into());
        self
    }

    /// Renders SQL text and the bind values for its placeholders.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::from("SELECT ");
        let mut binds = Vec::new();

        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.from);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            for (index, condition) in self.conditions.iter().enumerate() {
                if index > 0 {
                    sql.push_str(" AND ");
                }
                condition.render(&mut sql, &mut binds);
            }
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        (sql, binds)
    }

    /// Runs the query and hands every row to `visit`, in result order.
    pub fn for_each_row(
        &self,
        conn: &Connection,
        mut visit: impl FnMut(&Row<'_>) -> RepoResult<()>,
    ) -> RepoResult<()> {
        let (sql, binds) = self.to_sql();
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        while let Some(row) = rows.next()? {
            visit(row)?;
        }
        Ok(())
    }

    /// Runs the query and collects the first column as integer ids.
    pub fn fetch_ids(&self, conn: &Connection) -> RepoResult<Vec<i64>> {
        let mut ids = Vec::new();
        self.for_each_row(conn, |row| {
            ids.push(row.get::<_, i64>(0)?);
            Ok(())
        })?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::{Condition, SelectQuery};
    use rusqlite::types::Value;
    use rusqlite::Connection;

    #[test]
    fn renders_joins_conditions_and_order() {
        let mut query = SelectQuery::from("materials m");
        query
            .select("m.id")
            .join("INNER JOIN structure_materials sm ON sm.material_id = m.id")
            .where_eq("m.parent_id", 7_i64)
            .where_in("m.id", [1_i64, 2])
            .order_by("m.priority ASC");

        let (sql, binds) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT m.id FROM materials m \
             INNER JOIN structure_materials sm ON sm.material_id = m.id \
             WHERE m.parent_id = ? AND m.id IN (SELECT value FROM json_each(?)) \
             ORDER BY m.priority ASC"
        );
        assert_eq!(
            binds,
            vec![Value::Integer(7), Value::Text("[1,2]".to_string())]
        );
    }

    #[test]
    fn nested_groups_keep_bind_order() {
        let mut query = SelectQuery::from("material_fields");
        query.filter(Condition::any(vec![
            Condition::all(vec![
                Condition::is_in("field_id", [11_i64]),
                Condition::eq("locale", "en".to_string()),
            ]),
            Condition::is_in("field_id", [10_i64]),
        ]));

        let (sql, binds) = query.to_sql();
        assert!(sql.ends_with(
            "WHERE ((field_id IN (SELECT value FROM json_each(?)) AND locale = ?) \
             OR field_id IN (SELECT value FROM json_each(?)))"
        ));
        assert_eq!(
            binds,
            vec![
                Value::Text("[11]".to_string()),
                Value::Text("en".to_string()),
                Value::Text("[10]".to_string())
            ]
        );
    }

    #[test]
    fn empty_membership_and_groups_render_constants() {
        let mut query = SelectQuery::from("materials");
        query
            .where_in("id", Vec::<i64>::new())
            .filter(Condition::all(Vec::new()))
            .filter(Condition::any(Vec::new()))
            .filter(Condition::is_null("parent_id"));

        let (sql, binds) = query.to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM materials WHERE 0 = 1 AND 1 = 1 AND 0 = 1 AND parent_id IS NULL"
        );
        assert!(binds.is_empty());
    }

    #[test]
    fn membership_lists_beyond_the_parameter_limit_bind_once() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL);
             INSERT INTO items (id, label) VALUES (3, 'c'), (40000, 'x'), (50000, 'y');",
        )
        .unwrap();

        let mut by_id = SelectQuery::from("items");
        by_id
            .select("id")
            .where_in("id", 1_i64..=40_000)
            .order_by("id ASC");
        let (_, binds) = by_id.to_sql();
        assert_eq!(binds.len(), 1);
        assert_eq!(by_id.fetch_ids(&conn).unwrap(), vec![3, 40_000]);

        let mut by_label = SelectQuery::from("items");
        by_label
            .select("id")
            .where_in("label", ["y".to_string(), "it's".to_string()]);
        assert_eq!(by_label.fetch_ids(&conn).unwrap(), vec![50_000]);
    }
}
