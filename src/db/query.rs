// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Row-store query description.
//!
//! A [`Query`] is backend-neutral: the REST backend renders it as PostgREST
//! query parameters, the in-memory backend evaluates it against JSON rows.

use serde_json::Value;
use std::cmp::Ordering;

/// Characters that force quoting of an `in.(...)` list item.
const LIST_RESERVED: &[char] = &[',', '(', ')', '"', ' '];

/// Column filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact match: `column = value`
    Eq { column: String, value: String },
    /// List membership: `column IN (values)`
    In { column: String, values: Vec<String> },
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Filter::Eq {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub fn in_list<I, T>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::In { column, .. } => column,
        }
    }

    /// PostgREST operator expression, e.g. `eq.42` or `in.(a,b)`.
    pub fn operator(&self) -> String {
        match self {
            Filter::Eq { value, .. } => format!("eq.{}", value),
            Filter::In { values, .. } => {
                let items: Vec<String> = values.iter().map(|v| quote_list_item(v)).collect();
                format!("in.({})", items.join(","))
            }
        }
    }

    /// Realtime filter string, e.g. `user_id=eq.42`.
    pub fn realtime_expr(&self) -> String {
        format!("{}={}", self.column(), self.operator())
    }

    /// Term inside an `or=(...)` group, e.g. `user_id.eq.42`.
    fn or_term(&self) -> String {
        format!("{}.{}", self.column(), self.operator())
    }

    /// Evaluate the filter against a JSON row.
    pub fn matches(&self, row: &Value) -> bool {
        let Some(cell) = row.get(self.column()).and_then(render_value) else {
            return false;
        };
        match self {
            Filter::Eq { value, .. } => &cell == value,
            Filter::In { values, .. } => values.iter().any(|v| v == &cell),
        }
    }
}

/// Render a JSON scalar the way the row store compares it (as text).
///
/// Returns `None` for null, arrays and objects, which never match a filter.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn quote_list_item(item: &str) -> String {
    if item.contains(LIST_RESERVED) {
        format!("\"{}\"", item.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        item.to_string()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Order-by clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Select/count/update/delete target description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    /// Column list (`*` when unset)
    pub columns: Option<String>,
    /// All must match
    pub filters: Vec<Filter>,
    /// At least one must match (ignored when empty)
    pub any_of: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: None,
            filters: Vec::new(),
            any_of: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn in_list<I, T>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.filters.push(Filter::in_list(column, values));
        self
    }

    pub fn any_of(mut self, filters: Vec<Filter>) -> Self {
        self.any_of = filters;
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query parameters for this query.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];

        params.extend(self.filter_params());

        if let Some(order) = &self.order {
            let dir = match order.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// Filter parameters only, for updates and deletes.
    pub fn filter_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.column().to_string(), f.operator()))
            .collect();

        if !self.any_of.is_empty() {
            let terms: Vec<String> = self.any_of.iter().map(Filter::or_term).collect();
            params.push(("or".to_string(), format!("({})", terms.join(","))));
        }

        params
    }

    /// Whether a row satisfies the filters (ordering and limit aside).
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
            && (self.any_of.is_empty() || self.any_of.iter().any(|f| f.matches(row)))
    }

    /// Apply filters, ordering, limit and column projection to a row set.
    pub fn apply<'a, I>(&self, rows: I) -> Vec<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut matched: Vec<&Value> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(order) = &self.order {
            matched.sort_by(|a, b| {
                let ord = compare_cells(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched.into_iter().map(|r| self.project(r)).collect()
    }

    fn project(&self, row: &Value) -> Value {
        let Some(columns) = self.columns.as_deref().filter(|c| c.trim() != "*") else {
            return row.clone();
        };
        let Value::Object(map) = row else {
            return row.clone();
        };
        let projected = columns
            .split(',')
            .map(str::trim)
            .filter_map(|c| map.get(c).map(|v| (c.to_string(), v.clone())))
            .collect();
        Value::Object(projected)
    }
}

/// Compare two cells; RFC 3339 timestamps sort correctly as text when they
/// share a format, so strings are parsed as timestamps first.
fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_for_recent_activity_query() {
        let query = Query::table("likes")
            .in_list("video_id", ["a", "b"])
            .order_by("created_at", Direction::Descending)
            .limit(5);

        let params = query.to_params();
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("video_id".to_string(), "in.(a,b)".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_params_for_visibility_or_group() {
        let query = Query::table("videos").any_of(vec![
            Filter::eq("is_coaches_only", false),
            Filter::eq("user_id", "u1"),
        ]);

        let params = query.to_params();
        assert!(params.contains(&(
            "or".to_string(),
            "(is_coaches_only.eq.false,user_id.eq.u1)".to_string()
        )));
    }

    #[test]
    fn test_in_list_quotes_reserved_characters() {
        let filter = Filter::in_list("title", ["plain", "with,comma"]);
        assert_eq!(filter.operator(), "in.(plain,\"with,comma\")");
    }

    #[test]
    fn test_realtime_expression() {
        assert_eq!(
            Filter::eq("video_id", "v1").realtime_expr(),
            "video_id=eq.v1"
        );
    }

    #[test]
    fn test_matches_compares_as_text() {
        let row = json!({ "is_coaches_only": false, "user_id": "u2" });
        assert!(Filter::eq("is_coaches_only", false).matches(&row));
        assert!(!Filter::eq("user_id", "u1").matches(&row));
        assert!(!Filter::eq("missing", "x").matches(&row));

        let null_row = json!({ "user_id": null });
        assert!(!Filter::eq("user_id", "null").matches(&null_row));
    }

    #[test]
    fn test_apply_orders_limits_and_projects() {
        let rows = vec![
            json!({ "id": 1, "title": "old", "created_at": "2024-01-01T00:00:00Z" }),
            json!({ "id": 2, "title": "new", "created_at": "2024-01-03T00:00:00+00:00" }),
            json!({ "id": 3, "title": "mid", "created_at": "2024-01-02T00:00:00.500Z" }),
        ];

        let result = Query::table("videos")
            .select("id, title")
            .order_by("created_at", Direction::Descending)
            .limit(2)
            .apply(&rows);

        assert_eq!(
            result,
            vec![json!({ "id": 2, "title": "new" }), json!({ "id": 3, "title": "mid" })]
        );
    }
}
