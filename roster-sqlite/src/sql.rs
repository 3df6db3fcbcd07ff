//! [`QueryPlan`] to parameterized SQLite.
//!
//! User input only ever reaches the database as a bound `?` value. The
//! organization predicate is always rendered first.

use roster_core::{Predicate, QueryPlan, TextTerm};

/// A value bound to one `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

const SELECT_ROWS: &str = "SELECT e.id, e.org_id, e.company_id, c.name AS company, \
e.department_id, d.name AS department, e.position_id, p.title AS position, \
e.first_name, e.last_name, e.email, e.phone, e.location, e.status, e.attributes \
FROM employees e \
JOIN companies c ON c.id = e.company_id AND c.org_id = e.org_id \
JOIN departments d ON d.id = e.department_id AND d.org_id = e.org_id \
JOIN positions p ON p.id = e.position_id AND p.org_id = e.org_id";

const SELECT_COUNT: &str = "SELECT COUNT(*) FROM employees e";

/// Declared `COLLATE NOCASE`, each with an `(org_id, column)` index.
const PREFIX_FIELDS: [&str; 4] = ["first_name", "last_name", "email", "phone"];

#[derive(Debug, Default, Clone, Copy)]
pub struct SqlTranslator;

impl SqlTranslator {
    /// Matching rows, ignoring the page window.
    pub fn count(&self, plan: &QueryPlan) -> SqlQuery {
        let mut query = SqlQuery {
            sql: SELECT_COUNT.to_string(),
            binds: Vec::new(),
        };
        push_where(&mut query, plan);
        query
    }

    /// One page, ordered by id.
    pub fn page(&self, plan: &QueryPlan) -> SqlQuery {
        let mut query = SqlQuery {
            sql: SELECT_ROWS.to_string(),
            binds: Vec::new(),
        };
        push_where(&mut query, plan);
        query.sql.push_str(" ORDER BY e.id ASC LIMIT ? OFFSET ?");
        query.binds.push(SqlValue::Int(plan.limit() as i64));
        query
            .binds
            .push(SqlValue::Int(i64::try_from(plan.offset()).unwrap_or(i64::MAX)));
        query
    }
}

fn push_where(query: &mut SqlQuery, plan: &QueryPlan) {
    query.sql.push_str(" WHERE e.org_id = ?");
    query.binds.push(SqlValue::Text(plan.org_id().as_str().to_string()));

    for predicate in plan.predicates() {
        let (column, values): (&str, Vec<SqlValue>) = match predicate {
            Predicate::Status(set) => (
                "e.status",
                set.iter().map(|s| SqlValue::Text(s.as_str().to_string())).collect(),
            ),
            Predicate::Location(set) => (
                "e.location",
                set.iter().map(|l| SqlValue::Text(l.clone())).collect(),
            ),
            Predicate::Company(set) => ("e.company_id", set.iter().map(|c| SqlValue::Int(c.0)).collect()),
            Predicate::Department(set) => (
                "e.department_id",
                set.iter().map(|d| SqlValue::Int(d.0)).collect(),
            ),
            Predicate::Position(set) => ("e.position_id", set.iter().map(|p| SqlValue::Int(p.0)).collect()),
        };
        push_in(query, column, values);
    }

    let phrases: Vec<String> = plan
        .terms()
        .iter()
        .filter_map(|t| match t {
            TextTerm::Substring(text) => Some(fts_phrase(text)),
            TextTerm::Prefix(_) => None,
        })
        .collect();
    if !phrases.is_empty() {
        query
            .sql
            .push_str(" AND e.id IN (SELECT rowid FROM employees_fts WHERE employees_fts MATCH ?)");
        query.binds.push(SqlValue::Text(phrases.join(" AND ")));
    }

    for term in plan.terms() {
        if let TextTerm::Prefix(text) = term {
            push_prefix(query, plan, text);
        }
    }
}

/// One range per searchable column, unioned, so every arm is served by
/// that column's `(org_id, column)` index.
fn push_prefix(query: &mut SqlQuery, plan: &QueryPlan, prefix: &str) {
    let upper = prefix_upper_bound(prefix);
    let selects: Vec<String> = PREFIX_FIELDS
        .iter()
        .map(|f| match upper {
            Some(_) => format!("SELECT id FROM employees WHERE org_id = ? AND {f} >= ? AND {f} < ?"),
            None => format!("SELECT id FROM employees WHERE org_id = ? AND {f} >= ?"),
        })
        .collect();
    query
        .sql
        .push_str(&format!(" AND e.id IN ({})", selects.join(" UNION ")));

    for _ in PREFIX_FIELDS {
        query.binds.push(SqlValue::Text(plan.org_id().as_str().to_string()));
        query.binds.push(SqlValue::Text(prefix.to_string()));
        if let Some(upper) = &upper {
            query.binds.push(SqlValue::Text(upper.clone()));
        }
    }
}

fn push_in(query: &mut SqlQuery, column: &str, values: Vec<SqlValue>) {
    let marks = vec!["?"; values.len()].join(", ");
    query.sql.push_str(&format!(" AND {column} IN ({marks})"));
    query.binds.extend(values);
}

/// An FTS5 string literal: the term is matched as one phrase, never parsed
/// as query syntax.
pub fn fts_phrase(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

/// Smallest string, under NOCASE ordering, above every string that starts
/// with the lowercase `prefix`. `None` when no such bound exists.
pub fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let next = (last as u32 + 1..=char::MAX as u32).find_map(char::from_u32);
        if let Some(next) = next {
            // NOCASE folds A-Z onto a-z, so they sort as lowercase
            chars.push(if next.is_ascii_uppercase() { '[' } else { next });
            return Some(chars.into_iter().collect());
        }
    }
    None
}
