// SPDX-License-Identifier: Apache-2.0

//! Catalog reference checks for federated queries.
//!
//! Every table a federated query reads must be named as
//! `catalog.schema.object`, and the catalog must be one the engine has been
//! configured with. The check runs locally before anything is sent, so a
//! typo in a catalog name fails fast with a `ValidationError`.

use std::collections::HashSet;
use std::fmt;

use sqlparser::ast::{ObjectName, ObjectNamePart, Query, Select, SetExpr, Statement, TableFactor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::engine::error::{EngineError, EngineResult};

/// A fully qualified `catalog.schema.object` table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub catalog: String,
    pub schema: String,
    pub object: String,
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.object)
    }
}

fn part_value(part: &ObjectNamePart) -> String {
    match part {
        ObjectNamePart::Identifier(ident) => ident.value.clone(),
        _ => String::new(),
    }
}

fn name_parts(name: &ObjectName) -> Vec<String> {
    name.0.iter().map(part_value).collect()
}

/// Parses `sql` and returns every table it reads, in order of appearance.
///
/// Fails with `ValidationError` when the query is not a single SELECT, when a
/// table is not three-part qualified, or when its catalog is not in
/// `known_catalogs` (compared case-insensitively).
pub fn validate_catalog_refs(
    sql: &str,
    known_catalogs: &HashSet<String>,
) -> EngineResult<Vec<QualifiedName>> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql.trim())
        .map_err(|e| EngineError::syntax_error(format!("Failed to parse federated query: {e}")))?;

    let [statement] = statements.as_slice() else {
        return Err(EngineError::validation(
            "Federated queries must be a single statement",
        ));
    };

    let Statement::Query(query) = statement else {
        return Err(EngineError::validation(
            "Federated queries must be SELECT statements",
        ));
    };

    let mut walker = RefCollector::default();
    walker.query(query);

    let mut refs = Vec::with_capacity(walker.refs.len());
    for parts in walker.refs {
        // Single-part names that point at a CTE are local to the query.
        if parts.len() == 1 && walker.cte_names.contains(&parts[0].to_lowercase()) {
            continue;
        }

        let [catalog, schema, object] = parts.as_slice() else {
            return Err(EngineError::validation(format!(
                "Table reference '{}' must be qualified as catalog.schema.table",
                parts.join(".")
            )));
        };

        if !known_catalogs.contains(&catalog.to_lowercase()) {
            let mut known: Vec<&str> = known_catalogs.iter().map(String::as_str).collect();
            known.sort_unstable();
            return Err(EngineError::validation(format!(
                "Unknown catalog '{}' in '{}.{}.{}' (configured: {})",
                catalog,
                catalog,
                schema,
                object,
                known.join(", ")
            )));
        }

        refs.push(QualifiedName {
            catalog: catalog.to_lowercase(),
            schema: schema.clone(),
            object: object.clone(),
        });
    }

    if refs.is_empty() {
        return Err(EngineError::validation(
            "Federated query does not read from any table",
        ));
    }

    Ok(refs)
}

// --- AST Walking ---

#[derive(Default)]
struct RefCollector {
    refs: Vec<Vec<String>>,
    cte_names: HashSet<String>,
}

impl RefCollector {
    fn query(&mut self, query: &Query) {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names.insert(cte.alias.name.value.to_lowercase());
                self.query(&cte.query);
            }
        }
        self.set_expr(&query.body);
    }

    fn set_expr(&mut self, set_expr: &SetExpr) {
        match set_expr {
            SetExpr::Select(select) => self.select(select),
            SetExpr::Query(query) => self.query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr(left);
                self.set_expr(right);
            }
            _ => {}
        }
    }

    fn select(&mut self, select: &Select) {
        for twj in &select.from {
            self.table_factor(&twj.relation);
            for join in &twj.joins {
                self.table_factor(&join.relation);
            }
        }
    }

    fn table_factor(&mut self, factor: &TableFactor) {
        match factor {
            TableFactor::Table { name, .. } => self.refs.push(name_parts(name)),
            TableFactor::Derived { subquery, .. } => self.query(subquery),
            TableFactor::NestedJoin {
                table_with_joins, ..
            } => {
                self.table_factor(&table_with_joins.relation);
                for join in &table_with_joins.joins {
                    self.table_factor(&join.relation);
                }
            }
            _ => {}
        }
    }
}
