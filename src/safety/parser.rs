//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the SQLite dialect to parse SQL and classify
//! statements by their safety level.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::{Token, Tokenizer};
use tracing::debug;

use super::{ClassificationResult, SafetyLevel, StatementType};

/// SQL classifier that parses and classifies SQL queries.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: SQLiteDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Classifies a SQL string and returns the classification result.
    ///
    /// SQL the parser cannot read falls back to a token scan: any statement
    /// opening with a write keyword is still classified as a write, anything
    /// else is `Unknown` and left to the engine, which reports the syntax
    /// error and refuses writes through its read-only mode.
    pub fn classify(&self, sql: &str) -> ClassificationResult {
        match self.parse_and_classify(sql) {
            Ok(result) => result,
            Err(e) => {
                debug!("SQL parse failed, falling back to token scan: {e}");
                match self.scan_leading_keywords(sql) {
                    Some((level, stmt_type)) => ClassificationResult::with_warning(
                        level,
                        stmt_type,
                        format!("Could not parse SQL: {e}"),
                    ),
                    None => ClassificationResult::with_warning(
                        SafetyLevel::Unknown,
                        StatementType::Unknown,
                        format!("Could not parse SQL: {e}"),
                    ),
                }
            }
        }
    }

    /// Returns the most dangerous write found at the start of any statement.
    ///
    /// A statement opening with `WITH` is also checked at the keyword that
    /// follows each top-level closing parenthesis, which is where the main
    /// statement begins once the CTE list ends.
    fn scan_leading_keywords(&self, sql: &str) -> Option<(SafetyLevel, StatementType)> {
        let tokens = Tokenizer::new(&self.dialect, sql).tokenize().ok()?;

        let mut at_statement_start = true;
        let mut in_with = false;
        let mut depth = 0usize;
        let mut worst: Option<(SafetyLevel, StatementType)> = None;

        for token in tokens {
            match token {
                Token::Whitespace(_) => continue,
                Token::SemiColon => {
                    at_statement_start = true;
                    in_with = false;
                    depth = 0;
                    continue;
                }
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth = depth.saturating_sub(1);
                    if in_with && depth == 0 {
                        at_statement_start = true;
                        continue;
                    }
                }
                Token::Word(word) if at_statement_start => {
                    if word.value.eq_ignore_ascii_case("WITH") {
                        in_with = true;
                    } else if let Some((level, stmt_type)) = classify_keyword(&word.value) {
                        let is_worse = worst
                            .as_ref()
                            .map_or(true, |(w, _)| level_priority(&level) > level_priority(w));
                        if is_worse {
                            worst = Some((level, stmt_type));
                        }
                    }
                }
                _ => {}
            }
            at_statement_start = false;
        }

        worst
    }

    fn parse_and_classify(&self, sql: &str) -> Result<ClassificationResult, ParserError> {
        let statements = Parser::parse_sql(&self.dialect, sql)?;

        if statements.is_empty() {
            return Ok(ClassificationResult::with_warning(
                SafetyLevel::Unknown,
                StatementType::Unknown,
                "Empty SQL statement",
            ));
        }

        if statements.len() == 1 {
            let (level, stmt_type) = classify_statement(&statements[0]);
            return Ok(ClassificationResult::new(level, stmt_type));
        }

        // Multiple statements: use the most dangerous classification
        let mut max_level = SafetyLevel::Safe;
        let mut max_stmt_type = StatementType::Select;

        for stmt in &statements {
            let (level, stmt_type) = classify_statement(stmt);
            if level_priority(&level) > level_priority(&max_level) {
                max_level = level;
                max_stmt_type = stmt_type;
            }
        }

        Ok(ClassificationResult::new(
            max_level,
            StatementType::Multiple(Box::new(max_stmt_type)),
        ))
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> ClassificationResult {
    SqlClassifier::new().classify(sql)
}

/// Returns a priority value for safety levels (higher = more dangerous).
fn level_priority(level: &SafetyLevel) -> u8 {
    match level {
        SafetyLevel::Safe => 0,
        SafetyLevel::Unknown => 1,
        SafetyLevel::Mutating => 2,
        SafetyLevel::Destructive => 3,
    }
}

/// Classifies a statement by its leading keyword; `None` for reads and
/// anything unrecognised.
fn classify_keyword(keyword: &str) -> Option<(SafetyLevel, StatementType)> {
    let classified = match keyword.to_uppercase().as_str() {
        "INSERT" | "REPLACE" => (SafetyLevel::Mutating, StatementType::Insert),
        "UPDATE" | "UPSERT" => (SafetyLevel::Mutating, StatementType::Update),
        "PRAGMA" => (SafetyLevel::Mutating, StatementType::Pragma),
        "ATTACH" | "DETACH" => (SafetyLevel::Mutating, StatementType::Attach),
        "DELETE" => (SafetyLevel::Destructive, StatementType::Delete),
        "DROP" => (SafetyLevel::Destructive, StatementType::Drop),
        "ALTER" => (SafetyLevel::Destructive, StatementType::Alter),
        "CREATE" => (SafetyLevel::Destructive, StatementType::Create),
        "VACUUM" | "REINDEX" | "ANALYZE" => (SafetyLevel::Destructive, StatementType::Unknown),
        _ => return None,
    };
    Some(classified)
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (SafetyLevel, StatementType) {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE executes the statement
                let (inner_level, _) = classify_statement(statement);
                (inner_level, StatementType::Explain)
            } else {
                (SafetyLevel::Safe, StatementType::Explain)
            }
        }

        // Mutating: data or session modification
        Statement::Insert { .. } => (SafetyLevel::Mutating, StatementType::Insert),
        Statement::Update { .. } => (SafetyLevel::Mutating, StatementType::Update),
        Statement::Merge { .. } => (SafetyLevel::Mutating, StatementType::Merge),
        Statement::Pragma { .. } => (SafetyLevel::Mutating, StatementType::Pragma),
        Statement::AttachDatabase { .. } => (SafetyLevel::Mutating, StatementType::Attach),

        // Destructive: data loss or schema changes
        Statement::Delete { .. } => (SafetyLevel::Destructive, StatementType::Delete),
        Statement::Drop { .. } => (SafetyLevel::Destructive, StatementType::Drop),
        Statement::Truncate { .. } => (SafetyLevel::Destructive, StatementType::Truncate),
        Statement::AlterTable { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::AlterIndex { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::AlterView { .. } => (SafetyLevel::Destructive, StatementType::Alter),
        Statement::CreateTable { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateIndex { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateView { .. } => (SafetyLevel::Destructive, StatementType::Create),
        Statement::CreateVirtualTable { .. } => {
            (SafetyLevel::Destructive, StatementType::Create)
        }
        Statement::Grant { .. } => (SafetyLevel::Destructive, StatementType::Grant),
        Statement::Revoke { .. } => (SafetyLevel::Destructive, StatementType::Revoke),

        // Conservative default: anything else is treated as destructive
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Query by recursively inspecting for data-modifying operations.
/// Returns the most dangerous (SafetyLevel, StatementType) found.
fn classify_query(query: &Query) -> (SafetyLevel, StatementType) {
    let mut max_level = SafetyLevel::Safe;
    let mut max_type = StatementType::Select;

    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let (level, stmt_type) = classify_query(&cte.query);
            if level_priority(&level) > level_priority(&max_level) {
                max_level = level;
                max_type = stmt_type;
            }
        }
    }

    let (body_level, body_type) = classify_set_expr(&query.body);
    if level_priority(&body_level) > level_priority(&max_level) {
        max_level = body_level;
        max_type = body_type;
    }

    (max_level, max_type)
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
fn classify_set_expr(set_expr: &SetExpr) -> (SafetyLevel, StatementType) {
    match set_expr {
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            let (left_level, left_type) = classify_set_expr(left);
            let (right_level, right_type) = classify_set_expr(right);
            if level_priority(&left_level) >= level_priority(&right_level) {
                (left_level, left_type)
            } else {
                (right_level, right_type)
            }
        }
        SetExpr::Values(_) | SetExpr::Table(_) => (SafetyLevel::Safe, StatementType::Select),
        #[allow(unreachable_patterns)]
        _ => (SafetyLevel::Destructive, StatementType::Unknown),
    }
}

/// Classifies a Select by checking its FROM clause for subqueries.
fn classify_select(select: &Select) -> (SafetyLevel, StatementType) {
    let mut max_level = SafetyLevel::Safe;
    let mut max_type = StatementType::Select;

    for table_with_joins in &select.from {
        let (level, stmt_type) = classify_table_with_joins(table_with_joins);
        if level_priority(&level) > level_priority(&max_level) {
            max_level = level;
            max_type = stmt_type;
        }
    }

    (max_level, max_type)
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> (SafetyLevel, StatementType) {
    let mut max_level = SafetyLevel::Safe;
    let mut max_type = StatementType::Select;

    let relations = std::iter::once(&twj.relation).chain(twj.joins.iter().map(|j| &j.relation));
    for relation in relations {
        let (level, stmt_type) = classify_table_factor(relation);
        if level_priority(&level) > level_priority(&max_level) {
            max_level = level;
            max_type = stmt_type;
        }
    }

    (max_level, max_type)
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> (SafetyLevel, StatementType) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => (SafetyLevel::Safe, StatementType::Select),
    }
}
