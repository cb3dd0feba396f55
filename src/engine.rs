//! Query entry point: analyze a plan and open its rows.

use crate::analyzer::{Analyzer, AnalyzerConfig, AnalyzerError};
use crate::catalog::{Database, Schema};
use crate::context::Context;
use crate::executor::{collect, RowIter};
use crate::expression::Expression;
use crate::parse::{parse_create_index, CreateIndex};
use crate::plan::PlanNode;
use crate::types::Row;
use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub analyzer: AnalyzerConfig,
}

/// Materialized query output
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

pub struct Engine {
    analyzer: Analyzer,
}

impl Engine {
    pub fn new(database: Arc<dyn Database>) -> Self {
        Self::with_config(database, EngineConfig::default())
    }

    pub fn with_config(database: Arc<dyn Database>, config: EngineConfig) -> Self {
        Self {
            analyzer: Analyzer::new(database).with_config(config.analyzer),
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Analyze `plan` and open an iterator over its rows. The caller must
    /// close the iterator, or hand it to [`collect`].
    pub fn query(&self, ctx: &Context, plan: &PlanNode) -> Result<(Schema, Box<dyn RowIter>)> {
        debug!("query {}: analyzing\n{}", ctx.query_id(), plan);
        let analyzed = self.analyzer.analyze(plan)?;
        debug!("query {}: running\n{}", ctx.query_id(), analyzed);
        let rows = analyzed.row_iter(ctx)?;
        Ok((analyzed.schema(), rows))
    }

    /// Run `plan` to completion.
    pub fn query_all(&self, ctx: &Context, plan: &PlanNode) -> Result<QueryResult> {
        let (schema, rows) = self.query(ctx, plan)?;
        let rows = collect(rows)?;
        info!("query {} returned {} rows", ctx.query_id(), rows.len());
        Ok(QueryResult { schema, rows })
    }

    /// The analyzed plan as indented text.
    pub fn explain(&self, plan: &PlanNode) -> Result<String> {
        Ok(self.analyzer.analyze(plan)?.to_string())
    }

    /// Parse a `CREATE INDEX` statement and check that its table and
    /// columns exist.
    pub fn check_index(&self, definition: &str) -> Result<CreateIndex> {
        let index = parse_create_index(definition)?;
        let table = self
            .analyzer
            .database()
            .table(&index.table)
            .ok_or_else(|| AnalyzerError::TableNotFound(index.table.clone()))?;

        for expr in &index.expressions {
            if let Expression::UnresolvedColumn(col) = expr {
                let table_name = col.table.as_deref().unwrap_or(&index.table);
                if !table.schema().iter().any(|c| c.matches(Some(table_name), &col.name)) {
                    return Err(AnalyzerError::ColumnNotFound(col.to_string()).into());
                }
            }
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnInfo;
    use crate::expression::Expression;
    use crate::parse::ParseError;
    use crate::plan::PlanBuilder;
    use crate::storage::MemoryDatabase;
    use crate::types::{DataType, Value};

    fn engine(parallelism: usize) -> Result<Engine> {
        let db = MemoryDatabase::new("test");
        let table = db.create_table(
            "numbers",
            vec![ColumnInfo::new("n", DataType::Int64).not_null()],
            4,
        )?;
        table.insert_all((1..=20).map(|i| vec![Value::Int64(i)]))?;
        let config = EngineConfig {
            analyzer: AnalyzerConfig::default().with_parallelism(parallelism),
        };
        Ok(Engine::with_config(Arc::new(db), config))
    }

    fn multiples_of_five() -> PlanNode {
        PlanBuilder::scan("numbers")
            .filter(Expression::eq(
                Expression::binary_op(
                    crate::expression::BinaryOperator::Sub,
                    Expression::col("n"),
                    Expression::mul_expr(
                        Expression::div_expr(Expression::col("n"), Expression::literal(5i64)),
                        Expression::literal(5i64),
                    ),
                ),
                Expression::literal(0i64),
            ))
            .build()
    }

    #[test]
    fn test_query_all() -> Result<()> {
        for parallelism in [1, 3] {
            let engine = engine(parallelism)?;
            let mut result = engine.query_all(&Context::new(), &multiples_of_five())?;
            result.rows.sort_by_key(|r| match r[0] {
                Value::Int64(n) => n,
                _ => 0,
            });
            assert_eq!(result.schema.len(), 1);
            assert_eq!(result.schema[0].name, "n");
            assert_eq!(
                result.rows,
                vec![5, 10, 15, 20]
                    .into_iter()
                    .map(|n| vec![Value::Int64(n)])
                    .collect::<Vec<_>>()
            );
        }
        Ok(())
    }

    #[test]
    fn test_explain() -> Result<()> {
        let engine = engine(2)?;
        let text = engine.explain(&PlanBuilder::scan("numbers").limit(3).build())?;
        assert_eq!(
            text,
            "Limit: 3\n  Exchange: parallelism=2\n    Table: numbers\n"
        );
        Ok(())
    }

    #[test]
    fn test_query_cancelled() -> Result<()> {
        let engine = engine(1)?;
        let ctx = Context::new();
        ctx.cancel();
        assert!(engine.query_all(&ctx, &PlanBuilder::scan("numbers").build()).is_err());
        Ok(())
    }

    #[test]
    fn test_check_index() -> Result<()> {
        let engine = engine(1)?;
        let index = engine.check_index("CREATE INDEX by_n ON numbers (n)")?;
        assert_eq!(index.expressions, vec![Expression::col("n")]);

        let err = engine.check_index("CREATE INDEX i ON numbers (m)").unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalyzerError>(),
            Some(&AnalyzerError::ColumnNotFound("m".into()))
        );

        let err = engine.check_index("CREATE INDEX i ON missing (n)").unwrap_err();
        assert_eq!(
            err.downcast_ref::<AnalyzerError>(),
            Some(&AnalyzerError::TableNotFound("missing".into()))
        );

        let err = engine.check_index("CREATE INDEX i ON numbers n").unwrap_err();
        assert!(err.downcast_ref::<ParseError>().is_some());
        Ok(())
    }
}
