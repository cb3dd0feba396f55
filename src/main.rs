//! vibequery demo: runs a few plans over a generated in-memory table

use anyhow::{Context as _, Result};
use clap::Parser as ClapParser;
use log::info;
use std::sync::Arc;
use vibequery::analyzer::{AnalyzerConfig, DEFAULT_MAX_ITERATIONS};
use vibequery::catalog::ColumnInfo;
use vibequery::context::Context;
use vibequery::engine::{Engine, EngineConfig, QueryResult};
use vibequery::executor::{Aggregate, AggregateFunction, SortField};
use vibequery::expression::Expression;
use vibequery::plan::{PlanBuilder, PlanNode};
use vibequery::storage::MemoryDatabase;
use vibequery::types::{DataType, Value};

/// vibequery - analyze and run query plans over in-memory tables
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Workers per parallel table scan
    #[arg(short, long, default_value = "4")]
    parallelism: usize,

    /// Passes the analyzer may take before giving up
    #[arg(short, long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Rows in the generated `numbers` table
    #[arg(short, long, default_value = "1000")]
    rows: i64,

    /// Partitions of the generated `numbers` table
    #[arg(short = 'P', long, default_value = "8")]
    partitions: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let database = MemoryDatabase::new("demo");
    let numbers = database
        .create_table(
            "numbers",
            vec![
                ColumnInfo::new("n", DataType::Int64).not_null(),
                ColumnInfo::new("parity", DataType::Varchar),
            ],
            args.partitions,
        )
        .context("Failed to create numbers table")?;
    numbers.insert_all((1..=args.rows).map(|n| {
        let parity = if n % 2 == 0 { "even" } else { "odd" };
        vec![Value::Int64(n), Value::from(parity)]
    }))?;
    info!(
        "created table numbers with {} rows in {} partitions",
        numbers.len(),
        numbers.partition_count()
    );

    let config = EngineConfig {
        analyzer: AnalyzerConfig::default()
            .with_parallelism(args.parallelism)
            .with_max_iterations(args.max_iterations),
    };
    let engine = Engine::with_config(Arc::new(database), config);

    let fibonacci = PlanBuilder::scan("numbers")
        .filter(Expression::in_tuple(
            Expression::col("n"),
            Expression::tuple(
                [1i64, 2, 3, 5, 8, 13, 21, 34, 55, 89]
                    .into_iter()
                    .map(Expression::literal)
                    .collect(),
            ),
        ))
        .project(vec![Expression::col("n")])
        .sort(vec![SortField::asc(Expression::col("n"))])
        .build();

    let by_parity = PlanBuilder::scan("numbers")
        .filter(Expression::gt(
            Expression::col("n"),
            Expression::mul_expr(Expression::literal(10), Expression::literal(10)),
        ))
        .aggregate(
            vec![Expression::col("parity")],
            vec![
                Aggregate::count_star().with_alias("count"),
                Aggregate::new(AggregateFunction::Sum, Some(Expression::col("n"))).with_alias("total"),
                Aggregate::new(AggregateFunction::Avg, Some(Expression::col("n"))).with_alias("average"),
            ],
        )
        .sort(vec![SortField::desc(Expression::col("total"))])
        .build();

    let largest = PlanBuilder::scan("numbers")
        .project(vec![
            Expression::col("n"),
            Expression::alias(
                Expression::concat(Expression::literal("#"), Expression::col("n")),
                "label",
            ),
        ])
        .sort(vec![SortField::desc(Expression::col("n"))])
        .limit(5)
        .build();

    for (title, plan) in [
        ("fibonacci numbers", fibonacci),
        ("totals above 100 by parity", by_parity),
        ("five largest", largest),
    ] {
        run(&engine, title, &plan)?;
    }

    let index = engine.check_index("CREATE INDEX IF NOT EXISTS by_parity ON numbers USING btree (parity, n)")?;
    println!("valid index: {}", index);

    Ok(())
}

fn run(engine: &Engine, title: &str, plan: &PlanNode) -> Result<()> {
    println!("== {}", title);
    print!("{}", engine.explain(plan)?);
    let result = engine
        .query_all(&Context::new(), plan)
        .with_context(|| format!("Failed to run query '{}'", title))?;
    print_result(&result);
    println!();
    Ok(())
}

fn print_result(result: &QueryResult) {
    let header: Vec<&str> = result.schema.iter().map(|c| c.name.as_str()).collect();
    println!("{}", header.join(" | "));
    for row in &result.rows {
        let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", values.join(" | "));
    }
    println!("({} rows)", result.rows.len());
}
