use std::sync::Arc;
use flexi_logger::with_thread;
use rsql::analysis::{eliminate_subquery_aliases, Analyzer};
use rsql::catalog::MemoryCatalog;
use rsql::Operator;
use rsql::expr::{binary_expr, Expr, UnresolvedAlias, UnresolvedFunction};
use rsql::logical_plan::{Aggregate, Filter, LogicalPlan, Sort, UnresolvedRelation};
use rsql::types::{DataType, Field, Schema};

fn main() {
    flexi_logger::Logger::try_with_str("debug")
        .unwrap()
        .format(with_thread)
        .start()
        .unwrap();

    let schema = Schema::new(vec![
        Field::new("id", DataType::Int),
        Field::new("cate", DataType::String),
        Field::new("text", DataType::String),
        Field::new("in_bytes", DataType::Long),
        Field::new("out_bytes", DataType::Long),
    ]);
    let mut catalog = MemoryCatalog::new();
    catalog.register_table("tbl", &schema);

    // select cate, sum(in_bytes + out_bytes) bytes
    // from tbl
    // where id > 1
    // group by cate
    // order by sum(in_bytes + out_bytes)
    let ua = |name: &str| Expr::unresolved_attribute(name);
    let sum_bytes = Expr::UnresolvedFunction(UnresolvedFunction::new(
        "sum",
        vec![binary_expr(ua("in_bytes"), Operator::Plus, ua("out_bytes"))],
        false,
    ));
    let plan = LogicalPlan::Sort(Sort::new(
        vec![sum_bytes.clone().asc()],
        Arc::new(LogicalPlan::Aggregate(Aggregate::new(
            vec![ua("cate")],
            vec![
                Expr::UnresolvedAlias(UnresolvedAlias::new(ua("cate"))),
                sum_bytes.alias("bytes"),
            ],
            Arc::new(LogicalPlan::Filter(Filter::new(
                ua("id").gt(Expr::int_lit(1)),
                Arc::new(LogicalPlan::UnresolvedRelation(UnresolvedRelation::new(
                    vec!["tbl".to_string()],
                    None,
                ))),
            ))),
        ))),
    ));
    println!("{:?}", plan);

    let analyzer = Analyzer::new(Arc::new(catalog));
    match analyzer.analyze(plan) {
        Ok(new_plan) => {
            println!("analyzed plan:\n{:?}", new_plan);
            let cleaned = eliminate_subquery_aliases(new_plan);
            println!("without subquery aliases:\n{:?}", cleaned);
            let out_schema = Schema::from_attributes(cleaned.output());
            println!("\n{}", out_schema);
        },
        Err(e) => println!("\n{}", e),
    }
}
