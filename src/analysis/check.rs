use itertools::Itertools;
use crate::Result;
use crate::analysis::rule::collect_attributes;
use crate::expr::{AttributeReference, AttributeSet, Expr};
use crate::logical_plan::{Aggregate, LogicalPlan};
use crate::tree_node::{TreeNode, TreeNodeRecursion};
use crate::types::DataType;

/// Walk the final plan bottom-up and turn anything still unresolved, plus
/// node-local semantic violations, into user-facing failures. The deepest
/// problem is reported first, so the message names the offending column
/// rather than some ancestor operator.
pub fn check_analysis(plan: &LogicalPlan) -> Result<()> {
    check_plan(plan)?;
    if !plan.resolved() {
        return Err(format!("unresolved operator in analyzed plan:\n{:?}", plan));
    }
    Ok(())
}

fn column_names(input: &[AttributeReference]) -> String {
    format!("[{}]", input.iter().map(|a| a.name.as_str()).join(", "))
}

fn check_plan(plan: &LogicalPlan) -> Result<()> {
    for child in plan.children() {
        check_plan(child)?;
    }
    let input = plan.child_attributes();
    for expr in plan.expressions() {
        expr.apply(|e| match e {
            Expr::UnresolvedAttribute(u) => Err(format!(
                "cannot resolve '{}' given input columns {}", u.name(), column_names(&input))),
            Expr::UnresolvedFunction(uf) => Err(format!("undefined function {}", uf.name)),
            // Descend first so the failure names the deepest unresolved part.
            Expr::UnresolvedAlias(_) => Ok(TreeNodeRecursion::Continue),
            Expr::UnresolvedExtractValue(ev) if ev.child.resolved() && ev.extraction.resolved() =>
                Err(format!("Can't extract value from {}, {}", ev.child, ev.extraction)),
            Expr::UnresolvedExtractValue(_) => Ok(TreeNodeRecursion::Continue),
            Expr::UnresolvedWindowExpression(_)
             | Expr::Star(_)
             | Expr::MultiAlias(_) => Err(format!("unresolved expression {}", e)),
            e if e.children_resolved() => match e.check_input_data_types() {
                Ok(()) => Ok(TreeNodeRecursion::Continue),
                Err(msg) => Err(msg),
            },
            _ => Ok(TreeNodeRecursion::Continue),
        })?;
    }
    match plan {
        LogicalPlan::UnresolvedRelation(u) => {
            return Err(format!("Table not found: {}", u.table_name()));
        },
        LogicalPlan::Filter(f) if f.condition.resolved() && f.condition.data_type() != DataType::boolean_type() => {
            return Err(format!(
                "filter expression '{}' of type {} is not a boolean", f.condition, f.condition.data_type()));
        },
        LogicalPlan::Join(j) => {
            if let Some(condition) = &j.condition {
                if condition.resolved() && condition.data_type() != DataType::boolean_type() {
                    return Err(format!(
                        "join condition '{}' of type {} is not a boolean", condition, condition.data_type()));
                }
            }
        },
        LogicalPlan::Aggregate(a) => check_aggregation(a)?,
        LogicalPlan::Window(w) => {
            for e in &w.window_exprs {
                let mut mismatch = false;
                e.apply(|x| {
                    if let Expr::WindowExpression(we) = x {
                        if we.spec != w.spec {
                            mismatch = true;
                            return Ok(TreeNodeRecursion::Stop);
                        }
                    }
                    Ok(TreeNodeRecursion::Continue)
                }).unwrap();
                if mismatch {
                    return Err(format!(
                        "window expression '{}' does not share the operator's window specification", e));
                }
            }
        },
        LogicalPlan::With(_)
         | LogicalPlan::WithWindowDefinition(_)
         | LogicalPlan::Cube(_)
         | LogicalPlan::Rollup(_)
         | LogicalPlan::GroupingSets(_) => {
            return Err(format!("unresolved operator:\n{:?}", plan));
        },
        _ => {},
    }
    // Operators that only consume their children's columns must not refer to
    // anything else.
    match plan {
        LogicalPlan::Project(_)
         | LogicalPlan::Filter(_)
         | LogicalPlan::Sort(_)
         | LogicalPlan::Aggregate(_)
         | LogicalPlan::Join(_) => {
            let input_set = AttributeSet::from_attributes(input.iter());
            let mut missing: Vec<AttributeReference> = Vec::new();
            for expr in plan.expressions() {
                for a in collect_attributes(expr) {
                    if !input_set.contains(&a) && !missing.iter().any(|m| m.expr_id == a.expr_id) {
                        missing.push(a);
                    }
                }
            }
            if !missing.is_empty() {
                return Err(format!(
                    "resolved attribute(s) {} missing from {}",
                    missing.iter().map(|a| a.name.as_str()).join(", "),
                    column_names(&input),
                ));
            }
        },
        _ => {},
    }
    Ok(())
}

/// Everything an aggregation outputs has to be derivable from the grouping
/// expressions or wrapped in an aggregate function.
fn check_aggregation(a: &Aggregate) -> Result<()> {
    for g in &a.grouping_exprs {
        let has_agg = g.exists(|e| Ok(matches!(e, Expr::AggregateExpression(_)))).unwrap();
        if has_agg {
            return Err(format!("aggregate functions are not allowed in GROUP BY, but found {}", g));
        }
    }

    fn is_valid(e: &Expr, grouping: &[Expr]) -> bool {
        if matches!(e, Expr::AggregateExpression(_)) {
            return true;
        }
        if grouping.iter().any(|g| g.semantic_equals(e)) {
            return true;
        }
        match e {
            Expr::AttributeReference(_) => false,
            Expr::Literal(_) => true,
            e => {
                let children = e.children();
                !children.is_empty() && children.iter().all(|c| is_valid(c, grouping))
            },
        }
    }

    for e in &a.aggregate_exprs {
        if !is_valid(e, &a.grouping_exprs) {
            return Err(format!(
                "expression '{}' is neither present in the group by, nor is it an aggregate function. \
                 Add to group by or wrap in first() if you don't care which value you get.", e));
        }
    }
    Ok(())
}
