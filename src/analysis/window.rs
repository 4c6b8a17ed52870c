use std::sync::Arc;
use crate::Result;
use crate::analysis::rule::AnalyzerRule;
use crate::expr::{
    AggregateExpression, Alias, AttributeSet, Expr, SortOrder, WindowExpression,
    WindowSpecDefinition,
};
use crate::logical_plan::{
    named_exprs_to_attributes, Aggregate, Filter, LogicalPlan, Project, Window,
};
use crate::tree_node::{Transformed, TreeNode, TreeNodeRecursion};

pub fn has_window_expression(exprs: &[Expr]) -> bool {
    exprs.iter().any(|e| e.exists(|x| Ok(matches!(x, Expr::WindowExpression(_)))).unwrap())
}

/// Split window expressions away from the operator that carries them, pushing
/// their inputs into a projection (or aggregation) below, stacking one
/// `Window` operator per distinct specification, and restoring the original
/// schema with a projection on top.
#[derive(Debug)]
pub struct ExtractWindowExpressions;

impl ExtractWindowExpressions {
    /// Replace every non-attribute input of a window (function arguments,
    /// partition and order expressions, aggregates evaluated below the
    /// window) with a reference to a `_w{n}` column computed by the child.
    ///
    /// Returns the rewritten window-bearing expressions and the child's
    /// expression list extended with everything that was pulled out.
    fn extract(expressions: Vec<Expr>) -> Result<(Vec<Expr>, Vec<Expr>)> {
        let (windowed, regular): (Vec<Expr>, Vec<Expr>) = expressions.into_iter()
            .partition(|e| e.exists(|x| Ok(matches!(x, Expr::WindowExpression(_)))).unwrap());

        let mut seen = AttributeSet::new();
        for e in &regular {
            if let Some(a) = e.to_attribute() {
                seen.add(&a);
            }
        }
        let mut extracted: Vec<Expr> = Vec::new();

        fn extract_arg(e: Expr, seen: &mut AttributeSet, extracted: &mut Vec<Expr>) -> Expr {
            match e {
                Expr::AttributeReference(a) => {
                    if !seen.contains(&a) {
                        seen.add(&a);
                        extracted.push(Expr::AttributeReference(a.clone()));
                    }
                    Expr::AttributeReference(a)
                },
                e if e.foldable() => e,
                Expr::Alias(al) => {
                    let attr = al.to_attribute();
                    if !seen.contains(&attr) {
                        seen.add(&attr);
                        extracted.push(Expr::Alias(al));
                    }
                    Expr::AttributeReference(attr)
                },
                e => {
                    let alias = Alias::new(e, format!("_w{}", extracted.len()));
                    let attr = alias.to_attribute();
                    seen.add(&attr);
                    extracted.push(Expr::Alias(alias));
                    Expr::AttributeReference(attr)
                },
            }
        }

        let mut new_windowed = Vec::with_capacity(windowed.len());
        for we in windowed {
            let rewritten = we.transform_down(|e| match e {
                Expr::WindowExpression(w) => {
                    let WindowExpression { window_function, spec } = w;
                    let new_function = match *window_function {
                        Expr::AggregateExpression(AggregateExpression { func, mode, is_distinct }) => {
                            let args: Vec<Expr> = func.args().into_iter().cloned()
                                .map(|a| extract_arg(a, &mut seen, &mut extracted))
                                .collect();
                            Expr::AggregateExpression(AggregateExpression {
                                func: func.rewrite_args(args),
                                mode,
                                is_distinct,
                            })
                        },
                        f => f,
                    };
                    let partition_spec = spec.partition_spec.into_iter()
                        .map(|p| extract_arg(p, &mut seen, &mut extracted))
                        .collect();
                    let order_spec = spec.order_spec.into_iter().map(|o| match o {
                        Expr::SortOrder(so) => {
                            let child = extract_arg(*so.child, &mut seen, &mut extracted);
                            Expr::SortOrder(SortOrder::new(child, so.direction))
                        },
                        o => extract_arg(o, &mut seen, &mut extracted),
                    }).collect();
                    let new_spec = WindowSpecDefinition {
                        partition_spec,
                        order_spec,
                        frame: spec.frame,
                    };
                    Ok(Transformed::new(
                        Expr::WindowExpression(WindowExpression::new(new_function, new_spec)),
                        true,
                        TreeNodeRecursion::Jump,
                    ))
                },
                // An aggregate outside any window is evaluated by the
                // aggregation below; the window tier only sees its column.
                e @ Expr::AggregateExpression(_) => {
                    let alias = Alias::new(e, format!("_w{}", extracted.len()));
                    let attr = alias.to_attribute();
                    seen.add(&attr);
                    extracted.push(Expr::Alias(alias));
                    Ok(Transformed::new(
                        Expr::AttributeReference(attr),
                        true,
                        TreeNodeRecursion::Jump,
                    ))
                },
                Expr::AttributeReference(a) => {
                    if !seen.contains(&a) {
                        seen.add(&a);
                        extracted.push(Expr::AttributeReference(a.clone()));
                    }
                    Ok(Transformed::no(Expr::AttributeReference(a)))
                },
                e => Ok(Transformed::no(e)),
            })?.data;
            new_windowed.push(rewritten);
        }

        let mut new_regular = regular;
        new_regular.extend(extracted);
        Ok((new_windowed, new_regular))
    }

    /// Alias each `WindowExpression` (`_we{n}` unless the user named it),
    /// group them by specification, and stack one `Window` per group over
    /// `child` in first-seen order.
    fn add_window(windowed: Vec<Expr>, child: LogicalPlan) -> Result<LogicalPlan> {
        let mut extracted: Vec<Expr> = Vec::new();
        let mut new_windowed: Vec<Expr> = Vec::new();
        for e in windowed {
            match e {
                Expr::Alias(a) if matches!(a.child.as_ref(), Expr::WindowExpression(_)) => {
                    let attr = a.to_attribute();
                    extracted.push(Expr::Alias(a));
                    new_windowed.push(Expr::AttributeReference(attr));
                },
                e @ Expr::WindowExpression(_) => {
                    let alias = Alias::new(e, format!("_we{}", extracted.len()));
                    let attr = alias.to_attribute();
                    extracted.push(Expr::Alias(alias));
                    new_windowed.push(Expr::AttributeReference(attr));
                },
                other => {
                    let rewritten = other.transform_down(|x| match x {
                        x @ Expr::WindowExpression(_) => {
                            let alias = Alias::new(x, format!("_we{}", extracted.len()));
                            let attr = alias.to_attribute();
                            extracted.push(Expr::Alias(alias));
                            Ok(Transformed::new(
                                Expr::AttributeReference(attr),
                                true,
                                TreeNodeRecursion::Jump,
                            ))
                        },
                        x => Ok(Transformed::no(x)),
                    })?.data;
                    new_windowed.push(rewritten);
                },
            }
        }

        let mut groups: Vec<(WindowSpecDefinition, Vec<Expr>)> = Vec::new();
        for ne in extracted {
            let mut specs: Vec<WindowSpecDefinition> = Vec::new();
            ne.apply(|x| {
                if let Expr::WindowExpression(w) = x {
                    if !specs.contains(&w.spec) {
                        specs.push(w.spec.clone());
                    }
                }
                Ok(TreeNodeRecursion::Continue)
            }).unwrap();
            if specs.len() != 1 {
                return Err(format!(
                    "Found window expression '{}' with {} window specifications, expected exactly one",
                    ne, specs.len(),
                ));
            }
            let spec = specs.pop().unwrap();
            match groups.iter_mut().find(|(s, _)| s == &spec) {
                Some((_, exprs)) => exprs.push(ne),
                None => groups.push((spec, vec![ne])),
            }
        }

        let mut current = child;
        for (spec, exprs) in groups {
            let project_list = current.output();
            current = LogicalPlan::Window(Window::new(project_list, exprs, spec, Arc::new(current)));
        }
        let mut list: Vec<Expr> = current.output().into_iter().map(Expr::AttributeReference).collect();
        list.extend(new_windowed);
        Ok(LogicalPlan::Project(Project::new(list, Arc::new(current))))
    }
}

impl AnalyzerRule for ExtractWindowExpressions {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            // HAVING over aggregated window expressions: aggregate, filter,
            // then window.
            LogicalPlan::Filter(f) => {
                let applies = match f.child.as_ref() {
                    LogicalPlan::Aggregate(a) =>
                        a.child.resolved()
                            && has_window_expression(&a.aggregate_exprs)
                            && a.grouping_exprs.iter().chain(a.aggregate_exprs.iter()).all(|e| e.resolved())
                            && f.condition.resolved(),
                    _ => false,
                };
                if !applies {
                    return Ok(Transformed::no(LogicalPlan::Filter(f)));
                }
                let a = match f.child.as_ref() {
                    LogicalPlan::Aggregate(a) => a.clone(),
                    _ => return Ok(Transformed::no(LogicalPlan::Filter(f))),
                };
                let final_list: Vec<Expr> = named_exprs_to_attributes(&a.aggregate_exprs)
                    .into_iter().map(Expr::AttributeReference).collect();
                let (windowed, regular) = Self::extract(a.aggregate_exprs)?;
                let with_aggregate = LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs, regular, a.child));
                let with_filter = LogicalPlan::Filter(Filter::new(f.condition, Arc::new(with_aggregate)));
                let with_window = Self::add_window(windowed, with_filter)?;
                Ok(Transformed::yes(LogicalPlan::Project(Project::new(final_list, Arc::new(with_window)))))
            },
            LogicalPlan::Aggregate(a)
                if a.child.resolved()
                    && has_window_expression(&a.aggregate_exprs)
                    && a.grouping_exprs.iter().chain(a.aggregate_exprs.iter()).all(|e| e.resolved()) => {
                let final_list: Vec<Expr> = named_exprs_to_attributes(&a.aggregate_exprs)
                    .into_iter().map(Expr::AttributeReference).collect();
                let (windowed, regular) = Self::extract(a.aggregate_exprs)?;
                let with_aggregate = LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs, regular, a.child));
                let with_window = Self::add_window(windowed, with_aggregate)?;
                Ok(Transformed::yes(LogicalPlan::Project(Project::new(final_list, Arc::new(with_window)))))
            },
            LogicalPlan::Project(p)
                if p.child.resolved()
                    && has_window_expression(&p.project_list)
                    && p.project_list.iter().all(|e| e.resolved()) => {
                let final_list: Vec<Expr> = named_exprs_to_attributes(&p.project_list)
                    .into_iter().map(Expr::AttributeReference).collect();
                let (windowed, regular) = Self::extract(p.project_list)?;
                let with_project = LogicalPlan::Project(Project::new(regular, p.child));
                let with_window = Self::add_window(windowed, with_project)?;
                Ok(Transformed::yes(LogicalPlan::Project(Project::new(final_list, Arc::new(with_window)))))
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "ExtractWindowExpressions"
    }
}
