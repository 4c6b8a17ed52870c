use std::sync::Arc;
use crate::Result;
use crate::analysis::rule::AnalyzerRule;
use crate::expr::{Alias, AttributeReference, Expr};
use crate::logical_plan::{Aggregate, Cube, Expand, GroupingSets, LogicalPlan, Project, Rollup};
use crate::tree_node::{Transformed, TreeNode, TreeNodeRecursion};
use crate::types::DataType;

/// Name of the synthetic column tagging which grouping set produced a row.
pub const GROUPING_ID_NAME: &str = "grouping__id";

/// Lower CUBE and ROLLUP to GROUPING SETS, and GROUPING SETS to an
/// `Aggregate` over an `Expand` that replays each row once per grouping set.
#[derive(Debug)]
pub struct ResolveGroupingAnalytics;

impl ResolveGroupingAnalytics {
    /// ROLLUP(a1..an) keeps growing prefixes: {}, {a1}, {a1,a2}, ...
    fn rollup_bitmasks(n: usize) -> Vec<i64> {
        (0..=n).map(|i| (1i64 << i) - 1).collect()
    }

    /// CUBE(a1..an) covers every subset.
    fn cube_bitmasks(n: usize) -> Vec<i64> {
        (0..(1i64 << n)).collect()
    }

    fn lower_grouping_sets(&self, g: GroupingSets) -> Result<Transformed<LogicalPlan>> {
        let GroupingSets { bitmasks, group_by_exprs, aggregations, child } = g;
        let gid = AttributeReference::new(GROUPING_ID_NAME, DataType::Int).with_nullability(false);

        // Group-by entries that are not named get an alias so Expand and the
        // Aggregate above can address them.
        let mut introduced: Vec<Expr> = Vec::new();
        let pairs: Vec<(Expr, AttributeReference)> = group_by_exprs.iter().map(|e| {
            match e.to_attribute() {
                Some(attr) => (e.clone(), attr),
                None => {
                    let alias = Alias::new(e.clone(), format!("{}", e));
                    let attr = alias.to_attribute();
                    introduced.push(Expr::Alias(alias));
                    (e.clone(), attr)
                },
            }
        }).collect();
        let group_by_attrs: Vec<AttributeReference> = pairs.iter().map(|(_, a)| a.clone()).collect();

        // Aggregations computed over a group-by expression read the expanded
        // column instead of recomputing it.
        let mut rewritten_aggs = Vec::with_capacity(aggregations.len());
        for agg in aggregations {
            let rewritten = agg.transform_down(|e| {
                for (orig, attr) in &pairs {
                    if orig.semantic_equals(&e) {
                        let replacement = Expr::AttributeReference(attr.clone());
                        if replacement == e {
                            return Ok(Transformed::no(e));
                        }
                        return Ok(Transformed::new(replacement, true, TreeNodeRecursion::Jump));
                    }
                }
                Ok(Transformed::no(e))
            })?.data;
            rewritten_aggs.push(rewritten);
        }

        let expand_child = if introduced.is_empty() {
            Arc::unwrap_or_clone(child)
        } else {
            let mut list: Vec<Expr> = child.output().into_iter().map(Expr::AttributeReference).collect();
            list.extend(introduced);
            LogicalPlan::Project(Project::new(list, child))
        };
        let expand = LogicalPlan::Expand(Expand::new(bitmasks, group_by_attrs.clone(), gid.clone(), Arc::new(expand_child)));

        let mut grouping: Vec<Expr> = group_by_attrs.into_iter().map(Expr::AttributeReference).collect();
        grouping.push(Expr::AttributeReference(gid));
        Ok(Transformed::yes(LogicalPlan::Aggregate(Aggregate::new(grouping, rewritten_aggs, Arc::new(expand)))))
    }
}

impl AnalyzerRule for ResolveGroupingAnalytics {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            p if !p.children_resolved() => Ok(Transformed::no(p)),
            LogicalPlan::Cube(Cube { group_by_exprs, aggregations, child }) => {
                let bitmasks = Self::cube_bitmasks(group_by_exprs.len());
                Ok(Transformed::yes(LogicalPlan::GroupingSets(GroupingSets::new(bitmasks, group_by_exprs, aggregations, child))))
            },
            LogicalPlan::Rollup(Rollup { group_by_exprs, aggregations, child }) => {
                let bitmasks = Self::rollup_bitmasks(group_by_exprs.len());
                Ok(Transformed::yes(LogicalPlan::GroupingSets(GroupingSets::new(bitmasks, group_by_exprs, aggregations, child))))
            },
            LogicalPlan::GroupingSets(g) if g.group_by_exprs.iter().all(|e| e.resolved()) => {
                self.lower_grouping_sets(g)
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "ResolveGroupingAnalytics"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitmasks() {
        assert_eq!(ResolveGroupingAnalytics::rollup_bitmasks(2), vec![0, 1, 3]);
        assert_eq!(ResolveGroupingAnalytics::rollup_bitmasks(3), vec![0, 1, 3, 7]);
        assert_eq!(ResolveGroupingAnalytics::cube_bitmasks(2), vec![0, 1, 2, 3]);
        assert_eq!(ResolveGroupingAnalytics::cube_bitmasks(3), (0..8).collect::<Vec<_>>());
    }
}
