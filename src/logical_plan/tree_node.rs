use crate::Result;
use crate::expr::Expr;
use crate::logical_plan::*;
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};

impl TreeNode for LogicalPlan {
    fn apply_children<'n, F: FnMut(&'n Self) -> Result<TreeNodeRecursion>>(
        &'n self,
        mut f: F,
    ) -> Result<TreeNodeRecursion> {
        for x in self.children() {
            if f(x)? == TreeNodeRecursion::Stop {
                return Ok(TreeNodeRecursion::Stop);
            }
        }
        Ok(TreeNodeRecursion::Continue)
    }

    fn map_children<F: FnMut(Self) -> Result<Transformed<Self>>>(
        self,
        mut f: F,
    ) -> Result<Transformed<Self>> {
        Ok(match self {
            LogicalPlan::UnresolvedRelation(_)
             | LogicalPlan::LocalRelation(_)
             | LogicalPlan::OneRowRelation => Transformed::no(self),
            LogicalPlan::SubqueryAlias(SubqueryAlias { identifier, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::SubqueryAlias(SubqueryAlias { identifier, child })),
            LogicalPlan::Project(Project { project_list, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Project(Project { project_list, child })),
            LogicalPlan::Filter(Filter { condition, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Filter(Filter { condition, child })),
            LogicalPlan::Sort(Sort { order, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Sort(Sort { order, child })),
            LogicalPlan::Aggregate(Aggregate { grouping_exprs, aggregate_exprs, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Aggregate(Aggregate { grouping_exprs, aggregate_exprs, child })),
            LogicalPlan::Join(Join { left, right, join_type, condition }) =>
                (left, right).map_elements(&mut f)?
                    .update_data(|(left, right)| LogicalPlan::Join(Join { left, right, join_type, condition })),
            LogicalPlan::Generate(Generate { generator, join, outer, qualifier, generator_output, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Generate(Generate { generator, join, outer, qualifier, generator_output, child })),
            LogicalPlan::Window(Window { project_list, window_exprs, spec, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Window(Window { project_list, window_exprs, spec, child })),
            LogicalPlan::Expand(Expand { bitmasks, group_by_attrs, gid, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Expand(Expand { bitmasks, group_by_attrs, gid, child })),
            LogicalPlan::With(With { child, cte_relations }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::With(With { child, cte_relations })),
            LogicalPlan::WithWindowDefinition(WithWindowDefinition { window_definitions, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::WithWindowDefinition(WithWindowDefinition { window_definitions, child })),
            LogicalPlan::InsertIntoTable(InsertIntoTable { table, child, overwrite }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::InsertIntoTable(InsertIntoTable { table, child, overwrite })),
            LogicalPlan::Cube(Cube { group_by_exprs, aggregations, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Cube(Cube { group_by_exprs, aggregations, child })),
            LogicalPlan::Rollup(Rollup { group_by_exprs, aggregations, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::Rollup(Rollup { group_by_exprs, aggregations, child })),
            LogicalPlan::GroupingSets(GroupingSets { bitmasks, group_by_exprs, aggregations, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::GroupingSets(GroupingSets { bitmasks, group_by_exprs, aggregations, child })),
            LogicalPlan::ScriptTransformation(ScriptTransformation { input, script, output, child }) =>
                child.map_elements(f)?
                    .update_data(|child| LogicalPlan::ScriptTransformation(ScriptTransformation { input, script, output, child })),
        })
    }
}

impl LogicalPlan {
    /// Rewrites all expressions in the current `LogicalPlan` node using `f`.
    ///
    /// # Notes
    /// * Similar to [`TreeNode::map_children`] but for this node's expressions.
    /// * Visits only the top level expressions (does not recurse into each expression)
    pub fn map_expressions<F: FnMut(Expr) -> Result<Transformed<Expr>>>(
        self,
        mut f: F,
    ) -> Result<Transformed<Self>> {
        match self {
            LogicalPlan::UnresolvedRelation(_)
             | LogicalPlan::LocalRelation(_)
             | LogicalPlan::OneRowRelation
             | LogicalPlan::SubqueryAlias(_)
             | LogicalPlan::With(_)
             | LogicalPlan::WithWindowDefinition(_)
             | LogicalPlan::InsertIntoTable(_)
             | LogicalPlan::Expand(_) =>
                Ok(Transformed::no(self)),
            LogicalPlan::Project(Project { project_list, child }) =>
                Ok(project_list.map_elements(f)?
                    .update_data(|project_list| LogicalPlan::Project(Project { project_list, child }))),
            LogicalPlan::Filter(Filter { condition, child }) =>
                Ok(f(condition)?
                    .update_data(|condition| LogicalPlan::Filter(Filter { condition, child }))),
            LogicalPlan::Sort(Sort { order, child }) =>
                Ok(order.map_elements(f)?
                    .update_data(|order| LogicalPlan::Sort(Sort { order, child }))),
            LogicalPlan::Aggregate(Aggregate { grouping_exprs, aggregate_exprs, child }) =>
                Ok((grouping_exprs, aggregate_exprs).map_elements(f)?
                    .update_data(|(grouping_exprs, aggregate_exprs)|
                        LogicalPlan::Aggregate(Aggregate { grouping_exprs, aggregate_exprs, child }))),
            LogicalPlan::Join(Join { left, right, join_type, condition }) =>
                Ok(condition.map_elements(f)?
                    .update_data(|condition| LogicalPlan::Join(Join { left, right, join_type, condition }))),
            LogicalPlan::Generate(Generate { generator, join, outer, qualifier, generator_output, child }) =>
                Ok((generator, generator_output).map_elements(f)?
                    .update_data(|(generator, generator_output)|
                        LogicalPlan::Generate(Generate { generator, join, outer, qualifier, generator_output, child }))),
            LogicalPlan::Window(Window { project_list, window_exprs, spec, child }) =>
                Ok(window_exprs.map_elements(f)?
                    .update_data(|window_exprs| LogicalPlan::Window(Window { project_list, window_exprs, spec, child }))),
            LogicalPlan::Cube(Cube { group_by_exprs, aggregations, child }) =>
                Ok((group_by_exprs, aggregations).map_elements(f)?
                    .update_data(|(group_by_exprs, aggregations)|
                        LogicalPlan::Cube(Cube { group_by_exprs, aggregations, child }))),
            LogicalPlan::Rollup(Rollup { group_by_exprs, aggregations, child }) =>
                Ok((group_by_exprs, aggregations).map_elements(f)?
                    .update_data(|(group_by_exprs, aggregations)|
                        LogicalPlan::Rollup(Rollup { group_by_exprs, aggregations, child }))),
            LogicalPlan::GroupingSets(GroupingSets { bitmasks, group_by_exprs, aggregations, child }) =>
                Ok((group_by_exprs, aggregations).map_elements(f)?
                    .update_data(|(group_by_exprs, aggregations)|
                        LogicalPlan::GroupingSets(GroupingSets { bitmasks, group_by_exprs, aggregations, child }))),
            LogicalPlan::ScriptTransformation(ScriptTransformation { input, script, output, child }) =>
                Ok(input.map_elements(f)?
                    .update_data(|input| LogicalPlan::ScriptTransformation(ScriptTransformation { input, script, output, child }))),
        }
    }

    pub fn transform_up_expressions<F: FnMut(Expr) -> Result<Transformed<Expr>> + Copy>(
        self,
        f: F,
    ) -> Result<Transformed<Self>> {
        self.transform_up(|plan| plan.map_expressions(|expr| expr.transform_up(f)))
    }
}
