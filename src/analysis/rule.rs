use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use crate::Result;
use crate::analysis::analyzer::Resolver;
use crate::analysis::function_registry::{is_aggregate_function, is_registered, resolve_function};
use crate::catalog::{Catalog, TableIdentifier};
use crate::expr::*;
use crate::logical_plan::*;
use crate::tree_node::{Transformed, TreeNode, TreeNodeRecursion};

pub trait AnalyzerRule: Debug + Send + Sync {
    /// Rewrite `plan`
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>>;

    /// A human readable name for this analyzer rule
    fn name(&self) -> &str;
}

pub fn contains_star(exprs: &[Expr]) -> bool {
    exprs.iter().any(|e| e.exists(|x| Ok(matches!(x, Expr::Star(_)))).unwrap())
}

pub fn collect_attributes(expr: &Expr) -> Vec<AttributeReference> {
    let mut attrs = Vec::new();
    expr.apply(|e| {
        if let Expr::AttributeReference(a) = e {
            attrs.push(a.clone());
        }
        Ok(TreeNodeRecursion::Continue)
    }).unwrap();
    attrs
}

/// Bind unresolved attributes and extract-values against `input`, swallowing
/// lookup failures so a later pass can retry.
pub fn resolve_expr_soft(expr: Expr, input: &[AttributeReference], resolver: Resolver) -> Expr {
    expr.transform_up(|e| match e {
        Expr::UnresolvedAttribute(u) => match resolve_against(input, &u.name_parts, resolver) {
            Ok(Some(resolved)) => Ok(Transformed::yes(resolved)),
            _ => Ok(Transformed::no(Expr::UnresolvedAttribute(u))),
        },
        Expr::UnresolvedExtractValue(ev) if ev.child.resolved() && ev.extraction.resolved() => {
            let UnresolvedExtractValue { child, extraction } = ev;
            match extract_value((*child).clone(), &extraction, resolver) {
                Ok(resolved) => Ok(Transformed::yes(resolved)),
                Err(_) => Ok(Transformed::no(Expr::UnresolvedExtractValue(UnresolvedExtractValue { child, extraction }))),
            }
        },
        e => Ok(Transformed::no(e)),
    }).unwrap().data
}

/// Resolve function calls whose arguments are already resolved, leaving
/// unknown names and failed builds for later passes.
pub fn resolve_functions_soft(expr: Expr) -> Expr {
    expr.transform_up(|e| match e {
        Expr::UnresolvedFunction(uf)
            if uf.arguments.iter().all(|a| a.resolved()) && is_registered(&uf.name) => {
            match resolve_function(&uf.name, uf.arguments.clone(), uf.is_distinct) {
                Ok(resolved) => Ok(Transformed::yes(resolved)),
                Err(_) => Ok(Transformed::no(Expr::UnresolvedFunction(uf))),
            }
        },
        e => Ok(Transformed::no(e)),
    }).unwrap().data
}

/// Inline CTE definitions: relations named like a CTE become the CTE's plan,
/// shadowing any catalog table with the same name.
#[derive(Debug)]
pub struct CTESubstitution {
    resolver: Resolver,
}

impl CTESubstitution {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    fn substitute_cte(&self, plan: LogicalPlan, ctes: &[(String, LogicalPlan)]) -> Result<LogicalPlan> {
        let resolver = self.resolver;
        plan.transform_down(|p| match p {
            LogicalPlan::UnresolvedRelation(u) => {
                match ctes.iter().find(|(name, _)| resolver(name, u.table_name())) {
                    Some((_, cte)) => {
                        let substituted = match &u.alias {
                            Some(alias) => LogicalPlan::SubqueryAlias(SubqueryAlias::new(alias.clone(), Arc::new(cte.clone()))),
                            None => cte.clone(),
                        };
                        Ok(Transformed::yes(substituted))
                    },
                    None => Ok(Transformed::no(LogicalPlan::UnresolvedRelation(u))),
                }
            },
            p => Ok(Transformed::no(p)),
        }).map(|t| t.data)
    }
}

impl AnalyzerRule for CTESubstitution {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            LogicalPlan::With(With { child, cte_relations }) => {
                let substituted = self.substitute_cte(Arc::unwrap_or_clone(child), &cte_relations)?;
                Ok(Transformed::yes(substituted))
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "CTESubstitution"
    }
}

/// Replace WINDOW-clause name references with the named specification.
#[derive(Debug)]
pub struct WindowsSubstitution {
    resolver: Resolver,
}

impl WindowsSubstitution {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }
}

impl AnalyzerRule for WindowsSubstitution {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        let resolver = self.resolver;
        plan.transform_down(|plan| match plan {
            LogicalPlan::WithWindowDefinition(WithWindowDefinition { window_definitions, child }) => {
                let defs = &window_definitions;
                let substituted = Arc::unwrap_or_clone(child).transform_up_expressions(|e| match e {
                    Expr::UnresolvedWindowExpression(UnresolvedWindowExpression { child, spec }) => {
                        match defs.iter().find(|(name, _)| resolver(name, &spec.0)) {
                            Some((_, definition)) => Ok(Transformed::yes(Expr::WindowExpression(WindowExpression {
                                window_function: child,
                                spec: definition.clone(),
                            }))),
                            None => Err(format!("Window specification {} is not defined", spec.0)),
                        }
                    },
                    e => Ok(Transformed::no(e)),
                })?.data;
                Ok(Transformed::yes(substituted))
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "WindowsSubstitution"
    }
}

/// Replace `UnresolvedRelation`s with what the catalog returns for them. A
/// miss is fatal; the query can never resolve without the table.
#[derive(Debug)]
pub struct ResolveRelations {
    catalog: Arc<dyn Catalog>,
}

impl ResolveRelations {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn lookup(&self, u: &UnresolvedRelation) -> Result<LogicalPlan> {
        let ident = TableIdentifier::from_parts(&u.name_parts);
        self.catalog.lookup_relation(&ident, u.alias.as_deref())
    }
}

impl AnalyzerRule for ResolveRelations {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            LogicalPlan::InsertIntoTable(i) => {
                if let LogicalPlan::UnresolvedRelation(u) = i.table.as_ref() {
                    let resolved = self.lookup(u)?;
                    // The insert target is addressed directly, not through a
                    // scoping wrapper.
                    let table = eliminate_subquery_aliases(resolved);
                    Ok(Transformed::yes(LogicalPlan::InsertIntoTable(InsertIntoTable {
                        table: Arc::new(table),
                        child: i.child,
                        overwrite: i.overwrite,
                    })))
                } else {
                    Ok(Transformed::no(LogicalPlan::InsertIntoTable(i)))
                }
            },
            LogicalPlan::UnresolvedRelation(u) => {
                self.lookup(&u).map(Transformed::yes)
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "ResolveRelations"
    }
}

/// The workhorse: star expansion, attribute binding, self-join deconfliction
/// and lenient sort-order resolution, bottom-up over nodes whose children are
/// already resolved.
#[derive(Debug)]
pub struct ResolveReferences {
    resolver: Resolver,
}

impl ResolveReferences {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    fn expand_star_list(&self, exprs: Vec<Expr>, input: &[AttributeReference]) -> Result<Vec<Expr>> {
        let resolver = self.resolver;
        let mut expanded = Vec::with_capacity(exprs.len());
        for e in exprs {
            match e {
                Expr::Star(s) => expanded.extend(s.expand(input, resolver)?),
                Expr::UnresolvedAlias(ua) if matches!(ua.child.as_ref(), Expr::Star(_)) => {
                    if let Expr::Star(s) = ua.child.as_ref() {
                        expanded.extend(s.expand(input, resolver)?);
                    }
                },
                other => expanded.push(self.expand_star_inside(other, input)?),
            }
        }
        Ok(expanded)
    }

    /// A star inside function arguments or array/struct constructors expands
    /// in place.
    fn expand_star_inside(&self, expr: Expr, input: &[AttributeReference]) -> Result<Expr> {
        let resolver = self.resolver;
        let splice = |args: Vec<Expr>| -> Result<Vec<Expr>> {
            let mut new_args = Vec::with_capacity(args.len());
            for a in args {
                match a {
                    Expr::Star(s) => new_args.extend(s.expand(input, resolver)?),
                    a => new_args.push(a),
                }
            }
            Ok(new_args)
        };
        expr.transform_down(|e| match e {
            Expr::UnresolvedFunction(UnresolvedFunction { name, arguments, is_distinct })
                if arguments.iter().any(|a| matches!(a, Expr::Star(_))) => {
                Ok(Transformed::yes(Expr::UnresolvedFunction(UnresolvedFunction {
                    name,
                    arguments: splice(arguments)?,
                    is_distinct,
                })))
            },
            Expr::CreateArray(CreateArray { children, .. })
                if children.iter().any(|a| matches!(a, Expr::Star(_))) => {
                Ok(Transformed::yes(Expr::CreateArray(CreateArray::new(splice(children)?))))
            },
            Expr::CreateStruct(CreateStruct { children, .. })
                if children.iter().any(|a| matches!(a, Expr::Star(_))) => {
                Ok(Transformed::yes(Expr::CreateStruct(CreateStruct::new(splice(children)?))))
            },
            e => Ok(Transformed::no(e)),
        }).map(|t| t.data)
    }

    /// Freshen the first node in `right` whose output collides with `left`,
    /// then remap the old attributes through the rest of the right subtree.
    /// Further conflicts are handled on later fixed-point passes.
    fn dedup_right(&self, j: Join) -> Result<Transformed<LogicalPlan>> {
        let Join { left, right, join_type, condition } = j;
        let left_set = left.output_set();
        let right_plan = Arc::unwrap_or_clone(right);
        match find_conflict(&right_plan, &left_set) {
            None => Ok(Transformed::no(LogicalPlan::Join(Join {
                left,
                right: Arc::new(right_plan),
                join_type,
                condition,
            }))),
            Some((old, new)) => {
                let mut mapping: HashMap<ExprId, AttributeReference> = HashMap::new();
                for (o, n) in old.output().into_iter().zip(new.output().into_iter()) {
                    if o.expr_id != n.expr_id {
                        mapping.insert(o.expr_id, n);
                    }
                }
                let replaced = right_plan.transform_down(|p| {
                    if p == old {
                        Ok(Transformed::new(new.clone(), true, TreeNodeRecursion::Jump))
                    } else {
                        Ok(Transformed::no(p))
                    }
                })?.data;
                let mapping = &mapping;
                let remapped = replaced.transform_up_expressions(|e| match e {
                    Expr::AttributeReference(a) => match mapping.get(&a.expr_id) {
                        Some(n) => Ok(Transformed::yes(Expr::AttributeReference(AttributeReference {
                            name: a.name,
                            data_type: n.data_type.clone(),
                            nullable: n.nullable,
                            qualifier: a.qualifier,
                            expr_id: n.expr_id,
                        }))),
                        None => Ok(Transformed::no(Expr::AttributeReference(a))),
                    },
                    e => Ok(Transformed::no(e)),
                })?.data;
                Ok(Transformed::yes(LogicalPlan::Join(Join {
                    left,
                    right: Arc::new(remapped),
                    join_type,
                    condition,
                })))
            },
        }
    }
}

impl AnalyzerRule for ResolveReferences {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        let resolver = self.resolver;
        plan.transform_up(|plan| match plan {
            p if !p.children_resolved() => Ok(Transformed::no(p)),
            LogicalPlan::Project(p) if contains_star(&p.project_list) => {
                let input = p.child.output();
                let project_list = self.expand_star_list(p.project_list, &input)?;
                Ok(Transformed::yes(LogicalPlan::Project(Project::new(project_list, p.child))))
            },
            LogicalPlan::Aggregate(a) if contains_star(&a.aggregate_exprs) => {
                let input = a.child.output();
                let aggregate_exprs = self.expand_star_list(a.aggregate_exprs, &input)?;
                Ok(Transformed::yes(LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs, aggregate_exprs, a.child))))
            },
            LogicalPlan::ScriptTransformation(s) if contains_star(&s.input) => {
                let attrs = s.child.output();
                let input = self.expand_star_list(s.input, &attrs)?;
                Ok(Transformed::yes(LogicalPlan::ScriptTransformation(ScriptTransformation::new(input, s.script, s.output, s.child))))
            },
            LogicalPlan::Join(j) if !j.self_join_resolved() => self.dedup_right(j),
            LogicalPlan::Generate(g) => {
                // Only the generator's arguments are references; the output
                // list carries the column names the user asked for, never
                // columns of the child.
                let input = g.child.output();
                let Generate { generator, join, outer, qualifier, generator_output, child } = g;
                let generator = generator.transform_up(|e| match e {
                    Expr::UnresolvedAttribute(u) => {
                        match resolve_against(&input, &u.name_parts, resolver)? {
                            Some(resolved) => Ok(Transformed::yes(resolved)),
                            None => Ok(Transformed::no(Expr::UnresolvedAttribute(u))),
                        }
                    },
                    Expr::UnresolvedExtractValue(ev) if ev.child.resolved() && ev.extraction.resolved() => {
                        let UnresolvedExtractValue { child, extraction } = ev;
                        extract_value(*child, &extraction, resolver).map(Transformed::yes)
                    },
                    e => Ok(Transformed::no(e)),
                })?;
                Ok(generator.update_data(|generator| LogicalPlan::Generate(Generate {
                    generator, join, outer, qualifier, generator_output, child,
                })))
            },
            LogicalPlan::Sort(s) if !s.order.iter().all(|o| o.resolved()) && s.child.resolved() => {
                // Lenient: ordering that fails to resolve here is left for
                // ResolveSortReferences or the check phase.
                let input = s.child.output();
                let mut changed = false;
                let order = s.order.into_iter().map(|o| {
                    if o.resolved() {
                        o
                    } else {
                        let resolved = resolve_expr_soft(o.clone(), &input, resolver);
                        if resolved != o {
                            changed = true;
                        }
                        resolved
                    }
                }).collect::<Vec<_>>();
                Ok(Transformed::new_transformed(LogicalPlan::Sort(Sort::new(order, s.child)), changed))
            },
            p => {
                let input = p.child_attributes();
                p.map_expressions(|expr| expr.transform_up(|e| match e {
                    Expr::UnresolvedAttribute(u) => {
                        match resolve_against(&input, &u.name_parts, resolver)? {
                            Some(resolved) => Ok(Transformed::yes(resolved)),
                            None => Ok(Transformed::no(Expr::UnresolvedAttribute(u))),
                        }
                    },
                    Expr::UnresolvedExtractValue(ev) if ev.child.resolved() && ev.extraction.resolved() => {
                        let UnresolvedExtractValue { child, extraction } = ev;
                        extract_value(*child, &extraction, resolver).map(Transformed::yes)
                    },
                    e => Ok(Transformed::no(e)),
                }))
            },
        })
    }

    fn name(&self) -> &str {
        "ResolveReferences"
    }
}

/// Locate the first node (top-down) in `plan` whose produced attributes clash
/// with `conflicting`, paired with a freshened copy.
fn find_conflict(plan: &LogicalPlan, conflicting: &AttributeSet) -> Option<(LogicalPlan, LogicalPlan)> {
    let conflicts = |attrs: &[AttributeReference]| attrs.iter().any(|a| conflicting.contains(a));
    match plan {
        LogicalPlan::LocalRelation(l) if conflicts(&l.output) => {
            return Some((plan.clone(), LogicalPlan::LocalRelation(l.new_instance())));
        },
        LogicalPlan::Project(p) => {
            let aliases = find_aliases(&p.project_list);
            if conflicts(&aliases) {
                let new_list = new_aliases(p.project_list.clone());
                return Some((plan.clone(), LogicalPlan::Project(Project::new(new_list, p.child.clone()))));
            }
        },
        LogicalPlan::Aggregate(a) => {
            let aliases = find_aliases(&a.aggregate_exprs);
            if conflicts(&aliases) {
                let new_exprs = new_aliases(a.aggregate_exprs.clone());
                return Some((plan.clone(), LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs.clone(), new_exprs, a.child.clone()))));
            }
        },
        LogicalPlan::Generate(g) => {
            let out: Vec<AttributeReference> = g.generator_output.iter()
                .filter_map(|e| e.to_attribute())
                .collect();
            if conflicts(&out) {
                let new_output = g.generator_output.iter().map(|e| match e {
                    Expr::AttributeReference(a) => Expr::AttributeReference(a.new_instance()),
                    e => e.clone(),
                }).collect();
                let mut fresh = g.clone();
                fresh.generator_output = new_output;
                return Some((plan.clone(), LogicalPlan::Generate(fresh)));
            }
        },
        LogicalPlan::Window(w) => {
            let aliases = find_aliases(&w.window_exprs);
            if conflicts(&aliases) {
                let mut fresh = w.clone();
                fresh.window_exprs = new_aliases(w.window_exprs.clone());
                return Some((plan.clone(), LogicalPlan::Window(fresh)));
            }
        },
        _ => {},
    }
    for child in plan.children() {
        if let Some(found) = find_conflict(child, conflicting) {
            return Some(found);
        }
    }
    None
}

fn find_aliases(exprs: &[Expr]) -> Vec<AttributeReference> {
    exprs.iter().filter_map(|e| match e {
        Expr::Alias(a) => Some(a.to_attribute()),
        _ => None,
    }).collect()
}

fn new_aliases(exprs: Vec<Expr>) -> Vec<Expr> {
    exprs.into_iter().map(|e| match e {
        Expr::Alias(a) => Expr::Alias(Alias::new(*a.child, a.name)),
        e => e,
    }).collect()
}

/// ORDER BY may reference attributes the SELECT list dropped; pull them
/// through and project them away again on top.
#[derive(Debug)]
pub struct ResolveSortReferences {
    resolver: Resolver,
}

impl ResolveSortReferences {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    fn resolve_over_project(&self, order: Vec<Expr>, p: &Project) -> Result<Transformed<LogicalPlan>> {
        let grandchild_output = p.child.output();
        let project_output = named_exprs_to_attributes(&p.project_list);
        let project_set = AttributeSet::from_attributes(project_output.iter());
        let original_order = order.clone();
        let new_order: Vec<Expr> = order.into_iter().map(|o| {
            if o.resolved() {
                o
            } else {
                resolve_expr_soft(o, &grandchild_output, self.resolver)
            }
        }).collect();

        let mut missing: Vec<AttributeReference> = Vec::new();
        for o in &new_order {
            for a in collect_attributes(o) {
                if !project_set.contains(&a) && !missing.iter().any(|m| m.expr_id == a.expr_id) {
                    missing.push(a);
                }
            }
        }
        if missing.is_empty() {
            // Everything the ordering needs is already projected; the lenient
            // pass in ResolveReferences covers this case.
            let sort = LogicalPlan::Sort(Sort::new(original_order, Arc::new(LogicalPlan::Project(p.clone()))));
            return Ok(Transformed::no(sort));
        }
        let mut inner_list = p.project_list.clone();
        inner_list.extend(missing.into_iter().map(Expr::AttributeReference));
        let inner = LogicalPlan::Project(Project::new(inner_list, p.child.clone()));
        let sort = LogicalPlan::Sort(Sort::new(new_order, Arc::new(inner)));
        let outer_list = project_output.into_iter().map(Expr::AttributeReference).collect();
        Ok(Transformed::yes(LogicalPlan::Project(Project::new(outer_list, Arc::new(sort)))))
    }

    fn resolve_over_aggregate(&self, order: Vec<Expr>, a: &Aggregate) -> Result<Transformed<LogicalPlan>> {
        let child_output = a.child.output();
        let agg_output = named_exprs_to_attributes(&a.aggregate_exprs);
        let agg_set = AttributeSet::from_attributes(agg_output.iter());
        let grouping_attrs: Vec<AttributeReference> =
            a.grouping_exprs.iter().filter_map(|e| e.to_attribute()).collect();
        let grouping_set = AttributeSet::from_attributes(grouping_attrs.iter());

        let mut extra_aggs: Vec<Expr> = Vec::new();
        let mut extra_set = AttributeSet::new();
        let mut changed = false;
        let mut new_order: Vec<Expr> = Vec::with_capacity(order.len());
        for o in order {
            if o.resolved() {
                new_order.push(o);
                continue;
            }
            // Resolve the ordering as though it sat inside the aggregate, so
            // that aggregate calls over the child's columns take shape.
            let resolved = resolve_functions_soft(resolve_expr_soft(o.clone(), &child_output, self.resolver));
            if !resolved.resolved() {
                new_order.push(o);
                continue;
            }
            let rewritten = resolved.transform_down(|e| match e {
                Expr::AggregateExpression(_) => {
                    // Reuse a column the aggregate already computes, otherwise
                    // append it under a private name.
                    let existing = a.aggregate_exprs.iter().find_map(|ae| match ae {
                        Expr::Alias(al) if al.child.semantic_equals(&e) => Some(al.to_attribute()),
                        _ => None,
                    });
                    let attr = match existing {
                        Some(attr) => attr,
                        None => {
                            let alias = Alias::new(e, "_aggOrdering");
                            let attr = alias.to_attribute();
                            extra_aggs.push(Expr::Alias(alias));
                            extra_set.add(&attr);
                            attr
                        },
                    };
                    Ok(Transformed::new(Expr::AttributeReference(attr), true, TreeNodeRecursion::Jump))
                },
                e => Ok(Transformed::no(e)),
            })?.data;
            // Whatever is left must be something the aggregate can provide.
            let refs = collect_attributes(&rewritten);
            let supportable = refs.iter().all(|r| {
                agg_set.contains(r) || grouping_set.contains(r) || extra_set.contains(r)
            });
            if !supportable {
                new_order.push(o);
                continue;
            }
            for r in refs {
                if grouping_set.contains(&r) && !agg_set.contains(&r) && !extra_set.contains(&r) {
                    extra_set.add(&r);
                    extra_aggs.push(Expr::AttributeReference(r));
                }
            }
            changed = true;
            new_order.push(rewritten);
        }
        if !changed {
            return Ok(Transformed::no(LogicalPlan::Sort(Sort::new(new_order, Arc::new(LogicalPlan::Aggregate(a.clone()))))));
        }
        let mut new_aggs = a.aggregate_exprs.clone();
        new_aggs.extend(extra_aggs);
        let aggregate = LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs.clone(), new_aggs, a.child.clone()));
        let sort = LogicalPlan::Sort(Sort::new(new_order, Arc::new(aggregate)));
        let outer_list = agg_output.into_iter().map(Expr::AttributeReference).collect();
        Ok(Transformed::yes(LogicalPlan::Project(Project::new(outer_list, Arc::new(sort)))))
    }
}

impl AnalyzerRule for ResolveSortReferences {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            LogicalPlan::Sort(s) if !s.order.iter().all(|o| o.resolved()) => {
                match s.child.as_ref() {
                    child @ LogicalPlan::Project(p) if child.resolved() =>
                        self.resolve_over_project(s.order, p),
                    child @ LogicalPlan::Aggregate(a) if child.resolved() =>
                        self.resolve_over_aggregate(s.order, a),
                    _ => Ok(Transformed::no(LogicalPlan::Sort(s))),
                }
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "ResolveSortReferences"
    }
}

/// The view `ResolveGenerate` uses: a generator with its user-supplied column
/// names, or an error when the aliasing cannot be valid.
fn aliased_generator(e: &Expr) -> Result<Option<(Box<dyn Generator>, Vec<String>)>> {
    match e {
        Expr::Alias(a) => match a.child.as_ref() {
            Expr::Generator(g) => {
                if g.element_schema().fields.len() > 1 {
                    Err(format!(
                        "Expect multiple names given for {}, but only single name '{}' specified",
                        g.name(), a.name,
                    ))
                } else {
                    Ok(Some((g.clone(), vec![a.name.clone()])))
                }
            },
            _ => Ok(None),
        },
        Expr::MultiAlias(m) => match m.child.as_ref() {
            Expr::Generator(g) => Ok(Some((g.clone(), m.names.clone()))),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}

fn make_generator_output(r#gen: &dyn Generator, names: &[String]) -> Result<Vec<Expr>> {
    let elements = r#gen.element_schema().fields;
    if names.len() == elements.len() {
        Ok(names.iter().zip(elements.into_iter())
            .map(|(name, field)| Expr::AttributeReference(AttributeReference::new(name.clone(), field.data_type)))
            .collect())
    } else if names.is_empty() {
        Ok(elements.into_iter().enumerate()
            .map(|(i, field)| Expr::AttributeReference(AttributeReference::new(format!("_c{}", i), field.data_type)))
            .collect())
    } else {
        Err(format!(
            "The number of aliases supplied in the AS clause does not match the number of columns output by the UDTF expected {} aliases but got {}",
            elements.len(), names.len(),
        ))
    }
}

/// Give `Generate` nodes their output attributes, and rewrite SELECT lists
/// holding an aliased generator into a `Generate` node below the projection.
#[derive(Debug)]
pub struct ResolveGenerate;

impl AnalyzerRule for ResolveGenerate {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            p if !p.children_resolved() => Ok(Transformed::no(p)),
            LogicalPlan::Generate(g)
                if g.generator.resolved()
                    && !(g.generator_output_check() && g.generator_output.iter().all(|e| e.resolved())) => {
                if let Expr::Generator(r#gen) = &g.generator {
                    let names: Vec<String> = g.generator_output.iter().filter_map(|e| match e {
                        Expr::UnresolvedAttribute(u) => u.name_parts.last().cloned(),
                        Expr::AttributeReference(a) => Some(a.name.clone()),
                        _ => None,
                    }).collect();
                    let generator_output = make_generator_output(r#gen.as_ref(), &names)?;
                    Ok(Transformed::yes(LogicalPlan::Generate(Generate::new(
                        g.generator.clone(), g.join, g.outer, g.qualifier.clone(), generator_output, g.child.clone(),
                    ))))
                } else {
                    Ok(Transformed::no(LogicalPlan::Generate(g)))
                }
            },
            LogicalPlan::Project(p) => {
                let mut generators: Vec<(usize, Box<dyn Generator>, Vec<String>)> = Vec::new();
                for (i, e) in p.project_list.iter().enumerate() {
                    if let Some((g, names)) = aliased_generator(e)? {
                        generators.push((i, g, names));
                    }
                }
                match generators.len() {
                    0 => Ok(Transformed::no(LogicalPlan::Project(p))),
                    1 => {
                        let (position, r#gen, names) = generators.into_iter().next().unwrap();
                        if !p.project_list[position].children_resolved() {
                            return Ok(Transformed::no(LogicalPlan::Project(p)));
                        }
                        let generator_output = make_generator_output(r#gen.as_ref(), &names)?;
                        let join = p.project_list.len() > 1;
                        let generate = Generate::new(
                            Expr::Generator(r#gen), join, false, None, generator_output.clone(), p.child.clone(),
                        );
                        let mut new_list = Vec::with_capacity(p.project_list.len() + generator_output.len());
                        for (i, e) in p.project_list.into_iter().enumerate() {
                            if i == position {
                                new_list.extend(generator_output.iter().cloned());
                            } else {
                                new_list.push(e);
                            }
                        }
                        Ok(Transformed::yes(LogicalPlan::Project(Project::new(
                            new_list, Arc::new(LogicalPlan::Generate(generate)),
                        ))))
                    },
                    n => {
                        let names = generators.iter().map(|(_, g, _)| g.name().to_string()).collect::<Vec<_>>().join(", ");
                        Err(format!("Only one generator allowed per select clause but found {}: {}", n, names))
                    },
                }
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "ResolveGenerate"
    }
}

/// Replace function calls with what the registry returns for them, applying
/// the DISTINCT rules for aggregates. Unknown names are left for the check
/// phase to report.
#[derive(Debug)]
pub struct ResolveFunctions;

impl AnalyzerRule for ResolveFunctions {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            p if !p.children_resolved() => Ok(Transformed::no(p)),
            p => {
                p.map_expressions(|expr| {
                    expr.transform_up(|e| match e {
                        Expr::UnresolvedFunction(uf) if uf.arguments.iter().all(|a| a.resolved()) => {
                            if !is_registered(&uf.name) {
                                return Ok(Transformed::no(Expr::UnresolvedFunction(uf)));
                            }
                            resolve_function(&uf.name, uf.arguments.clone(), uf.is_distinct)
                                .map(Transformed::yes)
                        },
                        e => Ok(Transformed::no(e)),
                    })
                })
            },
        })
    }

    fn name(&self) -> &str {
        "ResolveFunctions"
    }
}

/// Name the output expressions the parser left unnamed.
#[derive(Debug)]
pub struct ResolveAliases;

impl ResolveAliases {
    fn has_unresolved_alias(exprs: &[Expr]) -> bool {
        exprs.iter().any(|e| matches!(e, Expr::UnresolvedAlias(_)))
    }

    fn assign_aliases(exprs: Vec<Expr>) -> Vec<Expr> {
        exprs.into_iter().enumerate().map(|(i, e)| match e {
            Expr::UnresolvedAlias(ua) => {
                match *ua.child {
                    child @ Expr::UnresolvedAttribute(_) | child @ Expr::Star(_) =>
                        Expr::UnresolvedAlias(UnresolvedAlias::new(child)),
                    child @ Expr::AttributeReference(_)
                     | child @ Expr::Alias(_)
                     | child @ Expr::MultiAlias(_) => child,
                    Expr::GetStructField(g) => {
                        let name = g.field.name.clone();
                        Expr::Alias(Alias::new(Expr::GetStructField(g), name))
                    },
                    Expr::GetArrayStructFields(g) => {
                        let name = g.field.name.clone();
                        Expr::Alias(Alias::new(Expr::GetArrayStructFields(g), name))
                    },
                    Expr::Generator(g) if g.element_schema().fields.len() > 1 =>
                        Expr::MultiAlias(MultiAlias::new(Expr::Generator(g), vec![])),
                    child if !child.resolved() => Expr::UnresolvedAlias(UnresolvedAlias::new(child)),
                    child => Expr::Alias(Alias::new(child, format!("_c{}", i))),
                }
            },
            e => e,
        }).collect()
    }
}

impl AnalyzerRule for ResolveAliases {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            LogicalPlan::Project(p) if p.child.resolved() && Self::has_unresolved_alias(&p.project_list) => {
                let project_list = Self::assign_aliases(p.project_list);
                Ok(Transformed::yes(LogicalPlan::Project(Project::new(project_list, p.child))))
            },
            LogicalPlan::Aggregate(a) if a.child.resolved() && Self::has_unresolved_alias(&a.aggregate_exprs) => {
                let aggregate_exprs = Self::assign_aliases(a.aggregate_exprs);
                Ok(Transformed::yes(LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs, aggregate_exprs, a.child))))
            },
            LogicalPlan::Cube(c) if c.child.resolved() && Self::has_unresolved_alias(&c.aggregations) => {
                let aggregations = Self::assign_aliases(c.aggregations);
                Ok(Transformed::yes(LogicalPlan::Cube(Cube::new(c.group_by_exprs, aggregations, c.child))))
            },
            LogicalPlan::Rollup(r) if r.child.resolved() && Self::has_unresolved_alias(&r.aggregations) => {
                let aggregations = Self::assign_aliases(r.aggregations);
                Ok(Transformed::yes(LogicalPlan::Rollup(Rollup::new(r.group_by_exprs, aggregations, r.child))))
            },
            LogicalPlan::GroupingSets(g) if g.child.resolved() && Self::has_unresolved_alias(&g.aggregations) => {
                let aggregations = Self::assign_aliases(g.aggregations);
                Ok(Transformed::yes(LogicalPlan::GroupingSets(GroupingSets::new(g.bitmasks, g.group_by_exprs, aggregations, g.child))))
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "ResolveAliases"
    }
}

/// A SELECT list that aggregates without a GROUP BY is an aggregation over
/// the whole input.
#[derive(Debug)]
pub struct GlobalAggregates;

impl GlobalAggregates {
    pub fn contains_aggregates(expr: &Expr) -> bool {
        let mut contains = false;
        expr.apply(|expr| {
            match expr {
                Expr::AggregateExpression(_) => {
                    contains = true;
                    Ok(TreeNodeRecursion::Stop)
                },
                _ => Ok(TreeNodeRecursion::Continue),
            }
        }).unwrap();
        contains
    }
}

impl AnalyzerRule for GlobalAggregates {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match &plan {
            LogicalPlan::Project(Project { project_list, child })
                if project_list.iter().any(|e| Self::contains_aggregates(e)) => {
                Ok(Transformed::yes(LogicalPlan::Aggregate(Aggregate::new(vec![], project_list.clone(), child.clone()))))
            },
            _ => Ok(Transformed::no(plan)),
        })
    }

    fn name(&self) -> &str {
        "GlobalAggregates"
    }
}

/// HAVING: lift a filter condition that aggregates into the aggregate below
/// it, so the aggregate functions inside the condition can be evaluated.
#[derive(Debug)]
pub struct UnresolvedHavingClauseAttributes {
    resolver: Resolver,
}

impl UnresolvedHavingClauseAttributes {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    fn contains_aggregate_like(expr: &Expr) -> bool {
        expr.exists(|e| Ok(match e {
            Expr::AggregateExpression(_) => true,
            Expr::UnresolvedFunction(uf) => is_aggregate_function(&uf.name),
            _ => false,
        })).unwrap()
    }
}

impl AnalyzerRule for UnresolvedHavingClauseAttributes {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_up(|plan| match plan {
            LogicalPlan::Filter(f) => {
                let lift = match f.child.as_ref() {
                    LogicalPlan::Aggregate(a) =>
                        LogicalPlan::Aggregate(a.clone()).resolved()
                            && !f.condition.resolved()
                            && Self::contains_aggregate_like(&f.condition),
                    _ => false,
                };
                if !lift {
                    return Ok(Transformed::no(LogicalPlan::Filter(f)));
                }
                let a = match f.child.as_ref() {
                    LogicalPlan::Aggregate(a) => a.clone(),
                    _ => unreachable!(),
                };
                // Resolve the condition as though it sat in the aggregate list.
                let resolved_cond = resolve_functions_soft(
                    resolve_expr_soft(f.condition.clone(), &a.child.output(), self.resolver));
                // The type-coercion rules still get to fix up the condition
                // once it sits inside the aggregate; only unbound names block
                // the lift.
                if resolved_cond.contains_unresolved() {
                    return Ok(Transformed::no(LogicalPlan::Filter(f)));
                }
                let alias = Alias::new(resolved_cond, "havingCondition");
                let having_attr = alias.to_attribute();
                let mut new_aggs = vec![Expr::Alias(alias)];
                new_aggs.extend(a.aggregate_exprs.iter().cloned());
                let aggregate = LogicalPlan::Aggregate(Aggregate::new(a.grouping_exprs.clone(), new_aggs, a.child.clone()));
                let filter = LogicalPlan::Filter(Filter::new(Expr::AttributeReference(having_attr), Arc::new(aggregate)));
                let output = named_exprs_to_attributes(&a.aggregate_exprs)
                    .into_iter().map(Expr::AttributeReference).collect();
                Ok(Transformed::yes(LogicalPlan::Project(Project::new(output, Arc::new(filter)))))
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "UnresolvedHavingClauseAttributes"
    }
}

/// Nondeterministic expressions outside Project/Filter are pinned into a
/// projection below the operator so each occurrence is evaluated exactly
/// once.
#[derive(Debug)]
pub struct PullOutNondeterministic;

impl AnalyzerRule for PullOutNondeterministic {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        plan.transform_down(|plan| match plan {
            p if !p.resolved() => Ok(Transformed::no(p)),
            p @ LogicalPlan::Project(_) | p @ LogicalPlan::Filter(_) => Ok(Transformed::no(p)),
            p if p.children().len() == 1
                && p.output() == p.children()[0].output()
                && p.expressions().iter().any(|e| !e.deterministic()) => {
                let child = p.children()[0].clone();
                let original_output = p.output();
                let mut pulled: Vec<Expr> = Vec::new();
                // Each occurrence gets its own alias; merging two rand() calls
                // would change the result.
                let new_p = p.map_expressions(|expr| expr.transform_up(|e| match e {
                    Expr::ScalarFunction(f) if !f.deterministic() => {
                        let alias = Alias::new(Expr::ScalarFunction(f), "_nondeterministic");
                        let attr = alias.to_attribute();
                        pulled.push(Expr::Alias(alias));
                        Ok(Transformed::yes(Expr::AttributeReference(attr)))
                    },
                    e => Ok(Transformed::no(e)),
                }))?.data;
                let mut inner_list: Vec<Expr> = child.output().into_iter().map(Expr::AttributeReference).collect();
                inner_list.extend(pulled);
                let inner = LogicalPlan::Project(Project::new(inner_list, Arc::new(child)));
                let rebuilt = new_p.with_new_children(vec![inner]);
                let outer_list = original_output.into_iter().map(Expr::AttributeReference).collect();
                Ok(Transformed::new(
                    LogicalPlan::Project(Project::new(outer_list, Arc::new(rebuilt))),
                    true,
                    TreeNodeRecursion::Jump,
                ))
            },
            p => Ok(Transformed::no(p)),
        })
    }

    fn name(&self) -> &str {
        "PullOutNondeterministic"
    }
}

/// Scoping wrappers only matter during resolution; strip them afterwards.
pub fn eliminate_subquery_aliases(plan: LogicalPlan) -> LogicalPlan {
    plan.transform_up(|p| match p {
        LogicalPlan::SubqueryAlias(SubqueryAlias { child, .. }) =>
            Ok(Transformed::yes(Arc::unwrap_or_clone(child))),
        p => Ok(Transformed::no(p)),
    }).unwrap().data
}

#[derive(Debug)]
pub struct EliminateSubqueryAliases;

impl AnalyzerRule for EliminateSubqueryAliases {
    fn analyze(&self, plan: LogicalPlan) -> Result<Transformed<LogicalPlan>> {
        Ok(Transformed::yes(eliminate_subquery_aliases(plan)))
    }

    fn name(&self) -> &str {
        "EliminateSubqueryAliases"
    }
}
