use crate::Result;
use crate::expr::*;
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};

impl TreeNode for Expr {
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
            Expr::UnresolvedAttribute(_)
            | Expr::AttributeReference(_)
            | Expr::Literal(_)
            | Expr::Star(_)
            | Expr::WindowFunction(_) => Transformed::no(self),
            Expr::Alias(Alias {
                child,
                name,
                expr_id,
            }) => f(*child)?
                .update_data(|child| Expr::Alias(Alias::new_with_expr_id(child, name, expr_id))),
            Expr::MultiAlias(MultiAlias { child, names }) => f(*child)?
                .update_data(|child| Expr::MultiAlias(MultiAlias::new(child, names))),
            Expr::UnresolvedAlias(UnresolvedAlias { child }) => f(*child)?
                .update_data(|child| Expr::UnresolvedAlias(UnresolvedAlias::new(child))),
            Expr::UnresolvedFunction(UnresolvedFunction { name, arguments, is_distinct }) => {
                arguments.map_elements(f)?.update_data(|arguments| {
                    Expr::UnresolvedFunction(UnresolvedFunction { name, arguments, is_distinct })
                })
            }
            Expr::UnresolvedExtractValue(UnresolvedExtractValue { child, extraction }) => {
                (child, extraction)
                    .map_elements(f)?
                    .update_data(|(child, extraction)| {
                        Expr::UnresolvedExtractValue(UnresolvedExtractValue { child, extraction })
                    })
            }
            Expr::UnresolvedWindowExpression(UnresolvedWindowExpression { child, spec }) => f(*child)?
                .update_data(|child| {
                    Expr::UnresolvedWindowExpression(UnresolvedWindowExpression::new(child, spec))
                }),
            Expr::SortOrder(SortOrder { child, direction }) => f(*child)?
                .update_data(|child| Expr::SortOrder(SortOrder::new(child, direction))),
            Expr::WindowExpression(WindowExpression { window_function, spec }) => {
                let WindowSpecDefinition { partition_spec, order_spec, frame } = spec;
                ((window_function, partition_spec), order_spec)
                    .map_elements(f)?
                    .update_data(|((window_function, partition_spec), order_spec)| {
                        Expr::WindowExpression(WindowExpression {
                            window_function,
                            spec: WindowSpecDefinition { partition_spec, order_spec, frame },
                        })
                    })
            }
            Expr::AggregateExpression(AggregateExpression { func, mode, is_distinct }) => {
                let args = func
                    .args()
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>();
                args.map_elements(f)?.update_data(|args| {
                    Expr::AggregateExpression(AggregateExpression {
                        func: func.rewrite_args(args),
                        mode,
                        is_distinct,
                    })
                })
            }
            Expr::Generator(r#gen) => {
                let args = r#gen
                    .args()
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>();
                args.map_elements(f)?
                    .update_data(|args| Expr::Generator(r#gen.rewrite_args(args)))
            }
            Expr::GetStructField(GetStructField { child, field, ordinal }) => f(*child)?
                .update_data(|child| Expr::GetStructField(GetStructField::new(child, field, ordinal))),
            Expr::GetArrayStructFields(GetArrayStructFields { child, field, ordinal, .. }) => f(*child)?
                .update_data(|child| Expr::GetArrayStructFields(GetArrayStructFields::new(child, field, ordinal))),
            Expr::CreateArray(CreateArray { children, .. }) => children
                .map_elements(f)?
                .update_data(|children| Expr::CreateArray(CreateArray::new(children))),
            Expr::CreateStruct(CreateStruct { children, .. }) => children
                .map_elements(f)?
                .update_data(|children| Expr::CreateStruct(CreateStruct::new(children))),
            Expr::Cast(Cast { child, data_type }) => f(*child)?.update_data(|e| e.cast(data_type)),
            Expr::Not(child) => f(*child)?.update_data(|e| e.not()),
            Expr::IsNull(child) => f(*child)?.update_data(|e| e.is_null()),
            Expr::IsNotNull(child) => f(*child)?.update_data(|e| e.is_not_null()),
            Expr::BinaryOperator(BinaryOperator { left, op, right }) => (left, right)
                .map_elements(f)?
                .update_data(|(new_left, new_right)| {
                    Expr::BinaryOperator(BinaryOperator::new(new_left, op, new_right))
                }),
            Expr::Like(Like { expr, pattern }) => {
                (expr, pattern)
                    .map_elements(f)?
                    .update_data(|(new_expr, new_pattern)| {
                        Expr::Like(Like::new(new_expr, new_pattern))
                    })
            }
            Expr::RLike(Like { expr, pattern }) => {
                (expr, pattern)
                    .map_elements(f)?
                    .update_data(|(new_expr, new_pattern)| {
                        Expr::RLike(Like::new(new_expr, new_pattern))
                    })
            }
            Expr::In(In { value, list }) => (value, list)
                .map_elements(f)?
                .update_data(|(value, list)| Expr::In(In { value, list })),
            Expr::ScalarFunction(func) => {
                let args = func
                    .args()
                    .into_iter()
                    .map(|x| x.clone())
                    .collect::<Vec<_>>();
                args.map_elements(f)?
                    .update_data(|args| Expr::ScalarFunction(func.rewrite_args(args)))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_transform_up_expr() {
        let a = AttributeReference::new("a", DataType::Int);
        let expr = Expr::unresolved_attribute("a").cast(DataType::Long).alias("x");
        let resolved = expr.transform_up(|e| match &e {
            Expr::UnresolvedAttribute(_) => Ok(Transformed::yes(Expr::AttributeReference(a.clone()))),
            _ => Ok(Transformed::no(e)),
        }).unwrap();
        assert!(resolved.transformed);
        assert!(resolved.data.resolved());
        assert_eq!(resolved.data.name(), Some("x"));
    }

    #[test]
    fn test_apply_stops() {
        let expr = Expr::int_lit(1).cast(DataType::Long).eq(Expr::long_lit(2));
        let mut seen = 0;
        expr.apply(|_| {
            seen += 1;
            Ok(TreeNodeRecursion::Continue)
        }).unwrap();
        assert_eq!(seen, 4);

        let found = expr.exists(|e| Ok(matches!(e, Expr::Literal(_)))).unwrap();
        assert!(found);
    }
}
