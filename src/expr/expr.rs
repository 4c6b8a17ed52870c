use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use itertools::Itertools;
use crate::{Operator, Result};
use crate::data::Value;
use crate::expr::aggregate::AggregateExpression;
use crate::expr::binary_expr;
use crate::expr::generator::Generator;
use crate::expr::scalar::ScalarFunction;
use crate::expr::window::{UnresolvedWindowExpression, WindowExpression, WindowFunction};
use crate::tree_node::{Transformed, TreeNode, TreeNodeContainer, TreeNodeRecursion};
use crate::types::{DataType, Field};

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum Expr {
    Literal(Literal),
    UnresolvedAttribute(UnresolvedAttribute),
    AttributeReference(AttributeReference),
    Alias(Alias),
    MultiAlias(MultiAlias),
    UnresolvedAlias(UnresolvedAlias),
    UnresolvedFunction(UnresolvedFunction),
    UnresolvedExtractValue(UnresolvedExtractValue),
    UnresolvedWindowExpression(UnresolvedWindowExpression),
    Star(Star),
    SortOrder(SortOrder),
    WindowExpression(WindowExpression),
    WindowFunction(WindowFunction),
    AggregateExpression(AggregateExpression),
    Generator(Box<dyn Generator>),
    GetStructField(GetStructField),
    GetArrayStructFields(GetArrayStructFields),
    CreateArray(CreateArray),
    CreateStruct(CreateStruct),
    Cast(Cast),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    BinaryOperator(BinaryOperator),
    Like(Like),
    RLike(Like),
    In(In),
    ScalarFunction(Box<dyn ScalarFunction>),
}

impl Expr {
    pub fn foldable(&self) -> bool {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) | Expr::UnresolvedAlias(_)
             | Expr::UnresolvedExtractValue(_) | Expr::UnresolvedWindowExpression(_) | Expr::Star(_) => false,
            // We should never fold named expressions in order to not remove the alias.
            Expr::AttributeReference(_) | Expr::Alias(_) | Expr::MultiAlias(_) => false,
            Expr::Literal(_) => true,
            Expr::AggregateExpression(_) | Expr::Generator(_)
             | Expr::WindowExpression(_) | Expr::WindowFunction(_) | Expr::SortOrder(_) => false,
            Expr::ScalarFunction(f) => f.foldable(),
            _ => self.children().iter().all(|c| c.foldable()),
        }
    }

    pub fn data_type(&self) -> &DataType {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) | Expr::UnresolvedAlias(_)
             | Expr::UnresolvedExtractValue(_) | Expr::UnresolvedWindowExpression(_)
             | Expr::Star(_) | Expr::MultiAlias(_) =>
                panic!("UnresolvedExpr:{:?}", self),
            Expr::Literal(l) => &l.data_type,
            Expr::AttributeReference(a) => &a.data_type,
            Expr::Alias(e) => e.child.data_type(),
            Expr::SortOrder(s) => s.child.data_type(),
            Expr::WindowExpression(w) => w.window_function.data_type(),
            Expr::WindowFunction(_) => DataType::int_type(),
            Expr::AggregateExpression(a) => a.func.data_type(),
            Expr::Generator(g) => g.data_type(),
            Expr::GetStructField(g) => &g.field.data_type,
            Expr::GetArrayStructFields(g) => &g.data_type,
            Expr::CreateArray(c) => &c.data_type,
            Expr::CreateStruct(c) => &c.data_type,
            Expr::Cast(c) => &c.data_type,
            Expr::Not(_) | Expr::IsNull(_) | Expr::IsNotNull(_) => DataType::boolean_type(),
            Expr::BinaryOperator(BinaryOperator{left, op, right: _}) => match op {
                Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide | Operator::Modulo =>
                    left.data_type(),
                Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq =>
                    DataType::boolean_type(),
                Operator::And | Operator::Or =>
                    DataType::boolean_type(),
            },
            Expr::Like(_) => DataType::boolean_type(),
            Expr::RLike(_) => DataType::boolean_type(),
            Expr::In(_) => DataType::boolean_type(),
            Expr::ScalarFunction(f) => f.data_type(),
        }
    }

    pub fn nullable(&self) -> bool {
        match self {
            Expr::Literal(l) => l.value.is_null(),
            Expr::AttributeReference(a) => a.nullable,
            Expr::Alias(a) => a.child.nullable(),
            Expr::SortOrder(s) => s.child.nullable(),
            Expr::WindowExpression(w) => w.window_function.nullable(),
            Expr::WindowFunction(_) => false,
            Expr::AggregateExpression(a) => a.func.nullable(),
            Expr::IsNull(_) | Expr::IsNotNull(_) => false,
            Expr::ScalarFunction(f) => f.nullable(),
            _ => true,
        }
    }

    pub fn resolved(&self) -> bool {
        match self {
            Expr::UnresolvedAttribute(_) | Expr::UnresolvedFunction(_) | Expr::UnresolvedAlias(_)
             | Expr::UnresolvedExtractValue(_) | Expr::UnresolvedWindowExpression(_)
             | Expr::Star(_) | Expr::MultiAlias(_) =>
                false,
            _ => self.children_resolved() && self.check_input_data_types().is_ok()
        }
    }

    pub fn children_resolved(&self) -> bool {
        self.children().iter().all(|c| c.resolved())
    }

    /// True while any `Unresolved*` node remains in the subtree. Weaker than
    /// `!resolved()`: an expression whose names are all bound may still fail
    /// its type checks until coercion runs.
    pub fn contains_unresolved(&self) -> bool {
        self.exists(|e| Ok(matches!(e,
            Expr::UnresolvedAttribute(_)
            | Expr::UnresolvedFunction(_)
            | Expr::UnresolvedAlias(_)
            | Expr::UnresolvedExtractValue(_)
            | Expr::UnresolvedWindowExpression(_)
            | Expr::Star(_)
            | Expr::MultiAlias(_)))).unwrap()
    }

    pub fn check_input_data_types(&self) -> Result<()> {
        match self {
            Expr::UnresolvedAttribute(_)
             | Expr::UnresolvedFunction(_)
             | Expr::UnresolvedAlias(_)
             | Expr::UnresolvedExtractValue(_)
             | Expr::UnresolvedWindowExpression(_)
             | Expr::Star(_)
             | Expr::MultiAlias(_)
             | Expr::AttributeReference(_)
             | Expr::Literal(_)
             | Expr::Alias(_)
             | Expr::SortOrder(_)
             | Expr::WindowFunction(_)
             | Expr::CreateArray(_)
             | Expr::CreateStruct(_) =>
                Ok(()),
            Expr::WindowExpression(w) => w.window_function.check_input_data_types(),
            Expr::AggregateExpression(a) => a.func.check_input_data_types(),
            Expr::Generator(g) => g.check_input_data_types(),
            Expr::GetStructField(g) => {
                if !matches!(g.child.data_type(), DataType::Struct(_)) {
                    Err(format!("{:?} requires struct type, not {}", self, g.child.data_type()))
                } else {
                    Ok(())
                }
            },
            Expr::GetArrayStructFields(g) => {
                match g.child.data_type() {
                    DataType::Array(tp) if matches!(tp.as_ref(), DataType::Struct(_)) => Ok(()),
                    tp => Err(format!("{:?} requires array of struct type, not {}", self, tp)),
                }
            },
            Expr::Cast(Cast{child, data_type}) => {
                let from = child.data_type();
                if can_cast(from, data_type) {
                    Ok(())
                } else {
                    Err(format!("cannot cast {} to {}", from, data_type))
                }
            },
            Expr::Not(child) => {
                if child.data_type() != DataType::boolean_type() {
                    Err(format!("{:?} requires boolean type, not {}", self, child.data_type()))
                } else {
                    Ok(())
                }
            },
            Expr::IsNull(_) | Expr::IsNotNull(_) => Ok(()),
            Expr::BinaryOperator(BinaryOperator{left, op, right}) => {
                if left.data_type() != right.data_type() {
                    return Err(format!("differing types in {:?}", self));
                }
                match op {
                    Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide | Operator::Modulo => {
                        if !left.data_type().is_numeric_type() {
                            Err(format!("{:?} requires numeric type, not {}", self, left.data_type()))
                        } else {
                            Ok(())
                        }
                    },
                    Operator::Eq | Operator::NotEq | Operator::Lt | Operator::LtEq | Operator::Gt | Operator::GtEq =>
                        if !left.data_type().is_numeric_type() && left.data_type() != DataType::string_type()
                            && left.data_type() != DataType::boolean_type() {
                            Err(format!("{:?} requires numeric/string type, not {}", self, left.data_type()))
                        } else {
                            Ok(())
                        },
                    Operator::And | Operator::Or =>
                        if left.data_type() != DataType::boolean_type() {
                            Err(format!("{:?} requires boolean type, not {}", self, left.data_type()))
                        } else {
                            Ok(())
                        },
                }
            },
            Expr::Like(Like{expr, pattern})
             | Expr::RLike(Like{expr, pattern}) => {
                if expr.data_type() != DataType::string_type() {
                    Err(format!("{:?} requires string type, not {}", self, expr.data_type()))
                } else if pattern.data_type() != DataType::string_type() {
                    Err(format!("{:?} requires string type, not {}", self, pattern.data_type()))
                } else {
                    Ok(())
                }
            },
            Expr::In(In{value, list}) => {
                if list.iter().any(|e| value.data_type() != e.data_type()) {
                    Err(format!("{:?} requires same type", self))
                } else {
                    Ok(())
                }
            },
            Expr::ScalarFunction(f) => {
                f.check_input_data_types()
            },
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::UnresolvedAttribute(_)
            | Expr::AttributeReference(_)
            | Expr::Literal(_)
            | Expr::Star(_)
            | Expr::WindowFunction(_) => Vec::new(),
            Expr::Alias(Alias{child, ..})
            | Expr::MultiAlias(MultiAlias{child, ..})
            | Expr::UnresolvedAlias(UnresolvedAlias{child})
            | Expr::SortOrder(SortOrder{child, ..})
            | Expr::GetStructField(GetStructField{child, ..})
            | Expr::GetArrayStructFields(GetArrayStructFields{child, ..})
            | Expr::Cast(Cast{child, ..}) =>
                vec![child],
            Expr::Not(child)
            | Expr::IsNull(child) | Expr::IsNotNull(child) =>
                vec![child],
            Expr::UnresolvedExtractValue(UnresolvedExtractValue{child, extraction}) =>
                vec![child.as_ref(), extraction.as_ref()],
            Expr::UnresolvedWindowExpression(UnresolvedWindowExpression{child, ..}) =>
                vec![child],
            Expr::WindowExpression(w) => {
                let mut children: Vec<&Expr> = vec![w.window_function.as_ref()];
                children.extend(w.spec.partition_spec.iter());
                children.extend(w.spec.order_spec.iter());
                children
            },
            Expr::AggregateExpression(a) => a.func.args(),
            Expr::Generator(g) => g.args(),
            Expr::CreateArray(CreateArray{children, ..})
            | Expr::CreateStruct(CreateStruct{children, ..}) =>
                children.iter().collect(),
            Expr::BinaryOperator(BinaryOperator{left, right, ..}) =>
                vec![left, right],
            Expr::Like(Like{expr, pattern})
            | Expr::RLike(Like{expr, pattern}) =>
                vec![expr, pattern],
            Expr::In(In{value, list}) =>
                vec![value.as_ref()].into_iter().chain(list.iter()).collect(),
            Expr::ScalarFunction(f) => f.args(),
            Expr::UnresolvedFunction(UnresolvedFunction{arguments, ..}) =>
                arguments.iter().collect(),
        }
    }

    /// True when no nondeterministic operation appears in the subtree.
    pub fn deterministic(&self) -> bool {
        match self {
            Expr::ScalarFunction(f) =>
                f.deterministic() && self.children().iter().all(|c| c.deterministic()),
            _ => self.children().iter().all(|c| c.deterministic()),
        }
    }

    /// The name this expression exposes when used in an output list.
    pub fn name(&self) -> Option<&str> {
        match self {
            Expr::AttributeReference(a) => Some(&a.name),
            Expr::Alias(a) => Some(&a.name),
            _ => None,
        }
    }

    /// The attribute a named expression produces in its parent's output.
    pub fn to_attribute(&self) -> Option<AttributeReference> {
        match self {
            Expr::AttributeReference(a) => Some(a.clone()),
            Expr::Alias(a) => Some(a.to_attribute()),
            _ => None,
        }
    }

    /// Equivalence modulo alias `ExprId`s and cosmetic attribute differences.
    /// Attributes still compare by `ExprId`, never by name.
    pub fn semantic_equals(&self, other: &Expr) -> bool {
        self.clone().canonicalized() == other.clone().canonicalized()
    }

    fn canonicalized(self) -> Expr {
        self.transform_up(|e| match e {
            Expr::AttributeReference(a) => {
                Ok(Transformed::yes(Expr::AttributeReference(AttributeReference {
                    name: String::new(),
                    data_type: a.data_type,
                    nullable: true,
                    qualifier: None,
                    expr_id: a.expr_id,
                })))
            },
            Expr::Alias(Alias{child, name, ..}) =>
                Ok(Transformed::yes(Expr::Alias(Alias::new_with_expr_id(*child, name, ExprId::placeholder())))),
            e => Ok(Transformed::no(e)),
        }).unwrap().data
    }

    pub fn alias(self, name: impl Into<String>) -> Expr {
        Expr::Alias(Alias::new(self, name.into()))
    }

    pub fn cast(self, data_type: DataType) -> Expr {
        Expr::Cast(Cast::new(self, data_type))
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn asc(self) -> Expr {
        Expr::SortOrder(SortOrder::new(self, SortDirection::Ascending))
    }

    pub fn desc(self) -> Expr {
        Expr::SortOrder(SortOrder::new(self, SortDirection::Descending))
    }

    pub fn lit(value: Value, data_type: DataType) -> Expr {
        Expr::Literal(Literal::new(value, data_type))
    }

    pub fn int_lit(v: i32) -> Expr {
        Expr::Literal(Literal::new(Value::Int(v), DataType::Int))
    }

    pub fn long_lit(v: i64) -> Expr {
        Expr::Literal(Literal::new(Value::Long(v), DataType::Long))
    }

    pub fn string_lit(s: impl Into<String>) -> Expr {
        Expr::Literal(Literal::new(Value::string(s), DataType::String))
    }

    pub fn boolean_lit(v: bool) -> Expr {
        Expr::Literal(Literal::new(Value::Boolean(v), DataType::Boolean))
    }

    /// An unresolved column reference; dots split the name into parts.
    pub fn unresolved_attribute(name: impl AsRef<str>) -> Expr {
        Expr::UnresolvedAttribute(UnresolvedAttribute::new(
            name.as_ref().split('.').map(|s| s.to_string()).collect()))
    }

    /// Return `self == other`
    pub fn eq(self, other: Expr) -> Expr {
        binary_expr(self, Operator::Eq, other)
    }

    /// Return `self > other`
    pub fn gt(self, other: Expr) -> Expr {
        binary_expr(self, Operator::Gt, other)
    }

    /// Return `self LIKE other`
    pub fn like(self, other: Expr) -> Expr {
        Expr::Like(Like::new(
            Box::new(self),
            Box::new(other),
        ))
    }
}

/// Cast feasibility as the analyzer understands it; the physical layer owns
/// the actual conversions.
pub fn can_cast(from: &DataType, to: &DataType) -> bool {
    match (from, to) {
        (f, t) if f == t => true,
        (DataType::Null, _) => true,
        (f, t) if f.is_numeric_type() && t.is_numeric_type() => true,
        (DataType::String, t) if t.is_atomic_type() => true,
        (f, DataType::String) if f.is_atomic_type() => true,
        (DataType::Int | DataType::Long, DataType::Timestamp) => true,
        (DataType::Timestamp, DataType::Int | DataType::Long) => true,
        (DataType::Boolean, t) if t.is_numeric_type() => true,
        _ => false,
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(l) => write!(f, "{}", l.value),
            Expr::UnresolvedAttribute(a) => write!(f, "{}", a.name()),
            Expr::AttributeReference(a) => match &a.qualifier {
                Some(q) => write!(f, "{}.{}", q, a.name),
                None => write!(f, "{}", a.name),
            },
            Expr::Alias(a) => write!(f, "{} AS {}", a.child, a.name),
            Expr::MultiAlias(m) => write!(f, "{} AS ({})", m.child, m.names.iter().join(", ")),
            Expr::UnresolvedAlias(u) => write!(f, "{}", u.child),
            Expr::UnresolvedFunction(u) => {
                if u.is_distinct {
                    write!(f, "{}(DISTINCT {})", u.name, u.arguments.iter().join(", "))
                } else {
                    write!(f, "{}({})", u.name, u.arguments.iter().join(", "))
                }
            },
            Expr::UnresolvedExtractValue(u) => write!(f, "{}[{}]", u.child, u.extraction),
            Expr::UnresolvedWindowExpression(u) => write!(f, "{} OVER {}", u.child, u.spec.0),
            Expr::Star(Star{qualifier: Some(q)}) => write!(f, "{}.*", q),
            Expr::Star(Star{qualifier: None}) => write!(f, "*"),
            Expr::SortOrder(s) => match s.direction {
                SortDirection::Ascending => write!(f, "{} ASC", s.child),
                SortDirection::Descending => write!(f, "{} DESC", s.child),
            },
            Expr::WindowExpression(w) => write!(f, "{} OVER (...)", w.window_function),
            Expr::WindowFunction(w) => write!(f, "{}()", w.name()),
            Expr::AggregateExpression(a) => {
                if a.is_distinct {
                    write!(f, "{}(DISTINCT {})", a.func.name(), a.func.args().iter().join(", "))
                } else {
                    write!(f, "{}({})", a.func.name(), a.func.args().iter().join(", "))
                }
            },
            Expr::Generator(g) => write!(f, "{}({})", g.name(), g.args().iter().join(", ")),
            Expr::GetStructField(g) => write!(f, "{}.{}", g.child, g.field.name),
            Expr::GetArrayStructFields(g) => write!(f, "{}.{}", g.child, g.field.name),
            Expr::CreateArray(c) => write!(f, "array({})", c.children.iter().join(", ")),
            Expr::CreateStruct(c) => write!(f, "struct({})", c.children.iter().join(", ")),
            Expr::Cast(c) => write!(f, "cast({} as {})", c.child, c.data_type),
            Expr::Not(e) => write!(f, "not {}", e),
            Expr::IsNull(e) => write!(f, "{} is null", e),
            Expr::IsNotNull(e) => write!(f, "{} is not null", e),
            Expr::BinaryOperator(b) => write!(f, "({} {} {})", b.left, b.op.sql_operator(), b.right),
            Expr::Like(l) => write!(f, "{} like {}", l.expr, l.pattern),
            Expr::RLike(l) => write!(f, "{} rlike {}", l.expr, l.pattern),
            Expr::In(i) => write!(f, "{} in ({})", i.value, i.list.iter().join(", ")),
            Expr::ScalarFunction(s) => write!(f, "{}({})", s.name(), s.args().iter().join(", ")),
        }
    }
}

impl<'a> TreeNodeContainer<'a, Self> for Expr {
    fn apply_elements<F: FnMut(&'a Self) -> Result<TreeNodeRecursion>>(
        &'a self,
        mut f: F,
    ) -> Result<TreeNodeRecursion> {
        f(self)
    }

    fn map_elements<F: FnMut(Self) -> Result<Transformed<Self>>>(
        self,
        mut f: F,
    ) -> Result<Transformed<Self>> {
        f(self)
    }
}

/// A process-unique identifier assigned to attributes and aliases. Equality of
/// attributes across plan nodes is by `ExprId`, never by name.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ExprId(u64);

impl ExprId {
    pub fn new() -> ExprId {
        ExprId(ExprIdGenerator::get_next_expr_id())
    }

    /// Id used for canonicalization and not-yet-resolved placeholder output.
    pub fn placeholder() -> ExprId {
        ExprId(0)
    }
}

struct ExprIdGenerator {
    counter: std::sync::atomic::AtomicU64,
}

impl ExprIdGenerator {
    fn get_next_expr_id() -> u64 {
        static INSTANCE: ExprIdGenerator = ExprIdGenerator {
            counter: std::sync::atomic::AtomicU64::new(1),
        };
        INSTANCE.counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct AttributeReference {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub qualifier: Option<String>,
    pub expr_id: ExprId,
}

impl AttributeReference {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        AttributeReference {
            name: name.into(),
            data_type,
            nullable: true,
            qualifier: None,
            expr_id: ExprId::new(),
        }
    }

    pub fn new_with_expr_id(name: impl Into<String>, data_type: DataType, expr_id: ExprId) -> Self {
        AttributeReference { name: name.into(), data_type, nullable: true, qualifier: None, expr_id }
    }

    pub fn with_nullability(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Same attribute with a fresh `ExprId`, used when a subtree is duplicated
    /// and both copies must stay distinguishable.
    pub fn new_instance(&self) -> Self {
        AttributeReference {
            name: self.name.clone(),
            data_type: self.data_type.clone(),
            nullable: self.nullable,
            qualifier: self.qualifier.clone(),
            expr_id: ExprId::new(),
        }
    }
}

/// Set of attributes with set semantics keyed by `ExprId`.
#[derive(Clone, Debug, Default)]
pub struct AttributeSet {
    ids: HashSet<ExprId>,
}

impl AttributeSet {
    pub fn new() -> AttributeSet {
        AttributeSet { ids: HashSet::new() }
    }

    pub fn from_attributes<'a, I: IntoIterator<Item = &'a AttributeReference>>(attrs: I) -> AttributeSet {
        AttributeSet { ids: attrs.into_iter().map(|a| a.expr_id).collect() }
    }

    pub fn add(&mut self, attr: &AttributeReference) {
        self.ids.insert(attr.expr_id);
    }

    pub fn contains(&self, attr: &AttributeReference) -> bool {
        self.ids.contains(&attr.expr_id)
    }

    pub fn contains_id(&self, expr_id: ExprId) -> bool {
        self.ids.contains(&expr_id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn intersects(&self, other: &AttributeSet) -> bool {
        self.ids.iter().any(|id| other.ids.contains(id))
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Alias {
    pub child: Box<Expr>,
    pub name: String,
    pub expr_id: ExprId,
}

impl Alias {
    pub fn new(expr: Expr, name: impl Into<String>) -> Self {
        Self {
            child: Box::new(expr),
            name: name.into(),
            expr_id: ExprId::new(),
        }
    }

    pub fn new_with_expr_id(expr: Expr, name: impl Into<String>, expr_id: ExprId) -> Self {
        Self {
            child: Box::new(expr),
            name: name.into(),
            expr_id,
        }
    }

    pub fn to_attribute(&self) -> AttributeReference {
        // The data type is known as soon as all names are bound, even if a
        // coercion pass still has to make the types line up.
        let known = !self.child.contains_unresolved();
        let data_type = if known {
            self.child.data_type().clone()
        } else {
            DataType::Null
        };
        AttributeReference {
            name: self.name.clone(),
            data_type,
            nullable: if known { self.child.nullable() } else { true },
            qualifier: None,
            expr_id: self.expr_id,
        }
    }
}

/// Names the columns of a multi-column expression, a generator mostly.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct MultiAlias {
    pub child: Box<Expr>,
    pub names: Vec<String>,
}

impl MultiAlias {
    pub fn new(expr: Expr, names: Vec<String>) -> Self {
        Self { child: Box::new(expr), names }
    }
}

/// An alias the parser could not name yet; `ResolveAliases` replaces it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct UnresolvedAlias {
    pub child: Box<Expr>,
}

impl UnresolvedAlias {
    pub fn new(expr: Expr) -> Self {
        Self { child: Box::new(expr) }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct UnresolvedAttribute {
    pub name_parts: Vec<String>,
}

impl UnresolvedAttribute {
    pub fn new(name_parts: Vec<String>) -> Self {
        Self { name_parts }
    }

    pub fn name(&self) -> String {
        self.name_parts.iter().join(".")
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct UnresolvedFunction {
    pub name: String,
    pub arguments: Vec<Expr>,
    pub is_distinct: bool,
}

impl UnresolvedFunction {
    pub fn new(name: impl Into<String>, arguments: Vec<Expr>, is_distinct: bool) -> Self {
        Self { name: name.into(), arguments, is_distinct }
    }
}

/// Field or element access whose meaning depends on the child's type, e.g.
/// `a.b`, `a["b"]` or `a[0]`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct UnresolvedExtractValue {
    pub child: Box<Expr>,
    pub extraction: Box<Expr>,
}

impl UnresolvedExtractValue {
    pub fn new(child: Expr, extraction: Expr) -> Self {
        Self { child: Box::new(child), extraction: Box::new(extraction) }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Star {
    pub qualifier: Option<String>,
}

impl Star {
    pub fn new(qualifier: Option<String>) -> Self {
        Self { qualifier }
    }

    pub fn expand(&self, input: &[AttributeReference], resolver: crate::analysis::Resolver) -> Result<Vec<Expr>> {
        match &self.qualifier {
            None => Ok(input.iter().map(|a| Expr::AttributeReference(a.clone())).collect()),
            Some(q) => {
                let expanded: Vec<Expr> = input.iter()
                    .filter(|a| a.qualifier.as_ref().map(|aq| resolver(aq, q)).unwrap_or(false))
                    .map(|a| Expr::AttributeReference(a.clone()))
                    .collect();
                if expanded.is_empty() {
                    Err(format!("cannot resolve '{}.*' given input columns {}",
                        q, input.iter().map(|a| a.name.as_str()).join(", ")))
                } else {
                    Ok(expanded)
                }
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct SortOrder {
    pub child: Box<Expr>,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(child: Expr, direction: SortDirection) -> Self {
        Self { child: Box::new(child), direction }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct GetStructField {
    pub child: Box<Expr>,
    pub field: Field,
    pub ordinal: usize,
}

impl GetStructField {
    pub fn new(child: Expr, field: Field, ordinal: usize) -> Self {
        Self { child: Box::new(child), field, ordinal }
    }
}

/// Extracts one struct field from every element of an array of structs,
/// producing an array of the field's type.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct GetArrayStructFields {
    pub child: Box<Expr>,
    pub field: Field,
    pub ordinal: usize,
    pub data_type: DataType,
}

impl GetArrayStructFields {
    pub fn new(child: Expr, field: Field, ordinal: usize) -> Self {
        let data_type = DataType::Array(Box::new(field.data_type.clone()));
        Self { child: Box::new(child), field, ordinal, data_type }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct CreateArray {
    pub children: Vec<Expr>,
    pub data_type: DataType,
}

impl CreateArray {
    pub fn new(children: Vec<Expr>) -> Self {
        let data_type = if !children.is_empty() && children.iter().all(|c| c.resolved()) {
            DataType::Array(Box::new(children[0].data_type().clone()))
        } else {
            DataType::Null
        };
        Self { children, data_type }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct CreateStruct {
    pub children: Vec<Expr>,
    pub data_type: DataType,
}

impl CreateStruct {
    pub fn new(children: Vec<Expr>) -> Self {
        let data_type = if children.iter().all(|c| c.resolved()) {
            let fields = children.iter().enumerate().map(|(i, c)| {
                let name = c.name().map(|n| n.to_string()).unwrap_or_else(|| format!("col{}", i + 1));
                Field::new(name, c.data_type().clone())
            }).collect();
            DataType::Struct(crate::types::Fields(fields))
        } else {
            DataType::Null
        };
        Self { children, data_type }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Cast {
    pub child: Box<Expr>,
    pub data_type: DataType,
}

impl Cast {
    pub fn new(expr: Expr, data_type: DataType) -> Self {
        Self { child: Box::new(expr), data_type }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Literal {
    pub value: Value,
    pub data_type: DataType,
}

impl Literal {
    pub fn new(value: Value, data_type: DataType) -> Self {
        Self { value, data_type }
    }
}

/// Binary operator
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct BinaryOperator {
    /// Left-hand side of the expression
    pub left: Box<Expr>,
    /// The comparison operator
    pub op: Operator,
    /// Right-hand side of the expression
    pub right: Box<Expr>,
}

impl BinaryOperator {
    /// Create a new binary expression
    pub fn new(left: Box<Expr>, op: Operator, right: Box<Expr>) -> Self {
        Self { left, op, right }
    }
}

/// LIKE expression
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct Like {
    pub expr: Box<Expr>,
    pub pattern: Box<Expr>,
}

impl Like {
    pub fn new(expr: Box<Expr>, pattern: Box<Expr>) -> Self {
        Self { expr, pattern }
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct In {
    pub value: Box<Expr>,
    pub list: Vec<Expr>,
}

impl In {
    pub fn new(value: Box<Expr>, list: Vec<Expr>) -> Self {
        Self { value, list }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_id_unique() {
        let a = AttributeReference::new("a", DataType::Int);
        let b = AttributeReference::new("a", DataType::Int);
        assert_ne!(a.expr_id, b.expr_id);
        let fresh = a.new_instance();
        assert_ne!(a.expr_id, fresh.expr_id);
        assert_eq!(a.name, fresh.name);
    }

    #[test]
    fn test_semantic_equals() {
        let a = AttributeReference::new("a", DataType::Int);
        let e1 = Expr::AttributeReference(a.clone()).cast(DataType::Long);
        let mut renamed = a.clone();
        renamed.name = "renamed".to_string();
        renamed.qualifier = Some("t".to_string());
        let e2 = Expr::AttributeReference(renamed).cast(DataType::Long);
        assert!(e1.semantic_equals(&e2));

        let e3 = Expr::AttributeReference(a.new_instance()).cast(DataType::Long);
        assert!(!e1.semantic_equals(&e3));

        let aliased1 = e1.clone().alias("x");
        let aliased2 = e2.clone().alias("x");
        assert!(aliased1.semantic_equals(&aliased2));
    }

    #[test]
    fn test_attribute_set() {
        let a = AttributeReference::new("a", DataType::Int);
        let b = AttributeReference::new("b", DataType::Int);
        let set = AttributeSet::from_attributes(vec![&a]);
        assert!(set.contains(&a));
        assert!(!set.contains(&b));
        assert!(set.intersects(&AttributeSet::from_attributes(vec![&a, &b])));
    }

    #[test]
    fn test_deterministic() {
        let e = Expr::int_lit(1).cast(DataType::Long);
        assert!(e.deterministic());
    }
}
