use crate::expr::Expr;

/// Ranking functions evaluated over a window of rows. Aggregate functions can
/// appear in a window too; these are the window-only ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum WindowFunction {
    RowNumber,
    Rank,
    DenseRank,
}

impl WindowFunction {
    pub fn name(&self) -> &'static str {
        match self {
            WindowFunction::RowNumber => "row_number",
            WindowFunction::Rank => "rank",
            WindowFunction::DenseRank => "dense_rank",
        }
    }
}

/// A reference to a window specification defined in a `WINDOW` clause,
/// replaced by `WindowsSubstitution`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct WindowSpecReference(pub String);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum FrameType {
    Rows,
    Range,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum FrameBound {
    UnboundedPreceding,
    ValuePreceding(i64),
    CurrentRow,
    ValueFollowing(i64),
    UnboundedFollowing,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub enum WindowFrame {
    Unspecified,
    Specified {
        frame_type: FrameType,
        lower: FrameBound,
        upper: FrameBound,
    },
}

/// `PARTITION BY ... ORDER BY ... frame`. Window expressions are grouped into
/// `Window` operators by equality of this definition.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct WindowSpecDefinition {
    pub partition_spec: Vec<Expr>,
    pub order_spec: Vec<Expr>,
    pub frame: WindowFrame,
}

impl WindowSpecDefinition {
    pub fn new(partition_spec: Vec<Expr>, order_spec: Vec<Expr>) -> Self {
        Self { partition_spec, order_spec, frame: WindowFrame::Unspecified }
    }

    pub fn with_frame(mut self, frame: WindowFrame) -> Self {
        self.frame = frame;
        self
    }
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct WindowExpression {
    pub window_function: Box<Expr>,
    pub spec: WindowSpecDefinition,
}

impl WindowExpression {
    pub fn new(window_function: Expr, spec: WindowSpecDefinition) -> Self {
        Self { window_function: Box::new(window_function), spec }
    }
}

/// A window expression whose specification is still a name reference.
#[derive(Clone, PartialEq, Eq, PartialOrd, Hash, Debug)]
pub struct UnresolvedWindowExpression {
    pub child: Box<Expr>,
    pub spec: WindowSpecReference,
}

impl UnresolvedWindowExpression {
    pub fn new(child: Expr, spec: WindowSpecReference) -> Self {
        Self { child: Box::new(child), spec }
    }
}
