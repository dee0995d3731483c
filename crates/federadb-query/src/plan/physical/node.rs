//! Physical plan node types.

use std::fmt;

use crate::plan::capabilities::NullOrder;
use crate::plan::logical::{LogicalExpr, SortOrder, WindowFunctionCall, WindowSpecification};

use super::source_query::SourceQuery;

/// An executable plan.
///
/// Window queries plan to one of two shapes: a single `Access` when the
/// source evaluates everything, or `Project ← [Sort] ← Window ← Access`
/// when window functions are evaluated locally.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalPlan {
    /// Query sent to the data source.
    Access(Box<AccessNode>),

    /// Local window function evaluation.
    Window {
        /// Window configuration.
        node: Box<WindowExecNode>,
        /// Input plan.
        input: Box<PhysicalPlan>,
    },

    /// Local stable sort.
    Sort {
        /// Sort configuration.
        node: SortExecNode,
        /// Input plan.
        input: Box<PhysicalPlan>,
    },

    /// Projection to the query's output columns.
    Project {
        /// Projection configuration.
        node: ProjectExecNode,
        /// Input plan.
        input: Box<PhysicalPlan>,
    },
}

impl PhysicalPlan {
    /// Returns the child plans.
    #[must_use]
    pub fn children(&self) -> Vec<&PhysicalPlan> {
        match self {
            Self::Access(_) => vec![],
            Self::Window { input, .. } | Self::Sort { input, .. } | Self::Project { input, .. } => {
                vec![input.as_ref()]
            }
        }
    }

    /// Returns the node name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Access(_) => "Access",
            Self::Window { .. } => "Window",
            Self::Sort { .. } => "Sort",
            Self::Project { .. } => "Project",
        }
    }

    /// Returns the output column names of this node.
    #[must_use]
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            Self::Access(node) => node.columns.clone(),
            Self::Window { node, input } => {
                let mut columns = input.output_columns();
                columns.extend(node.functions.iter().map(|f| f.alias.clone()));
                columns
            }
            Self::Sort { input, .. } => input.output_columns(),
            Self::Project { node, .. } => node.names.clone(),
        }
    }

    /// Returns the source SQL of the access node in this plan.
    #[must_use]
    pub fn source_sql(&self) -> Option<&str> {
        match self {
            Self::Access(node) => Some(&node.sql),
            Self::Window { input, .. } | Self::Sort { input, .. } | Self::Project { input, .. } => {
                input.source_sql()
            }
        }
    }

    /// Returns true if window functions are evaluated locally.
    #[must_use]
    pub fn has_local_window(&self) -> bool {
        match self {
            Self::Access(_) => false,
            Self::Window { .. } => true,
            Self::Sort { input, .. } | Self::Project { input, .. } => input.has_local_window(),
        }
    }

    /// Pretty prints the plan as a tree.
    #[must_use]
    pub fn display_tree(&self) -> DisplayTree<'_> {
        DisplayTree { plan: self }
    }
}

/// Helper for tree-style plan display.
pub struct DisplayTree<'a> {
    plan: &'a PhysicalPlan,
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(f, self.plan, "", true)
    }
}

fn fmt_node(f: &mut fmt::Formatter<'_>, plan: &PhysicalPlan, prefix: &str, is_last: bool) -> fmt::Result {
    let connector = if is_last { "└── " } else { "├── " };
    write!(f, "{prefix}{connector}")?;
    fmt_node_content(f, plan)?;
    writeln!(f)?;

    let children = plan.children();
    let new_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    for (i, child) in children.iter().enumerate() {
        fmt_node(f, child, &new_prefix, i == children.len() - 1)?;
    }
    Ok(())
}

fn fmt_node_content(f: &mut fmt::Formatter<'_>, plan: &PhysicalPlan) -> fmt::Result {
    match plan {
        PhysicalPlan::Access(node) => write!(f, "Access: {}", node.sql),
        PhysicalPlan::Window { node, .. } => {
            write!(f, "Window: ")?;
            for (i, func) in node.functions.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} AS {}", func.call, func.alias)?;
            }
            if node.presorted {
                write!(f, " [presorted]")?;
            }
            Ok(())
        }
        PhysicalPlan::Sort { node, .. } => {
            write!(f, "Sort: ")?;
            for (i, key) in node.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}")?;
            }
            Ok(())
        }
        PhysicalPlan::Project { node, .. } => {
            write!(f, "Project: ")?;
            for (i, (expr, name)) in node.exprs.iter().zip(&node.names).enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if expr.column_name() == Some(name.as_str()) {
                    write!(f, "{expr}")?;
                } else {
                    write!(f, "{expr} AS {name}")?;
                }
            }
            Ok(())
        }
    }
}

/// A query executed by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessNode {
    /// The structured query.
    pub query: SourceQuery,
    /// The rendered SQL sent to the source.
    pub sql: String,
    /// Names of the columns the source returns.
    pub columns: Vec<String>,
}

/// A window function with the name of the column it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFunctionExpr {
    /// The call.
    pub call: WindowFunctionCall,
    /// Output column name.
    pub alias: String,
}

/// Calls sharing one window specification, evaluated in a single pass.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGroup {
    /// The shared specification.
    pub spec: WindowSpecification,
    /// Indexes into [`WindowExecNode::functions`].
    pub functions: Vec<usize>,
}

/// Window evaluation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowExecNode {
    /// Window functions in output order.
    pub functions: Vec<WindowFunctionExpr>,
    /// Functions grouped by equal specification.
    pub groups: Vec<WindowGroup>,
    /// Whether the input arrives sorted by the single group's partition keys.
    pub presorted: bool,
    /// NULL placement for order keys without an explicit one.
    pub null_order: NullOrder,
}

impl WindowExecNode {
    /// Creates a node, grouping the functions by specification.
    #[must_use]
    pub fn new(functions: Vec<WindowFunctionExpr>) -> Self {
        let mut groups: Vec<WindowGroup> = Vec::new();
        for (i, func) in functions.iter().enumerate() {
            match groups.iter_mut().find(|g| g.spec == func.call.spec) {
                Some(group) => group.functions.push(i),
                None => groups.push(WindowGroup { spec: func.call.spec.clone(), functions: vec![i] }),
            }
        }
        Self { functions, groups, presorted: false, null_order: NullOrder::default() }
    }

    /// Marks the input as presorted.
    #[must_use]
    pub const fn with_presorted(mut self, presorted: bool) -> Self {
        self.presorted = presorted;
        self
    }

    /// Sets the default NULL placement.
    #[must_use]
    pub const fn with_null_order(mut self, null_order: NullOrder) -> Self {
        self.null_order = null_order;
        self
    }
}

/// Sort configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SortExecNode {
    /// Sort keys.
    pub order_by: Vec<SortOrder>,
    /// NULL placement for keys without an explicit one.
    pub null_order: NullOrder,
}

impl SortExecNode {
    /// Creates a sort node.
    #[must_use]
    pub fn new(order_by: Vec<SortOrder>, null_order: NullOrder) -> Self {
        Self { order_by, null_order }
    }
}

/// Projection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectExecNode {
    /// Expressions evaluated per row.
    pub exprs: Vec<LogicalExpr>,
    /// Output names, one per expression.
    pub names: Vec<String>,
}

impl ProjectExecNode {
    /// Creates a projection node.
    #[must_use]
    pub fn new(exprs: Vec<LogicalExpr>, names: Vec<String>) -> Self {
        Self { exprs, names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::catalog::WindowFunctionKind;
    use crate::plan::logical::GroupSymbol;

    fn call(kind: WindowFunctionKind, spec: WindowSpecification) -> WindowFunctionCall {
        WindowFunctionCall::new(kind, vec![], spec)
    }

    fn access() -> PhysicalPlan {
        PhysicalPlan::Access(Box::new(AccessNode {
            query: SourceQuery {
                select: vec![LogicalExpr::column("e1")],
                from: GroupSymbol::new("pm1.g1"),
                selection: None,
                order_by: vec![],
            },
            sql: "SELECT g_0.e1 FROM pm1.g1 AS g_0".to_owned(),
            columns: vec!["e1".to_owned()],
        }))
    }

    #[test]
    fn groups_equal_specifications() {
        let by_e1 = WindowSpecification::new().order_by(vec![SortOrder::asc(LogicalExpr::column("e1"))]);
        let node = WindowExecNode::new(vec![
            WindowFunctionExpr { call: call(WindowFunctionKind::RowNumber, by_e1.clone()), alias: "w_0".into() },
            WindowFunctionExpr { call: call(WindowFunctionKind::CountStar, WindowSpecification::new()), alias: "w_1".into() },
            WindowFunctionExpr { call: call(WindowFunctionKind::Rank, by_e1), alias: "w_2".into() },
        ]);
        assert_eq!(node.groups.len(), 2);
        assert_eq!(node.groups[0].functions, vec![0, 2]);
        assert_eq!(node.groups[1].functions, vec![1]);
    }

    #[test]
    fn output_columns_and_tree() {
        let window = WindowExecNode::new(vec![WindowFunctionExpr {
            call: call(WindowFunctionKind::RowNumber, WindowSpecification::new()),
            alias: "w_0".into(),
        }]);
        let plan = PhysicalPlan::Project {
            node: ProjectExecNode::new(
                vec![LogicalExpr::column("e1"), LogicalExpr::column("w_0")],
                vec!["e1".into(), "rn".into()],
            ),
            input: Box::new(PhysicalPlan::Window { node: Box::new(window), input: Box::new(access()) }),
        };

        assert_eq!(plan.output_columns(), vec!["e1", "rn"]);
        let PhysicalPlan::Project { input, .. } = &plan else { unreachable!() };
        assert_eq!(input.output_columns(), vec!["e1", "w_0"]);
        assert_eq!(plan.source_sql(), Some("SELECT g_0.e1 FROM pm1.g1 AS g_0"));
        assert!(plan.has_local_window());

        let tree = plan.display_tree().to_string();
        assert_eq!(
            tree,
            "└── Project: e1, w_0 AS rn\n\
             \x20   └── Window: ROW_NUMBER() OVER () AS w_0\n\
             \x20       └── Access: SELECT g_0.e1 FROM pm1.g1 AS g_0\n"
        );
    }
}
