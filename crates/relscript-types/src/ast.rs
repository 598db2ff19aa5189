//! AST node types for the RelScript language.
//!
//! Every node carries a [`Span`] for error reporting. Large recursive types
//! are boxed to keep enum sizes reasonable. The parser produces these trees;
//! the engine consumes them and never inspects source text.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A single spanned statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every statement form the engine executes.
///
/// The dispatch over this enum is a single exhaustive `match`; adding a
/// variant forces every handler site to be updated.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `Subject Relation [Args...]` — IS, HAS, CAN, CONTAINS, IN, PRINT,
    /// or a custom relation invocation.
    Relation(RelationStmt),
    /// `RELATION Name (Role1, Role2, ...) [DO ... END]` — declares a
    /// relation node, its ordered roles, and an optional stored body.
    DefineRelation(DefineRelationStmt),
    /// `?`/`?var` pattern query over IS/HAS/CAN/IN/CONTAINS.
    Query(QueryStmt),
    /// `Subject Rel ?`, `? Rel Object`, `? Rel ?` — relation-instance query.
    InstanceQuery(InstanceQueryStmt),
    /// `WHEN Subject IS/HAS/CAN ... DO ... END` — condition-statement form.
    WhenCondition(WhenConditionStmt),
    /// `WHEN Subject expr DO ... [ELSE WHEN ... | ELSE ...] END`.
    When(WhenStmt),
    /// `CHANCE percent DO ... [ELSE DO ...] END`.
    Chance(ChanceStmt),
    /// `ALL TypeName|queryVar [Action]`.
    All(AllStmt),
    /// `Collection EACH Var DO ... END`.
    Each(EachStmt),
    /// `Subject LOSES [IS|CONTAINS] X`.
    Loses(LosesStmt),
    /// `GIVES expr` — sets the return value of the enclosing relation body.
    Gives(GivesStmt),
}

/// `Subject Relation [Args...]`
///
/// `args` are expressions: for HAS the first is the property-name
/// identifier and the second the value; for IS/CAN/CONTAINS/IN and custom
/// relations they are the (identifier) operands.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationStmt {
    pub subject: Ident,
    pub relation: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// `RELATION Name (Roles...) [DO body END]`
#[derive(Debug, Clone, PartialEq)]
pub struct DefineRelationStmt {
    pub name: Ident,
    /// Ordered role names; the first role is the caller/subject slot.
    pub roles: Vec<Ident>,
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

/// `?var|? Relation [Target [Value]] [WHERE expr]`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStmt {
    /// `Some(name)` for `?name`, `None` for the bare wildcard `?`.
    pub variable: Option<Ident>,
    pub relation: Ident,
    pub target: Option<Ident>,
    pub value: Option<Expr>,
    pub where_clause: Option<Expr>,
    pub span: Span,
}

/// Relation-instance query: exactly one of `subject`/`object` is present
/// for the directed forms; both absent for `? Rel ?`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceQueryStmt {
    pub subject: Option<Ident>,
    pub relation: Ident,
    pub object: Option<Ident>,
    pub span: Span,
}

/// The restricted condition of the WHEN condition-statement form.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `Subject IS Type`
    Is(Ident),
    /// `Subject HAS Prop [Value]`
    Has(Ident, Option<Expr>),
    /// `Subject CAN Ability`
    Can(Ident),
}

/// `WHEN Subject <condition> DO ... END`
#[derive(Debug, Clone, PartialEq)]
pub struct WhenConditionStmt {
    pub subject: Ident,
    pub condition: Condition,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// `WHEN Subject expr DO ... END` with an optional ELSE chain.
#[derive(Debug, Clone, PartialEq)]
pub struct WhenStmt {
    pub subject: Ident,
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub else_arm: Option<ElseArm>,
    pub span: Span,
}

/// The else branch of a WHEN — either another WHEN or a plain body.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseArm {
    ElseWhen(Box<WhenStmt>),
    Else(Vec<Stmt>),
}

/// `CHANCE percent DO ... [ELSE DO ...] END`
#[derive(Debug, Clone, PartialEq)]
pub struct ChanceStmt {
    pub percent: Expr,
    pub body: Vec<Stmt>,
    pub else_body: Option<Vec<Stmt>>,
    pub span: Span,
}

/// `ALL Target [Relation Args...]`
///
/// `target` names either a type or a stored query-result node. Without an
/// action the statement reports the count; with one it re-dispatches the
/// action once per matching node.
#[derive(Debug, Clone, PartialEq)]
pub struct AllStmt {
    pub target: Ident,
    pub action: Option<AllAction>,
    pub span: Span,
}

/// The action part of an ALL statement (a relation form minus its subject).
#[derive(Debug, Clone, PartialEq)]
pub struct AllAction {
    pub relation: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// `Collection EACH Var DO ... END`
#[derive(Debug, Clone, PartialEq)]
pub struct EachStmt {
    pub collection: Ident,
    pub variable: Ident,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// What a LOSES statement detaches.
#[derive(Debug, Clone, PartialEq)]
pub enum LosesKind {
    /// `LOSES IS X` — remove a parent edge.
    Parent(Ident),
    /// `LOSES CONTAINS X` — remove a child edge.
    Child(Ident),
    /// Bare `LOSES X` — remove an ability named X if present, else the
    /// property named X.
    Auto(Ident),
}

/// `Subject LOSES ...`
#[derive(Debug, Clone, PartialEq)]
pub struct LosesStmt {
    pub subject: Ident,
    pub kind: LosesKind,
    pub span: Span,
}

/// `GIVES expr`
#[derive(Debug, Clone, PartialEq)]
pub struct GivesStmt {
    pub value: Expr,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// A single spanned expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Every expression form the evaluator handles.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),
    /// `Object.Property`
    PropertyAccess {
        object: Box<Expr>,
        property: String,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Parenthesized sub-expression.
    Grouping(Box<Expr>),
    /// `RANDOM min max`. `real` is true iff either literal carried a
    /// decimal point in the source — a lexical fact, so the parser records
    /// it here.
    Random {
        min: Box<Expr>,
        max: Box<Expr>,
        real: bool,
    },
    /// `(Subject Relation Args...)` — invokes the relation and evaluates
    /// to its GIVES value, or null.
    RelationCall {
        subject: Ident,
        relation: Ident,
        args: Vec<Expr>,
    },
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::point(1, 1)
    }

    #[test]
    fn test_ident_new() {
        let id = Ident::new("Player", sp());
        assert_eq!(id.name, "Player");
    }

    #[test]
    fn test_stmt_construction() {
        let stmt = Stmt::new(
            StmtKind::Relation(RelationStmt {
                subject: Ident::new("Player", sp()),
                relation: Ident::new("IS", sp()),
                args: vec![Expr::new(ExprKind::Identifier("Entity".into()), sp())],
                span: sp(),
            }),
            sp(),
        );
        assert!(matches!(stmt.kind, StmtKind::Relation(_)));
    }

    #[test]
    fn test_expr_clone_equality() {
        let e = Expr::new(
            ExprKind::Binary {
                left: Box::new(Expr::new(ExprKind::Number(1.0), sp())),
                op: BinOp::Add,
                right: Box::new(Expr::new(ExprKind::Number(2.0), sp())),
            },
            sp(),
        );
        assert_eq!(e, e.clone());
    }
}
