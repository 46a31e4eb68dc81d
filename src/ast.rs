//! Abstract Syntax Tree definitions for Boa
//!
//! The node grammar the checker walks. Trees are produced by an external
//! parser and handed over as JSON; every node carries a `NodeId` that the
//! checker keys its annotations by.

use serde::{Deserialize, Serialize};

/// Identity of a node within one tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A complete Boa program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: NodeId,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    pub id: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: NodeId,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: NodeId,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// `{ ... }`
    Block(Block),

    /// `target = value;`
    Assignment {
        target: Expression,
        value: Expression,
    },

    Break,

    Continue,

    /// `do body while (condition);`
    Do {
        condition: Expression,
        body: Box<Statement>,
    },

    /// `target[i][j] << value weight w;`
    Emit {
        target: Identifier,
        indices: Vec<Expression>,
        value: Expression,
        weight: Option<Expression>,
    },

    /// `exists (i: int; condition) body`
    Exists {
        variable: Component,
        condition: Expression,
        body: Box<Statement>,
    },

    /// `foreach (i: int; condition) body`
    Foreach {
        variable: Component,
        condition: Expression,
        body: Box<Statement>,
    },

    /// `ifall (i: int; condition) body`
    IfAll {
        variable: Component,
        condition: Expression,
        body: Box<Statement>,
    },

    /// An expression evaluated for its effect
    Expression(Expression),

    /// `for (init; condition; update) body`
    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        update: Option<Box<Statement>>,
        body: Box<Statement>,
    },

    /// `if (condition) body else else_branch`
    If {
        condition: Expression,
        body: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },

    /// `x++;` or `x--;`
    Postfix {
        operand: Expression,
        operator: PostfixOp,
    },

    /// `return;` or `return value;`
    Return(Option<Expression>),

    /// `stop;`
    Stop,

    /// `switch (scrutinee) { case a, b: ... default: ... }`
    Switch {
        scrutinee: Expression,
        cases: Vec<SwitchCase>,
        default: Option<SwitchCase>,
    },

    /// `name: type = initializer;` where either side may be absent
    VarDecl {
        name: Identifier,
        type_annotation: Option<TypeExpr>,
        initializer: Option<Expression>,
    },

    /// `before r: Revision -> body` or `after Method, Statement -> body`
    Visit {
        phase: VisitPhase,
        target: VisitTarget,
        body: Block,
    },

    /// `while (condition) body`
    While {
        condition: Expression,
        body: Box<Statement>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub id: NodeId,
    /// Empty for the default case
    pub values: Vec<Expression>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitPhase {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisitTarget {
    /// A single named component: `before n: Namespace ->`
    Component(Component),
    /// A list of bare type names: `before Method, Variable ->`
    Types(Vec<Identifier>),
    /// `before _ ->`
    Wildcard,
}

/// A possibly named type: `name: type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: NodeId,
    pub name: Option<Identifier>,
    pub type_expr: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub id: NodeId,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    /// `lhs || rhs || ...`
    Disjunction {
        lhs: Box<Expression>,
        rhs: Vec<Expression>,
    },

    /// `lhs && rhs && ...`
    Conjunction {
        lhs: Box<Expression>,
        rhs: Vec<Expression>,
    },

    /// `lhs` or `lhs OP rhs`
    Comparison {
        lhs: Box<Expression>,
        rhs: Option<(ComparisonOp, Box<Expression>)>,
    },

    /// `lhs OP a OP b ...`, left associative
    Arithmetic {
        lhs: Box<Expression>,
        rest: Vec<(ArithmeticOp, Expression)>,
    },

    /// `-x`, `!x`, `~x`
    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
    },

    /// A primary operand followed by selectors, indices and calls
    Factor {
        operand: Box<Expression>,
        postfix: Vec<Postfix>,
    },

    /// `(inner)`
    Paren(Box<Expression>),

    Identifier(String),

    Integer(i64),

    Float(f64),

    String(String),

    Bytes(Vec<u8>),

    /// Character literals are integers
    Char(char),

    /// Microseconds since the epoch: `T"2011-01-01"`
    Time(i64),

    /// `{}`, `{k: v, ...}` or `{a, b, ...}`
    Composite(Composite),

    /// `function(a: int): bool { ... }`
    Function {
        signature: FunctionTypeExpr,
        body: Block,
    },

    /// `visitor { before ... after ... }`
    Visitor { body: Block },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    BitOr,
    BitXor,
    Mul,
    Div,
    Mod,
    BitAnd,
    Shl,
    Shr,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::BitOr => "|",
            ArithmeticOp::BitXor => "^",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
            ArithmeticOp::BitAnd => "&",
            ArithmeticOp::Shl => "<<",
            ArithmeticOp::Shr => ">>",
        }
    }

    /// Bitwise and shift operators only apply to integers
    pub fn is_bitwise(&self) -> bool {
        matches!(
            self,
            ArithmeticOp::BitOr
                | ArithmeticOp::BitXor
                | ArithmeticOp::BitAnd
                | ArithmeticOp::Shl
                | ArithmeticOp::Shr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postfix {
    pub id: NodeId,
    pub kind: PostfixKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PostfixKind {
    /// `.name`
    Selector(Identifier),
    /// `[start]` or `[start:end]`
    Index {
        start: Expression,
        end: Option<Expression>,
    },
    /// `(args...)`
    Call(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Composite {
    Empty,
    Pairs(Vec<Pair>),
    Elements(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    pub id: NodeId,
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub id: NodeId,
    pub kind: TypeExprKind,
}

/// Type expressions as written in declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExprKind {
    /// A base, schema or user name: `int`, `Revision`
    Named(String),
    /// `array of T`
    Array(Box<TypeExpr>),
    /// `map[K] of V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `stack of T`
    Stack(Box<TypeExpr>),
    /// `{a: int, string}`
    Tuple(Vec<Component>),
    /// `function(a: int): bool`
    Function(FunctionTypeExpr),
    /// `output sum[string] of int weight float`
    Output(OutputTypeExpr),
    Visitor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTypeExpr {
    pub params: Vec<Component>,
    pub return_type: Option<Box<TypeExpr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputTypeExpr {
    pub aggregator: Identifier,
    /// Extra aggregator arguments: `top(10)`
    pub arguments: Vec<Expression>,
    pub indices: Vec<Component>,
    pub value: Box<Component>,
    pub weight: Option<Box<Component>>,
}
