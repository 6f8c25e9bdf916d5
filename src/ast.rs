//! Abstract syntax tree for sprig programs.
//!
//! The tree is a closed set of sum types: [`Statement`] and [`Expression`].
//! Every node records the position of the token that started it and can
//! name its own [`NodeKind`], which is what the evaluator and the
//! instrumentation layer dispatch and report on.
//!
//! Function bodies sit behind an `Rc` so a closure value can keep its body
//! alive without copying the subtree; the tree itself is still owned
//! top-down with no sharing between parents.

use std::fmt;
use std::rc::Rc;

use crate::token::{Position, TokenKind};

/// Self-descriptive tag for every node form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,

    // statements
    Let,
    Const,
    Return,
    ExpressionStatement,
    Block,
    While,
    For,
    Break,
    Continue,
    Class,

    // expressions
    Identifier,
    Integer,
    Float,
    String,
    Boolean,
    Null,
    FString,
    Array,
    Hash,
    Function,
    Prefix,
    Infix,
    Assignment,
    Call,
    Index,
    If,
    New,
    This,
    Super,
    Property,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Shared capabilities of every AST node.
pub trait Node {
    fn position(&self) -> Position;
    fn kind(&self) -> NodeKind;
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOperator {
    /// `!`
    Not,
    /// `-`
    Negate,
}

impl PrefixOperator {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::BANG => Some(PrefixOperator::Not),
            TokenKind::MINUS => Some(PrefixOperator::Negate),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            PrefixOperator::Not => "!",
            PrefixOperator::Negate => "-",
        }
    }
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Remainder,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl InfixOperator {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::PLUS => InfixOperator::Add,
            TokenKind::MINUS => InfixOperator::Subtract,
            TokenKind::ASTERISK => InfixOperator::Multiply,
            TokenKind::SLASH => InfixOperator::Divide,
            TokenKind::SLASH_SLASH => InfixOperator::FloorDivide,
            TokenKind::PERCENT => InfixOperator::Remainder,
            TokenKind::EQ => InfixOperator::Equal,
            TokenKind::NOT_EQ => InfixOperator::NotEqual,
            TokenKind::LT => InfixOperator::Less,
            TokenKind::GT => InfixOperator::Greater,
            TokenKind::LT_EQ => InfixOperator::LessEqual,
            TokenKind::GT_EQ => InfixOperator::GreaterEqual,
            TokenKind::AND => InfixOperator::And,
            TokenKind::OR => InfixOperator::Or,
            _ => return None,
        };

        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::FloorDivide => "//",
            InfixOperator::Remainder => "%",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::Less => "<",
            InfixOperator::Greater => ">",
            InfixOperator::LessEqual => "<=",
            InfixOperator::GreaterEqual => ">=",
            InfixOperator::And => "&&",
            InfixOperator::Or => "||",
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Program & statements
// ─────────────────────────────────────────────────────────────────────────────

/// Root of a parsed source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Node for Program {
    fn position(&self) -> Position {
        self.statements
            .first()
            .map(Node::position)
            .unwrap_or_else(|| Position::new(1, 1))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Program
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let(Declaration),
    Const(Declaration),
    Return(ReturnStatement),
    Expression(ExpressionStatement),
    Block(BlockStatement),
    While(WhileStatement),
    For(ForStatement),
    Break(Position),
    Continue(Position),
    Class(ClassStatement),
}

impl Node for Statement {
    fn position(&self) -> Position {
        match self {
            Statement::Let(s) | Statement::Const(s) => s.position,
            Statement::Return(s) => s.position,
            Statement::Expression(s) => s.position,
            Statement::Block(s) => s.position,
            Statement::While(s) => s.position,
            Statement::For(s) => s.position,
            Statement::Break(position) | Statement::Continue(position) => *position,
            Statement::Class(s) => s.position,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Statement::Let(_) => NodeKind::Let,
            Statement::Const(_) => NodeKind::Const,
            Statement::Return(_) => NodeKind::Return,
            Statement::Expression(_) => NodeKind::ExpressionStatement,
            Statement::Block(_) => NodeKind::Block,
            Statement::While(_) => NodeKind::While,
            Statement::For(_) => NodeKind::For,
            Statement::Break(_) => NodeKind::Break,
            Statement::Continue(_) => NodeKind::Continue,
            Statement::Class(_) => NodeKind::Class,
        }
    }
}

/// `let NAME = value;` or `const NAME = value;`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub position: Position,
    pub name: Identifier,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub position: Position,
    /// Absent ⇒ `null` is returned.
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub position: Position,
    pub expression: Expression,
}

/// Braced, ordered statement sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockStatement {
    pub position: Position,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub position: Position,
    pub condition: Expression,
    pub body: BlockStatement,
}

/// `for (init; condition; increment) body`; every clause may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub position: Position,
    pub initializer: Option<Box<Statement>>,
    pub condition: Option<Expression>,
    pub increment: Option<Expression>,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatement {
    pub position: Position,
    pub name: Identifier,
    pub parent: Option<Identifier>,
    pub constructor: Option<FunctionLiteral>,
    pub methods: Vec<MethodDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    pub name: Identifier,
    pub function: FunctionLiteral,
}

// ─────────────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Integer(IntegerLiteral),
    Float(FloatLiteral),
    String(StringLiteral),
    Boolean(BooleanLiteral),
    Null(Position),
    FString(FStringLiteral),
    Array(ArrayLiteral),
    Hash(HashLiteral),
    Function(FunctionLiteral),
    Prefix(PrefixExpression),
    Infix(InfixExpression),
    Assignment(AssignmentExpression),
    Call(CallExpression),
    Index(IndexExpression),
    If(IfExpression),
    New(NewExpression),
    This(Position),
    Super(SuperExpression),
    Property(PropertyExpression),
}

impl Node for Expression {
    fn position(&self) -> Position {
        match self {
            Expression::Identifier(e) => e.position,
            Expression::Integer(e) => e.position,
            Expression::Float(e) => e.position,
            Expression::String(e) => e.position,
            Expression::Boolean(e) => e.position,
            Expression::Null(position) | Expression::This(position) => *position,
            Expression::FString(e) => e.position,
            Expression::Array(e) => e.position,
            Expression::Hash(e) => e.position,
            Expression::Function(e) => e.position,
            Expression::Prefix(e) => e.position,
            Expression::Infix(e) => e.position,
            Expression::Assignment(e) => e.position,
            Expression::Call(e) => e.position,
            Expression::Index(e) => e.position,
            Expression::If(e) => e.position,
            Expression::New(e) => e.position,
            Expression::Super(e) => e.position,
            Expression::Property(e) => e.position,
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Expression::Identifier(_) => NodeKind::Identifier,
            Expression::Integer(_) => NodeKind::Integer,
            Expression::Float(_) => NodeKind::Float,
            Expression::String(_) => NodeKind::String,
            Expression::Boolean(_) => NodeKind::Boolean,
            Expression::Null(_) => NodeKind::Null,
            Expression::FString(_) => NodeKind::FString,
            Expression::Array(_) => NodeKind::Array,
            Expression::Hash(_) => NodeKind::Hash,
            Expression::Function(_) => NodeKind::Function,
            Expression::Prefix(_) => NodeKind::Prefix,
            Expression::Infix(_) => NodeKind::Infix,
            Expression::Assignment(_) => NodeKind::Assignment,
            Expression::Call(_) => NodeKind::Call,
            Expression::Index(_) => NodeKind::Index,
            Expression::If(_) => NodeKind::If,
            Expression::New(_) => NodeKind::New,
            Expression::This(_) => NodeKind::This,
            Expression::Super(_) => NodeKind::Super,
            Expression::Property(_) => NodeKind::Property,
        }
    }
}

impl Expression {
    /// Only identifiers, index and property expressions can be assigned to.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(_) | Expression::Index(_) | Expression::Property(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub position: Position,
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            position,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerLiteral {
    pub position: Position,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatLiteral {
    pub position: Position,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    pub position: Position,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanLiteral {
    pub position: Position,
    pub value: bool,
}

/// One piece of an f-string: literal text or an interpolated expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPart {
    Text(String),
    Interpolation(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FStringLiteral {
    pub position: Position,
    pub parts: Vec<FStringPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub position: Position,
    pub elements: Vec<Expression>,
}

/// Ordered key → expression pairs; keys are already strings here.
#[derive(Debug, Clone, PartialEq)]
pub struct HashLiteral {
    pub position: Position,
    pub pairs: Vec<(String, Expression)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub position: Position,
    /// Binding name when the literal is the value of `let`/`const` or a
    /// named `fn` statement; used for call-stack frames.
    pub name: Option<String>,
    pub parameters: Vec<Identifier>,
    pub body: Rc<BlockStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefixExpression {
    pub position: Position,
    pub operator: PrefixOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfixExpression {
    pub position: Position,
    pub left: Box<Expression>,
    pub operator: InfixOperator,
    pub right: Box<Expression>,
}

/// `target = value` where the target is an identifier, index or property.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub position: Position,
    pub target: Box<Expression>,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub position: Position,
    pub function: Box<Expression>,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub position: Position,
    pub left: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expression,
    pub consequence: BlockStatement,
}

/// `if (c) {..} elif (c) {..} else {..}`: branches are tried in order.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub position: Position,
    pub branches: Vec<ConditionalBranch>,
    pub alternative: Option<BlockStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    pub position: Position,
    pub class: Box<Expression>,
    pub arguments: Vec<Expression>,
}

/// `super(args)` when `method` is `None`, otherwise `super.method(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperExpression {
    pub position: Position,
    pub method: Option<Identifier>,
    pub arguments: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyExpression {
    pub position: Position,
    pub object: Box<Expression>,
    pub property: Identifier,
}
