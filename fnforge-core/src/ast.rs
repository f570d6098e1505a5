//! Abstract syntax tree for candidate programs
//!
//! Candidates are written in a small JavaScript subset. The tree is plain
//! data (`Send + Sync`): function nodes are shared through `Arc` so the
//! interpreter can capture them in closures without copying.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Byte range of a node in the source text
pub type Span = Range<usize>;

/// Name of the implicit parameter when a candidate is a bare function body
pub const IMPLICIT_PARAM: &str = "x";

/// Name the prompt asks the oracle to give the synthesized function
pub const ENTRY_NAME: &str = "f";

/// A parsed candidate: its top-level statements with their source spans
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

/// A top-level statement and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub stmt: Stmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    VarDecl {
        kind: DeclKind,
        declarations: Vec<Declarator>,
    },
    FunctionDecl(Arc<Function>),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        kind: DeclKind,
        pattern: Pattern,
        iterable: Expr,
        body: Box<Stmt>,
    },
    ForIn {
        kind: DeclKind,
        pattern: Pattern,
        object: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    /// `break`, optionally naming the labeled statement to leave
    Break(Option<String>),
    Continue(Option<String>),
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
}

/// One `case` (or `default`, when `test` is `None`) of a switch
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

/// Binding target of declarations, parameters and loop heads
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Array {
        elements: Vec<Option<PatternElement>>,
        rest: Option<Box<Pattern>>,
    },
    Object {
        properties: Vec<PropertyPattern>,
        rest: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPattern {
    pub key: String,
    pub value: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Array(Vec<ArrayElement>),
    Object(Vec<Property>),
    Function(Arc<Function>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    Sequence(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue(String, Expr),
    Computed(Expr, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    InstanceOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    And,
    Or,
    Nullish,
}

impl AssignOp {
    /// The binary operator a compound assignment applies, if any
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Rem => Some(BinaryOp::Rem),
            AssignOp::Pow => Some(BinaryOp::Pow),
            _ => None,
        }
    }
}

impl Expr {
    /// Short node-type name used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Literal(_) => "literal",
            Expr::Ident(_) => "identifier",
            Expr::Template { .. } => "template literal",
            Expr::Array(_) => "array literal",
            Expr::Object(_) => "object literal",
            Expr::Function(f) if f.is_arrow => "arrow function",
            Expr::Function(_) => "function expression",
            Expr::Unary { .. } => "unary expression",
            Expr::Update { .. } => "update expression",
            Expr::Binary { .. } => "binary expression",
            Expr::Logical { .. } => "logical expression",
            Expr::Assign { .. } => "assignment",
            Expr::Conditional { .. } => "conditional expression",
            Expr::Member { .. } => "member expression",
            Expr::Call { .. } => "call",
            Expr::New { .. } => "new expression",
            Expr::Sequence(_) => "sequence expression",
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }
}

impl Pattern {
    /// Every name this pattern binds, in source order
    pub fn bound_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Pattern::Ident(name) => names.push(name.clone()),
            Pattern::Array { elements, rest } => {
                for element in elements.iter().flatten() {
                    element.pattern.collect_names(names);
                }
                if let Some(rest) = rest {
                    rest.collect_names(names);
                }
            }
            Pattern::Object { properties, rest } => {
                for property in properties {
                    property.value.collect_names(names);
                }
                if let Some(rest) = rest {
                    names.push(rest.clone());
                }
            }
        }
    }
}

impl Function {
    /// Names of all declared parameters
    pub fn param_names(&self) -> Vec<String> {
        self.params
            .iter()
            .flat_map(|param| param.pattern.bound_names())
            .collect()
    }
}

/// How a program exposes the unary function it defines
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// A top-level function whose definition is syntactically visible
    Function {
        name: String,
        function: Arc<Function>,
    },
    /// A top-level binding named `f` initialised by some other expression
    Binding { name: String },
    /// No function: the program itself is the body, with parameter `x`
    Body,
}

impl Entry {
    pub fn param_names(&self) -> Vec<String> {
        match self {
            Entry::Function { function, .. } => function.param_names(),
            Entry::Binding { .. } => Vec::new(),
            Entry::Body => vec![IMPLICIT_PARAM.to_string()],
        }
    }
}

impl Program {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.items.iter().map(|item| &item.stmt)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Resolve the entry function.
    ///
    /// A top-level function named `f` wins; otherwise the only top-level
    /// function declaration; otherwise the program is a bare body.
    pub fn entry(&self) -> Entry {
        let mut declared = Vec::new();

        for stmt in self.statements() {
            match stmt {
                Stmt::FunctionDecl(function) => {
                    if function.name.as_deref() == Some(ENTRY_NAME) {
                        return Entry::Function {
                            name: ENTRY_NAME.to_string(),
                            function: function.clone(),
                        };
                    }
                    declared.push(function.clone());
                }
                Stmt::VarDecl { declarations, .. } => {
                    for declarator in declarations {
                        if declarator.pattern != Pattern::Ident(ENTRY_NAME.to_string()) {
                            continue;
                        }
                        return match &declarator.init {
                            Some(Expr::Function(function)) => Entry::Function {
                                name: ENTRY_NAME.to_string(),
                                function: function.clone(),
                            },
                            _ => Entry::Binding {
                                name: ENTRY_NAME.to_string(),
                            },
                        };
                    }
                }
                _ => {}
            }
        }

        if declared.len() == 1 {
            let function = declared.remove(0);
            if let Some(name) = function.name.clone() {
                return Entry::Function { name, function };
            }
        }

        Entry::Body
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Var => write!(f, "var"),
            DeclKind::Let => write!(f, "let"),
            DeclKind::Const => write!(f, "const"),
        }
    }
}
