//! Syntax tree for the snippet language.

use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        kind: VarKind,
        declarations: Vec<(Pattern, Option<Expr>)>,
    },
    FunctionDecl {
        name: String,
        func: Rc<FunctionDef>,
    },
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    ForOf {
        kind: VarKind,
        target: Pattern,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Throw(Expr),
    Block(Vec<Stmt>),
    Expr(Expr),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Object(Vec<PatternProp>),
    Array(Vec<Option<(Pattern, Option<Expr>)>>),
}

/// `{ key: target = default }`; shorthand `{ key }` has `target == Ident(key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternProp {
    pub key: String,
    pub target: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem {
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProp {
    KeyValue(String, Expr),
    Computed(Expr, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Template(Vec<TemplateSegment>),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Array(Vec<ArrayItem>),
    Object(Vec<ObjectProp>),
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<ArrayItem>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<ArrayItem>,
    },
    Function(Rc<FunctionDef>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
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
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `name = value`; only plain identifiers are assignable.
    Assign {
        name: String,
        value: Box<Expr>,
    },
    Jsx(Box<JsxElement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxName {
    Fragment,
    Tag(String),
}

impl JsxName {
    /// Lowercase names are host elements; capitalized names resolve from scope.
    pub fn is_component(&self) -> bool {
        matches!(self, JsxName::Tag(t) if t.starts_with(|c: char| c.is_ascii_uppercase()) || t.contains('.'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttr {
    /// `value == None` is the bare-attribute form, meaning `true`.
    Named { name: String, value: Option<Expr> },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsxChild {
    Text(String),
    Expr(Expr),
    Element(JsxElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsxElement {
    pub name: JsxName,
    pub attrs: Vec<JsxAttr>,
    pub children: Vec<JsxChild>,
}
