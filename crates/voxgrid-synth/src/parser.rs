//! Recursive-descent parser producing [`crate::ast`] from retained snippet text.

use crate::ast::*;
use crate::error::EvalError;
use crate::lexer::{Lexer, TemplatePart, Token, TokenKind};
use std::rc::Rc;

type ParseResult<T> = Result<T, EvalError>;

/// Nesting allowance, in units that roughly track the stack each construct
/// costs. The expression ladder is the heaviest, so it is weighted up.
const MAX_NESTING: usize = 128;
const EXPRESSION_WEIGHT: usize = 4;

const RESERVED: &[&str] = &[
    "const", "let", "var", "function", "return", "if", "else", "for", "throw", "new", "typeof",
    "import", "export", "class", "default", "true", "false", "null",
];

pub fn parse_program(source: &str) -> ParseResult<Vec<Stmt>> {
    let mut parser = Parser::new(source);
    let mut stmts = Vec::new();
    while !parser.current.is_eof() {
        stmts.push(parser.parse_statement()?);
    }
    Ok(stmts)
}

pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    parse_expression_within(source, 0)
}

/// Parse a standalone expression as if already `nesting` units deep.
fn parse_expression_within(source: &str, nesting: usize) -> ParseResult<Expr> {
    let mut parser = Parser::new(source);
    parser.nesting = nesting;
    let expr = parser.parse_assignment()?;
    if !parser.current.is_eof() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

#[derive(Clone)]
struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            nesting: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Token plumbing
    // -------------------------------------------------------------------------

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn peek(&self) -> Token {
        self.lexer.clone().next_token()
    }

    fn eat(&mut self, p: &str) -> bool {
        if self.current.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, p: &str) -> ParseResult<()> {
        if self.eat(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`, found {}", p, describe(&self.current))))
        }
    }

    fn error(&self, message: impl Into<String>) -> EvalError {
        EvalError::Syntax {
            line: self.current.span.start.line,
            col: self.current.span.start.col,
            message: message.into(),
        }
    }

    fn unexpected(&self) -> EvalError {
        self.error(format!("unexpected {}", describe(&self.current)))
    }

    fn enter(&mut self, weight: usize) -> ParseResult<()> {
        self.nesting += weight;
        if self.nesting > MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn leave(&mut self, weight: usize) {
        self.nesting -= weight;
    }

    fn binding_ident(&mut self) -> ParseResult<String> {
        match &self.current.kind {
            TokenKind::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!("expected identifier, found {}", describe(&self.current)))),
        }
    }

    /// Property names may be any identifier, keywords included.
    fn property_name(&mut self) -> ParseResult<String> {
        let name = match &self.current.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Str(s) => s.clone(),
            TokenKind::Number(n) => crate::value::format_number(*n),
            _ => return Err(self.error(format!("expected property name, found {}", describe(&self.current)))),
        };
        self.advance();
        Ok(name)
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.enter(1)?;
        let result = self.parse_statement_inner();
        self.leave(1);
        result
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Stmt> {
        if self.current.is_punct("{") {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.eat(";") {
            return Ok(Stmt::Empty);
        }
        let keyword = self.current.ident().map(str::to_string);
        match keyword.as_deref() {
            Some("const") | Some("let") | Some("var") => {
                let stmt = self.parse_var_decl()?;
                self.eat(";");
                Ok(stmt)
            }
            Some("function") => {
                self.advance();
                let name = self.binding_ident()?;
                let func = self.parse_function_rest(Some(name.clone()))?;
                Ok(Stmt::FunctionDecl {
                    name,
                    func: Rc::new(func),
                })
            }
            Some("return") => {
                self.advance();
                let ends = self.current.is_punct(";")
                    || self.current.is_punct("}")
                    || self.current.is_eof()
                    || self.current.newline_before;
                let value = if ends { None } else { Some(self.parse_assignment()?) };
                self.eat(";");
                Ok(Stmt::Return(value))
            }
            Some("if") => {
                self.advance();
                self.expect("(")?;
                let test = self.parse_assignment()?;
                self.expect(")")?;
                let consequent = Box::new(self.parse_statement()?);
                let alternate = if self.current.is_ident("else") {
                    self.advance();
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(Stmt::If {
                    test,
                    consequent,
                    alternate,
                })
            }
            Some("for") => self.parse_for_of(),
            Some("throw") => {
                self.advance();
                let value = self.parse_assignment()?;
                self.eat(";");
                Ok(Stmt::Throw(value))
            }
            Some("class") => Err(self.error("class declarations are not supported")),
            _ => {
                let expr = self.parse_assignment()?;
                self.eat(";");
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect("{")?;
        let mut stmts = Vec::new();
        while !self.current.is_punct("}") {
            if self.current.is_eof() {
                return Err(self.error("unterminated block"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.advance();
        Ok(stmts)
    }

    fn var_kind(&self) -> Option<VarKind> {
        match self.current.ident()? {
            "const" => Some(VarKind::Const),
            "let" => Some(VarKind::Let),
            "var" => Some(VarKind::Var),
            _ => None,
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let kind = self.var_kind().ok_or_else(|| self.unexpected())?;
        self.advance();
        let mut declarations = Vec::new();
        loop {
            let pattern = self.parse_pattern()?;
            let init = if self.eat("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push((pattern, init));
            if !self.eat(",") {
                break;
            }
        }
        Ok(Stmt::VarDecl { kind, declarations })
    }

    fn parse_for_of(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.expect("(")?;
        let kind = self
            .var_kind()
            .ok_or_else(|| self.error("only `for (const x of items)` loops are supported"))?;
        self.advance();
        let target = self.parse_pattern()?;
        if !self.current.is_ident("of") {
            return Err(self.error("only `for (const x of items)` loops are supported"));
        }
        self.advance();
        let iterable = self.parse_assignment()?;
        self.expect(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::ForOf {
            kind,
            target,
            iterable,
            body,
        })
    }

    fn parse_pattern(&mut self) -> ParseResult<Pattern> {
        self.enter(1)?;
        let result = self.parse_pattern_inner();
        self.leave(1);
        result
    }

    fn parse_pattern_inner(&mut self) -> ParseResult<Pattern> {
        if self.eat("{") {
            let mut props = Vec::new();
            while !self.current.is_punct("}") {
                let key = self.property_name()?;
                let target = if self.eat(":") {
                    self.parse_pattern()?
                } else {
                    Pattern::Ident(key.clone())
                };
                let default = if self.eat("=") {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                props.push(PatternProp {
                    key,
                    target,
                    default,
                });
                if !self.eat(",") {
                    break;
                }
            }
            self.expect("}")?;
            return Ok(Pattern::Object(props));
        }
        if self.eat("[") {
            let mut items = Vec::new();
            while !self.current.is_punct("]") {
                if self.eat(",") {
                    items.push(None);
                    continue;
                }
                let target = self.parse_pattern()?;
                let default = if self.eat("=") {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                items.push(Some((target, default)));
                if !self.eat(",") {
                    break;
                }
            }
            self.expect("]")?;
            return Ok(Pattern::Array(items));
        }
        Ok(Pattern::Ident(self.binding_ident()?))
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.current.is_punct(")") {
            let pattern = self.parse_pattern()?;
            let default = if self.eat("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            params.push(Param { pattern, default });
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    /// Parameters and block body of a `function` after its name.
    fn parse_function_rest(&mut self, name: Option<String>) -> ParseResult<FunctionDef> {
        let params = self.parse_params()?;
        let body = FunctionBody::Block(self.parse_block()?);
        Ok(FunctionDef { name, params, body })
    }

    fn parse_arrow_body(&mut self) -> ParseResult<FunctionBody> {
        if self.current.is_punct("{") {
            Ok(FunctionBody::Block(self.parse_block()?))
        } else {
            Ok(FunctionBody::Expr(self.parse_assignment()?))
        }
    }

    /// Parse an arrow function if one starts here; otherwise leave the parser
    /// untouched and return `None`.
    fn try_arrow(&mut self) -> ParseResult<Option<FunctionDef>> {
        if let TokenKind::Ident(name) = &self.current.kind {
            if !RESERVED.contains(&name.as_str()) && self.peek().is_punct("=>") {
                let name = name.clone();
                self.advance();
                self.advance();
                let body = self.parse_arrow_body()?;
                return Ok(Some(FunctionDef {
                    name: None,
                    params: vec![Param {
                        pattern: Pattern::Ident(name),
                        default: None,
                    }],
                    body,
                }));
            }
            return Ok(None);
        }
        if !self.current.is_punct("(") {
            return Ok(None);
        }
        let checkpoint = self.clone();
        match self.parse_params() {
            Ok(params) if self.current.is_punct("=>") => {
                self.advance();
                let body = self.parse_arrow_body()?;
                Ok(Some(FunctionDef {
                    name: None,
                    params,
                    body,
                }))
            }
            _ => {
                *self = checkpoint;
                Ok(None)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.enter(EXPRESSION_WEIGHT)?;
        let result = self.parse_assignment_inner();
        self.leave(EXPRESSION_WEIGHT);
        result
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expr> {
        if let Some(def) = self.try_arrow()? {
            return Ok(Expr::Function(Rc::new(def)));
        }
        let left = self.parse_conditional()?;
        if self.current.is_punct("=") {
            let name = match left {
                Expr::Ident(name) => name,
                Expr::Member { .. } | Expr::Index { .. } => {
                    return Err(self.error("object and array members are read-only"));
                }
                _ => return Err(self.error("invalid assignment target")),
            };
            self.advance();
            let value = Box::new(self.parse_assignment()?);
            return Ok(Expr::Assign { name, value });
        }
        Ok(left)
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let test = self.parse_or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(":")?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        let mut links = 0;
        loop {
            let op = if self.current.is_punct("||") {
                LogicalOp::Or
            } else if self.current.is_punct("??") {
                LogicalOp::Nullish
            } else {
                break;
            };
            self.advance();
            self.extend_chain(&mut links)?;
            let right = self.parse_and()?;
            left = Expr::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_binary(0)?;
        let mut links = 0;
        while self.eat("&&") {
            self.extend_chain(&mut links)?;
            let right = self.parse_binary(0)?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(links);
        Ok(left)
    }

    /// Precedence climbing over equality, relational, additive and
    /// multiplicative operators (levels 0 through 3).
    fn parse_binary(&mut self, level: usize) -> ParseResult<Expr> {
        if level > 3 {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;
        let mut links = 0;
        while let Some(op) = self.binary_op(level) {
            self.advance();
            self.extend_chain(&mut links)?;
            let right = self.parse_binary(level + 1)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(links);
        Ok(left)
    }

    fn binary_op(&self, level: usize) -> Option<BinaryOp> {
        let TokenKind::Punct(p) = &self.current.kind else {
            return None;
        };
        let op = match (level, *p) {
            (0, "==") => BinaryOp::Eq,
            (0, "!=") => BinaryOp::NotEq,
            (0, "===") => BinaryOp::StrictEq,
            (0, "!==") => BinaryOp::StrictNotEq,
            (1, "<") => BinaryOp::Lt,
            (1, ">") => BinaryOp::Gt,
            (1, "<=") => BinaryOp::LtEq,
            (1, ">=") => BinaryOp::GtEq,
            (2, "+") => BinaryOp::Add,
            (2, "-") => BinaryOp::Sub,
            (3, "*") => BinaryOp::Mul,
            (3, "/") => BinaryOp::Div,
            (3, "%") => BinaryOp::Rem,
            _ => return None,
        };
        Some(op)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = if self.current.is_punct("!") {
            UnaryOp::Not
        } else if self.current.is_punct("-") {
            UnaryOp::Neg
        } else if self.current.is_punct("+") {
            UnaryOp::Plus
        } else if self.current.is_ident("typeof") {
            UnaryOp::TypeOf
        } else {
            return self.parse_postfix();
        };
        self.advance();
        self.enter(1)?;
        let operand = self.parse_unary();
        self.leave(1);
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut links = 0;
        loop {
            if self.current.is_punct(".")
                || self.current.is_punct("?.")
                || self.current.is_punct("[")
                || self.current.is_punct("(")
            {
                self.extend_chain(&mut links)?;
            }
            if self.eat(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat("?.") {
                if self.current.is_punct("(") {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: true,
                    };
                } else if self.eat("[") {
                    let index = self.parse_assignment()?;
                    self.expect("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    };
                } else {
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                    };
                }
            } else if self.eat("[") {
                let index = self.parse_assignment()?;
                self.expect("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.current.is_punct("(") {
                let args = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
            } else {
                self.leave(links);
                return Ok(expr);
            }
        }
    }

    /// Each link of a loop-built chain nests the tree one level deeper.
    fn extend_chain(&mut self, links: &mut usize) -> ParseResult<()> {
        self.enter(1)?;
        *links += 1;
        Ok(())
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<ArrayItem>> {
        self.expect("(")?;
        let mut args = Vec::new();
        while !self.current.is_punct(")") {
            if self.eat("...") {
                args.push(ArrayItem::Spread(self.parse_assignment()?));
            } else {
                args.push(ArrayItem::Item(self.parse_assignment()?));
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Template(parts) => {
                let mut segments = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        TemplatePart::Text(t) => segments.push(TemplateSegment::Text(t)),
                        TemplatePart::Expr(src) => {
                            segments.push(TemplateSegment::Expr(parse_expression_within(&src, self.nesting)?))
                        }
                    }
                }
                self.advance();
                Ok(Expr::Template(segments))
            }
            TokenKind::Ident(word) => self.parse_word(&word),
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.expect(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => self.parse_array_literal(),
            TokenKind::Punct("{") => self.parse_object_literal(),
            TokenKind::Punct("<") => {
                let element = self.parse_jsx_element()?;
                self.advance();
                Ok(Expr::Jsx(Box::new(element)))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_word(&mut self, word: &str) -> ParseResult<Expr> {
        let expr = match word {
            "true" => Expr::Bool(true),
            "false" => Expr::Bool(false),
            "null" => Expr::Null,
            "undefined" => Expr::Undefined,
            "function" => {
                self.advance();
                let name = match &self.current.kind {
                    TokenKind::Ident(_) => Some(self.binding_ident()?),
                    _ => None,
                };
                let def = self.parse_function_rest(name)?;
                return Ok(Expr::Function(Rc::new(def)));
            }
            "new" => {
                self.advance();
                let mut callee = self.parse_primary()?;
                while self.eat(".") {
                    let property = self.property_name()?;
                    callee = Expr::Member {
                        object: Box::new(callee),
                        property,
                        optional: false,
                    };
                }
                let args = if self.current.is_punct("(") {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                return Ok(Expr::New {
                    callee: Box::new(callee),
                    args,
                });
            }
            w if RESERVED.contains(&w) => return Err(self.unexpected()),
            w => Expr::Ident(w.to_string()),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        self.expect("[")?;
        let mut items = Vec::new();
        while !self.current.is_punct("]") {
            if self.eat("...") {
                items.push(ArrayItem::Spread(self.parse_assignment()?));
            } else {
                items.push(ArrayItem::Item(self.parse_assignment()?));
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect("]")?;
        Ok(Expr::Array(items))
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        self.expect("{")?;
        let mut props = Vec::new();
        while !self.current.is_punct("}") {
            if self.eat("...") {
                props.push(ObjectProp::Spread(self.parse_assignment()?));
            } else if self.eat("[") {
                let key = self.parse_assignment()?;
                self.expect("]")?;
                self.expect(":")?;
                props.push(ObjectProp::Computed(key, self.parse_assignment()?));
            } else {
                let shorthand_ok = matches!(self.current.kind, TokenKind::Ident(_));
                let key = self.property_name()?;
                if self.eat(":") {
                    props.push(ObjectProp::KeyValue(key, self.parse_assignment()?));
                } else if self.current.is_punct("(") {
                    let def = self.parse_function_rest(Some(key.clone()))?;
                    props.push(ObjectProp::KeyValue(key, Expr::Function(Rc::new(def))));
                } else if shorthand_ok {
                    props.push(ObjectProp::KeyValue(key.clone(), Expr::Ident(key)));
                } else {
                    return Err(self.unexpected());
                }
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(Expr::Object(props))
    }

    // -------------------------------------------------------------------------
    // JSX
    // -------------------------------------------------------------------------

    /// Parse one element starting at `<`. On return `current` is the element's
    /// final `>`, not yet consumed, so a parent element can resume reading
    /// child text directly after it.
    fn parse_jsx_element(&mut self) -> ParseResult<JsxElement> {
        self.enter(1)?;
        let result = self.parse_jsx_element_inner();
        self.leave(1);
        result
    }

    fn parse_jsx_element_inner(&mut self) -> ParseResult<JsxElement> {
        self.advance(); // <
        if self.current.is_punct(">") {
            let children = self.parse_jsx_children(&JsxName::Fragment)?;
            return Ok(JsxElement {
                name: JsxName::Fragment,
                attrs: Vec::new(),
                children,
            });
        }
        let name = JsxName::Tag(self.parse_jsx_name()?);
        let mut attrs = Vec::new();
        loop {
            if self.current.is_punct(">") {
                break;
            }
            if self.eat("/") {
                if !self.current.is_punct(">") {
                    return Err(self.error("expected `>` after `/` in self-closing tag"));
                }
                return Ok(JsxElement {
                    name,
                    attrs,
                    children: Vec::new(),
                });
            }
            if self.eat("{") {
                self.expect("...")?;
                let expr = self.parse_assignment()?;
                self.expect("}")?;
                attrs.push(JsxAttr::Spread(expr));
                continue;
            }
            if !matches!(self.current.kind, TokenKind::Ident(_)) {
                return Err(self.error(format!("unexpected {} in JSX tag", describe(&self.current))));
            }
            let attr_name = self.parse_jsx_name()?;
            let value = if self.eat("=") {
                match self.current.kind.clone() {
                    TokenKind::Str(s) => {
                        self.advance();
                        Some(Expr::Str(s))
                    }
                    TokenKind::Punct("{") => {
                        self.advance();
                        let expr = self.parse_assignment()?;
                        self.expect("}")?;
                        Some(expr)
                    }
                    _ => return Err(self.error("expected attribute value")),
                }
            } else {
                None
            };
            attrs.push(JsxAttr::Named {
                name: attr_name,
                value,
            });
        }
        let children = self.parse_jsx_children(&name)?;
        Ok(JsxElement {
            name,
            attrs,
            children,
        })
    }

    /// `ident` joined by `-` or `.` (`aria-label`, `Icons.Sun`).
    fn parse_jsx_name(&mut self) -> ParseResult<String> {
        let mut name = match &self.current.kind {
            TokenKind::Ident(n) => n.clone(),
            _ => return Err(self.error(format!("expected JSX name, found {}", describe(&self.current)))),
        };
        self.advance();
        while self.current.is_punct("-") || self.current.is_punct(".") {
            let sep = if self.current.is_punct("-") { '-' } else { '.' };
            self.advance();
            let Some(part) = self.current.ident().map(str::to_string) else {
                return Err(self.error("malformed JSX name"));
            };
            name.push(sep);
            name.push_str(&part);
            self.advance();
        }
        Ok(name)
    }

    /// Children of an element whose opening `>` is `current`. Returns with the
    /// closing tag's `>` as `current`.
    fn parse_jsx_children(&mut self, open: &JsxName) -> ParseResult<Vec<JsxChild>> {
        let mut children = Vec::new();
        loop {
            let raw = self.lexer.read_jsx_text();
            if let Some(text) = normalize_jsx_text(&raw) {
                children.push(JsxChild::Text(text));
            }
            self.current = self.lexer.next_token();
            if self.current.is_eof() {
                return Err(self.error(format!("unterminated JSX element <{}>", jsx_display(open))));
            }
            if self.current.is_punct("{") {
                self.advance();
                if self.current.is_punct("}") {
                    continue;
                }
                let expr = self.parse_assignment()?;
                if !self.current.is_punct("}") {
                    return Err(self.error(format!("expected `}}`, found {}", describe(&self.current))));
                }
                children.push(JsxChild::Expr(expr));
                continue;
            }
            if self.peek().is_punct("/") {
                self.advance(); // <
                self.advance(); // /
                let close = if self.current.is_punct(">") {
                    JsxName::Fragment
                } else {
                    JsxName::Tag(self.parse_jsx_name()?)
                };
                if &close != open {
                    return Err(self.error(format!(
                        "expected closing tag for <{}>, found </{}>",
                        jsx_display(open),
                        jsx_display(&close)
                    )));
                }
                if !self.current.is_punct(">") {
                    return Err(self.error("expected `>` in closing tag"));
                }
                return Ok(children);
            }
            children.push(JsxChild::Element(self.parse_jsx_element()?));
        }
    }
}

fn jsx_display(name: &JsxName) -> &str {
    match name {
        JsxName::Fragment => "",
        JsxName::Tag(t) => t.as_str(),
    }
}

fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(n) => format!("`{}`", n),
        TokenKind::Number(_) => "number".to_string(),
        TokenKind::Str(_) => "string".to_string(),
        TokenKind::Template(_) => "template literal".to_string(),
        TokenKind::Punct(p) => format!("`{}`", p),
        TokenKind::Unknown(c) => format!("`{}`", c),
        TokenKind::Eof => "end of input".to_string(),
    }
}

/// JSX whitespace rules: lines are trimmed where they meet a line break, blank
/// lines vanish and the survivors are joined with single spaces.
fn normalize_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let line = line.trim_end_matches('\r');
        let mut piece = line;
        if i > 0 {
            piece = piece.trim_start();
        }
        if i < last {
            piece = piece.trim_end();
        }
        if piece.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(piece);
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
