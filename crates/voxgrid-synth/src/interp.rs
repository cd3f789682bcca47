//! Tree-walking evaluator with a step budget and call-depth limit.

use crate::ast::*;
use crate::error::EvalError;
use crate::host;
use crate::value::{Closure, ObjectMap, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type ScopeRef = Rc<RefCell<Scope>>;

pub type EvalResult<T> = Result<T, EvalError>;

struct Binding {
    value: Value,
    mutable: bool,
}

/// One lexical scope. The chain ends at the host library scope.
#[derive(Default)]
pub struct Scope {
    vars: HashMap<String, Binding>,
    parent: Option<ScopeRef>,
}

impl Scope {
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope::default()))
    }

    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    pub fn declare(scope: &ScopeRef, name: &str, value: Value, mutable: bool) {
        scope
            .borrow_mut()
            .vars
            .insert(name.to_string(), Binding { value, mutable });
    }

    pub fn get_own(scope: &ScopeRef, name: &str) -> Option<Value> {
        scope.borrow().vars.get(name).map(|b| b.value.clone())
    }

    pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
        let mut current = Rc::clone(scope);
        loop {
            let parent = {
                let s = current.borrow();
                if let Some(binding) = s.vars.get(name) {
                    return Some(binding.value.clone());
                }
                s.parent.clone()
            };
            current = parent?;
        }
    }

    pub fn assign(scope: &ScopeRef, name: &str, value: Value) -> EvalResult<()> {
        let mut current = Rc::clone(scope);
        loop {
            let parent = {
                let mut s = current.borrow_mut();
                if let Some(binding) = s.vars.get_mut(name) {
                    if !binding.mutable {
                        return Err(EvalError::Type(format!(
                            "Assignment to constant variable `{}`",
                            name
                        )));
                    }
                    binding.value = value;
                    return Ok(());
                }
                s.parent.clone()
            };
            current = parent.ok_or_else(|| EvalError::Reference(name.to_string()))?;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub max_steps: u64,
    pub max_depth: usize,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_steps: 200_000,
            max_depth: 64,
        }
    }
}

/// Deepest evaluator recursion allowed, counting nested expressions,
/// statements and elements across calls.
pub const MAX_EVAL_NESTING: usize = 160;

enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    budget: Budget,
    steps: u64,
    depth: usize,
    nesting: usize,
}

impl Interpreter {
    pub fn new(budget: Budget) -> Self {
        Self {
            budget,
            steps: 0,
            depth: 0,
            nesting: 0,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.budget.max_steps {
            return Err(EvalError::BudgetExhausted(self.budget.max_steps));
        }
        Ok(())
    }

    /// One level of evaluator recursion: ticks the budget and bounds the nesting.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        self.tick()?;
        if self.nesting >= MAX_EVAL_NESTING {
            return Err(EvalError::NestingExceeded(MAX_EVAL_NESTING));
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    /// Run top-level statements in `scope`; a top-level `return` is ignored.
    pub fn run_program(&mut self, program: &[Stmt], scope: &ScopeRef) -> EvalResult<()> {
        self.exec_block(program, scope).map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn hoist(&mut self, stmts: &[Stmt], scope: &ScopeRef) {
        for stmt in stmts {
            if let Stmt::FunctionDecl { name, func } = stmt {
                let closure = Value::Function(Rc::new(Closure {
                    def: Rc::clone(func),
                    scope: Rc::clone(scope),
                }));
                Scope::declare(scope, name, closure, true);
            }
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &ScopeRef) -> EvalResult<Flow> {
        self.hoist(stmts, scope);
        for stmt in stmts {
            if let Flow::Return(v) = self.exec(stmt, scope)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_nested(&mut self, stmt: &Stmt, scope: &ScopeRef) -> EvalResult<Flow> {
        match stmt {
            Stmt::Block(stmts) => self.exec_block(stmts, &Scope::child(scope)),
            other => self.exec(other, scope),
        }
    }

    fn exec(&mut self, stmt: &Stmt, scope: &ScopeRef) -> EvalResult<Flow> {
        self.nested(|this| this.exec_stmt(stmt, scope))
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &ScopeRef) -> EvalResult<Flow> {
        match stmt {
            Stmt::VarDecl { kind, declarations } => {
                for (pattern, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    self.bind_pattern(pattern, value, scope, *kind != VarKind::Const)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::FunctionDecl { .. } | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval(e, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec_nested(consequent, scope)
                } else if let Some(alt) = alternate {
                    self.exec_nested(alt, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::ForOf {
                kind,
                target,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, scope)?;
                let items = self.iterate(&iterable)?;
                for item in items {
                    let iteration = Scope::child(scope);
                    self.bind_pattern(target, item, &iteration, *kind != VarKind::Const)?;
                    if let Flow::Return(v) = self.exec_nested(body, &iteration)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                Err(EvalError::Thrown(thrown_message(&value)))
            }
            Stmt::Block(stmts) => self.exec_block(stmts, &Scope::child(scope)),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn iterate(&self, value: &Value) -> EvalResult<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            other => Err(EvalError::Type(format!("{} is not iterable", other.type_name()))),
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        scope: &ScopeRef,
        mutable: bool,
    ) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(name) => {
                Scope::declare(scope, name, value, mutable);
                Ok(())
            }
            Pattern::Object(props) => {
                if value.is_nullish() {
                    return Err(EvalError::Type(format!(
                        "Cannot destructure {} as it is {}",
                        describe_pattern(pattern),
                        value.type_name()
                    )));
                }
                for prop in props {
                    let mut v = self.get_property(&value, &prop.key)?;
                    if let (Value::Undefined, Some(default)) = (&v, &prop.default) {
                        v = self.eval(default, scope)?;
                    }
                    self.bind_pattern(&prop.target, v, scope, mutable)?;
                }
                Ok(())
            }
            Pattern::Array(items) => {
                let elements = self.iterate(&value)?;
                for (i, item) in items.iter().enumerate() {
                    let Some((target, default)) = item else {
                        continue;
                    };
                    let mut v = elements.get(i).cloned().unwrap_or_default();
                    if let (Value::Undefined, Some(default)) = (&v, default) {
                        v = self.eval(default, scope)?;
                    }
                    self.bind_pattern(target, v, scope, mutable)?;
                }
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------

    pub fn call(&mut self, callee: &Value, this: &Value, args: Vec<Value>) -> EvalResult<Value> {
        match callee {
            Value::Native(native) => (native.func)(self, this, args),
            Value::Function(closure) => {
                if self.depth >= self.budget.max_depth {
                    return Err(EvalError::DepthExceeded(self.budget.max_depth));
                }
                self.depth += 1;
                let result = self.call_closure(closure, args);
                self.depth -= 1;
                result
            }
            other => Err(EvalError::Type(format!("{} is not a function", other.type_name()))),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        let scope = Scope::child(&closure.scope);
        let mut args = args.into_iter();
        for param in &closure.def.params {
            let mut value = args.next().unwrap_or_default();
            if let (Value::Undefined, Some(default)) = (&value, &param.default) {
                value = self.eval(default, &scope)?;
            }
            self.bind_pattern(&param.pattern, value, &scope, true)?;
        }
        match &closure.def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &scope)? {
                Flow::Return(v) => Ok(v),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }

    /// Property read with builtin method lookup for arrays, strings and numbers.
    pub fn get_property(&self, value: &Value, name: &str) -> EvalResult<Value> {
        match value {
            Value::Undefined | Value::Null => Err(EvalError::Type(format!(
                "Cannot read properties of {} (reading '{}')",
                value.type_name(),
                name
            ))),
            Value::Object(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            Value::Array(items) => {
                if name == "length" {
                    return Ok(Value::Number(items.borrow().len() as f64));
                }
                if let Ok(i) = name.parse::<usize>() {
                    return Ok(items.borrow().get(i).cloned().unwrap_or_default());
                }
                Ok(host::array_method(name).unwrap_or_default())
            }
            Value::Str(s) => {
                if name == "length" {
                    return Ok(Value::Number(s.encode_utf16().count() as f64));
                }
                if let Ok(i) = name.parse::<usize>() {
                    return Ok(s
                        .chars()
                        .nth(i)
                        .map(|c| Value::str(c.to_string()))
                        .unwrap_or_default());
                }
                Ok(host::string_method(name).unwrap_or_default())
            }
            Value::Number(_) => Ok(host::number_method(name).unwrap_or_default()),
            Value::Function(closure) if name == "name" => {
                Ok(Value::str(closure.def.name.as_deref().unwrap_or_default()))
            }
            Value::Native(native) if name == "name" => Ok(Value::str(&native.name)),
            _ => Ok(Value::Undefined),
        }
    }

    // -------------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------------

    pub fn eval(&mut self, expr: &Expr, scope: &ScopeRef) -> EvalResult<Value> {
        self.nested(|this| this.eval_expr(expr, scope))
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &ScopeRef) -> EvalResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(t) => out.push_str(t),
                        TemplateSegment::Expr(e) => out.push_str(&self.eval(e, scope)?.to_display()),
                    }
                }
                Ok(Value::str(out))
            }
            Expr::Ident(name) => {
                Scope::lookup(scope, name).ok_or_else(|| EvalError::Reference(name.clone()))
            }
            Expr::Array(items) => Ok(Value::array(self.eval_items(items, scope)?)),
            Expr::Object(props) => self.eval_object(props, scope),
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                Ok(self.eval_link(expr, scope)?.unwrap_or_default())
            }
            Expr::New { callee, args } => {
                let ctor = self.eval(callee, scope)?;
                let args = self.eval_items(args, scope)?;
                if !ctor.is_callable() {
                    return Err(EvalError::Type(format!("{} is not a constructor", describe_expr(callee))));
                }
                self.call(&ctor, &Value::Undefined, args)
            }
            Expr::Function(def) => Ok(Value::Function(Rc::new(Closure {
                def: Rc::clone(def),
                scope: Rc::clone(scope),
            }))),
            Expr::Unary { op, operand } => {
                if *op == UnaryOp::TypeOf {
                    if let Expr::Ident(name) = &**operand {
                        return Ok(Value::str(
                            Scope::lookup(scope, name).map_or("undefined", |v| v.type_of()),
                        ));
                    }
                }
                let v = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                    UnaryOp::Plus => Value::Number(v.to_number()),
                    UnaryOp::TypeOf => Value::str(v.type_of()),
                })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                Ok(binary(*op, &l, &r))
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left, scope)?;
                let take_left = match op {
                    LogicalOp::And => !l.truthy(),
                    LogicalOp::Or => l.truthy(),
                    LogicalOp::Nullish => !l.is_nullish(),
                };
                if take_left {
                    Ok(l)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Assign { name, value } => {
                let v = self.eval(value, scope)?;
                Scope::assign(scope, name, v.clone())?;
                Ok(v)
            }
            Expr::Jsx(element) => self.eval_jsx(element, scope),
        }
    }

    fn eval_items(&mut self, items: &[ArrayItem], scope: &ScopeRef) -> EvalResult<Vec<Value>> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                ArrayItem::Item(e) => out.push(self.eval(e, scope)?),
                ArrayItem::Spread(e) => {
                    let v = self.eval(e, scope)?;
                    out.extend(self.iterate(&v)?);
                }
            }
        }
        Ok(out)
    }

    fn eval_object(&mut self, props: &[ObjectProp], scope: &ScopeRef) -> EvalResult<Value> {
        let mut map = ObjectMap::new();
        for prop in props {
            match prop {
                ObjectProp::KeyValue(key, e) => {
                    let v = self.eval(e, scope)?;
                    map.insert(key.clone(), v);
                }
                ObjectProp::Computed(key, e) => {
                    let k = self.eval(key, scope)?.to_display();
                    let v = self.eval(e, scope)?;
                    map.insert(k, v);
                }
                ObjectProp::Spread(e) => spread_into(&mut map, &self.eval(e, scope)?),
            }
        }
        Ok(Value::object(map))
    }

    /// Evaluate one link of a member, index or call chain. `None` means an
    /// optional link met a nullish base and the rest of the chain is skipped.
    fn eval_link(&mut self, expr: &Expr, scope: &ScopeRef) -> EvalResult<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let Some(obj) = self.chain_base(object, scope)? else {
                    return Ok(None);
                };
                if *optional && obj.is_nullish() {
                    return Ok(None);
                }
                self.get_property(&obj, property).map(Some)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                let Some(obj) = self.chain_base(object, scope)? else {
                    return Ok(None);
                };
                if *optional && obj.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval(index, scope)?;
                self.get_property(&obj, &key.to_display()).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, scope),
            other => self.eval(other, scope).map(Some),
        }
    }

    /// The object part of a link belongs to the same chain.
    fn chain_base(&mut self, expr: &Expr, scope: &ScopeRef) -> EvalResult<Option<Value>> {
        match expr {
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                self.nested(|this| this.eval_link(expr, scope))
            }
            other => self.eval(other, scope).map(Some),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[ArrayItem],
        optional: bool,
        scope: &ScopeRef,
    ) -> EvalResult<Option<Value>> {
        let (func, this) = match callee {
            Expr::Member {
                object,
                property,
                optional: member_optional,
            } => {
                let Some(obj) = self.chain_base(object, scope)? else {
                    return Ok(None);
                };
                if *member_optional && obj.is_nullish() {
                    return Ok(None);
                }
                (self.get_property(&obj, property)?, obj)
            }
            Expr::Index {
                object,
                index,
                optional: index_optional,
            } => {
                let Some(obj) = self.chain_base(object, scope)? else {
                    return Ok(None);
                };
                if *index_optional && obj.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval(index, scope)?.to_display();
                (self.get_property(&obj, &key)?, obj)
            }
            other => match self.chain_base(other, scope)? {
                Some(func) => (func, Value::Undefined),
                None => return Ok(None),
            },
        };
        if optional && func.is_nullish() {
            return Ok(None);
        }
        if !func.is_callable() {
            return Err(EvalError::Type(format!("{} is not a function", describe_expr(callee))));
        }
        let args = self.eval_items(args, scope)?;
        self.call(&func, &this, args).map(Some)
    }

    fn eval_jsx(&mut self, element: &JsxElement, scope: &ScopeRef) -> EvalResult<Value> {
        let mut props = ObjectMap::new();
        for attr in &element.attrs {
            match attr {
                JsxAttr::Named { name, value } => {
                    let v = match value {
                        Some(e) => self.eval(e, scope)?,
                        None => Value::Bool(true),
                    };
                    props.insert(name.clone(), v);
                }
                JsxAttr::Spread(e) => spread_into(&mut props, &self.eval(e, scope)?),
            }
        }
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(match child {
                JsxChild::Text(t) => Value::str(t),
                JsxChild::Expr(e) => self.eval(e, scope)?,
                JsxChild::Element(el) => self.nested(|this| this.eval_jsx(el, scope))?,
            });
        }
        let ty = match &element.name {
            JsxName::Fragment => Value::str(host::FRAGMENT_TAG),
            JsxName::Tag(tag) if element.name.is_component() => self.resolve_component(tag, scope)?,
            JsxName::Tag(tag) => Value::str(tag),
        };
        host::create_element(self, &ty, props, children)
    }

    fn resolve_component(&self, tag: &str, scope: &ScopeRef) -> EvalResult<Value> {
        let mut parts = tag.split('.');
        let head = parts.next().unwrap_or_default();
        let mut value =
            Scope::lookup(scope, head).ok_or_else(|| EvalError::Reference(head.to_string()))?;
        for part in parts {
            value = self.get_property(&value, part)?;
        }
        Ok(value)
    }
}

fn spread_into(map: &mut ObjectMap, value: &Value) {
    match value {
        Value::Object(src) => {
            for (k, v) in src.iter() {
                map.insert(k.clone(), v.clone());
            }
        }
        Value::Array(items) => {
            for (i, v) in items.borrow().iter().enumerate() {
                map.insert(i.to_string(), v.clone());
            }
        }
        _ => {}
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| {
                matches!(v, Value::Str(_) | Value::Array(_) | Value::Object(_) | Value::Node(_))
            };
            if stringy(l) || stringy(r) {
                Value::str(format!("{}{}", l.to_display(), r.to_display()))
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::NotEq => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNotEq => Value::Bool(!l.strict_eq(r)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            let ordering = match (l, r) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            let Some(ordering) = ordering else {
                return Value::Bool(false);
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::LtEq => ordering.is_le(),
                _ => ordering.is_ge(),
            })
        }
    }
}

fn thrown_message(value: &Value) -> String {
    if let Value::Object(map) = value {
        if let Some(message) = map.get("message") {
            let name = map
                .get("name")
                .map(Value::to_display)
                .unwrap_or_else(|| "Error".to_string());
            return format!("{}: {}", name, message.to_display());
        }
    }
    value.to_display()
}

fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{}", describe_expr(object), property),
        Expr::Call { callee, .. } => format!("{}(...)", describe_expr(callee)),
        _ => "expression".to_string(),
    }
}

fn describe_pattern(pattern: &Pattern) -> &'static str {
    match pattern {
        Pattern::Object(_) => "object pattern",
        Pattern::Array(_) => "array pattern",
        Pattern::Ident(_) => "binding",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_program;

    fn run(src: &str) -> EvalResult<ScopeRef> {
        let program = parse_program(src)?;
        let scope = Scope::child(&host::HostLibrary::new().scope());
        Interpreter::new(Budget::default()).run_program(&program, &scope)?;
        Ok(scope)
    }

    fn get(scope: &ScopeRef, name: &str) -> Value {
        Scope::get_own(scope, name).unwrap()
    }

    #[test]
    fn closures_capture_scope() {
        let s = run("const add = (a) => (b) => a + b; const r = add(2)(3);").unwrap();
        assert!(get(&s, "r").strict_eq(&Value::Number(5.0)));
    }

    #[test]
    fn function_declarations_are_hoisted() {
        let s = run("const r = twice(4); function twice(n) { return n * 2 }").unwrap();
        assert!(get(&s, "r").strict_eq(&Value::Number(8.0)));
    }

    #[test]
    fn destructuring_defaults_apply_on_undefined() {
        let s = run("const { a = 1, b = 2 } = { b: 5 }; const [x, , z = 9] = [7, 8];").unwrap();
        assert!(get(&s, "a").strict_eq(&Value::Number(1.0)));
        assert!(get(&s, "b").strict_eq(&Value::Number(5.0)));
        assert!(get(&s, "x").strict_eq(&Value::Number(7.0)));
        assert!(get(&s, "z").strict_eq(&Value::Number(9.0)));
    }

    #[test]
    fn const_reassignment_is_type_error() {
        let err = run("const a = 1; a = 2;").err().unwrap();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn undefined_identifier_is_reference_error() {
        let err = run("const a = missing + 1;").err().unwrap();
        assert_eq!(err, EvalError::Reference("missing".into()));
    }

    #[test]
    fn for_of_and_let_accumulate() {
        let s = run("let total = 0; for (const n of [1, 2, 3]) { total = total + n }").unwrap();
        assert!(get(&s, "total").strict_eq(&Value::Number(6.0)));
    }

    #[test]
    fn optional_chaining_short_circuits() {
        let s = run("const o = null; const r = o?.deep.value ?? 'none';").unwrap();
        assert!(get(&s, "r").strict_eq(&Value::str("none")));
    }

    #[test]
    fn optional_chain_skips_calls_and_indexes_after_the_nullish_link() {
        let s = run(
            "const o = { inner: null, list: [{ name: 'a' }] };
             const a = o.inner?.items[0].name.toUpperCase();
             const b = o.inner?.format().trim();
             const c = o.list?.[0].name;
             const d = o.missing?.();",
        )
        .unwrap();
        assert!(get(&s, "a").strict_eq(&Value::Undefined));
        assert!(get(&s, "b").strict_eq(&Value::Undefined));
        assert!(get(&s, "c").strict_eq(&Value::str("a")));
        assert!(get(&s, "d").strict_eq(&Value::Undefined));
    }

    #[test]
    fn non_optional_link_on_nullish_still_throws() {
        let err = run("const o = { inner: null }; const r = o.inner.value;").err().unwrap();
        assert!(matches!(err, EvalError::Type(_)));
    }

    #[test]
    fn nesting_limit_stops_deep_recursion_before_the_stack() {
        let program =
            parse_program("const f = (n) => n <= 0 ? 0 : 1 + (1 + (1 + f(n - 1))); const r = f(60);").unwrap();
        let scope = Scope::child(&host::HostLibrary::new().scope());
        let err = Interpreter::new(Budget::default())
            .run_program(&program, &scope)
            .unwrap_err();
        assert_eq!(err, EvalError::NestingExceeded(MAX_EVAL_NESTING));
    }

    #[test]
    fn recursion_hits_depth_limit() {
        let program = parse_program("const xs = [1]; for (const x of xs) { xs.push(x) }").unwrap();
        let scope = Scope::child(&host::HostLibrary::new().scope());
        let err = Interpreter::new(Budget {
            max_steps: 1_000,
            max_depth: 8,
        })
        .run_program(&program, &scope);
        // for-of iterates a snapshot, so this terminates
        assert!(err.is_ok());

        let program = parse_program("const f = (n) => f(n + 1); f(0);").unwrap();
        let err = Interpreter::new(Budget {
            max_steps: 1_000_000,
            max_depth: 8,
        })
        .run_program(&program, &scope)
        .unwrap_err();
        assert_eq!(err, EvalError::DepthExceeded(8));
    }

    #[test]
    fn budget_counts_steps() {
        let program = parse_program("const big = [1,2,3,4,5,6,7,8,9,10].map(x => x * x * x);").unwrap();
        let scope = Scope::child(&host::HostLibrary::new().scope());
        let err = Interpreter::new(Budget {
            max_steps: 10,
            max_depth: 8,
        })
        .run_program(&program, &scope)
        .unwrap_err();
        assert_eq!(err, EvalError::BudgetExhausted(10));
    }

    #[test]
    fn throw_error_object_carries_message() {
        let err = run("throw new Error('bad widget')").err().unwrap();
        assert_eq!(err, EvalError::Thrown("Error: bad widget".into()));
    }
}
