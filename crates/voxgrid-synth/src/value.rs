//! Runtime values of the snippet interpreter.
//!
//! Values are reference counted with interior mutability where the language
//! allows mutation (arrays). They are deliberately `!Send`: a compiled widget
//! lives on the UI thread that evaluated it.

use crate::ast::FunctionDef;
use crate::error::EvalError;
use crate::interp::{Interpreter, ScopeRef};
use crate::node::RenderNode;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type ObjectMap = IndexMap<String, Value>;

/// Nesting cap for converting arrays and objects. Anything deeper, and any
/// array reachable from itself, converts to a placeholder.
pub const MAX_CONVERT_DEPTH: usize = 64;

const CIRCULAR: &str = "[Circular]";

pub type NativeImpl = dyn Fn(&mut Interpreter, &Value, Vec<Value>) -> Result<Value, EvalError>;

pub struct NativeFunction {
    pub name: String,
    pub func: Box<NativeImpl>,
}

pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub scope: ScopeRef,
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<ObjectMap>),
    Function(Rc<Closure>),
    Native(Rc<NativeFunction>),
    Node(Rc<RenderNode>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: ObjectMap) -> Self {
        Value::Object(Rc::new(map))
    }

    pub fn node(node: RenderNode) -> Self {
        Value::Node(Rc::new(node))
    }

    pub fn native<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut Interpreter, &Value, Vec<Value>) -> Result<Value, EvalError> + 'static,
    {
        Value::Native(Rc::new(NativeFunction {
            name: name.to_string(),
            func: Box::new(func),
        }))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Descriptive type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Node(_) => "element",
        }
    }

    /// Result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Node(_) => "object",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => {
                let t = s.trim();
                if t.is_empty() {
                    0.0
                } else {
                    t.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) => Value::str(self.to_display()).to_number(),
            _ => f64::NAN,
        }
    }

    /// String conversion as performed by template literals and `+`.
    pub fn to_display(&self) -> String {
        self.display_in(&mut Trail::default())
    }

    fn display_in(&self, trail: &mut Trail) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(items) => {
                // a cyclic array joins as empty
                if !trail.enter(Rc::as_ptr(items).cast()) {
                    return String::new();
                }
                let joined = items
                    .borrow()
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.display_in(trail) })
                    .collect::<Vec<_>>()
                    .join(",");
                trail.leave();
                joined
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(_) | Value::Native(_) => "function".to_string(),
            Value::Node(node) => node.text_content(),
        }
    }

    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }

    /// Convert a returned value into the render tree.
    pub fn to_render_node(&self) -> RenderNode {
        self.render_in(&mut Trail::default())
    }

    fn render_in(&self, trail: &mut Trail) -> RenderNode {
        match self {
            Value::Node(node) => (**node).clone(),
            Value::Str(s) => RenderNode::text(s.to_string()),
            Value::Number(n) => RenderNode::text(format_number(*n)),
            Value::Undefined | Value::Null | Value::Bool(_) => RenderNode::Empty,
            Value::Array(items) => {
                if !trail.enter(Rc::as_ptr(items).cast()) {
                    return RenderNode::error("cannot render a circular or too deeply nested array");
                }
                let children = items.borrow().iter().map(|v| v.render_in(trail)).collect();
                trail.leave();
                RenderNode::from_children(children)
            }
            Value::Object(_) => RenderNode::text(self.json_in(trail).to_string()),
            Value::Function(_) | Value::Native(_) => RenderNode::Empty,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.json_in(&mut Trail::default())
    }

    fn json_in(&self, trail: &mut Trail) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < SAFE_INTEGER_BOUND {
                    Json::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)
                }
            }
            Value::Str(s) => Json::String(s.to_string()),
            Value::Array(items) => {
                if !trail.enter(Rc::as_ptr(items).cast()) {
                    return Json::String(CIRCULAR.to_string());
                }
                let json = Json::Array(items.borrow().iter().map(|v| v.json_in(trail)).collect());
                trail.leave();
                json
            }
            Value::Object(map) => {
                if !trail.enter(Rc::as_ptr(map).cast()) {
                    return Json::String(CIRCULAR.to_string());
                }
                let json = Json::Object(
                    map.iter()
                        .filter(|(_, v)| !v.is_callable())
                        .map(|(k, v)| (k.clone(), v.json_in(trail)))
                        .collect(),
                );
                trail.leave();
                json
            }
            Value::Function(_) | Value::Native(_) => Json::Null,
            Value::Node(node) => serde_json::to_value(&**node).unwrap_or(Json::Null),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::str(s),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::from_json_map(map),
        }
    }

    pub fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        Value::object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::from_json(v)))
                .collect(),
        )
    }
}

/// Containers currently being converted, outermost first.
#[derive(Default)]
struct Trail {
    ancestors: Vec<*const ()>,
}

impl Trail {
    /// Push `ptr` unless it is already an ancestor or the trail is full.
    fn enter(&mut self, ptr: *const ()) -> bool {
        if self.ancestors.len() >= MAX_CONVERT_DEPTH || self.ancestors.contains(&ptr) {
            return false;
        }
        self.ancestors.push(ptr);
        true
    }

    fn leave(&mut self) {
        self.ancestors.pop();
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Function(c) => write!(f, "[function {}]", c.def.name.as_deref().unwrap_or("anonymous")),
            Value::Native(n) => write!(f, "[native {}]", n.name),
            Value::Node(node) => write!(f, "{:?}", node),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            other => write!(f, "{}", other.to_display()),
        }
    }
}

/// Integers below this magnitude convert to `i64` without loss.
const SAFE_INTEGER_BOUND: f64 = 9.0e15;

/// Number formatting matching the snippet language's `String(n)`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < SAFE_INTEGER_BOUND {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
