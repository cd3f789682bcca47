//! Host UI library: the only names a snippet can reach besides its own.
//!
//! Exposes a React-shaped element factory, inert hooks, `Math` and a handful
//! of conversion helpers, plus the builtin methods of arrays, strings and
//! numbers.

use crate::error::EvalError;
use crate::interp::{EvalResult, Interpreter, Scope, ScopeRef};
use crate::node::RenderNode;
use crate::value::{format_number, ObjectMap, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Element type standing for `React.Fragment` / `<>...</>`.
pub const FRAGMENT_TAG: &str = "#fragment";

/// Deepest element tree a snippet may build.
pub const MAX_NODE_DEPTH: usize = 128;

/// CSS properties that take bare numbers.
const UNITLESS: &[&str] = &[
    "opacity",
    "zIndex",
    "fontWeight",
    "lineHeight",
    "flex",
    "flexGrow",
    "flexShrink",
    "order",
];

pub struct HostLibrary {
    scope: ScopeRef,
}

impl Default for HostLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLibrary {
    /// Build a fresh host scope. Each compilation gets its own, so nothing
    /// leaks between widgets.
    pub fn new() -> Self {
        let scope = Scope::root();
        let create_element = Value::native("createElement", native_create_element);
        let fragment = Value::str(FRAGMENT_TAG);
        let hooks = [
            ("useState", Value::native("useState", use_state)),
            ("useEffect", Value::native("useEffect", |_, _, _| Ok(Value::Undefined))),
            ("useMemo", Value::native("useMemo", use_memo)),
            ("useCallback", Value::native("useCallback", |_, _, args| Ok(first(&args)))),
            ("useRef", Value::native("useRef", use_ref)),
        ];

        let mut react = ObjectMap::new();
        react.insert("createElement".into(), create_element.clone());
        react.insert("Fragment".into(), fragment.clone());
        for (name, hook) in &hooks {
            react.insert((*name).into(), hook.clone());
        }
        Scope::declare(&scope, "React", Value::object(react), false);

        Scope::declare(&scope, "h", create_element, false);
        Scope::declare(&scope, "Fragment", fragment, false);
        for (name, hook) in hooks {
            Scope::declare(&scope, name, hook, false);
        }
        Scope::declare(&scope, "render", Value::native("render", native_render), false);
        Scope::declare(&scope, "text", Value::native("text", native_text), false);
        Scope::declare(&scope, "Math", math_object(), false);
        Scope::declare(&scope, "console", console_object(), false);
        Scope::declare(&scope, "JSON", json_object(), false);
        Scope::declare(&scope, "Object", object_statics(), false);
        Scope::declare(&scope, "Array", array_statics(), false);
        Scope::declare(&scope, "Error", Value::native("Error", native_error), false);
        Scope::declare(
            &scope,
            "String",
            Value::native("String", |_, _, args| Ok(Value::str(first(&args).to_display()))),
            false,
        );
        Scope::declare(
            &scope,
            "Number",
            Value::native("Number", |_, _, args| Ok(Value::Number(first(&args).to_number()))),
            false,
        );
        Scope::declare(
            &scope,
            "Boolean",
            Value::native("Boolean", |_, _, args| Ok(Value::Bool(first(&args).truthy()))),
            false,
        );
        Scope::declare(&scope, "parseInt", Value::native("parseInt", parse_int), false);
        Scope::declare(
            &scope,
            "parseFloat",
            Value::native("parseFloat", |_, _, args| Ok(Value::Number(parse_float_prefix(&first(&args).to_display())))),
            false,
        );
        Scope::declare(
            &scope,
            "isNaN",
            Value::native("isNaN", |_, _, args| Ok(Value::Bool(first(&args).to_number().is_nan()))),
            false,
        );
        Scope::declare(&scope, "NaN", Value::Number(f64::NAN), false);
        Scope::declare(&scope, "Infinity", Value::Number(f64::INFINITY), false);

        Self { scope }
    }

    pub fn scope(&self) -> ScopeRef {
        ScopeRef::clone(&self.scope)
    }
}

fn first(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or_default()
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

// -----------------------------------------------------------------------------
// Elements
// -----------------------------------------------------------------------------

fn native_create_element(interp: &mut Interpreter, _this: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let mut args = args.into_iter();
    let ty = args.next().unwrap_or_default();
    let props = match args.next() {
        Some(Value::Object(map)) => (*map).clone(),
        _ => ObjectMap::new(),
    };
    create_element(interp, &ty, props, args.collect())
}

/// Shared by JSX evaluation and `createElement` calls.
pub fn create_element(
    interp: &mut Interpreter,
    ty: &Value,
    mut props: ObjectMap,
    children: Vec<Value>,
) -> EvalResult<Value> {
    match ty {
        Value::Str(tag) if &**tag == FRAGMENT_TAG => {
            Ok(Value::node(RenderNode::Fragment {
                children: checked_children(&children)?,
            }))
        }
        Value::Str(tag) => {
            let mut attrs = BTreeMap::new();
            for (key, value) in &props {
                if let Some((name, rendered)) = attr_value(key, value) {
                    attrs.insert(name, rendered);
                }
            }
            Ok(Value::node(RenderNode::element(tag.to_string(), attrs, checked_children(&children)?)))
        }
        Value::Function(_) | Value::Native(_) => {
            match children.len() {
                0 => {}
                1 => {
                    props.insert("children".into(), first(&children));
                }
                _ => {
                    props.insert("children".into(), Value::array(children));
                }
            }
            let rendered = interp.call(ty, &Value::Undefined, vec![Value::object(props)])?;
            Ok(Value::node(rendered.to_render_node()))
        }
        other => Err(EvalError::Type(format!(
            "element type is invalid: expected a string or a function but got {}",
            other.type_name()
        ))),
    }
}

fn child_nodes(children: &[Value]) -> Vec<RenderNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        push_child(child, &mut out);
    }
    out
}

/// Arrays among the children are spliced in place.
fn push_child(value: &Value, out: &mut Vec<RenderNode>) {
    match value.to_render_node() {
        RenderNode::Empty => {}
        RenderNode::Fragment { children } if matches!(value, Value::Array(_)) => out.extend(children),
        node => out.push(node),
    }
}

fn checked_children(children: &[Value]) -> EvalResult<Vec<RenderNode>> {
    let nodes = child_nodes(children);
    if nodes.iter().any(|n| n.depth_exceeds(MAX_NODE_DEPTH - 1)) {
        return Err(EvalError::Type(format!(
            "element tree is nested deeper than {} levels",
            MAX_NODE_DEPTH
        )));
    }
    Ok(nodes)
}

fn attr_value(key: &str, value: &Value) -> Option<(String, String)> {
    if matches!(key, "children" | "key" | "ref") {
        return None;
    }
    let name = match key {
        "className" => "class".to_string(),
        "htmlFor" => "for".to_string(),
        other => other.to_string(),
    };
    let rendered = match value {
        Value::Undefined | Value::Null | Value::Bool(false) => return None,
        Value::Function(_) | Value::Native(_) => return None,
        Value::Bool(true) => "true".to_string(),
        Value::Object(map) if key == "style" => style_string(map),
        other => other.to_display(),
    };
    Some((name, rendered))
}

fn style_string(map: &ObjectMap) -> String {
    let mut parts = Vec::with_capacity(map.len());
    for (prop, value) in map {
        if value.is_nullish() {
            continue;
        }
        let css_value = match value {
            Value::Number(n) if *n != 0.0 && !UNITLESS.contains(&prop.as_str()) => {
                format!("{}px", format_number(*n))
            }
            other => other.to_display(),
        };
        parts.push(format!("{}: {}", kebab_case(prop), css_value));
    }
    parts.join("; ")
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn native_render(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    Ok(Value::node(RenderNode::from_children(child_nodes(&args))))
}

fn native_text(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let text = args
        .iter()
        .map(Value::to_display)
        .collect::<Vec<_>>()
        .join(" ");
    Ok(Value::node(RenderNode::text(text)))
}

fn native_error(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let mut map = ObjectMap::new();
    map.insert("name".into(), Value::str("Error"));
    map.insert("message".into(), Value::str(first(&args).to_display()));
    Ok(Value::object(map))
}

// -----------------------------------------------------------------------------
// Hooks. Rendering is a single pass, so state never changes and effects never run.
// -----------------------------------------------------------------------------

fn use_state(interp: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let init = first(&args);
    let value = if init.is_callable() {
        interp.call(&init, &Value::Undefined, Vec::new())?
    } else {
        init
    };
    let setter = Value::native("setState", |_, _, _| Ok(Value::Undefined));
    Ok(Value::array(vec![value, setter]))
}

fn use_memo(interp: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let factory = first(&args);
    interp.call(&factory, &Value::Undefined, Vec::new())
}

fn use_ref(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let mut map = ObjectMap::new();
    map.insert("current".into(), first(&args));
    Ok(Value::object(map))
}

// -----------------------------------------------------------------------------
// Globals
// -----------------------------------------------------------------------------

fn math_object() -> Value {
    fn unary(name: &'static str, f: fn(f64) -> f64) -> (String, Value) {
        (
            name.to_string(),
            Value::native(name, move |_, _, args| Ok(Value::Number(f(first(&args).to_number())))),
        )
    }
    let mut map: ObjectMap = [
        unary("round", |n| (n + 0.5).floor()),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("abs", f64::abs),
        unary("sqrt", f64::sqrt),
        unary("trunc", f64::trunc),
    ]
    .into_iter()
    .collect();
    map.insert(
        "min".into(),
        Value::native("min", |_, _, args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(f64::INFINITY, f64::min)))
        }),
    );
    map.insert(
        "max".into(),
        Value::native("max", |_, _, args| {
            Ok(Value::Number(args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, f64::max)))
        }),
    );
    map.insert(
        "pow".into(),
        Value::native("pow", |_, _, args| {
            Ok(Value::Number(arg(&args, 0).to_number().powf(arg(&args, 1).to_number())))
        }),
    );
    map.insert("PI".into(), Value::Number(std::f64::consts::PI));
    Value::object(map)
}

fn console_object() -> Value {
    let mut map = ObjectMap::new();
    for level in ["log", "info", "debug"] {
        map.insert(
            level.into(),
            Value::native(level, |_, _, args| {
                debug!(target: "voxgrid::snippet", output = %join_display(&args), "console");
                Ok(Value::Undefined)
            }),
        );
    }
    for level in ["warn", "error"] {
        map.insert(
            level.into(),
            Value::native(level, |_, _, args| {
                warn!(target: "voxgrid::snippet", output = %join_display(&args), "console");
                Ok(Value::Undefined)
            }),
        );
    }
    Value::object(map)
}

fn join_display(args: &[Value]) -> String {
    args.iter().map(Value::to_display).collect::<Vec<_>>().join(" ")
}

fn json_object() -> Value {
    let mut map = ObjectMap::new();
    map.insert(
        "stringify".into(),
        Value::native("stringify", |_, _, args| {
            let json = first(&args).to_json();
            let indent = arg(&args, 2);
            let out = if indent.truthy() {
                serde_json::to_string_pretty(&json)
            } else {
                serde_json::to_string(&json)
            };
            out.map(Value::str)
                .map_err(|e| EvalError::Type(e.to_string()))
        }),
    );
    map.insert(
        "parse".into(),
        Value::native("parse", |_, _, args| {
            serde_json::from_str::<serde_json::Value>(&first(&args).to_display())
                .map(|json| Value::from_json(&json))
                .map_err(|e| EvalError::Thrown(format!("SyntaxError: {}", e)))
        }),
    );
    Value::object(map)
}

fn object_statics() -> Value {
    fn entries_of(value: &Value) -> Vec<(String, Value)> {
        match value {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }
    let mut map = ObjectMap::new();
    map.insert(
        "keys".into(),
        Value::native("keys", |_, _, args| {
            Ok(Value::array(entries_of(&first(&args)).into_iter().map(|(k, _)| Value::str(k)).collect()))
        }),
    );
    map.insert(
        "values".into(),
        Value::native("values", |_, _, args| {
            Ok(Value::array(entries_of(&first(&args)).into_iter().map(|(_, v)| v).collect()))
        }),
    );
    map.insert(
        "entries".into(),
        Value::native("entries", |_, _, args| {
            Ok(Value::array(
                entries_of(&first(&args))
                    .into_iter()
                    .map(|(k, v)| Value::array(vec![Value::str(k), v]))
                    .collect(),
            ))
        }),
    );
    map.insert(
        "assign".into(),
        Value::native("assign", |_, _, args| {
            let mut merged = ObjectMap::new();
            for source in &args {
                merged.extend(entries_of(source));
            }
            Ok(Value::object(merged))
        }),
    );
    Value::object(map)
}

fn array_statics() -> Value {
    let mut map = ObjectMap::new();
    map.insert(
        "isArray".into(),
        Value::native("isArray", |_, _, args| Ok(Value::Bool(matches!(first(&args), Value::Array(_))))),
    );
    map.insert(
        "from".into(),
        Value::native("from", |interp, _, args| {
            let source = first(&args);
            let items = match &source {
                Value::Array(items) => items.borrow().clone(),
                Value::Str(s) => s.chars().map(|c| Value::str(c.to_string())).collect(),
                Value::Object(map) => {
                    let len = map.get("length").map_or(0.0, Value::to_number);
                    vec![Value::Undefined; len.max(0.0).min(10_000.0) as usize]
                }
                _ => Vec::new(),
            };
            let mapper = arg(&args, 1);
            if !mapper.is_callable() {
                return Ok(Value::array(items));
            }
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                out.push(interp.call(&mapper, &Value::Undefined, vec![item, Value::Number(i as f64)])?);
            }
            Ok(Value::array(out))
        }),
    );
    Value::object(map)
}

fn parse_int(_: &mut Interpreter, _: &Value, args: Vec<Value>) -> EvalResult<Value> {
    let text = first(&args).to_display();
    let radix = match arg(&args, 1) {
        Value::Undefined => 10,
        r => r.to_number() as u32,
    };
    let t = text.trim();
    let (sign, digits) = match t.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, t.strip_prefix('+').unwrap_or(t)),
    };
    if !(2..=36).contains(&radix) {
        return Ok(Value::Number(f64::NAN));
    }
    let valid: String = digits.chars().take_while(|c| c.is_digit(radix)).collect();
    Ok(Value::Number(
        i64::from_str_radix(&valid, radix).map_or(f64::NAN, |n| sign * n as f64),
    ))
}

fn parse_float_prefix(text: &str) -> f64 {
    let t = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in t.char_indices() {
        let ok = c.is_ascii_digit() || (c == '.' && !seen_dot) || (i == 0 && (c == '-' || c == '+'));
        if !ok {
            break;
        }
        seen_dot |= c == '.';
        end = i + c.len_utf8();
    }
    t[..end].parse().unwrap_or(f64::NAN)
}

// -----------------------------------------------------------------------------
// Builtin methods. `this` is the receiver.
// -----------------------------------------------------------------------------

fn array_items(this: &Value) -> EvalResult<Vec<Value>> {
    match this {
        Value::Array(items) => Ok(items.borrow().clone()),
        other => Err(EvalError::Type(format!("receiver is {} not array", other.type_name()))),
    }
}

fn call_each(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Vec<(Value, Value)>> {
    let callback = first(args);
    if !callback.is_callable() {
        return Err(EvalError::Type(format!("{} is not a function", callback.type_name())));
    }
    let items = array_items(this)?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        let result = interp.call(
            &callback,
            &Value::Undefined,
            vec![item.clone(), Value::Number(i as f64), this.clone()],
        )?;
        out.push((item, result));
    }
    Ok(out)
}

fn slice_bounds(len: usize, start: &Value, end: &Value) -> (usize, usize) {
    let resolve = |v: &Value, default: usize| -> usize {
        if v.is_nullish() {
            return default;
        }
        let n = v.to_number();
        if n.is_nan() {
            return 0;
        }
        let n = n.trunc() as i64;
        if n < 0 {
            (len as i64 + n).max(0) as usize
        } else {
            (n as usize).min(len)
        }
    };
    let s = resolve(start, 0);
    let e = resolve(end, len);
    (s, e.max(s))
}

pub fn array_method(name: &str) -> Option<Value> {
    let method = match name {
        "map" => Value::native("map", |interp, this, args| {
            let mapped = call_each(interp, this, &args)?;
            Ok(Value::array(mapped.into_iter().map(|(_, r)| r).collect()))
        }),
        "filter" => Value::native("filter", |interp, this, args| {
            let kept = call_each(interp, this, &args)?;
            Ok(Value::array(
                kept.into_iter()
                    .filter(|(_, keep)| keep.truthy())
                    .map(|(item, _)| item)
                    .collect(),
            ))
        }),
        "forEach" => Value::native("forEach", |interp, this, args| {
            call_each(interp, this, &args)?;
            Ok(Value::Undefined)
        }),
        "some" => Value::native("some", |interp, this, args| {
            Ok(Value::Bool(call_each(interp, this, &args)?.iter().any(|(_, r)| r.truthy())))
        }),
        "every" => Value::native("every", |interp, this, args| {
            Ok(Value::Bool(call_each(interp, this, &args)?.iter().all(|(_, r)| r.truthy())))
        }),
        "find" => Value::native("find", |interp, this, args| {
            Ok(call_each(interp, this, &args)?
                .into_iter()
                .find(|(_, r)| r.truthy())
                .map(|(item, _)| item)
                .unwrap_or_default())
        }),
        "reduce" => Value::native("reduce", |interp, this, args| {
            let callback = first(&args);
            let mut items = array_items(this)?.into_iter().enumerate();
            let mut acc = match args.get(1) {
                Some(init) => init.clone(),
                None => match items.next() {
                    Some((_, v)) => v,
                    None => {
                        return Err(EvalError::Type(
                            "Reduce of empty array with no initial value".into(),
                        ))
                    }
                },
            };
            for (i, item) in items {
                acc = interp.call(&callback, &Value::Undefined, vec![acc, item, Value::Number(i as f64)])?;
            }
            Ok(acc)
        }),
        "join" => Value::native("join", |_, this, args| {
            let sep = match first(&args) {
                Value::Undefined => ",".to_string(),
                v => v.to_display(),
            };
            let parts: Vec<String> = array_items(this)?
                .iter()
                .map(|v| if v.is_nullish() { String::new() } else { v.to_display() })
                .collect();
            Ok(Value::str(parts.join(&sep)))
        }),
        "slice" => Value::native("slice", |_, this, args| {
            let items = array_items(this)?;
            let (s, e) = slice_bounds(items.len(), &arg(&args, 0), &arg(&args, 1));
            Ok(Value::array(items[s..e].to_vec()))
        }),
        "includes" => Value::native("includes", |_, this, args| {
            let needle = first(&args);
            Ok(Value::Bool(array_items(this)?.iter().any(|v| v.strict_eq(&needle))))
        }),
        "indexOf" => Value::native("indexOf", |_, this, args| {
            let needle = first(&args);
            let pos = array_items(this)?.iter().position(|v| v.strict_eq(&needle));
            Ok(Value::Number(pos.map_or(-1.0, |p| p as f64)))
        }),
        "push" => Value::native("push", |_, this, args| match this {
            Value::Array(items) => {
                let mut items = items.borrow_mut();
                items.extend(args);
                Ok(Value::Number(items.len() as f64))
            }
            other => Err(EvalError::Type(format!("receiver is {} not array", other.type_name()))),
        }),
        "concat" => Value::native("concat", |_, this, args| {
            let mut items = array_items(this)?;
            for a in args {
                match a {
                    Value::Array(more) => items.extend(more.borrow().iter().cloned()),
                    other => items.push(other),
                }
            }
            Ok(Value::array(items))
        }),
        "reverse" => Value::native("reverse", |_, this, _| {
            let mut items = array_items(this)?;
            items.reverse();
            Ok(Value::array(items))
        }),
        _ => return None,
    };
    Some(method)
}

fn receiver_str(this: &Value) -> String {
    this.to_display()
}

pub fn string_method(name: &str) -> Option<Value> {
    let method = match name {
        "toUpperCase" => Value::native("toUpperCase", |_, this, _| Ok(Value::str(receiver_str(this).to_uppercase()))),
        "toLowerCase" => Value::native("toLowerCase", |_, this, _| Ok(Value::str(receiver_str(this).to_lowercase()))),
        "trim" => Value::native("trim", |_, this, _| Ok(Value::str(receiver_str(this).trim()))),
        "toString" => Value::native("toString", |_, this, _| Ok(Value::str(receiver_str(this)))),
        "includes" => Value::native("includes", |_, this, args| {
            Ok(Value::Bool(receiver_str(this).contains(&first(&args).to_display())))
        }),
        "startsWith" => Value::native("startsWith", |_, this, args| {
            Ok(Value::Bool(receiver_str(this).starts_with(&first(&args).to_display())))
        }),
        "endsWith" => Value::native("endsWith", |_, this, args| {
            Ok(Value::Bool(receiver_str(this).ends_with(&first(&args).to_display())))
        }),
        "split" => Value::native("split", |_, this, args| {
            let s = receiver_str(this);
            let parts: Vec<Value> = match first(&args) {
                Value::Undefined => vec![Value::str(&s)],
                sep => {
                    let sep = sep.to_display();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                }
            };
            Ok(Value::array(parts))
        }),
        "slice" => Value::native("slice", |_, this, args| {
            let chars: Vec<char> = receiver_str(this).chars().collect();
            let (s, e) = slice_bounds(chars.len(), &arg(&args, 0), &arg(&args, 1));
            Ok(Value::str(chars[s..e].iter().collect::<String>()))
        }),
        "charAt" => Value::native("charAt", |_, this, args| {
            let i = first(&args).to_number().max(0.0) as usize;
            Ok(Value::str(receiver_str(this).chars().nth(i).map(String::from).unwrap_or_default()))
        }),
        "replace" => Value::native("replace", |_, this, args| {
            let s = receiver_str(this);
            Ok(Value::str(s.replacen(&first(&args).to_display(), &arg(&args, 1).to_display(), 1)))
        }),
        "repeat" => Value::native("repeat", |_, this, args| {
            let n = first(&args).to_number();
            if !(0.0..=10_000.0).contains(&n) {
                return Err(EvalError::Type("Invalid count value".into()));
            }
            Ok(Value::str(receiver_str(this).repeat(n as usize)))
        }),
        "padStart" => Value::native("padStart", |_, this, args| {
            let s = receiver_str(this);
            let target = first(&args).to_number().clamp(0.0, 10_000.0) as usize;
            let fill = match arg(&args, 1) {
                Value::Undefined => " ".to_string(),
                v => v.to_display(),
            };
            let len = s.chars().count();
            if len >= target || fill.is_empty() {
                return Ok(Value::str(s));
            }
            let pad: String = fill.chars().cycle().take(target - len).collect();
            Ok(Value::str(format!("{}{}", pad, s)))
        }),
        _ => return None,
    };
    Some(method)
}

pub fn number_method(name: &str) -> Option<Value> {
    let method = match name {
        "toFixed" => Value::native("toFixed", |_, this, args| {
            let digits = first(&args).to_number();
            let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 20.0) as usize };
            Ok(Value::str(format!("{:.*}", digits, this.to_number())))
        }),
        "toString" => Value::native("toString", |_, this, _| Ok(Value::str(this.to_display()))),
        "toLocaleString" => Value::native("toLocaleString", |_, this, _| {
            Ok(Value::str(group_thousands(this.to_number())))
        }),
        _ => return None,
    };
    Some(method)
}

fn group_thousands(n: f64) -> String {
    let formatted = format_number((n * 1000.0).round() / 1000.0);
    let (int_part, frac) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted.clone(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(d) => ("-", d.to_string()),
        None => ("", int_part),
    };
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    match frac {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::Budget;
    use crate::parser::parse_program;

    fn eval_value(src: &str) -> Value {
        let program = parse_program(&format!("const __out = {};", src)).unwrap();
        let scope = Scope::child(&HostLibrary::new().scope());
        Interpreter::new(Budget::default())
            .run_program(&program, &scope)
            .unwrap();
        Scope::get_own(&scope, "__out").unwrap()
    }

    fn display(src: &str) -> String {
        eval_value(src).to_display()
    }

    #[test]
    fn create_element_builds_attrs_and_children() {
        let v = eval_value("React.createElement('div', { className: 'card', hidden: false, style: { fontSize: 14, opacity: 0.5 } }, 'hi', ['a', 'b'])");
        let Value::Node(node) = v else { panic!("expected node") };
        assert_eq!(node.attr("class"), Some("card"));
        assert_eq!(node.attr("hidden"), None);
        assert_eq!(node.attr("style"), Some("font-size: 14px; opacity: 0.5"));
        assert_eq!(node.text_content(), "hiab");
    }

    #[test]
    fn components_receive_children_prop() {
        let v = eval_value("h((p) => h('b', null, p.children), { id: 1 }, 'inner')");
        let Value::Node(node) = v else { panic!("expected node") };
        assert_eq!(node.text_content(), "inner");
    }

    #[test]
    fn use_state_returns_initial_value() {
        assert_eq!(display("useState(() => 41 + 1)[0]"), "42");
        assert_eq!(display("React.useMemo(() => 'memo', [])"), "memo");
    }

    #[test]
    fn array_methods() {
        assert_eq!(display("[1, 2, 3].map(x => x * 2).join('-')"), "2-4-6");
        assert_eq!(display("[1, 2, 3, 4].filter(x => x % 2 === 0).length"), "2");
        assert_eq!(display("[5, 6, 7].slice(-2)"), "6,7");
        assert_eq!(display("[1, 2, 3].reduce((a, b) => a + b, 0)"), "6");
        assert_eq!(display("['a', 'b'].includes('b')"), "true");
    }

    #[test]
    fn string_and_number_methods() {
        assert_eq!(display("'  Sunny '.trim().toUpperCase()"), "SUNNY");
        assert_eq!(display("'a,b'.split(',').length"), "2");
        assert_eq!(display("(21.456).toFixed(1)"), "21.5");
        assert_eq!(display("'7'.padStart(3, '0')"), "007");
        assert_eq!(display("(1234567).toLocaleString()"), "1,234,567");
    }

    #[test]
    fn math_builtins() {
        assert_eq!(display("Math.round(2.5)"), "3");
        assert_eq!(display("Math.max(1, 9, 3)"), "9");
        assert_eq!(display("Math.floor(-1.5)"), "-2");
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(display("parseInt('42px')"), "42");
        assert_eq!(display("parseFloat('3.5 degrees')"), "3.5");
        assert_eq!(display("JSON.stringify({ a: [1, 'x'] })"), r#"{"a":[1,"x"]}"#);
    }
}
