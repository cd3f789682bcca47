//! Snippet compiler and the defensive wrapper around compiled widgets.

use crate::error::{CompileError, CompileResult, EvalError};
use crate::host::HostLibrary;
use crate::id::{PropertyBag, WidgetId};
use crate::interp::{Budget, Interpreter, Scope};
use crate::node::RenderNode;
use crate::parser::parse_program;
use crate::scan::prepare;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Suffix that marks the entry-point declaration.
    pub entry_suffix: String,
    /// Top-level declarations dropped unless they are the entry point.
    pub scaffold_names: Vec<String>,
    pub max_steps: u64,
    pub max_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        let budget = Budget::default();
        Self {
            entry_suffix: "Widget".to_string(),
            scaffold_names: vec!["App".to_string()],
            max_steps: budget.max_steps,
            max_depth: budget.max_depth,
        }
    }
}

impl CompilerOptions {
    fn budget(&self) -> Budget {
        Budget {
            max_steps: self.max_steps,
            max_depth: self.max_depth,
        }
    }
}

/// Turns snippet text into [`CompiledWidget`]s. Holds no state besides its options.
#[derive(Debug, Clone, Default)]
pub struct SnippetCompiler {
    options: CompilerOptions,
}

impl SnippetCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile under a freshly generated id.
    pub fn compile(&self, source: &str) -> CompileResult<CompiledWidget> {
        self.compile_with_id(WidgetId::generate(), source)
    }

    /// Compile under a known id (rehydration).
    pub fn compile_with_id(&self, id: WidgetId, source: &str) -> CompileResult<CompiledWidget> {
        let prepared = prepare(source, &self.options.entry_suffix, &self.options.scaffold_names)?;
        debug!(
            target: "voxgrid::synth",
            widget_id = %id,
            entry = %prepared.entry_point,
            excised = prepared.excised.len(),
            "snippet prepared"
        );

        let program = parse_program(&prepared.retained_source)?;
        let budget = self.options.budget();
        let entry_name = prepared.entry_point.clone();

        let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<Option<Value>, EvalError> {
            let module = Scope::child(&HostLibrary::new().scope());
            Interpreter::new(budget).run_program(&program, &module)?;
            Ok(Scope::get_own(&module, &entry_name))
        }));

        let entry = match outcome {
            Ok(Ok(entry)) => entry.unwrap_or_default(),
            Ok(Err(err)) => return Err(CompileError::from(err)),
            Err(panic) => return Err(CompileError::EvaluationThrew(panic_message(&*panic))),
        };

        if !entry.is_callable() {
            return Err(CompileError::EntryPointNotCallable {
                name: prepared.entry_point,
                found: entry.type_name().to_string(),
            });
        }

        Ok(CompiledWidget {
            id,
            entry_point: prepared.entry_point,
            callable: entry,
            budget,
            valid: Cell::new(true),
        })
    }
}

/// An evaluated widget ready to render. Not `Send`: it stays on the thread that
/// compiled it.
pub struct CompiledWidget {
    id: WidgetId,
    entry_point: String,
    callable: Value,
    budget: Budget,
    valid: Cell<bool>,
}

impl CompiledWidget {
    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// False once an invocation has failed; reset by the next successful one.
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Render with `props`. Never panics or errors: any failure comes back as
    /// [`RenderNode::Error`].
    pub fn invoke(&self, props: &PropertyBag) -> RenderNode {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut interp = Interpreter::new(self.budget);
            let result = interp.call(&self.callable, &Value::Undefined, vec![Value::from_json_map(props)]);
            result.map(|value| value.to_render_node())
        }));
        let failure = match outcome {
            Ok(Ok(node)) => {
                self.valid.set(!node.is_error());
                return node;
            }
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(&*panic),
        };
        warn!(
            target: "voxgrid::synth",
            widget_id = %self.id,
            entry = %self.entry_point,
            error = %failure,
            "widget render failed"
        );
        self.valid.set(false);
        RenderNode::error(failure)
    }
}

impl fmt::Debug for CompiledWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledWidget")
            .field("id", &self.id)
            .field("entry_point", &self.entry_point)
            .field("valid", &self.valid.get())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic during evaluation: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic during evaluation: {}", s)
    } else {
        "panic during evaluation".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: serde_json::Value) -> PropertyBag {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn compiles_minimal_render_widget() {
        let compiled = SnippetCompiler::default()
            .compile_with_id("w1".into(), "const FooWidget = () => render('Foo')")
            .unwrap();
        assert_eq!(compiled.id().as_str(), "w1");
        assert_eq!(compiled.entry_point(), "FooWidget");
        assert_eq!(compiled.invoke(&PropertyBag::new()), RenderNode::text("Foo"));
    }

    #[test]
    fn jsx_widget_with_props_and_scaffolding() {
        let src = r#"
import React, { useState } from 'react';

const WeatherWidget = ({ city = 'Nowhere', temperature, condition }) => {
  const [unit] = useState('C');
  return (
    <div className="weather">
      <h2>{city}</h2>
      <p>{temperature}°{unit} and {condition.toLowerCase()}</p>
    </div>
  );
};

const App = () => <WeatherWidget city="Test" />;
export default App;
"#;
        let compiled = SnippetCompiler::default().compile(src).unwrap();
        let node = compiled.invoke(&props(json!({
            "city": "San Francisco", "temperature": 72, "condition": "Sunny"
        })));
        assert_eq!(node.attr("class"), Some("weather"));
        assert_eq!(node.text_content(), "San Francisco72°C and sunny");
        assert!(compiled.is_valid());
    }

    #[test]
    fn missing_marker_is_no_entry_point() {
        let err = SnippetCompiler::default()
            .compile("const Thing = () => 1")
            .unwrap_err();
        assert!(matches!(err, CompileError::NoEntryPointFound { .. }));
    }

    #[test]
    fn non_callable_entry_point() {
        let err = SnippetCompiler::default()
            .compile("const ConfigWidget = { size: 3 }")
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::EntryPointNotCallable {
                name: "ConfigWidget".into(),
                found: "object".into()
            }
        );
    }

    #[test]
    fn top_level_throw_is_evaluation_error() {
        let err = SnippetCompiler::default()
            .compile("const BadWidget = () => 1; throw new Error('nope');")
            .unwrap_err();
        assert!(matches!(err, CompileError::EvaluationThrew(ref m) if m.contains("nope")));
    }

    #[test]
    fn syntax_error_is_evaluation_error() {
        let err = SnippetCompiler::default()
            .compile("const BrokenWidget = () => <div>")
            .unwrap_err();
        assert!(matches!(err, CompileError::EvaluationThrew(ref m) if m.contains("SyntaxError")));
    }

    #[test]
    fn invocation_failure_becomes_error_node() {
        let compiled = SnippetCompiler::default()
            .compile("const OopsWidget = (p) => p.missing.deeper")
            .unwrap();
        let node = compiled.invoke(&PropertyBag::new());
        assert!(node.is_error());
        assert!(!compiled.is_valid());
    }

    #[test]
    fn runaway_recursion_is_contained() {
        let compiled = SnippetCompiler::default()
            .compile("const LoopWidget = () => { const f = () => f(); return f(); }")
            .unwrap();
        assert!(compiled.invoke(&PropertyBag::new()).is_error());
    }

    #[test]
    fn widgets_do_not_share_state() {
        let compiler = SnippetCompiler::default();
        let a = compiler
            .compile("let count = 0; const CounterWidget = () => { count = count + 1; return count; }")
            .unwrap();
        let b = compiler
            .compile("let count = 0; const CounterWidget = () => { count = count + 1; return count; }")
            .unwrap();
        assert_eq!(a.invoke(&PropertyBag::new()), RenderNode::text("1"));
        assert_eq!(a.invoke(&PropertyBag::new()), RenderNode::text("2"));
        assert_eq!(b.invoke(&PropertyBag::new()), RenderNode::text("1"));
    }
}
