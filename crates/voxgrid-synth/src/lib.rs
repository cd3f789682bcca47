//! Widget synthesis: turn an untrusted snippet into an invocable render unit.
//!
//! The pipeline is scan → locate entry point → excise scaffolding → parse →
//! evaluate in an isolated scope → verify → wrap. Evaluation is bounded by a
//! step budget and call-depth limit, and a compiled widget never panics or
//! errors when invoked: failures render as [`RenderNode::Error`].
//!
//! ```
//! use voxgrid_synth::{PropertyBag, RenderNode, SnippetCompiler};
//!
//! let compiled = SnippetCompiler::default()
//!     .compile("const FooWidget = () => render('Foo')")
//!     .unwrap();
//! assert_eq!(compiled.invoke(&PropertyBag::new()), RenderNode::text("Foo"));
//! ```

pub mod ast;
pub mod compiler;
pub mod error;
pub mod host;
pub mod id;
pub mod interp;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod scan;
pub mod value;

pub use compiler::{CompiledWidget, CompilerOptions, SnippetCompiler};
pub use error::{CompileError, CompileResult, EvalError};
pub use id::{PropertyBag, WidgetId};
pub use interp::Budget;
pub use node::RenderNode;
