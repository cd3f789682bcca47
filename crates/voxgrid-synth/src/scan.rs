//! Structural top-level scan: split a snippet into top-level items, locate the
//! entry point and drop module scaffolding before anything is parsed.

use crate::error::{CompileError, CompileResult};
use crate::lexer::{Lexer, Token, TokenKind};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Const,
    Let,
    Var,
    Function,
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// `import ...` in any form.
    Import,
    /// `export default <expr>` and `export { .. }` lists.
    ExportOnly,
    Declaration { name: String, kind: DeclKind },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelItem {
    pub kind: ItemKind,
    /// Byte range of the text kept if this item is retained (export keywords
    /// already stripped).
    pub retained: Range<usize>,
}

impl TopLevelItem {
    pub fn declared_name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Declaration { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Result of preparing a snippet for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub entry_point: String,
    pub retained_source: String,
    pub excised: Vec<String>,
}

const ITEM_KEYWORDS: &[&str] = &["import", "export", "const", "let", "var", "function", "class"];

/// Tokens after which a line break does not end the current item.
const CONTINUATION_PUNCT: &[&str] = &[
    "=", "=>", "(", "[", ",", ":", "?", "&&", "||", "??", "+", "-", "*", "/", "%", ".", "?.",
    "<", ">", "===", "!==", "==", "!=", "<=", ">=", "!", "&", "|", "...",
];

/// Split `source` into top-level items. Never fails.
pub fn scan(source: &str) -> Vec<TopLevelItem> {
    let tokens = Lexer::new(source).tokenize();
    let starts = item_starts(&tokens);

    let mut items = Vec::new();
    if let Some(&first) = starts.first() {
        let lead = 0..tokens[first].span.start.byte;
        if !source[lead.clone()].trim().is_empty() {
            items.push(TopLevelItem {
                kind: ItemKind::Other,
                retained: lead,
            });
        }
    } else if !source.trim().is_empty() {
        items.push(TopLevelItem {
            kind: ItemKind::Other,
            retained: 0..source.len(),
        });
    }

    for (n, &start) in starts.iter().enumerate() {
        let end_byte = starts
            .get(n + 1)
            .map(|&next| tokens[next].span.start.byte)
            .unwrap_or(source.len());
        let end_tok = starts.get(n + 1).copied().unwrap_or(tokens.len() - 1);
        items.push(classify(&tokens[start..end_tok], end_byte));
    }
    items
}

fn item_starts(tokens: &[Token]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut depth: usize = 0;
    let mut prev: Option<&Token> = None;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_eof() {
            break;
        }
        if depth == 0 {
            if let TokenKind::Ident(word) = &tok.kind {
                if ITEM_KEYWORDS.contains(&word.as_str()) && begins_item(prev, tok) {
                    starts.push(i);
                }
            }
        }
        match &tok.kind {
            TokenKind::Punct("(") | TokenKind::Punct("[") | TokenKind::Punct("{") => depth += 1,
            TokenKind::Punct(")") | TokenKind::Punct("]") | TokenKind::Punct("}") => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        prev = Some(tok);
    }
    starts
}

fn begins_item(prev: Option<&Token>, tok: &Token) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    if prev.is_punct(";") || prev.is_punct("}") {
        return true;
    }
    if !tok.newline_before {
        return false;
    }
    match &prev.kind {
        TokenKind::Punct(p) => !CONTINUATION_PUNCT.contains(p),
        TokenKind::Ident(word) => !matches!(word.as_str(), "return" | "default" | "export" | "new" | "typeof"),
        _ => true,
    }
}

fn classify(tokens: &[Token], end_byte: usize) -> TopLevelItem {
    let start_byte = tokens[0].span.start.byte;
    let whole = start_byte..end_byte;
    let keyword = tokens[0].ident().unwrap_or_default();
    match keyword {
        "import" => TopLevelItem {
            kind: ItemKind::Import,
            retained: whole,
        },
        "export" => classify_export(tokens, end_byte),
        _ => declaration_at(tokens, 0, end_byte).unwrap_or(TopLevelItem {
            kind: ItemKind::Other,
            retained: whole,
        }),
    }
}

fn classify_export(tokens: &[Token], end_byte: usize) -> TopLevelItem {
    let whole = tokens[0].span.start.byte..end_byte;
    let export_only = TopLevelItem {
        kind: ItemKind::ExportOnly,
        retained: whole,
    };
    let Some(second) = tokens.get(1) else {
        return export_only;
    };
    let decl_at = if second.is_ident("default") { 2 } else { 1 };
    declaration_at(tokens, decl_at, end_byte).unwrap_or(export_only)
}

/// Recognise `const|let|var|function|class <name>` starting at `at`.
fn declaration_at(tokens: &[Token], at: usize, end_byte: usize) -> Option<TopLevelItem> {
    let keyword = tokens.get(at)?.ident()?;
    let kind = match keyword {
        "const" => DeclKind::Const,
        "let" => DeclKind::Let,
        "var" => DeclKind::Var,
        "function" => DeclKind::Function,
        "class" => DeclKind::Class,
        _ => return None,
    };
    let mut name_at = at + 1;
    // `function* gen` is not supported by the evaluator but still names a declaration.
    if kind == DeclKind::Function && tokens.get(name_at).is_some_and(|t| t.is_punct("*")) {
        name_at += 1;
    }
    let name = tokens.get(name_at)?.ident()?.to_string();
    Some(TopLevelItem {
        kind: ItemKind::Declaration { name, kind },
        retained: tokens[at].span.start.byte..end_byte,
    })
}

/// Scan `source`, pick the entry point and build the text that will be evaluated.
///
/// The entry point is the first top-level declaration whose name ends with
/// `entry_suffix`. Imports, bare exports and declarations named in `scaffolds`
/// (other than the entry point itself) are excised.
pub fn prepare(source: &str, entry_suffix: &str, scaffolds: &[String]) -> CompileResult<Prepared> {
    let items = scan(source);
    let entry_point = items
        .iter()
        .filter_map(TopLevelItem::declared_name)
        .find(|name| name.ends_with(entry_suffix))
        .map(str::to_string)
        .ok_or_else(|| CompileError::NoEntryPointFound {
            suffix: entry_suffix.to_string(),
        })?;

    let mut retained_source = String::with_capacity(source.len());
    let mut excised = Vec::new();
    for item in &items {
        let text = &source[item.retained.clone()];
        let drop = match &item.kind {
            ItemKind::Import | ItemKind::ExportOnly => true,
            ItemKind::Declaration { name, .. } => {
                name != &entry_point && scaffolds.iter().any(|s| s == name)
            }
            ItemKind::Other => false,
        };
        if drop {
            excised.push(text.trim().lines().next().unwrap_or_default().to_string());
            continue;
        }
        retained_source.push_str(text);
        if !text.ends_with('\n') {
            retained_source.push('\n');
        }
    }

    Ok(Prepared {
        entry_point,
        retained_source,
        excised,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffolds() -> Vec<String> {
        vec!["App".to_string()]
    }

    #[test]
    fn splits_items_at_depth_zero() {
        let src = "import React from 'react';\nconst a = { b: function () { return 1 } };\nfunction CardWidget() {}\nexport default CardWidget;";
        let kinds: Vec<_> = scan(src).into_iter().map(|i| i.kind).collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(kinds[0], ItemKind::Import);
        assert!(matches!(&kinds[1], ItemKind::Declaration { name, kind: DeclKind::Const } if name == "a"));
        assert!(matches!(&kinds[2], ItemKind::Declaration { name, kind: DeclKind::Function } if name == "CardWidget"));
        assert_eq!(kinds[3], ItemKind::ExportOnly);
    }

    #[test]
    fn function_expression_does_not_start_item() {
        let src = "const f =\n  function () { return 2 }\nconst XWidget = f";
        let names: Vec<_> = scan(src)
            .iter()
            .filter_map(|i| i.declared_name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["f", "XWidget"]);
    }

    #[test]
    fn export_default_function_keeps_declaration() {
        let p = prepare(
            "export default function ClockWidget() { return 'tick' }",
            "Widget",
            &scaffolds(),
        )
        .unwrap();
        assert_eq!(p.entry_point, "ClockWidget");
        assert!(p.retained_source.starts_with("function ClockWidget"));
    }

    #[test]
    fn export_const_drops_keyword() {
        let p = prepare("export const NoteWidget = () => 'n';", "Widget", &scaffolds()).unwrap();
        assert!(p.retained_source.starts_with("const NoteWidget"));
    }

    #[test]
    fn scaffold_app_is_excised() {
        let src = "const WeatherWidget = () => 'sun';\nconst App = () => WeatherWidget();\nexport default App;";
        let p = prepare(src, "Widget", &scaffolds()).unwrap();
        assert!(!p.retained_source.contains("App"));
        assert_eq!(p.excised.len(), 2);
    }

    #[test]
    fn first_marker_wins() {
        let src = "const AWidget = () => 1; const BWidget = () => 2;";
        assert_eq!(prepare(src, "Widget", &[]).unwrap().entry_point, "AWidget");
    }

    #[test]
    fn missing_marker_fails_even_for_garbage() {
        let err = prepare("}}} not ((( code", "Widget", &[]).unwrap_err();
        assert!(matches!(err, CompileError::NoEntryPointFound { .. }));
        let err = prepare("const App = () => 1", "Widget", &scaffolds()).unwrap_err();
        assert!(matches!(err, CompileError::NoEntryPointFound { .. }));
    }

    #[test]
    fn other_top_level_text_is_retained() {
        let src = "// heading\nconsole.log('boot');\nconst TWidget = () => 't'";
        let p = prepare(src, "Widget", &[]).unwrap();
        assert!(p.retained_source.contains("console.log('boot');"));
        assert!(p.retained_source.contains("// heading"));
    }
}
