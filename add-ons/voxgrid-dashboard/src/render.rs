//! Draws a widget's `RenderNode` tree with egui.

use egui::{Color32, RichText, Ui};
use voxgrid_core::RenderNode;

const INLINE_TAGS: &[&str] = &[
    "span", "strong", "b", "em", "i", "small", "code", "a", "label", "sup", "sub",
];

#[derive(Clone, Copy, Default)]
struct TextStyle {
    strong: bool,
    italics: bool,
    monospace: bool,
    small: bool,
    size: Option<f32>,
    color: Option<Color32>,
}

impl TextStyle {
    fn for_tag(mut self, tag: &str) -> Self {
        match tag {
            "strong" | "b" | "th" => self.strong = true,
            "em" | "i" => self.italics = true,
            "code" | "pre" => self.monospace = true,
            "small" | "sub" | "sup" => self.small = true,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.strong = true;
                self.size = match tag {
                    "h1" => Some(26.0),
                    "h2" => Some(22.0),
                    "h3" => Some(18.0),
                    _ => self.size,
                };
            }
            _ => {}
        }
        self
    }

    fn rich(&self, text: &str) -> RichText {
        let mut rich = RichText::new(text);
        if self.strong {
            rich = rich.strong();
        }
        if self.italics {
            rich = rich.italics();
        }
        if self.monospace {
            rich = rich.monospace();
        }
        if self.small {
            rich = rich.small();
        }
        if let Some(size) = self.size {
            rich = rich.size(size);
        }
        if let Some(color) = self.color {
            rich = rich.color(color);
        }
        rich
    }
}

pub fn render_node(ui: &mut Ui, node: &RenderNode) {
    render_styled(ui, node, TextStyle::default());
}

fn render_styled(ui: &mut Ui, node: &RenderNode, style: TextStyle) {
    match node {
        RenderNode::Empty => {}
        RenderNode::Text { text } => {
            if !text.trim().is_empty() {
                ui.label(style.rich(text));
            }
        }
        RenderNode::Error { message } => {
            ui.label(
                RichText::new(format!("Widget error: {}", message))
                    .color(Color32::from_rgb(220, 80, 80)),
            );
        }
        RenderNode::Fragment { children } => render_children(ui, children, style),
        RenderNode::Element { tag, attrs, children } => {
            let mut style = style.for_tag(tag);
            if let Some(color) = attrs.get("style").and_then(|s| css_color(s)) {
                style.color = Some(color);
            }
            match tag.as_str() {
                "br" => {}
                "hr" => {
                    ui.separator();
                }
                "button" => {
                    let _ = ui.button(style.rich(&node.text_content()));
                }
                "img" => {
                    let alt = attrs.get("alt").map(String::as_str).unwrap_or("image");
                    ui.label(RichText::new(format!("[{}]", alt)).weak());
                }
                "ul" | "ol" => {
                    ui.vertical(|ui| {
                        for (i, child) in children.iter().enumerate() {
                            ui.horizontal_wrapped(|ui| {
                                let marker = if tag == "ol" {
                                    format!("{}.", i + 1)
                                } else {
                                    "•".to_string()
                                };
                                ui.label(marker);
                                render_styled(ui, child, style);
                            });
                        }
                    });
                }
                _ => render_children(ui, children, style),
            }
        }
    }
}

fn render_children(ui: &mut Ui, children: &[RenderNode], style: TextStyle) {
    if children.iter().all(is_inline) {
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            for child in children {
                render_styled(ui, child, style);
            }
        });
    } else {
        ui.vertical(|ui| {
            for child in children {
                render_styled(ui, child, style);
            }
        });
    }
}

fn is_inline(node: &RenderNode) -> bool {
    match node {
        RenderNode::Text { .. } | RenderNode::Empty => true,
        RenderNode::Element { tag, .. } => INLINE_TAGS.contains(&tag.as_str()),
        RenderNode::Fragment { children } => children.iter().all(is_inline),
        RenderNode::Error { .. } => false,
    }
}

/// `color: #rgb` / `#rrggbb` from an inline style string.
fn css_color(style: &str) -> Option<Color32> {
    style.split(';').find_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        if prop.trim() != "color" {
            return None;
        }
        let hex = value.trim().strip_prefix('#')?;
        match hex.len() {
            6 => {
                let n = u32::from_str_radix(hex, 16).ok()?;
                Some(Color32::from_rgb((n >> 16) as u8, (n >> 8) as u8, n as u8))
            }
            3 => {
                let n = u32::from_str_radix(hex, 16).ok()?;
                let expand = |v: u32| (v * 17) as u8;
                Some(Color32::from_rgb(
                    expand((n >> 8) & 0xf),
                    expand((n >> 4) & 0xf),
                    expand(n & 0xf),
                ))
            }
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_color_parsing() {
        assert_eq!(css_color("color: #ff0000"), Some(Color32::from_rgb(255, 0, 0)));
        assert_eq!(
            css_color("font-size: 12px; color:#0f0"),
            Some(Color32::from_rgb(0, 255, 0))
        );
        assert_eq!(css_color("background-color: #fff"), None);
        assert_eq!(css_color("color: red"), None);
    }

    #[test]
    fn inline_detection() {
        assert!(is_inline(&RenderNode::text("x")));
        assert!(is_inline(&RenderNode::element("strong", Default::default(), vec![])));
        assert!(!is_inline(&RenderNode::element("div", Default::default(), vec![])));
    }
}
