//! Widget registry: the authoritative, insertion-ordered set of live widgets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use voxgrid_synth::{CompiledWidget, PropertyBag, WidgetId};

/// Persistable description of a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDefinition {
    pub id: WidgetId,
    pub source_text: String,
    #[serde(default)]
    pub properties: PropertyBag,
}

impl WidgetDefinition {
    pub fn new(id: WidgetId, source_text: impl Into<String>, properties: PropertyBag) -> Self {
        Self {
            id,
            source_text: source_text.into(),
            properties,
        }
    }
}

/// Change notification consumed by the layout engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Inserted { id: WidgetId, replaced: bool },
    Removed { id: WidgetId },
    PropertiesChanged { id: WidgetId },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("definition id `{definition}` does not match compiled widget id `{compiled}`")]
    IdMismatch {
        definition: WidgetId,
        compiled: WidgetId,
    },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

struct Entry {
    definition: WidgetDefinition,
    compiled: CompiledWidget,
}

/// Owns every definition/compiled pair, keyed by id in insertion order.
#[derive(Default)]
pub struct WidgetRegistry {
    entries: IndexMap<WidgetId, Entry>,
    events: Vec<RegistryEvent>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A known id keeps its position in the order.
    pub fn insert(
        &mut self,
        definition: WidgetDefinition,
        compiled: CompiledWidget,
    ) -> RegistryResult<()> {
        if &definition.id != compiled.id() {
            return Err(RegistryError::IdMismatch {
                definition: definition.id,
                compiled: compiled.id().clone(),
            });
        }
        let id = definition.id.clone();
        let replaced = self
            .entries
            .insert(
                id.clone(),
                Entry {
                    definition,
                    compiled,
                },
            )
            .is_some();
        info!(
            target: "voxgrid::registry",
            widget_id = %id,
            replaced,
            total = self.entries.len(),
            "widget registered"
        );
        self.events.push(RegistryEvent::Inserted { id, replaced });
        Ok(())
    }

    /// Remove by id. Returns false when absent.
    pub fn remove(&mut self, id: &WidgetId) -> bool {
        if self.entries.shift_remove(id).is_none() {
            return false;
        }
        info!(
            target: "voxgrid::registry",
            widget_id = %id,
            total = self.entries.len(),
            "widget removed"
        );
        self.events.push(RegistryEvent::Removed { id: id.clone() });
        true
    }

    pub fn update_properties(&mut self, id: &WidgetId, properties: PropertyBag) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        entry.definition.properties = properties;
        self.events
            .push(RegistryEvent::PropertiesChanged { id: id.clone() });
        true
    }

    /// Live widgets in insertion order.
    pub fn list(&self) -> impl Iterator<Item = (&WidgetId, &CompiledWidget, &PropertyBag)> + '_ {
        self.entries
            .iter()
            .map(|(id, e)| (id, &e.compiled, &e.definition.properties))
    }

    /// Snapshot of the definitions, ready for persistence.
    pub fn definitions(&self) -> Vec<WidgetDefinition> {
        self.entries
            .values()
            .map(|e| e.definition.clone())
            .collect()
    }

    pub fn get(&self, id: &WidgetId) -> Option<(&CompiledWidget, &PropertyBag)> {
        self.entries
            .get(id)
            .map(|e| (&e.compiled, &e.definition.properties))
    }

    pub fn definition(&self, id: &WidgetId) -> Option<&WidgetDefinition> {
        self.entries.get(id).map(|e| &e.definition)
    }

    /// Position in insertion order.
    pub fn index_of(&self, id: &WidgetId) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    pub fn contains(&self, id: &WidgetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take pending change events, oldest first.
    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxgrid_synth::SnippetCompiler;

    fn widget(id: &str, text: &str) -> (WidgetDefinition, CompiledWidget) {
        let source = format!("const TestWidget = () => '{}'", text);
        let compiled = SnippetCompiler::default()
            .compile_with_id(WidgetId::from(id), &source)
            .unwrap();
        (
            WidgetDefinition::new(WidgetId::from(id), source, PropertyBag::new()),
            compiled,
        )
    }

    #[test]
    fn insert_list_and_remove_twice() {
        let mut reg = WidgetRegistry::new();
        let (def, compiled) = widget("w1", "Foo");
        reg.insert(def, compiled).unwrap();
        let ids: Vec<_> = reg.list().map(|(id, _, _)| id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["w1"]);

        assert!(reg.remove(&WidgetId::from("w1")));
        assert!(!reg.remove(&WidgetId::from("w1")));
        assert!(reg.is_empty());
        assert_eq!(
            reg.drain_events(),
            vec![
                RegistryEvent::Inserted {
                    id: "w1".into(),
                    replaced: false
                },
                RegistryEvent::Removed { id: "w1".into() },
            ]
        );
    }

    #[test]
    fn duplicate_id_replaces_in_place() {
        let mut reg = WidgetRegistry::new();
        for (id, text) in [("a", "1"), ("b", "2"), ("c", "3")] {
            let (def, compiled) = widget(id, text);
            reg.insert(def, compiled).unwrap();
        }
        let (def, compiled) = widget("b", "two");
        reg.insert(def, compiled).unwrap();

        assert_eq!(reg.len(), 3);
        assert_eq!(reg.index_of(&"b".into()), Some(1));
        assert!(reg.definition(&"b".into()).unwrap().source_text.contains("two"));
        assert!(matches!(
            reg.drain_events().last(),
            Some(RegistryEvent::Inserted { replaced: true, .. })
        ));
    }

    #[test]
    fn removal_preserves_order_of_rest() {
        let mut reg = WidgetRegistry::new();
        for id in ["a", "b", "c"] {
            let (def, compiled) = widget(id, id);
            reg.insert(def, compiled).unwrap();
        }
        reg.remove(&"a".into());
        let ids: Vec<_> = reg.definitions().into_iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn mismatched_ids_rejected() {
        let mut reg = WidgetRegistry::new();
        let (_, compiled) = widget("x", "x");
        let def = WidgetDefinition::new("y".into(), "src", PropertyBag::new());
        assert!(matches!(
            reg.insert(def, compiled),
            Err(RegistryError::IdMismatch { .. })
        ));
        assert!(reg.is_empty());
        assert!(reg.drain_events().is_empty());
    }

    #[test]
    fn update_properties_emits_event() {
        let mut reg = WidgetRegistry::new();
        let (def, compiled) = widget("w", "w");
        reg.insert(def, compiled).unwrap();
        reg.drain_events();

        let mut props = PropertyBag::new();
        props.insert("city".into(), "Oslo".into());
        assert!(reg.update_properties(&"w".into(), props));
        assert!(!reg.update_properties(&"missing".into(), PropertyBag::new()));
        assert_eq!(reg.get(&"w".into()).unwrap().1["city"], "Oslo");
        assert_eq!(
            reg.drain_events(),
            vec![RegistryEvent::PropertiesChanged { id: "w".into() }]
        );
    }
}
