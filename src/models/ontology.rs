//! Ontology model: the Biolink class and predicate hierarchies.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::AppError;

/// Which part of the model an element comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Entity classes (`classes:`), used for nodes.
    Class,
    /// Predicates (`slots:`), used for relationships.
    Slot,
}

/// A class or slot of the ontology, keyed by its normalized name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OntologyElement {
    /// Ontology name, e.g. `small molecule`.
    pub name: String,
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,
    /// True for mixin classes, which sit outside the is-a tree.
    pub mixin: bool,
    pub is_abstract: bool,
    pub mixins: Vec<String>,
}

impl OntologyElement {
    pub fn new(name: &str, kind: ElementKind) -> Self {
        Self {
            name: ontology_key(name),
            kind,
            is_a: None,
            mixin: false,
            is_abstract: false,
            mixins: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.is_a = Some(ontology_key(parent));
        self
    }

    /// Storage label for this element, e.g. `SmallMolecule`.
    pub fn label(&self) -> String {
        pascal_label(&self.name)
    }
}

/// The loaded class and slot hierarchies.
#[derive(Debug, Clone, Default)]
pub struct OntologyModel {
    classes: HashMap<String, OntologyElement>,
    slots: HashMap<String, OntologyElement>,
}

impl OntologyModel {
    pub fn new(elements: impl IntoIterator<Item = OntologyElement>) -> Self {
        let mut model = Self::default();
        for element in elements {
            let map = match element.kind {
                ElementKind::Class => &mut model.classes,
                ElementKind::Slot => &mut model.slots,
            };
            map.insert(element.name.clone(), element);
        }
        model
    }

    /// Looks up an element of the given kind by any spelling of its name.
    pub fn get(&self, kind: ElementKind, name: &str) -> Option<&OntologyElement> {
        let key = ontology_key(name);
        match kind {
            ElementKind::Class => self.classes.get(&key),
            ElementKind::Slot => self.slots.get(&key),
        }
    }

    /// Looks up a class first, then a slot.
    pub fn find(&self, name: &str) -> Option<&OntologyElement> {
        self.get(ElementKind::Class, name)
            .or_else(|| self.get(ElementKind::Slot, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Walks `is_a` links from `name` to the root.
    ///
    /// The first element is the named element itself. A parent missing from
    /// the model ends the chain. Revisiting an element is a cycle error.
    pub fn ancestors(
        &self,
        kind: ElementKind,
        name: &str,
    ) -> Result<Vec<&OntologyElement>, AppError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(kind, name);

        while let Some(element) = current {
            if !seen.insert(element.name.as_str()) {
                return Err(AppError::OntologyCycle(element.name.clone()));
            }
            chain.push(element);
            current = match element.is_a.as_deref() {
                Some(parent) => {
                    let next = self.get(kind, parent);
                    if next.is_none() {
                        tracing::warn!(
                            "Ontology element '{}' has unknown parent '{}'",
                            element.name,
                            parent
                        );
                    }
                    next
                }
                None => None,
            };
        }

        Ok(chain)
    }

    /// Returns true if `ancestor` appears on the is-a chain of `child`
    /// (an element counts as its own descendant).
    pub fn is_descendant(&self, kind: ElementKind, child: &str, ancestor: &str) -> bool {
        let ancestor = ontology_key(ancestor);
        self.ancestors(kind, child)
            .map(|chain| chain.iter().any(|e| e.name == ancestor))
            .unwrap_or(false)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

/// Normalizes any spelling of a name to the ontology's lowercase sentence form.
///
/// `SmallMolecule`, `small_molecule` and `small molecule` all become
/// `small molecule`; `Interacts_With` becomes `interacts with`; runs of
/// capitals are kept together (`RNAProduct` becomes `rna product`).
pub fn ontology_key(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders an ontology name as a PascalCase storage label.
pub fn pascal_label(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
