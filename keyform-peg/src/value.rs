//! Values produced while matching
//!
//! Terminals produce [`Value::Text`]; repetitions produce lists; labeled
//! sequences produce a [`Record`]; left/right joins produce [`Fold`] trees.
//! Semantic actions are free to replace any value with [`Value::Node`].

#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    Nil,
    Text(String),
    List(Vec<Value<T>>),
    Record(Record<T>),
    Fold(Box<Fold<T>>),
    Node(T),
}

/// One step of a left or right fold: `left op right`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fold<T> {
    pub op: Value<T>,
    pub left: Value<T>,
    pub right: Value<T>,
}

/// Labeled values of a sequence, in match order.
///
/// A label used more than once accumulates its values into a list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    fields: Vec<(String, Value<T>)>,
}

impl<T> Default for Record<T> {
    fn default() -> Self {
        Record { fields: Vec::new() }
    }
}

impl<T> Record<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: Value<T>) {
        let label = label.into();
        match self.fields.iter_mut().find(|(name, _)| *name == label) {
            Some((_, existing)) => {
                let previous = std::mem::replace(existing, Value::Nil);
                let mut items = match previous {
                    Value::List(items) => items,
                    other => vec![other],
                };
                items.push(value);
                *existing = Value::List(items);
            }
            None => self.fields.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&Value<T>> {
        self.fields
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| value)
    }

    /// Remove a field, yielding `Nil` when the label never matched.
    pub fn take(&mut self, label: &str) -> Value<T> {
        match self.fields.iter().position(|(name, _)| name == label) {
            Some(index) => self.fields.remove(index).1,
            None => Value::Nil,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> Value<T> {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<T> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record<T>> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Items of a list; `Nil` is the empty list and any other value a singleton.
    pub fn into_items(self) -> Vec<Value<T>> {
        match self {
            Value::Nil => Vec::new(),
            Value::List(items) => items,
            other => vec![other],
        }
    }

    /// Build the value of a matched sequence from its unlabeled parts.
    pub(crate) fn from_parts(mut parts: Vec<Value<T>>) -> Self {
        match parts.len() {
            0 => Value::Nil,
            1 => parts.remove(0),
            _ => Value::List(parts),
        }
    }
}
