//! Results produced by content actions.
//!
//! A [`ProcessResult`] holds one [`ContentResult`] per executed action list, each
//! holding the [`ActionResult`]s of its non-hidden actions. Include actions nest
//! the included activity's whole process result under their action id.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Data(Value),
    Nested(ProcessResult),
}

impl ResultValue {
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&ProcessResult> {
        match self {
            Self::Nested(result) => Some(result),
            Self::Data(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Data(value) => value.clone(),
            Self::Nested(result) => result.to_value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    action_id: Option<String>,
    value: ResultValue,
}

impl ActionResult {
    pub fn new(action_id: Option<&str>, value: ResultValue) -> Self {
        Self {
            action_id: action_id.map(str::to_string),
            value,
        }
    }

    pub fn action_id(&self) -> Option<&str> {
        self.action_id.as_deref()
    }

    pub fn value(&self) -> &ResultValue {
        &self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResult {
    name: Option<String>,
    results: Vec<ActionResult>,
}

impl ContentResult {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            results: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Adds a result; a result with the same action id replaces the earlier one.
    pub fn push(&mut self, result: ActionResult) {
        if let Some(id) = result.action_id.as_deref() {
            if let Some(existing) = self
                .results
                .iter_mut()
                .find(|existing| existing.action_id.as_deref() == Some(id))
            {
                *existing = result;
                return;
            }
        }
        self.results.push(result);
    }

    pub fn results(&self) -> &[ActionResult] {
        &self.results
    }

    pub fn get(&self, action_id: &str) -> Option<&ResultValue> {
        self.results
            .iter()
            .find(|result| result.action_id.as_deref() == Some(action_id))
            .map(|result| &result.value)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Named results keyed by action id; a lone unnamed result stands for the whole content.
    pub fn to_value(&self) -> Value {
        if let [only] = self.results.as_slice() {
            if only.action_id.is_none() {
                return only.value.to_value();
            }
        }
        let map: Map<String, Value> = self
            .results
            .iter()
            .filter_map(|result| {
                result
                    .action_id
                    .as_ref()
                    .map(|id| (id.clone(), result.value.to_value()))
            })
            .collect();
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessResult {
    name: Option<String>,
    contents: Vec<ContentResult>,
}

impl ProcessResult {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            contents: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn contents(&self) -> &[ContentResult] {
        &self.contents
    }

    pub fn content(&self, name: &str) -> Option<&ContentResult> {
        self.contents
            .iter()
            .find(|content| content.name.as_deref() == Some(name))
    }

    /// Index of the content named `name`, created if absent. Unnamed contents are always new.
    pub fn open_content(&mut self, name: Option<&str>) -> usize {
        if let Some(name) = name {
            if let Some(index) = self
                .contents
                .iter()
                .position(|content| content.name.as_deref() == Some(name))
            {
                return index;
            }
        }
        self.contents.push(ContentResult::new(name));
        self.contents.len() - 1
    }

    pub fn push(&mut self, content_index: usize, result: ActionResult) {
        if let Some(content) = self.contents.get_mut(content_index) {
            content.push(result);
        }
    }

    /// The most recent result recorded under `action_id`.
    pub fn find(&self, action_id: &str) -> Option<&ResultValue> {
        self.contents
            .iter()
            .rev()
            .find_map(|content| content.get(action_id))
    }

    pub fn is_empty(&self) -> bool {
        self.contents.iter().all(ContentResult::is_empty)
    }

    /// Contents keyed by name with unnamed contents merged at the top level.
    pub fn to_value(&self) -> Value {
        if let [only] = self.contents.as_slice() {
            if only.name.is_none() {
                return only.to_value();
            }
        }
        let mut map = Map::new();
        for content in &self.contents {
            match (&content.name, content.to_value()) {
                (Some(name), value) => {
                    map.insert(name.clone(), value);
                }
                (None, Value::Object(entries)) => map.extend(entries),
                (None, _) => {}
            }
        }
        Value::Object(map)
    }
}

impl Serialize for ProcessResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// A process result shared by an activity and every translet it forwards to.
#[derive(Debug, Clone, Default)]
pub struct SharedProcessResult(Rc<RefCell<ProcessResult>>);

impl SharedProcessResult {
    pub fn new(name: Option<&str>) -> Self {
        Self(Rc::new(RefCell::new(ProcessResult::new(name))))
    }

    pub fn borrow(&self) -> Ref<'_, ProcessResult> {
        self.0.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, ProcessResult> {
        self.0.borrow_mut()
    }

    pub fn snapshot(&self) -> ProcessResult {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_action_id_replaces_result() {
        let mut content = ContentResult::new(None);
        content.push(ActionResult::new(Some("total"), ResultValue::Data(json!(1))));
        content.push(ActionResult::new(Some("total"), ResultValue::Data(json!(2))));
        assert_eq!(content.len(), 1);
        assert_eq!(content.get("total"), Some(&ResultValue::Data(json!(2))));
    }

    #[test]
    fn test_to_value_nests_named_contents_and_includes() {
        let mut inner = ProcessResult::new(None);
        let index = inner.open_content(None);
        inner.push(index, ActionResult::new(Some("answer"), ResultValue::Data(json!(42))));

        let mut outer = ProcessResult::new(None);
        let first = outer.open_content(Some("main"));
        outer.push(first, ActionResult::new(Some("greeting"), ResultValue::Data(json!("hi"))));
        outer.push(first, ActionResult::new(Some("sub"), ResultValue::Nested(inner)));
        let second = outer.open_content(None);
        outer.push(second, ActionResult::new(Some("flag"), ResultValue::Data(json!(true))));

        assert_eq!(
            outer.to_value(),
            json!({"main": {"greeting": "hi", "sub": {"answer": 42}}, "flag": true})
        );
        assert_eq!(outer.open_content(Some("main")), first);
    }

    #[test]
    fn test_find_prefers_latest_content() {
        let mut result = ProcessResult::new(None);
        let a = result.open_content(None);
        result.push(a, ActionResult::new(Some("x"), ResultValue::Data(json!("old"))));
        let b = result.open_content(None);
        result.push(b, ActionResult::new(Some("x"), ResultValue::Data(json!("new"))));

        assert_eq!(result.find("x"), Some(&ResultValue::Data(json!("new"))));
        assert!(result.find("y").is_none());
    }
}
