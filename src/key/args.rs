//! Call Arguments Module
//!
//! Raw positional and keyword arguments of one invocation.

use crate::codec::Value;

// == Call Args ==
/// Positional and keyword arguments passed to a wrapped callable.
///
/// Keyword names are unique: passing a name twice replaces the earlier
/// value. Keyword order is kept for the callable but never affects keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds arguments from positional values only.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keyword: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.keyword.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.keyword.push((name, value)),
        }
        self
    }

    /// Returns a copy with `receiver` inserted as the first positional argument.
    pub fn with_receiver(&self, receiver: Value) -> Self {
        let mut positional = Vec::with_capacity(self.positional.len() + 1);
        positional.push(receiver);
        positional.extend(self.positional.iter().cloned());
        Self {
            positional,
            keyword: self.keyword.clone(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Looks up a keyword argument by name.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keyword
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments in the order they were passed.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keyword.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let args = CallArgs::new().arg(1).arg("two").kwarg("flag", true);
        assert_eq!(args.get(0), Some(&Value::Int(1)));
        assert_eq!(args.get(1), Some(&Value::from("two")));
        assert_eq!(args.keyword("flag"), Some(&Value::Bool(true)));
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_kwarg_replaces_duplicate_name() {
        let args = CallArgs::new().kwarg("a", 1).kwarg("b", 2).kwarg("a", 3);
        assert_eq!(args.keyword("a"), Some(&Value::Int(3)));
        let names: Vec<&str> = args.keywords().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_with_receiver_prepends() {
        let args = CallArgs::positional([5, 6]).kwarg("k", 1);
        let bound = args.with_receiver(Value::from("self"));
        assert_eq!(bound.positional_values().len(), 3);
        assert_eq!(bound.get(0), Some(&Value::from("self")));
        assert_eq!(bound.get(1), Some(&Value::Int(5)));
        assert_eq!(bound.keyword("k"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_empty() {
        assert!(CallArgs::new().is_empty());
        assert!(!CallArgs::positional([0]).is_empty());
    }
}
