use std::{
    collections::HashMap,
    hash::{BuildHasher, Hasher},
    sync::Arc,
};

use once_cell::sync::Lazy;
use serde_json::Value;

fn boolean(value: bool) -> Arc<Value> {
    static TRUE: Lazy<Arc<Value>> = Lazy::new(|| Arc::new(Value::Bool(true)));
    static FALSE: Lazy<Arc<Value>> = Lazy::new(|| Arc::new(Value::Bool(false)));
    if value {
        TRUE.clone()
    } else {
        FALSE.clone()
    }
}

fn null() -> Arc<Value> {
    static NULL: Lazy<Arc<Value>> = Lazy::new(|| Arc::new(Value::Null));
    NULL.clone()
}

type Map<K, V> = HashMap<K, V, LenHasher>;

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                                                                       ║
║                                Values                                 ║
║                                ¯¯¯¯¯¯                                 ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

/// A process-wide cache store of interned [`Value`]s, keyed by shape so
/// structurally identical scalars, arrays, and objects share one allocation.
///
/// This backs the `clear-all-caches()` contract of §5: every interned
/// [`Arc`] here is dropped when [`Values::clear`] is called.
#[derive(Clone, Debug, Default)]
pub struct Values {
    strings: Vec<Arc<Value>>,
    numbers: Vec<Arc<Value>>,
    objects: Map<usize, Vec<Arc<Value>>>,
    arrays: Map<usize, Vec<Arc<Value>>>,
}

impl Values {
    /// Returns an `Arc<Value>` representation of `value`, either by returning
    /// an existing cached instance or inserting and returning a new one.
    #[must_use]
    pub fn get_or_insert(&mut self, value: &Value) -> Arc<Value> {
        match value {
            Value::Number(_) => self.resolve_number(value),
            Value::String(_) => self.resolve_string(value),
            Value::Array(_) => self.resolve_array(value),
            Value::Object(_) => self.resolve_object(value),
            Value::Bool(value) => boolean(*value),
            Value::Null => null(),
        }
    }

    /// Drops every interned value, releasing their storage.
    pub fn clear(&mut self) {
        self.strings.clear();
        self.numbers.clear();
        self.objects.clear();
        self.arrays.clear();
    }

    fn resolve_object(&mut self, value: &Value) -> Arc<Value> {
        let object = value.as_object().unwrap();
        let len = object.len();
        let objects = self.objects.entry(len).or_default();
        if let Some(object) = objects.iter().find(|o| o.as_object().unwrap() == object) {
            return object.clone();
        }
        let value = Arc::new(value.clone());
        objects.push(value.clone());
        value
    }

    fn resolve_array(&mut self, value: &Value) -> Arc<Value> {
        let array = value.as_array().unwrap();
        let len = array.len();
        let arrays = self.arrays.entry(len).or_default();

        if let Some(object) = arrays.iter().find(|o| o.as_array().unwrap() == array) {
            return object.clone();
        }
        let value = Arc::new(value.clone());
        arrays.push(value.clone());
        value
    }

    fn resolve_string(&mut self, value: &Value) -> Arc<Value> {
        let string = value.as_str().unwrap();
        #[allow(clippy::map_unwrap_or)]
        self.strings
            .binary_search_by_key(&string, |v| v.as_str().unwrap())
            .map(|index| self.strings[index].clone())
            .unwrap_or_else(|index| {
                self.strings.insert(index, Arc::new(value.clone()));
                self.strings[index].clone()
            })
    }

    fn resolve_number(&mut self, value: &Value) -> Arc<Value> {
        let number = value.as_number().unwrap();
        let number = number.as_str();
        #[allow(clippy::map_unwrap_or)]
        self.numbers
            .binary_search_by_key(&number, |v| {
                let number = v.as_number().unwrap();
                number.as_str()
            })
            .map(|index| self.numbers[index].clone())
            .unwrap_or_else(|index| {
                self.numbers.insert(index, Arc::new(value.clone()));
                self.numbers[index].clone()
            })
    }
}

/*
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
╔═══════════════════════════════════════════════════════════════════════╗
║                                                                       ║
║                                Hasher                                 ║
║                                ¯¯¯¯¯¯                                 ║
╚═══════════════════════════════════════════════════════════════════════╝
░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░░
*/

#[derive(Clone, Default)]
struct LenHasher(u64);
impl Hasher for LenHasher {
    fn write(&mut self, _bytes: &[u8]) {
        unreachable!();
    }

    fn write_usize(&mut self, i: usize) {
        self.0 = i as u64;
    }

    #[inline]
    fn write_u64(&mut self, id: u64) {
        self.0 = id;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}
impl BuildHasher for LenHasher {
    type Hasher = Self;
    fn build_hasher(&self) -> Self::Hasher {
        Self(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interns_equal_values_to_the_same_allocation() {
        let mut values = Values::default();
        let a = values.get_or_insert(&json!({"type": "string"}));
        let b = values.get_or_insert(&json!({"type": "string"}));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn clear_drops_interned_storage() {
        let mut values = Values::default();
        values.get_or_insert(&json!("hello"));
        values.clear();
        assert_eq!(values.strings.len(), 0);
    }
}
