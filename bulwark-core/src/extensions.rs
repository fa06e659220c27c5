//! Typed side-channel storage attached to a request context.
//!
//! Modules use extensions to hand metadata back to the host without changing
//! the action they return. The XSS module in report mode stores its detection
//! record here.
//!
//! ```rust
//! use bulwark_core::Extensions;
//!
//! #[derive(Debug, PartialEq)]
//! struct Tag(&'static str);
//!
//! let mut ext = Extensions::new();
//! ext.insert(Tag("seen"));
//! assert_eq!(ext.get::<Tag>(), Some(&Tag("seen")));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Type-keyed extensions container.
#[derive(Clone, Default)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    #[inline]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a typed value, replacing any previous value of the same type.
    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Get a reference to a typed value.
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|arc| arc.downcast_ref::<T>())
    }

    /// Get an Arc to a typed value, for handing across tasks.
    #[inline]
    pub fn get_arc<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|arc| arc.clone().downcast::<T>().ok())
    }

    #[inline]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Remove a typed value. Returns true if it existed.
    #[inline]
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> bool {
        self.map.remove(&TypeId::of::<T>()).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("count", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(u32);

    #[test]
    fn test_insert_and_get() {
        let mut ext = Extensions::new();
        ext.insert(Marker(7));
        ext.insert("note".to_string());

        assert_eq!(ext.get::<Marker>(), Some(&Marker(7)));
        assert_eq!(ext.get::<String>(), Some(&"note".to_string()));
        assert_eq!(ext.get::<i32>(), None);
        assert_eq!(ext.len(), 2);
    }

    #[test]
    fn test_replace_same_type() {
        let mut ext = Extensions::new();
        ext.insert(Marker(1));
        ext.insert(Marker(2));
        assert_eq!(ext.get::<Marker>(), Some(&Marker(2)));
        assert_eq!(ext.len(), 1);
    }

    #[test]
    fn test_get_arc_and_remove() {
        let mut ext = Extensions::new();
        ext.insert(Marker(3));
        let arc = ext.get_arc::<Marker>().unwrap();
        assert_eq!(*arc, Marker(3));

        assert!(ext.remove::<Marker>());
        assert!(!ext.contains::<Marker>());
        assert!(!ext.remove::<Marker>());
        assert!(ext.is_empty());
    }
}
