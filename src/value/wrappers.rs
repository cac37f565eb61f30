use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{typesystem::TypeRc, value::Value};

/// An instance of a user defined value type, compared by content
#[derive(Clone, Debug)]
pub struct StructValue {
    ty: TypeRc,
    fields: Vec<(String, Value)>,
}

impl StructValue {
    /// The zero value of `ty`: every field holds its own default
    #[must_use]
    pub fn zeroed(ty: &TypeRc) -> Self {
        let fields = ty
            .fields
            .iter()
            .map(|(_, field)| {
                let value = field
                    .field_type
                    .upgrade()
                    .map_or(Value::Null, |field_type| Value::default_for(&field_type));
                (field.name.clone(), value)
            })
            .collect();
        StructValue {
            ty: ty.clone(),
            fields,
        }
    }

    /// The value type
    #[must_use]
    pub fn type_def(&self) -> &TypeRc {
        &self.ty
    }

    /// Reads a field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Returns a copy with `name` set to `value`, unknown fields are ignored
    #[must_use]
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Some((_, slot)) = self.fields.iter_mut().find(|(field, _)| field == name) {
            *slot = value.into();
        }
        self
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty.token == other.ty.token && self.fields == other.fields
    }
}

type LazyFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// A `System.Lazy<T>`: the wrapped value is produced on first access
#[derive(Clone)]
pub struct LazyValue {
    ty: TypeRc,
    factory: LazyFactory,
    cell: Arc<OnceLock<Value>>,
}

impl LazyValue {
    /// Creates a lazy value of the constructed lazy type `ty`
    pub fn new<F>(ty: &TypeRc, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        LazyValue {
            ty: ty.clone(),
            factory: Arc::new(factory),
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// The `System.Lazy<T>` type
    #[must_use]
    pub fn type_def(&self) -> &TypeRc {
        &self.ty
    }

    /// Returns the wrapped value, producing it on the first call
    pub fn value(&self) -> &Value {
        self.cell.get_or_init(|| (self.factory)())
    }

    /// Returns true once the value has been produced
    #[must_use]
    pub fn is_value_created(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Reference identity, clones share the produced value
    #[must_use]
    pub fn same_as(&self, other: &LazyValue) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("type", &self.ty.fullname())
            .field("value", &self.cell.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::typesystem::TypeRegistry;

    #[test]
    fn test_lazy_value_is_created_once() {
        let registry = TypeRegistry::new();
        let lazy_type = registry.lazy_of(&registry.i4());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let lazy = LazyValue::new(&lazy_type, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Value::I4(9)
        });

        assert!(!lazy.is_value_created());
        let clone = lazy.clone();
        assert_eq!(lazy.value(), &Value::I4(9));
        assert_eq!(clone.value(), &Value::I4(9));
        assert!(clone.is_value_created());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lazy.same_as(&clone));
    }

    #[test]
    fn test_struct_equality() -> crate::Result<()> {
        let registry = TypeRegistry::new();
        let point = registry
            .value_type("Acme", "Point")
            .field("X", &registry.i4())
            .build()?;
        let origin = StructValue::zeroed(&point);
        let moved = origin.clone().with_field("X", 3);
        assert_ne!(origin, moved);
        assert_eq!(moved.field("X"), Some(&Value::I4(3)));
        assert_eq!(origin, StructValue::zeroed(&point));
        Ok(())
    }
}
