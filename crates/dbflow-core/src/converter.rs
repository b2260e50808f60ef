//! Value converters and the process-wide converter registry.
//!
//! A converter maps a field's logical type to one storage primitive and
//! back. The registry is keyed both by the model type (for condition values)
//! and by converter name (for generated adapters, which reference converters
//! by the name they were declared with).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::types::StoragePrimitive;
use crate::value::Value;

/// Bidirectional mapping between a logical type and a storage value.
pub trait TypeConverter: Send + Sync + 'static {
    /// Logical type held by the model field.
    type Model: Any + Send + Sync;

    /// Storage class the converted value uses.
    const STORAGE: StoragePrimitive;

    fn to_db(&self, model: &Self::Model) -> Value;

    fn from_db(&self, value: Value) -> Result<Self::Model>;

    /// Name adapters use to refer to this converter.
    fn name(&self) -> &'static str {
        short_type_name::<Self>()
    }
}

/// Last path segment of a type name.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}

/// Object-safe view of a [`TypeConverter`].
pub trait ErasedConverter: Send + Sync {
    fn name(&self) -> &'static str;
    fn model_type_id(&self) -> TypeId;
    fn model_type_name(&self) -> &'static str;
    fn storage(&self) -> StoragePrimitive;
    fn to_db_any(&self, value: &dyn Any) -> Result<Value>;
    fn from_db_any(&self, value: Value) -> Result<Box<dyn Any + Send + Sync>>;
}

impl<C: TypeConverter> ErasedConverter for C {
    fn name(&self) -> &'static str {
        TypeConverter::name(self)
    }

    fn model_type_id(&self) -> TypeId {
        TypeId::of::<C::Model>()
    }

    fn model_type_name(&self) -> &'static str {
        std::any::type_name::<C::Model>()
    }

    fn storage(&self) -> StoragePrimitive {
        C::STORAGE
    }

    fn to_db_any(&self, value: &dyn Any) -> Result<Value> {
        value
            .downcast_ref::<C::Model>()
            .map(|model| self.to_db(model))
            .ok_or_else(|| {
                Error::Conversion(format!(
                    "{} cannot convert a value that is not {}",
                    TypeConverter::name(self),
                    std::any::type_name::<C::Model>()
                ))
            })
    }

    fn from_db_any(&self, value: Value) -> Result<Box<dyn Any + Send + Sync>> {
        let model = self.from_db(value)?;
        Ok(Box::new(model))
    }
}

/// Stores `bool` as INTEGER 0/1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl TypeConverter for BooleanConverter {
    type Model = bool;
    const STORAGE: StoragePrimitive = StoragePrimitive::Integer;

    fn to_db(&self, model: &bool) -> Value {
        Value::Integer(i64::from(*model))
    }

    fn from_db(&self, value: Value) -> Result<bool> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            Value::Null => Ok(false),
            other => Err(Error::Conversion(format!(
                "BooleanConverter expects INTEGER, found {other:?}"
            ))),
        }
    }
}

/// Stores `char` as single-character TEXT.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharConverter;

impl TypeConverter for CharConverter {
    type Model = char;
    const STORAGE: StoragePrimitive = StoragePrimitive::Text;

    fn to_db(&self, model: &char) -> Value {
        Value::Text(model.to_string())
    }

    fn from_db(&self, value: Value) -> Result<char> {
        match value {
            Value::Text(s) => s
                .chars()
                .next()
                .ok_or_else(|| Error::Conversion("CharConverter read empty text".to_string())),
            other => Err(Error::Conversion(format!(
                "CharConverter expects TEXT, found {other:?}"
            ))),
        }
    }
}

/// Registry of converters, keyed by model type and by name.
#[derive(Default)]
pub struct ConverterRegistry {
    by_type: HashMap<TypeId, Arc<dyn ErasedConverter>>,
    by_name: HashMap<&'static str, Arc<dyn ErasedConverter>>,
}

impl ConverterRegistry {
    /// Registry pre-populated with the built-in converters.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        registry.register(BooleanConverter);
        registry.register(CharConverter);
        registry
    }

    /// Register a converter. A later registration for the same model type
    /// or name replaces the earlier one.
    pub fn register<C: TypeConverter>(&mut self, converter: C) {
        let erased: Arc<dyn ErasedConverter> = Arc::new(converter);
        tracing::debug!(
            converter = erased.name(),
            model = erased.model_type_name(),
            "Registering type converter"
        );
        self.by_type.insert(erased.model_type_id(), Arc::clone(&erased));
        self.by_name.insert(erased.name(), erased);
    }

    #[must_use]
    pub fn for_type_id(&self, id: TypeId) -> Option<Arc<dyn ErasedConverter>> {
        self.by_type.get(&id).cloned()
    }

    #[must_use]
    pub fn for_name(&self, name: &str) -> Option<Arc<dyn ErasedConverter>> {
        self.by_name.get(name).cloned()
    }

    /// Convert a typed value with the converter registered for its type.
    pub fn to_db<T: Any>(&self, value: &T) -> Result<Value> {
        self.for_type_id(TypeId::of::<T>())
            .ok_or_else(|| Error::MissingConverter(std::any::type_name::<T>().to_string()))?
            .to_db_any(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn global() -> &'static RwLock<ConverterRegistry> {
    static REGISTRY: OnceLock<RwLock<ConverterRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(ConverterRegistry::with_builtins()))
}

/// Register a converter in the process-wide registry.
pub fn register_converter<C: TypeConverter>(converter: C) {
    global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(converter);
}

/// Look up a converter by model type in the process-wide registry.
#[must_use]
pub fn converter_for_type(id: TypeId) -> Option<Arc<dyn ErasedConverter>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .for_type_id(id)
}

/// Look up a converter by name in the process-wide registry.
#[must_use]
pub fn converter_named(name: &str) -> Option<Arc<dyn ErasedConverter>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .for_name(name)
}

/// Convert a typed value with the process-wide registry.
pub fn convert_to_db<T: Any>(value: &T) -> Result<Value> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .to_db(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Celsius(f64);

    struct CelsiusConverter;

    impl TypeConverter for CelsiusConverter {
        type Model = Celsius;
        const STORAGE: StoragePrimitive = StoragePrimitive::Real;

        fn to_db(&self, model: &Celsius) -> Value {
            Value::Real(model.0)
        }

        fn from_db(&self, value: Value) -> Result<Celsius> {
            match value {
                Value::Real(v) => Ok(Celsius(v)),
                other => Err(Error::Conversion(format!("{other:?}"))),
            }
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ConverterRegistry::with_builtins();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.to_db(&true).unwrap(), Value::Integer(1));
        assert_eq!(registry.to_db(&'z').unwrap(), Value::Text("z".into()));
    }

    #[test]
    fn test_lookup_by_name_and_type() {
        let mut registry = ConverterRegistry::default();
        registry.register(CelsiusConverter);

        let by_name = registry.for_name("CelsiusConverter").unwrap();
        assert_eq!(by_name.storage(), StoragePrimitive::Real);
        assert_eq!(
            registry.to_db(&Celsius(21.5)).unwrap(),
            Value::Real(21.5)
        );

        let restored = by_name.from_db_any(Value::Real(3.0)).unwrap();
        assert_eq!(restored.downcast_ref::<Celsius>(), Some(&Celsius(3.0)));
    }

    #[test]
    fn test_missing_converter() {
        let registry = ConverterRegistry::default();
        let err = registry.to_db(&Celsius(1.0)).unwrap_err();
        assert!(matches!(err, Error::MissingConverter(_)));
    }

    #[test]
    fn test_wrong_type_through_erased() {
        let converter: Arc<dyn ErasedConverter> = Arc::new(CelsiusConverter);
        assert!(converter.to_db_any(&5_i32).is_err());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<CelsiusConverter>(), "CelsiusConverter");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
    }
}
