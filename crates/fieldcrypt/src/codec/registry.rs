//! Per-type encode/decode hooks, keyed by concrete Rust type.
//!
//! Hooks are registered on a [`RegistryBuilder`] and frozen into an immutable
//! [`Registry`] before any document is encoded, so lookups never race with
//! registration.

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
};

use thiserror::Error;

/// Errors produced by a hook while converting to or from canonical bytes.
#[derive(Debug, Error)]
pub enum HookError {
    /// The canonical bytes have the wrong length for the target type.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Length the type requires.
        expected: usize,
        /// Length that was found.
        actual: usize,
    },

    /// The canonical bytes are not valid UTF-8.
    #[error("canonical bytes are not valid UTF-8")]
    InvalidUtf8,

    /// A binary type's canonical text is not valid base64.
    #[error("canonical text is not valid base64")]
    InvalidBase64,

    /// The stored value is not a JSON string.
    #[error("stored value is not a string")]
    NotAString,

    /// The bytes parsed but do not form a valid value of the type.
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Errors produced while registering hooks.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A hook is already registered for this type.
    #[error("a hook is already registered for {type_name}")]
    DuplicateRegistration {
        /// Name of the offending type.
        type_name: &'static str,
    },
}

/// Encode/decode function pair bound to a single type `T`.
///
/// Hooks are plain function pointers: they may not capture state, which keeps
/// them free of side effects beyond what the codec does with their output.
pub struct Hook<T> {
    /// Serialize a value into its canonical bytes.
    pub encode: fn(&T) -> Result<Vec<u8>, HookError>,
    /// Parse canonical bytes back into a value.
    pub decode: fn(&[u8]) -> Result<T, HookError>,
    /// Whether a value is the type's zero value and should not be emitted.
    pub is_zero: fn(&T) -> bool,
}

impl<T> Hook<T> {
    /// A hook for a type with no zero value of its own.
    ///
    /// Absence is expressed at the field level with `Option<T>`.
    pub fn new(
        encode: fn(&T) -> Result<Vec<u8>, HookError>,
        decode: fn(&[u8]) -> Result<T, HookError>,
    ) -> Self {
        Self {
            encode,
            decode,
            is_zero: |_| false,
        }
    }

    /// Replace the zero-value predicate.
    pub fn with_zero(mut self, is_zero: fn(&T) -> bool) -> Self {
        self.is_zero = is_zero;
        self
    }
}

impl<T> Clone for Hook<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Hook<T> {}

impl<T> std::fmt::Debug for Hook<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("type", &type_name::<T>())
            .finish_non_exhaustive()
    }
}

/// A type that ships with its own default hook.
pub trait Protected: Sized + 'static {
    /// The hook registered by [`RegistryBuilder::register_protected`].
    fn hook() -> Hook<Self>;
}

struct Entry {
    type_name: &'static str,
    hook: Box<dyn Any + Send + Sync>,
}

/// Mutable registration phase of a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: HashMap<TypeId, Entry>,
}

impl RegistryBuilder {
    /// Start with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if `T` already has a hook.
    pub fn register<T: 'static>(&mut self, hook: Hook<T>) -> Result<&mut Self, RegistryError> {
        let type_name = type_name::<T>();
        if self.entries.contains_key(&TypeId::of::<T>()) {
            return Err(RegistryError::DuplicateRegistration { type_name });
        }
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                type_name,
                hook: Box::new(hook),
            },
        );
        Ok(self)
    }

    /// Register the default hook of a [`Protected`] type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRegistration`] if `T` already has a hook.
    pub fn register_protected<T: Protected>(&mut self) -> Result<&mut Self, RegistryError> {
        self.register(T::hook())
    }

    /// Freeze the table.
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|e| e.type_name))
            .finish()
    }
}

/// Immutable table of hooks, one per type.
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    /// Start a registration phase.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up the hook for `T`.
    pub fn get<T: 'static>(&self) -> Option<&Hook<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.hook.downcast_ref::<Hook<T>>())
    }

    /// Returns `true` if `T` has a hook.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|e| e.type_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pin(u32);

    fn pin_hook() -> Hook<Pin> {
        Hook::<Pin>::new(
            |pin| Ok(pin.0.to_be_bytes().to_vec()),
            |bytes| {
                let raw: [u8; 4] = bytes.try_into().map_err(|_| HookError::InvalidLength {
                    expected: 4,
                    actual: bytes.len(),
                })?;
                Ok(Pin(u32::from_be_bytes(raw)))
            },
        )
        .with_zero(|pin| pin.0 == 0)
    }

    #[test]
    fn register_and_get() {
        let mut builder = Registry::builder();
        builder.register(pin_hook()).unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Pin>());
        let hook = registry.get::<Pin>().unwrap();
        let bytes = (hook.encode)(&Pin(1234)).unwrap();
        assert_eq!((hook.decode)(&bytes).unwrap(), Pin(1234));
        assert!((hook.is_zero)(&Pin(0)));
        assert!(!(hook.is_zero)(&Pin(7)));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut builder = Registry::builder();
        builder.register(pin_hook()).unwrap();
        let err = builder.register(pin_hook()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
        assert!(err.to_string().contains("Pin"));
    }

    #[test]
    fn unknown_type_not_found() {
        let registry = Registry::builder().build();
        assert!(registry.is_empty());
        assert!(registry.get::<Pin>().is_none());
        assert!(!registry.contains::<String>());
    }

    #[test]
    fn distinct_types_coexist() {
        let mut builder = Registry::builder();
        builder
            .register(pin_hook())
            .unwrap()
            .register(Hook::<String>::new(
                |s| Ok(s.as_bytes().to_vec()),
                |b| String::from_utf8(b.to_vec()).map_err(|_| HookError::InvalidUtf8),
            ))
            .unwrap();
        let registry = builder.build();
        assert_eq!(registry.len(), 2);
        assert!(registry.get::<String>().is_some());
        assert!(format!("{registry:?}").contains("String"));
    }

    #[test]
    fn default_hook_rejects_nothing_as_zero() {
        let hook = Hook::<u8>::new(|v| Ok(vec![*v]), |b| Ok(b[0]));
        assert!(!(hook.is_zero)(&0));
    }

    #[test]
    fn decode_reports_bad_length() {
        let hook = pin_hook();
        assert!(matches!(
            (hook.decode)(&[1, 2]),
            Err(HookError::InvalidLength { expected: 4, actual: 2 })
        ));
    }
}
