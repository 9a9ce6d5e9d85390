//! [`DocumentCodec`]: serde serialization with protected fields routed through
//! their registered hooks and the configured cipher.
//!
//! A document serializes its ordinary fields with serde as usual. Protected
//! fields are marked `#[serde(skip)]` and handed to the codec explicitly from
//! [`Document::encode_protected`] / [`Document::decode_protected`]; the codec
//! looks up the hook for the field's type, applies the zero-value rule, and
//! seals or opens the canonical bytes.

use std::sync::Arc;

use common::envelope::is_encrypted;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use super::registry::{Hook, HookError, Registry};
use crate::crypto::{CipherError, FieldCipher, Opened};

/// Errors produced while encoding or decoding a document.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The cipher rejected a value. Authentication failures surface unchanged.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// A protected field's canonical bytes could not be parsed back into its type.
    #[error("failed to deserialize protected field {field}: {source}")]
    Deserialization {
        /// Dot-notation path of the field.
        field: String,
        /// What the hook rejected.
        source: HookError,
    },

    /// A protected field's hook failed to produce canonical bytes.
    #[error("failed to serialize protected field {field}: {source}")]
    Serialization {
        /// Dot-notation path of the field.
        field: String,
        /// What the hook reported.
        source: HookError,
    },

    /// A protected field has a type with no registered hook.
    #[error("no hook registered for {type_name}")]
    UnregisteredType {
        /// Name of the unregistered type.
        type_name: &'static str,
    },

    /// A stored value is encrypted but the codec has no cipher.
    #[error("protected field {field} is encrypted but no cipher is configured")]
    CipherRequired {
        /// Dot-notation path of the field.
        field: String,
    },

    /// The document, or a nested path holding protected fields, is not a JSON object.
    #[error("expected a JSON object at {path:?}")]
    NotAnObject {
        /// Dot-notation path; empty for the document root.
        path: String,
    },

    /// The generic serializer failed.
    #[error("document serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether the codec encrypts protected fields.
#[derive(Clone)]
pub enum CipherMode {
    /// Protected fields are written as their unencrypted canonical text and
    /// encrypted values cannot be read.
    Disabled,
    /// Protected fields are sealed with the held cipher.
    Enabled(Arc<dyn FieldCipher>),
}

impl CipherMode {
    /// Enable encryption with `cipher`.
    pub fn enabled(cipher: impl FieldCipher + 'static) -> Self {
        Self::Enabled(Arc::new(cipher))
    }

    /// Returns `true` if a cipher is held.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }
}

impl std::fmt::Debug for CipherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Enabled(_) => f.write_str("Enabled"),
        }
    }
}

/// What happened to a single protected field during encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Zero value: nothing was emitted.
    Skipped,
    /// Emitted without encryption because the codec has no cipher.
    Plaintext,
    /// Emitted as an encrypted envelope.
    Encrypted,
}

/// Per-field outcome recorded while encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReport {
    /// Dot-notation path of the field.
    pub path: String,
    /// What was emitted.
    pub disposition: Disposition,
}

/// An encoded document together with the outcome of every protected field.
#[derive(Debug, Clone)]
pub struct Encoded {
    /// The serialized document.
    pub value: Value,
    /// One entry per protected field, in encoding order.
    pub fields: Vec<FieldReport>,
}

impl Encoded {
    /// Returns `true` if no protected field was written unencrypted.
    pub fn is_fully_encrypted(&self) -> bool {
        self.fields
            .iter()
            .all(|f| f.disposition != Disposition::Plaintext)
    }
}

/// A serde document with protected fields.
pub trait Document: Serialize + DeserializeOwned {
    /// Hand every protected field to `fields`.
    fn encode_protected(&self, fields: &mut FieldEncoder<'_>) -> Result<(), CodecError>;

    /// Read every protected field back from `fields`.
    fn decode_protected(&mut self, fields: &FieldDecoder<'_>) -> Result<(), CodecError>;
}

/// Serializer for documents with protected fields.
///
/// Cheap to clone; the hook table is shared and immutable.
#[derive(Clone, Debug)]
pub struct DocumentCodec {
    registry: Arc<Registry>,
    mode: CipherMode,
}

impl DocumentCodec {
    /// Create a codec over a finished registry.
    pub fn new(registry: Registry, mode: CipherMode) -> Self {
        Self {
            registry: Arc::new(registry),
            mode,
        }
    }

    /// The configured cipher mode.
    pub fn mode(&self) -> &CipherMode {
        &self.mode
    }

    /// The hook table.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Serialize `doc` to JSON bytes.
    ///
    /// # Errors
    ///
    /// See [`DocumentCodec::encode_document`].
    pub fn encode<D: Document>(&self, doc: &D) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&self.encode_document(doc)?.value)?)
    }

    /// Serialize `doc` to a JSON value.
    ///
    /// # Errors
    ///
    /// See [`DocumentCodec::encode_document`].
    pub fn encode_value<D: Document>(&self, doc: &D) -> Result<Value, CodecError> {
        Ok(self.encode_document(doc)?.value)
    }

    /// Serialize `doc` and report what happened to each protected field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAnObject`] if `doc` does not serialize to an
    /// object, [`CodecError::UnregisteredType`] for a protected field without a
    /// hook, and propagates hook and cipher failures.
    pub fn encode_document<D: Document>(&self, doc: &D) -> Result<Encoded, CodecError> {
        let mut value = serde_json::to_value(doc)?;
        let Value::Object(map) = &mut value else {
            return Err(CodecError::NotAnObject {
                path: String::new(),
            });
        };

        let mut report = Vec::new();
        let mut fields = FieldEncoder {
            codec: self,
            map,
            prefix: String::new(),
            report: &mut report,
        };
        doc.encode_protected(&mut fields)?;

        Ok(Encoded {
            value,
            fields: report,
        })
    }

    /// Deserialize a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// See [`DocumentCodec::decode_value`].
    pub fn decode<D: Document>(&self, bytes: &[u8]) -> Result<D, CodecError> {
        self.decode_value(serde_json::from_slice(bytes)?)
    }

    /// Deserialize a document from a JSON value.
    ///
    /// The whole document fails if any protected field fails to open or parse.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Cipher`] unchanged when a value fails to
    /// authenticate, [`CodecError::Deserialization`] when decrypted bytes do
    /// not parse, and [`CodecError::CipherRequired`] for encrypted values read
    /// without a cipher.
    pub fn decode_value<D: Document>(&self, value: Value) -> Result<D, CodecError> {
        let Value::Object(map) = &value else {
            return Err(CodecError::NotAnObject {
                path: String::new(),
            });
        };

        let mut doc = D::deserialize(&value)?;
        doc.decode_protected(&FieldDecoder {
            codec: self,
            map,
            prefix: String::new(),
        })?;
        Ok(doc)
    }

    fn hook<T: 'static>(&self) -> Result<Hook<T>, CodecError> {
        self.registry
            .get::<T>()
            .copied()
            .ok_or(CodecError::UnregisteredType {
                type_name: std::any::type_name::<T>(),
            })
    }

    fn seal_field(
        &self,
        path: &str,
        canonical: &[u8],
    ) -> Result<(String, Disposition), CodecError> {
        match &self.mode {
            CipherMode::Enabled(cipher) => Ok((cipher.encrypt(canonical)?, Disposition::Encrypted)),
            CipherMode::Disabled => std::str::from_utf8(canonical)
                .map(|text| (text.to_owned(), Disposition::Plaintext))
                .map_err(|_| CodecError::Serialization {
                    field: path.to_owned(),
                    source: HookError::InvalidUtf8,
                }),
        }
    }

    fn open_field(&self, path: &str, raw: &str) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        match &self.mode {
            CipherMode::Enabled(cipher) => match cipher.open(raw)? {
                Opened::Decrypted(plaintext) => Ok(Zeroizing::new(plaintext)),
                Opened::PassThrough => {
                    debug!(field = %path, "protected field stored unencrypted");
                    Ok(Zeroizing::new(raw.as_bytes().to_vec()))
                }
            },
            CipherMode::Disabled if is_encrypted(raw) => Err(CodecError::CipherRequired {
                field: path.to_owned(),
            }),
            CipherMode::Disabled => Ok(Zeroizing::new(raw.as_bytes().to_vec())),
        }
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Write side of a document's protected fields.
pub struct FieldEncoder<'a> {
    codec: &'a DocumentCodec,
    map: &'a mut Map<String, Value>,
    prefix: String,
    report: &'a mut Vec<FieldReport>,
}

impl FieldEncoder<'_> {
    /// Emit a protected field, skipping it if it holds the type's zero value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnregisteredType`] if `T` has no hook and
    /// propagates hook and cipher failures.
    pub fn field<T: 'static>(&mut self, name: &str, value: &T) -> Result<Disposition, CodecError> {
        let hook = self.codec.hook::<T>()?;
        if (hook.is_zero)(value) {
            return Ok(self.skip(name));
        }

        let path = join_path(&self.prefix, name);
        let canonical = Zeroizing::new((hook.encode)(value).map_err(|source| {
            CodecError::Serialization {
                field: path.clone(),
                source,
            }
        })?);
        let (encoded, disposition) = self.codec.seal_field(&path, &canonical)?;
        self.map.insert(name.to_owned(), Value::String(encoded));

        debug!(field = %path, ?disposition, "protected field encoded");
        self.report.push(FieldReport { path, disposition });
        Ok(disposition)
    }

    /// Emit an optional protected field; `None` is the zero value.
    ///
    /// # Errors
    ///
    /// As [`FieldEncoder::field`]. The type must be registered even when `None`.
    pub fn optional<T: 'static>(
        &mut self,
        name: &str,
        value: &Option<T>,
    ) -> Result<Disposition, CodecError> {
        match value {
            Some(value) => self.field(name, value),
            None => {
                self.codec.hook::<T>()?;
                Ok(self.skip(name))
            }
        }
    }

    /// Encode protected fields of the nested object at `name`.
    ///
    /// The object is created if the serializer did not emit one.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAnObject`] if `name` holds a non-object value,
    /// and propagates whatever `f` returns.
    pub fn nested<F>(&mut self, name: &str, f: F) -> Result<(), CodecError>
    where
        F: FnOnce(&mut FieldEncoder<'_>) -> Result<(), CodecError>,
    {
        let path = join_path(&self.prefix, name);
        let child = self
            .map
            .entry(name.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(child) = child else {
            return Err(CodecError::NotAnObject { path });
        };

        f(&mut FieldEncoder {
            codec: self.codec,
            map: child,
            prefix: path,
            report: &mut *self.report,
        })
    }

    fn skip(&mut self, name: &str) -> Disposition {
        let path = join_path(&self.prefix, name);
        self.map.remove(name);
        debug!(field = %path, "protected field holds zero value; skipped");
        self.report.push(FieldReport {
            path,
            disposition: Disposition::Skipped,
        });
        Disposition::Skipped
    }
}

/// Read side of a document's protected fields.
pub struct FieldDecoder<'a> {
    codec: &'a DocumentCodec,
    map: &'a Map<String, Value>,
    prefix: String,
}

impl FieldDecoder<'_> {
    /// Read a protected field. Absent, `null` and empty values yield `None`,
    /// leaving the target at its zero value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Cipher`] unchanged when the value fails to
    /// authenticate, and [`CodecError::Deserialization`] if it is not a string
    /// or its canonical bytes do not parse.
    pub fn field<T: 'static>(&self, name: &str) -> Result<Option<T>, CodecError> {
        let hook = self.codec.hook::<T>()?;
        let path = join_path(&self.prefix, name);

        let raw = match self.map.get(name) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) if s.is_empty() => return Ok(None),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(CodecError::Deserialization {
                    field: path,
                    source: HookError::NotAString,
                })
            }
        };

        let canonical = self.codec.open_field(&path, raw)?;
        (hook.decode)(&canonical)
            .map(Some)
            .map_err(|source| CodecError::Deserialization {
                field: path,
                source,
            })
    }

    /// Decode protected fields of the nested object at `name`.
    ///
    /// `f` is not called when the object is absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAnObject`] if `name` holds a non-object value,
    /// and propagates whatever `f` returns.
    pub fn nested<F>(&self, name: &str, f: F) -> Result<(), CodecError>
    where
        F: FnOnce(&FieldDecoder<'_>) -> Result<(), CodecError>,
    {
        let path = join_path(&self.prefix, name);
        match self.map.get(name) {
            None | Some(Value::Null) => Ok(()),
            Some(Value::Object(child)) => f(&FieldDecoder {
                codec: self.codec,
                map: child,
                prefix: path,
            }),
            Some(_) => Err(CodecError::NotAnObject { path }),
        }
    }
}
