//! Content fingerprinting for messages.
//!
//! # Overview
//!
//! A [`Fingerprint`] is a 32-byte digest over the canonical encoding of a
//! message's identifying fields. Two messages are duplicates exactly when
//! their fingerprints are equal.
//!
//! # Canonical Encoding
//!
//! For each field, in key-policy order, the digest is fed:
//!
//! 1. the field's stable name (see [`FieldId::as_str`]),
//! 2. a `0x1F` unit separator,
//! 3. the length of the normalized value as a little-endian `u64`,
//! 4. the normalized value's UTF-8 bytes.
//!
//! Values are normalized by [`normalize_text`] first. The length prefix
//! makes the encoding unambiguous: `("ab", "c")` and `("a", "bc")` differ.
//!
//! # Example
//!
//! ```
//! use maildupe::scanner::{fingerprint, FieldValues};
//! use maildupe::store::FieldId;
//!
//! let mut a = FieldValues::new();
//! a.push(FieldId::Subject, "Hello\r\n");
//! let mut b = FieldValues::new();
//! b.push(FieldId::Subject, "Hello\n");
//!
//! assert_eq!(fingerprint(&a), fingerprint(&b));
//! assert_eq!(fingerprint(&a).to_hex().len(), 64);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::store::FieldId;

/// Raw 256-bit digest.
pub type Hash = [u8; 32];

/// Separator between a field name and its length prefix.
const FIELD_SEPARATOR: u8 = 0x1F;

/// Digest algorithm used for fingerprints.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (default).
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Blake3 => write!(f, "blake3"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Content fingerprint of a message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Hash);

impl Fingerprint {
    /// Wrap a raw digest.
    #[must_use]
    pub fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Lowercase hexadecimal form (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hash_to_hex(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Convert a digest to lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    use fmt::Write;
    hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Normalize text before hashing: CRLF and lone CR become LF, then NFC.
///
/// No case folding is applied.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let unified = if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_string()
    };
    unified.nfc().collect()
}

/// Ordered field values extracted from one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: Vec<(FieldId, String)>,
}

impl FieldValues {
    /// Create an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value. Order of insertion is the hashing order.
    pub fn push(&mut self, field: FieldId, value: impl Into<String>) {
        self.values.push((field, value.into()));
    }

    /// Value of a field, if present.
    #[must_use]
    pub fn get(&self, field: FieldId) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldId, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Computes fingerprints with a configured digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter {
    algorithm: HashAlgorithm,
}

impl Fingerprinter {
    /// Create a fingerprinter for `algorithm`.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured digest.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Fingerprint a set of field values.
    #[must_use]
    pub fn fingerprint(&self, fields: &FieldValues) -> Fingerprint {
        match self.algorithm {
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                encode(fields, |chunk| {
                    hasher.update(chunk);
                });
                Fingerprint(*hasher.finalize().as_bytes())
            }
            HashAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                encode(fields, |chunk| hasher.update(chunk));
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&hasher.finalize());
                Fingerprint(hash)
            }
        }
    }
}

/// Fingerprint with the default digest (BLAKE3).
#[must_use]
pub fn fingerprint(fields: &FieldValues) -> Fingerprint {
    Fingerprinter::default().fingerprint(fields)
}

fn encode(fields: &FieldValues, mut sink: impl FnMut(&[u8])) {
    for (field, value) in fields.iter() {
        let normalized = normalize_text(value);
        sink(field.as_str().as_bytes());
        sink(&[FIELD_SEPARATOR]);
        sink(&(normalized.len() as u64).to_le_bytes());
        sink(normalized.as_bytes());
    }
}
