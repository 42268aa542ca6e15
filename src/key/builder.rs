//! Key Builder Module
//!
//! Derives deterministic cache keys from a prefix, a call role and the
//! call arguments.
//!
//! Key layout: `prefix:positional:keyword`, where the positional part is
//! `repr,repr,...` in call order and the keyword part is
//! `name=repr,name=repr,...` sorted by name. Every component is escaped
//! so no separator can occur inside it. An argument portion longer than
//! the hash threshold is replaced by `#<sha256 hex>`.

use std::borrow::Cow;
use std::fmt;

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::codec::Serializer;
use crate::error::Result;
use crate::key::args::CallArgs;

// == Separators ==
pub const KEY_SEPARATOR: char = ':';
pub const ARG_SEPARATOR: char = ',';
pub const KWARG_ASSIGN: char = '=';
/// Marks a hashed argument portion; never the first char of a JSON repr.
pub const HASH_MARKER: char = '#';

/// Argument portions longer than this many bytes are hashed.
pub const DEFAULT_HASH_THRESHOLD: usize = 200;

/// Characters percent-escaped inside every key component: the separators,
/// the escape char itself, and Redis glob metacharacters.
const RESERVED: &[char] = &['%', ':', ',', '=', '*', '?', '[', ']', '\\'];

// == Role ==
/// How a wrapped callable's arguments participate in its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// Every argument participates
    #[default]
    Plain,
    /// Request-handler style callable; arguments used as-is
    ResponseHandler,
    /// Method; the first positional argument is the receiver and is excluded
    BoundMethod,
}

impl Role {
    /// Maps decorator flags to a role. `is_class_method` wins when both are set.
    pub fn from_flags(is_response_method: bool, is_class_method: bool) -> Self {
        if is_class_method {
            Role::BoundMethod
        } else if is_response_method {
            Role::ResponseHandler
        } else {
            Role::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Plain => "plain",
            Role::ResponseHandler => "response-handler",
            Role::BoundMethod => "bound-method",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Cache Key ==
/// A fully derived store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Call Signature ==
/// Escaped argument representations of one call after role filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSignature {
    /// Positional representations in call order
    pub positional: Vec<String>,
    /// `(name, representation)` pairs sorted by name
    pub keyword: Vec<(String, String)>,
}

impl CallSignature {
    /// Joins the signature into the argument portion of a key.
    pub fn joined(&self) -> String {
        let separator = ARG_SEPARATOR.to_string();
        let positional = self.positional.join(separator.as_str());
        let keyword = self
            .keyword
            .iter()
            .map(|(name, repr)| format!("{}{}{}", name, KWARG_ASSIGN, repr))
            .collect::<Vec<_>>()
            .join(separator.as_str());
        format!("{}{}{}", positional, KEY_SEPARATOR, keyword)
    }
}

// == Key Builder ==
/// Builds keys for one prefix and role.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
    escaped_prefix: String,
    role: Role,
    hash_threshold: usize,
    serializer: Serializer,
}

impl KeyBuilder {
    pub fn new(prefix: impl Into<String>, role: Role) -> Self {
        let prefix = prefix.into();
        let escaped_prefix = escape_component(&prefix).into_owned();
        Self {
            prefix,
            escaped_prefix,
            role,
            hash_threshold: DEFAULT_HASH_THRESHOLD,
            serializer: Serializer::new(),
        }
    }

    /// Sets the argument-portion length above which it is hashed.
    pub fn with_hash_threshold(mut self, threshold: usize) -> Self {
        self.hash_threshold = threshold;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Glob pattern matching every key this builder can produce.
    pub fn prefix_pattern(&self) -> String {
        format!("{}{}*", self.escaped_prefix, KEY_SEPARATOR)
    }

    // == Signature ==
    /// Applies role filtering and converts each argument to its escaped
    /// key representation.
    ///
    /// Fails with `NonSerializableArgument` if any remaining argument has
    /// no key representation.
    pub fn signature(&self, args: &CallArgs) -> Result<CallSignature> {
        let skip = match self.role {
            Role::BoundMethod => 1,
            Role::Plain | Role::ResponseHandler => 0,
        };

        let positional = args
            .positional_values()
            .iter()
            .skip(skip)
            .map(|value| {
                self.serializer
                    .key_repr(value)
                    .map(|repr| escape_component(&repr).into_owned())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut keyword = args
            .keywords()
            .map(|(name, value)| {
                let repr = self.serializer.key_repr(value)?;
                Ok((
                    escape_component(name).into_owned(),
                    escape_component(&repr).into_owned(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        keyword.sort();

        Ok(CallSignature { positional, keyword })
    }

    // == Build ==
    /// Derives the key for one call.
    pub fn build(&self, args: &CallArgs) -> Result<CacheKey> {
        let portion = self.signature(args)?.joined();
        let portion = if portion.len() > self.hash_threshold {
            let digest = Sha256::digest(portion.as_bytes());
            format!("{}{}", HASH_MARKER, hex::encode(digest))
        } else {
            portion
        };

        let key = format!("{}{}{}", self.escaped_prefix, KEY_SEPARATOR, portion);
        trace!(prefix = %self.prefix, role = %self.role, key = %key, "Built cache key");
        Ok(CacheKey(key))
    }
}

/// Percent-escapes reserved characters; borrows when nothing needs escaping.
pub fn escape_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains(RESERVED) {
        return Cow::Borrowed(raw);
    }
    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        if RESERVED.contains(&ch) {
            escaped.push_str(&format!("%{:02X}", ch as u32));
        } else {
            escaped.push(ch);
        }
    }
    Cow::Owned(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use crate::error::CacheError;

    #[test]
    fn test_role_from_flags() {
        assert_eq!(Role::from_flags(false, false), Role::Plain);
        assert_eq!(Role::from_flags(true, false), Role::ResponseHandler);
        assert_eq!(Role::from_flags(false, true), Role::BoundMethod);
        assert_eq!(Role::from_flags(true, true), Role::BoundMethod);
    }

    #[test]
    fn test_plain_key_layout() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let key = builder.build(&CallArgs::positional([2, 3])).unwrap();
        assert_eq!(key.as_str(), "p:2,3:");
    }

    #[test]
    fn test_keyword_key_layout() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let args = CallArgs::new().arg(1).kwarg("b", "x").kwarg("a", 2);
        let key = builder.build(&args).unwrap();
        assert_eq!(key.as_str(), "p:1:a=2,b=\"x\"");
    }

    #[test]
    fn test_no_args() {
        let builder = KeyBuilder::new("p", Role::Plain);
        assert_eq!(builder.build(&CallArgs::new()).unwrap().as_str(), "p::");
    }

    #[test]
    fn test_positional_order_matters() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let a = builder.build(&CallArgs::positional([2, 3])).unwrap();
        let b = builder.build(&CallArgs::positional([3, 2])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_keyword_order_ignored() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let a = builder
            .build(&CallArgs::new().kwarg("x", 1).kwarg("y", 2))
            .unwrap();
        let b = builder
            .build(&CallArgs::new().kwarg("y", 2).kwarg("x", 1))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_separators_in_strings_do_not_collide() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let joined = builder.build(&CallArgs::positional(["a,b"])).unwrap();
        let split = builder.build(&CallArgs::positional(["a", "b"])).unwrap();
        assert_ne!(joined, split);

        let in_kw = builder.build(&CallArgs::new().kwarg("k", "v:w=z")).unwrap();
        assert_eq!(in_kw.as_str().matches(KWARG_ASSIGN).count(), 1);
        assert_eq!(in_kw.as_str().matches(KEY_SEPARATOR).count(), 2);
    }

    #[test]
    fn test_positional_vs_keyword_distinct() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let pos = builder.build(&CallArgs::positional([1])).unwrap();
        let kw = builder.build(&CallArgs::new().kwarg("x", 1)).unwrap();
        assert_ne!(pos, kw);
    }

    #[test]
    fn test_bound_method_skips_receiver() {
        let builder = KeyBuilder::new("m", Role::BoundMethod);
        let first = builder
            .build(&CallArgs::positional([Value::opaque::<String>(), Value::Int(1)]))
            .unwrap();
        let second = builder
            .build(&CallArgs::positional([Value::from("other"), Value::Int(1)]))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "m:1:");
    }

    #[test]
    fn test_response_handler_keeps_all_args() {
        let plain = KeyBuilder::new("v", Role::Plain);
        let handler = KeyBuilder::new("v", Role::ResponseHandler);
        let args = CallArgs::positional(["req", "user"]);
        assert_eq!(plain.build(&args).unwrap(), handler.build(&args).unwrap());
    }

    #[test]
    fn test_non_serializable_argument_fails() {
        let builder = KeyBuilder::new("p", Role::Plain);
        let args = CallArgs::new().kwarg("conn", Value::opaque::<std::net::TcpStream>());
        assert!(matches!(
            builder.build(&args),
            Err(CacheError::NonSerializableArgument(_))
        ));
    }

    #[test]
    fn test_long_portion_is_hashed() {
        let builder = KeyBuilder::new("p", Role::Plain).with_hash_threshold(16);
        let key = builder
            .build(&CallArgs::positional(["a long argument value that exceeds"]))
            .unwrap();
        let portion = &key.as_str()["p:".len()..];
        assert!(portion.starts_with(HASH_MARKER));
        assert_eq!(portion.len(), 1 + 64);

        let again = builder
            .build(&CallArgs::positional(["a long argument value that exceeds"]))
            .unwrap();
        assert_eq!(key, again);
    }

    #[test]
    fn test_prefix_escaped_and_pattern() {
        let builder = KeyBuilder::new("users:*", Role::Plain);
        assert_eq!(builder.prefix(), "users:*");
        assert_eq!(builder.prefix_pattern(), "users%3A%2A:*");
        let key = builder.build(&CallArgs::positional([1])).unwrap();
        assert!(key.as_str().starts_with("users%3A%2A:"));
    }

    #[test]
    fn test_escape_component() {
        assert!(matches!(escape_component("plain"), Cow::Borrowed("plain")));
        assert_eq!(escape_component("a:b,c"), "a%3Ab%2Cc");
        assert_eq!(escape_component("100%"), "100%25");
        assert_eq!(escape_component("[x]?\\"), "%5Bx%5D%3F%5C");
    }
}
