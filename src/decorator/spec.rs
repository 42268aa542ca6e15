//! Wrapper Settings Module
//!
//! Validated, immutable settings for cached and invalidating wrappers,
//! plus random prefix generation.

use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::key::{KeyBuilder, Role, DEFAULT_HASH_THRESHOLD};
use crate::store::Store;

// == Cache Spec ==
/// Settings of one cached wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSpec {
    prefix: String,
    timeout: u64,
    role: Role,
    hash_threshold: usize,
}

impl CacheSpec {
    /// Starts a builder for `prefix`. A timeout must be set before `build`.
    pub fn builder(prefix: impl Into<String>) -> CacheSpecBuilder {
        CacheSpecBuilder {
            prefix: prefix.into(),
            timeout: None,
            is_response_method: false,
            is_class_method: false,
            hash_threshold: DEFAULT_HASH_THRESHOLD,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// TTL in seconds passed to every store write; 0 stores without expiry.
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn hash_threshold(&self) -> usize {
        self.hash_threshold
    }

    pub fn key_builder(&self) -> KeyBuilder {
        KeyBuilder::new(self.prefix.clone(), self.role).with_hash_threshold(self.hash_threshold)
    }
}

/// Builder for [`CacheSpec`].
#[derive(Debug, Clone)]
pub struct CacheSpecBuilder {
    prefix: String,
    timeout: Option<u64>,
    is_response_method: bool,
    is_class_method: bool,
    hash_threshold: usize,
}

impl CacheSpecBuilder {
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn is_response_method(mut self, flag: bool) -> Self {
        self.is_response_method = flag;
        self
    }

    pub fn is_class_method(mut self, flag: bool) -> Self {
        self.is_class_method = flag;
        self
    }

    pub fn hash_threshold(mut self, threshold: usize) -> Self {
        self.hash_threshold = threshold;
        self
    }

    /// Applies the configured key hash threshold.
    pub fn with_config(self, config: &Config) -> Self {
        self.hash_threshold(config.key_hash_threshold)
    }

    pub fn build(self) -> Result<CacheSpec> {
        validate_prefix(&self.prefix)?;
        let timeout = self.timeout.ok_or_else(|| {
            CacheError::InvalidSpec(format!("cache `{}` has no timeout", self.prefix))
        })?;
        Ok(CacheSpec {
            prefix: self.prefix,
            timeout,
            role: Role::from_flags(self.is_response_method, self.is_class_method),
            hash_threshold: self.hash_threshold,
        })
    }
}

// == Invalidate Scope ==
/// How many entries one invalidation removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateScope {
    /// The single entry keyed by the invalidator's arguments
    Exact,
    /// Every entry under the prefix
    Prefix,
}

impl InvalidateScope {
    /// Default scope for a role. Method keys omit the receiver, so one
    /// instance cannot address only its own entries.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Plain | Role::ResponseHandler => InvalidateScope::Exact,
            Role::BoundMethod => InvalidateScope::Prefix,
        }
    }
}

// == Invalidate Spec ==
/// Settings of one invalidating wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidateSpec {
    prefix: String,
    role: Role,
    scope: InvalidateScope,
    key_args: Option<Vec<String>>,
    hash_threshold: usize,
}

impl InvalidateSpec {
    pub fn builder(prefix: impl Into<String>) -> InvalidateSpecBuilder {
        InvalidateSpecBuilder {
            prefix: prefix.into(),
            is_response_method: false,
            is_class_method: false,
            scope: None,
            key_args: None,
            hash_threshold: DEFAULT_HASH_THRESHOLD,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scope(&self) -> InvalidateScope {
        self.scope
    }

    /// Keyword names whose values, in this order, key the entry to delete.
    pub fn key_args(&self) -> Option<&[String]> {
        self.key_args.as_deref()
    }

    pub fn hash_threshold(&self) -> usize {
        self.hash_threshold
    }

    pub fn key_builder(&self) -> KeyBuilder {
        KeyBuilder::new(self.prefix.clone(), self.role).with_hash_threshold(self.hash_threshold)
    }
}

/// Builder for [`InvalidateSpec`].
#[derive(Debug, Clone)]
pub struct InvalidateSpecBuilder {
    prefix: String,
    is_response_method: bool,
    is_class_method: bool,
    scope: Option<InvalidateScope>,
    key_args: Option<Vec<String>>,
    hash_threshold: usize,
}

impl InvalidateSpecBuilder {
    pub fn is_response_method(mut self, flag: bool) -> Self {
        self.is_response_method = flag;
        self
    }

    pub fn is_class_method(mut self, flag: bool) -> Self {
        self.is_class_method = flag;
        self
    }

    /// Overrides the role's default scope.
    pub fn scope(mut self, scope: InvalidateScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Names the keyword arguments that identify the entry to delete.
    pub fn key_args<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_args = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn hash_threshold(mut self, threshold: usize) -> Self {
        self.hash_threshold = threshold;
        self
    }

    pub fn with_config(self, config: &Config) -> Self {
        self.hash_threshold(config.key_hash_threshold)
    }

    /// Validates the settings.
    ///
    /// `key_args` select one entry, so they imply `Exact` scope unless a
    /// scope is set explicitly; combining them with `Prefix` is rejected.
    pub fn build(self) -> Result<InvalidateSpec> {
        validate_prefix(&self.prefix)?;
        let role = Role::from_flags(self.is_response_method, self.is_class_method);

        let scope = match (self.scope, &self.key_args) {
            (Some(InvalidateScope::Prefix), Some(_)) => {
                return Err(CacheError::InvalidSpec(format!(
                    "invalidator `{}` combines key_args with prefix scope",
                    self.prefix
                )))
            }
            (Some(scope), _) => scope,
            (None, Some(_)) => InvalidateScope::Exact,
            (None, None) => InvalidateScope::for_role(role),
        };

        Ok(InvalidateSpec {
            prefix: self.prefix,
            role,
            scope,
            key_args: self.key_args,
            hash_threshold: self.hash_threshold,
        })
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(CacheError::InvalidSpec("prefix must not be empty".to_string()));
    }
    Ok(())
}

// == Random Prefix ==
/// Generates `base` followed by a UUIDv4 that no stored key uses yet.
///
/// Tries up to `num_tries` candidates; zero tries or exhausting them fails
/// with `InvalidSpec`. Store failures propagate.
pub fn random_prefix(store: &dyn Store, base: &str, num_tries: u32) -> Result<String> {
    if num_tries == 0 {
        return Err(CacheError::InvalidSpec("num_tries must be at least 1".to_string()));
    }

    for attempt in 1..=num_tries {
        let candidate = format!("{}{}", base, Uuid::new_v4());
        let pattern = KeyBuilder::new(candidate.as_str(), Role::Plain).prefix_pattern();
        if store.scan(&pattern)?.is_empty() {
            return Ok(candidate);
        }
        debug!(candidate = %candidate, attempt = attempt, "Random prefix already in use");
    }

    Err(CacheError::InvalidSpec(format!(
        "no unused prefix found for `{}` after {} tries",
        base, num_tries
    )))
}
