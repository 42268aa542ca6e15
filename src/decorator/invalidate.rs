//! Invalidating Wrapper Module
//!
//! Runs a callable, then removes the cached entries its call made stale.

use tracing::{debug, warn};

use crate::codec::Value;
use crate::decorator::spec::{InvalidateScope, InvalidateSpec};
use crate::error::{CacheError, Result};
use crate::key::{CallArgs, KeyBuilder, Role};
use crate::store::SharedStore;

// == Invalidated ==
/// Result of an invalidating call.
#[derive(Debug)]
pub struct Invalidated {
    /// The wrapped callable's value
    pub value: Value,
    /// Number of entries deleted, or why invalidation failed
    pub outcome: Result<u64>,
}

impl Invalidated {
    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_invalidated(&self) -> bool {
        self.outcome.is_ok()
    }
}

// == Invalidating ==
/// A callable wrapped with cache invalidation.
pub struct Invalidating<F> {
    func: F,
    spec: InvalidateSpec,
    keys: KeyBuilder,
    store: SharedStore,
}

/// Wraps `func` so every successful call invalidates entries per `spec`.
pub fn invalidate_cache<F>(spec: InvalidateSpec, store: SharedStore, func: F) -> Invalidating<F> {
    Invalidating::new(spec, store, func)
}

impl<F> Invalidating<F> {
    pub fn new(spec: InvalidateSpec, store: SharedStore, func: F) -> Self {
        let keys = spec.key_builder();
        Self {
            func,
            spec,
            keys,
            store,
        }
    }

    pub fn spec(&self) -> &InvalidateSpec {
        &self.spec
    }

    pub fn wrapped(&self) -> &F {
        &self.func
    }

    // == Call ==
    /// Invokes the callable; on success deletes the affected entries.
    ///
    /// A failing callable propagates its error and deletes nothing.
    pub fn call<E>(&self, args: &CallArgs) -> std::result::Result<Invalidated, E>
    where
        F: Fn(&CallArgs) -> std::result::Result<Value, E>,
    {
        let value = (self.func)(args)?;
        let outcome = self.invalidate_for(args, None);
        Ok(Invalidated { value, outcome })
    }

    /// Method form of [`Invalidating::call`]; the receiver takes the first
    /// positional slot when the exact key is derived from the arguments.
    pub fn call_method<S, E>(
        &self,
        receiver: &S,
        args: &CallArgs,
    ) -> std::result::Result<Invalidated, E>
    where
        S: ?Sized,
        F: Fn(&S, &CallArgs) -> std::result::Result<Value, E>,
    {
        let value = (self.func)(receiver, args)?;
        let outcome = self.invalidate_for(args, Some(Value::opaque::<S>()));
        Ok(Invalidated { value, outcome })
    }

    fn invalidate_for(&self, args: &CallArgs, receiver: Option<Value>) -> Result<u64> {
        let outcome = match self.spec.scope() {
            InvalidateScope::Prefix => self.store.delete_matching(&self.keys.prefix_pattern()),
            InvalidateScope::Exact => self.exact_args(args, receiver).and_then(|key_args| {
                let key = self.keys.build(&key_args)?;
                let removed = self.store.delete(key.as_str())?;
                debug!(key = %key, removed = removed, "Invalidated cache entry");
                Ok(u64::from(removed))
            }),
        };

        match &outcome {
            Ok(deleted) => debug!(
                prefix = %self.spec.prefix(),
                scope = ?self.spec.scope(),
                deleted = deleted,
                "Invalidation done"
            ),
            Err(e) => warn!(prefix = %self.spec.prefix(), error = %e, "Invalidation failed"),
        }
        outcome
    }

    /// Arguments the exact key is built from.
    ///
    /// With `key_args`, the named keyword values become positional
    /// arguments in list order, behind a placeholder receiver for the
    /// bound-method role.
    fn exact_args(&self, args: &CallArgs, receiver: Option<Value>) -> Result<CallArgs> {
        let Some(names) = self.spec.key_args() else {
            return Ok(match receiver {
                Some(receiver) => args.with_receiver(receiver),
                None => args.clone(),
            });
        };

        let mut selected = CallArgs::new();
        if self.spec.role() == Role::BoundMethod {
            selected = selected.arg(Value::Null);
        }
        for name in names {
            let value = args
                .keyword(name)
                .ok_or_else(|| CacheError::MissingKeyArgument(name.clone()))?;
            selected = selected.arg(value.clone());
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::store::{MemoryStore, Store};

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.set("p:5:", "\"five\"", 60).unwrap();
        store.set("p:6:", "\"six\"", 60).unwrap();
        store.set("m:1:", "1", 60).unwrap();
        store.set("m:2:", "2", 60).unwrap();
        store
    }

    fn echo(args: &CallArgs) -> std::result::Result<Value, CacheError> {
        Ok(Value::Int(args.len() as i64))
    }

    #[test]
    fn test_exact_invalidation() {
        let store = seeded();
        let spec = InvalidateSpec::builder("p").build().unwrap();
        let update = invalidate_cache(spec, store.clone(), echo);

        let result = update.call(&CallArgs::positional([5])).unwrap();
        assert_eq!(result.value, Value::Int(1));
        assert_eq!(result.outcome.unwrap(), 1);
        assert!(!store.exists("p:5:").unwrap());
        assert!(store.exists("p:6:").unwrap());
    }

    #[test]
    fn test_exact_invalidation_of_absent_key() {
        let store = seeded();
        let spec = InvalidateSpec::builder("p").build().unwrap();
        let update = invalidate_cache(spec, store, echo);

        let result = update.call(&CallArgs::positional([7])).unwrap();
        assert_eq!(result.outcome.unwrap(), 0);
    }

    #[test]
    fn test_callable_error_skips_invalidation() {
        let store = seeded();
        let spec = InvalidateSpec::builder("p").build().unwrap();
        let update = invalidate_cache(spec, store.clone(), |_: &CallArgs| {
            Err::<Value, _>(CacheError::InvalidSpec("rejected".to_string()))
        });

        assert!(update.call(&CallArgs::positional([5])).is_err());
        assert!(store.exists("p:5:").unwrap());
    }

    #[test]
    fn test_key_args_select_keywords() {
        let store = seeded();
        let spec = InvalidateSpec::builder("p")
            .key_args(["user_id"])
            .build()
            .unwrap();
        let update = invalidate_cache(spec, store.clone(), echo);

        let args = CallArgs::new().kwarg("data", "x").kwarg("user_id", 6);
        let result = update.call(&args).unwrap();
        assert_eq!(result.outcome.unwrap(), 1);
        assert!(!store.exists("p:6:").unwrap());
    }

    #[test]
    fn test_missing_key_arg_reported() {
        let store = seeded();
        let spec = InvalidateSpec::builder("p")
            .key_args(["user_id"])
            .build()
            .unwrap();
        let update = invalidate_cache(spec, store, echo);

        let result = update.call(&CallArgs::positional([6])).unwrap();
        assert_eq!(result.value, Value::Int(1));
        assert!(matches!(result.outcome, Err(CacheError::MissingKeyArgument(ref name)) if name == "user_id"));
    }

    struct Repo;

    #[test]
    fn test_method_invalidation_clears_prefix() {
        let store = seeded();
        let spec = InvalidateSpec::builder("m")
            .is_class_method(true)
            .build()
            .unwrap();
        let save = invalidate_cache(spec, store.clone(), |_: &Repo, _: &CallArgs| {
            Ok::<_, CacheError>(Value::Null)
        });

        let result = save.call_method(&Repo, &CallArgs::positional([1])).unwrap();
        assert_eq!(result.outcome.unwrap(), 2);
        assert!(store.scan("m:*").unwrap().is_empty());
        assert_eq!(store.scan("p:*").unwrap().len(), 2);
    }

    #[test]
    fn test_method_exact_scope_skips_receiver() {
        let store = seeded();
        let spec = InvalidateSpec::builder("m")
            .is_class_method(true)
            .scope(InvalidateScope::Exact)
            .build()
            .unwrap();
        let save = invalidate_cache(spec, store.clone(), |_: &Repo, _: &CallArgs| {
            Ok::<_, CacheError>(Value::Null)
        });

        let result = save.call_method(&Repo, &CallArgs::positional([2])).unwrap();
        assert!(result.is_invalidated());
        assert!(store.exists("m:1:").unwrap());
        assert!(!store.exists("m:2:").unwrap());
    }

    #[test]
    fn test_method_key_args() {
        let store = seeded();
        let spec = InvalidateSpec::builder("m")
            .is_class_method(true)
            .key_args(["id"])
            .build()
            .unwrap();
        let save = invalidate_cache(spec, store.clone(), |_: &Repo, _: &CallArgs| {
            Ok::<_, CacheError>(Value::Null)
        });

        let args = CallArgs::new().kwarg("id", 1).kwarg("payload", "x");
        assert_eq!(save.call_method(&Repo, &args).unwrap().outcome.unwrap(), 1);
        assert!(!store.exists("m:1:").unwrap());
        assert!(store.exists("m:2:").unwrap());
    }

    #[test]
    fn test_non_serializable_argument_reported() {
        let store = seeded();
        let spec = InvalidateSpec::builder("p").build().unwrap();
        let update = invalidate_cache(spec, store, echo);

        let args = CallArgs::positional([Value::opaque::<std::fs::File>()]);
        let result = update.call(&args).unwrap();
        assert!(matches!(result.outcome, Err(CacheError::NonSerializableArgument(_))));
        assert_eq!(result.into_value(), Value::Int(1));
    }
}
