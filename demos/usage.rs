//! memo_cache usage demo
//!
//! Memoizes a slow function, a request handler and a repository method,
//! then invalidates them. Uses Redis when `CACHE_BACKEND=redis` and a
//! server is reachable, the in-memory store otherwise.
//!
//! Run with `cargo run --example usage`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::{
    cache, invalidate_cache, spawn_cleanup_task, store, CacheSpec, CallArgs, Config,
    InvalidateSpec, MemoryStore, SharedStore, Store, StoreBackend, Value,
};

struct Repository {
    table: &'static str,
}

/// In-memory store plus its cleanup task.
fn memory_store(config: &Config) -> (SharedStore, Option<JoinHandle<()>>) {
    let memory = Arc::new(MemoryStore::new());
    let handle = spawn_cleanup_task(memory.clone(), config.cleanup_interval);
    (memory as SharedStore, Some(handle))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=debug,usage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={:?}, key_hash_threshold={}, cleanup_interval={}s",
        config.backend, config.key_hash_threshold, config.cleanup_interval
    );

    let (shared, cleanup_handle) = match config.backend {
        StoreBackend::Memory => memory_store(&config),
        StoreBackend::Redis => {
            let redis = store::from_config(&config)?;
            // The connection is lazy; one round trip tells whether it works
            match redis.exists("demo:ping") {
                Ok(_) => (redis, None),
                Err(e) => {
                    warn!("Redis unreachable ({}); falling back to the memory store", e);
                    memory_store(&config)
                }
            }
        }
    };

    // == Plain function ==
    let slow_sum = cache(
        CacheSpec::builder("demo:sum")
            .timeout(60)
            .with_config(&config)
            .build()?,
        shared.clone(),
        |args: &CallArgs| -> anyhow::Result<Value> {
            std::thread::sleep(Duration::from_millis(200));
            let x = args.get(0).and_then(Value::as_i64).context("x must be an integer")?;
            let y = args.get(1).and_then(Value::as_i64).context("y must be an integer")?;
            Ok(Value::Int(x + y))
        },
    );

    for _ in 0..3 {
        let value = slow_sum.call(&CallArgs::positional([2, 3]))?;
        info!("sum(2, 3) = {:?}", value);
    }
    info!("sum stats: {:?}", slow_sum.cache_info());

    // == Request handler ==
    let profile_view = cache(
        CacheSpec::builder("demo:profile")
            .timeout(30)
            .is_response_method(true)
            .build()?,
        shared.clone(),
        |args: &CallArgs| -> anyhow::Result<Value> {
            let user = args.keyword("user_id").and_then(Value::as_i64).unwrap_or(0);
            Ok(Value::from_serialize(&serde_json::json!({
                "status": 200,
                "body": { "user_id": user, "name": format!("user-{}", user) },
            }))?)
        },
    );
    let update_profile = invalidate_cache(
        InvalidateSpec::builder("demo:profile")
            .is_response_method(true)
            .build()?,
        shared.clone(),
        |_: &CallArgs| -> anyhow::Result<Value> { Ok(Value::Bool(true)) },
    );

    let request = CallArgs::new().kwarg("user_id", 7);
    profile_view.call(&request)?;
    profile_view.call(&request)?;
    let updated = update_profile.call(&request)?;
    match &updated.outcome {
        Ok(deleted) => info!("profile update invalidated {} entries", deleted),
        Err(e) => warn!("profile update could not invalidate: {}", e),
    }

    // == Bound method ==
    let find = cache(
        CacheSpec::builder("demo:repo")
            .timeout(120)
            .is_class_method(true)
            .build()?,
        shared.clone(),
        |repo: &Repository, args: &CallArgs| -> anyhow::Result<Value> {
            let id = args.get(0).and_then(Value::as_i64).context("id must be an integer")?;
            Ok(Value::from(format!("{}:{}", repo.table, id)))
        },
    );
    let save = invalidate_cache(
        InvalidateSpec::builder("demo:repo")
            .is_class_method(true)
            .build()?,
        shared.clone(),
        |_: &Repository, _: &CallArgs| -> anyhow::Result<Value> { Ok(Value::Null) },
    );

    let users = Repository { table: "users" };
    info!("find(1) = {:?}", find.call_method(&users, &CallArgs::positional([1]))?);
    info!("find(1) = {:?}", find.call_method(&users, &CallArgs::positional([1]))?);
    find.call_method(&users, &CallArgs::positional([2]))?;
    let dropped = find.invalidate_method::<Repository>(&CallArgs::positional([2]))?;
    info!("find(2) entry invalidated: {}", dropped);
    let saved = save.call_method(&users, &CallArgs::positional([1]))?;
    info!("save invalidated: {:?}", saved.outcome);

    slow_sum.clear_cache()?;
    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
    info!("Demo complete");
    Ok(())
}
