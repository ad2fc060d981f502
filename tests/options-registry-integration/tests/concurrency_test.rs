//! 并发读写与并发加载集成测试

use anyhow::Result;
use options_registry::{ConfigOption, ConfigRegistry, LoadState, MemorySource};
use serde_json::json;
use std::sync::Arc;
use std::thread;

/// 测试并发加载串行执行，代数精确累加
#[test]
fn test_concurrent_loads_are_serialized() -> Result<()> {
    let registry = Arc::new(ConfigRegistry::new());
    registry.group("limits")?.register_opts(vec![
        ConfigOption::builder::<u32>("read").build(),
        ConfigOption::builder::<u32>("write").build(),
    ])?;
    registry.register_source(Box::new(MemorySource::from_value(
        "limits",
        json!({"limits": {"read": 10, "write": 20}}),
    )?))?;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.load())
        })
        .collect();
    for handle in handles {
        handle.join().expect("load thread panicked")?;
    }

    assert_eq!(registry.generation(), 16);
    assert_eq!(registry.load_state(), LoadState::Loaded);
    assert_eq!(registry.get::<u32>("limits.read")?, 10);
    assert_eq!(registry.get::<u32>("limits.write")?, 20);
    Ok(())
}

/// 测试读者在写入期间只会看到完整的旧值或新值
#[test]
fn test_readers_never_see_torn_values() -> Result<()> {
    let registry = Arc::new(ConfigRegistry::new());
    let option = registry.register_opt(ConfigOption::builder::<String>("token").build())?;
    let values = ["alpha".repeat(64), "omega".repeat(64)];

    let writer = {
        let values = values.clone();
        thread::spawn(move || {
            for i in 0..1_000 {
                option
                    .set_value(values[i % 2].clone())
                    .expect("write should succeed");
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let values = values.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    let current = registry.get::<String>("token").expect("read should succeed");
                    assert!(current.is_empty() || values.contains(&current));
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert_eq!(registry.generation(), 1_000);
    Ok(())
}

/// 测试加载期间注册新分组与读取快照不会死锁
#[test]
fn test_registration_and_snapshot_during_loads() -> Result<()> {
    let registry = Arc::new(ConfigRegistry::new());
    registry.register_opt(ConfigOption::builder::<bool>("ready").build())?;
    registry.register_source(Box::new(MemorySource::from_value(
        "m",
        json!({"ready": true}),
    )?))?;

    let loader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || -> Result<()> {
            for _ in 0..50 {
                registry.load()?;
            }
            Ok(())
        })
    };
    let registrar = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || -> Result<()> {
            for i in 0..50 {
                registry
                    .group(&format!("dynamic.g{i}"))?
                    .register_opt(ConfigOption::builder::<i64>("n").build())?;
                let snapshot = registry.snapshot();
                assert!(snapshot.len() >= i + 2);
            }
            Ok(())
        })
    };

    loader.join().expect("loader panicked")?;
    registrar.join().expect("registrar panicked")?;
    assert_eq!(registry.snapshot().len(), 51);
    assert!(registry.get::<bool>("ready")?);
    Ok(())
}
