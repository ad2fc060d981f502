//! 配置文件热重载集成测试

use anyhow::Result;
use options_abstractions::{
    ConfigChangeEvent, ConfigChangeEventType, ConfigEventListener, FileSystemEvent,
    FileSystemEventType, PatternFileFilter,
};
use options_registry::{ConfigFileWatcher, ConfigOption, ConfigRegistry, FileSource};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct UpdateCollector {
    updates: Mutex<Vec<(String, serde_json::Value)>>,
    files: Mutex<Vec<FileSystemEventType>>,
}

impl ConfigEventListener for UpdateCollector {
    fn on_config_changed(&self, event: &ConfigChangeEvent) {
        if let Some(value) = &event.new_value {
            self.updates.lock().push((event.option.clone(), value.clone()));
        }
    }

    fn on_file_system_event(&self, event: &FileSystemEvent) {
        self.files.lock().push(event.event_type);
    }

    fn name(&self) -> &str {
        "update-collector"
    }

    fn interested_event_types(&self) -> Vec<ConfigChangeEventType> {
        vec![ConfigChangeEventType::Updated]
    }
}

fn registry_with_file(path: &std::path::Path) -> Result<Arc<ConfigRegistry>> {
    let registry = Arc::new(ConfigRegistry::new());
    registry
        .group("cache")?
        .register_opt(ConfigOption::builder::<u32>("size").default(16).build())?;
    registry.register_source(Box::new(FileSource::new(path)?))?;
    registry.load()?;
    Ok(registry)
}

/// 测试文件变化事件触发重载
#[tokio::test]
async fn test_file_event_triggers_reload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cache.toml");
    std::fs::write(&path, "[cache]\nsize = 32\n")?;

    let registry = registry_with_file(&path)?;
    assert_eq!(registry.get::<u32>("cache.size")?, 32);

    let collector = Arc::new(UpdateCollector::default());
    registry.add_listener(collector.clone());

    let mut watcher =
        ConfigFileWatcher::new(Arc::clone(&registry)).with_debounce_delay(Duration::from_millis(10));
    let mut changes = watcher.subscribe();
    let notifier = watcher.notifier();
    let task = tokio::spawn(watcher.run());

    std::fs::write(&path, "[cache]\nsize = 64\n")?;
    notifier.send(FileSystemEvent::new(FileSystemEventType::Modified, &path))?;

    let change = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await?
        .expect("watcher should report the reload");
    assert_eq!(change.event_type, ConfigChangeEventType::Reloaded);
    assert_eq!(registry.get::<u32>("cache.size")?, 64);

    drop(notifier);
    let reloads = task.await??;
    assert_eq!(reloads, 1);

    assert_eq!(
        collector.updates.lock().clone(),
        vec![("cache.size".to_string(), serde_json::json!(64))]
    );
    assert_eq!(
        collector.files.lock().clone(),
        vec![FileSystemEventType::Modified]
    );
    Ok(())
}

/// 测试防抖期内的多个事件合并为一次重载
#[tokio::test]
async fn test_burst_of_events_debounced() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cache.json");
    std::fs::write(&path, r#"{"cache": {"size": 1}}"#)?;
    let registry = registry_with_file(&path)?;
    let generation = registry.generation();

    let watcher =
        ConfigFileWatcher::new(Arc::clone(&registry)).with_debounce_delay(Duration::from_millis(50));
    let notifier = watcher.notifier();
    for _ in 0..5 {
        notifier.send(FileSystemEvent::new(FileSystemEventType::Modified, &path))?;
    }
    drop(notifier);

    let reloads = watcher.run().await?;
    assert_eq!(reloads, 1);
    assert_eq!(registry.generation(), generation + 1);
    Ok(())
}

/// 测试过滤器忽略无关文件
#[tokio::test]
async fn test_filtered_events_ignored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cache.toml");
    std::fs::write(&path, "[cache]\nsize = 2\n")?;
    let registry = registry_with_file(&path)?;
    let generation = registry.generation();

    let watcher = ConfigFileWatcher::new(Arc::clone(&registry))
        .with_debounce_delay(Duration::from_millis(1))
        .with_file_filter(PatternFileFilter::new(vec!["*.json".to_string()])?);
    let notifier = watcher.notifier();
    notifier.send(FileSystemEvent::new(FileSystemEventType::Modified, &path))?;
    notifier.send(FileSystemEvent::new(
        FileSystemEventType::Created,
        dir.path().join("notes.txt"),
    ))?;
    drop(notifier);

    assert_eq!(watcher.run().await?, 0);
    assert_eq!(registry.generation(), generation);
    Ok(())
}

/// 测试重载失败通过订阅通道报告，旧值保持不变
#[tokio::test]
async fn test_failed_reload_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cache.toml");
    std::fs::write(&path, "[cache]\nsize = 8\n")?;
    let registry = registry_with_file(&path)?;

    let mut watcher =
        ConfigFileWatcher::new(Arc::clone(&registry)).with_debounce_delay(Duration::from_millis(1));
    let mut changes = watcher.subscribe();
    let notifier = watcher.notifier();

    std::fs::write(&path, "[cache\nsize = ")?;
    notifier.send(FileSystemEvent::new(FileSystemEventType::Modified, &path))?;
    drop(notifier);

    assert_eq!(watcher.run().await?, 1);
    let change = changes.recv().await.expect("reload result");
    assert_eq!(change.event_type, ConfigChangeEventType::ValidationFailed);
    assert!(change.metadata.contains_key("reason"));
    assert_eq!(registry.get::<u32>("cache.size")?, 8);
    Ok(())
}
