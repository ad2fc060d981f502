//! 配置文件监控器
//!
//! 监听本地配置文件变化，防抖后在阻塞线程池上重新执行 [`ConfigRegistry::load`]。

use crate::registry::ConfigRegistry;
use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use options_abstractions::{
    ConfigChangeEvent, ExtensionFileFilter, FileFilter, FileSystemEvent, FileSystemEventType,
};
use options_common::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// 配置文件监控器
pub struct ConfigFileWatcher {
    registry: Arc<ConfigRegistry>,
    /// 文件系统监控器
    watcher: Option<RecommendedWatcher>,
    /// 监控路径列表
    watched_paths: Vec<PathBuf>,
    /// 防抖延迟
    debounce_delay: Duration,
    /// 文件过滤器
    file_filter: Arc<dyn FileFilter>,
    event_sender: mpsc::UnboundedSender<FileSystemEvent>,
    event_receiver: mpsc::UnboundedReceiver<FileSystemEvent>,
    /// 重载结果订阅者
    change_sender: Option<mpsc::UnboundedSender<ConfigChangeEvent>>,
}

impl std::fmt::Debug for ConfigFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFileWatcher")
            .field("watched_paths", &self.watched_paths)
            .field("is_watching", &self.is_watching())
            .field("debounce_delay", &self.debounce_delay)
            .field("file_filter", &self.file_filter.name())
            .finish()
    }
}

impl ConfigFileWatcher {
    /// 创建监控器，默认只关注常见配置文件扩展名
    pub fn new(registry: Arc<ConfigRegistry>) -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        Self {
            registry,
            watcher: None,
            watched_paths: Vec::new(),
            debounce_delay: Duration::from_millis(500),
            file_filter: Arc::new(ExtensionFileFilter::config_files()),
            event_sender,
            event_receiver,
            change_sender: None,
        }
    }

    /// 设置防抖延迟
    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// 设置文件过滤器
    pub fn with_file_filter(mut self, filter: impl FileFilter + 'static) -> Self {
        self.file_filter = Arc::new(filter);
        self
    }

    /// 订阅重载结果：每次重载后发送一个 [`ConfigChangeEvent`]
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConfigChangeEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.change_sender = Some(sender);
        receiver
    }

    /// 手动投递文件系统事件的发送端
    pub fn notifier(&self) -> mpsc::UnboundedSender<FileSystemEvent> {
        self.event_sender.clone()
    }

    /// 监控路径列表
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched_paths
    }

    /// 是否正在监控文件系统
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// 添加监控路径
    pub fn add_watch_path(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref().to_path_buf();
        if self.watched_paths.contains(&path) {
            warn!("路径已在监控列表中: {}", path.display());
            return Ok(());
        }
        if let Some(watcher) = self.watcher.as_mut() {
            watcher
                .watch(&path, RecursiveMode::NonRecursive)
                .map_err(|e| watch_error("添加监控路径失败", &e))?;
        }
        info!("添加监控路径: {}", path.display());
        self.watched_paths.push(path);
        Ok(())
    }

    /// 移除监控路径
    pub fn remove_watch_path(&mut self, path: impl AsRef<Path>) -> ConfigResult<bool> {
        let path = path.as_ref();
        let Some(pos) = self.watched_paths.iter().position(|p| p == path) else {
            warn!("路径不在监控列表中: {}", path.display());
            return Ok(false);
        };
        self.watched_paths.remove(pos);
        if let Some(watcher) = self.watcher.as_mut() {
            watcher
                .unwatch(path)
                .map_err(|e| watch_error("移除监控路径失败", &e))?;
        }
        info!("移除监控路径: {}", path.display());
        Ok(true)
    }

    /// 开始监控文件系统
    pub fn start_watching(&mut self) -> ConfigResult<()> {
        if self.is_watching() {
            warn!("配置监控器已经在运行");
            return Ok(());
        }

        let sender = self.event_sender.clone();
        let mut watcher = recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let Some(event_type) = map_event_kind(event.kind) else {
                    return;
                };
                for path in event.paths {
                    // 接收端关闭说明监控循环已退出
                    if sender.send(FileSystemEvent::new(event_type, path)).is_err() {
                        return;
                    }
                }
            }
            Err(e) => error!("文件监控错误: {}", e),
        })
        .map_err(|e| watch_error("创建文件监控器失败", &e))?;

        for path in &self.watched_paths {
            watcher
                .watch(path, RecursiveMode::NonRecursive)
                .map_err(|e| watch_error("添加监控路径失败", &e))?;
        }
        self.watcher = Some(watcher);
        info!("配置文件监控已启动: {} 个路径", self.watched_paths.len());
        Ok(())
    }

    /// 停止监控文件系统
    pub fn stop_watching(&mut self) {
        if self.watcher.take().is_some() {
            info!("配置文件监控已停止");
        }
    }

    /// 运行监控循环，直到所有事件发送端都被释放
    ///
    /// 每批事件在防抖延迟内合并为一次重载；返回完成的重载次数
    pub async fn run(self) -> ConfigResult<usize> {
        let Self {
            registry,
            watcher,
            debounce_delay,
            file_filter,
            event_sender,
            mut event_receiver,
            change_sender,
            ..
        } = self;
        // 文件系统监控器持有自己的发送端
        drop(event_sender);
        let _watcher = watcher;

        let mut reloads = 0usize;
        while let Some(event) = event_receiver.recv().await {
            if !file_filter.should_watch(&event.path) {
                debug!("忽略文件事件: {}", event.path.display());
                continue;
            }
            registry.notify_file_event(&event);

            tokio::time::sleep(debounce_delay).await;
            let mut merged = 0usize;
            while let Ok(pending) = event_receiver.try_recv() {
                if file_filter.should_watch(&pending.path) {
                    registry.notify_file_event(&pending);
                    merged += 1;
                }
            }
            info!(
                "检测到配置文件变化: {} (合并 {} 个后续事件)，重新加载配置",
                event.path.display(),
                merged
            );

            let loader = Arc::clone(&registry);
            let result = tokio::task::spawn_blocking(move || loader.load())
                .await
                .map_err(|e| ConfigError::Watch {
                    message: format!("重载任务异常退出: {e}"),
                })?;
            reloads += 1;

            let path = event.path.display().to_string();
            let change = match result {
                Ok(()) => {
                    info!("配置重载成功，当前代数 {}", registry.generation());
                    ConfigChangeEvent::reloaded(registry.generation(), "ConfigFileWatcher")
                        .with_metadata("path", path)
                }
                Err(e) => {
                    warn!("配置重载失败: {}", e);
                    ConfigChangeEvent::rejected(
                        "",
                        registry.generation(),
                        "ConfigFileWatcher",
                        e.to_string(),
                    )
                    .with_metadata("path", path)
                }
            };
            if let Some(sender) = &change_sender {
                if sender.send(change).is_err() {
                    debug!("重载结果订阅者已关闭");
                }
            }
        }
        info!("配置文件监控循环结束，共重载 {} 次", reloads);
        Ok(reloads)
    }
}

fn map_event_kind(kind: EventKind) -> Option<FileSystemEventType> {
    match kind {
        EventKind::Create(_) => Some(FileSystemEventType::Created),
        EventKind::Modify(_) => Some(FileSystemEventType::Modified),
        EventKind::Remove(_) => Some(FileSystemEventType::Deleted),
        _ => None,
    }
}

fn watch_error(context: &str, error: &notify::Error) -> ConfigError {
    ConfigError::Watch {
        message: format!("{context}: {error}"),
    }
}
