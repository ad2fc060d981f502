//! 提交时钟
//!
//! 同一注册中心内所有选项的写入都经过同一把读写锁：提交持有写锁并将代数加一，
//! 快照持有读锁读取代数与全部选项值，因此快照永远不会看到半完成的提交。

use crate::field::FieldCell;
use options_abstractions::{ConfigChangeEvent, ConfigEventListener, FileSystemEvent, OptionValue};
use options_common::ConfigResult;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub(crate) struct CommitClock {
    generation: RwLock<u64>,
    listeners: RwLock<Vec<Arc<dyn ConfigEventListener>>>,
}

impl CommitClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.generation.read()
    }

    /// 持有读锁期间不会有任何提交发生
    ///
    /// parking_lot 的读锁在有写者排队时不可重入：持有该守卫期间不得调用
    /// [`Self::generation`] 或 [`Self::commit`]，否则会与排队的提交互相等待
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, u64> {
        self.generation.read()
    }

    /// 写入一个已通过验证的值并推进代数，返回提交后的代数
    pub(crate) fn commit(
        &self,
        full_name: &str,
        field: &dyn FieldCell,
        value: OptionValue,
        source: &str,
    ) -> ConfigResult<u64> {
        let (old, generation) = {
            let mut generation = self.generation.write();
            let old = field.get_value();
            field.set_value(value.clone())?;
            *generation += 1;
            (old, *generation)
        };

        debug!(
            "选项已提交: {} = {} (来源: {}, 代数: {})",
            full_name, value, source, generation
        );
        self.notify(&ConfigChangeEvent::updated(
            full_name,
            old.to_json(),
            value.to_json(),
            generation,
            source,
        ));
        Ok(generation)
    }

    pub(crate) fn add_listener(&self, listener: Arc<dyn ConfigEventListener>) {
        debug!("添加配置事件监听器: {}", listener.name());
        self.listeners.write().push(listener);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// 监听器在锁外被调用，可以在回调中读取注册中心
    pub(crate) fn notify(&self, event: &ConfigChangeEvent) {
        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners.iter().filter(|l| l.accepts(event)) {
            listener.on_config_changed(event);
        }
    }

    pub(crate) fn notify_file_event(&self, event: &FileSystemEvent) {
        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners.iter().filter(|l| l.is_enabled()) {
            listener.on_file_system_event(event);
        }
    }
}

impl std::fmt::Debug for CommitClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitClock")
            .field("generation", &self.generation())
            .field("listeners_count", &self.listener_count())
            .finish()
    }
}
