//! 配置注册中心
//!
//! 注册中心持有根分组、按优先级排序的配置源列表以及提交时钟。
//! 一次加载分三个阶段依次调用所有配置源，先暂存、后提交：
//! 任一配置源的阶段失败会中止加载且不提交任何值；
//! 单个选项的转换或验证失败只影响该选项，其余选项照常提交。

use crate::commit::CommitClock;
use crate::group::OptionGroup;
use crate::option::ConfigOption;
use crate::snapshot::Snapshot;
use indexmap::IndexMap;
use options_abstractions::{
    ConfigChangeEvent, ConfigEventListener, ConfigSource, FileSystemEvent, OptionDescriptor,
    OptionType, RawValue, SourceContext,
};
use options_common::{
    join_name, split_option_path, ConfigError, ConfigResult, LoadPhase, MultiError, NameKind,
    DEFAULT_SEPARATOR,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 注册中心选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// 分组分隔符
    pub separator: String,
    /// 配置源中出现未知键时是否报错（默认仅记录警告并忽略）
    pub strict_unknown_keys: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            strict_unknown_keys: false,
        }
    }
}

impl RegistryOptions {
    /// 设置分组分隔符
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// 设置未知键是否报错
    pub fn with_strict_unknown_keys(mut self, strict: bool) -> Self {
        self.strict_unknown_keys = strict;
        self
    }
}

/// 加载状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// 从未加载
    Unloaded,
    /// 正在加载
    Loading,
    /// 至少完成过一次加载
    Loaded,
}

/// 配置注册中心
pub struct ConfigRegistry {
    options: RegistryOptions,
    clock: Arc<CommitClock>,
    root: Arc<OptionGroup>,
    /// 按优先级升序排列；加载期间持有该锁，并发加载因此串行执行
    sources: Mutex<Vec<Box<dyn ConfigSource>>>,
    state: RwLock<LoadState>,
}

impl std::fmt::Debug for ConfigRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRegistry")
            .field("options", &self.options)
            .field("generation", &self.generation())
            .field("load_state", &self.load_state())
            .field("root", &self.root)
            .finish()
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRegistry {
    /// 使用默认选项创建注册中心
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    /// 使用指定选项创建注册中心
    pub fn with_options(mut options: RegistryOptions) -> Self {
        if options.separator.is_empty() {
            warn!("分组分隔符不能为空，使用默认分隔符 {:?}", DEFAULT_SEPARATOR);
            options.separator = DEFAULT_SEPARATOR.to_string();
        }
        let clock = Arc::new(CommitClock::new());
        let root = Arc::new(OptionGroup::root(
            Arc::from(options.separator.as_str()),
            Arc::clone(&clock),
        ));
        Self {
            options,
            clock,
            root,
            sources: Mutex::new(Vec::new()),
            state: RwLock::new(LoadState::Unloaded),
        }
    }

    /// 注册中心选项
    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// 分组分隔符
    pub fn separator(&self) -> &str {
        &self.options.separator
    }

    /// 根分组
    pub fn root(&self) -> &Arc<OptionGroup> {
        &self.root
    }

    /// 按路径获取分组，沿途不存在的分组会被创建
    pub fn group(&self, path: &str) -> ConfigResult<Arc<OptionGroup>> {
        self.root.group(path)
    }

    /// 按路径查找分组，不创建
    pub fn find_group(&self, path: &str) -> Option<Arc<OptionGroup>> {
        self.root.find_group(path)
    }

    /// 在根分组注册选项
    pub fn register_opt(&self, option: ConfigOption) -> ConfigResult<Arc<ConfigOption>> {
        self.root.register_opt(option)
    }

    /// 在根分组批量注册选项
    pub fn register_opts(&self, options: Vec<ConfigOption>) -> ConfigResult<Vec<Arc<ConfigOption>>> {
        self.root.register_opts(options)
    }

    /// 按全名查找选项，最后一段为选项名
    pub fn option(&self, full_name: &str) -> Option<Arc<ConfigOption>> {
        let (group, name) = split_option_path(full_name, self.separator());
        if group.is_empty() {
            self.root.option(name)
        } else {
            self.root.find_group(group)?.option(name)
        }
    }

    /// 按全名读取选项值
    pub fn get<T: OptionType>(&self, full_name: &str) -> ConfigResult<T> {
        self.option(full_name)
            .ok_or_else(|| ConfigError::UnknownOption {
                name: full_name.to_string(),
            })?
            .get::<T>()
    }

    /// 按全名写入选项值（转换、验证、提交）
    pub fn set_value(&self, full_name: &str, raw: impl Into<RawValue>) -> ConfigResult<()> {
        self.option(full_name)
            .ok_or_else(|| ConfigError::UnknownOption {
                name: full_name.to_string(),
            })?
            .set_value(raw)
    }

    /// 所有选项的描述符，按深度优先顺序
    pub fn describe(&self) -> Vec<OptionDescriptor> {
        self.root.all_opts().map(|option| option.descriptor()).collect()
    }

    /// 当前代数，即注册中心创建以来成功提交的次数
    pub fn generation(&self) -> u64 {
        self.clock.generation()
    }

    /// 加载状态
    pub fn load_state(&self) -> LoadState {
        *self.state.read()
    }

    /// 拍摄快照
    ///
    /// 快照期间没有任何提交能够发生，返回的代数与值彼此一致
    pub fn snapshot(&self) -> Snapshot {
        let generation = self.clock.read();
        let values: IndexMap<String, _> = self
            .root
            .all_opts()
            .map(|option| (option.full_name().to_string(), option.value()))
            .collect();
        Snapshot::new(*generation, values)
    }

    /// 添加配置事件监听器
    ///
    /// 监听器在提交线程上同步调用；回调中可以读取注册中心，但不能再次调用 [`Self::load`]
    pub fn add_listener(&self, listener: Arc<dyn ConfigEventListener>) {
        self.clock.add_listener(listener);
    }

    /// 向监听器转发文件系统事件
    pub fn notify_file_event(&self, event: &FileSystemEvent) {
        self.clock.notify_file_event(event);
    }

    /// 注册配置源，名称重复时失败
    pub fn register_source(&self, source: Box<dyn ConfigSource>) -> ConfigResult<()> {
        let mut sources = self.sources.lock();
        if sources.iter().any(|existing| existing.name() == source.name()) {
            return Err(ConfigError::DuplicateName {
                kind: NameKind::Source,
                name: source.name().to_string(),
                group: String::new(),
            });
        }
        info!(
            "注册配置源: {} (优先级: {})",
            source.name(),
            source.priority()
        );
        sources.push(source);
        // 稳定排序：优先级相同的配置源保持注册顺序
        sources.sort_by_key(|source| source.priority());
        Ok(())
    }

    /// 移除配置源
    pub fn unregister_source(&self, name: &str) -> bool {
        let mut sources = self.sources.lock();
        let before = sources.len();
        sources.retain(|source| source.name() != name);
        let removed = sources.len() < before;
        if removed {
            info!("移除配置源: {}", name);
        } else {
            warn!("配置源不存在: {}", name);
        }
        removed
    }

    /// 按执行顺序列出配置源名称
    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .lock()
            .iter()
            .map(|source| source.name().to_string())
            .collect()
    }

    /// 从所有配置源加载配置
    ///
    /// 阶段失败返回 [`ConfigError::Load`] 且不提交任何值；
    /// 选项级失败在全部提交完成后汇总为 [`ConfigError::Multiple`]
    pub fn load(&self) -> ConfigResult<()> {
        let mut sources = self.sources.lock();
        let previous = std::mem::replace(&mut *self.state.write(), LoadState::Loading);
        info!("开始加载配置: {} 个配置源", sources.len());

        let mut ctx = LoadContext::new(self);
        if let Err(error) = run_phases(&mut sources, &mut ctx) {
            error!("配置加载失败: {}", error);
            *self.state.write() = previous;
            return Err(error);
        }

        let LoadContext {
            staged, mut errors, ..
        } = ctx;
        let staged_count = staged.len();
        let mut committed = 0usize;
        for (full_name, entry) in staged {
            match entry.option.set_from(&entry.raw, &entry.source) {
                Ok(_) => committed += 1,
                Err(error) => {
                    warn!(
                        "选项 {} 的值 {} 无效 (来源: {}): {}",
                        full_name,
                        entry.raw.describe(),
                        entry.source,
                        error
                    );
                    self.clock.notify(&ConfigChangeEvent::rejected(
                        &full_name,
                        self.clock.generation(),
                        &entry.source,
                        error.to_string(),
                    ));
                    errors.push(error.for_option(full_name));
                }
            }
        }

        *self.state.write() = LoadState::Loaded;
        let generation = self.clock.generation();
        info!(
            "配置加载完成: 暂存 {} 个, 提交 {} 个, 失败 {} 个, 当前代数 {}",
            staged_count,
            committed,
            errors.len(),
            generation
        );
        self.clock
            .notify(&ConfigChangeEvent::reloaded(generation, "ConfigRegistry"));
        errors.into_result()
    }
}

fn run_phases(sources: &mut [Box<dyn ConfigSource>], ctx: &mut LoadContext<'_>) -> ConfigResult<()> {
    for phase in [LoadPhase::Pre, LoadPhase::Parse, LoadPhase::Post] {
        for source in sources.iter_mut() {
            let name = source.name().to_string();
            debug!("配置源 {} 执行 {} 阶段", name, phase);
            ctx.current_source.clone_from(&name);
            let result = match phase {
                LoadPhase::Pre => source.pre(&mut *ctx),
                LoadPhase::Parse => source.parse(&mut *ctx),
                LoadPhase::Post => source.post(&mut *ctx),
            };
            result.map_err(|error| error.in_source(name, phase))?;
        }
    }
    Ok(())
}

/// 暂存的值
struct StagedValue {
    option: Arc<ConfigOption>,
    raw: RawValue,
    source: String,
}

/// 一次加载的上下文：每个选项只保留最后一次暂存的值
struct LoadContext<'r> {
    registry: &'r ConfigRegistry,
    current_source: String,
    staged: IndexMap<String, StagedValue>,
    errors: MultiError,
}

impl<'r> LoadContext<'r> {
    fn new(registry: &'r ConfigRegistry) -> Self {
        Self {
            registry,
            current_source: String::new(),
            staged: IndexMap::new(),
            errors: MultiError::new(),
        }
    }

    fn stage_option(&mut self, option: Arc<ConfigOption>, raw: RawValue) {
        let full_name = option.full_name().to_string();
        if let Some(previous) = self.staged.get(&full_name) {
            debug!(
                "选项 {} 的暂存值被 {} 覆盖 (原来源: {})",
                full_name, self.current_source, previous.source
            );
        }
        self.staged.insert(
            full_name,
            StagedValue {
                option,
                raw,
                source: self.current_source.clone(),
            },
        );
    }

    fn unknown_key(&mut self, path: String) {
        if self.registry.options.strict_unknown_keys {
            self.errors.push(ConfigError::UnknownOption { name: path });
        } else {
            warn!("忽略未知配置项: {} (来源: {})", path, self.current_source);
        }
    }

    fn stage_map(&mut self, group: &OptionGroup, tree: &Map<String, Value>) -> usize {
        let registry = self.registry;
        let separator = registry.separator();
        let mut count = 0;
        for (key, value) in tree {
            if let Value::Object(children) = value {
                let child = if key.contains(separator) {
                    group.find_group(key)
                } else {
                    group.child_group(key)
                };
                if let Some(child) = child {
                    count += self.stage_map(&child, children);
                    continue;
                }
            }

            let (group_path, name) = split_option_path(key, separator);
            let option = if group_path.is_empty() {
                group.resolve_option(name)
            } else {
                group
                    .find_group(group_path)
                    .and_then(|target| target.resolve_option(name))
            };
            match option {
                Some(option) => {
                    self.stage_option(option, RawValue::Json(value.clone()));
                    count += 1;
                }
                None => self.unknown_key(join_name(group.full_name(), key, separator)),
            }
        }
        count
    }
}

impl SourceContext for LoadContext<'_> {
    fn separator(&self) -> &str {
        self.registry.separator()
    }

    fn options(&self) -> Vec<OptionDescriptor> {
        self.registry.describe()
    }

    fn stage(&mut self, group: &str, option: &str, raw: RawValue) -> ConfigResult<()> {
        let registry = self.registry;
        let target = if group.is_empty() {
            Some(Arc::clone(&registry.root))
        } else {
            registry.root.find_group(group)
        };
        match target.and_then(|target| target.resolve_option(option)) {
            Some(resolved) => self.stage_option(resolved, raw),
            None => self.unknown_key(join_name(group, option, registry.separator())),
        }
        Ok(())
    }

    fn stage_tree(&mut self, tree: &Map<String, Value>) -> ConfigResult<usize> {
        let root = Arc::clone(&self.registry.root);
        Ok(self.stage_map(&root, tree))
    }
}
