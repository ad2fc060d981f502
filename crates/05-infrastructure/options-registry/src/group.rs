//! 选项分组
//!
//! 分组构成一棵树，根分组全名为空；子分组与选项都按插入顺序保存。

use crate::commit::CommitClock;
use crate::option::ConfigOption;
use indexmap::IndexMap;
use options_abstractions::OptionType;
use options_common::{join_name, split_path, validate_name, ConfigError, ConfigResult};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// 选项分组
pub struct OptionGroup {
    name: String,
    full_name: String,
    separator: Arc<str>,
    clock: Arc<CommitClock>,
    options: RwLock<IndexMap<String, Arc<ConfigOption>>>,
    children: RwLock<IndexMap<String, Arc<OptionGroup>>>,
}

impl std::fmt::Debug for OptionGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionGroup")
            .field("full_name", &self.full_name)
            .field("options", &self.options.read().keys().collect::<Vec<_>>())
            .field("children", &self.children.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OptionGroup {
    pub(crate) fn root(separator: Arc<str>, clock: Arc<CommitClock>) -> Self {
        Self {
            name: String::new(),
            full_name: String::new(),
            separator,
            clock,
            options: RwLock::new(IndexMap::new()),
            children: RwLock::new(IndexMap::new()),
        }
    }

    fn child(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            full_name: join_name(&self.full_name, name, &self.separator),
            separator: Arc::clone(&self.separator),
            clock: Arc::clone(&self.clock),
            options: RwLock::new(IndexMap::new()),
            children: RwLock::new(IndexMap::new()),
        }
    }

    /// 分组名，根分组为空
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 分组全名，根分组为空
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// 分组分隔符
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// 是否为根分组
    pub fn is_root(&self) -> bool {
        self.full_name.is_empty()
    }

    /// 注册单个选项
    pub fn register_opt(&self, option: ConfigOption) -> ConfigResult<Arc<ConfigOption>> {
        let mut registered = self.register_opts(vec![option])?;
        registered
            .pop()
            .ok_or_else(|| ConfigError::invariant("注册结果为空"))
    }

    /// 批量注册选项
    ///
    /// 任一名称无效或重复时整批失败，分组保持不变
    pub fn register_opts(&self, options: Vec<ConfigOption>) -> ConfigResult<Vec<Arc<ConfigOption>>> {
        let mut existing = self.options.write();
        let mut seen = HashSet::new();
        for option in &options {
            validate_name(option.name(), &self.separator)?;
            if option.is_bound() {
                return Err(ConfigError::invariant(format!(
                    "选项 {} 已注册到其他分组",
                    option.full_name()
                )));
            }
            if existing.contains_key(option.name()) || !seen.insert(option.name().to_string()) {
                return Err(ConfigError::duplicate_option(option.name(), &self.full_name));
            }
        }

        let mut registered = Vec::with_capacity(options.len());
        for mut option in options {
            let full_name = join_name(&self.full_name, option.name(), &self.separator);
            option.bind(&self.full_name, full_name, Arc::clone(&self.clock));
            debug!("注册配置选项: {} ({})", option.full_name(), option.kind());
            let option = Arc::new(option);
            existing.insert(option.name().to_string(), Arc::clone(&option));
            registered.push(option);
        }
        Ok(registered)
    }

    /// 创建直接子分组，同名子分组已存在时失败
    pub fn new_group(&self, name: &str) -> ConfigResult<Arc<OptionGroup>> {
        validate_name(name, &self.separator)?;
        let mut children = self.children.write();
        if children.contains_key(name) {
            return Err(ConfigError::duplicate_group(name, &self.full_name));
        }
        let group = Arc::new(self.child(name));
        debug!("创建配置分组: {}", group.full_name);
        children.insert(name.to_string(), Arc::clone(&group));
        Ok(group)
    }

    /// 按路径获取分组，沿途不存在的分组会被创建
    pub fn group(&self, path: &str) -> ConfigResult<Arc<OptionGroup>> {
        let segments = split_path(path, &self.separator)?;
        let mut current: Option<Arc<OptionGroup>> = None;
        for segment in segments {
            let next = match &current {
                Some(group) => group.child_or_create(segment),
                None => self.child_or_create(segment),
            };
            current = Some(next);
        }
        current.ok_or_else(|| ConfigError::invalid_name(path, "路径不能为空"))
    }

    fn child_or_create(&self, name: &str) -> Arc<OptionGroup> {
        if let Some(existing) = self.children.read().get(name) {
            return Arc::clone(existing);
        }
        let mut children = self.children.write();
        Arc::clone(children.entry(name.to_string()).or_insert_with(|| {
            let group = Arc::new(self.child(name));
            debug!("创建配置分组: {}", group.full_name);
            group
        }))
    }

    /// 按路径查找分组，不创建
    pub fn find_group(&self, path: &str) -> Option<Arc<OptionGroup>> {
        let mut segments = path.split(&*self.separator);
        let mut current = self.child_group(segments.next()?)?;
        for segment in segments {
            current = current.child_group(segment)?;
        }
        Some(current)
    }

    /// 直接子分组
    pub fn child_group(&self, name: &str) -> Option<Arc<OptionGroup>> {
        self.children.read().get(name).cloned()
    }

    /// 直接子分组列表
    pub fn groups(&self) -> Vec<Arc<OptionGroup>> {
        self.children.read().values().cloned().collect()
    }

    /// 本分组的选项
    pub fn option(&self, name: &str) -> Option<Arc<ConfigOption>> {
        self.options.read().get(name).cloned()
    }

    /// 按名称或弃用别名查找本分组的选项
    pub fn resolve_option(&self, name: &str) -> Option<Arc<ConfigOption>> {
        let options = self.options.read();
        options
            .get(name)
            .or_else(|| options.values().find(|option| option.answers_to(name)))
            .cloned()
    }

    /// 本分组的选项列表
    pub fn options(&self) -> Vec<Arc<ConfigOption>> {
        self.options.read().values().cloned().collect()
    }

    /// 读取本分组选项的值
    ///
    /// 选项不存在返回 [`ConfigError::UnknownOption`]，类型不符返回 [`ConfigError::TypeMismatch`]
    pub fn get<T: OptionType>(&self, name: &str) -> ConfigResult<T> {
        self.option(name)
            .ok_or_else(|| ConfigError::UnknownOption {
                name: join_name(&self.full_name, name, &self.separator),
            })?
            .get::<T>()
    }

    /// 深度优先（先序）遍历所有后代分组，不含自身
    pub fn all_groups(&self) -> GroupIter {
        let mut stack = self.groups();
        stack.reverse();
        GroupIter { stack }
    }

    /// 本分组及所有后代分组中的选项
    pub fn all_opts(&self) -> OptionIter {
        OptionIter {
            current: self.options().into_iter(),
            groups: self.all_groups(),
        }
    }

    /// 暴露为命令行参数的选项
    pub fn cli_opts(&self) -> impl Iterator<Item = Arc<ConfigOption>> {
        self.all_opts().filter(|option| option.is_cli())
    }

    /// 暴露为环境变量的选项
    pub fn env_opts(&self) -> impl Iterator<Item = Arc<ConfigOption>> {
        self.all_opts().filter(|option| option.is_env())
    }
}

/// 分组的惰性深度优先迭代器
#[derive(Debug)]
pub struct GroupIter {
    stack: Vec<Arc<OptionGroup>>,
}

impl Iterator for GroupIter {
    type Item = Arc<OptionGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        let group = self.stack.pop()?;
        self.stack.extend(group.groups().into_iter().rev());
        Some(group)
    }
}

/// 选项的惰性迭代器，逐个分组展开
#[derive(Debug)]
pub struct OptionIter {
    current: std::vec::IntoIter<Arc<ConfigOption>>,
    groups: GroupIter,
}

impl Iterator for OptionIter {
    type Item = Arc<ConfigOption>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(option) = self.current.next() {
                return Some(option);
            }
            self.current = self.groups.next()?.options().into_iter();
        }
    }
}
