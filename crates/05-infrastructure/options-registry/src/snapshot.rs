//! 配置快照

use indexmap::IndexMap;
use options_abstractions::OptionValue;
use serde_json::{json, Map, Value};

/// 某一代数下全部选项值的一致性拷贝
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    generation: u64,
    values: IndexMap<String, OptionValue>,
}

impl Snapshot {
    pub(crate) fn new(generation: u64, values: IndexMap<String, OptionValue>) -> Self {
        Self { generation, values }
    }

    /// 拍摄快照时的代数
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 按全名读取
    pub fn get(&self, full_name: &str) -> Option<&OptionValue> {
        self.values.get(full_name)
    }

    /// 选项数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按注册顺序遍历（全名, 值）
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// 全部值
    pub fn values(&self) -> &IndexMap<String, OptionValue> {
        &self.values
    }

    /// 转换为 JSON：`{"generation": n, "values": {全名: 值}}`
    pub fn to_json(&self) -> Value {
        let values: Map<String, Value> = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        json!({
            "generation": self.generation,
            "values": values,
        })
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a OptionValue);
    type IntoIter = indexmap::map::Iter<'a, String, OptionValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
