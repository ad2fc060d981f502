//! 名称约定
//!
//! 选项与分组的名称校验、全名拼接以及命令行/环境变量名称映射

use crate::errors::{ConfigError, ConfigResult};

/// 默认的分组分隔符
pub const DEFAULT_SEPARATOR: &str = ".";

/// 校验单个名称段
///
/// 名称必须非空、不包含分隔符，且仅由 ASCII 字母、数字、`_`、`-` 组成
pub fn validate_name(name: &str, separator: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::invalid_name(name, "名称不能为空"));
    }
    if !separator.is_empty() && name.contains(separator) {
        return Err(ConfigError::invalid_name(
            name,
            format!("名称不能包含分隔符 {separator:?}"),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(ConfigError::invalid_name(
            name,
            format!("包含非法字符 {bad:?}"),
        ));
    }
    Ok(())
}

/// 拼接全名，根分组（空全名）不贡献任何前缀
pub fn join_name(parent: &str, name: &str, separator: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}{separator}{name}")
    }
}

/// 拆分路径并逐段校验
pub fn split_path<'a>(path: &'a str, separator: &str) -> ConfigResult<Vec<&'a str>> {
    if path.is_empty() {
        return Err(ConfigError::invalid_name(path, "路径不能为空"));
    }
    let segments: Vec<&str> = path.split(separator).collect();
    for segment in &segments {
        validate_name(segment, separator)?;
    }
    Ok(segments)
}

/// 拆分选项全名为（分组路径, 选项名）
pub fn split_option_path<'a>(full_name: &'a str, separator: &str) -> (&'a str, &'a str) {
    match full_name.rfind(separator) {
        Some(idx) if !separator.is_empty() => {
            (&full_name[..idx], &full_name[idx + separator.len()..])
        }
        _ => ("", full_name),
    }
}

/// 由选项全名生成命令行长参数名
///
/// 分隔符替换为 `-`；`translate_underscores` 为真时 `_` 同样替换为 `-`
pub fn flag_name(full_name: &str, separator: &str, translate_underscores: bool) -> String {
    let flag = full_name.replace(separator, "-");
    if translate_underscores {
        flag.replace('_', "-")
    } else {
        flag
    }
}

/// 由选项全名生成环境变量名
///
/// 例如前缀 `APP`、全名 `db.pool.max_size` 得到 `APP_DB_POOL_MAX_SIZE`
pub fn env_key(prefix: &str, full_name: &str, separator: &str, env_separator: &str) -> String {
    let body = full_name
        .replace(separator, env_separator)
        .replace('-', "_")
        .to_uppercase();
    if prefix.is_empty() {
        body
    } else {
        format!("{prefix}{env_separator}{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_rejects_empty_and_separator() {
        assert!(validate_name("port", ".").is_ok());
        assert!(validate_name("max_size", ".").is_ok());
        assert!(matches!(
            validate_name("", "."),
            Err(ConfigError::InvalidName { .. })
        ));
        assert!(matches!(
            validate_name("a.b", "."),
            Err(ConfigError::InvalidName { .. })
        ));
        assert!(validate_name("a b", ".").is_err());
    }

    #[test]
    fn test_join_name_root_contributes_nothing() {
        assert_eq!(join_name("", "db", "."), "db");
        assert_eq!(join_name("db", "pool", "."), "db.pool");
        assert_eq!(join_name("db", "pool", "/"), "db/pool");
    }

    #[test]
    fn test_split_path_validates_every_segment() {
        assert_eq!(split_path("a.b.c", ".").unwrap(), vec!["a", "b", "c"]);
        assert!(split_path("a..c", ".").is_err());
        assert!(split_path("", ".").is_err());
    }

    #[test]
    fn test_split_option_path() {
        assert_eq!(split_option_path("group1.group2.opt3", "."), ("group1.group2", "opt3"));
        assert_eq!(split_option_path("opt", "."), ("", "opt"));
    }

    #[test]
    fn test_flag_and_env_names() {
        assert_eq!(flag_name("db.max_conn", ".", false), "db-max_conn");
        assert_eq!(flag_name("db.max_conn", ".", true), "db-max-conn");
        assert_eq!(env_key("APP", "db.max_conn", ".", "_"), "APP_DB_MAX_CONN");
        assert_eq!(env_key("", "debug", ".", "_"), "DEBUG");
    }
}
