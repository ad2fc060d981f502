//! 命令行配置源

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, Command};
use options_abstractions::{ConfigSource, OptionDescriptor, RawValue, SourceContext};
use options_common::{flag_name, ConfigError, ConfigResult, NameKind};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// 命令行参数与选项的对应关系
#[derive(Debug, Clone)]
struct FlagBinding {
    id: String,
    group: String,
    name: String,
    list: bool,
}

/// 命令行配置源
///
/// 根据已注册选项构建 [`clap::Command`]：长参数名为选项全名（分隔符替换为 `-`），
/// 布尔选项接受 `--flag` 与 `--flag=false`，序列选项可重复出现。
/// `pre` 阶段检查参数名冲突，`parse` 阶段只暂存命令行上实际出现的参数。
pub struct CliSource {
    program: String,
    args: Vec<String>,
    priority: i32,
    version: Option<String>,
    about: Option<String>,
    translate_underscores: bool,
    bindings: Vec<FlagBinding>,
}

impl std::fmt::Debug for CliSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliSource")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("priority", &self.priority)
            .field("version", &self.version)
            .field("translate_underscores", &self.translate_underscores)
            .field("bindings_count", &self.bindings.len())
            .finish()
    }
}

impl CliSource {
    /// 创建命令行配置源，第一个参数为程序名
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let program = args.first().cloned().unwrap_or_else(|| "app".to_string());
        Self {
            program,
            args,
            priority: 300,
            version: None,
            about: None,
            translate_underscores: false,
            bindings: Vec::new(),
        }
    }

    /// 读取进程命令行参数
    pub fn from_env() -> Self {
        Self::new(std::env::args())
    }

    /// 设置版本号，同时启用 `--version`
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// 设置程序说明
    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// 长参数名中的 `_` 是否替换为 `-`
    pub fn translate_underscores(mut self, translate: bool) -> Self {
        self.translate_underscores = translate;
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 选项全名对应的长参数名（不含 `--`）
    pub fn flag_for(&self, full_name: &str, separator: &str) -> String {
        flag_name(full_name, separator, self.translate_underscores)
    }

    fn build_command(
        &self,
        options: &[OptionDescriptor],
        separator: &str,
    ) -> ConfigResult<(Command, Vec<FlagBinding>)> {
        let mut command = Command::new(self.program.clone());
        let mut longs: HashSet<String> = HashSet::from(["help".to_string()]);
        let mut shorts: HashSet<char> = HashSet::from(['h']);
        if let Some(version) = &self.version {
            command = command.version(version.clone());
            longs.insert("version".to_string());
            shorts.insert('V');
        }
        if let Some(about) = &self.about {
            command = command.about(about.clone());
        }

        let mut bindings = Vec::new();
        for descriptor in options.iter().filter(|d| d.cli) {
            let flag = self.flag_for(&descriptor.full_name, separator);
            if !longs.insert(flag.clone()) {
                return Err(ConfigError::DuplicateName {
                    kind: NameKind::Option,
                    name: format!("--{flag}"),
                    group: descriptor.group.clone(),
                });
            }

            let help = if descriptor.default == descriptor.kind.zero() {
                descriptor.help.clone()
            } else {
                format!("{} [默认: {}]", descriptor.help, descriptor.default)
            };
            let mut arg = Arg::new(flag.clone())
                .long(flag.clone())
                .help(help)
                .value_name(descriptor.kind.element().name().to_uppercase());
            if let Some(short) = descriptor.short {
                if !shorts.insert(short) {
                    return Err(ConfigError::DuplicateName {
                        kind: NameKind::Option,
                        name: format!("-{short}"),
                        group: descriptor.group.clone(),
                    });
                }
                arg = arg.short(short);
            }
            arg = if descriptor.kind.is_bool() {
                arg.action(ArgAction::Set)
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true")
            } else if descriptor.kind.is_list() {
                arg.action(ArgAction::Append)
            } else {
                arg.action(ArgAction::Set)
            };
            command = command.arg(arg);
            bindings.push(FlagBinding {
                id: flag,
                group: descriptor.group.clone(),
                name: descriptor.name.clone(),
                list: descriptor.kind.is_list(),
            });
        }
        Ok((command, bindings))
    }

    /// 解析参数，返回（选项所在分组, 选项名, 原始值）
    fn matched_values(&self, command: Command) -> ConfigResult<Vec<(String, String, Value)>> {
        let matches = command
            .try_get_matches_from(&self.args)
            .map_err(translate_error)?;
        let mut values = Vec::new();
        for binding in &self.bindings {
            if matches.value_source(&binding.id) != Some(ValueSource::CommandLine) {
                continue;
            }
            let mut raw: Vec<String> = matches
                .try_get_many::<String>(&binding.id)
                .map_err(|e| ConfigError::invariant(format!("读取参数 {} 失败: {e}", binding.id)))?
                .map(|found| found.cloned().collect())
                .unwrap_or_default();
            let value = if binding.list && raw.len() != 1 {
                Value::Array(raw.into_iter().map(Value::String).collect())
            } else {
                raw.pop().map_or(Value::Null, Value::String)
            };
            values.push((binding.group.clone(), binding.name.clone(), value));
        }
        Ok(values)
    }
}

fn translate_error(error: clap::Error) -> ConfigError {
    let rendered = error.render().to_string();
    match error.kind() {
        ErrorKind::DisplayVersion => ConfigError::VersionRequested {
            version: rendered.trim_end().to_string(),
        },
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            ConfigError::HelpRequested { usage: rendered }
        }
        _ => ConfigError::Decode {
            format: "cli".to_string(),
            message: rendered.trim_end().to_string(),
        },
    }
}

impl ConfigSource for CliSource {
    fn name(&self) -> &str {
        "cli"
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn pre(&mut self, ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        let (_, bindings) = self.build_command(&ctx.options(), ctx.separator())?;
        debug!("命令行解析器已构建: {} 个参数", bindings.len());
        self.bindings = bindings;
        Ok(())
    }

    fn parse(&mut self, ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        let (command, bindings) = self.build_command(&ctx.options(), ctx.separator())?;
        self.bindings = bindings;
        for (group, name, value) in self.matched_values(command)? {
            ctx.stage(&group, &name, RawValue::Json(value))?;
        }
        Ok(())
    }

    fn post(&mut self, _ctx: &mut dyn SourceContext) -> ConfigResult<()> {
        self.bindings.clear();
        Ok(())
    }
}
