//! # 选项注册表演示程序
//!
//! 声明一组分层选项，依次从内存默认值、配置文件、环境变量和命令行加载，
//! 打印快照；带 `--watch` 运行时监控配置文件并在变化后自动重载。
//!
//! ```text
//! DEMO_SERVER_PORT=9000 options-demo --server-host 0.0.0.0 --features a --features b
//! DEMO_CONFIG=demo.toml options-demo --watch
//! ```

use anyhow::Context;
use options_abstractions::{ConfigChangeEvent, ConfigEventListener};
use options_registry::{
    ConfigFileWatcher, ConfigOption, ConfigRegistry, CliSource, EnvironmentSource, FileSource,
    MemorySource,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// 默认配置文件路径，可通过 `DEMO_CONFIG` 覆盖
const DEFAULT_CONFIG_FILE: &str = "demo.toml";

/// 把选项更新写入日志
struct LoggingListener;

impl ConfigEventListener for LoggingListener {
    fn on_config_changed(&self, event: &ConfigChangeEvent) {
        info!("选项变更 {}", event);
    }

    fn name(&self) -> &str {
        "logging-listener"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let registry = Arc::new(ConfigRegistry::new());
    declare_options(&registry)?;
    registry.add_listener(Arc::new(LoggingListener));

    let config_file =
        std::env::var("DEMO_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    register_sources(&registry, &config_file)?;

    if let Err(error) = registry.load() {
        if error.is_help_request() || error.is_version_request() {
            println!("{}", error.innermost());
            return Ok(());
        }
        return Err(error).context("加载配置失败");
    }

    let snapshot = registry.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot.to_json())?);

    let port: u16 = registry.get("server.port")?;
    let timeout: Duration = registry.get("server.timeout")?;
    info!("服务地址 {}:{}，超时 {:?}", registry.get::<String>("server.host")?, port, timeout);

    if registry.get::<bool>("watch")? {
        watch(registry, &config_file).await?;
    }
    Ok(())
}

/// 声明演示用选项
fn declare_options(registry: &ConfigRegistry) -> anyhow::Result<()> {
    registry.register_opts(vec![
        ConfigOption::builder::<bool>("debug")
            .short('d')
            .help("输出调试信息")
            .build(),
        ConfigOption::builder::<bool>("watch")
            .env(false)
            .help("监控配置文件并自动重载")
            .build(),
        ConfigOption::builder::<Vec<String>>("features")
            .help("启用的特性列表")
            .build(),
    ])?;

    let server = registry.group("server")?;
    server.register_opts(vec![
        ConfigOption::builder::<String>("host")
            .default("127.0.0.1".to_string())
            .help("监听地址")
            .build(),
        ConfigOption::builder::<u16>("port")
            .default(8080)
            .short('p')
            .help("监听端口")
            .validator(|port: &u16| {
                if *port == 0 {
                    Err("端口不能为 0".to_string())
                } else {
                    Ok(())
                }
            })
            .build(),
        ConfigOption::builder::<Duration>("timeout")
            .default(Duration::from_secs(30))
            .help("请求超时")
            .build(),
    ])?;

    registry.group("server.tls")?.register_opts(vec![
        ConfigOption::builder::<bool>("enabled").help("启用 TLS").build(),
        ConfigOption::builder::<String>("cert_file")
            .help("证书路径")
            .deprecated_name("cert")
            .build(),
    ])?;
    Ok(())
}

/// 注册配置源：内存 < 文件 < 环境变量 < 命令行
fn register_sources(registry: &ConfigRegistry, config_file: &str) -> anyhow::Result<()> {
    let defaults = MemorySource::from_value(
        "defaults",
        serde_json::json!({ "features": ["metrics"] }),
    )?;
    registry.register_source(Box::new(defaults))?;
    registry.register_source(Box::new(
        FileSource::new(config_file).with_context(|| format!("不支持的配置文件: {config_file}"))?,
    ))?;
    registry.register_source(Box::new(EnvironmentSource::new("DEMO")))?;
    registry.register_source(Box::new(
        CliSource::from_env()
            .with_version(env!("CARGO_PKG_VERSION"))
            .with_about("Lorn Options 演示程序")
            .translate_underscores(true),
    ))?;
    Ok(())
}

/// 监控配置文件直到收到 Ctrl-C
async fn watch(registry: Arc<ConfigRegistry>, config_file: &str) -> anyhow::Result<()> {
    let mut watcher = ConfigFileWatcher::new(registry)
        .with_debounce_delay(Duration::from_millis(300));
    watcher.add_watch_path(config_file)?;
    if let Err(e) = watcher.start_watching() {
        warn!("无法监控 {}: {}", config_file, e);
        return Ok(());
    }
    let mut results = watcher.subscribe();

    let loop_handle = tokio::spawn(watcher.run());
    info!("正在监控 {}，按 Ctrl-C 退出", config_file);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(event) = results.recv() => {
                info!("重载完成: {}", event);
            }
        }
    }
    loop_handle.abort();
    info!("演示程序退出");
    Ok(())
}
