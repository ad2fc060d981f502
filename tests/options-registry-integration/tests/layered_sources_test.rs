//! 多配置源叠加的集中集成测试

use anyhow::Result;
use options_abstractions::OptionValue;
use options_common::ConfigError;
use options_registry::{
    CliSource, ConfigOption, ConfigRegistry, EnvironmentSource, FileSource, MemorySource,
};
use serde_json::json;
use std::time::Duration;

fn declare(registry: &ConfigRegistry) -> Result<()> {
    registry.register_opts(vec![
        ConfigOption::builder::<bool>("debug").help("调试模式").build(),
        ConfigOption::builder::<Duration>("timeout")
            .default(Duration::from_secs(5))
            .build(),
    ])?;
    registry.group("server")?.register_opts(vec![
        ConfigOption::builder::<String>("host")
            .default("0.0.0.0".to_string())
            .build(),
        ConfigOption::builder::<u16>("port")
            .default(8080)
            .validator(|port| {
                if *port < 1024 {
                    Err(format!("端口 {port} 需要特权"))
                } else {
                    Ok(())
                }
            })
            .build(),
    ])?;
    registry
        .group("server.tls")?
        .register_opt(ConfigOption::builder::<Vec<String>>("ciphers").build())?;
    Ok(())
}

/// 测试默认值、文件、环境变量、命令行依次覆盖
#[test]
fn test_full_precedence_chain() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let toml_path = dir.path().join("app.toml");
    std::fs::write(
        &toml_path,
        r#"
timeout = "30s"

[server]
host = "toml.local"
port = 9000

[server.tls]
ciphers = ["AES128", "AES256"]
"#,
    )?;
    let json_path = dir.path().join("app.json");
    std::fs::write(&json_path, r#"{"server": {"host": "json.local", "port": 9100}}"#)?;

    let registry = ConfigRegistry::new();
    declare(&registry)?;
    registry.register_source(Box::new(CliSource::new([
        "app",
        "--server-port",
        "9300",
        "--debug",
    ])))?;
    registry.register_source(Box::new(EnvironmentSource::from_vars(
        "DEMO",
        [("DEMO_SERVER_HOST", "env.local"), ("DEMO_SERVER_PORT", "9200")],
    )))?;
    registry.register_source(Box::new(FileSource::new(&json_path)?))?;
    registry.register_source(Box::new(FileSource::new(&toml_path)?))?;
    registry.register_source(Box::new(MemorySource::from_value(
        "defaults",
        json!({"server": {"host": "memory.local"}}),
    )?))?;

    assert_eq!(
        registry.source_names(),
        vec![
            "defaults".to_string(),
            format!("file:{}", json_path.display()),
            format!("file:{}", toml_path.display()),
            "environment".to_string(),
            "cli".to_string(),
        ]
    );

    registry.load()?;

    assert!(registry.get::<bool>("debug")?);
    assert_eq!(registry.get::<Duration>("timeout")?, Duration::from_secs(30));
    assert_eq!(registry.get::<String>("server.host")?, "env.local");
    assert_eq!(registry.get::<u16>("server.port")?, 9300);
    assert_eq!(
        registry.get::<Vec<String>>("server.tls.ciphers")?,
        vec!["AES128".to_string(), "AES256".to_string()]
    );

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(snapshot.generation(), registry.generation());
    assert_eq!(snapshot.to_json()["values"]["server.port"], json!(9300));
    Ok(())
}

/// 测试一个配置源中的坏值不影响其他选项，且保留之前的值
#[test]
fn test_bad_value_keeps_previous_value() -> Result<()> {
    let registry = ConfigRegistry::new();
    declare(&registry)?;
    registry.set_value("server.port", 8443u64)?;

    registry.register_source(Box::new(MemorySource::from_value(
        "input",
        json!({"server": {"host": "ok.local", "port": 80}, "timeout": "soon"}),
    )?))?;

    let error = registry.load().unwrap_err();
    let mut failed: Vec<_> = error
        .causes()
        .iter()
        .filter_map(|cause| cause.option_name().map(str::to_string))
        .collect();
    failed.sort();
    assert_eq!(failed, vec!["server.port", "timeout"]);

    assert_eq!(registry.get::<String>("server.host")?, "ok.local");
    assert_eq!(registry.get::<u16>("server.port")?, 8443);
    assert_eq!(registry.get::<Duration>("timeout")?, Duration::from_secs(5));
    Ok(())
}

/// 测试 YAML 文件与带分隔符的键
#[test]
fn test_yaml_file_with_dotted_keys() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("app.yaml");
    std::fs::write(&path, "server.port: 7000\nserver:\n  tls:\n    ciphers: AES128, CHACHA20\n")?;

    let registry = ConfigRegistry::new();
    declare(&registry)?;
    registry.register_source(Box::new(FileSource::new(&path)?))?;
    registry.load()?;

    assert_eq!(registry.get::<u16>("server.port")?, 7000);
    assert_eq!(
        registry.snapshot().get("server.tls.ciphers"),
        Some(&OptionValue::List(vec![
            OptionValue::Text("AES128".to_string()),
            OptionValue::Text("CHACHA20".to_string()),
        ]))
    );
    Ok(())
}

/// 测试格式错误的文件使整个加载失败
#[test]
fn test_malformed_file_aborts_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{\"server\": ")?;

    let registry = ConfigRegistry::new();
    declare(&registry)?;
    registry.register_source(Box::new(MemorySource::from_value(
        "memory",
        json!({"debug": true}),
    )?))?;
    registry.register_source(Box::new(FileSource::new(&path)?))?;

    let error = registry.load().unwrap_err();
    assert!(matches!(error, ConfigError::Load { .. }));
    assert!(!registry.get::<bool>("debug")?);
    assert_eq!(registry.generation(), 0);
    Ok(())
}

/// 测试命令行帮助信息列出所有参数
#[test]
fn test_cli_help_lists_flags() -> Result<()> {
    let registry = ConfigRegistry::new();
    declare(&registry)?;
    registry.register_source(Box::new(CliSource::new(["demo", "--help"])))?;

    let error = registry.load().unwrap_err();
    assert!(error.is_help_request());
    let usage = error.to_string();
    for flag in ["--debug", "--timeout", "--server-host", "--server-port", "--server-tls-ciphers"] {
        assert!(usage.contains(flag), "帮助信息缺少 {flag}: {usage}");
    }
    Ok(())
}
