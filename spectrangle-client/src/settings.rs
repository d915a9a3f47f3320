//! 客户端设置
//!
//! 依次应用：默认值 → 可选 JSON 文件（`--config`）→ 环境变量 → 命令行参数。

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use protocol::{validate_name, Preference, ProtocolError, DEFAULT_PORT};

/// 服务器地址的环境变量
pub const HOST_ENV: &str = "SPECTRANGLE_HOST";
/// 服务器端口的环境变量
pub const PORT_ENV: &str = "SPECTRANGLE_PORT";
/// 昵称的环境变量
pub const NAME_ENV: &str = "SPECTRANGLE_NAME";

/// 设置错误
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Invalid player count: {0} (expected 2, 3, 4, -1 or \"any\")")]
    InvalidPreference(String),

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid name: {0}")]
    InvalidName(#[from] ProtocolError),
}

/// 客户端设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 服务器地址
    pub host: String,
    /// 服务器端口
    pub port: u16,
    /// 昵称
    pub name: String,
    /// 人数偏好
    pub preference: Preference,
    /// 由电脑策略代为走子
    pub computer: bool,
    /// 电脑策略的随机种子
    pub seed: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            name: "player".to_string(),
            preference: Preference::Any,
            computer: false,
            seed: None,
        }
    }
}

/// 解析人数偏好：2、3、4、-1 或 "any"
pub fn parse_preference(value: &str) -> Result<Preference, SettingsError> {
    if value.trim().eq_ignore_ascii_case("any") {
        return Ok(Preference::Any);
    }
    value
        .parse()
        .map_err(|_| SettingsError::InvalidPreference(value.to_string()))
}

impl ClientConfig {
    /// 从进程环境和命令行加载
    pub fn load() -> anyhow::Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let mut config = match config_path(&args) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_args(args)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式无效: {}", path.display()))?;
        Ok(config)
    }

    /// 用环境变量覆盖
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.port = parse_port(&port)?;
        }
        if let Some(name) = lookup(NAME_ENV) {
            self.name = name;
        }
        Ok(())
    }

    /// 用命令行参数覆盖
    ///
    /// `--host H --port P --name N --players X --computer --seed S --config FILE`
    pub fn apply_args<I>(&mut self, args: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .ok_or_else(|| SettingsError::MissingValue(flag.clone()))
            };
            match flag.as_str() {
                "--host" => self.host = value()?,
                "--port" => self.port = parse_port(&value()?)?,
                "--name" => self.name = value()?,
                "--players" => self.preference = parse_preference(&value()?)?,
                "--computer" => self.computer = true,
                "--seed" => {
                    let seed = value()?;
                    self.seed = Some(
                        seed.parse()
                            .map_err(|_| SettingsError::InvalidSeed(seed.clone()))?,
                    );
                }
                // 已在加载时处理
                "--config" => {
                    value()?;
                }
                _ => return Err(SettingsError::UnknownArgument(flag.clone())),
            }
        }
        Ok(())
    }

    /// 校验昵称
    pub fn validate(&mut self) -> Result<(), SettingsError> {
        self.name = self.name.trim().to_string();
        validate_name(&self.name)?;
        Ok(())
    }

    /// 服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(value: &str) -> Result<u16, SettingsError> {
    match value.trim().parse() {
        Ok(0) | Err(_) => Err(SettingsError::InvalidPort(value.to_string())),
        Ok(port) => Ok(port),
    }
}

fn config_path(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|arg| arg == "--config")
        .and_then(|pos| args.get(pos + 1))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_args() {
        let mut config = ClientConfig::default();
        config
            .apply_args(args(&[
                "--host", "10.0.0.2", "--port", "7000", "--name", "alice", "--players", "3",
                "--computer", "--seed", "9",
            ]))
            .unwrap();
        assert_eq!(config.addr(), "10.0.0.2:7000");
        assert_eq!(config.name, "alice");
        assert_eq!(config.preference, Preference::Exactly(3));
        assert!(config.computer);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_preference_values() {
        assert_eq!(parse_preference("any").unwrap(), Preference::Any);
        assert_eq!(parse_preference("ANY").unwrap(), Preference::Any);
        assert_eq!(parse_preference("-1").unwrap(), Preference::Any);
        assert_eq!(parse_preference("4").unwrap(), Preference::Exactly(4));

        let err = parse_preference("5").unwrap_err();
        assert!(err.to_string().contains("expected 2, 3, 4, -1"));
    }

    #[test]
    fn test_bad_args() {
        let mut config = ClientConfig::default();
        assert!(matches!(
            config.apply_args(args(&["--port"])),
            Err(SettingsError::MissingValue(_))
        ));
        assert!(matches!(
            config.apply_args(args(&["--port", "0"])),
            Err(SettingsError::InvalidPort(_))
        ));
        assert!(matches!(
            config.apply_args(args(&["--fast"])),
            Err(SettingsError::UnknownArgument(_))
        ));
    }

    #[test]
    fn test_env_then_validate() {
        let mut config = ClientConfig::default();
        config
            .apply_env(|key| (key == NAME_ENV).then(|| " bob ".to_string()))
            .unwrap();
        config.validate().unwrap();
        assert_eq!(config.name, "bob");

        config.name = "a,b".to_string();
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidName(ProtocolError::NameReserved(',')))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "name": "carol", "computer": true }}"#).unwrap();
        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.name, "carol");
        assert!(config.computer);
        assert_eq!(config.port, 6666);

        let path = file.path().to_string_lossy().to_string();
        let list = args(&["--name", "x", "--config", &path]);
        assert_eq!(config_path(&list), Some(path.as_str()));
    }
}
