// 该文件是 Yishang （衣裳） 项目的一部分。
// src/output.rs - 输出定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, url_file_path};

pub trait Render<Output>: Sized {
  type Error;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("路径编码无效: {0}")]
  PathEncoding(#[from] std::string::FromUtf8Error),
}

const STDOUT_SCHEME: &str = "stdout";
const JSON_FILE_SCHEME: &str = "json";

/// 以 JSON 形式输出结果，`stdout:` 打印到标准输出，`json:///path/out.json` 写入文件
#[derive(Debug, Clone, PartialEq)]
pub enum JsonOutput {
  Stdout,
  File(PathBuf),
}

impl FromUrl for JsonOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      STDOUT_SCHEME => Ok(JsonOutput::Stdout),
      JSON_FILE_SCHEME => Ok(JsonOutput::File(url_file_path(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl<T: Serialize> Render<T> for JsonOutput {
  type Error = OutputError;

  fn render_result(&self, result: &T) -> Result<(), Self::Error> {
    let json = serde_json::to_string_pretty(result)?;
    match self {
      JsonOutput::Stdout => {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
      }
      JsonOutput::File(path) => {
        if let Some(parent) = path.parent() {
          if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
          }
        }
        std::fs::write(path, json)?;
        info!("结果已写入: {}", path.display());
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_output_urls() {
    assert_eq!(
      JsonOutput::from_url(&Url::parse("stdout:").unwrap()).unwrap(),
      JsonOutput::Stdout
    );
    assert_eq!(
      JsonOutput::from_url(&Url::parse("json:///tmp/out.json").unwrap()).unwrap(),
      JsonOutput::File(PathBuf::from("/tmp/out.json"))
    );
    assert_eq!(
      JsonOutput::from_url(&Url::parse("json:///tmp/a%20b/%E7%BB%93%E6%9E%9C.json").unwrap()).unwrap(),
      JsonOutput::File(PathBuf::from("/tmp/a b/结果.json"))
    );
    assert!(matches!(
      JsonOutput::from_url(&Url::parse("folder:///tmp").unwrap()),
      Err(OutputError::SchemeMismatch)
    ));
  }

  #[test]
  fn writes_json_file_creating_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("result.json");
    let output = JsonOutput::File(path.clone());

    output
      .render_result(&serde_json::json!({"predicted": "topwear"}))
      .unwrap();

    let written: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["predicted"], "topwear");
  }
}
