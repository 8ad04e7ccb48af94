// 该文件是 Yishang （衣裳） 项目的一部分。
// src/labels.rs - 类别标签表
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

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelMapError {
  #[error("标签文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  Malformed(#[from] serde_json::Error),
  #[error("标签索引不是非负整数: {0:?}")]
  InvalidIndex(String),
  #[error("标签索引重复: {0}")]
  DuplicateIndex(u32),
  #[error("标签索引不连续: 期望 {expected}, 实际 {actual}")]
  IndexGap { expected: u32, actual: u32 },
  #[error("标签名称重复: {0}")]
  DuplicateName(String),
  #[error("标签表为空")]
  Empty,
}

/// 类别标签表，第 i 个名称对应模型输出向量的第 i 个分量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
  names: Box<[String]>,
}

impl LabelMap {
  /// 从 JSON 文件加载标签表，文件内容形如 `{"0": "bottomwear", "1": "topwear"}`
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelMapError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let labels = Self::from_json_str(&content)?;
    info!("标签加载完成，共 {} 个类别", labels.len());
    Ok(labels)
  }

  pub fn from_json_str(content: &str) -> Result<Self, LabelMapError> {
    let raw: BTreeMap<String, String> = serde_json::from_str(content)?;

    let mut indexed = raw
      .into_iter()
      .map(|(key, name)| {
        key
          .trim()
          .parse::<u32>()
          .map(|id| (id, name))
          .map_err(|_| LabelMapError::InvalidIndex(key))
      })
      .collect::<Result<Vec<_>, _>>()?;
    indexed.sort_by_key(|(id, _)| *id);

    if indexed.is_empty() {
      return Err(LabelMapError::Empty);
    }

    let mut names = Vec::with_capacity(indexed.len());
    for (expected, (id, name)) in indexed.into_iter().enumerate() {
      let expected = expected as u32;
      if id < expected {
        return Err(LabelMapError::DuplicateIndex(id));
      }
      if id > expected {
        return Err(LabelMapError::IndexGap {
          expected,
          actual: id,
        });
      }
      debug!("类别 {} -> {}", id, name);
      names.push(name);
    }

    Self::from_names(names)
  }

  /// 直接以有序名称构造
  pub fn from_names<I, S>(names: I) -> Result<Self, LabelMapError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let names: Box<[String]> = names.into_iter().map(Into::into).collect();
    if names.is_empty() {
      return Err(LabelMapError::Empty);
    }

    // 概率表以名称为键，重复名称会互相覆盖
    let duplicate = {
      let mut seen = HashSet::with_capacity(names.len());
      names.iter().find(|name| !seen.insert(name.as_str())).cloned()
    };
    if let Some(dup) = duplicate {
      return Err(LabelMapError::DuplicateName(dup));
    }

    Ok(Self { names })
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn name(&self, id: usize) -> Option<&str> {
    self.names.get(id).map(String::as_str)
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
    self.names.iter().map(String::as_str).enumerate()
  }
}
