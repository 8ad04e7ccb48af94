// 该文件是 Yishang （衣裳） 项目的一部分。
// src/error.rs - 服务错误定义
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

use thiserror::Error;

use crate::{input::InputError, labels::LabelMapError, preprocess::PreprocessError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 模型或标签文件错误，启动阶段出现即不能提供服务
#[derive(Error, Debug)]
pub enum ArtifactError {
  #[error("标签表错误: {0}")]
  Labels(#[from] LabelMapError),
  #[error("模型错误: {0}")]
  Model(BoxError),
  #[error("模型输出类别数 {outputs} 与标签数 {labels} 不一致")]
  ClassCountMismatch { outputs: usize, labels: usize },
}

impl ArtifactError {
  pub fn model<E: Into<BoxError>>(err: E) -> Self {
    ArtifactError::Model(err.into())
  }
}

#[derive(Error, Debug)]
pub enum ServiceError {
  #[error("模型或标签文件错误: {0}")]
  Artifact(#[from] ArtifactError),
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
  #[error("图像解码错误: {0}")]
  Decode(#[from] PreprocessError),
  #[error("推理错误: {0}")]
  Inference(BoxError),
}

impl From<LabelMapError> for ServiceError {
  fn from(err: LabelMapError) -> Self {
    ServiceError::Artifact(ArtifactError::Labels(err))
  }
}

impl ServiceError {
  pub fn inference<E: Into<BoxError>>(err: E) -> Self {
    ServiceError::Inference(err.into())
  }

  /// 由请求内容导致的错误，对应 HTTP 400
  pub fn is_client_error(&self) -> bool {
    matches!(self, ServiceError::Input(_) | ServiceError::Decode(_))
  }
}
