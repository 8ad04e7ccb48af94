// 该文件是 Yishang （衣裳） 项目的一部分。
// src/model.rs - 分类模型
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

use crate::frame::ImageTensor;

/// 预训练分类模型
///
/// `infer` 输出与标签表按位置一一对应的概率向量（通常为 softmax 输出），
/// 调用方不会再做归一化。
pub trait Classifier {
  type Error: std::error::Error + Send + Sync + 'static;

  fn infer(&self, input: &ImageTensor) -> Result<Vec<f32>, Self::Error>;

  /// 模型输出的类别数，无法静态确定时返回 `None`
  fn num_classes(&self) -> Option<usize> {
    None
  }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
  type Error = C::Error;

  fn infer(&self, input: &ImageTensor) -> Result<Vec<f32>, Self::Error> {
    (**self).infer(input)
  }

  fn num_classes(&self) -> Option<usize> {
    (**self).num_classes()
  }
}

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxClassifier, OnnxClassifierBuilder, OnnxClassifierError};
