// 该文件是 Yishang （衣裳） 项目的一部分。
// src/service.rs - 推理服务
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

use image::RgbImage;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  error::{ArtifactError, ServiceError},
  frame::ImageTensor,
  input::ImageUpload,
  labels::LabelMap,
  model::Classifier,
  palette::{DEFAULT_PALETTE_COLORS, Palette, PaletteExtractor, PaletteOptions},
  preprocess::{Normalization, Preprocessor},
};

/// 类别名称到概率的映射，顺序与标签表一致
pub type ProbabilityMap = IndexMap<String, f32>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
  pub label: String,
  pub confidence: f32,
  pub probabilities: ProbabilityMap,
}

/// 单次请求的完整结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResponse {
  pub predicted: String,
  pub confidence: f32,
  pub probabilities: ProbabilityMap,
  pub palette: Palette,
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
  pub normalization: Normalization,
  pub palette_colors: usize,
  pub palette: PaletteOptions,
}

impl Default for ServiceOptions {
  fn default() -> Self {
    Self {
      normalization: Normalization::default(),
      palette_colors: DEFAULT_PALETTE_COLORS,
      palette: PaletteOptions::default(),
    }
  }
}

/// 启动时构造一次的推理上下文，之后只读，可在请求间共享引用
pub struct InferenceContext<C> {
  classifier: C,
  labels: LabelMap,
  preprocessor: Preprocessor,
  palette: PaletteExtractor,
  palette_colors: usize,
}

impl<C: Classifier> InferenceContext<C> {
  pub fn new(classifier: C, labels: LabelMap, options: ServiceOptions) -> Result<Self, ArtifactError> {
    if let Some(outputs) = classifier.num_classes() {
      if outputs != labels.len() {
        warn!(
          "模型输出类别数 {} 与标签数 {} 不一致",
          outputs,
          labels.len()
        );
        return Err(ArtifactError::ClassCountMismatch {
          outputs,
          labels: labels.len(),
        });
      }
    }

    info!(
      "推理上下文就绪: {} 个类别 {:?}, 调色板颜色数 {}",
      labels.len(),
      labels.names(),
      options.palette_colors
    );

    Ok(Self {
      classifier,
      labels,
      preprocessor: Preprocessor::default().with_normalization(options.normalization),
      palette: PaletteExtractor::new(options.palette),
      palette_colors: options.palette_colors,
    })
  }

  pub fn labels(&self) -> &LabelMap {
    &self.labels
  }

  pub fn classifier(&self) -> &C {
    &self.classifier
  }

  pub fn preprocess(&self, bytes: &[u8]) -> Result<(RgbImage, ImageTensor), ServiceError> {
    Ok(self.preprocessor.preprocess(bytes)?)
  }

  /// 推理并按位置将输出与标签配对
  pub fn predict(&self, tensor: &ImageTensor) -> Result<PredictionResult, ServiceError> {
    let scores = self
      .classifier
      .infer(tensor)
      .map_err(ServiceError::inference)?;

    if scores.len() != self.labels.len() {
      return Err(
        ArtifactError::ClassCountMismatch {
          outputs: scores.len(),
          labels: self.labels.len(),
        }
        .into(),
      );
    }

    if let Some(bad) = scores.iter().find(|score| !score.is_finite()) {
      return Err(ServiceError::inference(format!(
        "模型输出包含非有限值 {}: {:?}",
        bad, scores
      )));
    }

    // 并列时取第一个
    let mut best = 0usize;
    for (idx, score) in scores.iter().enumerate().skip(1) {
      if *score > scores[best] {
        best = idx;
      }
    }

    let probabilities: ProbabilityMap = self
      .labels
      .names()
      .iter()
      .cloned()
      .zip(scores.iter().copied())
      .collect();

    let result = PredictionResult {
      label: self.labels.names()[best].clone(),
      confidence: scores[best],
      probabilities,
    };
    debug!("预测结果: {} ({:.4})", result.label, result.confidence);
    Ok(result)
  }

  /// 提取调色板，失败时退化为空调色板
  pub fn palette(&self, image: &RgbImage) -> Palette {
    match self.palette.extract(image, self.palette_colors) {
      Ok(palette) => palette,
      Err(e) => {
        warn!("调色板提取失败，返回空调色板: {}", e);
        Palette::new()
      }
    }
  }

  /// 完整的请求处理流程
  pub fn classify(&self, upload: &ImageUpload) -> Result<ClassificationResponse, ServiceError> {
    let content_type = upload.validate()?;
    debug!(
      "处理上传图像: {} 字节, 类型 {:?}",
      upload.bytes.len(),
      content_type
    );

    let now = std::time::Instant::now();
    let (image, tensor) = self.preprocess(&upload.bytes)?;
    let prediction = self.predict(&tensor)?;
    let elapsed = now.elapsed();
    info!(
      "推理完成，耗时: {:.2?}，结果: {} ({:.2}%)",
      elapsed,
      prediction.label,
      prediction.confidence * 100.0
    );

    let palette = self.palette(&image);
    debug!("调色板提取完成，耗时: {:.2?}", now.elapsed() - elapsed);

    Ok(ClassificationResponse {
      predicted: prediction.label,
      confidence: prediction.confidence,
      probabilities: prediction.probabilities,
      palette,
    })
  }
}
