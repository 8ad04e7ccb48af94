// 该文件是 Yishang （衣裳） 项目的一部分。
// src/model/onnx.rs - ONNX 分类模型
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

use std::io::Cursor;

use thiserror::Error;
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{CLASSIFIER_INPUT_SIZE, ImageTensor, TensorLayout},
  model::Classifier,
};

const ONNX_NUM_INPUTS: usize = 1;
const ONNX_SCHEME: &str = "onnx";

type OnnxPlan = TypedRunnableModel<TypedModel>;

pub struct OnnxClassifier {
  plan: OnnxPlan,
  layout: TensorLayout,
  num_classes: Option<usize>,
}

#[derive(Error, Debug)]
pub enum OnnxClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, anyhow::Error),
  #[error("推理错误: {0}")]
  InferenceError(anyhow::Error),
  #[error("模型输出为空")]
  EmptyOutput,
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl OnnxClassifierError {
  pub fn invalid(msg: &str, e: anyhow::Error) -> Self {
    OnnxClassifierError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct OnnxClassifierBuilder {
  model_path: String,
  layout: TensorLayout,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = ONNX_SCHEME;
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = OnnxClassifierError;

  /// `onnx:///models/final_model.onnx?layout=nchw`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut layout = TensorLayout::default();
    for (k, v) in url.query_pairs() {
      if k == "layout" {
        layout = v
          .parse()
          .map_err(|e| OnnxClassifierError::ModelPathError(format!("{}", e)))?;
      }
    }

    let model_path = crate::url_file_path(url)
      .map_err(|e| OnnxClassifierError::ModelPathError(format!("{}", e)))?;

    Ok(OnnxClassifierBuilder {
      model_path: model_path.to_string_lossy().into_owned(),
      layout,
    })
  }
}

impl OnnxClassifierBuilder {
  pub fn new(model_path: impl Into<String>) -> Self {
    OnnxClassifierBuilder {
      model_path: model_path.into(),
      layout: TensorLayout::default(),
    }
  }

  pub fn layout(mut self, layout: TensorLayout) -> Self {
    self.layout = layout;
    self
  }

  pub fn build(self) -> Result<OnnxClassifier, OnnxClassifierError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = tract_onnx::onnx()
      .model_for_read(&mut Cursor::new(&model_data))
      .map_err(|e| OnnxClassifierError::invalid("无法解析 ONNX 模型", e))?;

    let num_inputs = model
      .input_outlets()
      .map_err(|e| OnnxClassifierError::invalid("无法获取输入数量", e))?
      .len();
    if num_inputs != ONNX_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        ONNX_NUM_INPUTS, num_inputs
      );
      return Err(OnnxClassifierError::invalid(
        &format!(
          "预期模型输入数量为 {}, 实际为 {}",
          ONNX_NUM_INPUTS, num_inputs
        ),
        anyhow::anyhow!("unexpected input count"),
      ));
    }

    let shape = self
      .layout
      .batch_shape(CLASSIFIER_INPUT_SIZE as usize, CLASSIFIER_INPUT_SIZE as usize);
    debug!("模型输入形状: {:?} ({:?})", shape, self.layout);

    let model = model
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(shape[0], shape[1], shape[2], shape[3])),
      )
      .map_err(|e| OnnxClassifierError::invalid("输入形状与模型不符", e))?
      .into_optimized()
      .map_err(|e| OnnxClassifierError::invalid("模型优化失败", e))?;

    let num_classes = model
      .output_fact(0)
      .ok()
      .and_then(|fact| fact.shape.as_concrete().map(|dims| dims.iter().product::<usize>()));
    match num_classes {
      Some(n) => debug!("模型输出类别数: {}", n),
      None => debug!("模型输出形状不固定"),
    }

    let plan = model
      .into_runnable()
      .map_err(|e| OnnxClassifierError::invalid("无法创建推理计划", e))?;
    info!("模型加载完成");

    Ok(OnnxClassifier {
      plan,
      layout: self.layout,
      num_classes,
    })
  }
}

impl Classifier for OnnxClassifier {
  type Error = OnnxClassifierError;

  fn infer(&self, input: &ImageTensor) -> Result<Vec<f32>, Self::Error> {
    let shape = self.layout.batch_shape(input.width(), input.height());
    let data = input.to_layout(self.layout);
    let tensor =
      Tensor::from_shape::<f32>(&shape, &data).map_err(OnnxClassifierError::InferenceError)?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into_tvalue()))
      .map_err(OnnxClassifierError::InferenceError)?;

    let output = outputs.first().ok_or(OnnxClassifierError::EmptyOutput)?;
    let scores: Vec<f32> = output
      .to_array_view::<f32>()
      .map_err(OnnxClassifierError::InferenceError)?
      .iter()
      .copied()
      .collect();
    debug!("模型推理结果：{:?}", scores);

    Ok(scores)
  }

  fn num_classes(&self) -> Option<usize> {
    self.num_classes
  }
}
