// 该文件是 Yishang （衣裳） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yishang::{
  FromUrl, InferenceContext,
  error::ArtifactError,
  input::ImageFileInput,
  labels::LabelMap,
  model::OnnxClassifierBuilder,
  output::{JsonOutput, Render},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let args = args::Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("标签文件路径: {}", args.labels.display());
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  // 启动阶段：模型与标签任何一个加载失败都不能继续
  let classifier = OnnxClassifierBuilder::from_url(&args.model)
    .and_then(|builder| builder.build())
    .map_err(ArtifactError::model)
    .context("模型加载失败")?;
  let labels = LabelMap::load(&args.labels)
    .map_err(ArtifactError::from)
    .context("标签加载失败")?;
  let context = InferenceContext::new(classifier, labels, args.service_options())?;

  let upload = ImageFileInput::from_url(&args.input)
    .context("无法读取输入图像")?
    .into_upload();
  let output = JsonOutput::from_url(&args.output)?;

  let response = match context.classify(&upload) {
    Ok(response) => response,
    Err(e) if e.is_client_error() => {
      error!("输入图像无效: {}", e);
      return Err(e.into());
    }
    Err(e) => return Err(e).context("推理失败"),
  };

  output.render_result(&response)?;
  info!("处理完成!");

  Ok(())
}
