// 该文件是 Yishang （衣裳） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use yishang::{
  palette::{DEFAULT_PALETTE_COLORS, PALETTE_MAX_SAMPLE_SIZE, PaletteOptions},
  preprocess::Normalization,
  service::ServiceOptions,
};

/// Yishang 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型路径，例如 onnx:///models/final_model.onnx?layout=nhwc
  #[arg(long, value_name = "MODEL", default_value = "onnx:models/final_model.onnx")]
  pub model: Url,

  /// 标签文件路径（JSON，键为类别索引）
  #[arg(long, value_name = "FILE", default_value = "models/label_map.json")]
  pub labels: PathBuf,

  /// 输入图像，例如 image:///path/to/shirt.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出位置：stdout: 或 json:///path/to/result.json
  #[arg(long, value_name = "OUTPUT", default_value = "stdout:")]
  pub output: Url,

  /// 调色板颜色数
  #[arg(long, default_value_t = DEFAULT_PALETTE_COLORS, value_name = "COUNT")]
  pub colors: usize,

  /// 调色板聚类前的采样边长
  #[arg(
    long,
    default_value_t = PaletteOptions::default().sample_size,
    value_parser = clap::value_parser!(u32).range(1..=PALETTE_MAX_SAMPLE_SIZE as i64),
    value_name = "PIXELS"
  )]
  pub sample_size: u32,

  /// k-means 随机初始化次数
  #[arg(long, default_value_t = PaletteOptions::default().n_runs, value_name = "COUNT")]
  pub kmeans_runs: usize,

  /// 像素归一化方式: passthrough | unit | symmetric | imagenet
  #[arg(long, default_value = "passthrough", value_name = "SCHEME")]
  pub normalization: Normalization,
}

impl Args {
  pub fn service_options(&self) -> ServiceOptions {
    ServiceOptions {
      normalization: self.normalization,
      palette_colors: self.colors,
      palette: PaletteOptions {
        sample_size: self.sample_size,
        n_runs: self.kmeans_runs,
        ..Default::default()
      },
    }
  }
}
