// 该文件是 Yishang （衣裳） 项目的一部分。
// src/palette.rs - 主色调提取
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

use std::collections::HashSet;

use image::{RgbImage, imageops, imageops::FilterType};
use linfa::DatasetBase;
use linfa::traits::{Fit, Predict};
use linfa_clustering::{KMeans, KMeansError};
use ndarray::{Array1, Array2};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_PALETTE_COLORS: usize = 5;
const PALETTE_SAMPLE_SIZE: u32 = 150;
/// 采样边长上限，超出部分截断
pub const PALETTE_MAX_SAMPLE_SIZE: u32 = 512;
const PALETTE_KMEANS_RUNS: usize = 5;
const PALETTE_KMEANS_MAX_ITERATIONS: u64 = 300;
const PALETTE_KMEANS_TOLERANCE: f64 = 1e-4;

#[derive(Error, Debug)]
pub enum PaletteError {
  #[error("图像为空")]
  EmptyImage,
  #[error("聚类失败: {0}")]
  Clustering(#[from] KMeansError),
  #[error("聚类中心数值异常: {0:?}")]
  NonFiniteCentroid(Vec<f64>),
  #[error("采样数据形状错误: {0}")]
  Shape(#[from] ndarray::ShapeError),
}

/// 调色板中的一种颜色
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaletteEntry {
  /// `#RRGGBB`，大写十六进制
  pub hex: String,
  /// 占比，0 - 100，保留两位小数
  pub percent: f64,
  pub rgb: [u8; 3],
}

impl PaletteEntry {
  fn new(rgb: [u8; 3], count: usize, total: usize) -> Self {
    let percent = (count as f64 / total as f64 * 100.0 * 100.0).round() / 100.0;
    PaletteEntry {
      hex: format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2]),
      percent,
      rgb,
    }
  }
}

/// 按占比降序排列的调色板
pub type Palette = Vec<PaletteEntry>;

#[derive(Debug, Clone)]
pub struct PaletteOptions {
  /// 聚类前缩放到的边长
  pub sample_size: u32,
  /// k-means 随机初始化次数，取惯性最小的一次
  pub n_runs: usize,
  pub max_iterations: u64,
  pub tolerance: f64,
}

impl Default for PaletteOptions {
  fn default() -> Self {
    Self {
      sample_size: PALETTE_SAMPLE_SIZE,
      n_runs: PALETTE_KMEANS_RUNS,
      max_iterations: PALETTE_KMEANS_MAX_ITERATIONS,
      tolerance: PALETTE_KMEANS_TOLERANCE,
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct PaletteExtractor {
  options: PaletteOptions,
}

impl PaletteExtractor {
  pub fn new(options: PaletteOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &PaletteOptions {
    &self.options
  }

  /// 对图像像素颜色做 k-means 聚类，返回至多 `n_colors` 种主色
  pub fn extract(&self, image: &RgbImage, n_colors: usize) -> Result<Palette, PaletteError> {
    if image.width() == 0 || image.height() == 0 {
      return Err(PaletteError::EmptyImage);
    }

    let size = self.options.sample_size.clamp(1, PALETTE_MAX_SAMPLE_SIZE);
    let sample = imageops::resize(image, size, size, FilterType::CatmullRom);
    let total = sample.width() as usize * sample.height() as usize;

    // 颜色种类少于 k 时，多余的聚类中心只会重复
    let distinct = sample.pixels().map(|p| p.0).collect::<HashSet<_>>().len();
    let k = n_colors.min(total).min(distinct).max(1);
    debug!(
      "调色板采样 {}x{}，{} 个像素，{} 种颜色，k = {}",
      size, size, total, distinct, k
    );

    let observations = Array2::from_shape_vec(
      (total, 3),
      sample.as_raw().iter().map(|v| *v as f64).collect(),
    )?;
    let dataset = DatasetBase::from(observations);

    let model = KMeans::params(k)
      .n_runs(self.options.n_runs.max(1))
      .max_n_iterations(self.options.max_iterations)
      .tolerance(self.options.tolerance)
      .fit(&dataset)?;

    let memberships: Array1<usize> = model.predict(&dataset);
    let mut counts = vec![0usize; k];
    for &cluster in memberships.iter() {
      if let Some(count) = counts.get_mut(cluster) {
        *count += 1;
      }
    }

    let mut palette = Vec::with_capacity(k);
    for (centroid, count) in model.centroids().outer_iter().zip(counts) {
      if count == 0 {
        continue;
      }
      if centroid.iter().any(|v| !v.is_finite()) {
        return Err(PaletteError::NonFiniteCentroid(centroid.to_vec()));
      }
      let channel = |c: usize| centroid[c].round().clamp(0.0, 255.0) as u8;
      palette.push(PaletteEntry::new(
        [channel(0), channel(1), channel(2)],
        count,
        total,
      ));
    }

    palette.sort_by(|a, b| b.percent.total_cmp(&a.percent));
    debug!("调色板: {:?}", palette);
    Ok(palette)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  fn assert_palette_invariants(palette: &Palette, k: usize) {
    assert!(!palette.is_empty());
    assert!(palette.len() <= k);
    let sum: f64 = palette.iter().map(|e| e.percent).sum();
    assert!((sum - 100.0).abs() <= 0.1, "sum = {}", sum);
    for entry in palette {
      assert!((0.0..=100.0).contains(&entry.percent));
      assert_eq!(entry.hex.len(), 7);
      assert_eq!(
        entry.hex,
        format!("#{:02X}{:02X}{:02X}", entry.rgb[0], entry.rgb[1], entry.rgb[2])
      );
    }
    for pair in palette.windows(2) {
      assert!(pair[0].percent >= pair[1].percent);
    }
  }

  #[test]
  fn all_red_image_is_a_single_red_entry() {
    let image = RgbImage::from_pixel(224, 224, Rgb([255, 0, 0]));
    let palette = PaletteExtractor::default().extract(&image, 1).unwrap();
    assert_eq!(
      palette,
      vec![PaletteEntry {
        hex: "#FF0000".to_string(),
        percent: 100.0,
        rgb: [255, 0, 0],
      }]
    );
  }

  #[test]
  fn single_pixel_image_clamps_k() {
    let image = RgbImage::from_pixel(1, 1, Rgb([12, 34, 56]));
    let palette = PaletteExtractor::default()
      .extract(&image, DEFAULT_PALETTE_COLORS)
      .unwrap();
    assert_eq!(palette.len(), 1);
    assert_eq!(palette[0].percent, 100.0);
    assert_eq!(palette[0].rgb, [12, 34, 56]);
    assert_eq!(palette[0].hex, "#0C2238");
  }

  #[test]
  fn two_color_split_reports_shares() {
    // 左侧 3/4 为白色，右侧 1/4 为黑色
    let image = RgbImage::from_fn(200, 200, |x, _| {
      if x < 150 {
        Rgb([255, 255, 255])
      } else {
        Rgb([0, 0, 0])
      }
    });
    let options = PaletteOptions {
      sample_size: 200,
      ..Default::default()
    };
    let palette = PaletteExtractor::new(options).extract(&image, 2).unwrap();
    assert_palette_invariants(&palette, 2);
    assert_eq!(palette.len(), 2);
    assert_eq!(palette[0].rgb, [255, 255, 255]);
    assert_eq!(palette[0].percent, 75.0);
    assert_eq!(palette[1].rgb, [0, 0, 0]);
    assert_eq!(palette[1].percent, 25.0);
  }

  #[test]
  fn noisy_image_respects_invariants() {
    let image = RgbImage::from_fn(320, 240, |x, y| {
      Rgb([
        (x * 7 % 256) as u8,
        (y * 13 % 256) as u8,
        ((x + y) * 3 % 256) as u8,
      ])
    });
    let extractor = PaletteExtractor::new(PaletteOptions {
      sample_size: 64,
      ..Default::default()
    });
    for k in [1, 3, 5, 8] {
      let palette = extractor.extract(&image, k).unwrap();
      assert_palette_invariants(&palette, k);
    }
  }

  #[test]
  fn extraction_is_reproducible() {
    let image = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
    let extractor = PaletteExtractor::default();
    assert_eq!(
      extractor.extract(&image, 4).unwrap(),
      extractor.extract(&image, 4).unwrap()
    );
  }

  #[test]
  fn zero_colors_still_yields_one_entry() {
    let image = RgbImage::from_pixel(10, 10, Rgb([0, 128, 255]));
    let palette = PaletteExtractor::default().extract(&image, 0).unwrap();
    assert_eq!(palette.len(), 1);
  }

  #[test]
  fn oversized_sample_is_capped() {
    let image = RgbImage::from_pixel(4, 4, Rgb([40, 80, 120]));
    let extractor = PaletteExtractor::new(PaletteOptions {
      sample_size: u32::MAX,
      n_runs: 1,
      ..Default::default()
    });
    let palette = extractor.extract(&image, 3).unwrap();
    assert_eq!(palette.len(), 1);
    assert_eq!(palette[0].rgb, [40, 80, 120]);
    assert_eq!(palette[0].percent, 100.0);
  }

  #[test]
  fn empty_image_is_rejected() {
    let image = RgbImage::new(0, 0);
    assert!(matches!(
      PaletteExtractor::default().extract(&image, 5),
      Err(PaletteError::EmptyImage)
    ));
  }
}
