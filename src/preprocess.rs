// 该文件是 Yishang （衣裳） 项目的一部分。
// src/preprocess.rs - 图像解码与预处理
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

use image::{ImageReader, RgbImage, imageops, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::frame::{CLASSIFIER_INPUT_SIZE, ImageTensor, RGB_CHANNELS};

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("Could not read image: {0}")]
  Decode(#[from] image::ImageError),
  #[error("Could not read image: {0}")]
  Io(#[from] std::io::Error),
  #[error("Could not read image: empty input")]
  EmptyInput,
}

/// 像素归一化方式，必须与部署的模型训练时一致
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Normalization {
  /// 保持 [0, 255]，EfficientNet 模型自带缩放层
  #[default]
  Passthrough,
  /// 缩放到 [0, 1]
  UnitScale,
  /// 缩放到 [-1, 1]
  Symmetric,
  /// 先缩放到 [0, 1]，再按通道减均值除标准差
  MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl Normalization {
  pub fn imagenet() -> Self {
    Normalization::MeanStd {
      mean: [0.485, 0.456, 0.406],
      std: [0.229, 0.224, 0.225],
    }
  }

  #[inline]
  pub fn apply(&self, value: u8, channel: usize) -> f32 {
    let value = value as f32;
    match self {
      Normalization::Passthrough => value,
      Normalization::UnitScale => value / 255.0,
      Normalization::Symmetric => value / 127.5 - 1.0,
      Normalization::MeanStd { mean, std } => (value / 255.0 - mean[channel]) / std[channel],
    }
  }
}

impl std::str::FromStr for Normalization {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "passthrough" | "efficientnet" => Ok(Normalization::Passthrough),
      "unit" => Ok(Normalization::UnitScale),
      "symmetric" => Ok(Normalization::Symmetric),
      "imagenet" => Ok(Normalization::imagenet()),
      other => Err(format!("未知的归一化方式: {}", other)),
    }
  }
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
  normalization: Normalization,
}

impl Preprocessor {
  pub fn with_normalization(mut self, normalization: Normalization) -> Self {
    self.normalization = normalization;
    self
  }

  pub fn normalization(&self) -> Normalization {
    self.normalization
  }

  /// 解码原始字节，返回 RGB 图像与分类器输入张量
  pub fn preprocess(&self, bytes: &[u8]) -> Result<(RgbImage, ImageTensor), PreprocessError> {
    let image = decode(bytes)?;
    let tensor = self.to_tensor(&image);
    Ok((image, tensor))
  }

  /// 对已解码图像进行裁剪缩放与归一化
  pub fn to_tensor(&self, image: &RgbImage) -> ImageTensor {
    let fitted = crop_to_fit(image, CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE);

    let mut tensor = ImageTensor::default();
    let slice = tensor.as_mut();
    for (pixel, out) in fitted.pixels().zip(slice.chunks_exact_mut(RGB_CHANNELS)) {
      for c in 0..RGB_CHANNELS {
        out[c] = self.normalization.apply(pixel[c], c);
      }
    }
    tensor
  }
}

/// 将字节流解码为 8 位 RGB 图像
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PreprocessError> {
  if bytes.is_empty() {
    return Err(PreprocessError::EmptyInput);
  }

  let image = ImageReader::new(Cursor::new(bytes))
    .with_guessed_format()?
    .decode()?;
  debug!(
    "图像解码完成: {}x{} {:?}",
    image.width(),
    image.height(),
    image.color()
  );
  Ok(image.to_rgb8())
}

/// 以中心为基准裁剪到目标宽高比，再用 Lanczos 缩放到目标尺寸
pub fn crop_to_fit(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  let (src_w, src_h) = image.dimensions();
  if src_w == width && src_h == height {
    return image.clone();
  }

  let target_ratio = width as f64 / height as f64;
  let src_ratio = src_w as f64 / src_h as f64;

  let (crop_w, crop_h) = if src_ratio > target_ratio {
    // 过宽，裁掉左右两侧
    let w = (src_h as f64 * target_ratio).round() as u32;
    (w.clamp(1, src_w), src_h)
  } else {
    let h = (src_w as f64 / target_ratio).round() as u32;
    (src_w, h.clamp(1, src_h))
  };
  let x = (src_w - crop_w) / 2;
  let y = (src_h - crop_h) / 2;

  debug!(
    "裁剪区域: ({}, {}) {}x{} -> {}x{}",
    x, y, crop_w, crop_h, width, height
  );

  let cropped = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();
  imageops::resize(&cropped, width, height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Rgb};

  fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
  }

  #[test]
  fn tensor_shape_is_fixed_for_any_aspect_ratio() {
    let preprocessor = Preprocessor::default();
    for (w, h) in [(1, 1), (640, 480), (100, 900), (224, 224), (3, 1000)] {
      let image = RgbImage::from_pixel(w, h, Rgb([10, 20, 30]));
      let (decoded, tensor) = preprocessor
        .preprocess(&encode(&image, ImageFormat::Png))
        .unwrap();
      assert_eq!(decoded.dimensions(), (w, h));
      assert_eq!(tensor.shape(), [224, 224, 3]);
    }
  }

  #[test]
  fn passthrough_keeps_pixel_range() {
    let image = RgbImage::from_pixel(300, 200, Rgb([255, 0, 128]));
    let (_, tensor) = Preprocessor::default()
      .preprocess(&encode(&image, ImageFormat::Png))
      .unwrap();
    let px = |c| tensor.get(112, 112, c).unwrap();
    assert!((px(0) - 255.0).abs() < 1.0);
    assert!(px(1).abs() < 1.0);
    assert!((px(2) - 128.0).abs() < 1.0);
  }

  #[test]
  fn normalization_schemes() {
    assert_eq!(Normalization::UnitScale.apply(255, 0), 1.0);
    assert_eq!(Normalization::Symmetric.apply(0, 1), -1.0);
    assert_eq!(Normalization::Symmetric.apply(255, 1), 1.0);
    let imagenet = Normalization::imagenet();
    assert!((imagenet.apply(0, 0) - (-0.485 / 0.229)).abs() < 1e-6);
    assert_eq!("ImageNet".parse::<Normalization>(), Ok(imagenet));
  }

  #[test]
  fn crop_keeps_center_of_wide_image() {
    // 左右两侧为蓝色，中间为红色
    let image = RgbImage::from_fn(300, 100, |x, _| {
      if (100..200).contains(&x) {
        Rgb([255, 0, 0])
      } else {
        Rgb([0, 0, 255])
      }
    });
    let fitted = crop_to_fit(&image, 224, 224);
    assert_eq!(fitted.dimensions(), (224, 224));
    let center = fitted.get_pixel(112, 112);
    assert!(center[0] >= 250 && center[2] <= 5);
    assert!(fitted.get_pixel(0, 0)[2] <= 5);
  }

  #[test]
  fn decodes_jpeg() {
    let image = RgbImage::from_pixel(64, 48, Rgb([200, 100, 50]));
    let decoded = decode(&encode(&image, ImageFormat::Jpeg)).unwrap();
    assert_eq!(decoded.dimensions(), (64, 48));
  }

  #[test]
  fn corrupt_bytes_are_decode_errors() {
    assert!(matches!(
      decode(b"this is a text file, not a png"),
      Err(PreprocessError::Decode(_))
    ));

    let png = encode(&RgbImage::from_pixel(32, 32, Rgb([1, 2, 3])), ImageFormat::Png);
    let truncated = &png[..png.len() / 2];
    assert!(matches!(
      Preprocessor::default().preprocess(truncated),
      Err(PreprocessError::Decode(_))
    ));

    assert!(matches!(decode(&[]), Err(PreprocessError::EmptyInput)));
  }
}
