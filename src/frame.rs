// 该文件是 Yishang （衣裳） 项目的一部分。
// src/frame.rs - 分类器输入张量定义
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

pub const RGB_CHANNELS: usize = 3;

/// 分类器输入边长
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// 分类器的输入张量，固定为 224x224x3
pub type ImageTensor = RgbTensor<CLASSIFIER_INPUT_SIZE, CLASSIFIER_INPUT_SIZE>;

/// 张量内存布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
  /// [batch, height, width, channels]，Keras 导出模型的默认布局
  #[default]
  Nhwc,
  /// [batch, channels, height, width]
  Nchw,
}

impl TensorLayout {
  /// 批大小为 1 时的输入形状
  pub fn batch_shape(&self, width: usize, height: usize) -> [usize; 4] {
    match self {
      TensorLayout::Nhwc => [1, height, width, RGB_CHANNELS],
      TensorLayout::Nchw => [1, RGB_CHANNELS, height, width],
    }
  }
}

impl std::str::FromStr for TensorLayout {
  type Err = FrameError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "nhwc" => Ok(TensorLayout::Nhwc),
      "nchw" => Ok(TensorLayout::Nchw),
      other => Err(FrameError::UnknownLayout(other.to_string())),
    }
  }
}

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("未知的张量布局: {0}")]
  UnknownLayout(String),
}

/// 按 HWC 顺序存储的 RGB 浮点张量
#[derive(Debug, Clone, PartialEq)]
pub struct RgbTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> TryFrom<Vec<f32>> for RgbTensor<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    let expected = Self::len();
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for RgbTensor<W, H> {
  fn default() -> Self {
    let data = vec![0f32; Self::len()].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> RgbTensor<W, H> {
  const fn len() -> usize {
    RGB_CHANNELS * (W as usize) * (H as usize)
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 张量形状 (height, width, channels)
  pub fn shape(&self) -> [usize; 3] {
    [H as usize, W as usize, RGB_CHANNELS]
  }

  pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
    if y >= H as usize || x >= W as usize || c >= RGB_CHANNELS {
      return None;
    }
    self.data.get((y * W as usize + x) * RGB_CHANNELS + c).copied()
  }

  /// 批大小为 1 的 NHWC 数据，直接借用内部存储
  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  /// 转换为批大小为 1 的 NCHW 数据
  pub fn to_nchw(&self) -> Vec<f32> {
    let (height, width) = (H as usize, W as usize);
    let plane = height * width;
    let mut nchw = vec![0f32; self.data.len()];

    for (idx, pixel) in self.data.chunks_exact(RGB_CHANNELS).enumerate() {
      for (c, value) in pixel.iter().enumerate() {
        nchw[c * plane + idx] = *value;
      }
    }
    nchw
  }

  /// 按指定布局取得数据
  pub fn to_layout(&self, layout: TensorLayout) -> std::borrow::Cow<'_, [f32]> {
    match layout {
      TensorLayout::Nhwc => std::borrow::Cow::Borrowed(self.as_nhwc()),
      TensorLayout::Nchw => std::borrow::Cow::Owned(self.to_nchw()),
    }
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for RgbTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}
