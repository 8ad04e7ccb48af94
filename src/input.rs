// 该文件是 Yishang （衣裳） 项目的一部分。
// src/input.rs - 图像上传输入
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
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_file_path};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Invalid path encoding: {0}")]
  PathEncoding(#[from] std::string::FromUtf8Error),
  #[error("File must be JPG or PNG, got {0:?}")]
  UnsupportedContentType(String),
}

/// 允许上传的图像类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
  Jpeg,
  Png,
}

impl ContentType {
  /// 解析 MIME 类型，忽略大小写与参数部分
  pub fn parse(mime: &str) -> Result<Self, InputError> {
    let essence = mime
      .split(';')
      .next()
      .unwrap_or_default()
      .trim()
      .to_ascii_lowercase();
    match essence.as_str() {
      "image/jpeg" | "image/jpg" => Ok(ContentType::Jpeg),
      "image/png" => Ok(ContentType::Png),
      _ => Err(InputError::UnsupportedContentType(mime.to_string())),
    }
  }

  pub fn from_extension(ext: &str) -> Option<Self> {
    match ext.to_ascii_lowercase().as_str() {
      "jpg" | "jpeg" => Some(ContentType::Jpeg),
      "png" => Some(ContentType::Png),
      _ => None,
    }
  }

  pub fn as_mime(&self) -> &'static str {
    match self {
      ContentType::Jpeg => "image/jpeg",
      ContentType::Png => "image/png",
    }
  }
}

/// 一次请求上传的原始图像
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub bytes: Vec<u8>,
  /// 声明的 MIME 类型；缺省时由解码器自行识别
  pub content_type: Option<String>,
}

impl ImageUpload {
  pub fn new(bytes: Vec<u8>) -> Self {
    Self {
      bytes,
      content_type: None,
    }
  }

  pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = Some(content_type.into());
    self
  }

  /// 校验声明的类型
  pub fn validate(&self) -> Result<Option<ContentType>, InputError> {
    self.content_type.as_deref().map(ContentType::parse).transpose()
  }
}

/// 从本地文件读取上传图像，URL 形如 `image:///path/to/shirt.jpg`
pub struct ImageFileInput {
  upload: ImageUpload,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    let path = url_file_path(url)?;
    let bytes = std::fs::read(&path)?;
    debug!("读取图像文件 {}，大小 {} 字节", path.display(), bytes.len());

    let mut upload = ImageUpload::new(bytes);
    if let Some(content_type) = path
      .extension()
      .and_then(|ext| ext.to_str())
      .and_then(ContentType::from_extension)
    {
      upload = upload.with_content_type(content_type.as_mime());
    }

    Ok(ImageFileInput { upload })
  }
}

impl ImageFileInput {
  pub fn into_upload(self) -> ImageUpload {
    self.upload
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_jpeg_and_png() {
    assert_eq!(ContentType::parse("image/jpeg").unwrap(), ContentType::Jpeg);
    assert_eq!(ContentType::parse("IMAGE/PNG").unwrap(), ContentType::Png);
    assert_eq!(
      ContentType::parse("image/jpeg; charset=binary").unwrap(),
      ContentType::Jpeg
    );
  }

  #[test]
  fn rejects_other_types() {
    let err = ContentType::parse("text/plain").unwrap_err();
    assert!(matches!(err, InputError::UnsupportedContentType(t) if t == "text/plain"));
    assert!(ContentType::parse("image/gif").is_err());
  }

  #[test]
  fn missing_content_type_is_allowed() {
    let upload = ImageUpload::new(vec![1, 2, 3]);
    assert_eq!(upload.validate().unwrap(), None);

    let upload = upload.with_content_type("application/pdf");
    assert!(upload.validate().is_err());
  }

  #[test]
  fn file_input_guesses_type_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shirt.PNG");
    std::fs::write(&path, b"not really a png").unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let mut url_str = url.to_string();
    url_str.replace_range(..4, "image");
    let url = Url::parse(&url_str).unwrap();

    let upload = ImageFileInput::from_url(&url).unwrap().into_upload();
    assert_eq!(upload.bytes, b"not really a png");
    assert_eq!(upload.content_type.as_deref(), Some("image/png"));
  }

  #[test]
  fn file_input_decodes_escaped_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("红色 衬衫.jpg");
    std::fs::write(&path, b"jpeg bytes").unwrap();

    let mut url = Url::parse("image:///").unwrap();
    url.set_path(&path.to_string_lossy());
    assert!(url.path().contains("%20"));

    let upload = ImageFileInput::from_url(&url).unwrap().into_upload();
    assert_eq!(upload.bytes, b"jpeg bytes");
    assert_eq!(upload.content_type.as_deref(), Some("image/jpeg"));
  }

  #[test]
  fn file_input_checks_scheme() {
    let url = Url::parse("file:///tmp/shirt.jpg").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }
}
