// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  preprocess::{Letterbox, Preprocess, PreprocessError},
  utils::{self, LocationError},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("路径错误: {0}")]
  LocationError(#[from] LocationError),
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
  #[error("图像为空: {0}")]
  EmptyImage(String),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 单张图像文件输入，迭代一次后耗尽
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Self::open(utils::url_to_path(url)?)
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    info!("读取图像: {}", path.display());
    let image = ImageReader::open(path)?
      .with_guessed_format()?
      .decode()?
      .to_rgb8();

    if image.width() == 0 || image.height() == 0 {
      return Err(ImageFileInputError::EmptyImage(path.display().to_string()));
    }
    info!("图像宽度 = {}, 图像高度 = {}", image.width(), image.height());

    Ok(Self::from_image(image))
  }

  pub fn from_image(image: RgbImage) -> Self {
    ImageFileInput { image: Some(image) }
  }

  pub fn dimensions(&self) -> Option<(u32, u32)> {
    self.image.as_ref().map(|image| image.dimensions())
  }

  /// 预处理为模型输入帧
  pub fn into_nhwc(
    self,
    preprocess: Preprocess,
    letterbox: &Letterbox,
  ) -> Result<ImageFileInputNhwc, PreprocessError> {
    let frame = self
      .image
      .map(|image| preprocess.to_frame(&image, letterbox))
      .transpose()?;
    Ok(ImageFileInputNhwc { frame })
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}

pub struct ImageFileInputNhwc {
  frame: Option<RgbNhwcFrame>,
}

impl Iterator for ImageFileInputNhwc {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}
