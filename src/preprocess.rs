// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/preprocess.rs - 图像预处理（letterbox 缩放与填充）
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

use image::{
  Rgb, RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::debug;

use crate::frame::RgbNhwcFrame;

pub const DEFAULT_STRIDE: u32 = 32;
pub const DEFAULT_PAD_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PreprocessError {
  #[error("参数无效: {0}")]
  InvalidArgument(String),
  #[error("缩放失败: 期望尺寸 {expected:?}, 实际尺寸 {actual:?}")]
  ResizeError {
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

/// letterbox 结果
#[derive(Debug, Clone)]
pub struct LetterboxResult {
  pub image: RgbImage,
  /// (宽方向缩放比, 高方向缩放比)，letterbox 模式下两者相等
  pub ratio: (f32, f32),
  /// (左侧填充, 顶部填充)
  pub pad: (u32, u32),
}

/// 保持宽高比缩放并用常数颜色填充到目标尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
  width: u32,
  height: u32,
  pad_color: [u8; 3],
  auto_pad: bool,
  scale_fill: bool,
  allow_upscale: bool,
  stride: u32,
}

impl Letterbox {
  /// 方形目标尺寸
  pub fn new(size: u32) -> Self {
    Self::with_shape(size, size)
  }

  pub fn with_shape(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      pad_color: DEFAULT_PAD_COLOR,
      auto_pad: false,
      scale_fill: false,
      allow_upscale: false,
      stride: DEFAULT_STRIDE,
    }
  }

  pub fn pad_color(mut self, pad_color: [u8; 3]) -> Self {
    self.pad_color = pad_color;
    self
  }

  /// 填充量对 `stride` 取模（动态尺寸输入时使用）
  pub fn auto_pad(mut self, auto_pad: bool) -> Self {
    self.auto_pad = auto_pad;
    self
  }

  /// 直接拉伸到目标尺寸，不保持宽高比，不填充
  pub fn scale_fill(mut self, scale_fill: bool) -> Self {
    self.scale_fill = scale_fill;
    self
  }

  pub fn allow_upscale(mut self, allow_upscale: bool) -> Self {
    self.allow_upscale = allow_upscale;
    self
  }

  pub fn stride(mut self, stride: u32) -> Self {
    self.stride = stride;
    self
  }

  pub fn apply(&self, image: &RgbImage) -> Result<LetterboxResult, PreprocessError> {
    let (src_w, src_h) = image.dimensions();
    if src_w == 0 || src_h == 0 {
      return Err(PreprocessError::InvalidArgument(format!(
        "源图像尺寸无效: {}x{}",
        src_w, src_h
      )));
    }
    if self.width == 0 || self.height == 0 {
      return Err(PreprocessError::InvalidArgument(format!(
        "目标尺寸无效: {}x{}",
        self.width, self.height
      )));
    }
    if self.auto_pad && self.stride == 0 {
      return Err(PreprocessError::InvalidArgument(
        "auto_pad 模式下 stride 必须为正数".to_string(),
      ));
    }

    let (target_w, target_h) = (self.width as f32, self.height as f32);
    let mut r = (target_w / src_w as f32).min(target_h / src_h as f32);
    if !self.allow_upscale {
      r = r.min(1.0);
    }

    let mut ratio = (r, r);
    let mut new_w = ((src_w as f32 * r).round() as u32).clamp(1, self.width);
    let mut new_h = ((src_h as f32 * r).round() as u32).clamp(1, self.height);
    let mut dw = self.width - new_w;
    let mut dh = self.height - new_h;

    if self.auto_pad {
      dw %= self.stride;
      dh %= self.stride;
    } else if self.scale_fill {
      dw = 0;
      dh = 0;
      new_w = self.width;
      new_h = self.height;
      ratio = (target_w / src_w as f32, target_h / src_h as f32);
    }

    let (left, right) = split_padding(dw);
    let (top, bottom) = split_padding(dh);
    debug!(
      "letterbox: {}x{} -> {}x{}, 缩放比 {:?}, 填充 l={} r={} t={} b={}",
      src_w, src_h, new_w, new_h, ratio, left, right, top, bottom
    );

    let resized = if (new_w, new_h) == (src_w, src_h) {
      image.clone()
    } else {
      imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };
    if resized.dimensions() != (new_w, new_h) {
      return Err(PreprocessError::ResizeError {
        expected: (new_w, new_h),
        actual: resized.dimensions(),
      });
    }

    let image = if left + right + top + bottom == 0 {
      resized
    } else {
      let mut canvas = RgbImage::from_pixel(
        new_w + left + right,
        new_h + top + bottom,
        Rgb(self.pad_color),
      );
      imageops::replace(&mut canvas, &resized, left as i64, top as i64);
      canvas
    };

    Ok(LetterboxResult {
      image,
      ratio,
      pad: (left, top),
    })
  }
}

/// 函数形式的 letterbox，参数顺序与构造器一致
pub fn letterbox(
  image: &RgbImage,
  target_size: u32,
  pad_color: [u8; 3],
  auto_pad: bool,
  scale_fill: bool,
  allow_upscale: bool,
  stride: u32,
) -> Result<LetterboxResult, PreprocessError> {
  Letterbox::new(target_size)
    .pad_color(pad_color)
    .auto_pad(auto_pad)
    .scale_fill(scale_fill)
    .allow_upscale(allow_upscale)
    .stride(stride)
    .apply(image)
}

// 奇数填充时多出的一个像素放在右侧/底部
fn split_padding(total: u32) -> (u32, u32) {
  let half = total as f32 / 2.0;
  let first = (half - 0.1).round().max(0.0) as u32;
  let second = (half + 0.1).round() as u32;
  (first, second)
}

/// 送入模型前的预处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Preprocess {
  /// 保持宽高比缩放并填充
  #[default]
  Letterbox,
  /// 直接拉伸到模型输入尺寸
  Stretch,
}

impl Preprocess {
  pub fn to_frame(
    self,
    image: &RgbImage,
    letterbox: &Letterbox,
  ) -> Result<RgbNhwcFrame, PreprocessError> {
    let letterbox = match self {
      Preprocess::Letterbox => *letterbox,
      Preprocess::Stretch => letterbox.auto_pad(false).scale_fill(true),
    };
    let result = letterbox.apply(image)?;
    Ok(RgbNhwcFrame::from(result.image))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
  }

  #[test]
  fn square_passthrough() {
    let image = solid(640, 640, [10, 20, 30]);
    let result = Letterbox::new(640).apply(&image).unwrap();
    assert_eq!(result.ratio, (1.0, 1.0));
    assert_eq!(result.pad, (0, 0));
    assert_eq!(result.image.dimensions(), (640, 640));
    assert_eq!(result.image, image);
  }

  #[test]
  fn downscale_pads_vertically() {
    let image = solid(1280, 720, [255, 0, 0]);
    let result = letterbox(&image, 640, [114, 114, 114], false, false, false, 32).unwrap();
    assert_eq!(result.ratio, (0.5, 0.5));
    assert_eq!(result.pad, (0, 140));
    assert_eq!(result.image.dimensions(), (640, 640));
    assert_eq!(result.image.get_pixel(0, 0), &Rgb([114, 114, 114]));
    assert_eq!(result.image.get_pixel(320, 639), &Rgb([114, 114, 114]));
    assert_eq!(result.image.get_pixel(320, 139), &Rgb([114, 114, 114]));
    assert!(result.image.get_pixel(320, 140)[0] > 200);
    assert!(result.image.get_pixel(320, 499)[0] > 200);
    assert_eq!(result.image.get_pixel(320, 500), &Rgb([114, 114, 114]));
  }

  #[test]
  fn odd_padding_goes_to_bottom() {
    let image = solid(640, 639, [255, 255, 255]);
    let result = Letterbox::new(640).apply(&image).unwrap();
    assert_eq!(result.pad, (0, 0));
    assert_eq!(result.image.dimensions(), (640, 640));
    assert_eq!(result.image.get_pixel(5, 0), &Rgb([255, 255, 255]));
    assert_eq!(result.image.get_pixel(5, 639), &Rgb(DEFAULT_PAD_COLOR));
  }

  #[test]
  fn split_padding_sums_to_total() {
    assert_eq!(split_padding(0), (0, 0));
    assert_eq!(split_padding(1), (0, 1));
    assert_eq!(split_padding(5), (2, 3));
    assert_eq!(split_padding(280), (140, 140));
    for total in 0..2048 {
      let (a, b) = split_padding(total);
      assert_eq!(a + b, total);
      assert!(b >= a);
    }
  }

  #[test]
  fn no_upscale_keeps_small_image() {
    let image = solid(320, 240, [0, 255, 0]);
    let result = Letterbox::new(640).apply(&image).unwrap();
    assert_eq!(result.ratio, (1.0, 1.0));
    assert_eq!(result.pad, (160, 200));
    assert_eq!(result.image.dimensions(), (640, 640));
  }

  #[test]
  fn upscale_when_allowed() {
    let image = solid(320, 240, [0, 255, 0]);
    let result = Letterbox::new(640).allow_upscale(true).apply(&image).unwrap();
    assert_eq!(result.ratio, (2.0, 2.0));
    assert_eq!(result.pad, (0, 80));
    assert_eq!(result.image.dimensions(), (640, 640));
  }

  #[test]
  fn auto_pad_reduces_to_stride() {
    let image = solid(1280, 720, [0, 0, 255]);
    let result = Letterbox::new(640).auto_pad(true).stride(32).apply(&image).unwrap();
    // 280 % 32 = 24
    assert_eq!(result.pad, (0, 12));
    assert_eq!(result.image.dimensions(), (640, 384));
  }

  #[test]
  fn scale_fill_stretches() {
    let image = solid(1280, 720, [0, 0, 255]);
    let result = Letterbox::new(640).scale_fill(true).apply(&image).unwrap();
    assert_eq!(result.pad, (0, 0));
    assert_eq!(result.ratio.0, 0.5);
    assert!((result.ratio.1 - 640.0 / 720.0).abs() < 1e-6);
    assert_eq!(result.image.dimensions(), (640, 640));
  }

  #[test]
  fn invalid_arguments_are_rejected() {
    let image = solid(4, 4, [0, 0, 0]);
    assert!(matches!(
      Letterbox::new(0).apply(&image),
      Err(PreprocessError::InvalidArgument(_))
    ));
    assert!(matches!(
      Letterbox::new(8).auto_pad(true).stride(0).apply(&image),
      Err(PreprocessError::InvalidArgument(_))
    ));
    assert!(matches!(
      Letterbox::new(8).apply(&RgbImage::new(0, 4)),
      Err(PreprocessError::InvalidArgument(_))
    ));
  }

  #[test]
  fn stretch_mode_fills_model_input() {
    let image = solid(100, 50, [1, 2, 3]);
    let frame = Preprocess::Stretch
      .to_frame(&image, &Letterbox::with_shape(64, 32))
      .unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 32));

    let frame = Preprocess::Letterbox
      .to_frame(&image, &Letterbox::new(64))
      .unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 64));
  }
}
