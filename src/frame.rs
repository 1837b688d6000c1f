// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/frame.rs - NHWC 帧定义
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

use crate::input::AsNhwcFrame;

pub const RGB_CHANNELS: usize = 3;

/// 送入推理运行时的 RGB 帧，NHWC 排布，`u8` 元素
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn with_shape(width: u32, height: u32) -> Self {
    let size = RGB_CHANNELS * (width as usize) * (height as usize);
    Self {
      width,
      height,
      data: vec![0u8; size].into_boxed_slice(),
    }
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  /// 张量字节数（N=1）
  pub fn size(&self) -> usize {
    self.data.len()
  }
}

impl From<RgbImage> for RgbNhwcFrame {
  fn from(image: RgbImage) -> Self {
    // RgbImage 本身就是交错 RGB，即 HWC 排布
    let (width, height) = image.dimensions();
    Self {
      width,
      height,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }

  fn shape(&self) -> (u32, u32) {
    (self.width, self.height)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn from_image_keeps_hwc_order() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([1, 2, 3]));
    image.put_pixel(1, 0, Rgb([4, 5, 6]));

    let frame = RgbNhwcFrame::from(image);
    assert_eq!(frame.width(), 2);
    assert_eq!(frame.height(), 1);
    assert_eq!(frame.as_nhwc(), &[1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn with_shape_is_zeroed() {
    let frame = RgbNhwcFrame::with_shape(4, 5);
    assert_eq!(frame.width(), 4);
    assert_eq!(frame.height(), 5);
    assert_eq!(frame.shape(), (4, 5));
    assert_eq!(frame.size(), 4 * 5 * 3);
    assert!(frame.as_nhwc().iter().all(|&v| v == 0));
  }
}
