// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/runtime.rs - 推理运行时接口
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

#[derive(Error, Debug)]
pub enum RuntimeError {
  #[error("运行时初始化失败: {0}")]
  Init(String),
  #[error("运行时调用 {op} 失败: {reason}")]
  Call { op: &'static str, reason: String },
}

impl RuntimeError {
  pub fn init(e: impl std::fmt::Display) -> Self {
    RuntimeError::Init(e.to_string())
  }

  pub fn call(op: &'static str, e: impl std::fmt::Display) -> Self {
    RuntimeError::Call {
      op,
      reason: e.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkVersion {
  pub api_version: String,
  pub driver_version: String,
}

/// 张量排布
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
  Nchw,
  Nhwc,
  Undefined,
}

impl std::fmt::Display for TensorLayout {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TensorLayout::Nchw => write!(f, "NCHW"),
      TensorLayout::Nhwc => write!(f, "NHWC"),
      TensorLayout::Undefined => write!(f, "UNDEFINED"),
    }
  }
}

/// 运行时报告的张量属性
#[derive(Debug, Clone, PartialEq)]
pub struct TensorAttr {
  pub index: u32,
  pub name: Option<String>,
  pub dims: Vec<u32>,
  pub layout: TensorLayout,
  pub zero_point: i32,
  pub scale: f32,
}

impl TensorAttr {
  pub fn n_elems(&self) -> usize {
    self.dims.iter().map(|&d| d as usize).product()
  }

  /// 按排布解析 (高, 宽, 通道)，仅适用于 4 维图像张量
  pub fn hwc(&self) -> Option<(u32, u32, u32)> {
    match (self.layout, self.dims.as_slice()) {
      (TensorLayout::Nchw, &[_, c, h, w]) => Some((h, w, c)),
      (TensorLayout::Nhwc, &[_, h, w, c]) => Some((h, w, c)),
      _ => None,
    }
  }
}

impl std::fmt::Display for TensorAttr {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let dims = self
      .dims
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join(", ");
    write!(
      f,
      "index={}, name={}, n_dims={}, dims=[{}], n_elems={}, fmt={}, zp={}, scale={:.6}",
      self.index,
      self.name.as_deref().unwrap_or("-"),
      self.dims.len(),
      dims,
      self.n_elems(),
      self.layout,
      self.zero_point,
      self.scale
    )
  }
}

/// 运行时返回的一个输出张量
#[derive(Debug, Clone, PartialEq)]
pub enum RawTensor {
  /// 未反量化的原始 int8 输出
  Int8(Box<[i8]>),
  Float32(Box<[f32]>),
}

impl RawTensor {
  pub fn len(&self) -> usize {
    match self {
      RawTensor::Int8(data) => data.len(),
      RawTensor::Float32(data) => data.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// 推理后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
  /// rknn_runtime，原始 int8 输出
  #[default]
  Rknn,
  /// rknpu，反量化后的浮点输出
  Rknpu,
}

/// 推理运行时
///
/// 输入固定为 NHWC 排布的 `u8` 张量。版本与张量属性查询是可选的，
/// 后端不支持时返回 `Ok(None)`。
pub trait InferenceRuntime {
  fn sdk_version(&self) -> Result<Option<SdkVersion>, RuntimeError> {
    Ok(None)
  }
  /// (输入数量, 输出数量)
  fn io_num(&self) -> Result<(u32, u32), RuntimeError>;
  fn input_attr(&self, _index: u32) -> Result<Option<TensorAttr>, RuntimeError> {
    Ok(None)
  }
  fn output_attr(&self, _index: u32) -> Result<Option<TensorAttr>, RuntimeError> {
    Ok(None)
  }
  fn set_input(&self, index: u32, nhwc: &[u8]) -> Result<(), RuntimeError>;
  fn run(&self) -> Result<(), RuntimeError>;
  fn outputs(&self) -> Result<Vec<RawTensor>, RuntimeError>;
}

#[cfg(feature = "rknpu_runtime")]
mod rknpu_runtime;
#[cfg(feature = "rknpu_runtime")]
pub use self::rknpu_runtime::RknpuRuntime;

#[cfg(feature = "rknn_runtime")]
mod rknn_runtime;
#[cfg(feature = "rknn_runtime")]
pub use self::rknn_runtime::RknnRuntime;

#[cfg(test)]
mod tests {
  use super::*;

  fn attr(dims: Vec<u32>, layout: TensorLayout) -> TensorAttr {
    TensorAttr {
      index: 0,
      name: Some("images".to_string()),
      dims,
      layout,
      zero_point: -128,
      scale: 0.003922,
    }
  }

  #[test]
  fn hwc_follows_layout() {
    assert_eq!(
      attr(vec![1, 224, 320, 3], TensorLayout::Nhwc).hwc(),
      Some((224, 320, 3))
    );
    assert_eq!(
      attr(vec![1, 3, 224, 320], TensorLayout::Nchw).hwc(),
      Some((224, 320, 3))
    );
    assert_eq!(attr(vec![1, 2], TensorLayout::Nhwc).hwc(), None);
    assert_eq!(attr(vec![1, 3, 4, 4], TensorLayout::Undefined).hwc(), None);
  }

  #[test]
  fn dump_lists_attributes() {
    let text = attr(vec![1, 640, 640, 3], TensorLayout::Nhwc).to_string();
    assert_eq!(
      text,
      "index=0, name=images, n_dims=4, dims=[1, 640, 640, 3], n_elems=1228800, fmt=NHWC, zp=-128, scale=0.003922"
    );
  }
}
