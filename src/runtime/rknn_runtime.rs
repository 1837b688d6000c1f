// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/runtime/rknn_runtime.rs - 零拷贝 RKNN 推理运行时（原始 int8 输出）
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

use std::cell::RefCell;

use rknn_runtime::RknnModel;
use tracing::debug;

use super::{InferenceRuntime, RawTensor, RuntimeError, TensorAttr, TensorLayout};

pub const DEFAULT_RKNN_LIB_PATH: &str = "/usr/lib/librknnmrt.so";

/// 基于 `rknn_runtime` 的后端，输出保持未反量化的 int8
pub struct RknnRuntime {
  model: RknnModel,
  input: RefCell<Vec<u8>>,
}

impl RknnRuntime {
  pub fn load_with_lib(model: Vec<u8>, lib_path: &str) -> Result<Self, RuntimeError> {
    debug!("创建 RKNN 推理上下文, 运行库: {}", lib_path);
    let model = RknnModel::load_from_bytes(&model, lib_path).map_err(RuntimeError::init)?;
    Ok(Self {
      model,
      input: RefCell::new(Vec::new()),
    })
  }

  pub fn load(model: Vec<u8>) -> Result<Self, RuntimeError> {
    Self::load_with_lib(model, DEFAULT_RKNN_LIB_PATH)
  }
}

// 输入按 NHWC 查询；输出保持运行时原生排布
fn to_tensor_attr(
  index: u32,
  shape: impl IntoIterator<Item = u32>,
  layout: TensorLayout,
  zero_point: i32,
  scale: f32,
) -> TensorAttr {
  TensorAttr {
    index,
    name: None,
    dims: shape.into_iter().collect(),
    layout,
    zero_point,
    scale,
  }
}

fn collect_raw<'a>(buffers: impl IntoIterator<Item = &'a [i8]>) -> Vec<RawTensor> {
  buffers
    .into_iter()
    .map(|data| RawTensor::Int8(data.to_vec().into_boxed_slice()))
    .collect()
}

impl InferenceRuntime for RknnRuntime {
  fn io_num(&self) -> Result<(u32, u32), RuntimeError> {
    // rknn_runtime 只支持单输入模型
    Ok((1, self.model.output_attrs().len() as u32))
  }

  fn input_attr(&self, index: u32) -> Result<Option<TensorAttr>, RuntimeError> {
    if index != 0 {
      return Ok(None);
    }
    let attr = self.model.input_attr();
    Ok(Some(to_tensor_attr(
      0,
      attr.shape.iter().map(|&d| d as u32),
      TensorLayout::Nhwc,
      attr.zp as i32,
      attr.scale as f32,
    )))
  }

  fn output_attr(&self, index: u32) -> Result<Option<TensorAttr>, RuntimeError> {
    Ok(self.model.output_attrs().get(index as usize).map(|attr| {
      to_tensor_attr(
        index,
        attr.shape.iter().map(|&d| d as u32),
        TensorLayout::Undefined,
        attr.zp as i32,
        attr.scale as f32,
      )
    }))
  }

  fn set_input(&self, index: u32, nhwc: &[u8]) -> Result<(), RuntimeError> {
    if index != 0 {
      return Err(RuntimeError::call(
        "set_input",
        format!("输入下标 {} 超出范围", index),
      ));
    }
    let mut input = self.input.borrow_mut();
    input.clear();
    input.extend_from_slice(nhwc);
    Ok(())
  }

  fn run(&self) -> Result<(), RuntimeError> {
    let input = self.input.borrow();
    self
      .model
      .run(&input)
      .map_err(|e| RuntimeError::call("run", e))
  }

  fn outputs(&self) -> Result<Vec<RawTensor>, RuntimeError> {
    let buffers = (0..self.model.output_attrs().len())
      .map(|idx| self.model.output_raw(idx))
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| RuntimeError::call("output_raw", e))?;
    Ok(collect_raw(buffers))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::postprocess::classify;

  #[test]
  fn raw_buffers_stay_int8() {
    let logits: [i8; 2] = [2, -1];
    let outputs = collect_raw([&logits[..]]);
    assert_eq!(outputs, vec![RawTensor::Int8(Box::new([2, -1]))]);

    let RawTensor::Int8(data) = &outputs[0] else {
      panic!("应为 int8 输出");
    };
    let (probs, index) = classify(data).unwrap();
    assert!((probs[0] - 0.952_574).abs() < 1e-4);
    assert_eq!(index, 0);
  }

  #[test]
  fn input_attr_is_nhwc() {
    let attr = to_tensor_attr(0, [1, 224, 224, 3], TensorLayout::Nhwc, -128, 0.5);
    assert_eq!(attr.hwc(), Some((224, 224, 3)));
    assert_eq!(attr.n_elems(), 224 * 224 * 3);
  }
}
