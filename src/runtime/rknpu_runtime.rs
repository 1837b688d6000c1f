// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/runtime/rknpu_runtime.rs - RKNPU 推理运行时
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use tracing::debug;

use super::{InferenceRuntime, RawTensor, RuntimeError, SdkVersion};

pub struct RknpuRuntime {
  context: Context,
}

impl RknpuRuntime {
  pub fn new(model: Vec<u8>, flags: InitFlags) -> Result<Self, RuntimeError> {
    debug!("创建 RKNN 推理上下文");
    let context = Context::new(&model, flags).map_err(RuntimeError::init)?;
    Ok(Self { context })
  }

  pub fn load(model: Vec<u8>) -> Result<Self, RuntimeError> {
    Self::new(model, InitFlags::default())
  }
}

impl InferenceRuntime for RknpuRuntime {
  fn sdk_version(&self) -> Result<Option<SdkVersion>, RuntimeError> {
    let version = self
      .context
      .sdk_version()
      .map_err(|e| RuntimeError::call("sdk_version", e))?;

    let api_version = version
      .api_version()
      .map(|v| v.to_string())
      .unwrap_or_else(|_| "unknown".to_string());
    let driver_version = version
      .driver_version()
      .map(|v| v.to_string())
      .unwrap_or_else(|_| "unknown".to_string());

    Ok(Some(SdkVersion {
      api_version,
      driver_version,
    }))
  }

  fn io_num(&self) -> Result<(u32, u32), RuntimeError> {
    let num_inputs = self
      .context
      .num_inputs()
      .map_err(|e| RuntimeError::call("num_inputs", e))?;
    let num_outputs = self
      .context
      .num_outputs()
      .map_err(|e| RuntimeError::call("num_outputs", e))?;
    Ok((num_inputs, num_outputs))
  }

  fn set_input(&self, index: u32, nhwc: &[u8]) -> Result<(), RuntimeError> {
    self
      .context
      .set_input(index as _, nhwc, TensorFormat::NHWC, TensorType::UInt8)
      .map_err(|e| RuntimeError::call("set_input", e))
  }

  fn run(&self) -> Result<(), RuntimeError> {
    self
      .context
      .run()
      .map_err(|e| RuntimeError::call("run", e))
  }

  fn outputs(&self) -> Result<Vec<RawTensor>, RuntimeError> {
    let (_, num_outputs) = self.io_num()?;
    let output = self
      .context
      .get_outputs()
      .map_err(|e| RuntimeError::call("get_outputs", e))?;
    debug!("模型推理结果：{:?}", output);

    // rknpu 只提供反量化后的浮点输出，需要原始 int8 时使用 RknnRuntime
    (0..num_outputs as usize)
      .map(|idx| {
        output
          .get_f32(idx)
          .map(|data| RawTensor::Float32(data.to_vec().into_boxed_slice()))
          .map_err(|e| RuntimeError::call("get_f32", e))
      })
      .collect()
  }
}
