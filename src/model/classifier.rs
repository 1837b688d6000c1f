// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/model/classifier.rs - 分类模型
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

use std::{marker::PhantomData, path::PathBuf};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

#[cfg(feature = "rknn_runtime")]
use crate::runtime::RknnRuntime;
#[cfg(feature = "rknpu_runtime")]
use crate::runtime::RknpuRuntime;
use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  input::AsNhwcFrame,
  model::{ClassifyResult, Model, WithLabel},
  postprocess::{self, PostprocessError},
  frame::RGB_CHANNELS,
  runtime::{InferenceRuntime, RawTensor, RuntimeError, TensorAttr},
  utils::{self, LocationError},
};

const CLASSIFIER_NUM_INPUTS: u32 = 1;
pub const CLASSIFIER_DEFAULT_CLASS_NUM: usize = 2;
pub const CLASSIFIER_DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("推理运行时错误: {0}")]
  RuntimeError(#[from] RuntimeError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("输入尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputShapeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error("模型输出错误: {0}")]
  OutputError(String),
  #[error("后处理错误: {0}")]
  PostprocessError(#[from] PostprocessError),
}

impl From<std::io::Error> for ClassifierError {
  fn from(err: std::io::Error) -> Self {
    ClassifierError::ModelLoadError(err)
  }
}

impl From<LocationError> for ClassifierError {
  fn from(err: LocationError) -> Self {
    ClassifierError::ModelPathError(err.to_string())
  }
}

pub struct Classifier<R, T> {
  runtime: R,
  num_classes: usize,
  input_shape: (u32, u32),
  _phantom: PhantomData<T>,
}

#[derive(Debug, Clone)]
pub struct ClassifierBuilder {
  model_path: PathBuf,
  num_classes: usize,
  input_size: Option<(u32, u32)>,
}

impl FromUrlWithScheme for ClassifierBuilder {
  const SCHEME: &'static str = "rknn";
}

impl FromUrl for ClassifierBuilder {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(ClassifierBuilder::new(utils::url_to_path(url)?))
  }
}

impl ClassifierBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      num_classes: CLASSIFIER_DEFAULT_CLASS_NUM,
      input_size: None,
    }
  }

  pub fn num_classes(mut self, num_classes: usize) -> Self {
    self.num_classes = num_classes;
    self
  }

  /// 覆盖运行时报告的模型输入尺寸
  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.input_size = Some((width, height));
    self
  }

  pub fn model_path(&self) -> &std::path::Path {
    &self.model_path
  }

  /// 用给定的运行时构造函数加载模型
  ///
  /// 模型文件读入内存后整体交给 `load`，由运行时持有或丢弃。
  pub fn build_with<R, T, F>(self, load: F) -> Result<Classifier<R, T>, ClassifierError>
  where
    R: InferenceRuntime,
    F: FnOnce(Vec<u8>) -> Result<R, RuntimeError>,
  {
    if self.num_classes == 0 {
      return Err(ClassifierError::ModelInvalid("类别数必须为正数".to_string()));
    }
    if let Some((width, height)) = self.input_size.filter(|&(w, h)| w == 0 || h == 0) {
      return Err(ClassifierError::ModelInvalid(format!(
        "模型输入尺寸无效: {}x{}",
        width, height
      )));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建推理上下文");
    let runtime = load(model_data)?;
    info!("模型加载完成");

    match runtime.sdk_version() {
      Ok(Some(version)) => {
        info!(
          "SDK 版本: {}, 驱动版本: {}",
          version.api_version, version.driver_version
        );
      }
      Ok(None) => debug!("运行时不提供 SDK 版本"),
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(e.into());
      }
    }

    let (num_inputs, num_outputs) = runtime.io_num()?;
    info!("模型输入数量: {}, 输出数量: {}", num_inputs, num_outputs);

    if num_inputs != CLASSIFIER_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        CLASSIFIER_NUM_INPUTS, num_inputs
      );
      return Err(ClassifierError::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        CLASSIFIER_NUM_INPUTS, num_inputs
      )));
    }

    if num_outputs == 0 {
      error!("模型没有输出");
      return Err(ClassifierError::ModelInvalid("模型没有输出".to_string()));
    }

    let mut input_attr = None;
    for index in 0..num_inputs {
      if let Some(attr) = runtime.input_attr(index)? {
        info!("  输入张量: {}", attr);
        input_attr.get_or_insert(attr);
      }
    }
    for index in 0..num_outputs {
      if let Some(attr) = runtime.output_attr(index)? {
        info!("  输出张量: {}", attr);
      }
    }

    let input_shape = resolve_input_shape(self.input_size, input_attr.as_ref())?;
    info!("模型输入尺寸: {}x{}", input_shape.0, input_shape.1);

    Ok(Classifier {
      runtime,
      num_classes: self.num_classes,
      input_shape,
      _phantom: PhantomData,
    })
  }

  #[cfg(feature = "rknpu_runtime")]
  pub fn build<T>(self) -> Result<Classifier<RknpuRuntime, T>, ClassifierError> {
    self.build_with(RknpuRuntime::load)
  }

  #[cfg(feature = "rknn_runtime")]
  pub fn build_rknn<T>(self) -> Result<Classifier<RknnRuntime, T>, ClassifierError> {
    self.build_with(RknnRuntime::load)
  }
}

/// 输入尺寸 (宽, 高)：显式设置优先，其次取运行时报告的输入属性
fn resolve_input_shape(
  input_size: Option<(u32, u32)>,
  attr: Option<&TensorAttr>,
) -> Result<(u32, u32), ClassifierError> {
  let reported = attr.and_then(TensorAttr::hwc);
  if let Some((_, _, channels)) = reported.filter(|&(_, _, c)| c as usize != RGB_CHANNELS) {
    warn!("模型输入通道数为 {}, 预期为 {}", channels, RGB_CHANNELS);
  }

  match (input_size, reported) {
    (Some(size), Some((height, width, _))) => {
      if size != (width, height) {
        warn!(
          "指定的输入尺寸 {}x{} 与模型报告的 {}x{} 不一致",
          size.0, size.1, width, height
        );
      }
      Ok(size)
    }
    (Some(size), None) => Ok(size),
    (None, Some((height, width, _))) if width > 0 && height > 0 => Ok((width, height)),
    (None, Some((height, width, _))) => Err(ClassifierError::ModelInvalid(format!(
      "模型报告的输入尺寸无效: {}x{}",
      width, height
    ))),
    (None, None) => {
      warn!(
        "运行时未报告输入属性, 使用默认输入尺寸 {}",
        CLASSIFIER_DEFAULT_INPUT_SIZE
      );
      Ok((CLASSIFIER_DEFAULT_INPUT_SIZE, CLASSIFIER_DEFAULT_INPUT_SIZE))
    }
  }
}

impl<R: InferenceRuntime, T: WithLabel> Classifier<R, T> {
  /// 模型输入尺寸 (宽, 高)
  pub fn input_shape(&self) -> (u32, u32) {
    self.input_shape
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn runtime(&self) -> &R {
    &self.runtime
  }

  pub fn infer_frame<F: AsNhwcFrame>(
    &self,
    frame: &F,
  ) -> Result<ClassifyResult<T>, ClassifierError> {
    if frame.shape() != self.input_shape {
      return Err(ClassifierError::InputShapeMismatch {
        expected: self.input_shape,
        actual: frame.shape(),
      });
    }

    debug!("设置模型输入");
    self.runtime.set_input(0, frame.as_nhwc())?;

    debug!("执行模型推理");
    self.runtime.run()?;

    debug!("获取模型输出");
    let outputs = self.runtime.outputs()?;

    self.postprocess(outputs)
  }
}

impl<R: InferenceRuntime, T: WithLabel> Model for Classifier<R, T> {
  type Input = RgbNhwcFrame;
  type Output = ClassifyResult<T>;
  type Error = ClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.infer_frame(input)
  }

  fn postprocess(&self, outputs: Vec<RawTensor>) -> Result<Self::Output, Self::Error> {
    debug!("后处理模型输出");
    let tensor = outputs
      .first()
      .ok_or_else(|| ClassifierError::OutputError("模型没有输出".to_string()))?;

    if tensor.len() < self.num_classes {
      return Err(ClassifierError::OutputError(format!(
        "输出长度 {} 小于类别数 {}",
        tensor.len(),
        self.num_classes
      )));
    }

    // 只取前 num_classes 个值，原样送入 softmax
    let (probabilities, index) = match tensor {
      RawTensor::Int8(data) => postprocess::classify(&data[..self.num_classes])?,
      RawTensor::Float32(data) => postprocess::classify(&data[..self.num_classes])?,
    };
    debug!("分类概率: {:?}, 类别: {}", probabilities, index);

    Ok(ClassifyResult {
      kind: T::from_label_id(index as u32),
      index,
      probabilities,
    })
  }
}
