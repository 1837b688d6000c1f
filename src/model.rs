// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/model.rs - 模型
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

use crate::runtime::RawTensor;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn postprocess(&self, outputs: Vec<RawTensor>) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone)]
pub struct ClassifyResult<T> {
  pub kind: T,
  pub index: usize,
  pub probabilities: Box<[f32]>,
}

impl<T> ClassifyResult<T> {
  pub fn score(&self) -> f32 {
    self.probabilities[self.index]
  }
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Self;
}

/// 没有标签文件时使用的类别编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassId(pub u32);

impl WithLabel for ClassId {
  fn to_label_str(&self) -> String {
    format!("class_{}", self.0)
  }

  fn to_label_id(&self) -> u32 {
    self.0
  }

  fn from_label_id(id: u32) -> Self {
    ClassId(id)
  }
}

mod classifier;
pub use self::classifier::{
  CLASSIFIER_DEFAULT_CLASS_NUM, CLASSIFIER_DEFAULT_INPUT_SIZE, Classifier, ClassifierBuilder,
  ClassifierError,
};
