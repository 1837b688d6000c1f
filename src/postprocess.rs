// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/postprocess.rs - 分类后处理（softmax 与 argmax）
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

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PostprocessError {
  #[error("参数无效: {0}")]
  InvalidArgument(String),
}

/// 对原始 logits 做 softmax
///
/// 直接对原值取指数后归一化，不减去最大值，也不做反量化。
/// 中间计算使用 `f64`，因此 `i8` 全范围不会溢出。浮点 logits
/// 过大或过小使指数和溢出/下溢时返回错误，不产生 NaN。
pub fn softmax<T: Copy + Into<f64>>(logits: &[T]) -> Result<Box<[f32]>, PostprocessError> {
  if logits.is_empty() {
    return Err(PostprocessError::InvalidArgument(
      "logits 不能为空".to_string(),
    ));
  }

  let exps: Vec<f64> = logits.iter().map(|&v| v.into().exp()).collect();
  let sum: f64 = exps.iter().sum();
  if !sum.is_finite() || sum <= 0.0 {
    return Err(PostprocessError::InvalidArgument(format!(
      "softmax 指数和无效: {}",
      sum
    )));
  }

  Ok(exps.iter().map(|&e| (e / sum) as f32).collect())
}

/// 最大值下标，相等时取最小下标；NaN 不参与比较
pub fn argmax(values: &[f32]) -> Option<usize> {
  let mut best: Option<(usize, f32)> = None;
  for (idx, &value) in values.iter().enumerate() {
    if value.is_nan() {
      continue;
    }
    match best {
      Some((_, max)) if value <= max => {}
      _ => best = Some((idx, value)),
    }
  }
  best.map(|(idx, _)| idx)
}

/// softmax + argmax
pub fn classify<T: Copy + Into<f64>>(
  logits: &[T],
) -> Result<(Box<[f32]>, usize), PostprocessError> {
  let probabilities = softmax(logits)?;
  let index = argmax(&probabilities).ok_or_else(|| {
    PostprocessError::InvalidArgument("概率向量为空".to_string())
  })?;
  Ok((probabilities, index))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn binary_logits() {
    let (probs, index) = classify(&[2i8, -1]).unwrap();
    assert!((probs[0] - 0.952_574).abs() < 1e-4);
    assert!((probs[1] - 0.047_426).abs() < 1e-4);
    assert_eq!(index, 0);
  }

  #[test]
  fn tie_picks_first() {
    let (probs, index) = classify(&[0i8, 0]).unwrap();
    assert_eq!(&*probs, &[0.5, 0.5]);
    assert_eq!(index, 0);
  }

  #[test]
  fn second_class_wins() {
    let (_, index) = classify(&[-3i8, 5, 5]).unwrap();
    assert_eq!(index, 1);
  }

  #[test]
  fn full_int8_range_does_not_overflow() {
    let (probs, index) = classify(&[i8::MAX, i8::MIN, 0]).unwrap();
    assert!(probs.iter().all(|p| p.is_finite()));
    assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    assert_eq!(index, 0);
  }

  #[test]
  fn float_logits() {
    let (probs, index) = classify(&[0.25f32, 1.5]).unwrap();
    assert!(probs[1] > probs[0]);
    assert_eq!(index, 1);
  }

  #[test]
  fn overflowing_logits_rejected() {
    assert!(matches!(
      classify(&[800.0f32, 0.0]),
      Err(PostprocessError::InvalidArgument(_))
    ));
    assert!(matches!(
      classify(&[f32::INFINITY, 0.0]),
      Err(PostprocessError::InvalidArgument(_))
    ));
  }

  #[test]
  fn underflowing_logits_rejected() {
    assert!(matches!(
      classify(&[-800.0f32, -800.0]),
      Err(PostprocessError::InvalidArgument(_))
    ));
    assert!(matches!(
      softmax(&[f32::NAN, 1.0]),
      Err(PostprocessError::InvalidArgument(_))
    ));
  }

  #[test]
  fn argmax_skips_nan() {
    assert_eq!(argmax(&[f32::NAN, 0.2, 0.7]), Some(2));
    assert_eq!(argmax(&[0.6, f32::NAN, 0.4]), Some(0));
    assert_eq!(argmax(&[f32::NAN]), None);
  }

  #[test]
  fn empty_logits_rejected() {
    let empty: [i8; 0] = [];
    assert!(matches!(
      classify(&empty),
      Err(PostprocessError::InvalidArgument(_))
    ));
    assert_eq!(argmax(&[]), None);
  }
}
