// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// tests/properties.rs - 预处理与后处理性质测试
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
use proptest::prelude::*;
use shanan_cls::{
  postprocess::{argmax, classify, softmax},
  preprocess::Letterbox,
};

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn softmax_is_a_distribution(logits in prop::collection::vec(any::<i8>(), 1..16)) {
    let probs = softmax(&logits).unwrap();
    prop_assert_eq!(probs.len(), logits.len());
    prop_assert!(probs.iter().all(|&p| p >= 0.0));
    prop_assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
  }

  #[test]
  fn prediction_is_first_maximum(logits in prop::collection::vec(-8i8..8, 1..8)) {
    let (probs, index) = classify(&logits).unwrap();
    prop_assert!(index < probs.len());
    prop_assert!(probs.iter().all(|&p| probs[index] >= p));
    // 最大 logit 的第一个位置
    let max = *logits.iter().max().unwrap();
    let first = logits.iter().position(|&v| v == max).unwrap();
    prop_assert_eq!(index, first);
    prop_assert_eq!(argmax(&probs), Some(first));
  }

  #[test]
  fn letterbox_hits_target_size(
    src_w in 1u32..96,
    src_h in 1u32..96,
    target in 1u32..64,
    allow_upscale in any::<bool>(),
    scale_fill in any::<bool>(),
  ) {
    let image = RgbImage::new(src_w, src_h);
    let result = Letterbox::new(target)
      .allow_upscale(allow_upscale)
      .scale_fill(scale_fill)
      .apply(&image)
      .unwrap();
    prop_assert_eq!(result.image.dimensions(), (target, target));
  }

  #[test]
  fn no_upscale_clamps_ratio(
    src_w in 1u32..64,
    src_h in 1u32..64,
    extra in 0u32..64,
  ) {
    let target = src_w.max(src_h) + extra;
    let image = RgbImage::new(src_w, src_h);
    let result = Letterbox::new(target).apply(&image).unwrap();
    prop_assert!(result.ratio.0 <= 1.0);
    prop_assert!(result.ratio.1 <= 1.0);
    prop_assert_eq!(result.image.dimensions(), (target, target));
  }
}
