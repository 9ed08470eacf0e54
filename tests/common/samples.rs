// 该文件是 Zhiyu （指语） 项目的一部分。
// tests/common/samples.rs - 合成的带标签样本
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

use zhiyu::{
  FeatureVector,
  dataset::LabeledSample,
  feature::FEATURE_LEN,
};

/// 每个类别在 `i % classes == k` 的列上取较大值，其余列取较小值，加少量扰动
pub fn clustered_samples(identifiers: &[&str], per_class: usize, seed: u64) -> Vec<LabeledSample> {
  let mut rng = fastrand::Rng::with_seed(seed);
  let classes = identifiers.len();
  let mut samples = Vec::with_capacity(classes * per_class);
  for (k, identifier) in identifiers.iter().enumerate() {
    for _ in 0..per_class {
      let mut values = [0.0f32; FEATURE_LEN];
      for (i, v) in values.iter_mut().enumerate() {
        let base = if i % classes == k { 300.0 } else { 100.0 };
        *v = base + (rng.f32() - 0.5) * 20.0;
      }
      samples.push(LabeledSample::new(FeatureVector::from(values), *identifier));
    }
  }
  samples
}

/// 与 `clustered_samples` 中某一类的中心相同
pub fn class_center(classes: usize, k: usize) -> FeatureVector {
  let mut values = [0.0f32; FEATURE_LEN];
  for (i, v) in values.iter_mut().enumerate() {
    *v = if i % classes == k { 300.0 } else { 100.0 };
  }
  FeatureVector::from(values)
}
