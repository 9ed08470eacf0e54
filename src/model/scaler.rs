// 该文件是 Zhiyu （指语） 项目的一部分。
// src/model/scaler.rs - 最大绝对值缩放
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
  dataset::{LabelError, LabelSet, LabeledSample},
  feature::{FEATURE_LEN, FeatureVector},
};

/// 42 个特征列加 1 个标签列
pub const SCALE_LEN: usize = FEATURE_LEN + 1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScalerError {
  #[error("第 {column} 列缩放系数为 0，无法归一化")]
  ZeroScaleColumn { column: usize },
  #[error("第 {column} 列缩放系数无效: {value}")]
  InvalidScale { column: usize, value: f32 },
  #[error("训练数据为空")]
  EmptyDataset,
  #[error("缩放向量长度错误: 期望 {expected}, 实际 {found}")]
  WrongLength { expected: usize, found: usize },
  #[error("标签错误: {0}")]
  Label(#[from] LabelError),
}

/// 每列的最大绝对值，由训练集计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleVector {
  scales: Vec<f32>,
  labels: LabelSet,
  /// 与同一次训练得到的 `mlp_model.json` 相同
  training_id: u64,
}

impl ScaleVector {
  /// 标签列先按 `labels` 编码再参与统计；单一类别时标签列记为 1
  pub fn fit(samples: &[LabeledSample], labels: &LabelSet) -> Result<Self, ScalerError> {
    if samples.is_empty() {
      return Err(ScalerError::EmptyDataset);
    }

    let mut scales = vec![0.0f32; SCALE_LEN];
    for sample in samples {
      for (scale, value) in scales.iter_mut().zip(sample.features.as_slice()) {
        *scale = scale.max(value.abs());
      }
      let code = labels.encode(&sample.identifier)? as f32;
      scales[FEATURE_LEN] = scales[FEATURE_LEN].max(code);
    }

    if scales[FEATURE_LEN] == 0.0 {
      scales[FEATURE_LEN] = 1.0;
    }

    let scaler = Self {
      scales,
      labels: labels.clone(),
      training_id: 0,
    };
    scaler.validate()?;
    debug!("缩放系数: {:?}", scaler.scales);
    Ok(scaler)
  }

  /// 检查长度与每列系数，加载持久化文件后调用
  pub fn validate(&self) -> Result<(), ScalerError> {
    if self.scales.len() != SCALE_LEN {
      return Err(ScalerError::WrongLength {
        expected: SCALE_LEN,
        found: self.scales.len(),
      });
    }
    for (column, &value) in self.scales.iter().enumerate() {
      if value == 0.0 {
        return Err(ScalerError::ZeroScaleColumn { column });
      }
      if !value.is_finite() || value < 0.0 {
        return Err(ScalerError::InvalidScale { column, value });
      }
    }
    Ok(())
  }

  pub fn with_training_id(mut self, training_id: u64) -> Self {
    self.training_id = training_id;
    self
  }

  pub fn training_id(&self) -> u64 {
    self.training_id
  }

  pub fn labels(&self) -> &LabelSet {
    &self.labels
  }

  pub fn feature_scales(&self) -> &[f32] {
    &self.scales[..FEATURE_LEN]
  }

  pub fn identifier_scale(&self) -> f32 {
    self.scales[FEATURE_LEN]
  }

  /// `vector[i] / scale[i]`
  pub fn transform(&self, vector: &FeatureVector) -> Result<FeatureVector, ScalerError> {
    let mut values = [0.0f32; FEATURE_LEN];
    for (column, ((out, &value), &scale)) in values
      .iter_mut()
      .zip(vector.as_slice())
      .zip(self.feature_scales())
      .enumerate()
    {
      if scale == 0.0 {
        return Err(ScalerError::ZeroScaleColumn { column });
      }
      *out = value / scale;
    }
    Ok(FeatureVector::from(values))
  }

  pub fn inverse_transform(&self, normalized: &FeatureVector) -> FeatureVector {
    let mut values = [0.0f32; FEATURE_LEN];
    for ((out, &value), &scale) in values
      .iter_mut()
      .zip(normalized.as_slice())
      .zip(self.feature_scales())
    {
      *out = value * scale;
    }
    FeatureVector::from(values)
  }
}
