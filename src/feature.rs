// 该文件是 Zhiyu （指语） 项目的一部分。
// src/feature.rs - 特征向量编码
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

use crate::landmark::{Joint, JointSet, NUM_JOINTS};

/// 特征向量长度：21 个关节点的 (x, y)
pub const FEATURE_LEN: usize = NUM_JOINTS * 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
  #[error("特征向量长度错误: 期望 {expected}, 实际 {found}")]
  WrongLength { expected: usize, found: usize },
}

/// 扁平化的关节点坐标 `x0, y0, x1, y1, ..., x20, y20`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
  values: [f32; FEATURE_LEN],
}

impl FeatureVector {
  /// 按关节点顺序拼接坐标
  pub fn flatten(joints: &JointSet) -> Self {
    let mut values = [0.0f32; FEATURE_LEN];
    for (i, joint) in joints.iter().enumerate() {
      values[2 * i] = joint.x as f32;
      values[2 * i + 1] = joint.y as f32;
    }
    Self { values }
  }

  pub fn zeros() -> Self {
    Self {
      values: [0.0; FEATURE_LEN],
    }
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.values
  }

  pub fn values(&self) -> &[f32; FEATURE_LEN] {
    &self.values
  }

  /// 由扁平坐标重新得到关节点，非整数值四舍五入
  pub fn joints(&self) -> JointSet {
    let mut joints = [Joint::default(); NUM_JOINTS];
    for (joint, pair) in joints.iter_mut().zip(self.values.chunks_exact(2)) {
      *joint = Joint::new(pair[0].round() as i32, pair[1].round() as i32);
    }
    JointSet::new(joints)
  }

  /// CSV 表头使用的列名
  pub fn column_names() -> impl Iterator<Item = String> {
    (0..NUM_JOINTS).flat_map(|i| [format!("x{}", i), format!("y{}", i)])
  }
}

impl From<&JointSet> for FeatureVector {
  fn from(joints: &JointSet) -> Self {
    Self::flatten(joints)
  }
}

impl From<[f32; FEATURE_LEN]> for FeatureVector {
  fn from(values: [f32; FEATURE_LEN]) -> Self {
    Self { values }
  }
}

impl TryFrom<Vec<f32>> for FeatureVector {
  type Error = FeatureError;

  fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
    let found = values.len();
    let values: [f32; FEATURE_LEN] = values.try_into().map_err(|_| FeatureError::WrongLength {
      expected: FEATURE_LEN,
      found,
    })?;
    Ok(Self { values })
  }
}

impl TryFrom<&[f32]> for FeatureVector {
  type Error = FeatureError;

  fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
    FeatureVector::try_from(values.to_vec())
  }
}
