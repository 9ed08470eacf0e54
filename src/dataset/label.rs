// 该文件是 Zhiyu （指语） 项目的一部分。
// src/dataset/label.rs - 标签编码
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

use crate::dataset::LabeledSample;

/// 默认支持的手语字母
pub const LETTERS: [&str; 10] = ["A", "D", "E", "I", "L", "N", "O", "R", "S", "T"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
  #[error("标签集合为空")]
  Empty,
  #[error("未知标签: {0}")]
  Unknown(String),
  #[error("标签编码不一致: 期望 {expected:?}, 实际 {found:?}")]
  InconsistentEncoding {
    expected: Vec<String>,
    found: Vec<String>,
  },
}

/// 标签到整数的唯一映射
///
/// 标签按字母序排序去重，编码即下标。训练、验证和推理共用同一个集合，
/// 并随模型一起持久化。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet {
  identifiers: Vec<String>,
}

impl LabelSet {
  pub fn new<I, S>(identifiers: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut identifiers: Vec<String> = identifiers
      .into_iter()
      .map(|s| s.into().trim().to_string())
      .filter(|s| !s.is_empty())
      .collect();
    identifiers.sort();
    identifiers.dedup();

    if identifiers.is_empty() {
      return Err(LabelError::Empty);
    }
    Ok(Self { identifiers })
  }

  pub fn letters() -> Self {
    Self {
      identifiers: LETTERS.iter().map(|s| s.to_string()).collect(),
    }
  }

  pub fn from_samples(samples: &[LabeledSample]) -> Result<Self, LabelError> {
    Self::new(samples.iter().map(|s| s.identifier.as_str()))
  }

  pub fn len(&self) -> usize {
    self.identifiers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.identifiers.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.identifiers.iter().map(String::as_str)
  }

  pub fn encode(&self, identifier: &str) -> Result<usize, LabelError> {
    self
      .identifiers
      .binary_search_by(|probe| probe.as_str().cmp(identifier))
      .map_err(|_| LabelError::Unknown(identifier.to_string()))
  }

  pub fn decode(&self, code: usize) -> Option<&str> {
    self.identifiers.get(code).map(String::as_str)
  }

  /// 两个集合必须给出完全相同的编码
  pub fn ensure_same(&self, other: &LabelSet) -> Result<(), LabelError> {
    if self == other {
      Ok(())
    } else {
      Err(LabelError::InconsistentEncoding {
        expected: self.identifiers.clone(),
        found: other.identifiers.clone(),
      })
    }
  }

  /// 样本中的每个标签都必须能用本集合编码
  pub fn ensure_covers(&self, samples: &[LabeledSample]) -> Result<(), LabelError> {
    let mut foreign: Vec<String> = samples
      .iter()
      .filter(|s| self.encode(&s.identifier).is_err())
      .map(|s| s.identifier.clone())
      .collect();
    if foreign.is_empty() {
      return Ok(());
    }

    foreign.sort();
    foreign.dedup();
    Err(LabelError::InconsistentEncoding {
      expected: self.identifiers.clone(),
      found: foreign,
    })
  }
}

impl TryFrom<Vec<String>> for LabelSet {
  type Error = LabelError;

  fn try_from(identifiers: Vec<String>) -> Result<Self, Self::Error> {
    LabelSet::new(identifiers)
  }
}

impl From<LabelSet> for Vec<String> {
  fn from(labels: LabelSet) -> Self {
    labels.identifiers
  }
}
