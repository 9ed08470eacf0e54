// 该文件是 Zhiyu （指语） 项目的一部分。
// src/dataset.rs - 数据集
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

use std::path::PathBuf;

use thiserror::Error;

use crate::feature::{FeatureError, FeatureVector};

mod convert;
mod csv;
mod label;

pub use self::convert::{ConversionReport, DatasetLayout, DatasetSplit, convert_split};
pub use self::csv::{CSV_DELIMITER, csv_header, read_csv, write_csv};
pub use self::label::{LETTERS, LabelError, LabelSet};

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("I/O 错误 {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("表头不匹配 {path}")]
  Header { path: PathBuf },
  #[error("{path} 第 {line} 行解析失败: {message}")]
  Parse {
    path: PathBuf,
    line: usize,
    message: String,
  },
  #[error("特征向量错误: {0}")]
  Feature(#[from] FeatureError),
  #[error("标签错误: {0}")]
  Label(#[from] LabelError),
}

impl DatasetError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    DatasetError::Io {
      path: path.into(),
      source,
    }
  }
}

/// 一条带标签的样本，对应 CSV 中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
  pub features: FeatureVector,
  pub identifier: String,
}

impl LabeledSample {
  pub fn new(features: FeatureVector, identifier: impl Into<String>) -> Self {
    Self {
      features,
      identifier: identifier.into(),
    }
  }
}
