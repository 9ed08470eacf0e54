// 该文件是 Zhiyu （指语） 项目的一部分。
// src/dataset/csv.rs - 数据集 CSV 读写
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

use std::path::Path;

use tracing::{debug, info};

use crate::{
  dataset::{DatasetError, LabeledSample},
  feature::{FEATURE_LEN, FeatureVector},
  utils::write_atomic,
};

pub const CSV_DELIMITER: char = ';';
const IDENTIFIER_COLUMN: &str = "identifier";

/// `x0;y0;...;x20;y20;identifier`
pub fn csv_header() -> String {
  FeatureVector::column_names()
    .chain(std::iter::once(IDENTIFIER_COLUMN.to_string()))
    .collect::<Vec<_>>()
    .join(&CSV_DELIMITER.to_string())
}

pub fn read_csv(path: &Path) -> Result<Vec<LabeledSample>, DatasetError> {
  let text = std::fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
  let mut lines = text.lines().enumerate();

  match lines.next() {
    Some((_, header)) if header.trim() == csv_header() => {}
    _ => {
      return Err(DatasetError::Header {
        path: path.to_path_buf(),
      });
    }
  }

  let parse_error = |line: usize, message: String| DatasetError::Parse {
    path: path.to_path_buf(),
    line: line + 1,
    message,
  };

  let mut samples = Vec::new();
  for (line, row) in lines {
    let row = row.trim();
    if row.is_empty() {
      continue;
    }

    let fields: Vec<&str> = row.split(CSV_DELIMITER).collect();
    if fields.len() != FEATURE_LEN + 1 {
      return Err(parse_error(
        line,
        format!("期望 {} 列, 实际 {} 列", FEATURE_LEN + 1, fields.len()),
      ));
    }

    let values = fields[..FEATURE_LEN]
      .iter()
      .map(|field| {
        field
          .trim()
          .parse::<f32>()
          .map_err(|e| parse_error(line, format!("'{}': {}", field, e)))
      })
      .collect::<Result<Vec<f32>, DatasetError>>()?;

    let identifier = fields[FEATURE_LEN].trim();
    if identifier.is_empty() {
      return Err(parse_error(line, "标签为空".to_string()));
    }

    samples.push(LabeledSample::new(FeatureVector::try_from(values)?, identifier));
  }

  debug!("读取 {} 条样本: {}", samples.len(), path.display());
  Ok(samples)
}

pub fn write_csv(path: &Path, samples: &[LabeledSample]) -> Result<(), DatasetError> {
  let delimiter = CSV_DELIMITER.to_string();
  let mut text = csv_header();
  text.push('\n');
  for sample in samples {
    let row: Vec<String> = sample
      .features
      .as_slice()
      .iter()
      .map(|v| v.to_string())
      .chain(std::iter::once(sample.identifier.clone()))
      .collect();
    text.push_str(&row.join(&delimiter));
    text.push('\n');
  }

  write_atomic(path, text.as_bytes()).map_err(|e| DatasetError::io(path, e))?;
  info!("写入 {} 条样本: {}", samples.len(), path.display());
  Ok(())
}
