// 该文件是 Zhiyu （指语） 项目的一部分。
// src/dataset/convert.rs - 图像目录转换为数据集
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

use std::{
  fmt,
  path::{Path, PathBuf},
};

use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  dataset::{DatasetError, LabelSet, LabeledSample, read_csv, write_csv},
  detector::HandDetector,
  feature::FeatureVector,
  landmark::JointSet,
  output::Render,
  pipeline::LandmarkPipeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetSplit {
  Training,
  Validation,
}

impl DatasetSplit {
  pub const ALL: [DatasetSplit; 2] = [DatasetSplit::Training, DatasetSplit::Validation];

  pub fn dir_name(&self) -> &'static str {
    match self {
      DatasetSplit::Training => "Training",
      DatasetSplit::Validation => "Validation",
    }
  }
}

impl fmt::Display for DatasetSplit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.dir_name())
  }
}

/// 数据集目录结构
///
/// ```text
/// {root}/Training/A/A.0.png
/// {root}/Training/A/A.1.png
/// {root}/Training.csv
/// {root}/Validation/...
/// {root}/Validation.csv
/// ```
#[derive(Debug, Clone)]
pub struct DatasetLayout {
  root: PathBuf,
}

impl DatasetLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn split_dir(&self, split: DatasetSplit) -> PathBuf {
    self.root.join(split.dir_name())
  }

  pub fn csv_path(&self, split: DatasetSplit) -> PathBuf {
    self.root.join(format!("{}.csv", split.dir_name()))
  }

  /// 按序号列出 `{identifier}.{index}.png`，目录不存在时返回空列表
  pub fn image_files(
    &self,
    split: DatasetSplit,
    identifier: &str,
  ) -> Result<Vec<(usize, PathBuf)>, DatasetError> {
    let dir = self.split_dir(split).join(identifier);
    if !dir.is_dir() {
      return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&dir).map_err(|e| DatasetError::io(&dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
      let path = entry.map_err(|e| DatasetError::io(&dir, e))?.path();
      match parse_image_index(&path, identifier) {
        Some(index) => files.push((index, path)),
        None => debug!("跳过不符合命名规则的文件: {}", path.display()),
      }
    }
    files.sort();
    Ok(files)
  }
}

fn parse_image_index(path: &Path, identifier: &str) -> Option<usize> {
  let name = path.file_name()?.to_str()?;
  let rest = name.strip_prefix(identifier)?.strip_prefix('.')?;
  rest.strip_suffix(".png")?.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
  pub split: DatasetSplit,
  pub accepted: usize,
  pub rejected: Vec<PathBuf>,
  /// 直接复用了已有的 CSV
  pub reused: bool,
}

/// 把一个划分下的所有图像转换为样本并写入 CSV
///
/// CSV 已存在且 `force` 为假时直接读取；无法提取关节点的图像记录日志后跳过。
pub fn convert_split<D, O>(
  pipeline: &LandmarkPipeline<D, O>,
  layout: &DatasetLayout,
  split: DatasetSplit,
  labels: &LabelSet,
  force: bool,
) -> Result<(Vec<LabeledSample>, ConversionReport), DatasetError>
where
  D: HandDetector,
  O: Render<RgbImage, JointSet>,
  O::Error: fmt::Display,
{
  let csv_path = layout.csv_path(split);
  if csv_path.exists() && !force {
    info!("使用已有数据集: {}", csv_path.display());
    let samples = read_csv(&csv_path)?;
    labels.ensure_covers(&samples)?;
    let report = ConversionReport {
      split,
      accepted: samples.len(),
      rejected: Vec::new(),
      reused: true,
    };
    return Ok((samples, report));
  }

  info!("转换数据集 {}: {}", split, layout.split_dir(split).display());
  let mut samples = Vec::new();
  let mut rejected = Vec::new();

  for identifier in labels.iter() {
    let files = layout.image_files(split, identifier)?;
    if files.is_empty() {
      warn!("{} 中没有标签 '{}' 的图像", split, identifier);
      continue;
    }

    for (_, path) in files {
      match pipeline.process_path(&path) {
        Ok(joints) => samples.push(LabeledSample::new(
          FeatureVector::flatten(&joints),
          identifier,
        )),
        Err(e) => {
          warn!("拒绝图像 '{}': {}", path.display(), e);
          rejected.push(path);
        }
      }
    }
  }

  write_csv(&csv_path, &samples)?;
  info!(
    "{} 转换完成: 接受 {} 张, 拒绝 {} 张",
    split,
    samples.len(),
    rejected.len()
  );

  let report = ConversionReport {
    split,
    accepted: samples.len(),
    rejected,
    reused: false,
  };
  Ok((samples, report))
}
