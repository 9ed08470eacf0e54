// 该文件是 Zhiyu （指语） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  landmark::JointSet,
  output::{
    Render,
    draw::{Draw, DrawLandmarksOnFrame, Record},
  },
  task::Recognition,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

pub enum DrawWrapper {
  Draw(Box<Draw>),
  Record(Record),
}

impl DrawWrapper {
  pub fn save_result(
    &self,
    path: &Path,
    frame: &RgbImage,
    result: &Recognition,
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(draw) => {
        let image = draw.draw_landmarks(frame, &result.joints);
        image.save(path)?;
      }
      DrawWrapper::Record(record) => {
        frame.save(path)?;
        record.record(result, path)?;
      }
    };

    Ok(())
  }

  pub fn with(kind: &str) -> Self {
    match kind {
      "record-joints" => DrawWrapper::Record(Record { with_joints: true }),
      "record" => DrawWrapper::Record(Record { with_joints: false }),
      _ => DrawWrapper::Draw(Box::default()),
    }
  }
}

/// 按日期分目录保存每一帧的识别结果
///
/// `folder:///var/zhiyu/records?record=joints`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counter: AtomicU16,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let kind = {
      let mut kind = "draw";
      for (k, v) in uri.query_pairs() {
        if k == "record" {
          if v == "joints" {
            kind = "record-joints";
          } else {
            kind = "record";
          }
          break;
        }
      }
      kind
    };

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: DrawWrapper::with(kind),
      frame_counter: AtomicU16::new(0),
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, identifier: &str) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}-{}.png",
      now.format("%H-%M-%S"),
      self.frame_id(),
      identifier
    )))
  }
}

impl Render<RgbImage, Recognition> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &Recognition) -> Result<(), Self::Error> {
    let path = self.frame_path(&result.prediction.identifier)?;
    debug!("记录识别结果: {}", path.display());
    self.draw.save_result(&path, frame, result)
  }
}

impl Render<RgbImage, JointSet> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &JointSet) -> Result<(), Self::Error> {
    let path = self.frame_path("overlay")?;
    debug!("记录调试图像: {}", path.display());
    Draw::default().draw_landmarks(frame, result).save(&path)?;
    Ok(())
  }
}
