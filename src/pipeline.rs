// 该文件是 Zhiyu （指语） 项目的一部分。
// src/pipeline.rs - 关节点提取流水线
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
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  detector::{DetectError, DetectOptions, HandDetector},
  geometry::{self, DEFAULT_CROP_MARGIN, DEFAULT_TARGET_HEIGHT, GeometryError},
  landmark::JointSet,
  output::{NoOutput, Render},
};

/// 流水线阶段
///
/// `Start → Detect1 → Orient → Rotate → Detect2 → Crop → Detect3 → Done`，
/// 任一检测阶段失败即终止，不重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
  Start,
  Detect1,
  Orient,
  Rotate,
  Detect2,
  Crop,
  Detect3,
  Done,
}

impl fmt::Display for PipelineStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      PipelineStage::Start => "start",
      PipelineStage::Detect1 => "detect-1",
      PipelineStage::Orient => "orient",
      PipelineStage::Rotate => "rotate",
      PipelineStage::Detect2 => "detect-2",
      PipelineStage::Crop => "crop",
      PipelineStage::Detect3 => "detect-3",
      PipelineStage::Done => "done",
    };
    f.write_str(name)
  }
}

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("[{stage}] 检测失败: {source}")]
  Detection {
    stage: PipelineStage,
    #[source]
    source: DetectError,
  },
  #[error("[{stage}] 几何处理失败: {source}")]
  Geometry {
    stage: PipelineStage,
    #[source]
    source: GeometryError,
  },
  #[error("无法读取图像 {path}: {source}")]
  ImageLoad {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
}

impl PipelineError {
  pub fn is_hand_not_found(&self) -> bool {
    matches!(self, PipelineError::Detection { source, .. } if source.is_hand_not_found())
  }

  pub fn stage(&self) -> Option<PipelineStage> {
    match self {
      PipelineError::Detection { stage, .. } | PipelineError::Geometry { stage, .. } => Some(*stage),
      PipelineError::ImageLoad { .. } => None,
    }
  }
}

/// 流水线配置
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
  pub detect: DetectOptions,
  /// 裁剪时在关节点外接框四周保留的像素
  pub crop_margin: u32,
  /// 裁剪后缩放到的高度，宽度按比例计算
  pub target_height: u32,
  /// 在最终图像上绘制关节点并交给调试输出
  pub show_debug_overlay: bool,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      detect: DetectOptions::default(),
      crop_margin: DEFAULT_CROP_MARGIN,
      target_height: DEFAULT_TARGET_HEIGHT,
      show_debug_overlay: false,
    }
  }
}

/// 一次流水线运行的完整结果
#[derive(Debug, Clone)]
pub struct PipelineTrace {
  pub joints: JointSet,
  pub orientation_degrees: f64,
  /// 旋转、裁剪、缩放后的图像，`joints` 即位于该图像坐标系
  pub canonical_image: RgbImage,
}

pub struct LandmarkPipeline<D, O = NoOutput> {
  detector: D,
  config: PipelineConfig,
  overlay: O,
}

impl<D: HandDetector> LandmarkPipeline<D> {
  pub fn new(detector: D, config: PipelineConfig) -> Self {
    Self {
      detector,
      config,
      overlay: NoOutput,
    }
  }
}

impl<D, O> LandmarkPipeline<D, O>
where
  D: HandDetector,
  O: Render<RgbImage, JointSet>,
  O::Error: fmt::Display,
{
  /// 替换调试输出，仅在 `show_debug_overlay` 打开时使用
  pub fn with_overlay<O2>(self, overlay: O2) -> LandmarkPipeline<D, O2> {
    LandmarkPipeline {
      detector: self.detector,
      config: self.config,
      overlay,
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn detector(&self) -> &D {
    &self.detector
  }

  /// 读取图像文件并提取关节点
  pub fn process_path(&self, path: impl AsRef<Path>) -> Result<JointSet, PipelineError> {
    let image = load_image(path.as_ref())?;
    self.process_image(&image)
  }

  /// 对已解码的图像提取关节点
  pub fn process_image(&self, image: &RgbImage) -> Result<JointSet, PipelineError> {
    self.process_image_traced(image).map(|trace| trace.joints)
  }

  pub fn process_image_traced(&self, image: &RgbImage) -> Result<PipelineTrace, PipelineError> {
    debug!(
      "[{}] 输入图像 {}x{}",
      PipelineStage::Start,
      image.width(),
      image.height()
    );

    let joints = self.detect_at(PipelineStage::Detect1, image)?;

    let degrees = geometry::orientation_degrees(&joints);
    debug!("[{}] 手部朝向 {:.2}°", PipelineStage::Orient, degrees);

    // 旋转的是原始输入图像
    let rotated = geometry::rotate(image, degrees);
    debug!("[{}] 旋转完成", PipelineStage::Rotate);

    let joints = self.detect_at(PipelineStage::Detect2, &rotated)?;

    let cropped = geometry::crop_and_resize(
      &rotated,
      &joints,
      self.config.crop_margin,
      self.config.target_height,
    )
    .map_err(|source| PipelineError::Geometry {
      stage: PipelineStage::Crop,
      source,
    })?;
    debug!(
      "[{}] 裁剪缩放到 {}x{}",
      PipelineStage::Crop,
      cropped.width(),
      cropped.height()
    );

    let joints = self.detect_at(PipelineStage::Detect3, &cropped)?;
    debug!("[{}] 关节点提取完成", PipelineStage::Done);

    let trace = PipelineTrace {
      joints,
      orientation_degrees: degrees,
      canonical_image: cropped,
    };

    if self.config.show_debug_overlay
      && let Err(e) = self
        .overlay
        .render_result(&trace.canonical_image, &trace.joints)
    {
      warn!("调试图像输出失败: {}", e);
    }

    Ok(trace)
  }

  fn detect_at(&self, stage: PipelineStage, image: &RgbImage) -> Result<JointSet, PipelineError> {
    self
      .detector
      .detect(image, &self.config.detect)
      .map_err(|source| {
        debug!("[{}] 检测失败: {}", stage, source);
        PipelineError::Detection { stage, source }
      })
  }
}

/// 解码图像文件为 RGB
pub fn load_image(path: &Path) -> Result<RgbImage, PipelineError> {
  image::open(path)
    .map(|image| image.to_rgb8())
    .map_err(|source| PipelineError::ImageLoad {
      path: path.to_path_buf(),
      source,
    })
}
