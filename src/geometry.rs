// 该文件是 Zhiyu （指语） 项目的一部分。
// src/geometry.rs - 手部姿态几何归一化
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

use image::{
  Rgb, RgbImage,
  imageops::{self, FilterType},
};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use thiserror::Error;
use tracing::debug;

use crate::landmark::JointSet;

pub const DEFAULT_CROP_MARGIN: u32 = 25;
pub const DEFAULT_TARGET_HEIGHT: u32 = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
  #[error("裁剪区域退化: 行 [{top}, {bottom}), 列 [{left}, {right})")]
  DegenerateCropRegion {
    top: u32,
    bottom: u32,
    left: u32,
    right: u32,
  },
  #[error("目标高度不能为 0")]
  ZeroTargetHeight,
}

/// 手部朝向角（度）
///
/// 腕部 (0) 指向中指指尖 (12) 的向量角度加 90°，手指竖直向上时为 0。
pub fn orientation_degrees(joints: &JointSet) -> f64 {
  let wrist = joints.wrist();
  let tip = joints.middle_finger_tip();
  let dy = (tip.y - wrist.y) as f64;
  let dx = (tip.x - wrist.x) as f64;
  dy.atan2(dx).to_degrees() + 90.0
}

/// 绕图像中心旋转，正角度为屏幕上的逆时针方向
///
/// 输出尺寸与输入一致，移出画面的像素丢弃，空出的区域填黑。
pub fn rotate(image: &RgbImage, degrees: f64) -> RgbImage {
  // imageproc 的角度以顺时针为正
  let theta = -(degrees.to_radians() as f32);
  rotate_about_center(image, theta, Interpolation::Bilinear, Rgb([0, 0, 0]))
}

/// 裁剪区域，`bottom` 与 `right` 为开区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
  pub top: u32,
  pub bottom: u32,
  pub left: u32,
  pub right: u32,
}

impl CropRegion {
  /// 关节点外接框向外扩展 `margin`，再逐边截断到 `[0, 尺寸]`
  pub fn around(
    joints: &JointSet,
    margin: u32,
    width: u32,
    height: u32,
  ) -> Result<Self, GeometryError> {
    let (min_x, min_y, max_x, max_y) = joints.bounds();
    let margin = margin as i64;
    let clamp = |v: i64, limit: u32| v.clamp(0, limit as i64) as u32;

    let region = CropRegion {
      top: clamp(min_y as i64 - margin, height),
      bottom: clamp(max_y as i64 + margin, height),
      left: clamp(min_x as i64 - margin, width),
      right: clamp(max_x as i64 + margin, width),
    };

    if region.height() == 0 || region.width() == 0 {
      return Err(region.degenerate());
    }
    Ok(region)
  }

  pub fn width(&self) -> u32 {
    self.right.saturating_sub(self.left)
  }

  pub fn height(&self) -> u32 {
    self.bottom.saturating_sub(self.top)
  }

  fn degenerate(&self) -> GeometryError {
    GeometryError::DegenerateCropRegion {
      top: self.top,
      bottom: self.bottom,
      left: self.left,
      right: self.right,
    }
  }
}

/// 按关节点裁剪并保持宽高比缩放到 `target_height`
pub fn crop_and_resize(
  image: &RgbImage,
  joints: &JointSet,
  margin: u32,
  target_height: u32,
) -> Result<RgbImage, GeometryError> {
  if target_height == 0 {
    return Err(GeometryError::ZeroTargetHeight);
  }

  let region = CropRegion::around(joints, margin, image.width(), image.height())?;
  let target_width =
    (target_height as f64 * region.width() as f64 / region.height() as f64).round() as u32;
  if target_width == 0 {
    return Err(region.degenerate());
  }

  debug!(
    "裁剪区域 {:?}, 缩放到 {}x{}",
    region, target_width, target_height
  );

  let cropped =
    imageops::crop_imm(image, region.left, region.top, region.width(), region.height()).to_image();
  Ok(resize_area(&cropped, target_width, target_height))
}

/// 面积插值：缩小时按像素块求平均，放大时退化为双线性插值
pub fn resize_area(image: &RgbImage, width: u32, height: u32) -> RgbImage {
  if (width, height) == image.dimensions() {
    image.clone()
  } else if width <= image.width() && height <= image.height() {
    imageops::thumbnail(image, width, height)
  } else {
    imageops::resize(image, width, height, FilterType::Triangle)
  }
}
