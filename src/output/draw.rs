// 该文件是 Zhiyu （指语） 项目的一部分。
// src/output/draw.rs - 关节点可视化
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

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::{
  landmark::{HAND_CONNECTIONS, JointSet},
  task::Recognition,
};

const JOINT_RADIUS: i32 = 5;
const JOINT_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const CONNECTION_COLOR: [u8; 3] = [255, 255, 255]; // 白色

pub struct Draw {
  joint_radius: i32,
  joint_color: [u8; 3],
  connection_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      joint_radius: JOINT_RADIUS,
      joint_color: JOINT_COLOR,
      connection_color: CONNECTION_COLOR,
    }
  }
}

pub trait DrawLandmarksOnImage {
  fn draw_landmarks_on_image(&self, image: &mut RgbImage, joints: &JointSet);
}

pub trait DrawLandmarksOnFrame {
  /// 在图像副本上绘制，不修改输入
  fn draw_landmarks(&self, frame: &RgbImage, joints: &JointSet) -> RgbImage;
}

impl<D: DrawLandmarksOnImage> DrawLandmarksOnFrame for D {
  fn draw_landmarks(&self, frame: &RgbImage, joints: &JointSet) -> RgbImage {
    let mut image = frame.clone();
    self.draw_landmarks_on_image(&mut image, joints);
    image
  }
}

impl DrawLandmarksOnImage for Draw {
  fn draw_landmarks_on_image(&self, image: &mut RgbImage, joints: &JointSet) {
    let points = joints.joints();

    // 先画骨架连线，再画关节点
    for &(a, b) in HAND_CONNECTIONS.iter() {
      let (pa, pb) = (points[a], points[b]);
      draw_line_segment_mut(
        image,
        (pa.x as f32, pa.y as f32),
        (pb.x as f32, pb.y as f32),
        Rgb(self.connection_color),
      );
    }

    for joint in points.iter() {
      draw_filled_circle_mut(
        image,
        (joint.x, joint.y),
        self.joint_radius,
        Rgb(self.joint_color),
      );
    }
  }
}

pub struct Record {
  pub with_joints: bool,
}

impl Record {
  /// 写出 `identifier;confidence[;x0;y0;...]` 到与图像同名的 txt 文件
  pub fn record(&self, result: &Recognition, path: &std::path::Path) -> Result<(), std::io::Error> {
    let mut fields = vec![
      result.prediction.identifier.clone(),
      format!("{:.3}", result.prediction.confidence),
    ];
    if self.with_joints {
      fields.extend(result.joints.iter().flat_map(|j| [j.x.to_string(), j.y.to_string()]));
    }
    std::fs::write(path.with_extension("txt"), fields.join(";"))?;
    Ok(())
  }
}
