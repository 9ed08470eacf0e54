// 该文件是 Zhiyu （指语） 项目的一部分。
// src/landmark.rs - 手部关节点定义
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

/// 每只手的关节点数量
pub const NUM_JOINTS: usize = 21;

/// 关节点索引（与 MediaPipe 手部关键点顺序一致）
pub mod index {
  pub const WRIST: usize = 0;
  pub const THUMB_CMC: usize = 1;
  pub const THUMB_MCP: usize = 2;
  pub const THUMB_IP: usize = 3;
  pub const THUMB_TIP: usize = 4;
  pub const INDEX_FINGER_MCP: usize = 5;
  pub const INDEX_FINGER_PIP: usize = 6;
  pub const INDEX_FINGER_DIP: usize = 7;
  pub const INDEX_FINGER_TIP: usize = 8;
  pub const MIDDLE_FINGER_MCP: usize = 9;
  pub const MIDDLE_FINGER_PIP: usize = 10;
  pub const MIDDLE_FINGER_DIP: usize = 11;
  pub const MIDDLE_FINGER_TIP: usize = 12;
  pub const RING_FINGER_MCP: usize = 13;
  pub const RING_FINGER_PIP: usize = 14;
  pub const RING_FINGER_DIP: usize = 15;
  pub const RING_FINGER_TIP: usize = 16;
  pub const PINKY_MCP: usize = 17;
  pub const PINKY_PIP: usize = 18;
  pub const PINKY_DIP: usize = 19;
  pub const PINKY_TIP: usize = 20;
}

/// 手部骨架连线，用于调试绘制
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
  (0, 1),
  (1, 2),
  (2, 3),
  (3, 4),
  (0, 5),
  (5, 6),
  (6, 7),
  (7, 8),
  (5, 9),
  (9, 10),
  (10, 11),
  (11, 12),
  (9, 13),
  (13, 14),
  (14, 15),
  (15, 16),
  (13, 17),
  (0, 17),
  (17, 18),
  (18, 19),
  (19, 20),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LandmarkError {
  #[error("关节点数量错误: 期望 {expected} 个, 实际 {found} 个")]
  MalformedJointSet { expected: usize, found: usize },
}

/// 像素坐标系下的单个关节点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Joint {
  pub x: i32,
  pub y: i32,
}

impl Joint {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }
}

impl From<(i32, i32)> for Joint {
  fn from((x, y): (i32, i32)) -> Self {
    Self { x, y }
  }
}

/// 一只手的 21 个关节点，顺序固定
///
/// 只能通过长度校验构造，长度不为 21 的序列在这里就被拒绝，
/// 不会流入后续的特征编码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointSet {
  joints: [Joint; NUM_JOINTS],
}

impl JointSet {
  pub fn new(joints: [Joint; NUM_JOINTS]) -> Self {
    Self { joints }
  }

  pub fn joints(&self) -> &[Joint; NUM_JOINTS] {
    &self.joints
  }

  pub fn get(&self, index: usize) -> Option<Joint> {
    self.joints.get(index).copied()
  }

  pub fn wrist(&self) -> Joint {
    self.joints[index::WRIST]
  }

  pub fn middle_finger_tip(&self) -> Joint {
    self.joints[index::MIDDLE_FINGER_TIP]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Joint> {
    self.joints.iter()
  }

  /// 关节点的外接矩形 (min_x, min_y, max_x, max_y)
  pub fn bounds(&self) -> (i32, i32, i32, i32) {
    self.joints.iter().fold(
      (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
      |(min_x, min_y, max_x, max_y), j| {
        (min_x.min(j.x), min_y.min(j.y), max_x.max(j.x), max_y.max(j.y))
      },
    )
  }
}

impl TryFrom<Vec<Joint>> for JointSet {
  type Error = LandmarkError;

  fn try_from(joints: Vec<Joint>) -> Result<Self, Self::Error> {
    let found = joints.len();
    let joints: [Joint; NUM_JOINTS] =
      joints
        .try_into()
        .map_err(|_| LandmarkError::MalformedJointSet {
          expected: NUM_JOINTS,
          found,
        })?;
    Ok(Self { joints })
  }
}

impl TryFrom<&[Joint]> for JointSet {
  type Error = LandmarkError;

  fn try_from(joints: &[Joint]) -> Result<Self, Self::Error> {
    JointSet::try_from(joints.to_vec())
  }
}
