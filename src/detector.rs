// 该文件是 Zhiyu （指语） 项目的一部分。
// src/detector.rs - 手部关键点检测
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

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::landmark::{Joint, JointSet, LandmarkError};

mod landmarker;
pub use self::landmarker::{LandmarkerDetector, LandmarkerSession};

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("未检测到手部")]
  HandNotFound,
  #[error("输入图像为空")]
  EmptyImage,
  #[error("关节点无效: {0}")]
  Landmark(#[from] LandmarkError),
  #[error("检测器返回错误: {0}")]
  Backend(String),
  #[error("检测器协议错误: {0}")]
  Protocol(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl DetectError {
  pub fn is_hand_not_found(&self) -> bool {
    matches!(self, DetectError::HandNotFound)
  }
}

/// 检测参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectOptions {
  pub min_detection_confidence: f32,
  pub min_tracking_confidence: f32,
  pub max_hands: usize,
}

impl Default for DetectOptions {
  fn default() -> Self {
    Self {
      min_detection_confidence: 0.5,
      min_tracking_confidence: 0.5,
      max_hands: 1,
    }
  }
}

impl DetectOptions {
  /// 从检测器 URL 的查询参数读取阈值，如
  /// `landmarker:///opt/hands/detect.py?min_detection_confidence=0.7`
  pub fn from_query(url: &url::Url) -> Self {
    let default = Self::default();
    Self {
      min_detection_confidence: crate::query_value(
        url,
        "min_detection_confidence",
        default.min_detection_confidence,
      ),
      min_tracking_confidence: crate::query_value(
        url,
        "min_tracking_confidence",
        default.min_tracking_confidence,
      ),
      max_hands: crate::query_value(url, "max_hands", default.max_hands),
    }
  }
}

/// 检测器输出的一只手，坐标归一化到 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
  pub score: f32,
  pub points: Vec<(f32, f32)>,
}

/// 一次检测会话；会话在 `Drop` 时释放底层资源
pub trait DetectorSession {
  fn process(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError>;
}

pub trait HandDetector {
  type Session: DetectorSession;

  fn open_session(&self, options: &DetectOptions) -> Result<Self::Session, DetectError>;

  /// 对单张图像检测一只手
  ///
  /// 每次调用都会新开一个会话并在返回前关闭，几何变换前后的检测
  /// 之间不共享任何跟踪状态。
  fn detect(&self, image: &RgbImage, options: &DetectOptions) -> Result<JointSet, DetectError> {
    if image.width() == 0 || image.height() == 0 {
      return Err(DetectError::EmptyImage);
    }

    let hands = {
      let mut session = self.open_session(options)?;
      session.process(image)?
    };

    select_hand(hands, image.width(), image.height(), options)
  }
}

impl<D: HandDetector + ?Sized> HandDetector for &D {
  type Session = D::Session;

  fn open_session(&self, options: &DetectOptions) -> Result<Self::Session, DetectError> {
    (**self).open_session(options)
  }
}

/// 取第一只达到置信度的手并换算为像素坐标（截断取整）
pub fn select_hand(
  hands: Vec<HandLandmarks>,
  width: u32,
  height: u32,
  options: &DetectOptions,
) -> Result<JointSet, DetectError> {
  debug!("检测器返回 {} 只手", hands.len());
  let hand = hands
    .into_iter()
    .take(options.max_hands.max(1))
    .find(|hand| hand.score >= options.min_detection_confidence)
    .ok_or(DetectError::HandNotFound)?;

  let (w, h) = (width as f32, height as f32);
  let joints: Vec<Joint> = hand
    .points
    .iter()
    .map(|&(x, y)| Joint::new((x * w) as i32, (y * h) as i32))
    .collect();

  Ok(JointSet::try_from(joints)?)
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;

  struct FixedDetector {
    hands: Vec<HandLandmarks>,
    closed: Arc<AtomicUsize>,
  }

  struct FixedSession {
    hands: Vec<HandLandmarks>,
    closed: Arc<AtomicUsize>,
  }

  impl DetectorSession for FixedSession {
    fn process(&mut self, _image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
      Ok(self.hands.clone())
    }
  }

  impl Drop for FixedSession {
    fn drop(&mut self) {
      self.closed.fetch_add(1, Ordering::SeqCst);
    }
  }

  impl HandDetector for FixedDetector {
    type Session = FixedSession;

    fn open_session(&self, _options: &DetectOptions) -> Result<Self::Session, DetectError> {
      Ok(FixedSession {
        hands: self.hands.clone(),
        closed: self.closed.clone(),
      })
    }
  }

  fn hand(score: f32, n: usize) -> HandLandmarks {
    HandLandmarks {
      score,
      points: (0..n).map(|i| (i as f32 / 40.0, 0.5)).collect(),
    }
  }

  fn detector(hands: Vec<HandLandmarks>) -> FixedDetector {
    FixedDetector {
      hands,
      closed: Arc::new(AtomicUsize::new(0)),
    }
  }

  #[test]
  fn converts_normalized_points_by_truncation() {
    let det = detector(vec![hand(0.9, 21)]);
    let image = RgbImage::new(99, 51);
    let joints = det.detect(&image, &DetectOptions::default()).unwrap();
    // 0.5 * 51 = 25.5 -> 25
    assert!(joints.iter().all(|j| j.y == 25));
    // 1 / 40 * 99 = 2.475 -> 2
    assert_eq!(joints.get(1), Some(Joint::new(2, 25)));
  }

  #[test]
  fn low_confidence_hands_are_not_found() {
    let det = detector(vec![hand(0.2, 21)]);
    let image = RgbImage::new(10, 10);
    let err = det.detect(&image, &DetectOptions::default()).unwrap_err();
    assert!(err.is_hand_not_found());
  }

  #[test]
  fn first_confident_hand_wins() {
    let mut second = hand(0.95, 21);
    second.points[0] = (1.0, 1.0);
    let det = detector(vec![hand(0.1, 21), second]);
    let image = RgbImage::new(10, 10);
    let joints = det.detect(&image, &DetectOptions::default()).unwrap();
    assert_eq!(joints.wrist(), Joint::new(10, 10));
  }

  #[test]
  fn malformed_hand_is_rejected() {
    let det = detector(vec![hand(0.9, 20)]);
    let image = RgbImage::new(10, 10);
    let err = det.detect(&image, &DetectOptions::default()).unwrap_err();
    assert!(matches!(
      err,
      DetectError::Landmark(LandmarkError::MalformedJointSet { found: 20, .. })
    ));
  }

  #[test]
  fn empty_image_never_opens_a_session() {
    let det = detector(vec![hand(0.9, 21)]);
    let err = det.detect(&RgbImage::new(0, 0), &DetectOptions::default()).unwrap_err();
    assert!(matches!(err, DetectError::EmptyImage));
    assert_eq!(det.closed.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn session_is_released_after_every_call() {
    let det = detector(vec![]);
    let image = RgbImage::new(10, 10);
    for _ in 0..3 {
      let _ = det.detect(&image, &DetectOptions::default());
    }
    assert_eq!(det.closed.load(Ordering::SeqCst), 3);
  }

  #[test]
  fn options_read_from_query() {
    let url = url::Url::parse("landmarker:///a.py?min_detection_confidence=0.7&max_hands=2").unwrap();
    let options = DetectOptions::from_query(&url);
    assert_eq!(options.min_detection_confidence, 0.7);
    assert_eq!(options.min_tracking_confidence, 0.5);
    assert_eq!(options.max_hands, 2);

    let url = url::Url::parse("landmarker:///a.py?max_hands=many").unwrap();
    assert_eq!(DetectOptions::from_query(&url), DetectOptions::default());
  }
}
