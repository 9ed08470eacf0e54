// 该文件是 Zhiyu （指语） 项目的一部分。
// tests/common/marker.rs - 以彩色圆点标记手腕与中指指尖的假检测器
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

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use zhiyu::detector::{DetectError, DetectOptions, DetectorSession, HandDetector, HandLandmarks};

pub const WRIST_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const TIP_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const MARKER_RADIUS: i32 = 8;

/// 白底图像，手腕处画红点，中指指尖处画绿点
pub fn hand_image(width: u32, height: u32, wrist: (i32, i32), tip: (i32, i32)) -> RgbImage {
  let mut image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
  draw_filled_circle_mut(&mut image, wrist, MARKER_RADIUS, WRIST_COLOR);
  draw_filled_circle_mut(&mut image, tip, MARKER_RADIUS, TIP_COLOR);
  image
}

pub fn blank_image(width: u32, height: u32) -> RgbImage {
  RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
}

/// 找到红绿两个圆点的质心，沿手腕到指尖的方向铺开 21 个关节点
#[derive(Debug, Default, Clone)]
pub struct MarkerDetector {
  pub opened: Arc<AtomicUsize>,
  pub closed: Arc<AtomicUsize>,
  /// 从第 n 个会话（从 1 开始）起不再报告任何手
  pub blind_from: Option<usize>,
}

impl MarkerDetector {
  pub fn blind_from(session: usize) -> Self {
    Self {
      blind_from: Some(session),
      ..Self::default()
    }
  }

  pub fn opened(&self) -> usize {
    self.opened.load(Ordering::SeqCst)
  }

  pub fn closed(&self) -> usize {
    self.closed.load(Ordering::SeqCst)
  }
}

pub struct MarkerSession {
  closed: Arc<AtomicUsize>,
  blind: bool,
}

impl Drop for MarkerSession {
  fn drop(&mut self) {
    self.closed.fetch_add(1, Ordering::SeqCst);
  }
}

impl HandDetector for MarkerDetector {
  type Session = MarkerSession;

  fn open_session(&self, _options: &DetectOptions) -> Result<Self::Session, DetectError> {
    let nth = self.opened.fetch_add(1, Ordering::SeqCst) + 1;
    Ok(MarkerSession {
      closed: self.closed.clone(),
      blind: self.blind_from.is_some_and(|from| nth >= from),
    })
  }
}

impl DetectorSession for MarkerSession {
  fn process(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
    if self.blind {
      return Ok(Vec::new());
    }
    let wrist = centroid(image, |p| p[0] > 200 && p[1] < 80 && p[2] < 80);
    let tip = centroid(image, |p| p[1] > 200 && p[0] < 80 && p[2] < 80);
    let (Some(wrist), Some(tip)) = (wrist, tip) else {
      return Ok(Vec::new());
    };

    let (w, h) = (image.width() as f32, image.height() as f32);
    let points = spread(wrist, tip)
      .into_iter()
      .map(|(x, y)| (x / w, y / h))
      .collect();
    Ok(vec![HandLandmarks { score: 0.9, points }])
  }
}

fn centroid(image: &RgbImage, pick: impl Fn(&Rgb<u8>) -> bool) -> Option<(f32, f32)> {
  let (mut sx, mut sy, mut n) = (0.0f64, 0.0f64, 0usize);
  for (x, y, pixel) in image.enumerate_pixels() {
    if pick(pixel) {
      sx += x as f64 + 0.5;
      sy += y as f64 + 0.5;
      n += 1;
    }
  }
  (n > 0).then(|| ((sx / n as f64) as f32, (sy / n as f64) as f32))
}

/// 0 为手腕，12 为中指指尖，其余按手指分组向两侧展开
fn spread(wrist: (f32, f32), tip: (f32, f32)) -> Vec<(f32, f32)> {
  let (dx, dy) = (tip.0 - wrist.0, tip.1 - wrist.1);
  let (px, py) = (-dy * 0.125, dx * 0.125);
  (0..21)
    .map(|i| match i {
      0 => wrist,
      12 => tip,
      _ => {
        let finger = ((i - 1) / 4) as f32 - 2.0;
        let along = ((i - 1) % 4 + 1) as f32 / 4.0 * 0.9;
        (
          wrist.0 + dx * along + px * finger,
          wrist.1 + dy * along + py * finger,
        )
      }
    })
    .collect()
}
