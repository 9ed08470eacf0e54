// 该文件是 Zhiyu （指语） 项目的一部分。
// src/detector/landmarker.rs - 外部关键点检测进程
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

//! 通过外部进程调用手部关键点模型（例如 MediaPipe Hands 脚本）。
//!
//! 每个会话对应一个子进程：
//! - 启动参数：`--min-detection-confidence`、`--min-tracking-confidence`、`--max-hands`
//! - 标准输入：宽、高、通道数（各为小端 `u32`）后接 RGB 原始数据
//! - 标准输出：一行 JSON `{"hands":[{"score":0.9,"landmarks":[{"x":..,"y":..}]}],"error":null}`

use std::{
  io::{BufRead, BufReader, ErrorKind, Write},
  path::PathBuf,
  process::{Child, Command, Stdio},
};

use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detector::{DetectError, DetectOptions, DetectorSession, HandDetector, HandLandmarks},
};

const DEFAULT_PYTHON: &str = "python3";
const RGB_CHANNELS: u32 = 3;

#[derive(Deserialize, Debug)]
struct PointJson {
  x: f32,
  y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
  score: f32,
  landmarks: Vec<PointJson>,
}

#[derive(Deserialize, Debug)]
struct ResponseJson {
  #[serde(default)]
  hands: Vec<HandJson>,
  #[serde(default)]
  error: Option<String>,
}

/// 解析检测进程输出的一行 JSON
pub(crate) fn parse_response(line: &str) -> Result<Vec<HandLandmarks>, DetectError> {
  let response: ResponseJson = serde_json::from_str(line.trim())?;
  if let Some(error) = response.error {
    return Err(DetectError::Backend(error));
  }

  Ok(
    response
      .hands
      .into_iter()
      .map(|hand| HandLandmarks {
        score: hand.score,
        points: hand.landmarks.into_iter().map(|p| (p.x, p.y)).collect(),
      })
      .collect(),
  )
}

#[derive(Debug, Clone)]
pub struct LandmarkerDetector {
  program: PathBuf,
  script: PathBuf,
}

impl FromUrlWithScheme for LandmarkerDetector {
  const SCHEME: &'static str = "landmarker";
}

impl FromUrl for LandmarkerDetector {
  type Error = DetectError;

  /// `landmarker:///path/to/hand_landmarks.py?python=/usr/bin/python3`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let program = url
      .query_pairs()
      .find(|(k, _)| k == "python")
      .map(|(_, v)| PathBuf::from(v.as_ref()))
      .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON));

    Ok(Self::new(program, url.path()))
  }
}

impl LandmarkerDetector {
  pub fn new(program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      script: script.into(),
    }
  }
}

impl HandDetector for LandmarkerDetector {
  type Session = LandmarkerSession;

  fn open_session(&self, options: &DetectOptions) -> Result<Self::Session, DetectError> {
    debug!("启动关键点检测进程: {}", self.script.display());
    let child = Command::new(&self.program)
      .arg(&self.script)
      .arg("--min-detection-confidence")
      .arg(options.min_detection_confidence.to_string())
      .arg("--min-tracking-confidence")
      .arg(options.min_tracking_confidence.to_string())
      .arg("--max-hands")
      .arg(options.max_hands.to_string())
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::inherit())
      .spawn()?;

    Ok(LandmarkerSession { child })
  }
}

/// 检测进程的作用域守卫，离开作用域时结束并回收子进程
pub struct LandmarkerSession {
  child: Child,
}

impl LandmarkerSession {
  /// 写完后关闭 stdin 作为输入结束标志
  fn write_frame(&mut self, image: &RgbImage) -> Result<(), DetectError> {
    let mut stdin = self
      .child
      .stdin
      .take()
      .ok_or_else(|| DetectError::Protocol("无法获取检测进程 stdin".to_string()))?;
    stdin.write_all(&image.width().to_le_bytes())?;
    stdin.write_all(&image.height().to_le_bytes())?;
    stdin.write_all(&RGB_CHANNELS.to_le_bytes())?;
    stdin.write_all(image.as_raw())?;
    stdin.flush()?;
    Ok(())
  }

  fn read_line(&mut self) -> Result<String, DetectError> {
    let stdout = self
      .child
      .stdout
      .take()
      .ok_or_else(|| DetectError::Protocol("无法获取检测进程 stdout".to_string()))?;
    let mut line = String::new();
    BufReader::new(stdout).read_line(&mut line)?;
    Ok(line)
  }
}

impl DetectorSession for LandmarkerSession {
  fn process(&mut self, image: &RgbImage) -> Result<Vec<HandLandmarks>, DetectError> {
    // 进程可能先输出错误再退出，此时管道已断开，仍以它的输出为准
    let broken_pipe = match self.write_frame(image) {
      Ok(()) => None,
      Err(DetectError::Io(e)) if e.kind() == ErrorKind::BrokenPipe => {
        debug!("检测进程提前关闭了输入: {}", e);
        Some(e)
      }
      Err(e) => return Err(e),
    };

    let line = self.read_line()?;
    if line.trim().is_empty() {
      return Err(match broken_pipe {
        Some(e) => DetectError::Io(e),
        None => DetectError::Protocol("检测进程没有输出".to_string()),
      });
    }

    parse_response(&line)
  }
}

impl Drop for LandmarkerSession {
  fn drop(&mut self) {
    match self.child.try_wait() {
      Ok(Some(_)) => {}
      _ => {
        if let Err(e) = self.child.kill() {
          warn!("结束检测进程失败: {}", e);
        }
      }
    }
    let _ = self.child.wait();
  }
}
