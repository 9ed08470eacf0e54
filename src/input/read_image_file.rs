// 该文件是 Zhiyu （指语） 项目的一部分。
// src/input/read_image_file.rs - 从图像文件或目录读取输入
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
  fs,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use super::InputFrame;
use crate::{FromUrl, FromUrlWithScheme};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("读取 {path:?} 失败: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("解码 {path:?} 失败: {source}")]
  ImageLoad {
    path: PathBuf,
    #[source]
    source: image::ImageError,
  },
}

impl ImageFileInputError {
  pub fn path(&self) -> Option<&Path> {
    match self {
      ImageFileInputError::SchemeMismatch(_) => None,
      ImageFileInputError::Io { path, .. } | ImageFileInputError::ImageLoad { path, .. } => {
        Some(path)
      }
    }
  }
}

/// 单个图像文件，或目录下的全部图像文件（按文件名排序，不递归）
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  files: Vec<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch(url.scheme().to_string()));
    }
    Self::open(url.path())
  }
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let io = |source| ImageFileInputError::Io {
      path: path.to_path_buf(),
      source,
    };

    let files = if fs::metadata(path).map_err(io)?.is_dir() {
      let mut files = Vec::new();
      for entry in fs::read_dir(path).map_err(io)? {
        let file = entry.map_err(io)?.path();
        if file.is_file() && is_image_file(&file) {
          files.push(file);
        }
      }
      files.sort();
      files
    } else {
      vec![path.to_path_buf()]
    };

    debug!("输入 {:?} 共 {} 个图像文件", path, files.len());
    Ok(Self { files })
  }

  pub fn files(&self) -> &[PathBuf] {
    &self.files
  }

  /// 逐个解码，单个文件失败不影响后续文件
  pub fn into_frames(self) -> ImageFileFrames {
    ImageFileFrames {
      files: self.files.into_iter(),
    }
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

pub struct ImageFileFrames {
  files: std::vec::IntoIter<PathBuf>,
}

impl Iterator for ImageFileFrames {
  type Item = Result<InputFrame, ImageFileInputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.files.next()?;
    let frame = image::open(&path)
      .map(|image| InputFrame {
        image: image.to_rgb8(),
        path: path.clone(),
      })
      .map_err(|source| ImageFileInputError::ImageLoad { path, source });
    Some(frame)
  }
}

#[cfg(test)]
mod tests {
  use image::{Rgb, RgbImage};

  use super::*;

  fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("zhiyu-input-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn directory_lists_images_in_order() {
    let dir = scratch("dir");
    RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(dir.join("b.png")).unwrap();
    RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(dir.join("a.PNG")).unwrap();
    fs::write(dir.join("notes.txt"), b"x").unwrap();
    fs::write(dir.join("c.jpg"), b"not an image").unwrap();

    let input = ImageFileInput::open(&dir).unwrap();
    let names: Vec<_> = input
      .files()
      .iter()
      .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
      .collect();
    assert_eq!(names, vec!["a.PNG", "b.png", "c.jpg"]);

    let frames: Vec<_> = input.into_frames().collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].as_ref().unwrap().image.dimensions(), (4, 3));
    assert!(frames[1].is_ok());
    let err = frames[2].as_ref().unwrap_err();
    assert_eq!(err.path(), Some(dir.join("c.jpg").as_path()));
    let _ = fs::remove_dir_all(dir);
  }

  #[test]
  fn url_scheme_is_checked() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemeMismatch(_))
    ));
    let url = Url::parse("image:///definitely/not/here.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::Io { .. })
    ));
  }
}
