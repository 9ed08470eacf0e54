// 该文件是 Zhiyu （指语） 项目的一部分。
// src/model/store.rs - 模型文件的持久化
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
  io::ErrorKind,
  path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, utils::write_atomic};

pub const MODEL_FILE: &str = "mlp_model.json";
pub const SCALER_FILE: &str = "scalers.json";

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("读写 {path:?} 失败: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("模型文件 {path:?} 已损坏: {source}")]
  Corrupt {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
  #[error("缺少模型文件 {0:?}")]
  Missing(PathBuf),
  #[error("URL 协议不匹配: {0}")]
  SchemeMismatch(String),
}

/// 存放 `mlp_model.json` 与 `scalers.json` 的目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
  directory: PathBuf,
}

impl FromUrlWithScheme for ArtifactStore {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for ArtifactStore {
  type Error = StoreError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(StoreError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Ok(Self::new(url.path()))
  }
}

impl ArtifactStore {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      directory: directory.into(),
    }
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn model_path(&self) -> PathBuf {
    self.directory.join(MODEL_FILE)
  }

  pub fn scaler_path(&self) -> PathBuf {
    self.directory.join(SCALER_FILE)
  }

  /// 模型文件存在即视为已训练
  pub fn is_trained(&self) -> bool {
    self.model_path().is_file()
  }

  /// 先写缩放文件再写模型文件，两者各自原子替换
  pub fn save<M: Serialize, S: Serialize>(&self, model: &M, scaler: &S) -> Result<(), StoreError> {
    write_json(&self.scaler_path(), scaler)?;
    write_json(&self.model_path(), model)?;
    info!("模型已保存到 {:?}", self.directory);
    Ok(())
  }

  /// 模型文件不存在时返回 `None`；模型存在而缩放文件缺失视为错误
  pub fn load<M: DeserializeOwned, S: DeserializeOwned>(&self) -> Result<Option<(M, S)>, StoreError> {
    let Some(model) = read_json(&self.model_path())? else {
      return Ok(None);
    };
    let scaler_path = self.scaler_path();
    let scaler = read_json(&scaler_path)?.ok_or(StoreError::Missing(scaler_path))?;
    Ok(Some((model, scaler)))
  }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
  let bytes = serde_json::to_vec(value).map_err(|source| StoreError::Corrupt {
    path: path.to_path_buf(),
    source,
  })?;
  write_atomic(path, &bytes).map_err(|source| StoreError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
  let bytes = match fs::read(path) {
    Ok(bytes) => bytes,
    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
    Err(source) => {
      return Err(StoreError::Io {
        path: path.to_path_buf(),
        source,
      });
    }
  };
  serde_json::from_slice(&bytes)
    .map(Some)
    .map_err(|source| StoreError::Corrupt {
      path: path.to_path_buf(),
      source,
    })
}
