// 该文件是 Zhiyu （指语） 项目的一部分。
// src/utils.rs - 通用工具
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
  ffi::OsString,
  fs,
  io::Write,
  path::{Path, PathBuf},
};

fn temp_path(path: &Path) -> PathBuf {
  let mut name = path
    .file_name()
    .map(OsString::from)
    .unwrap_or_else(|| OsString::from("artifact"));
  name.push(".tmp");
  path.with_file_name(name)
}

/// 先写临时文件再重命名，读者只会看到旧文件或完整的新文件
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent)?;
  }

  let tmp = temp_path(path);
  {
    let mut file = fs::File::create(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
  }
  fs::rename(&tmp, path)
}
