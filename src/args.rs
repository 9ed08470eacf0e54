// 该文件是 Zhiyu （指语） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;
use zhiyu::{
  detector::DetectOptions,
  geometry::{DEFAULT_CROP_MARGIN, DEFAULT_TARGET_HEIGHT},
  model::TrainConfig,
  pipeline::PipelineConfig,
};

/// Zhiyu 手语字母识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 把数据集图像转换为关节点 CSV
  Convert(ConvertArgs),
  /// 用 CSV 训练分类器
  Train(TrainArgs),
  /// 识别图像中的手语字母
  Classify(ClassifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct PipelineArgs {
  /// 手部检测器，可使用仓库自带的 `scripts/hand_landmarks.py`
  /// 例如: landmarker:///opt/zhiyu/scripts/hand_landmarks.py?python=python3&min_detection_confidence=0.5
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,

  /// 裁剪边距（像素）
  #[arg(long, default_value_t = DEFAULT_CROP_MARGIN, value_name = "PIXELS")]
  pub crop_margin: u32,

  /// 裁剪后图像高度（像素）
  #[arg(long, default_value_t = DEFAULT_TARGET_HEIGHT, value_name = "PIXELS")]
  pub target_height: u32,

  /// 在规范化图像上绘制关节点并输出到 --overlay
  #[arg(long)]
  pub show_debug_overlay: bool,

  /// 调试图像输出，如 image:///tmp/overlay.png 或 folder:///tmp/overlay
  #[arg(long, value_name = "OUTPUT")]
  pub overlay: Option<Url>,
}

impl PipelineArgs {
  pub fn pipeline_config(&self) -> PipelineConfig {
    PipelineConfig {
      detect: DetectOptions::from_query(&self.detector),
      crop_margin: self.crop_margin,
      target_height: self.target_height,
      show_debug_overlay: self.show_debug_overlay,
    }
  }
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
  #[command(flatten)]
  pub pipeline: PipelineArgs,

  /// 数据集根目录，包含 Training/ 与 Validation/
  #[arg(long, value_name = "DIR")]
  pub dataset: PathBuf,

  /// 参与转换的标签，缺省为内置的十个字母
  #[arg(long, value_delimiter = ',', value_name = "IDENTIFIERS")]
  pub identifiers: Vec<String>,

  /// 忽略已有 CSV，重新转换
  #[arg(long)]
  pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct TrainArgs {
  /// 数据集根目录，读取 Training.csv 与 Validation.csv
  #[arg(long, value_name = "DIR")]
  pub dataset: PathBuf,

  /// 模型目录，如 folder:///var/lib/zhiyu
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 标签集合，缺省为内置的十个字母
  #[arg(long, value_delimiter = ',', value_name = "IDENTIFIERS")]
  pub identifiers: Vec<String>,

  /// 隐藏层宽度
  #[arg(long, value_delimiter = ',', default_value = "1500,1000", value_name = "SIZES")]
  pub hidden: Vec<usize>,

  /// 最大训练轮数
  #[arg(long, default_value_t = 500, value_name = "EPOCHS")]
  pub max_epochs: usize,

  /// 随机种子
  #[arg(long, default_value_t = 1)]
  pub seed: u64,

  /// 已有模型时仍然重新训练
  #[arg(long)]
  pub force: bool,
}

impl TrainArgs {
  pub fn train_config(&self) -> TrainConfig {
    TrainConfig {
      hidden_layers: self.hidden.clone(),
      max_epochs: self.max_epochs,
      seed: self.seed,
      ..TrainConfig::default()
    }
  }
}

#[derive(clap::Args, Debug)]
pub struct ClassifyArgs {
  #[command(flatten)]
  pub pipeline: PipelineArgs,

  /// 模型目录，如 folder:///var/lib/zhiyu
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入图像文件或目录，如 image:///data/photos
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 识别结果输出，如 folder:///data/records?record=joints
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
}
