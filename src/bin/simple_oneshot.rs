// 该文件是 Zhiyu （指语） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像识别示例
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

use anyhow::Result;
use clap::Parser;
use url::Url;
use zhiyu::{
  FromUrl, LandmarkPipeline, PipelineConfig,
  detector::{DetectOptions, LandmarkerDetector},
  model::{ArtifactStore, Model, SignClassifier},
  output::{Render, SaveImageFileOutput},
  pipeline::load_image,
  task::Recognizer,
};
use tracing::info;

/// Zhiyu 单张图像识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型目录
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 手部检测器
  #[arg(long, value_name = "DETECTOR")]
  pub detector: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 绘制关节点后的规范化图像
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型目录: {}", args.model);
  info!("手部检测器: {}", args.detector);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let detector = LandmarkerDetector::from_url(&args.detector)?;
  let config = PipelineConfig {
    detect: DetectOptions::from_query(&args.detector),
    ..PipelineConfig::default()
  };
  let classifier = SignClassifier::open(ArtifactStore::from_url(&args.model)?)?;
  let recognizer = Recognizer::new(LandmarkPipeline::new(detector, config), classifier);
  let output = SaveImageFileOutput::from_url(&args.output)?;
  let image = load_image(std::path::Path::new(args.input.path()))?;

  info!("开始识别...");
  let now = std::time::Instant::now();
  let recognized = recognizer.infer(&image)?;
  info!("识别完成，耗时: {:.2?}", now.elapsed());
  info!(
    "结果: {} ({:.3})",
    recognized.recognition.prediction.identifier, recognized.recognition.prediction.confidence
  );
  output.render_result(&recognized.canonical_image, &recognized.recognition)?;

  Ok(())
}
