// 该文件是 Zhiyu （指语） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use zhiyu::{
  FromUrl, LandmarkPipeline,
  dataset::{DatasetLayout, DatasetSplit, LabelSet, convert_split, read_csv},
  detector::LandmarkerDetector,
  input::ImageFileInput,
  model::{ArtifactStore, SignClassifier},
  output::OutputWrapper,
  task::{RecognizeTask, Recognizer, Task},
};

use crate::args::{Args, ClassifyArgs, Command, ConvertArgs, PipelineArgs, TrainArgs};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  match args.command {
    Command::Convert(args) => convert(args),
    Command::Train(args) => train(args),
    Command::Classify(args) => classify(args),
  }
}

fn label_set(identifiers: &[String]) -> Result<LabelSet> {
  if identifiers.is_empty() {
    Ok(LabelSet::letters())
  } else {
    Ok(LabelSet::new(identifiers.iter().map(String::as_str))?)
  }
}

fn build_pipeline(
  args: &PipelineArgs,
) -> Result<LandmarkPipeline<LandmarkerDetector, Option<OutputWrapper>>> {
  info!("手部检测器: {}", args.detector);
  let detector = LandmarkerDetector::from_url(&args.detector)?;
  let overlay = match &args.overlay {
    Some(url) => Some(OutputWrapper::from_url(url)?),
    None => {
      if args.show_debug_overlay {
        warn!("已开启调试图像但未指定 --overlay，调试图像不会输出");
      }
      None
    }
  };
  Ok(LandmarkPipeline::new(detector, args.pipeline_config()).with_overlay(overlay))
}

fn convert(args: ConvertArgs) -> Result<()> {
  let pipeline = build_pipeline(&args.pipeline)?;
  let labels = label_set(&args.identifiers)?;
  let layout = DatasetLayout::new(&args.dataset);

  for split in DatasetSplit::ALL {
    let (_, report) = convert_split(&pipeline, &layout, split, &labels, args.force)?;
    if !report.rejected.is_empty() {
      warn!("{}: {} 张图像未检测到手部", split, report.rejected.len());
    }
  }
  Ok(())
}

fn train(args: TrainArgs) -> Result<()> {
  let store = ArtifactStore::from_url(&args.model)?;
  let mut classifier = SignClassifier::open(store)?;
  if classifier.is_trained() && !args.force {
    info!("模型已存在，跳过训练（使用 --force 重新训练）");
    return Ok(());
  }

  let labels = label_set(&args.identifiers)?;
  let layout = DatasetLayout::new(&args.dataset);
  let training_csv = layout.csv_path(DatasetSplit::Training);
  let training = read_csv(&training_csv)
    .with_context(|| format!("读取 {:?} 失败，请先运行 convert", training_csv))?;
  let validation_csv = layout.csv_path(DatasetSplit::Validation);
  let validation = if validation_csv.exists() {
    read_csv(&validation_csv)?
  } else {
    warn!("缺少验证集 {:?}", validation_csv);
    Vec::new()
  };

  let report = classifier.train(&training, &validation, &labels, &args.train_config())?;
  info!(
    "训练完成: {} 轮, 损失 {:.6}, 训练集准确率 {:.4}",
    report.epochs, report.final_loss, report.training_accuracy
  );
  if let Some(accuracy) = report.validation_accuracy {
    info!("验证集准确率: {:.4}", accuracy);
    for (identifier, row) in report.labels.iter().zip(&report.confusion) {
      info!("  {}: {:?}", identifier, row);
    }
  }
  Ok(())
}

fn classify(args: ClassifyArgs) -> Result<()> {
  let pipeline = build_pipeline(&args.pipeline)?;
  let classifier = SignClassifier::open(ArtifactStore::from_url(&args.model)?)?;
  if !classifier.is_trained() {
    anyhow::bail!("模型尚未训练: {}", args.model);
  }
  let input = ImageFileInput::from_url(&args.input)?;
  let output = args.output.as_ref().map(OutputWrapper::from_url).transpose()?;

  let summary = RecognizeTask.run_task(
    input.into_frames(),
    Recognizer::new(pipeline, classifier),
    output,
  )?;
  for (path, prediction) in &summary.recognized {
    println!("{}\t{}\t{:.3}", path.display(), prediction.identifier, prediction.confidence);
  }
  Ok(())
}
