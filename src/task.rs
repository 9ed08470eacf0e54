// 该文件是 Zhiyu （指语） 项目的一部分。
// src/task.rs - 识别任务
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

use std::{fmt, path::PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  detector::HandDetector,
  feature::FeatureVector,
  input::{ImageFileInputError, InputFrame},
  landmark::JointSet,
  model::{ClassifierError, Model, Prediction, SignClassifier},
  output::{NoOutput, Render},
  pipeline::{LandmarkPipeline, PipelineError},
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 一张图像的识别结果，关节点位于规范化图像的坐标系
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
  pub joints: JointSet,
  pub orientation_degrees: f64,
  pub prediction: Prediction,
}

#[derive(Debug, Clone)]
pub struct Recognized {
  pub canonical_image: RgbImage,
  pub recognition: Recognition,
}

#[derive(Error, Debug)]
pub enum RecognizeError {
  #[error("{0}")]
  Pipeline(#[from] PipelineError),
  #[error("{0}")]
  Classifier(#[from] ClassifierError),
}

/// 关节点流水线加分类器
pub struct Recognizer<D, P = NoOutput> {
  pipeline: LandmarkPipeline<D, P>,
  classifier: SignClassifier,
}

impl<D, P> Recognizer<D, P>
where
  D: HandDetector,
  P: Render<RgbImage, JointSet>,
  P::Error: fmt::Display,
{
  pub fn new(pipeline: LandmarkPipeline<D, P>, classifier: SignClassifier) -> Self {
    Self {
      pipeline,
      classifier,
    }
  }

  pub fn pipeline(&self) -> &LandmarkPipeline<D, P> {
    &self.pipeline
  }

  pub fn classifier(&self) -> &SignClassifier {
    &self.classifier
  }

  pub fn recognize(&self, image: &RgbImage) -> Result<Recognized, RecognizeError> {
    let trace = self.pipeline.process_image_traced(image)?;
    let prediction = self.classifier.classify(&FeatureVector::flatten(&trace.joints))?;
    Ok(Recognized {
      canonical_image: trace.canonical_image,
      recognition: Recognition {
        joints: trace.joints,
        orientation_degrees: trace.orientation_degrees,
        prediction,
      },
    })
  }
}

impl<D, P> Model for Recognizer<D, P>
where
  D: HandDetector,
  P: Render<RgbImage, JointSet>,
  P::Error: fmt::Display,
{
  type Input = RgbImage;
  type Output = Recognized;
  type Error = RecognizeError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.recognize(input)
  }
}

#[derive(Debug, Default)]
pub struct RecognizeSummary {
  pub recognized: Vec<(PathBuf, Prediction)>,
  pub rejected: Vec<PathBuf>,
}

/// 逐张识别；单张失败只记录警告，继续处理后续图像
pub struct RecognizeTask;

impl<I, M, O> Task<I, M, O> for RecognizeTask
where
  I: Iterator<Item = Result<InputFrame, ImageFileInputError>>,
  M: Model<Input = RgbImage, Output = Recognized>,
  M::Error: fmt::Display,
  O: Render<RgbImage, Recognition>,
  O::Error: fmt::Display,
{
  type Output = RecognizeSummary;
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let mut summary = RecognizeSummary::default();
    let mut seen = 0usize;

    for item in input {
      seen += 1;
      let frame = match item {
        Ok(frame) => frame,
        Err(e) => {
          warn!("跳过输入: {}", e);
          summary
            .rejected
            .extend(e.path().map(|p| p.to_path_buf()));
          continue;
        }
      };

      let now = std::time::Instant::now();
      let recognized = match model.infer(&frame.image) {
        Ok(recognized) => recognized,
        Err(e) => {
          warn!("{:?} 识别失败: {}", frame.path, e);
          summary.rejected.push(frame.path);
          continue;
        }
      };
      let prediction = &recognized.recognition.prediction;
      info!(
        "{:?} => {} ({:.3})，耗时: {:.2?}",
        frame.path,
        prediction.identifier,
        prediction.confidence,
        now.elapsed()
      );

      if let Err(e) = output.render_result(&recognized.canonical_image, &recognized.recognition) {
        warn!("{:?} 输出失败: {}", frame.path, e);
      }
      summary.recognized.push((frame.path, prediction.clone()));
    }

    if seen == 0 {
      anyhow::bail!("没有输入图像");
    }
    info!(
      "任务完成: 识别 {} 张, 失败 {} 张",
      summary.recognized.len(),
      summary.rejected.len()
    );
    Ok(summary)
  }
}
