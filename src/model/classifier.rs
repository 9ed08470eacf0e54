// 该文件是 Zhiyu （指语） 项目的一部分。
// src/model/classifier.rs - 手语字母分类器
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

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::{
  Model, Prediction,
  mlp::{Mlp, TrainConfig, argmax},
  scaler::{ScaleVector, ScalerError},
  store::{ArtifactStore, StoreError},
};
use crate::{
  dataset::{LabelError, LabelSet, LabeledSample},
  feature::{FEATURE_LEN, FeatureVector},
};

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("模型尚未训练")]
  ModelNotTrained,
  #[error("标签编码不一致: 期望 {expected:?}, 实际 {found:?}")]
  InconsistentLabelEncoding {
    expected: Vec<String>,
    found: Vec<String>,
  },
  #[error("标签错误: {0}")]
  Label(LabelError),
  #[error("缩放错误: {0}")]
  Scaler(#[from] ScalerError),
  #[error("模型存储错误: {0}")]
  Store(#[from] StoreError),
  #[error("训练集为空")]
  EmptyTrainingSet,
  #[error("模型与缩放文件不是同一次训练的产物: 模型 {model:016x}, 缩放 {scaler:016x}")]
  ArtifactMismatch { model: u64, scaler: u64 },
  #[error("模型结构与数据不符: 输入 {input}, 输出 {output}, 类别 {classes}")]
  ShapeMismatch {
    input: usize,
    output: usize,
    classes: usize,
  },
}

impl From<LabelError> for ClassifierError {
  fn from(err: LabelError) -> Self {
    match err {
      LabelError::InconsistentEncoding { expected, found } => {
        ClassifierError::InconsistentLabelEncoding { expected, found }
      }
      other => ClassifierError::Label(other),
    }
  }
}

/// `mlp_model.json` 的内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
  pub labels: LabelSet,
  pub network: Mlp,
  pub config: TrainConfig,
  pub trained_at: DateTime<Utc>,
  /// 每次训练随机生成，`scalers.json` 中必须相同
  pub training_id: u64,
}

/// 训练结果
#[derive(Debug, Clone)]
pub struct TrainReport {
  pub labels: LabelSet,
  pub epochs: usize,
  pub final_loss: f32,
  pub training_accuracy: f32,
  /// 验证集为空时为 `None`
  pub validation_accuracy: Option<f32>,
  /// `confusion[真实][预测]`，基于验证集
  pub confusion: Vec<Vec<usize>>,
}

struct Trained {
  model: ModelArtifact,
  scaler: ScaleVector,
}

/// 加载后只读；重新训练会写出新文件再整体替换
pub struct SignClassifier {
  store: ArtifactStore,
  trained: Option<Arc<Trained>>,
}

impl SignClassifier {
  /// 打开模型目录，目录中没有模型时得到一个未训练的分类器
  pub fn open(store: ArtifactStore) -> Result<Self, ClassifierError> {
    let mut classifier = Self {
      store,
      trained: None,
    };
    classifier.reload()?;
    Ok(classifier)
  }

  pub fn store(&self) -> &ArtifactStore {
    &self.store
  }

  pub fn is_trained(&self) -> bool {
    self.trained.is_some()
  }

  pub fn labels(&self) -> Option<&LabelSet> {
    self.trained.as_ref().map(|t| &t.model.labels)
  }

  pub fn trained_at(&self) -> Option<DateTime<Utc>> {
    self.trained.as_ref().map(|t| t.model.trained_at)
  }

  /// 从磁盘重新读取模型，失败时保留当前模型
  pub fn reload(&mut self) -> Result<(), ClassifierError> {
    let Some((model, scaler)) = self.store.load::<ModelArtifact, ScaleVector>()? else {
      self.trained = None;
      return Ok(());
    };

    scaler.validate()?;
    model.labels.ensure_same(scaler.labels())?;
    if model.training_id != scaler.training_id() {
      return Err(ClassifierError::ArtifactMismatch {
        model: model.training_id,
        scaler: scaler.training_id(),
      });
    }
    let classes = model.labels.len();
    if model.network.input_size() != FEATURE_LEN || model.network.output_size() != classes {
      return Err(ClassifierError::ShapeMismatch {
        input: model.network.input_size(),
        output: model.network.output_size(),
        classes,
      });
    }

    info!(
      "已加载模型: 类别 {:?}, 训练于 {}",
      model.labels.iter().collect::<Vec<_>>(),
      model.trained_at
    );
    self.trained = Some(Arc::new(Trained { model, scaler }));
    Ok(())
  }

  pub fn classify(&self, vector: &FeatureVector) -> Result<Prediction, ClassifierError> {
    let trained = self.trained.as_ref().ok_or(ClassifierError::ModelNotTrained)?;
    let normalized = trained.scaler.transform(vector)?;
    let input = feature_matrix(std::slice::from_ref(&normalized));
    let probs = trained.model.network.predict_proba(input.view());

    let row = probs.row(0);
    let code = argmax(row.iter().copied());
    let identifier = trained
      .model
      .labels
      .decode(code)
      .ok_or(ClassifierError::ShapeMismatch {
        input: FEATURE_LEN,
        output: row.len(),
        classes: trained.model.labels.len(),
      })?
      .to_string();
    let confidence = (row[code] * 1000.0).round() / 1000.0;
    Ok(Prediction {
      identifier,
      confidence,
    })
  }

  /// 拟合缩放与网络，保存后重新加载
  ///
  /// 验证集使用训练集得到的缩放系数，两组样本都必须能被 `labels` 编码。
  pub fn train(
    &mut self,
    training: &[LabeledSample],
    validation: &[LabeledSample],
    labels: &LabelSet,
    config: &TrainConfig,
  ) -> Result<TrainReport, ClassifierError> {
    if training.is_empty() {
      return Err(ClassifierError::EmptyTrainingSet);
    }
    labels.ensure_covers(training)?;
    labels.ensure_covers(validation)?;

    let training_id = fastrand::u64(..);
    let scaler = ScaleVector::fit(training, labels)?.with_training_id(training_id);
    let (x_train, y_train) = encode(training, &scaler, labels)?;

    info!(
      "开始训练: {} 个样本, {} 个类别, 隐藏层 {:?}",
      training.len(),
      labels.len(),
      config.hidden_layers
    );
    let mut rng = fastrand::Rng::with_seed(config.seed);
    let mut network = Mlp::new(FEATURE_LEN, &config.hidden_layers, labels.len(), &mut rng);
    let summary = network.fit(x_train.view(), &y_train, config, &mut rng);
    info!("训练结束: {} 轮, 损失 {:.6}", summary.epochs, summary.loss);

    let training_accuracy = accuracy(&network.predict(x_train.view()), &y_train);
    info!("训练集准确率: {:.4}", training_accuracy);

    let mut confusion = vec![vec![0usize; labels.len()]; labels.len()];
    let validation_accuracy = if validation.is_empty() {
      warn!("验证集为空，跳过验证");
      None
    } else {
      let (x_val, y_val) = encode(validation, &scaler, labels)?;
      let predicted = network.predict(x_val.view());
      for (&truth, &guess) in y_val.iter().zip(&predicted) {
        confusion[truth][guess] += 1;
      }
      let acc = accuracy(&predicted, &y_val);
      info!("验证集准确率: {:.4}", acc);
      Some(acc)
    };

    let model = ModelArtifact {
      labels: labels.clone(),
      network,
      config: config.clone(),
      trained_at: Utc::now(),
      training_id,
    };
    self.store.save(&model, &scaler)?;
    self.reload()?;

    Ok(TrainReport {
      labels: labels.clone(),
      epochs: summary.epochs,
      final_loss: summary.loss,
      training_accuracy,
      validation_accuracy,
      confusion,
    })
  }
}

impl Model for SignClassifier {
  type Input = FeatureVector;
  type Output = Prediction;
  type Error = ClassifierError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.classify(input)
  }
}

fn feature_matrix(vectors: &[FeatureVector]) -> Array2<f32> {
  let mut matrix = Array2::zeros((vectors.len(), FEATURE_LEN));
  for (mut row, vector) in matrix.rows_mut().into_iter().zip(vectors) {
    row.assign(&ndarray::ArrayView1::from(vector.as_slice()));
  }
  matrix
}

fn encode(
  samples: &[LabeledSample],
  scaler: &ScaleVector,
  labels: &LabelSet,
) -> Result<(Array2<f32>, Vec<usize>), ClassifierError> {
  let normalized = samples
    .iter()
    .map(|s| scaler.transform(&s.features))
    .collect::<Result<Vec<_>, _>>()?;
  let targets = samples
    .iter()
    .map(|s| labels.encode(&s.identifier))
    .collect::<Result<Vec<_>, _>>()?;
  Ok((feature_matrix(&normalized), targets))
}

fn accuracy(predicted: &[usize], truth: &[usize]) -> f32 {
  if truth.is_empty() {
    return 0.0;
  }
  let correct = predicted.iter().zip(truth).filter(|(a, b)| a == b).count();
  correct as f32 / truth.len() as f32
}
