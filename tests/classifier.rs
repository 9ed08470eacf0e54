// 该文件是 Zhiyu （指语） 项目的一部分。
// tests/classifier.rs - 分类器训练与推理集成测试
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

mod common;

use std::path::Path;

use common::{
  samples::{class_center, clustered_samples},
  scratch_dir,
};
use zhiyu::{
  FeatureVector,
  dataset::LabelSet,
  model::{
    ArtifactStore, ClassifierError, MODEL_FILE, Model, SCALER_FILE, ScaleVector, SignClassifier,
    StoreError, TrainConfig,
  },
};

const IDENTIFIERS: [&str; 3] = ["A", "D", "E"];

fn small_config() -> TrainConfig {
  TrainConfig {
    hidden_layers: vec![24, 12],
    learning_rate: 0.01,
    max_epochs: 200,
    batch_size: 32,
    ..TrainConfig::default()
  }
}

fn trained(dir: &Path) -> SignClassifier {
  let labels = LabelSet::new(IDENTIFIERS).unwrap();
  let training = clustered_samples(&IDENTIFIERS, 30, 1);
  let validation = clustered_samples(&IDENTIFIERS, 10, 2);
  let mut classifier = SignClassifier::open(ArtifactStore::new(dir)).unwrap();
  classifier
    .train(&training, &validation, &labels, &small_config())
    .unwrap();
  classifier
}

#[test]
fn untrained_classifier_refuses_to_predict() {
  let dir = scratch_dir("classifier-untrained");
  let classifier = SignClassifier::open(ArtifactStore::new(&dir)).unwrap();
  assert!(!classifier.is_trained());
  assert!(matches!(
    classifier.classify(&FeatureVector::zeros()),
    Err(ClassifierError::ModelNotTrained)
  ));
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn separable_classes_are_learned() {
  let dir = scratch_dir("classifier-learn");
  let labels = LabelSet::new(IDENTIFIERS).unwrap();
  let training = clustered_samples(&IDENTIFIERS, 30, 1);
  let validation = clustered_samples(&IDENTIFIERS, 10, 2);
  let mut classifier = SignClassifier::open(ArtifactStore::new(&dir)).unwrap();

  let report = classifier
    .train(&training, &validation, &labels, &small_config())
    .unwrap();
  assert!(report.epochs > 0);
  assert!(report.training_accuracy >= 0.95);
  assert!(report.validation_accuracy.unwrap() >= 0.9);
  assert_eq!(report.confusion.len(), 3);
  assert_eq!(report.confusion.iter().flatten().sum::<usize>(), validation.len());

  assert!(dir.join(MODEL_FILE).is_file());
  assert!(dir.join(SCALER_FILE).is_file());

  for (k, identifier) in IDENTIFIERS.iter().enumerate() {
    let prediction = classifier.classify(&class_center(3, k)).unwrap();
    assert_eq!(prediction.identifier, *identifier);
    assert!((0.0..=1.0).contains(&prediction.confidence));
    assert!(((prediction.confidence * 1000.0).round() - prediction.confidence * 1000.0).abs() < 1e-3);
  }
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn zero_vector_still_gets_a_known_label() {
  let dir = scratch_dir("classifier-zeros");
  let classifier = trained(&dir);
  let prediction = classifier.infer(&FeatureVector::zeros()).unwrap();
  assert!(IDENTIFIERS.contains(&prediction.identifier.as_str()));
  assert!((0.0..=1.0).contains(&prediction.confidence));
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn training_features_scale_into_unit_range() {
  let labels = LabelSet::new(IDENTIFIERS).unwrap();
  let training = clustered_samples(&IDENTIFIERS, 20, 3);
  let scaler = ScaleVector::fit(&training, &labels).unwrap();
  for sample in &training {
    let normalized = scaler.transform(&sample.features).unwrap();
    assert!(normalized.as_slice().iter().all(|v| (-1.0..=1.0).contains(v)));
  }
}

#[test]
fn reopened_store_predicts_identically() {
  let dir = scratch_dir("classifier-reload");
  let mut first = trained(&dir);
  let second = SignClassifier::open(ArtifactStore::new(&dir)).unwrap();

  let probe = clustered_samples(&IDENTIFIERS, 4, 9);
  for sample in &probe {
    assert_eq!(
      first.classify(&sample.features).unwrap(),
      second.classify(&sample.features).unwrap()
    );
  }
  assert_eq!(first.labels(), second.labels());

  first.reload().unwrap();
  assert!(first.is_trained());
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn validation_labels_outside_the_set_are_rejected() {
  let dir = scratch_dir("classifier-inconsistent");
  let labels = LabelSet::new(IDENTIFIERS).unwrap();
  let training = clustered_samples(&IDENTIFIERS, 10, 1);
  let validation = clustered_samples(&["A", "Z"], 5, 2);
  let mut classifier = SignClassifier::open(ArtifactStore::new(&dir)).unwrap();

  let err = classifier
    .train(&training, &validation, &labels, &small_config())
    .unwrap_err();
  assert!(matches!(err, ClassifierError::InconsistentLabelEncoding { .. }));
  assert!(!classifier.is_trained());
  assert!(!dir.join(MODEL_FILE).exists());
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn mismatched_artifact_labels_are_rejected() {
  let dir = scratch_dir("classifier-mismatch");
  drop(trained(&dir));

  let path = dir.join(SCALER_FILE);
  let mut scaler: serde_json::Value =
    serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
  scaler["labels"] = serde_json::json!(["A", "D", "S"]);
  std::fs::write(&path, serde_json::to_vec(&scaler).unwrap()).unwrap();

  assert!(matches!(
    SignClassifier::open(ArtifactStore::new(&dir)),
    Err(ClassifierError::InconsistentLabelEncoding { .. })
  ));
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn corrupt_model_file_aborts_loading() {
  let dir = scratch_dir("classifier-corrupt");
  std::fs::write(dir.join(MODEL_FILE), b"{\"labels\": [").unwrap();
  assert!(matches!(
    SignClassifier::open(ArtifactStore::new(&dir)),
    Err(ClassifierError::Store(StoreError::Corrupt { .. }))
  ));
  let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn half_written_retrain_is_refused_on_reopen() {
  let dir = scratch_dir("classifier-half-written");
  let mut classifier = trained(&dir);
  let before = std::fs::read(dir.join(SCALER_FILE)).unwrap();

  // 模型文件的临时路径被目录占住，第二个文件写入失败
  std::fs::create_dir_all(dir.join(format!("{}.tmp", MODEL_FILE))).unwrap();

  let labels = LabelSet::new(IDENTIFIERS).unwrap();
  let enlarge = |samples: Vec<zhiyu::dataset::LabeledSample>| {
    samples
      .into_iter()
      .map(|mut s| {
        let mut values = *s.features.values();
        values.iter_mut().for_each(|v| *v *= 10.0);
        s.features = FeatureVector::from(values);
        s
      })
      .collect::<Vec<_>>()
  };
  let training = enlarge(clustered_samples(&IDENTIFIERS, 30, 4));
  let validation = enlarge(clustered_samples(&IDENTIFIERS, 10, 5));
  let err = classifier
    .train(&training, &validation, &labels, &small_config())
    .unwrap_err();
  assert!(matches!(err, ClassifierError::Store(StoreError::Io { .. })));
  assert_ne!(std::fs::read(dir.join(SCALER_FILE)).unwrap(), before);

  // 内存中仍是上一次训练的模型
  assert!(classifier.is_trained());
  assert_eq!(classifier.classify(&class_center(3, 0)).unwrap().identifier, "A");

  assert!(matches!(
    SignClassifier::open(ArtifactStore::new(&dir)),
    Err(ClassifierError::ArtifactMismatch { .. })
  ));
  let _ = std::fs::remove_dir_all(dir);
}
