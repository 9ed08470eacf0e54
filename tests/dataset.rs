// 该文件是 Zhiyu （指语） 项目的一部分。
// tests/dataset.rs - 数据集转换集成测试
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
  marker::{MarkerDetector, blank_image, hand_image},
  scratch_dir,
};
use zhiyu::{
  LandmarkPipeline, PipelineConfig,
  dataset::{DatasetLayout, DatasetSplit, LabelSet, convert_split, read_csv},
};

fn save(path: &Path, image: image::RgbImage) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  image.save(path).unwrap();
}

fn build_dataset(root: &Path) {
  let training = root.join("Training");
  save(
    &training.join("A").join("A.0.png"),
    hand_image(300, 300, (150, 230), (150, 80)),
  );
  save(&training.join("A").join("A.1.png"), blank_image(300, 300));
  save(
    &training.join("A").join("A.2.png"),
    hand_image(300, 300, (100, 150), (220, 150)),
  );
  save(
    &training.join("D").join("D.0.png"),
    hand_image(320, 280, (120, 200), (220, 100)),
  );
  // 不符合 `{identifier}.{index}.png` 的文件被忽略
  save(
    &training.join("D").join("cover.png"),
    hand_image(300, 300, (150, 230), (150, 80)),
  );
  save(
    &root.join("Validation").join("A").join("A.0.png"),
    hand_image(300, 300, (150, 230), (150, 80)),
  );
}

#[test]
fn conversion_skips_rejected_images() {
  let root = scratch_dir("dataset-convert");
  build_dataset(&root);
  let layout = DatasetLayout::new(&root);
  let labels = LabelSet::new(["A", "D"]).unwrap();
  let detector = MarkerDetector::default();
  let pipeline = LandmarkPipeline::new(&detector, PipelineConfig::default());

  let (samples, report) =
    convert_split(&pipeline, &layout, DatasetSplit::Training, &labels, false).unwrap();
  assert_eq!(report.accepted, 3);
  assert_eq!(report.rejected, vec![root.join("Training").join("A").join("A.1.png")]);
  assert!(!report.reused);

  let identifiers: Vec<_> = samples.iter().map(|s| s.identifier.as_str()).collect();
  assert_eq!(identifiers, vec!["A", "A", "D"]);

  let csv = layout.csv_path(DatasetSplit::Training);
  assert_eq!(csv, root.join("Training.csv"));
  assert_eq!(read_csv(&csv).unwrap(), samples);

  let (validation, report) =
    convert_split(&pipeline, &layout, DatasetSplit::Validation, &labels, false).unwrap();
  assert_eq!(validation.len(), 1);
  assert!(report.rejected.is_empty());
  let _ = std::fs::remove_dir_all(root);
}

#[test]
fn existing_csv_is_reused_unless_forced() {
  let root = scratch_dir("dataset-reuse");
  build_dataset(&root);
  let layout = DatasetLayout::new(&root);
  let labels = LabelSet::new(["A", "D"]).unwrap();
  let detector = MarkerDetector::default();
  let pipeline = LandmarkPipeline::new(&detector, PipelineConfig::default());

  let (first, _) =
    convert_split(&pipeline, &layout, DatasetSplit::Training, &labels, false).unwrap();
  let sessions = detector.opened();

  let (again, report) =
    convert_split(&pipeline, &layout, DatasetSplit::Training, &labels, false).unwrap();
  assert!(report.reused);
  assert_eq!(again, first);
  assert_eq!(detector.opened(), sessions);

  let (forced, report) =
    convert_split(&pipeline, &layout, DatasetSplit::Training, &labels, true).unwrap();
  assert!(!report.reused);
  assert_eq!(forced, first);
  assert!(detector.opened() > sessions);
  assert_eq!(detector.opened(), detector.closed());
  let _ = std::fs::remove_dir_all(root);
}

#[test]
fn reused_csv_must_fit_the_label_set() {
  let root = scratch_dir("dataset-labels");
  build_dataset(&root);
  let layout = DatasetLayout::new(&root);
  let detector = MarkerDetector::default();
  let pipeline = LandmarkPipeline::new(&detector, PipelineConfig::default());

  let both = LabelSet::new(["A", "D"]).unwrap();
  convert_split(&pipeline, &layout, DatasetSplit::Training, &both, false).unwrap();

  let only_a = LabelSet::new(["A"]).unwrap();
  assert!(convert_split(&pipeline, &layout, DatasetSplit::Training, &only_a, false).is_err());
  let _ = std::fs::remove_dir_all(root);
}
