// 该文件是 Zhiyu （指语） 项目的一部分。
// src/model/mlp.rs - 多层感知机
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

//! 全连接网络：隐藏层 ReLU，输出层 softmax，交叉熵损失，Adam 优化。

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
  pub hidden_layers: Vec<usize>,
  pub learning_rate: f32,
  pub max_epochs: usize,
  pub batch_size: usize,
  pub seed: u64,
  /// L2 正则系数
  pub alpha: f32,
  pub tolerance: f32,
  pub n_iter_no_change: usize,
  pub beta1: f32,
  pub beta2: f32,
  pub epsilon: f32,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      hidden_layers: vec![1500, 1000],
      learning_rate: 1e-3,
      max_epochs: 500,
      batch_size: 200,
      seed: 1,
      alpha: 1e-4,
      tolerance: 1e-4,
      n_iter_no_change: 10,
      beta1: 0.9,
      beta2: 0.999,
      epsilon: 1e-8,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
  pub epochs: usize,
  pub loss: f32,
  pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Dense {
  /// 形状 (输入, 输出)
  weights: Array2<f32>,
  bias: Array1<f32>,
}

impl Dense {
  fn glorot(fan_in: usize, fan_out: usize, rng: &mut fastrand::Rng) -> Self {
    let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
    let mut uniform = || (rng.f32() * 2.0 - 1.0) * bound;
    let weights = Array2::from_shape_simple_fn((fan_in, fan_out), &mut uniform);
    let bias = Array1::from_shape_simple_fn(fan_out, &mut uniform);
    Self { weights, bias }
  }

  fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
    let mut output = input.dot(&self.weights);
    output += &self.bias;
    output
  }
}

struct AdamState {
  step: i32,
  m_w: Vec<Array2<f32>>,
  v_w: Vec<Array2<f32>>,
  m_b: Vec<Array1<f32>>,
  v_b: Vec<Array1<f32>>,
}

impl AdamState {
  fn new(layers: &[Dense]) -> Self {
    Self {
      step: 0,
      m_w: layers.iter().map(|l| Array2::zeros(l.weights.raw_dim())).collect(),
      v_w: layers.iter().map(|l| Array2::zeros(l.weights.raw_dim())).collect(),
      m_b: layers.iter().map(|l| Array1::zeros(l.bias.raw_dim())).collect(),
      v_b: layers.iter().map(|l| Array1::zeros(l.bias.raw_dim())).collect(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
  layers: Vec<Dense>,
}

impl Mlp {
  pub fn new(input: usize, hidden: &[usize], output: usize, rng: &mut fastrand::Rng) -> Self {
    let sizes: Vec<usize> = std::iter::once(input)
      .chain(hidden.iter().copied())
      .chain(std::iter::once(output))
      .collect();
    let layers = sizes
      .windows(2)
      .map(|pair| Dense::glorot(pair[0], pair[1], rng))
      .collect();
    Self { layers }
  }

  pub fn input_size(&self) -> usize {
    self.layers.first().map_or(0, |l| l.weights.nrows())
  }

  pub fn output_size(&self) -> usize {
    self.layers.last().map_or(0, |l| l.weights.ncols())
  }

  pub fn hidden_sizes(&self) -> Vec<usize> {
    let n = self.layers.len();
    self.layers[..n.saturating_sub(1)]
      .iter()
      .map(|l| l.weights.ncols())
      .collect()
  }

  /// 返回各层输出，第 0 项为输入本身，最后一项为 softmax 概率
  fn forward(&self, input: ArrayView2<f32>) -> Vec<Array2<f32>> {
    let mut activations = Vec::with_capacity(self.layers.len() + 1);
    activations.push(input.to_owned());
    let last = self.layers.len().saturating_sub(1);
    for (i, layer) in self.layers.iter().enumerate() {
      let mut z = layer.forward(activations[i].view());
      if i == last {
        softmax_rows(&mut z);
      } else {
        z.mapv_inplace(|v| v.max(0.0));
      }
      activations.push(z);
    }
    activations
  }

  /// 每行一个样本，返回每行的类别概率
  pub fn predict_proba(&self, input: ArrayView2<f32>) -> Array2<f32> {
    self
      .forward(input)
      .pop()
      .unwrap_or_else(|| Array2::zeros((input.nrows(), 0)))
  }

  pub fn predict(&self, input: ArrayView2<f32>) -> Vec<usize> {
    self
      .predict_proba(input)
      .rows()
      .into_iter()
      .map(|row| argmax(row.iter().copied()))
      .collect()
  }

  pub fn fit(
    &mut self,
    inputs: ArrayView2<f32>,
    targets: &[usize],
    config: &TrainConfig,
    rng: &mut fastrand::Rng,
  ) -> FitSummary {
    let n = inputs.nrows();
    let batch_size = config.batch_size.clamp(1, n.max(1));
    let mut adam = AdamState::new(&self.layers);
    let mut order: Vec<usize> = (0..n).collect();

    let mut best_loss = f32::INFINITY;
    let mut no_improvement = 0;
    let mut summary = FitSummary {
      epochs: 0,
      loss: f32::INFINITY,
      converged: false,
    };

    for epoch in 1..=config.max_epochs {
      rng.shuffle(&mut order);
      let mut accumulated = 0.0f32;
      for batch in order.chunks(batch_size) {
        let x = inputs.select(Axis(0), batch);
        let y: Vec<usize> = batch.iter().map(|&i| targets[i]).collect();
        accumulated += self.step(x.view(), &y, config, &mut adam) * batch.len() as f32;
      }
      let loss = accumulated / n.max(1) as f32;
      debug!("第 {} 轮, 损失 {:.6}", epoch, loss);
      summary.epochs = epoch;
      summary.loss = loss;

      if loss > best_loss - config.tolerance {
        no_improvement += 1;
      } else {
        no_improvement = 0;
      }
      if loss < best_loss {
        best_loss = loss;
      }
      if no_improvement > config.n_iter_no_change {
        summary.converged = true;
        break;
      }
    }

    if !summary.converged {
      warn!("达到最大迭代次数 {} 仍未收敛", config.max_epochs);
    }
    summary
  }

  /// 一个小批量的前向、反向与参数更新，返回该批次的损失
  fn step(
    &mut self,
    x: ArrayView2<f32>,
    y: &[usize],
    config: &TrainConfig,
    adam: &mut AdamState,
  ) -> f32 {
    let batch = x.nrows() as f32;
    let activations = self.forward(x);
    let Some(probs) = activations.last() else {
      return 0.0;
    };

    let mut loss = 0.0f32;
    for (row, &label) in y.iter().enumerate() {
      loss -= probs[[row, label]].max(1e-10).ln();
    }
    loss /= batch;
    let penalty: f32 = self
      .layers
      .iter()
      .map(|l| l.weights.iter().map(|w| w * w).sum::<f32>())
      .sum();
    loss += 0.5 * config.alpha * penalty / batch;

    // softmax 与交叉熵合并后的梯度
    let mut delta = probs.clone();
    for (row, &label) in y.iter().enumerate() {
      delta[[row, label]] -= 1.0;
    }
    delta.mapv_inplace(|v| v / batch);

    let mut grads = Vec::with_capacity(self.layers.len());
    for l in (0..self.layers.len()).rev() {
      let layer = &self.layers[l];
      let mut grad_w = activations[l].t().dot(&delta);
      grad_w.scaled_add(config.alpha / batch, &layer.weights);
      let grad_b = delta.sum_axis(Axis(0));
      if l > 0 {
        let mut next = delta.dot(&layer.weights.t());
        next.zip_mut_with(&activations[l], |d, &a| {
          if a <= 0.0 {
            *d = 0.0;
          }
        });
        delta = next;
      }
      grads.push((l, grad_w, grad_b));
    }

    adam.step += 1;
    let t = adam.step;
    let rate = config.learning_rate * (1.0 - config.beta2.powi(t)).sqrt()
      / (1.0 - config.beta1.powi(t));
    for (l, grad_w, grad_b) in grads {
      let layer = &mut self.layers[l];
      adam_update(
        &mut layer.weights,
        &grad_w,
        &mut adam.m_w[l],
        &mut adam.v_w[l],
        rate,
        config,
      );
      adam_update(
        &mut layer.bias,
        &grad_b,
        &mut adam.m_b[l],
        &mut adam.v_b[l],
        rate,
        config,
      );
    }

    loss
  }
}

fn adam_update<D: ndarray::Dimension>(
  param: &mut ndarray::Array<f32, D>,
  grad: &ndarray::Array<f32, D>,
  m: &mut ndarray::Array<f32, D>,
  v: &mut ndarray::Array<f32, D>,
  rate: f32,
  config: &TrainConfig,
) {
  m.zip_mut_with(grad, |m, &g| *m = config.beta1 * *m + (1.0 - config.beta1) * g);
  v.zip_mut_with(grad, |v, &g| *v = config.beta2 * *v + (1.0 - config.beta2) * g * g);
  ndarray::Zip::from(param)
    .and(&*m)
    .and(&*v)
    .for_each(|p, &m, &v| *p -= rate * m / (v.sqrt() + config.epsilon));
}

fn softmax_rows(z: &mut Array2<f32>) {
  for mut row in z.rows_mut() {
    let max = row.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    row.mapv_inplace(|v| (v - max).exp());
    let sum = row.sum();
    if sum > 0.0 {
      row.mapv_inplace(|v| v / sum);
    }
  }
}

pub(crate) fn argmax(values: impl Iterator<Item = f32>) -> usize {
  let mut best = (0, f32::NEG_INFINITY);
  for (i, v) in values.enumerate() {
    if v > best.1 {
      best = (i, v);
    }
  }
  best.0
}
