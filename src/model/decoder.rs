// 该文件是 Xunmu （寻目） 项目的一部分。
// src/model/decoder.rs - 原始预测解码
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

use thiserror::Error;
use tracing::debug;

use crate::{geometry::Rect, model::Detection};

/// 每行开头的字段数: cx, cy, w, h, objectness
pub const BOX_FIELDS: usize = 5;
/// COCO 数据集有 80 个类别
pub const DEFAULT_NUM_CLASSES: usize = 80;

const OBJECTNESS_INDEX: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
  #[error("预测行过短: 第 {layer} 层第 {row} 行长度为 {len}, 至少需要 {expected}")]
  MalformedTensor {
    layer: usize,
    row: usize,
    len: usize,
    expected: usize,
  },
  #[error("预测框坐标无效: 第 {layer} 层第 {row} 行, 坐标非有限值或超出整数范围")]
  InvalidBox { layer: usize, row: usize },
  #[error("预测矩阵形状不匹配: 数据长度 {len} 无法按 {cols} 列划分")]
  ShapeMismatch { len: usize, cols: usize },
  #[error("预测矩阵各行长度不一致: 第 {row} 行长度为 {len}, 期望 {expected}")]
  RaggedRows {
    row: usize,
    len: usize,
    expected: usize,
  },
}

/// 单个输出层的预测矩阵，行优先存储，每行对应一个网格单元
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionMatrix {
  data: Box<[f32]>,
  cols: usize,
}

impl PredictionMatrix {
  pub fn new(data: Vec<f32>, cols: usize) -> Result<Self, DecodeError> {
    if cols == 0 || data.len() % cols != 0 {
      return Err(DecodeError::ShapeMismatch {
        len: data.len(),
        cols,
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      cols,
    })
  }

  /// 从逐行数据构造，所有行必须等长
  pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self, DecodeError> {
    let Some(first) = rows.first() else {
      return Ok(Self {
        data: Box::new([]),
        cols: 0,
      });
    };

    let cols = first.as_ref().len();
    let mut data = Vec::with_capacity(cols * rows.len());
    for (row, values) in rows.iter().enumerate() {
      let values = values.as_ref();
      if values.len() != cols {
        return Err(DecodeError::RaggedRows {
          row,
          len: values.len(),
          expected: cols,
        });
      }
      data.extend_from_slice(values);
    }

    Self::new(data, cols)
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn num_rows(&self) -> usize {
    if self.cols == 0 {
      0
    } else {
      self.data.len() / self.cols
    }
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
    // chunks 不接受 0，空矩阵时用 1 也不会产出任何行
    self.data.chunks(self.cols.max(1))
  }
}

/// 最终置信度的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidencePolicy {
  /// 只取最高类别分数，objectness 不参与
  #[default]
  ClassScore,
  /// objectness 乘以最高类别分数
  ObjectnessTimesClass,
}

/// 把原始预测行解码为候选检测
#[derive(Debug, Clone)]
pub struct Decoder {
  num_classes: usize,
  confidence_threshold: f32,
  policy: ConfidencePolicy,
}

impl Decoder {
  pub fn new(confidence_threshold: f32) -> Self {
    Self {
      num_classes: DEFAULT_NUM_CLASSES,
      confidence_threshold,
      policy: ConfidencePolicy::default(),
    }
  }

  pub fn with_num_classes(mut self, num_classes: usize) -> Self {
    self.num_classes = num_classes;
    self
  }

  pub fn with_policy(mut self, policy: ConfidencePolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn confidence_threshold(&self) -> f32 {
    self.confidence_threshold
  }

  /// 每行至少需要的长度
  pub fn row_len(&self) -> usize {
    BOX_FIELDS + self.num_classes
  }

  /// 依次解码所有输出层，输出顺序与输入行顺序一致
  ///
  /// 任意一行长度不足都会立即返回 [`DecodeError::MalformedTensor`]，
  /// 不会产出部分结果。没有任何行超过阈值时返回空序列。
  pub fn decode(
    &self,
    outputs: &[PredictionMatrix],
    image_width: u32,
    image_height: u32,
  ) -> Result<Vec<Detection>, DecodeError> {
    let expected = self.row_len();
    let (width, height) = (image_width as f32, image_height as f32);
    let mut detections = Vec::new();

    for (layer, output) in outputs.iter().enumerate() {
      let before = detections.len();
      for (row, values) in output.rows().enumerate() {
        if values.len() < expected {
          return Err(DecodeError::MalformedTensor {
            layer,
            row,
            len: values.len(),
            expected,
          });
        }

        if let Some(detection) = self.decode_row(values, width, height, layer, row)? {
          detections.push(detection);
        }
      }
      debug!(
        "输出层 {}: {} 行, 保留 {} 个候选",
        layer,
        output.num_rows(),
        detections.len() - before
      );
    }

    debug!("解码得到 {} 个候选检测", detections.len());
    Ok(detections)
  }

  fn decode_row(
    &self,
    row: &[f32],
    width: f32,
    height: f32,
    layer: usize,
    index: usize,
  ) -> Result<Option<Detection>, DecodeError> {
    let scores = &row[BOX_FIELDS..BOX_FIELDS + self.num_classes];
    let Some((class_id, score)) = argmax(scores) else {
      return Ok(None);
    };

    let confidence = match self.policy {
      ConfidencePolicy::ClassScore => score,
      ConfidencePolicy::ObjectnessTimesClass => row[OBJECTNESS_INDEX] * score,
    };

    // NaN 也在这里被丢弃
    if !(confidence >= self.confidence_threshold) {
      return Ok(None);
    }

    let invalid = DecodeError::InvalidBox { layer, row: index };
    if !row[..4].iter().all(|v| v.is_finite()) {
      return Err(invalid);
    }

    let center_x = (row[0] * width) as i32;
    let center_y = (row[1] * height) as i32;
    let w = (row[2] * width) as i32;
    let h = (row[3] * height) as i32;
    // 在 i64 中计算左上角，放不回 i32 的框视为无效
    let x = i32::try_from(i64::from(center_x) - i64::from(w / 2)).map_err(|_| invalid.clone())?;
    let y = i32::try_from(i64::from(center_y) - i64::from(h / 2)).map_err(|_| invalid)?;

    Ok(Some(Detection::new(Rect::new(x, y, w, h), class_id, confidence)))
  }
}

/// 使用 80 个类别的便捷解码
pub fn decode(
  outputs: &[PredictionMatrix],
  image_width: u32,
  image_height: u32,
  confidence_threshold: f32,
) -> Result<Vec<Detection>, DecodeError> {
  Decoder::new(confidence_threshold).decode(outputs, image_width, image_height)
}

/// 最大值位置，并列时取最小索引
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
  let (&first, rest) = scores.split_first()?;
  let mut best = (0, first);
  for (i, &score) in rest.iter().enumerate() {
    if score > best.1 {
      best = (i + 1, score);
    }
  }
  Some(best)
}
