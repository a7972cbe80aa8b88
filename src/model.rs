// 该文件是 Xunmu （寻目） 项目的一部分。
// src/model.rs - 检测结果与后处理
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

use crate::geometry::Rect;

/// 推理协作方：把输入（通常是图像）变成每个输出层的原始预测矩阵
///
/// 模型加载和前向推理都在实现方内部完成，后处理只消费 `Output`。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 单个检测结果，创建后不再修改
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  /// 像素坐标边界框，未裁剪
  pub bbox: Rect,
  /// 类别索引
  pub class_id: usize,
  /// 置信度
  pub confidence: f32,
}

impl Detection {
  pub fn new(bbox: Rect, class_id: usize, confidence: f32) -> Self {
    Self {
      bbox,
      class_id,
      confidence,
    }
  }
}

/// NMS 保留下来的检测索引，按访问顺序（置信度降序）排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeptSet {
  indices: Vec<usize>,
}

impl KeptSet {
  pub fn len(&self) -> usize {
    self.indices.len()
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn contains(&self, index: usize) -> bool {
    self.indices.contains(&index)
  }

  pub fn as_slice(&self) -> &[usize] {
    &self.indices
  }

  pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
    self.indices.iter().copied()
  }

  /// 按保留顺序取出对应的检测结果，越界索引被忽略
  pub fn select<'a>(&'a self, detections: &'a [Detection]) -> impl Iterator<Item = &'a Detection> {
    self.iter().filter_map(move |i| detections.get(i))
  }
}

impl From<Vec<usize>> for KeptSet {
  fn from(indices: Vec<usize>) -> Self {
    Self { indices }
  }
}

impl IntoIterator for KeptSet {
  type Item = usize;
  type IntoIter = std::vec::IntoIter<usize>;

  fn into_iter(self) -> Self::IntoIter {
    self.indices.into_iter()
  }
}

mod class_table;
mod decoder;
mod suppress;

pub use self::class_table::{COCO_CLASSES, ClassTable, ClassTableError};
pub use self::decoder::{
  BOX_FIELDS, ConfidencePolicy, DEFAULT_NUM_CLASSES, DecodeError, Decoder, PredictionMatrix,
  decode,
};
pub use self::suppress::{NmsParams, suppress};
