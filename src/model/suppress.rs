// 该文件是 Xunmu （寻目） 项目的一部分。
// src/model/suppress.rs - 非极大值抑制
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

use std::cmp::Ordering;

use tracing::debug;

use crate::model::{Detection, KeptSet};

/// NMS 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NmsParams {
  /// 低于该置信度的检测不参与 NMS
  pub score_threshold: f32,
  /// IoU 严格大于该值即被抑制
  pub iou_threshold: f32,
  /// 为 true 时跨类别抑制，否则只在同类之间抑制
  pub class_agnostic: bool,
  /// 只取置信度最高的前 k 个候选参与 NMS
  pub top_k: Option<usize>,
  /// 自适应阈值系数，1.0 表示关闭
  pub eta: f32,
}

impl Default for NmsParams {
  fn default() -> Self {
    Self {
      score_threshold: 0.4,
      iou_threshold: 0.4,
      class_agnostic: true,
      top_k: None,
      eta: 1.0,
    }
  }
}

impl NmsParams {
  pub fn new(score_threshold: f32, iou_threshold: f32) -> Self {
    Self {
      score_threshold,
      iou_threshold,
      ..Self::default()
    }
  }

  pub fn per_class(mut self) -> Self {
    self.class_agnostic = false;
    self
  }

  pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
    self.top_k = top_k;
    self
  }

  pub fn with_eta(mut self, eta: f32) -> Self {
    self.eta = eta;
    self
  }
}

/// 贪心 NMS，返回保留的原始索引
///
/// 候选按置信度降序访问，置信度相同时原始索引小的先被选中。
/// 一个候选只要与已保留的任一检测 IoU 超过阈值就被丢弃；
/// `class_agnostic` 为 false 时只与同类比较。
pub fn suppress(detections: &[Detection], params: &NmsParams) -> KeptSet {
  let mut order: Vec<usize> = detections
    .iter()
    .enumerate()
    .filter(|(_, d)| d.confidence >= params.score_threshold)
    .map(|(i, _)| i)
    .collect();

  // 稳定排序保证并列时按原始索引
  order.sort_by(|&a, &b| {
    detections[b]
      .confidence
      .partial_cmp(&detections[a].confidence)
      .unwrap_or(Ordering::Equal)
  });

  if let Some(k) = params.top_k {
    order.truncate(k);
  }

  let mut threshold = params.iou_threshold;
  let mut kept: Vec<usize> = Vec::with_capacity(order.len());

  for idx in order {
    let candidate = &detections[idx];
    let overlapped = kept.iter().any(|&k| {
      let other = &detections[k];
      (params.class_agnostic || other.class_id == candidate.class_id)
        && candidate.bbox.iou(&other.bbox) > threshold
    });
    if overlapped {
      continue;
    }

    kept.push(idx);
    if params.eta < 1.0 && threshold > 0.5 {
      threshold *= params.eta;
    }
  }

  debug!("NMS: {} 个候选, 保留 {} 个", detections.len(), kept.len());
  KeptSet::from(kept)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Rect;

  fn det(x: i32, y: i32, w: i32, h: i32, class_id: usize, confidence: f32) -> Detection {
    Detection::new(Rect::new(x, y, w, h), class_id, confidence)
  }

  #[test]
  fn heavy_overlap_keeps_the_higher_confidence() {
    // 两框 IoU = 0.9
    let a = det(0, 0, 100, 10, 0, 0.6);
    let b = det(0, 0, 90, 10, 0, 0.8);
    assert!((a.bbox.iou(&b.bbox) - 0.9).abs() < 1e-6);

    let kept = suppress(&[a, b], &NmsParams::new(0.4, 0.4));
    assert_eq!(kept.as_slice(), &[1]);
  }

  #[test]
  fn disjoint_boxes_are_both_kept() {
    let detections = [det(0, 0, 10, 10, 0, 0.5), det(50, 50, 10, 10, 0, 0.9)];
    let kept = suppress(&detections, &NmsParams::new(0.4, 0.4));
    // 访问顺序为置信度降序
    assert_eq!(kept.as_slice(), &[1, 0]);
  }

  #[test]
  fn empty_input_yields_empty_set() {
    assert!(suppress(&[], &NmsParams::default()).is_empty());
  }

  #[test]
  fn equal_confidence_prefers_lower_index() {
    let detections = [
      det(0, 0, 10, 10, 0, 0.7),
      det(1, 1, 10, 10, 0, 0.7),
      det(100, 100, 10, 10, 0, 0.7),
    ];
    let kept = suppress(&detections, &NmsParams::new(0.4, 0.4));
    assert_eq!(kept.as_slice(), &[0, 2]);
  }

  #[test]
  fn suppression_ignores_class_by_default() {
    let detections = [det(0, 0, 10, 10, 0, 0.9), det(0, 0, 10, 10, 5, 0.8)];
    let global = suppress(&detections, &NmsParams::new(0.4, 0.4));
    assert_eq!(global.as_slice(), &[0]);

    let grouped = suppress(&detections, &NmsParams::new(0.4, 0.4).per_class());
    assert_eq!(grouped.as_slice(), &[0, 1]);
  }

  #[test]
  fn score_threshold_is_applied_independently() {
    let detections = [det(0, 0, 10, 10, 0, 0.45), det(50, 50, 10, 10, 1, 0.9)];
    let kept = suppress(&detections, &NmsParams::new(0.5, 0.4));
    assert_eq!(kept.as_slice(), &[1]);
    assert!(!kept.contains(0));
  }

  #[test]
  fn iou_equal_to_threshold_is_not_suppressed() {
    // IoU = 50 / 150
    let a = det(0, 0, 10, 10, 0, 0.9);
    let b = det(5, 0, 10, 10, 0, 0.8);
    let iou = a.bbox.iou(&b.bbox);
    let kept = suppress(&[a, b], &NmsParams::new(0.0, iou));
    assert_eq!(kept.len(), 2);
  }

  #[test]
  fn suppressed_boxes_do_not_suppress_others() {
    // b 与 a、c 都重叠，但 a 与 c 不重叠；b 被 a 抑制后 c 依然保留
    let a = det(0, 0, 10, 10, 0, 0.9);
    let b = det(4, 0, 10, 10, 0, 0.8);
    let c = det(9, 0, 10, 10, 0, 0.7);
    let kept = suppress(&[a, b, c], &NmsParams::new(0.0, 0.3));
    assert_eq!(kept.as_slice(), &[0, 2]);
  }

  #[test]
  fn top_k_limits_candidates() {
    let detections = [
      det(0, 0, 10, 10, 0, 0.5),
      det(20, 0, 10, 10, 0, 0.9),
      det(40, 0, 10, 10, 0, 0.7),
    ];
    let kept = suppress(&detections, &NmsParams::new(0.0, 0.4).with_top_k(Some(2)));
    assert_eq!(kept.as_slice(), &[1, 2]);
  }

  #[test]
  fn eta_tightens_threshold_after_each_keep() {
    // a 与 b 不重叠，c 与 b 的 IoU 约 0.55
    let a = det(100, 100, 10, 10, 0, 0.9);
    let b = det(0, 0, 10, 10, 0, 0.8);
    let c = det(0, 0, 10, 18, 0, 0.7);
    let iou = b.bbox.iou(&c.bbox);
    assert!(iou > 0.5 && iou < 0.6);

    let plain = suppress(&[a, b, c], &NmsParams::new(0.0, 0.6));
    assert_eq!(plain.len(), 3);

    // 阈值 0.6 -> 0.54 -> 0.486，c 被抑制
    let adaptive = suppress(&[a, b, c], &NmsParams::new(0.0, 0.6).with_eta(0.9));
    assert_eq!(adaptive.as_slice(), &[0, 1]);
  }
}
