// 该文件是 Xunmu （寻目） 项目的一部分。
// src/geometry.rs - 轴对齐矩形与 IoU 计算
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

/// 像素坐标下的轴对齐矩形，(x, y) 为左上角
///
/// 坐标不做裁剪，可能为负数或超出图像边界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl Rect {
  pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  pub fn left(&self) -> i64 {
    self.x as i64
  }

  pub fn top(&self) -> i64 {
    self.y as i64
  }

  pub fn right(&self) -> i64 {
    self.x as i64 + self.width as i64
  }

  pub fn bottom(&self) -> i64 {
    self.y as i64 + self.height as i64
  }

  /// 面积，宽或高为负时结果也可能为负
  pub fn area(&self) -> i64 {
    self.width as i64 * self.height as i64
  }

  pub fn center(&self) -> (f32, f32) {
    (
      self.x as f32 + self.width as f32 / 2.0,
      self.y as f32 + self.height as f32 / 2.0,
    )
  }

  /// 交集矩形，不相交时返回 None
  pub fn intersection(&self, other: &Rect) -> Option<Rect> {
    let left = self.left().max(other.left());
    let top = self.top().max(other.top());
    let right = self.right().min(other.right());
    let bottom = self.bottom().min(other.bottom());

    if right - left <= 0 || bottom - top <= 0 {
      return None;
    }

    Some(Rect::new(
      left as i32,
      top as i32,
      (right - left) as i32,
      (bottom - top) as i32,
    ))
  }

  /// 交并比（Intersection over Union）
  pub fn iou(&self, other: &Rect) -> f32 {
    iou(self, other)
  }
}

pub fn area(r: &Rect) -> i64 {
  r.area()
}

/// 计算两个矩形的 IoU，无重叠或并集非正时为 0
pub fn iou(a: &Rect, b: &Rect) -> f32 {
  let Some(inter) = a.intersection(b) else {
    return 0.0;
  };

  let inter_area = inter.area() as f64;
  let union = a.area() as f64 + b.area() as f64 - inter_area;
  if union <= 0.0 {
    return 0.0;
  }

  (inter_area / union) as f32
}
