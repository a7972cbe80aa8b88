// 该文件是 Xunmu （寻目） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  geometry::Rect,
  model::{ClassTable, Detection, KeptSet},
};

// 文本渲染常量，不随图像分辨率缩放
const LABEL_FONT_SIZE: f32 = 14.0;
const LABEL_OFFSET: i32 = 5; // 文字基线位于框左上角上方 5 像素
const BOX_COLOR: [u8; 3] = [0, 255, 255]; // 青色

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotateError {
  #[error("类别索引越界: 检测 {index} 的类别 {class_id} 不在类别表中 (共 {len} 个类别)")]
  ClassIndexOutOfRange {
    index: usize,
    class_id: usize,
    len: usize,
  },
  #[error("保留索引越界: {index}, 检测总数 {len}")]
  KeptIndexOutOfRange { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum FontError {
  #[error("无法读取字体文件 {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },
  #[error("字体文件无效: {0}")]
  Invalid(#[from] ab_glyph::InvalidFont),
}

/// 已解析出类别名称的检测
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation<'a> {
  pub index: usize,
  pub detection: &'a Detection,
  pub label: &'a str,
}

/// 按保留顺序为每个检测查找类别名称
///
/// 任何一个索引越界都会直接返回错误，不产出部分结果。
pub fn resolve_labels<'a>(
  detections: &'a [Detection],
  kept: &KeptSet,
  classes: &'a ClassTable,
) -> Result<Vec<Annotation<'a>>, AnnotateError> {
  kept
    .iter()
    .map(|index| -> Result<Annotation<'a>, AnnotateError> {
      let detection = detections
        .get(index)
        .ok_or(AnnotateError::KeptIndexOutOfRange {
          index,
          len: detections.len(),
        })?;
      let label = classes
        .get(detection.class_id)
        .ok_or(AnnotateError::ClassIndexOutOfRange {
          index,
          class_id: detection.class_id,
          len: classes.len(),
        })?;
      Ok(Annotation {
        index,
        detection,
        label,
      })
    })
    .collect()
}

pub struct Draw {
  font: FontArc,
  font_size: f32,
  label_offset: i32,
  color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    let font_data: &'static [u8] = include_bytes!("../../assets/DejaVuSans.ttf"); // default font
    let font = FontArc::try_from_slice(font_data).expect("无法加载嵌入的字体文件");
    Self::with_font(font)
  }
}

impl Draw {
  pub fn with_font(font: FontArc) -> Self {
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      label_offset: LABEL_OFFSET,
      color: BOX_COLOR,
    }
  }

  /// 从 TTF/OTF 文件加载标签字体，替换内置字体
  pub fn with_font_file<P: AsRef<Path>>(self, path: P) -> Result<Self, FontError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| FontError::Io {
      path: path.display().to_string(),
      source,
    })?;
    let font = FontArc::try_from_vec(data)?;
    info!("加载标签字体: {}", path.display());
    Ok(Self { font, ..self })
  }

  pub fn with_color(mut self, color: [u8; 3]) -> Self {
    self.color = color;
    self
  }

  pub fn color(&self) -> [u8; 3] {
    self.color
  }

  /// 在图像副本上绘制保留下来的检测框与类别名称
  ///
  /// 类别名称全部解析成功后才开始绘制；越界的类别索引返回
  /// [`AnnotateError::ClassIndexOutOfRange`]。
  pub fn annotate(
    &self,
    image: &RgbImage,
    detections: &[Detection],
    kept: &KeptSet,
    classes: &ClassTable,
  ) -> Result<RgbImage, AnnotateError> {
    let annotations = resolve_labels(detections, kept, classes)?;
    let mut output = image.clone();
    self.draw_annotations(&mut output, &annotations);
    Ok(output)
  }

  pub fn draw_annotations(&self, image: &mut RgbImage, annotations: &[Annotation<'_>]) {
    for annotation in annotations {
      self.draw_bbox_with_label(image, &annotation.detection.bbox, annotation.label);
    }
  }

  // 坐标不裁剪，超出图像的部分由绘制函数忽略
  fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &Rect, label: &str) {
    if bbox.width <= 0 || bbox.height <= 0 {
      debug!("跳过退化的检测框: {:?}", bbox);
      return;
    }

    let color = Rgb(self.color);
    let rect =
      imageproc::rect::Rect::at(bbox.x, bbox.y).of_size(bbox.width as u32, bbox.height as u32);
    draw_hollow_rect_mut(image, rect, color);

    // draw_text_mut 以文字左上角定位，向上再让出一个字高
    let text_y = bbox.y.saturating_sub(self.label_offset + self.font_size.ceil() as i32);
    draw_text_mut(
      image,
      color,
      bbox.x,
      text_y,
      PxScale::from(self.font_size),
      &self.font,
      label,
    );
  }
}

/// 把保留下来的检测写成文本记录
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn format(&self, annotations: &[Annotation<'_>]) -> String {
    annotations
      .iter()
      .map(|a| {
        let name = if self.label_with_name {
          a.label.to_string()
        } else {
          a.detection.class_id.to_string()
        };
        let bbox = a.detection.bbox;
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          name, a.detection.confidence, bbox.x, bbox.y, bbox.width, bbox.height
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// 写入与 `path` 同名的 `.txt` 文件，返回实际路径
  pub fn record(
    &self,
    annotations: &[Annotation<'_>],
    path: &Path,
  ) -> Result<PathBuf, std::io::Error> {
    let path = path.with_extension("txt");
    std::fs::write(&path, self.format(annotations))?;
    Ok(path)
  }
}
