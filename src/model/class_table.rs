// 该文件是 Xunmu （寻目） 项目的一部分。
// src/model/class_table.rs - 类别名称表
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

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use thiserror::Error;
use tracing::{info, warn};

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[derive(Error, Debug)]
pub enum ClassTableError {
  #[error("无法读取类别文件 {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },
  #[error("读取类别列表失败: {0}")]
  Read(#[from] std::io::Error),
}

/// 有序的类别名称表，第 i 项对应 `class_id == i`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassTable {
  names: Vec<String>,
}

impl ClassTable {
  pub fn new(names: Vec<String>) -> Self {
    Self { names }
  }

  pub fn coco() -> Self {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
  }

  /// 每行一个名称，去掉首尾空白；空行同样占用一个索引
  pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ClassTableError> {
    let names = reader
      .lines()
      .map(|line| line.map(|l| l.trim().to_string()))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { names })
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassTableError> {
    let path = path.as_ref();
    let io_error = |source: std::io::Error| ClassTableError::Io {
      path: path.display().to_string(),
      source,
    };

    let file = File::open(path).map_err(io_error)?;
    let table = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
      ClassTableError::Read(source) => io_error(source),
      other => other,
    })?;

    info!("从 {} 加载 {} 个类别", path.display(), table.len());
    if table.is_empty() {
      warn!("类别文件 {} 为空", path.display());
    }
    Ok(table)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.names.get(class_id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.names.iter().map(String::as_str)
  }
}

impl FromIterator<String> for ClassTable {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self::new(iter.into_iter().collect())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_one_name_per_line() {
    let text = "person\r\nbicycle\n  car  \n\ntruck\n";
    let table = ClassTable::from_reader(text.as_bytes()).unwrap();
    assert_eq!(table.len(), 5);
    assert_eq!(table.get(0), Some("person"));
    assert_eq!(table.get(1), Some("bicycle"));
    assert_eq!(table.get(2), Some("car"));
    assert_eq!(table.get(3), Some(""));
    assert_eq!(table.get(4), Some("truck"));
    assert_eq!(table.get(5), None);
  }

  #[test]
  fn coco_table_has_eighty_classes() {
    let table = ClassTable::coco();
    assert_eq!(table.len(), 80);
    assert_eq!(table.get(0), Some("person"));
    assert_eq!(table.get(79), Some("toothbrush"));
  }

  #[test]
  fn missing_file_reports_path() {
    let err = ClassTable::from_file("/nonexistent/xunmu/coco.names").unwrap_err();
    match err {
      ClassTableError::Io { path, source } => {
        assert_eq!(path, "/nonexistent/xunmu/coco.names");
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
      }
      other => panic!("unexpected error: {other}"),
    }
  }
}
