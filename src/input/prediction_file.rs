// 该文件是 Xunmu （寻目） 项目的一部分。
// src/input/prediction_file.rs - 录制的网络输出
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
  convert::Infallible,
  fs::File,
  io::{BufReader, Read},
  path::Path,
};

use image::RgbImage;
use thiserror::Error;
use tracing::info;

use crate::model::{DecodeError, Model, PredictionMatrix};

#[derive(Error, Debug)]
pub enum PredictionFileError {
  #[error("无法读取预测文件 {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },
  #[error("预测文件格式错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("第 {layer} 个输出层形状错误: {source}")]
  Shape { layer: usize, source: DecodeError },
}

/// 由推理协作方导出的各输出层预测
///
/// JSON 格式为 `[[[f32, ...], ...], ...]`，依次是输出层、行、行内数值。
/// 实现 [`Model`]，推理时直接回放录制的输出，不依赖输入图像。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedOutputs {
  layers: Vec<PredictionMatrix>,
}

impl RecordedOutputs {
  pub fn new(layers: Vec<PredictionMatrix>) -> Self {
    Self { layers }
  }

  pub fn from_reader<R: Read>(reader: R) -> Result<Self, PredictionFileError> {
    let raw: Vec<Vec<Vec<f32>>> = serde_json::from_reader(reader)?;
    let layers = raw
      .iter()
      .enumerate()
      .map(|(layer, rows)| {
        PredictionMatrix::from_rows(rows.as_slice())
          .map_err(|source| PredictionFileError::Shape { layer, source })
      })
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { layers })
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PredictionFileError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PredictionFileError::Io {
      path: path.display().to_string(),
      source,
    })?;
    let outputs = Self::from_reader(BufReader::new(file))?;
    info!(
      "从 {} 读取 {} 个输出层, 共 {} 行",
      path.display(),
      outputs.layers.len(),
      outputs.layers.iter().map(PredictionMatrix::num_rows).sum::<usize>()
    );
    Ok(outputs)
  }

  pub fn layers(&self) -> &[PredictionMatrix] {
    &self.layers
  }

  pub fn into_layers(self) -> Vec<PredictionMatrix> {
    self.layers
  }
}

impl Model for RecordedOutputs {
  type Input = RgbImage;
  type Output = Vec<PredictionMatrix>;
  type Error = Infallible;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(self.layers.clone())
  }
}
