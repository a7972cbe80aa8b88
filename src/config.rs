// 该文件是 Xunmu （寻目） 项目的一部分。
// src/config.rs - 检测流程配置
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

use std::path::PathBuf;

use thiserror::Error;

use crate::{
  model::{ConfidencePolicy, DEFAULT_NUM_CLASSES, Decoder, NmsParams},
  output::{SaveImageFileError, SaveImageFileOutput},
};

pub const DEFAULT_INPUT_SIZE: u32 = 608;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("{name} 必须在 [0, 1] 范围内, 实际为 {value}")]
  ThresholdOutOfRange { name: &'static str, value: f32 },
  #[error("网络输入尺寸必须大于 0")]
  ZeroInputSize,
  #[error("类别数量必须大于 0")]
  ZeroClasses,
  #[error("eta 必须在 (0, 1] 范围内, 实际为 {0}")]
  InvalidEta(f32),
  #[error("检测记录写在输出图像旁边，开启 record 时必须同时开启 save")]
  RecordWithoutSave,
}

/// 一次检测流程的全部可调参数
#[derive(Debug, Clone, PartialEq)]
pub struct DetectConfig {
  /// 网络输入的正方形边长
  pub input_size: u32,
  /// 解码阶段的置信度阈值
  pub confidence_threshold: f32,
  /// NMS 阶段的分数阈值，与解码阈值分别生效
  pub score_threshold: f32,
  /// NMS IoU 阈值
  pub nms_threshold: f32,
  /// 是否把标注结果写入磁盘
  pub save: bool,
  pub output_dir: PathBuf,
  /// 为空时使用时间戳
  pub output_name: Option<String>,
  /// 是否同时写出文本记录
  pub record: bool,
  pub num_classes: usize,
  pub confidence_policy: ConfidencePolicy,
  pub class_agnostic: bool,
  pub top_k: Option<usize>,
  pub eta: f32,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      input_size: DEFAULT_INPUT_SIZE,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      score_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      save: true,
      output_dir: PathBuf::from("."),
      output_name: None,
      record: false,
      num_classes: DEFAULT_NUM_CLASSES,
      confidence_policy: ConfidencePolicy::default(),
      class_agnostic: true,
      top_k: None,
      eta: 1.0,
    }
  }
}

impl DetectConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("confidence_threshold", self.confidence_threshold),
      ("score_threshold", self.score_threshold),
      ("nms_threshold", self.nms_threshold),
    ] {
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ThresholdOutOfRange { name, value });
      }
    }
    if self.input_size == 0 {
      return Err(ConfigError::ZeroInputSize);
    }
    if self.num_classes == 0 {
      return Err(ConfigError::ZeroClasses);
    }
    if !(self.eta > 0.0 && self.eta <= 1.0) {
      return Err(ConfigError::InvalidEta(self.eta));
    }
    if self.record && !self.save {
      return Err(ConfigError::RecordWithoutSave);
    }
    Ok(())
  }

  pub fn decoder(&self) -> Decoder {
    Decoder::new(self.confidence_threshold)
      .with_num_classes(self.num_classes)
      .with_policy(self.confidence_policy)
  }

  pub fn nms_params(&self) -> NmsParams {
    NmsParams {
      score_threshold: self.score_threshold,
      iou_threshold: self.nms_threshold,
      class_agnostic: self.class_agnostic,
      top_k: self.top_k,
      eta: self.eta,
    }
  }

  pub fn output(&self) -> Result<SaveImageFileOutput, SaveImageFileError> {
    match &self.output_name {
      Some(name) => SaveImageFileOutput::new(&self.output_dir, name.as_str()),
      None => Ok(SaveImageFileOutput::timestamped(&self.output_dir)),
    }
  }
}
