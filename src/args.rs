// 该文件是 Xunmu （寻目） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

use xunmu::{
  config::{DEFAULT_INPUT_SIZE, DetectConfig},
  model::{ConfidencePolicy, DEFAULT_NUM_CLASSES},
};

/// Xunmu 检测后处理参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理协作方导出的网络输出 (JSON: 输出层 -> 行 -> 数值)
  #[arg(long, value_name = "FILE")]
  pub predictions: PathBuf,

  /// 待标注的图像文件
  #[arg(long, value_name = "FILE")]
  pub image: PathBuf,

  /// 类别名称文件，每行一个；缺省使用 COCO 类别
  #[arg(long, value_name = "FILE")]
  pub classes: Option<PathBuf>,

  /// 标签字体 (TTF/OTF)；缺省使用内置 DejaVu Sans
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 输出目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 输出文件名 (不含扩展名)；缺省使用时间戳
  #[arg(long, value_name = "NAME")]
  pub output_name: Option<String>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS 分数阈值 (0.0 - 1.0)；缺省与置信度阈值相同
  #[arg(long, value_name = "THRESHOLD")]
  pub score_threshold: Option<f32>,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 网络输入尺寸
  #[arg(long, default_value_t = DEFAULT_INPUT_SIZE, value_name = "SIZE")]
  pub input_size: u32,

  /// 读取后把图像缩放到网络输入尺寸
  #[arg(long)]
  pub resize: bool,

  /// 每行类别分数的个数
  #[arg(long, default_value_t = DEFAULT_NUM_CLASSES, value_name = "COUNT")]
  pub num_classes: usize,

  /// 置信度乘以 objectness
  #[arg(long)]
  pub objectness: bool,

  /// 只在同类别之间做 NMS
  #[arg(long)]
  pub per_class: bool,

  /// NMS 最多考虑的候选数量
  #[arg(long, value_name = "COUNT")]
  pub top_k: Option<usize>,

  /// NMS 自适应阈值系数
  #[arg(long, default_value = "1.0", value_name = "ETA")]
  pub eta: f32,

  /// 不写入磁盘
  #[arg(long)]
  pub no_save: bool,

  /// 同时写出文本检测记录
  #[arg(long, conflicts_with = "no_save")]
  pub record: bool,
}

impl Args {
  pub fn detect_config(&self) -> DetectConfig {
    DetectConfig {
      input_size: self.input_size,
      confidence_threshold: self.confidence,
      score_threshold: self.score_threshold.unwrap_or(self.confidence),
      nms_threshold: self.nms_threshold,
      save: !self.no_save,
      output_dir: self.output_dir.clone(),
      output_name: self.output_name.clone(),
      record: self.record,
      num_classes: self.num_classes,
      confidence_policy: if self.objectness {
        ConfidencePolicy::ObjectnessTimesClass
      } else {
        ConfidencePolicy::ClassScore
      },
      class_agnostic: !self.per_class,
      top_k: self.top_k,
      eta: self.eta,
    }
  }
}
