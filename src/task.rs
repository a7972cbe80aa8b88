// 该文件是 Xunmu （寻目） 项目的一部分。
// src/task.rs - 检测任务编排
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  config::{ConfigError, DetectConfig},
  model::{ClassTable, DecodeError, Detection, KeptSet, Model, PredictionMatrix, suppress},
  output::{AnnotateError, Draw, Record, SaveImageFileError, resolve_labels},
};

/// 检测流程中任一阶段的错误，调用方可按阶段区分处理
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("推理错误: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync>),
  #[error("解码错误: {0}")]
  Decode(#[from] DecodeError),
  #[error("标注错误: {0}")]
  Annotate(#[from] AnnotateError),
  #[error("保存图像文件错误: {0}")]
  Save(#[from] SaveImageFileError),
  #[error("写入检测记录错误: {0}")]
  Record(std::io::Error),
}

/// 一次检测的全部结果
#[derive(Debug, Clone)]
pub struct DetectOutcome {
  /// 解码得到的全部候选
  pub detections: Vec<Detection>,
  /// NMS 保留的候选索引
  pub kept: KeptSet,
  /// 标注后的图像
  pub image: RgbImage,
  /// 保存时的图像路径
  pub saved_to: Option<PathBuf>,
  /// 写出文本记录时的路径
  pub record_to: Option<PathBuf>,
}

impl DetectOutcome {
  /// 按保留顺序取出最终检测
  pub fn kept_detections(&self) -> impl Iterator<Item = &Detection> {
    self.kept.select(&self.detections)
  }
}

/// 解码、抑制、标注、保存，依次同步执行
///
/// 不持有跨调用的可变状态，可在多个线程中分别处理不同图像。
pub struct DetectTask {
  config: DetectConfig,
  draw: Draw,
}

impl DetectTask {
  pub fn new(config: DetectConfig) -> Result<Self, PipelineError> {
    config.validate()?;
    Ok(Self {
      config,
      draw: Draw::default(),
    })
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  /// 先调用推理协作方取得原始输出，再执行后处理
  pub fn run_with_model<M>(
    &self,
    model: &M,
    image: &RgbImage,
    classes: &ClassTable,
  ) -> Result<DetectOutcome, PipelineError>
  where
    M: Model<Input = RgbImage, Output = Vec<PredictionMatrix>>,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let now = std::time::Instant::now();
    let outputs = model
      .infer(image)
      .map_err(|e| PipelineError::Inference(Box::new(e)))?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    self.run(image, &outputs, classes)
  }

  pub fn run(
    &self,
    image: &RgbImage,
    outputs: &[PredictionMatrix],
    classes: &ClassTable,
  ) -> Result<DetectOutcome, PipelineError> {
    let now = std::time::Instant::now();
    let (width, height) = image.dimensions();

    let detections = self.config.decoder().decode(outputs, width, height)?;
    let kept = suppress(&detections, &self.config.nms_params());
    debug!(
      "解码 {} 个候选, NMS 后保留 {} 个",
      detections.len(),
      kept.len()
    );

    let annotations = resolve_labels(&detections, &kept, classes)?;
    for a in &annotations {
      debug!(
        "  - {}: {:.2}% at ({}, {}, {}x{})",
        a.label,
        a.detection.confidence * 100.0,
        a.detection.bbox.x,
        a.detection.bbox.y,
        a.detection.bbox.width,
        a.detection.bbox.height
      );
    }

    let mut decorated = image.clone();
    self.draw.draw_annotations(&mut decorated, &annotations);
    info!("后处理完成，耗时: {:.2?}", now.elapsed());

    let (saved_to, record_to) = if self.config.save {
      let output = self.config.output()?;
      let path = output.save(&decorated)?;
      let record_to = if self.config.record {
        let record = Record {
          label_with_name: true,
        };
        Some(
          record
            .record(&annotations, &path)
            .map_err(PipelineError::Record)?,
        )
      } else {
        None
      };
      (Some(path), record_to)
    } else {
      debug!("未开启保存，跳过写入磁盘");
      (None, None)
    };

    Ok(DetectOutcome {
      detections,
      kept,
      image: decorated,
      saved_to,
      record_to,
    })
  }
}
