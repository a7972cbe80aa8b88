// 该文件是 Xunmu （寻目） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use xunmu::{
  ClassTable, DetectTask,
  input::{ImageFileInput, RecordedOutputs},
  output::Draw,
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();
  let config = args.detect_config();

  info!("网络输出: {}", args.predictions.display());
  info!("输入图像: {}", args.image.display());
  info!("置信度阈值: {}", config.confidence_threshold);
  info!("NMS 阈值: {}", config.nms_threshold);

  let classes = match &args.classes {
    Some(path) => ClassTable::from_file(path)?,
    None => {
      info!("未指定类别文件，使用 COCO 类别");
      ClassTable::coco()
    }
  };

  let resize = args.resize.then_some(config.input_size);
  let image = ImageFileInput::new(&args.image).with_resize(resize).load()?;
  let model = RecordedOutputs::from_file(&args.predictions)?;

  let draw = match &args.font {
    Some(path) => Draw::default()
      .with_font_file(path)
      .with_context(|| format!("无法加载字体: {}", path.display()))?,
    None => {
      debug!("使用内置字体绘制标签");
      Draw::default()
    }
  };

  let task = DetectTask::new(config)?.with_draw(draw);
  let outcome = task.run_with_model(&model, &image, &classes)?;

  info!(
    "检测到 {} 个对象 (候选 {} 个)",
    outcome.kept.len(),
    outcome.detections.len()
  );
  for detection in outcome.kept_detections() {
    let name = classes.get(detection.class_id).unwrap_or("unknown");
    info!(
      "  - {}: {:.2}% at ({}, {}, {}x{})",
      name,
      detection.confidence * 100.0,
      detection.bbox.x,
      detection.bbox.y,
      detection.bbox.width,
      detection.bbox.height
    );
  }
  if let Some(path) = &outcome.saved_to {
    info!("输出文件: {}", path.display());
  }
  if let Some(path) = &outcome.record_to {
    info!("检测记录: {}", path.display());
  }

  Ok(())
}
