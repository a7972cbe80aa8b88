// 该文件是 Xunmu （寻目） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use chrono::Local;
use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::info;

/// 输出固定为无损 PNG
pub const OUTPUT_EXTENSION: &str = "png";

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("输出文件名无效: {0:?}")]
  InvalidName(String),
}

/// 把图像写到 `<output_dir>/<output_name>.png`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveImageFileOutput {
  output_dir: PathBuf,
  output_name: String,
}

impl SaveImageFileOutput {
  pub fn new<P: Into<PathBuf>, S: Into<String>>(
    output_dir: P,
    output_name: S,
  ) -> Result<Self, SaveImageFileError> {
    let output_name = output_name.into();
    if output_name.is_empty() || output_name.contains(['/', '\\']) {
      return Err(SaveImageFileError::InvalidName(output_name));
    }

    Ok(Self {
      output_dir: output_dir.into(),
      output_name,
    })
  }

  /// 以当前本地时间作为文件名
  pub fn timestamped<P: Into<PathBuf>>(output_dir: P) -> Self {
    Self {
      output_dir: output_dir.into(),
      output_name: timestamp_name(),
    }
  }

  pub fn output_dir(&self) -> &Path {
    &self.output_dir
  }

  pub fn output_name(&self) -> &str {
    &self.output_name
  }

  pub fn path(&self) -> PathBuf {
    self
      .output_dir
      .join(format!("{}.{}", self.output_name, OUTPUT_EXTENSION))
  }

  /// 同步写入，返回前文件已完整落盘或已报错
  pub fn save(&self, image: &RgbImage) -> Result<PathBuf, SaveImageFileError> {
    if !self.output_dir.as_os_str().is_empty() {
      std::fs::create_dir_all(&self.output_dir)?;
    }

    let path = self.path();
    image.save_with_format(&path, ImageFormat::Png)?;
    info!("保存图像到文件: {}", path.display());

    Ok(path)
  }
}

pub fn timestamp_name() -> String {
  Local::now().format("%Y-%m-%d_%H-%M-%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;

  #[test]
  fn path_uses_fixed_extension() {
    let output = SaveImageFileOutput::new("out/images", "street").unwrap();
    assert_eq!(output.path(), PathBuf::from("out/images/street.png"));
  }

  #[test]
  fn rejects_names_with_separators() {
    assert!(matches!(
      SaveImageFileOutput::new("out", "a/b"),
      Err(SaveImageFileError::InvalidName(_))
    ));
    assert!(matches!(
      SaveImageFileOutput::new("out", ""),
      Err(SaveImageFileError::InvalidName(_))
    ));
  }

  #[test]
  fn timestamped_names_are_valid_file_names() {
    let output = SaveImageFileOutput::timestamped("out");
    assert!(!output.output_name().contains(['/', '\\', ' ']));
  }

  #[test]
  fn saves_lossless_png_and_creates_directory() {
    let scratch = tempfile::tempdir().unwrap();
    let dir = scratch.path().join("nested");
    let mut image = RgbImage::new(4, 3);
    image.put_pixel(1, 2, Rgb([1, 2, 3]));

    let output = SaveImageFileOutput::new(&dir, "result").unwrap();
    let path = output.save(&image).unwrap();
    assert_eq!(path, dir.join("result.png"));

    let loaded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(loaded, image);
  }
}
