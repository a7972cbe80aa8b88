// 该文件是 Xunmu （寻目） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("I/O error on {path}: {source}")]
  IoError {
    path: String,
    source: std::io::Error,
  },
  #[error("Image loading error on {path}: {source}")]
  ImageLoadError {
    path: String,
    source: image::ImageError,
  },
}

/// 从磁盘读取待标注的图像
#[derive(Debug, Clone)]
pub struct ImageFileInput {
  path: PathBuf,
  resize_to: Option<u32>,
}

impl ImageFileInput {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self {
      path: path.into(),
      resize_to: None,
    }
  }

  /// 读取后缩放为 `size x size` 的正方形，与网络输入尺寸一致
  pub fn with_resize(mut self, size: Option<u32>) -> Self {
    self.resize_to = size;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn load(&self) -> Result<RgbImage, ImageFileInputError> {
    let path = self.path.display().to_string();
    let reader = ImageReader::open(&self.path).map_err(|source| {
      error!("Cannot open image file: {}", path);
      ImageFileInputError::IoError {
        path: path.clone(),
        source,
      }
    })?;
    let image = reader
      .decode()
      .map_err(|source| ImageFileInputError::ImageLoadError {
        path: path.clone(),
        source,
      })?
      .to_rgb8();
    debug!("Loaded {} ({}x{})", path, image.width(), image.height());

    Ok(match self.resize_to {
      Some(size) => resize_square(&image, size),
      None => image,
    })
  }
}

pub fn resize_square(image: &RgbImage, size: u32) -> RgbImage {
  image::imageops::resize(image, size, size, FilterType::Triangle)
}
