// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/utils.rs - 路径与 URL 工具
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

use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum LocationError {
  #[error("无法解析路径 {0}: {1}")]
  InvalidPath(String, std::io::Error),
  #[error("URL 解析错误: {0}")]
  UrlParseError(#[from] url::ParseError),
  #[error("URL 路径解码错误: {0}")]
  DecodeError(#[from] std::string::FromUtf8Error),
  #[error("路径不是有效的 UTF-8: {0}")]
  NonUtf8Path(String),
}

/// 将命令行参数转换为带方案的 URL
///
/// 已经带有方案的参数（如 `rknn:///data/model.rknn`）直接解析，
/// 否则视为本地路径，转为绝对路径后拼接 `scheme`。
pub fn to_url(raw: &str, scheme: &str) -> Result<Url, LocationError> {
  if has_scheme(raw) {
    return Ok(Url::parse(raw)?);
  }

  let absolute =
    std::path::absolute(raw).map_err(|e| LocationError::InvalidPath(raw.to_string(), e))?;
  path_to_url(&absolute, scheme)
}

/// 本地路径转为带方案的 URL，各段做百分号转义
///
/// 非 UTF-8 路径无法无损表示，直接报错。
pub fn path_to_url(path: &Path, scheme: &str) -> Result<Url, LocationError> {
  let text = path
    .to_str()
    .ok_or_else(|| LocationError::NonUtf8Path(path.display().to_string()))?;
  let encoded = text
    .split('/')
    .map(urlencoding::encode)
    .collect::<Vec<_>>()
    .join("/");

  Ok(Url::parse(&format!("{}://{}", scheme, encoded))?)
}

/// 取出 URL 中的本地文件路径（解码百分号转义）
pub fn url_to_path(url: &Url) -> Result<PathBuf, LocationError> {
  let decoded = urlencoding::decode(url.path())?;
  Ok(PathBuf::from(decoded.into_owned()))
}

fn has_scheme(raw: &str) -> bool {
  raw
    .split_once("://")
    .map(|(scheme, _)| {
      scheme.len() > 1
        && scheme
          .chars()
          .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
    .unwrap_or(false)
}
