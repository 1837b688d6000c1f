// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/output.rs - 输出定义
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
  cell::RefCell,
  io::{Stdout, Write},
};

use serde_json::json;
use thiserror::Error;

use crate::{
  input::AsNhwcFrame,
  model::{ClassifyResult, WithLabel},
};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum ConsoleOutputError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
  /// 每个类别一行概率，最后一行为预测类别
  #[default]
  Text,
  /// 单行 JSON
  Json,
}

/// 将分类结果写到标准输出（或任意 `Write`）
pub struct ConsoleOutput<W: Write = Stdout> {
  format: OutputFormat,
  writer: RefCell<W>,
}

impl ConsoleOutput<Stdout> {
  pub fn stdout(format: OutputFormat) -> Self {
    Self::with_writer(format, std::io::stdout())
  }
}

impl<W: Write> ConsoleOutput<W> {
  pub fn with_writer(format: OutputFormat, writer: W) -> Self {
    Self {
      format,
      writer: RefCell::new(writer),
    }
  }

  pub fn into_inner(self) -> W {
    self.writer.into_inner()
  }
}

impl<W, F, T> Render<F, ClassifyResult<T>> for ConsoleOutput<W>
where
  W: Write,
  F: AsNhwcFrame,
  T: WithLabel,
{
  type Error = ConsoleOutputError;

  fn render_result(&self, frame: &F, result: &ClassifyResult<T>) -> Result<(), Self::Error> {
    let mut writer = self.writer.borrow_mut();
    match self.format {
      OutputFormat::Text => {
        for probability in result.probabilities.iter() {
          writeln!(writer, "Predicted : {}", probability)?;
        }
        writeln!(writer, "Predicted Class: {}", result.index)?;
      }
      OutputFormat::Json => {
        let (width, height) = frame.shape();
        let record = json!({
          "timestamp": chrono::Utc::now().to_rfc3339(),
          "input": [width, height],
          "class": result.kind.to_label_id(),
          "label": result.kind.to_label_str(),
          "score": result.score(),
          "probabilities": result.probabilities,
        });
        serde_json::to_writer(&mut *writer, &record)?;
        writeln!(writer)?;
      }
    }
    writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::RgbNhwcFrame, model::ClassId};

  fn result() -> ClassifyResult<ClassId> {
    ClassifyResult {
      kind: ClassId(1),
      index: 1,
      probabilities: vec![0.25, 0.75].into_boxed_slice(),
    }
  }

  #[test]
  fn text_format() {
    let output = ConsoleOutput::with_writer(OutputFormat::Text, Vec::new());
    output
      .render_result(&RgbNhwcFrame::with_shape(2, 2), &result())
      .unwrap();
    let text = String::from_utf8(output.into_inner()).unwrap();
    assert_eq!(
      text,
      "Predicted : 0.25\nPredicted : 0.75\nPredicted Class: 1\n"
    );
  }

  #[test]
  fn json_format() {
    let output = ConsoleOutput::with_writer(OutputFormat::Json, Vec::new());
    output
      .render_result(&RgbNhwcFrame::with_shape(8, 4), &result())
      .unwrap();
    let text = String::from_utf8(output.into_inner()).unwrap();
    let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(value["class"], 1);
    assert_eq!(value["label"], "class_1");
    assert_eq!(value["input"], json!([8, 4]));
    assert_eq!(value["probabilities"], json!([0.25, 0.75]));
    assert!(value["timestamp"].is_string());
  }
}
