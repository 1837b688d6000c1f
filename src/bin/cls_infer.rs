// 该文件是 Shanan-Cls （山南西风·分类） 项目的一部分。
// src/bin/cls_infer.rs - 单张图像分类推理
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

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use shanan_cls::{
  FromUrl, FromUrlWithScheme,
  input::ImageFileInput,
  model::{CLASSIFIER_DEFAULT_CLASS_NUM, ClassId, Classifier, ClassifierBuilder},
  output::{ConsoleOutput, OutputFormat},
  preprocess::{Letterbox, Preprocess},
  runtime::{Backend, InferenceRuntime},
  task::{OneShotTask, Task},
  utils::to_url,
};

/// Shanan-Cls 单张图像分类
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// RKNN 模型文件路径（或 rknn:// URL）
  #[arg(value_name = "MODEL")]
  pub model: String,
  /// 输入图像路径（或 image:// URL）
  #[arg(value_name = "IMAGE")]
  pub image: String,
  /// 推理后端
  #[arg(long, value_enum, default_value_t = Backend::Rknn)]
  pub backend: Backend,
  /// 覆盖模型报告的输入边长
  #[arg(long, value_name = "SIZE")]
  pub input_size: Option<u32>,
  /// 类别数
  #[arg(long, default_value_t = CLASSIFIER_DEFAULT_CLASS_NUM, value_name = "COUNT")]
  pub num_classes: usize,
  /// 预处理方式
  #[arg(long, value_enum, default_value_t = Preprocess::Letterbox)]
  pub preprocess: Preprocess,
  /// 允许放大小于模型输入的图像
  #[arg(long)]
  pub allow_upscale: bool,
  /// 输出格式
  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

fn main() {
  tracing_subscriber::fmt::init();

  let args = match Args::try_parse() {
    Ok(args) => args,
    Err(e) if e.use_stderr() => {
      let _ = e.print();
      std::process::exit(-1);
    }
    Err(e) => e.exit(),
  };

  if let Err(e) = run(args) {
    error!("{:#}", e);
    std::process::exit(-1);
  }
}

fn run(args: Args) -> Result<()> {
  info!("模型文件路径: {}", args.model);
  info!("输入图像: {}", args.image);
  info!("推理后端: {:?}, 预处理方式: {:?}", args.backend, args.preprocess);

  let input = ImageFileInput::from_url(&to_url(&args.image, ImageFileInput::SCHEME)?)?;

  let mut builder = ClassifierBuilder::from_url(&to_url(&args.model, ClassifierBuilder::SCHEME)?)?
    .num_classes(args.num_classes);
  if let Some(size) = args.input_size {
    builder = builder.input_size(size, size);
  }

  info!("正在加载模型...");
  match args.backend {
    Backend::Rknn => classify(builder.build_rknn()?, input, &args),
    Backend::Rknpu => classify(builder.build()?, input, &args),
  }
}

fn classify<R: InferenceRuntime>(
  model: Classifier<R, ClassId>,
  input: ImageFileInput,
  args: &Args,
) -> Result<()> {
  let (width, height) = model.input_shape();
  info!(
    "模型输入: {}x{}, 类别数: {}",
    width,
    height,
    model.num_classes()
  );

  let letterbox = Letterbox::with_shape(width, height).allow_upscale(args.allow_upscale);
  let frames = input.into_nhwc(args.preprocess, &letterbox)?;
  let output = ConsoleOutput::stdout(args.format);

  OneShotTask.run_task(frames, model, output)?;

  Ok(())
}
