use std::{env, fs};

use image::ImageFormat;
use imageops_bgremove::{BackgroundRemover, ClassificationParameters, SourceFile};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <input_image> [config.json]", args[0]);
        eprintln!("Example: {} portrait.jpg settings.json", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let params = match args.get(2) {
        Some(config_path) => ClassificationParameters::from_json(&fs::read_to_string(config_path)?)?,
        None => ClassificationParameters::default(),
    };

    let mime_type = ImageFormat::from_path(input_path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    let upload = SourceFile::new(fs::read(input_path)?, mime_type);

    let mut remover: BackgroundRemover = BackgroundRemover::default().with_parameters(params)?;
    let source = remover.load(&upload)?;
    println!("Loaded {}x{} image", source.width(), source.height());

    remover.remove_background()?;

    if let Some(download) = remover.download() {
        fs::write(&download.file_name, download.bytes)?;
        println!("Output saved to: {}", download.file_name);
    }

    Ok(())
}
