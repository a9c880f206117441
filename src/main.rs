// src/main.rs
use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use imagine::platform::{CommandShare, CommandVoiceInput, FileDownloader};
use imagine::services::{GeminiBackend, GenerationClient};
use imagine::{App, AspectRatio, Config, Platform, repl};

#[derive(Parser)]
#[command(name = "imagine", version, about = "Generate images from text descriptions")]
struct Cli {
    /// Generate once for this prompt, save the image and exit.
    #[arg(long)]
    prompt: Option<String>,

    /// Aspect ratio for new images (1:1, 16:9, 9:16, 4:3, 3:4).
    #[arg(long, default_value = "16:9")]
    ratio: AspectRatio,

    #[arg(long, env = "IMAGINE_MODEL")]
    model: Option<String>,

    #[arg(long, env = "IMAGINE_BASE_URL")]
    base_url: Option<String>,

    /// Directory downloaded images are written to.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Speech-to-text program that prints a transcript on stdout.
    #[arg(long, env = "IMAGINE_VOICE_CMD")]
    voice_cmd: Option<String>,

    /// Program that receives the image path when sharing, e.g. xdg-open.
    #[arg(long, env = "IMAGINE_SHARE_CMD")]
    share_cmd: Option<String>,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value_t = 2000)]
    base_delay_ms: u64,
}

impl Cli {
    fn into_config(self) -> (Config, Option<String>) {
        let mut config = Config::from_env()
            .with_retry(self.max_attempts, Duration::from_millis(self.base_delay_ms));
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        config.default_ratio = self.ratio;
        config.output_dir = self.output_dir;
        config.voice_command = self.voice_cmd;
        config.share_command = self.share_cmd;
        (config, self.prompt)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let (config, prompt) = Cli::parse().into_config();
    info!("Starting Imagine with model {}", config.model);

    let client = GenerationClient::new(
        GeminiBackend::new(&config),
        config.credential().map(str::to_string),
        config.retry,
    );
    let platform = Platform {
        voice: Box::new(CommandVoiceInput::new(config.voice_command.clone())),
        downloader: Box::new(FileDownloader::new(config.output_dir.clone())),
        share: Box::new(CommandShare::new(config.share_command.clone())),
    };
    let mut app = App::new(Arc::new(client), platform, config.default_ratio);

    match prompt {
        Some(prompt) => {
            app.set_draft(prompt);
            app.generate().await?;
            if let Some(message) = &app.state().last_error {
                anyhow::bail!("{}", message);
            }
            let path = app.download().await.context("Failed to save image")?;
            println!("{}", path.display());
        }
        None => repl::run(app).await?,
    }

    Ok(())
}
