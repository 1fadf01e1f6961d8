use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use wallgen_core::*;

struct WallgenCliApp {
    config: Config,
    upsampler: FsrcnnUpsampler,
    client: CraiyonClient,
    platform: Platform,
}

impl WallgenCliApp {
    fn new() -> Result<Self> {
        let config = Config::new().context("Failed to load configuration")?;

        let upsampler = FsrcnnUpsampler::load(&config.model_path)
            .with_context(|| format!("Failed to initialise upscaler from {}", config.model_path.display()))?;
        let client = CraiyonClient::new(&config);
        log::debug!("Saving wallpapers to {}", config.output_dir.display());

        Ok(Self {
            config,
            upsampler,
            client,
            platform: Platform::current(),
        })
    }

    fn pick_prompt(&self) -> Result<&str> {
        self.config
            .prompts
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .context("No prompts configured")
    }

    fn run(&self) -> Result<()> {
        let prompt = self.pick_prompt()?;
        println!("Generating image for prompt: {}", prompt);

        let pipeline = Pipeline::new(
            &self.client,
            &self.upsampler,
            &self.platform,
            PipelineOptions::from_config(&self.config),
        );
        let path = pipeline.run(prompt, &mut rand::thread_rng())?;

        println!("Set wallpaper: {}", path.display());
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = WallgenCliApp::new()?;
    println!("Generator initialized.");

    app.run()?;
    println!("Done.");

    Ok(())
}
