use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use pixreel::assets::store::AssetStore;
use pixreel::layout::positions::LocationCatalog;
use pixreel::pipeline::orchestrator::mix_episode;
use pixreel::render::compositor::{Compositor, RenderInputs};
use pixreel::render::storyboard::render_storyboard;
use pixreel::script::cast::CharacterCatalog;
use pixreel::script::pacing::PacingVariant;
use pixreel::script::timing::EpisodeTiming;
use pixreel::{Orchestrator, PipelineConfig, RenderRequest, Script, WarningLog};

#[derive(Parser, Debug)]
#[command(name = "pixreel", version)]
struct Cli {
    /// Increase log detail (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render MP4s for one or more formats (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Validate a script and list assets that would fall back.
    Check(CommonArgs),
    /// Render one composited frame as a PNG.
    Frame(FrameArgs),
    /// Write the mixed soundtrack as a WAV file.
    Mix(OutArgs),
    /// Write a storyboard contact sheet as a PNG.
    Storyboard(StoryboardArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Episode script JSON.
    #[arg(long)]
    script: PathBuf,

    /// Asset tree root.
    #[arg(long)]
    assets: PathBuf,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pacing preset applied to the script (standard, upbeat, tense).
    #[arg(long)]
    pacing: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// Render format name; repeat for several. Defaults to every configured format.
    #[arg(long = "format")]
    formats: Vec<String>,

    /// Render formats concurrently.
    #[arg(long)]
    parallel: bool,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Scene index (0-based).
    #[arg(long)]
    scene: usize,

    /// Seconds into the scene.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Render format name.
    #[arg(long, default_value = "vertical")]
    format: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct OutArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct StoryboardArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Render format name.
    #[arg(long, default_value = "vertical")]
    format: String,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Check(args) => cmd_check(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Mix(args) => cmd_mix(args),
        Command::Storyboard(args) => cmd_storyboard(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

struct Loaded {
    script: Script,
    config: PipelineConfig,
    cast: CharacterCatalog,
    locations: LocationCatalog,
    store: AssetStore,
}

fn load(args: &CommonArgs) -> anyhow::Result<Loaded> {
    let mut script = Script::from_path(&args.script)?;
    if let Some(name) = args.pacing.as_deref() {
        let variant = PacingVariant::by_name(name)
            .with_context(|| format!("unknown pacing preset '{name}'"))?;
        script = script.with_pacing(&variant);
    }
    let config = match args.config.as_deref() {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    Ok(Loaded {
        script,
        config,
        cast: CharacterCatalog::load(&args.assets)?,
        locations: LocationCatalog::load(&args.assets)?,
        store: AssetStore::new(&args.assets, WarningLog::new()),
    })
}

impl Loaded {
    fn inputs(&self) -> RenderInputs<'_> {
        RenderInputs {
            script: &self.script,
            assets: &self.store,
            cast: &self.cast,
            locations: &self.locations,
            config: &self.config,
        }
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let orchestrator = Orchestrator::new(l.config)?;
    let mut req = RenderRequest::new(l.script, &args.common.assets, &args.out);
    req.formats = args.formats;
    req.parallel = args.parallel;

    let report = orchestrator.render(&req)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.passed() {
        anyhow::bail!("quality gate failed");
    }
    Ok(())
}

fn cmd_check(args: CommonArgs) -> anyhow::Result<()> {
    let l = load(&args)?;
    for format in &l.config.formats {
        Compositor::new(l.inputs(), format).check_layout()?;
    }
    let missing = l.store.missing_assets(&l.script, &l.cast, &l.config);
    let timing = EpisodeTiming::plan(&l.script, &l.config.timing);
    let out = serde_json::json!({
        "episode_id": l.script.episode_id,
        "scenes": l.script.scenes.len(),
        "planned_duration_secs": timing.duration_secs(),
        "missing_assets": missing,
        "warnings": l.store.warnings().snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let format = l.config.format(&args.format)?;
    let mut compositor = Compositor::new(l.inputs(), format);
    compositor.check_layout()?;
    let raster = compositor.render_at(args.scene, args.time)?;
    save_png(&raster.to_rgba_image()?, &args.out)
}

fn cmd_mix(args: OutArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let timing = EpisodeTiming::plan(&l.script, &l.config.timing);
    let mixed = mix_episode(&l.script, &timing, &l.store, &l.cast, &l.config);
    mixed.write_wav(&args.out)?;
    eprintln!(
        "wrote {} ({:.2}s, peak {:.3})",
        args.out.display(),
        mixed.duration_secs(),
        mixed.peak()
    );
    Ok(())
}

fn cmd_storyboard(args: StoryboardArgs) -> anyhow::Result<()> {
    let l = load(&args.common)?;
    let format = l.config.format(&args.format)?;
    let sheet = render_storyboard(l.inputs(), format)?;
    save_png(&sheet, &args.out)
}

fn save_png(img: &image::RgbaImage, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save_with_format(out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
