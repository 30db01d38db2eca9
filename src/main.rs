// =============================================================================
// HELLO TRIANGLE - Vulkan bring-up on a winit window
// =============================================================================
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit event loop (window, resize, close, keyboard)             │
// │    └── GpuContext<VulkanDriver>                                 │
// │          └── instance → device → swapchain → pipeline           │
// │                └── one command buffer, re-recorded per frame    │
// │                      └── semaphore / semaphore / fence          │
// └─────────────────────────────────────────────────────────────────┘
//
// Exit status is 0 after a normal quit and 1 if bring-up (or a later frame)
// failed.
//
// =============================================================================

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hello_triangle::{Config, ContextSettings, FrameOutcome, GpuContext, VulkanDriver};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Force the validation layer on or off, overriding the config file
    #[arg(long, value_enum)]
    validation: Option<Toggle>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Toggle {
    On,
    Off,
}

impl Args {
    /// Apply command line overrides on top of the file configuration
    fn apply(&self, config: &mut Config) {
        if let Some(toggle) = self.validation {
            config.debug.validation = Some(toggle == Toggle::On);
        }
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config)?;
    args.apply(&mut config);

    init_logging(&config)?;
    log::info!("Starting hello triangle");
    match &config.source {
        Some(path) => log::info!("Loaded configuration from {:?}", path),
        None => log::info!("Config file not found at {:?}, using defaults", args.config),
    }
    if config.log_level().is_none() {
        log::warn!(
            "Unknown log level '{}', defaulting to info",
            config.debug.log_level
        );
    }
    log::debug!("Config: {:?}", config);
    log::info!(
        "Window: {}x{} \"{}\"",
        config.window.width,
        config.window.height,
        config.window.title
    );

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(if app.failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Initialize logging, optionally into a file instead of stderr.
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &Config) -> Result<()> {
    use env_logger::{Builder, Target};

    let mut builder = Builder::new();
    builder.filter_level(config.log_level().unwrap_or(log::LevelFilter::Info));
    builder.parse_default_env();

    if config.debug.log_to_file {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&config.debug.log_file)
            .with_context(|| format!("Failed to open log file {:?}", config.debug.log_file))?;
        writeln!(file, "=== Hello Triangle Log ===")?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    config: Config,
    /// Owns the window through its driver; dropped before the event loop ends
    context: Option<GpuContext<VulkanDriver>>,
    failed: bool,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            context: None,
            failed: false,
        }
    }

    fn window(&self) -> Option<&Arc<Window>> {
        self.context.as_ref().and_then(|ctx| ctx.driver().window())
    }

    /// Create the window and run the whole bring-up sequence
    fn init_vulkan(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(self.config.window.resizable);

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let driver = VulkanDriver::new(window)?;
        let mut context = GpuContext::new(driver, ContextSettings::from(&self.config));

        // On failure the partially built context is dropped here, which
        // releases whatever was created
        context.build()?;

        self.context = Some(context);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failed = true;
        self.context = None;
        event_loop.exit();
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }

        if let Err(e) = self.init_vulkan(event_loop) {
            self.fail(event_loop, e.context("Bring-up failed"));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(ctx) = self.context.as_mut() {
                    ctx.request_rebuild();
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(ctx) = self.context.as_mut() else {
                    return;
                };
                match ctx.draw_frame() {
                    Ok(FrameOutcome::Presented { .. }) => {}
                    Ok(outcome) => log::trace!("Frame not presented: {:?}", outcome),
                    Err(e) => {
                        let error = anyhow::Error::new(e).context("Frame failed");
                        self.fail(event_loop, error);
                    }
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed()
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    log::info!("ESC pressed, exiting...");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    /// Request continuous redraws
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window() {
            window.request_redraw();
        }
    }

    /// Tear down while the event loop (and so the display connection) is alive
    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.context = None;
    }
}
