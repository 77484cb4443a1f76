mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use image::RgbaImage;
use log::{info, warn};
use ratatui::DefaultTerminal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tui_layer_map::config::MapConfig;
use tui_layer_map::grid::{demo_grid, Dimensions, OccupancyGrid};
use tui_layer_map::layer::ShapeKind;
use tui_layer_map::map::MapRenderer;
use tui_layer_map::session::{MapSession, NotificationSink};
use tui_layer_map::source::{image_dimensions, load_grid_file, MapClient};
use url::Url;

/// Layered terminal map with drawing tools and an occupancy grid overlay
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Layer and map flag configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Occupancy grid file: a JSON code array or {"data", "width", "height"}
    #[arg(long, conflicts_with = "server")]
    grid: Option<PathBuf>,
    /// Grid width in cells, overrides the source
    #[arg(long, requires = "height")]
    width: Option<usize>,
    /// Grid height in cells, overrides the source
    #[arg(long, requires = "width")]
    height: Option<usize>,
    /// Map server base URL, e.g. https://localhost:44352/api/
    #[arg(long, requires = "map_id")]
    server: Option<Url>,
    /// Map identifier on the server
    #[arg(long)]
    map_id: Option<String>,
    /// Bearer credential sent to the server as-is
    #[arg(long, env = "MAP_TOKEN", default_value = "")]
    token: String,
    /// Fetch the server-rendered image instead of the raw grid
    #[arg(long, requires = "server")]
    remote_image: bool,
    /// Rasterize the grid to this PNG file and exit
    #[arg(long, conflicts_with = "remote_image")]
    export_png: Option<PathBuf>,
    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "tui-layer-map.log")]
    log_file: PathBuf,
}

impl Cli {
    fn dimensions(&self) -> Dimensions {
        Dimensions::from_optional(self.width, self.height)
    }
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("initializing logger")?;
    Ok(())
}

/// Grid from the server, a file, or the built-in demo
async fn load_grid(cli: &Cli) -> Result<OccupancyGrid> {
    match (&cli.server, &cli.grid) {
        (Some(server), _) => {
            let client = MapClient::new(server.clone(), cli.token.clone());
            let map_id = cli.map_id.as_deref().unwrap_or_default();
            Ok(client.fetch_grid(map_id, cli.dimensions()).await?)
        }
        (None, Some(path)) => Ok(load_grid_file(path, cli.dimensions())?),
        (None, None) => {
            info!("no grid source given, using demo grid");
            Ok(demo_grid(160, 96))
        }
    }
}

/// Server-rendered overlay; its size is taken once the image reports it
async fn load_remote_image(cli: &Cli, server: &Url) -> Result<RgbaImage> {
    let client = MapClient::new(server.clone(), cli.token.clone());
    let bytes = client
        .fetch_image(cli.map_id.as_deref().unwrap_or_default())
        .await?;

    let dimension = image_dimensions(bytes.clone())
        .await
        .context("server image has no readable dimensions")?;
    info!("image dimension ready: {}x{}", dimension.w, dimension.h);

    let image = image::load_from_memory(&bytes).context("decoding server image")?;
    Ok(image.to_rgba8())
}

async fn load_overlay(cli: &Cli) -> Result<RgbaImage> {
    if let (true, Some(server)) = (cli.remote_image, &cli.server) {
        return load_remote_image(cli, server).await;
    }
    let grid = load_grid(cli).await?;
    let image = grid.render_pixels().context("rasterizing occupancy grid")?;
    info!("overlay ready: {}x{}", image.width(), image.height());
    Ok(image)
}

/// Put a loaded overlay on the renderer. A failed load leaves the map without
/// one and returns the notice for the user.
fn install_overlay(renderer: &mut MapRenderer, loaded: Result<RgbaImage>) -> Option<String> {
    match loaded {
        Ok(image) => {
            renderer.set_overlay(image);
            None
        }
        Err(e) => {
            warn!("overlay unavailable: {:#}", e);
            Some(format!("Occupancy overlay unavailable: {e:#}"))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let config = match &cli.config {
        Some(path) => MapConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => MapConfig::demo(),
    };
    info!("{} layers configured", config.layers.len());

    if let Some(path) = &cli.export_png {
        let grid = load_grid(&cli).await?;
        let encoded = grid.rasterize().context("rasterizing occupancy grid")?;
        fs::write(path, &encoded.png).with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}x{} overlay to {}", encoded.width, encoded.height, path.display());
        return Ok(());
    }

    let session = MapSession::new(config);
    let mut renderer = MapRenderer::new();
    let overlay_error = install_overlay(&mut renderer, load_overlay(&cli).await);

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, session, renderer, overlay_error);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for drawing, panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.begin_press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_press(mouse.column, mouse.row),
        _ => {}
    }
}

fn handle_key(app: &mut App, code: KeyCode, terminal_size: (usize, usize)) {
    // A pending notification swallows the first key
    if app.status.dismiss() {
        return;
    }

    if app.is_editing() {
        match code {
            KeyCode::Left => return app.nudge(-1.0, 0.0),
            KeyCode::Right => return app.nudge(1.0, 0.0),
            KeyCode::Up => return app.nudge(0.0, 1.0),
            KeyCode::Down => return app.nudge(0.0, -1.0),
            KeyCode::Tab => return app.cycle_selection(),
            KeyCode::Enter => return app.commit_edit(),
            _ => {}
        }
    }

    match code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.cancel(),
        KeyCode::Enter => app.finish_draft(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Drawing tools
        KeyCode::Char('p') => app.select_tool(ShapeKind::Polyline),
        KeyCode::Char('g') => app.select_tool(ShapeKind::Polygon),
        KeyCode::Char('r') => app.select_tool(ShapeKind::Rectangle),
        KeyCode::Char('c') => app.select_tool(ShapeKind::Circle),
        KeyCode::Char('m') => app.select_tool(ShapeKind::Marker),
        KeyCode::Char('e') => app.toggle_edit(),

        // Overlay toggles
        KeyCode::Char('o') => app.map_renderer.toggle_overlay(),
        KeyCode::Char('u') => app.map_renderer.toggle_unknown(),
        KeyCode::Char('a') => app.map_renderer.toggle_annotations(),

        // Layer visibility
        KeyCode::Char(digit @ '1'..='9') => {
            let idx = digit as usize - '1' as usize;
            if let Some(visible) = app.session.toggle_layer(idx) {
                info!("layer {} visible: {}", app.session.layers()[idx].name, visible);
            }
        }

        KeyCode::Char('0') => app.reset_view(terminal_size.0, terminal_size.1),
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    session: MapSession,
    renderer: MapRenderer,
    overlay_error: Option<String>,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, session, renderer);

    for message in app.session.diagnostics() {
        app.status.notify(&message);
    }
    if let Some(message) = overlay_error {
        app.status.notify(&message);
    }

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let size = terminal.size()?;
                    handle_key(&mut app, key.code, (size.width as usize, size.height as usize));
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
