use crate::app::App;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};
use tui_layer_map::braille::BrailleCanvas;
use tui_layer_map::layer::ShapeKind;
use tui_layer_map::map::MapLayers;

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);

    if let Some(message) = &app.status.popup {
        render_popup(frame, message, chunks[0]);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.is_editing() { " Map [edit] " } else { " Map " };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let highlight = app.highlight();
    let layers = app.map_renderer.render(
        inner.width as usize,
        inner.height as usize,
        &viewport,
        &app.session,
        highlight.as_ref(),
    );

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Braille map canvases composited back to front
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height {
            for col in 0..area.width {
                if let Some(ch) = canvas.glyph(col as usize, row as usize) {
                    buf[(area.x + col, area.y + row)].set_char(ch).set_fg(color);
                }
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Overlay: unknown, then walls, then unrecognized codes
        Self::render_layer(&self.layers.unknown, Color::DarkGray, area, buf);
        Self::render_layer(&self.layers.occupied, Color::White, area, buf);
        Self::render_layer(&self.layers.unrecognized, Color::Red, area, buf);

        for (color, canvas) in &self.layers.annotations {
            let color = color.parse::<Color>().unwrap_or(Color::Magenta);
            Self::render_layer(canvas, color, area, buf);
        }

        Self::render_layer(&self.layers.highlight, Color::LightCyan, area, buf);

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

/// Modal notification over the map; any key dismisses it
fn render_popup(frame: &mut Frame, message: &str, area: Rect) {
    let lines: Vec<Line> = message.lines().map(Line::from).collect();
    let width = (area.width * 2 / 3).max(20).min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(" Notice (any key) ", Style::default().fg(Color::Yellow)));
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" ", Style::default()),
        Span::styled(app.cursor_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
    ];

    // Only offered tools are listed
    for &kind in app.session.toolbar().tools() {
        let active = app.tool == Some(kind);
        spans.push(Span::styled(
            format!("{} ", tool_label(kind)),
            Style::default().fg(if active { Color::Green } else { Color::Gray }),
        ));
    }
    if app.session.toolbar().edit_target.is_some() {
        spans.push(Span::styled(
            "[e]dit ",
            Style::default().fg(if app.is_editing() { Color::Green } else { Color::Gray }),
        ));
    }

    spans.push(Span::styled("| ", Style::default().fg(Color::DarkGray)));
    for (idx, layer) in app.session.layers().iter().enumerate().take(9) {
        let visible = app.session.group(idx).is_some_and(|g| g.visible);
        let color = if visible {
            layer.color.parse::<Color>().unwrap_or(Color::Green)
        } else {
            Color::DarkGray
        };
        spans.push(Span::styled(
            format!("{}:{} ", idx + 1, layer.name),
            Style::default().fg(color),
        ));
    }

    if let Some(latest) = app.status.latest() {
        spans.push(Span::styled("| ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            latest.replace('\n', " "),
            Style::default().fg(Color::White),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn tool_label(kind: ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Polyline => "[p]olyline",
        ShapeKind::Polygon => "poly[g]on",
        ShapeKind::Rectangle => "[r]ect",
        ShapeKind::Circle => "[c]ircle",
        ShapeKind::Marker => "[m]arker",
        ShapeKind::CircleMarker => "circlemarker",
    }
}
