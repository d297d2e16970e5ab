//! Windowed visual mode: one simulation tick per frame interval, maze on the
//! left, per-generation average fitness bars on the right. Status text lives
//! in the window title.
//!
//! Keys: Space pauses, S fast-forwards a few generations, +/- change speed,
//! Esc quits.

use anyhow::{Context, Result};
use maze_chase_ga::{AgentKind, Direction, MemorySink, Role, Simulation, StateSnapshot};
use pixels::{Pixels, SurfaceTexture};
use std::time::{Duration, Instant};
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

const CELL: u32 = 24;
const PANEL_WIDTH: u32 = 220;
const FAST_FORWARD_GENERATIONS: u32 = 5;
const DEFAULT_TICK_MS: u64 = 120;

const FLOOR: (u8, u8, u8) = (20, 20, 30);
const WALL: (u8, u8, u8) = (40, 60, 160);
const FRUIT: (u8, u8, u8) = (220, 50, 50);
const FORAGER: (u8, u8, u8) = (100, 255, 100);
const PURSUER: (u8, u8, u8) = (255, 170, 60);

/// Pixel dimensions derived from the maze size.
#[derive(Debug, Clone, Copy)]
struct Canvas {
    width: u32,
    height: u32,
    maze_width: u32,
}

impl Canvas {
    fn for_maze(cols: usize, rows: usize) -> Self {
        let maze_width = cols as u32 * CELL;
        Self {
            width: maze_width + PANEL_WIDTH,
            height: (rows as u32 * CELL).max(240),
            maze_width,
        }
    }

    fn draw(&self, frame: &mut [u8], state: &StateSnapshot, curves: &MemorySink) {
        clear_rgba(frame, FLOOR.0, FLOOR.1, FLOOR.2, 255);

        for y in 0..state.height {
            for x in 0..state.width {
                let i = y * state.width + x;
                let (gx, gy) = (x as u32, y as u32);
                if state.walls[i] {
                    self.fill_cell(frame, gx, gy, WALL, 255);
                } else if (x + y) % 2 == 0 {
                    self.fill_cell(frame, gx, gy, (25, 25, 35), 255);
                }
                if state.occupancy[i].contains(AgentKind::FRUIT) {
                    self.fill_inset(frame, gx, gy, 6, FRUIT);
                }
            }
        }

        for (view, colour) in [(state.pursuer, PURSUER), (state.forager, FORAGER)] {
            let (gx, gy) = (view.location.x as u32, view.location.y as u32);
            self.fill_inset(frame, gx, gy, 2, colour);
            self.draw_heading(frame, gx, gy, view.heading);
        }

        let panel_x = self.maze_width + 10;
        let chart_w = PANEL_WIDTH - 20;
        let chart_h = (self.height - 30) / 2;
        self.draw_chart(frame, panel_x, 10, chart_w, chart_h, &curves.curve(Role::Forager), FORAGER);
        self.draw_chart(frame, panel_x, 20 + chart_h, chart_w, chart_h, &curves.curve(Role::Pursuer), PURSUER);
    }

    fn draw_heading(&self, frame: &mut [u8], gx: u32, gy: u32, heading: Direction) {
        let (bx, by) = (gx * CELL, gy * CELL);
        let mid = CELL / 2 - 2;
        let (x, y) = match heading {
            Direction::North => (bx + mid, by + 3),
            Direction::East => (bx + CELL - 7, by + mid),
            Direction::South => (bx + mid, by + CELL - 7),
            Direction::West => (bx + 3, by + mid),
        };
        self.fill_rect_rgba(frame, x, y, 4, 4, 10, 10, 10, 255);
    }

    fn draw_chart(&self, frame: &mut [u8], x: u32, y: u32, w: u32, h: u32, data: &[f32], colour: (u8, u8, u8)) {
        self.stroke_rect_rgba(frame, x, y, w, h, 200, 200, 200, 120);
        let max_val = data.iter().copied().fold(0.0f32, f32::max);
        if data.is_empty() || max_val <= 0.0 {
            return;
        }
        let bars = data.len().min(w as usize / 4).max(1);
        let bar_w = (w / bars as u32).max(2);
        for (i, &v) in data[data.len() - bars..].iter().enumerate() {
            let bh = ((v / max_val) * (h - 2) as f32) as u32;
            let bx = x + 1 + i as u32 * bar_w;
            let by = y + h - 1 - bh;
            self.fill_rect_rgba(frame, bx, by, bar_w - 1, bh, colour.0, colour.1, colour.2, 160);
        }
    }

    fn fill_cell(&self, frame: &mut [u8], gx: u32, gy: u32, (r, g, b): (u8, u8, u8), a: u8) {
        self.fill_rect_rgba(frame, gx * CELL, gy * CELL, CELL, CELL, r, g, b, a);
    }

    fn fill_inset(&self, frame: &mut [u8], gx: u32, gy: u32, inset: u32, (r, g, b): (u8, u8, u8)) {
        let size = CELL - 2 * inset;
        self.fill_rect_rgba(frame, gx * CELL + inset, gy * CELL + inset, size, size, r, g, b, 255);
    }

    fn blend_pixel(&self, frame: &mut [u8], x: u32, y: u32, r: u8, g: u8, b: u8, a: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        if idx + 3 >= frame.len() {
            return;
        }
        let ar = a as u16;
        let iar = (255 - a) as u16;
        for (offset, c) in [r, g, b].into_iter().enumerate() {
            let d = frame[idx + offset] as u16;
            frame[idx + offset] = ((c as u16 * ar + d * iar) / 255) as u8;
        }
        frame[idx + 3] = 255;
    }

    fn fill_rect_rgba(&self, frame: &mut [u8], x: u32, y: u32, w: u32, h: u32, r: u8, g: u8, b: u8, a: u8) {
        let x2 = (x + w).min(self.width);
        let y2 = (y + h).min(self.height);
        for py in y..y2 {
            for px in x..x2 {
                self.blend_pixel(frame, px, py, r, g, b, a);
            }
        }
    }

    fn stroke_rect_rgba(&self, frame: &mut [u8], x: u32, y: u32, w: u32, h: u32, r: u8, g: u8, b: u8, a: u8) {
        if w == 0 || h == 0 {
            return;
        }
        let x2 = (x + w - 1).min(self.width - 1);
        let y2 = (y + h - 1).min(self.height - 1);
        for px in x..=x2 {
            self.blend_pixel(frame, px, y, r, g, b, a);
            self.blend_pixel(frame, px, y2, r, g, b, a);
        }
        for py in y..=y2 {
            self.blend_pixel(frame, x, py, r, g, b, a);
            self.blend_pixel(frame, x2, py, r, g, b, a);
        }
    }
}

fn clear_rgba(frame: &mut [u8], r: u8, g: u8, b: u8, a: u8) {
    for px in frame.chunks_exact_mut(4) {
        px.copy_from_slice(&[r, g, b, a]);
    }
}

fn title(sim: &Simulation, paused: bool, tick_ms: u64) -> String {
    let state = sim.state();
    format!(
        "Maze chase | gen F{} P{} | gene {}/{} | fruit {}/{} | {}ms{}",
        state.forager.generation,
        state.pursuer.generation,
        state.forager.gene_index + 1,
        sim.ga(Role::Forager).len(),
        state.collected,
        state.total_fruit,
        tick_ms,
        if paused { " | paused" } else { "" },
    )
}

/// Abandons the visible episode and plays `generations` forager generations
/// without drawing.
fn fast_forward(sim: &mut Simulation, generations: u32) -> maze_chase_ga::Result<()> {
    sim.abandon_episode()?;
    let target = sim.generation(Role::Forager) + generations;
    let summary = sim.run(target, |_| {})?;
    info!(generation = target, episodes = summary.episodes, "fast-forwarded");
    Ok(())
}

/// Opens the window and hands control to the event loop. Only returns on a
/// setup failure.
pub fn run(mut sim: Simulation, curves: MemorySink) -> Result<()> {
    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();
    let canvas = Canvas::for_maze(sim.maze().width(), sim.maze().height());

    let window = WindowBuilder::new()
        .with_title(title(&sim, false, DEFAULT_TICK_MS))
        .with_inner_size(LogicalSize::new(canvas.width, canvas.height))
        .with_resizable(false)
        .build(&event_loop)
        .context("failed to open viewer window")?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(canvas.width, canvas.height, surface_texture).context("failed to create pixel surface")?
    };

    let mut paused = false;
    let mut tick_ms = DEFAULT_TICK_MS;
    let mut last_tick = Instant::now();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            canvas.draw(pixels.frame_mut(), &sim.state(), &curves);
            if let Err(err) = pixels.render() {
                error!(error = %err, "render failed");
                *control_flow = ControlFlow::Exit;
                return;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.close_requested() || input.destroyed() {
                *control_flow = ControlFlow::Exit;
                return;
            }
            if input.key_pressed(VirtualKeyCode::Space) {
                paused = !paused;
            }
            if input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals) {
                tick_ms = tick_ms.saturating_sub(20).max(10);
            }
            if input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus) {
                tick_ms = (tick_ms + 20).min(1000);
            }
            if input.key_pressed(VirtualKeyCode::S) {
                if let Err(err) = fast_forward(&mut sim, FAST_FORWARD_GENERATIONS) {
                    error!(error = %err, "fast-forward failed");
                    *control_flow = ControlFlow::Exit;
                    return;
                }
            }

            if !paused && last_tick.elapsed() >= Duration::from_millis(tick_ms) {
                match sim.tick() {
                    Ok(Some(result)) => info!(
                        winner = ?result.winner,
                        forager_fitness = result.forager_fitness,
                        pursuer_fitness = result.pursuer_fitness,
                        "episode finished"
                    ),
                    Ok(None) => {}
                    Err(err) => {
                        error!(error = %err, "simulation failed");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                }
                last_tick = Instant::now();
            }

            window.set_title(&title(&sim, paused, tick_ms));
            window.request_redraw();
        }
    });
}
