mod player;
mod windows;

use std::sync::Arc;

use blockmap::markers::MarkerStore;
use blockmap::view::{MapInput, MapKey, MapScreen, Minimap};
use blockmap::{
    EguiSurface, EguiTextures, HttpOptions, MapConfig, ScreenRect, TextureRegistry, TileEngine,
};
use egui::{Context, Key, Rect};

use crate::player::WalkingPlayer;

fn screen_rect(rect: Rect) -> ScreenRect {
    ScreenRect::new(
        rect.min.x as i32,
        rect.min.y as i32,
        rect.width() as i32,
        rect.height() as i32,
    )
}

/// Translate egui's input into what the full-screen map understands.
fn map_inputs(ctx: &Context) -> Vec<MapInput> {
    ctx.input(|input| {
        let mut events = Vec::new();
        let pointer = &input.pointer;

        if let Some(pos) = pointer.interact_pos() {
            let (x, y) = (f64::from(pos.x), f64::from(pos.y));
            if pointer.primary_pressed() {
                events.push(MapInput::Press { x, y });
            } else if pointer.primary_down() && pointer.delta() != egui::Vec2::ZERO {
                events.push(MapInput::Drag { x, y });
            }
        }

        if pointer.primary_released() {
            events.push(MapInput::Release);
        }

        if input.raw_scroll_delta.y != 0.0 {
            events.push(MapInput::Scroll(f64::from(input.raw_scroll_delta.y)));
        }

        // Character bindings follow the keyboard layout.
        for event in &input.events {
            if let egui::Event::Text(text) = event {
                events.extend(text.chars().filter_map(MapKey::from_char).map(MapInput::Key));
            }
        }

        for (key, map_key) in [
            (Key::ArrowUp, MapKey::Up),
            (Key::ArrowDown, MapKey::Down),
            (Key::ArrowLeft, MapKey::Left),
            (Key::ArrowRight, MapKey::Right),
        ] {
            if input.key_pressed(key) {
                events.push(MapInput::Key(map_key));
            }
        }

        events
    })
}

pub struct BlockmapApp {
    textures: Arc<EguiTextures>,
    engine: TileEngine,
    markers: MarkerStore,
    player: WalkingPlayer,
    minimap: Minimap,
    screen: MapScreen,
    full_map: bool,
}

impl BlockmapApp {
    pub fn new(
        egui_ctx: Context,
        config: MapConfig,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let options = HttpOptions::default();
        let textures = Arc::new(EguiTextures::new(egui_ctx));
        let engine = TileEngine::new(
            &config,
            &options,
            Arc::clone(&textures) as Arc<dyn TextureRegistry>,
        )?;
        let markers = MarkerStore::spawn(&config, &options)?;

        Ok(Self {
            textures,
            engine,
            markers,
            player: WalkingPlayer::new("Steve", 300.0),
            minimap: Minimap::new(&config),
            screen: MapScreen::new(&config),
            full_map: false,
        })
    }
}

impl eframe::App for BlockmapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let player = self.player.at(ctx.input(|input| input.time));

        if ctx.input(|input| input.key_pressed(Key::M)) {
            self.full_map = !self.full_map;
        }

        if ctx.input(|input| input.key_pressed(Key::N)) {
            self.minimap.toggle();
        }

        if self.full_map && !ctx.wants_pointer_input() {
            for input in map_inputs(ctx) {
                self.screen.handle_input(input, &player);
            }
        }

        let rimless = egui::Frame {
            fill: ctx.style().visuals.panel_fill,
            ..Default::default()
        };

        egui::CentralPanel::default()
            .frame(rimless)
            .show(ctx, |ui| {
                let viewport = screen_rect(ui.max_rect());
                let markers = self.markers.snapshot();

                {
                    let mut surface = EguiSurface::new(ui.painter(), &self.textures);
                    if self.full_map {
                        self.screen
                            .render(&mut surface, viewport, &self.engine, &markers, &player);
                    } else {
                        self.minimap.render(
                            &mut surface,
                            viewport.right(),
                            &self.engine,
                            &markers,
                            &player,
                        );
                    }
                }

                windows::controls(self, ui);
                windows::stats(ui, self.engine.stats());
            });

        // Player keeps walking.
        ctx.request_repaint();
    }
}
