use blockmap::EngineStats;
use egui::{Align2, RichText, Ui, Window};

use crate::BlockmapApp;

pub fn controls(app: &mut BlockmapApp, ui: &Ui) {
    Window::new("Controls")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::LEFT_BOTTOM, [10., -10.])
        .show(ui.ctx(), |ui| {
            ui.checkbox(&mut app.full_map, "Full-screen map [M]");

            let mut minimap = app.minimap.is_enabled();
            if ui.checkbox(&mut minimap, "Minimap [N]").changed() {
                app.minimap.set_enabled(minimap);
            }

            ui.horizontal(|ui| {
                if ui.button(RichText::new("➕").heading()).clicked() {
                    let _ = app.minimap.zoom_in();
                }

                if ui.button(RichText::new("➖").heading()).clicked() {
                    let _ = app.minimap.zoom_out();
                }

                ui.label(format!("minimap zoom {}", app.minimap.zoom()));
            });
        });
}

pub fn stats(ui: &Ui, stats: EngineStats) {
    Window::new("Tiles")
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(Align2::RIGHT_BOTTOM, [-10., -10.])
        .show(ui.ctx(), |ui| {
            ui.label(format!("cached: {}", stats.cached));
            ui.label(format!("pending: {}", stats.pending));
            ui.label(format!("downloading: {}", stats.in_progress));
        });
}
