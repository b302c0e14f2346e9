use blockmap::MapConfig;
use demo::BlockmapApp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Optional path to a JSON config, defaults are used otherwise.
    let config = match std::env::args().nth(1) {
        Some(path) => MapConfig::load(path)?,
        None => MapConfig::default(),
    };

    eframe::run_native(
        "Blockmap",
        Default::default(),
        Box::new(|cc| Ok(Box::new(BlockmapApp::new(cc.egui_ctx.clone(), config)?))),
    )?;

    Ok(())
}
