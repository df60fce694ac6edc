//! Wall placement game with the level editor
//!
//! ```text
//! brickyard [LEVEL.json] [--config engine.ron]
//! ```

use brickyard::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut level = None;
    let mut config_path = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config_path = Some(args.next().ok_or("--config needs a file")?);
        } else if level.is_none() {
            level = Some(arg);
        } else {
            return Err(format!("unexpected argument '{arg}'").into());
        }
    }

    let config = match config_path {
        Some(path) => EngineConfig::load_ron(path)?,
        None => EngineConfig::default(),
    };

    let mut engine = Engine::new(config, WallGame::new());
    if let Some(level) = level {
        engine = engine.with_startup_level(level);
    }
    engine.run()
}
