use crate::app::App;
use anyhow::Result;
use colloquy_core::config::AppConfig;
use colloquy_infrastructure::ConfigService;

pub fn show(app: &App) -> Result<()> {
    println!("# config:   {}", app.config_path.display());
    println!("# catalog:  {}", app.paths.catalog_file()?.display());
    println!("# sessions: {}", app.paths.sessions_dir()?.display());
    println!();
    print!("{}", toml::to_string_pretty(&app.config)?);
    Ok(())
}

pub fn init(app: &App) -> Result<()> {
    if app.config_path.exists() {
        println!("Config already exists at {}", app.config_path.display());
        return Ok(());
    }

    ConfigService::new(&app.config_path).save(&AppConfig::default())?;
    println!("Wrote {}", app.config_path.display());
    Ok(())
}
