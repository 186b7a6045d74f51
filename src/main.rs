mod engine;
mod utils;

use std::process::ExitCode;

use clap::Parser;

use engine::cli::CliArgs;
use engine::config::{Config, ConfigError};
use engine::{EngineResult, Windowing};

/// Config file (or defaults) with CLI overrides applied. Logs nothing: the subscriber
/// depends on the result.
fn load_config(args: &CliArgs) -> Result<Config, ConfigError> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    config.apply_cli_overrides(args);
    Ok(config)
}

fn log_config_source(args: &CliArgs) {
    match &args.config {
        Some(path) => tracing::info!(path = %path.display(), "loaded config"),
        None => tracing::info!("using default config"),
    }
}

fn run(args: CliArgs) -> EngineResult<()> {
    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            utils::logger::init(args.log_level.as_deref().unwrap_or(""));
            return Err(e.into());
        }
    };
    utils::logger::init(&config.log_level);
    log_config_source(&args);
    config.validate()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!(viewer = ?args.viewer, seed, "starting");

    match args.headless_frames {
        Some(frames) => {
            let report = Windowing::run_headless(&config, &args.viewer, seed, frames)?;
            if report.live_meshes != 0 || report.live_textures != 0 {
                tracing::warn!(?report, "resources left behind after unmount");
            }
            Ok(())
        }
        None => Windowing::run(config, args.viewer, seed),
    }
}

fn main() -> ExitCode {
    match run(CliArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "panorama-viewer failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_source_is_logged_once_the_subscriber_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.ron");
        Config::default().save(&path).unwrap();
        let path_arg = path.display().to_string();
        let args = CliArgs::try_parse_from([
            "panorama-viewer",
            "--config",
            path_arg.as_str(),
            "--seed",
            "9",
            "mountain",
        ])
        .unwrap();

        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config = tracing::subscriber::with_default(subscriber, || {
            let config = load_config(&args).unwrap();
            assert!(out.0.lock().unwrap().is_empty());
            log_config_source(&args);
            config
        });

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.matches("loaded config").count(), 1);
        assert!(text.contains(&path_arg));
        assert_eq!(config.seed, Some(9));
    }
}
