//! Build the static site

use anyhow::Result;
use notify::Watcher;
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::content::loader::ContentLoader;
use crate::generator::{BuildReport, Generator};
use crate::{Site, CONFIG_FILE};

/// Render every document and copy every static file
pub fn run(site: &Site) -> Result<BuildReport> {
    let start = Instant::now();

    let loader = ContentLoader::new(site);
    let tree = loader.load()?;

    tracing::info!(
        "Loaded {} documents and {} static files",
        tree.documents.len(),
        tree.assets.len()
    );

    let generator = Generator::new(site)?;
    let report = generator.generate(&tree.documents, &tree.assets)?;

    let duration = start.elapsed();
    tracing::info!("Built in {:.2}s", duration.as_secs_f64());

    Ok(report)
}

/// Watch for file changes and rebuild
pub async fn watch(site: &Site) -> Result<()> {
    let (tx, rx) = channel();

    let mut watcher = notify::recommended_watcher(move |res| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    watcher.watch(&site.source_dir, notify::RecursiveMode::Recursive)?;

    let config_path = site.base_dir.join(CONFIG_FILE);
    if config_path.exists() {
        watcher.watch(&config_path, notify::RecursiveMode::NonRecursive)?;
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let mut last_rebuild = Instant::now();

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                // Writes into the output directory would retrigger forever
                let relevant = event
                    .paths
                    .iter()
                    .any(|path| !path.starts_with(&site.output_dir));
                if !relevant || last_rebuild.elapsed() <= Duration::from_millis(500) {
                    continue;
                }

                tracing::info!("File changed, rebuilding...");
                match rebuild(site) {
                    Ok(report) if !report.is_success() => {
                        tracing::warn!("{} documents failed to render", report.failures.len());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!("Build failed: {}", e),
                }
                last_rebuild = Instant::now();
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Rebuild with a config reloaded from disk, keeping command-line overrides
pub(crate) fn rebuild(original: &Site) -> Result<BuildReport> {
    let fresh = Site::new(&original.base_dir)?;
    run(&with_overrides(fresh, original))
}

fn with_overrides(fresh: Site, original: &Site) -> Site {
    let mut config = fresh.config;
    config.render_drafts |= original.config.render_drafts;
    Site::with_config(fresh.base_dir, config)
}
