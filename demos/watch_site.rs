// demos/watch_site.rs

//! Watch-driven rebuilds: publishes `demo-site/content` into
//! `demo-site/dist`, then re-runs the publish task on every change. Bursts
//! of edits coalesce under the queued rebuild policy.
//!
//! ```text
//! cargo run --example watch_site
//! # then edit files under demo-site/content
//! ```

use std::fs;
use std::sync::Arc;

use tracing::info;

use sitesmith::{App, AppOptions, RebuildPolicy, logging};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("watch demo error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    logging::init_logging()?;
    fs::create_dir_all("demo-site/content")?;
    fs::write(
        "demo-site/content/index.md",
        "# Hello\n\nEdit me and watch the rebuild.\n",
    )?;

    let app = Arc::new(App::with_options(AppOptions {
        runtimes: true,
        root: "demo-site".into(),
        rebuild: RebuildPolicy::Queued,
    }));

    let publish = app.clone();
    app.task("publish", &[], move || {
        let app = publish.clone();
        async move {
            app.copy(&["content/**/*"], "dist").await?;
            Ok(())
        }
    })?;

    app.build("publish").await?;

    let handle = app.watch(&["content/**/*"], "publish")?;
    info!("watching demo-site/content, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    handle.close();
    info!("watch closed");
    Ok(())
}
