// demos/blog.rs

//! Minimal blog build: scaffold a tiny site under `demo-site/`, register a
//! toy template engine and a small task graph, then run it once.
//!
//! ```text
//! cargo run --example blog
//! ```

use std::fs;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use sitesmith::{App, AppOptions, RenderEngine, TaskSpec, VirtualFile, logging};

/// `{{key}}` substitution, enough of a template language for a demo.
struct MarkerEngine;

impl RenderEngine for MarkerEngine {
    fn render(&self, template: &str, data: &Value) -> sitesmith::Result<String> {
        let mut out = template.to_string();
        if let Value::Object(map) = data {
            for (key, value) in map {
                if let Value::String(text) = value {
                    out = out.replace(&format!("{{{{{key}}}}}"), text);
                }
            }
        }
        Ok(out)
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("blog demo error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    logging::init_logging()?;
    scaffold("demo-site")?;

    let app = Arc::new(App::with_options(AppOptions {
        runtimes: true,
        root: "demo-site".into(),
        ..AppOptions::default()
    }));
    app.engine("hbs", Arc::new(MarkerEngine));
    app.set_data(site_data());

    let pages = app.clone();
    app.task("pages", &[], move || {
        let app = pages.clone();
        async move {
            let mut files = app.src(&["content/**/*.hbs"]).await?;
            for file in &mut files {
                app.render_file(file, &Map::new())?;
            }
            app.dest("dist", files).await?;
            Ok(())
        }
    })?;

    let styles = app.clone();
    app.task("styles", &[], move || {
        let app = styles.clone();
        async move {
            let css = VirtualFile::new("styles/site.css", "body { font-family: serif; }\n");
            app.dest("dist", vec![css]).await?;
            Ok(())
        }
    })?;

    let assets = app.clone();
    app.task("assets", &[], move || {
        let app = assets.clone();
        async move {
            app.copy(&["static/**/*"], "dist").await?;
            Ok(())
        }
    })?;

    app.register(TaskSpec::new("default").after(["pages", "styles", "assets"]))?;
    app.build("default").await?;

    println!("site written to demo-site/dist");
    Ok(())
}

fn scaffold(root: &str) -> std::io::Result<()> {
    fs::create_dir_all(format!("{root}/content/posts"))?;
    fs::create_dir_all(format!("{root}/static"))?;
    fs::write(
        format!("{root}/content/index.hbs"),
        "<h1>{{title}}</h1>\n<p>{{tagline}}</p>\n",
    )?;
    fs::write(
        format!("{root}/content/posts/first.hbs"),
        "<article>\n<h2>First post</h2>\n<p>Welcome to {{title}}.</p>\n</article>\n",
    )?;
    fs::write(format!("{root}/static/logo.svg"), "<svg></svg>\n")?;
    Ok(())
}

fn site_data() -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("title".to_string(), json!("Sitesmith Blog"));
    data.insert("tagline".to_string(), json!("tasks all the way down"));
    data
}
