//! # Example: Watch Session
//!
//! A simulated watch-mode host driving the coordination layer:
//! - the host polls its watched inputs (the trigger file) and rebuilds on change
//! - every cycle writes real files into a temporary `dist/`
//! - the caller requests rebuilds and waits until their output is on disk
//!
//! Run with: `cargo run --example watch_session --features logging`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use buildvisor::{
    BuildFailure, BuildOptions, Bundle, ChangeKind, Config, LogWriter, OutputArtifact,
    OutputOptions, PollPolicy, Subscribe, WatchContext,
};
use tracing_subscriber::EnvFilter;

const FILES: [&str; 2] = ["background.js", "content.js"];

/// One build cycle: start, write files after a short "compile", then report the write.
async fn build(ctx: &WatchContext, out: &Path, round: usize) -> anyhow::Result<()> {
    let watched = |path: &Path| tracing::debug!(path = %path.display(), "host watches");
    let options = BuildOptions {
        input: vec![PathBuf::from("src/background.ts"), PathBuf::from("src/content.ts")],
        out_dir: Some(out.to_path_buf()),
        ..BuildOptions::default()
    };
    ctx.adapter().build_start(&watched, options).await?;
    tokio::time::sleep(Duration::from_millis(80)).await;

    if round == 2 {
        ctx.adapter().render_error(
            BuildFailure::message("Unexpected token (3:7)")
                .with_code("PARSE_ERROR")
                .with_frame("3 | const = 1;"),
        );
        return Ok(());
    }

    let bundle: Bundle = FILES
        .iter()
        .map(|f| (f.to_string(), OutputArtifact::chunk(*f)))
        .collect();
    ctx.adapter().write_bundle(OutputOptions::new(out), bundle);

    // The host reports the write before the files are flushed.
    tokio::time::sleep(Duration::from_millis(30)).await;
    for f in FILES {
        tokio::fs::write(out.join(f), format!("// round {round}\n")).await?;
    }
    Ok(())
}

/// Host loop: rebuild whenever the trigger file content changes.
async fn host(ctx: Arc<WatchContext>, out: PathBuf) -> anyhow::Result<()> {
    let mut last = tokio::fs::read_to_string(ctx.trigger_path()).await.ok();
    let mut round = 1;
    loop {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let content = tokio::fs::read_to_string(ctx.trigger_path()).await.ok();
        if content == last {
            continue;
        }
        last = content;
        ctx.adapter()
            .watch_change(ctx.trigger_path(), ChangeKind::Updated);
        build(&ctx, &out, round).await?;
        round += 1;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("dist");
    tokio::fs::create_dir_all(&out).await?;

    let mut cfg = Config::with_cache_dir(dir.path().join("node_modules/.vite"));
    cfg.poll = PollPolicy::fixed(Duration::from_millis(25));
    cfg.ready_timeout = Duration::from_secs(2);

    let ctx = WatchContext::new(cfg);
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::relative_to(dir.path()))];
    ctx.adapter().watcher_start(subs);

    // Initial cycle, as the host does right after entering watch mode.
    build(&ctx, &out, 0).await?;
    let first = ctx.ready().await?;
    println!("initial build on disk (seq={}, passes={})", first.seq, first.passes);

    let host = tokio::spawn(host(Arc::clone(&ctx), out.clone()));

    let ready = ctx.request_rebuild().await?;
    println!("rebuild on disk (seq={}, {}ms)", ready.seq, ready.duration());

    // Round 2 fails: the rebuild starts but never lands.
    match ctx.request_rebuild().await {
        Ok(ready) => println!("unexpected ready (seq={})", ready.seq),
        Err(err) => println!("rebuild failed: {} [{}]", err.as_message(), err.as_label()),
    }

    host.abort();
    ctx.adapter().close_watcher().await;
    Ok(())
}
