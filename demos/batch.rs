//! Download a list of extensions and write them as ZIP archives.
//!
//! ```text
//! cargo run --example batch -- ids.txt output/
//! ```
//!
//! `ids.txt` holds one extension identifier per line; `#` starts a comment.

use color_eyre::Result;
use crxdl::downloader::DownloaderBuilder;
use crxdl::extension::{parse_id_list, ExtensionId, PlatformDescriptor};
use crxdl::job::{BatchReport, Job, Status};
use crxdl::utils::format_size;
use reqwest::Url;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const UPDATE_ENDPOINT: &str = "https://clients2.google.com/service/update2/crx";

fn update_url(id: &ExtensionId, platform: &PlatformDescriptor) -> Result<Url> {
    let x = format!("id={}&uc", id);
    let url = Url::parse_with_params(
        UPDATE_ENDPOINT,
        &[
            ("response", "redirect"),
            ("os", platform.os.as_str()),
            ("arch", platform.arch.as_str()),
            ("prodversion", platform.prod_version.as_str()),
            ("acceptformat", "crx2,crx3"),
            ("x", x.as_str()),
        ],
    )?;
    Ok(url)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let list = match args.next() {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => "cjpalhdlnbpafiamejdnhcphjbkeiagm\n".to_string(),
    };
    let output = PathBuf::from(args.next().unwrap_or_else(|| "extensions".into()));

    let platform = PlatformDescriptor::default();
    let mut jobs = Vec::new();
    for parsed in parse_id_list(&list) {
        match parsed {
            Ok(id) => {
                let url = update_url(&id, &platform)?;
                jobs.push(Job::new(id, platform.clone(), &url));
            }
            Err(e) => eprintln!("skipping: {}", e),
        }
    }

    let downloader = DownloaderBuilder::new()
        .directory(output)
        .on_complete(|summary| match summary.status() {
            Status::Success(result) => println!(
                "✓ {} ({}, {})",
                summary.job().id,
                result.format,
                format_size(result.len() as u64)
            ),
            Status::Fail(error) => println!("✗ {}: {}", summary.job().id, error),
        })
        .build()?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let summaries = downloader.download_with_cancel(&jobs, cancel).await;
    println!("\n{}", BatchReport::from_summaries(&summaries));

    Ok(())
}
