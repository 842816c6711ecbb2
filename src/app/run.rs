// Copyright 2024. Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::app::args::{Command, CrawlArgs, LinyphiaArgs};
use crate::app::logging::configure_logging;
use crate::config::{history_below, Configs};
use crate::crawl::{CrawlContext, CrawlReport, Crawler};
use crate::extraction::{DefaultExtractor, SizeLimitLayer, TimingLayer};
use crate::history::HistoryReader;
use crate::provider::{Locator, StreamProviderRegistry};
use crate::runtime::StopSignal;
use crate::sink::{DataSink, JsonLinesSink};
use anyhow::bail;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Executes the command of `args`.
pub fn exec_args(args: LinyphiaArgs) -> anyhow::Result<()> {
    match args.command {
        Command::Crawl(args) => crawl(args),
        Command::Status {
            history,
            locators,
            config,
        } => status(&history, &locators, config.as_deref()),
        Command::Init { path } => init(&path),
    }
}

fn init(path: &Utf8Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{path} already exists!");
    }
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &Configs::example())?;
    println!("Wrote an example config to {path}");
    Ok(())
}

fn status(history: &Utf8Path, locators: &[String], config: Option<&Utf8Path>) -> anyhow::Result<()> {
    let configs = Configs::load(config)?;
    configure_logging(&configs.system)?;
    let stores = if locators.is_empty() {
        let mut stores = Vec::new();
        for entry in history.read_dir_utf8()? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                stores.push((entry.file_name().to_string(), entry.into_path()));
            }
        }
        stores.sort();
        stores
    } else {
        locators
            .iter()
            .map(|locator| {
                let locator = Locator::parse(locator)?;
                let path = history_below(history, &locator);
                Ok((locator.to_string(), path))
            })
            .collect::<anyhow::Result<Vec<_>>>()?
    };
    for (name, path) in stores {
        let reader = HistoryReader::open(&path, configs.reader.refresh_interval.unsigned_abs())?;
        println!("{name}: {} entities", reader.len()?);
    }
    Ok(())
}

fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let mut configs = Configs::load(args.config.as_deref())?;
    args.apply(&mut configs);
    configure_logging(&configs.system)?;
    let locators = args
        .locators
        .iter()
        .map(|locator| Locator::parse(locator))
        .collect::<Result<Vec<_>, _>>()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let reports = runtime.block_on(run_crawls(&configs, &locators, args.output))?;
    for (locator, report) in locators.iter().zip(reports) {
        eprintln!("{locator}: {report}");
    }
    Ok(())
}

/// Crawls the locators in order, each with its own context and history. Ctrl-C
/// stops the running crawl and skips the remaining locators.
async fn run_crawls(
    configs: &Configs,
    locators: &[Locator],
    output: Option<Utf8PathBuf>,
) -> anyhow::Result<Vec<CrawlReport>> {
    let sink: Arc<dyn DataSink> = match output {
        Some(path) => Arc::new(JsonLinesSink::append_to(path).await?),
        None => Arc::new(JsonLinesSink::stdout()),
    };
    let mut builder = Crawler::builder()
        .registry(StreamProviderRegistry::with_defaults(&configs.http)?)
        .extractor(Arc::new(DefaultExtractor::new()))
        .sink(sink)
        .layer(Arc::new(TimingLayer));
    if let Some(max_bytes) = configs.crawl.max_content_size {
        builder = builder.layer(Arc::new(SizeLimitLayer::new(max_bytes)));
    }
    let crawler = builder.build()?;
    let stop = StopSignal::new();

    let interrupted = Arc::new(AtomicBool::new(false));
    let handler = {
        let stop = stop.clone();
        let interrupted = interrupted.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Stopping, waiting for the running crawl to acknowledge.");
                interrupted.store(true, Ordering::SeqCst);
                stop.request_and_wait().await;
                log::info!("Stopped.");
            }
        })
    };

    let mut reports = Vec::with_capacity(locators.len());
    for locator in locators {
        if interrupted.load(Ordering::SeqCst) {
            log::info!("Skip {locator}, the crawl was interrupted.");
            break;
        }
        let mut config = configs.crawl.clone();
        config.history_path = configs.crawl.history_for(locator);
        let mut context = CrawlContext::from_config(&config)?.with_stop_signal(stop.clone());
        let report = crawler.crawl(locator, &mut context).await?;
        let stopped = report.stopped;
        reports.push(report);
        if stopped {
            break;
        }
    }
    handler.abort();
    Ok(reports)
}
