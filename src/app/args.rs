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

use crate::config::Configs;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Linyphia crawls file trees, maildirs and websites incrementally.
pub struct LinyphiaArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawls the locators one after another and writes every change as json line.
    Crawl(CrawlArgs),
    /// Prints the number of entities in the histories, also while a crawl writes to them.
    Status {
        /// The history directory to inspect.
        #[arg(long)]
        history: Utf8PathBuf,
        /// Only show the histories of these start locators.
        locators: Vec<String>,
        /// An additional config file.
        #[arg(short, long)]
        config: Option<Utf8PathBuf>,
    },
    /// Writes an example config.
    Init {
        /// Where the config is written to.
        #[arg(long, default_value = "linyphia.json")]
        path: Utf8PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct CrawlArgs {
    /// Paths, file:, maildir: or http(s): urls.
    #[arg(required = true)]
    pub locators: Vec<String>,
    /// An additional config file.
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,
    /// The history directory, without one every entity is new.
    #[arg(long)]
    pub history: Option<Utf8PathBuf>,
    /// The maximum depth below each locator.
    #[arg(short, long)]
    pub depth: Option<usize>,
    /// Do not report entities that disappeared.
    #[arg(long)]
    pub no_removals: bool,
    /// Visit entities seen twice again.
    #[arg(long)]
    pub no_cycle_detection: bool,
    /// Abort on the first failing entity.
    #[arg(long)]
    pub interrupt_on_error: bool,
    /// Log every classification.
    #[arg(short, long)]
    pub verbose: bool,
    /// Appends the json lines to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<Utf8PathBuf>,
    /// Overrides the log level of the config.
    #[arg(long)]
    pub log_level: Option<log::LevelFilter>,
    /// Log to the file of the config.
    #[arg(long)]
    pub log_to_file: bool,
}

impl CrawlArgs {
    /// The arguments override the loaded configs.
    pub fn apply(&self, configs: &mut Configs) {
        if let Some(ref history) = self.history {
            configs.crawl.history_path = Some(history.clone());
        }
        if self.depth.is_some() {
            configs.crawl.max_depth = self.depth;
        }
        if self.no_removals {
            configs.crawl.check_removals = false;
        }
        if self.no_cycle_detection {
            configs.crawl.cycle_detection = false;
        }
        if self.interrupt_on_error {
            configs.crawl.interrupt_on_error = true;
        }
        if self.verbose {
            configs.crawl.verbose = true;
        }
        if let Some(level) = self.log_level {
            configs.system.log_level = level;
        }
        if self.log_to_file {
            configs.system.log_to_file = true;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn crawl_flags_override_the_configs() {
        let args = LinyphiaArgs::try_parse_from([
            "linyphia",
            "crawl",
            "./data",
            "https://example.com/",
            "--history",
            "hist",
            "--depth",
            "3",
            "--no-removals",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let Command::Crawl(crawl) = args.command else {
            panic!("Expected the crawl command!")
        };
        assert_eq!(vec!["./data", "https://example.com/"], crawl.locators);

        let mut configs = Configs::default();
        crawl.apply(&mut configs);
        assert_eq!(Some(Utf8PathBuf::from("hist")), configs.crawl.history_path);
        assert_eq!(Some(3), configs.crawl.max_depth);
        assert!(!configs.crawl.check_removals);
        assert!(configs.crawl.cycle_detection);
        assert_eq!(log::LevelFilter::Debug, configs.system.log_level);
    }

    #[test]
    fn crawls_need_a_locator() {
        assert!(LinyphiaArgs::try_parse_from(["linyphia", "crawl"]).is_err());
    }
}
