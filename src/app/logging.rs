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

use crate::config::SystemConfig;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

const PATTERN: &'static str = "{l} - {d} - {t} - {m}{n}";

/// The logging config, stdout is kept free for the json lines.
fn logging_config(system: &SystemConfig) -> anyhow::Result<Config> {
    let config = Config::builder();

    let config = if system.log_to_file {
        let file_logger = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(&system.log_file)?;
        config.appender(Appender::builder().build("out", Box::new(file_logger)))
    } else {
        let console_logger = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();
        config.appender(Appender::builder().build("out", Box::new(console_logger)))
    };

    Ok(config
        .logger(Logger::builder().build("linyphia", system.log_level))
        .build(Root::builder().appender("out").build(LevelFilter::Warn))?)
}

/// Configure the logging
pub fn configure_logging(system: &SystemConfig) -> anyhow::Result<()> {
    log4rs::init_config(logging_config(system)?)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn file_logging_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let system = SystemConfig {
            log_level: LevelFilter::Debug,
            log_to_file: true,
            log_file: Utf8PathBuf::from_path_buf(dir.path().join("out.log")).unwrap(),
        };
        let config = logging_config(&system).unwrap();
        assert_eq!(LevelFilter::Warn, config.root().level());
        assert!(system.log_file.exists());
    }
}
