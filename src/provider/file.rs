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

use crate::crawl::CrawlContext;
use crate::format;
use crate::metadata::{ContainerKind, Metadata};
use crate::provider::{modified_nanos, LazyStream, Locator, ProviderError, StreamProvider};
use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Provides local files and directories.
///
/// The exists id is the canonical path, the fingerprint the modification time.
#[derive(Debug, Default, Copy, Clone)]
pub struct FileProvider;

impl FileProvider {
    pub fn new() -> Self {
        Self
    }
}

async fn canonical(path: PathBuf) -> Result<Utf8PathBuf, ProviderError> {
    let canonical = tokio::fs::canonicalize(&path)
        .await
        .map_err(|err| ProviderError::io(&path, err))?;
    Utf8PathBuf::from_path_buf(canonical).map_err(ProviderError::NotUtf8)
}

#[async_trait]
impl StreamProvider for FileProvider {
    fn schemes(&self) -> &[&'static str] {
        &["file"]
    }

    async fn add_first_metadata(
        &self,
        locator: &Locator,
        mut metadata: Metadata,
        _context: &CrawlContext,
    ) -> Result<Metadata, ProviderError> {
        if metadata.has_first_metadata() {
            return Ok(metadata);
        }
        let path = canonical(locator.to_file_path()?).await?;
        let info = tokio::fs::metadata(&path)
            .await
            .map_err(|err| ProviderError::io(path.as_std_path(), err))?;
        let modified = info
            .modified()
            .map_err(|err| ProviderError::io(path.as_std_path(), err))?;

        metadata.source.get_or_insert_with(|| locator.to_string());
        metadata.resource_name = Some(path.file_name().unwrap_or(path.as_str()).to_string());
        metadata.fingerprint = Some(modified_nanos(modified).to_string());
        if info.is_dir() {
            metadata.content_type = Some(format::DIRECTORY.to_string());
            metadata.container = Some(ContainerKind::Listing);
        } else {
            if metadata.content_type.is_none() {
                metadata.content_type = format::guess_from_path(&path)
                    .map(|found| found.essence_str().to_string());
            }
            metadata.set_field("size", info.len().to_string());
        }
        metadata.exists_id = Some(path.into_string());
        Ok(metadata)
    }

    async fn get_stream(
        &self,
        locator: &Locator,
        metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<LazyStream, ProviderError> {
        if metadata.container.is_some() {
            return Ok(LazyStream::empty());
        }
        let path = match metadata.exists_id {
            Some(ref exists_id) => PathBuf::from(exists_id),
            None => locator.to_file_path()?,
        };
        Ok(LazyStream::new(move || tokio::fs::File::open(path)))
    }

    async fn children(
        &self,
        locator: &Locator,
        metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<Vec<Locator>, ProviderError> {
        let path = match metadata.exists_id {
            Some(ref exists_id) => PathBuf::from(exists_id),
            None => locator.to_file_path()?,
        };
        let mut entries = tokio::fs::read_dir(&path)
            .await
            .map_err(|err| ProviderError::io(&path, err))?;
        let mut children = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| ProviderError::io(&path, err))?
        {
            children.push(entry.path());
        }
        children.sort();
        children
            .into_iter()
            .map(Locator::from_path)
            .collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn files_are_identified_by_their_canonical_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "Hello").unwrap();
        let context = CrawlContext::new();

        let locator = Locator::from_path(dir.path().join(".").join("a.txt")).unwrap();
        let metadata = FileProvider
            .add_first_metadata(&locator, Metadata::for_locator(&locator), &context)
            .await
            .unwrap();
        let canonical = std::fs::canonicalize(&file).unwrap();
        assert_eq!(
            Some(canonical.to_str().unwrap()),
            metadata.exists_id.as_deref()
        );
        assert_eq!(Some("a.txt"), metadata.resource_name.as_deref());
        assert_eq!(Some("text/plain"), metadata.content_type.as_deref());
        assert!(metadata.fingerprint.is_some());
        assert!(!metadata.is_container());

        let mut stream = FileProvider
            .get_stream(&locator, &metadata, &context)
            .await
            .unwrap();
        assert!(!stream.is_opened());
        let mut content = String::new();
        stream.read_to_string(&mut content).await.unwrap();
        assert_eq!("Hello", content);
    }

    #[tokio::test]
    async fn directories_list_their_entries_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();
        let context = CrawlContext::new();

        let locator = Locator::from_path(dir.path()).unwrap();
        let metadata = FileProvider
            .add_first_metadata(&locator, Metadata::for_locator(&locator), &context)
            .await
            .unwrap();
        assert_eq!(Some(ContainerKind::Listing), metadata.container);

        let names: Vec<String> = FileProvider
            .children(&locator, &metadata, &context)
            .await
            .unwrap()
            .iter()
            .map(|child| child.last_segment().unwrap().to_string())
            .collect();
        assert_eq!(vec!["a.txt", "b.txt", "c"], names);
    }

    #[tokio::test]
    async fn complete_metadata_is_returned_as_is() {
        let context = CrawlContext::new();
        let locator = Locator::parse("file:///does/not/exist").unwrap();
        let mut metadata = Metadata::for_locator(&locator);
        metadata.resource_name = Some("exist".to_string());
        metadata.exists_id = Some("/does/not/exist".to_string());
        metadata.fingerprint = Some("1".to_string());
        let result = FileProvider
            .add_first_metadata(&locator, metadata.clone(), &context)
            .await
            .unwrap();
        assert_eq!(metadata, result);
    }

    #[tokio::test]
    async fn missing_files_fail() {
        let context = CrawlContext::new();
        let locator = Locator::parse("file:///does/not/exist").unwrap();
        let result = FileProvider
            .add_first_metadata(&locator, Metadata::for_locator(&locator), &context)
            .await;
        assert!(matches!(result, Err(ProviderError::Io { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_loops_are_processed_once() {
        use crate::crawl::Crawler;
        use crate::extraction::DefaultExtractor;
        use crate::history::TemporaryArea;
        use crate::metadata::ModificationState;
        use crate::provider::StreamProviderRegistry;
        use crate::test_impls::RecordingSink;
        use camino::Utf8PathBuf;
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(&data, data.join("loop")).unwrap();

        let sink = Arc::new(RecordingSink::new());
        let crawler = Crawler::builder()
            .registry(StreamProviderRegistry::new().with(Arc::new(FileProvider::new())))
            .extractor(Arc::new(DefaultExtractor::new()))
            .sink(sink.clone())
            .build()
            .unwrap();
        let temp = Utf8PathBuf::from_path_buf(dir.path().join("tmp")).unwrap();
        let mut context = CrawlContext::new().with_temp_area(TemporaryArea::new(temp));

        let root = Locator::from_path(&data).unwrap();
        let report = crawler.crawl(&root, &mut context).await.unwrap();
        assert_eq!(2, report.new);
        assert_eq!(1, report.processed);
        assert_eq!(0, report.errors);
        let canonical = std::fs::canonicalize(&data).unwrap();
        assert_eq!(
            vec![
                canonical.to_str().unwrap().to_string(),
                canonical.join("a.txt").to_str().unwrap().to_string(),
            ],
            sink.ids_with(ModificationState::New)
        );
    }
}
