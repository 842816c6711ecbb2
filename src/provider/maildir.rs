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
use camino::{Utf8Path, Utf8PathBuf};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use url::Url;

/// The part of a message read to find its headers.
const HEADER_PEEK_SIZE: u64 = 64 * 1024;
/// The directories holding the messages, in crawl order.
const MESSAGE_DIRS: [&'static str; 2] = ["new", "cur"];

/// Provides the folders and messages of maildirs.
///
/// `maildir:///path/Folder` addresses a folder, `maildir:///path/Folder#<unique>`
/// a message in its `new` or `cur` directory. The unique part is the file name
/// without the flags after `:`, so a message keeps its locator when it is read
/// or flagged.
#[derive(Debug, Default, Copy, Clone)]
pub struct MaildirProvider;

impl MaildirProvider {
    pub const SCHEME: &'static str = "maildir";

    pub fn new() -> Self {
        Self
    }

    /// The locator of the folder at `path`.
    pub fn folder_locator(path: impl AsRef<Path>) -> Result<Locator, ProviderError> {
        let path = path.as_ref();
        let file_url = Url::from_file_path(path).map_err(|_| ProviderError::InvalidLocator {
            locator: path.display().to_string(),
            reason: "not an absolute path".to_string(),
        })?;
        let url = Url::parse(&format!("{}://{}", Self::SCHEME, file_url.path())).map_err(|err| {
            ProviderError::InvalidLocator {
                locator: path.display().to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Locator::new(url))
    }

    /// The locator of the message `unique` in the folder at `path`.
    pub fn message_locator(path: impl AsRef<Path>, unique: &str) -> Result<Locator, ProviderError> {
        let mut url = Self::folder_locator(path)?.as_url().clone();
        url.set_fragment(Some(unique));
        Ok(Locator::new(url))
    }
}

fn unique_name(file_name: &str) -> &str {
    file_name.split_once(':').map_or(file_name, |(unique, _)| unique)
}

fn is_maildir(path: &Path) -> bool {
    path.join("cur").is_dir() && path.join("new").is_dir()
}

async fn folder_path(locator: &Locator) -> Result<Utf8PathBuf, ProviderError> {
    let path = locator.to_file_path()?;
    let canonical = tokio::fs::canonicalize(&path)
        .await
        .map_err(|err| ProviderError::io(&path, err))?;
    if !is_maildir(&canonical) {
        return Err(ProviderError::NoMaildir(canonical));
    }
    Utf8PathBuf::from_path_buf(canonical).map_err(ProviderError::NotUtf8)
}

/// Finds the file of the message `unique` in `new` or `cur`.
async fn find_message(folder: &Utf8Path, unique: &str) -> Result<PathBuf, ProviderError> {
    for dir in MESSAGE_DIRS {
        let dir = folder.join(dir);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|err| ProviderError::io(dir.as_std_path(), err))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| ProviderError::io(dir.as_std_path(), err))?
        {
            let name = entry.file_name();
            if name.to_str().map(unique_name) == Some(unique) {
                return Ok(entry.path());
            }
        }
    }
    Err(ProviderError::MessageNotFound {
        folder: folder.as_std_path().to_path_buf(),
        message: unique.to_string(),
    })
}

async fn modified(path: &Path) -> Result<u128, ProviderError> {
    let info = tokio::fs::metadata(path)
        .await
        .map_err(|err| ProviderError::io(path, err))?;
    let modified = info.modified().map_err(|err| ProviderError::io(path, err))?;
    Ok(modified_nanos(modified))
}

async fn read_headers(path: &Path) -> Result<Vec<(String, String)>, ProviderError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|err| ProviderError::io(path, err))?;
    let mut head = Vec::new();
    file.take(HEADER_PEEK_SIZE)
        .read_to_end(&mut head)
        .await
        .map_err(|err| ProviderError::io(path, err))?;
    Ok(format::split_message(&head).headers)
}

#[async_trait]
impl StreamProvider for MaildirProvider {
    fn schemes(&self) -> &[&'static str] {
        &[Self::SCHEME]
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
        let folder = folder_path(locator).await?;
        metadata.source.get_or_insert_with(|| locator.to_string());

        match locator.fragment() {
            None => {
                let mut latest = 0u128;
                for dir in MESSAGE_DIRS {
                    latest = latest.max(modified(folder.join(dir).as_std_path()).await?);
                }
                metadata.resource_name =
                    Some(folder.file_name().unwrap_or(folder.as_str()).to_string());
                metadata.fingerprint = Some(latest.to_string());
                metadata.content_type = Some(format::MAILDIR_FOLDER.to_string());
                metadata.container = Some(ContainerKind::Listing);
                metadata.exists_id = Some(folder.into_string());
            }
            Some(unique) => {
                let message = find_message(&folder, unique).await?;
                let headers = read_headers(&message).await?;
                let header = |name: &str| {
                    headers
                        .iter()
                        .find(|(key, _)| key.eq_ignore_ascii_case(name))
                        .map(|(_, value)| value.clone())
                };
                let message_id = header("Message-ID").filter(|value| !value.is_empty());
                if let Some(subject) = header("Subject") {
                    metadata.set_field("subject", subject);
                }
                if let Some(ref message_id) = message_id {
                    metadata.set_field("message_id", message_id.clone());
                }
                metadata.resource_name = Some(unique.to_string());
                metadata.fingerprint = Some(modified(&message).await?.to_string());
                metadata.content_type = Some(format::MESSAGE_RFC822.to_string());
                metadata.exists_id = Some(format!(
                    "{folder}#{}",
                    message_id.as_deref().unwrap_or(unique)
                ));
            }
        }
        Ok(metadata)
    }

    async fn get_stream(
        &self,
        locator: &Locator,
        _metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<LazyStream, ProviderError> {
        let Some(unique) = locator.fragment() else {
            return Ok(LazyStream::empty());
        };
        let locator = locator.clone();
        let unique = unique.to_string();
        Ok(LazyStream::new(move || async move {
            let folder = folder_path(&locator)
                .await
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            let message = find_message(&folder, &unique)
                .await
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            tokio::fs::File::open(message).await
        }))
    }

    async fn children(
        &self,
        locator: &Locator,
        _metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<Vec<Locator>, ProviderError> {
        if locator.fragment().is_some() {
            return Ok(Vec::new());
        }
        let folder = folder_path(locator).await?;

        let mut sub_folders = Vec::new();
        let mut entries = tokio::fs::read_dir(&folder)
            .await
            .map_err(|err| ProviderError::io(folder.as_std_path(), err))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| ProviderError::io(folder.as_std_path(), err))?
        {
            let path = entry.path();
            let name = entry.file_name();
            if matches!(name.to_str(), Some("cur" | "new" | "tmp")) {
                continue;
            }
            if path.is_dir() && is_maildir(&path) {
                sub_folders.push(path);
            }
        }
        sub_folders.sort();

        let mut children = sub_folders
            .into_iter()
            .map(MaildirProvider::folder_locator)
            .collect::<Result<Vec<_>, _>>()?;

        for dir in MESSAGE_DIRS {
            let dir = folder.join(dir);
            let mut names = Vec::new();
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|err| ProviderError::io(dir.as_std_path(), err))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| ProviderError::io(dir.as_std_path(), err))?
            {
                match entry.file_name().into_string() {
                    Ok(name) if !name.starts_with('.') => names.push(name),
                    Ok(_) => {}
                    Err(name) => log::warn!("Skip the message {name:?} in {dir}, not utf-8."),
                }
            }
            names.sort();
            for name in names {
                children.push(MaildirProvider::message_locator(
                    folder.as_std_path(),
                    unique_name(&name),
                )?);
            }
        }
        Ok(children)
    }
}
