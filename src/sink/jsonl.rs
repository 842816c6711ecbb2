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

use crate::crawl::EntityError;
use crate::extraction::ExtractedContent;
use crate::metadata::{Metadata, ModificationState};
use crate::sink::{DataSink, SinkError};
use async_trait::async_trait;
use camino::Utf8Path;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

#[derive(Debug, Serialize)]
struct Line<'a> {
    state: ModificationState,
    metadata: &'a Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a ExtractedContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Writes one json object per entity and line.
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl JsonLinesSink {
    pub fn new<W: AsyncWrite + Send + Unpin + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// Appends to the file at `path`.
    pub async fn append_to(path: impl AsRef<Utf8Path>) -> Result<Self, SinkError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .await?;
        Ok(Self::new(file))
    }

    async fn write(&self, line: Line<'_>) -> Result<(), SinkError> {
        let mut serialized = serde_json::to_vec(&line)?;
        serialized.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&serialized).await?;
        writer.flush().await?;
        Ok(())
    }

    fn state_of(metadata: &Metadata, fallback: ModificationState) -> ModificationState {
        metadata.modification_state.unwrap_or(fallback)
    }
}

#[async_trait]
impl DataSink for JsonLinesSink {
    async fn on_new(
        &self,
        metadata: &Metadata,
        content: &ExtractedContent,
    ) -> Result<(), SinkError> {
        self.write(Line {
            state: Self::state_of(metadata, ModificationState::New),
            metadata,
            content: Some(content),
            error: None,
        })
        .await
    }

    async fn on_modified(
        &self,
        metadata: &Metadata,
        content: &ExtractedContent,
    ) -> Result<(), SinkError> {
        self.write(Line {
            state: Self::state_of(metadata, ModificationState::Modified),
            metadata,
            content: Some(content),
            error: None,
        })
        .await
    }

    async fn on_removed(&self, metadata: &Metadata) -> Result<(), SinkError> {
        self.write(Line {
            state: ModificationState::Removed,
            metadata,
            content: None,
            error: None,
        })
        .await
    }

    async fn on_error(&self, metadata: &Metadata, error: &EntityError) -> Result<(), SinkError> {
        self.write(Line {
            state: ModificationState::Error,
            metadata,
            content: None,
            error: Some(error.to_string()),
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::extraction::ExtractionError;
    use camino::Utf8PathBuf;

    #[tokio::test]
    async fn one_line_per_entity() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.jsonl")).unwrap();

        let sink = JsonLinesSink::append_to(&path).await.unwrap();
        let mut metadata = Metadata::for_exists_id("/a.txt");
        metadata.modification_state = Some(ModificationState::New);
        sink.on_new(&metadata, &ExtractedContent::from_text("Hello"))
            .await
            .unwrap();
        sink.on_removed(&Metadata::for_exists_id("/b.txt"))
            .await
            .unwrap();
        sink.on_error(
            &Metadata::for_exists_id("/c.txt"),
            &EntityError::Extraction(ExtractionError::Unsupported("c".to_string())),
        )
        .await
        .unwrap();
        drop(sink);

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(3, lines.len());
        assert_eq!("NEW", lines[0]["state"]);
        assert_eq!("Hello", lines[0]["content"]["text"]);
        assert_eq!("/a.txt", lines[0]["metadata"]["exists_id"]);
        assert_eq!("REMOVED", lines[1]["state"]);
        assert!(lines[1].get("content").is_none());
        assert_eq!("ERROR", lines[2]["state"]);
        assert!(lines[2]["error"].as_str().is_some());
    }
}
