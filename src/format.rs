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

//! Knowledge about the formats of crawled data.

use mime::Mime;
use std::path::Path;

/// The content type of a directory.
pub const DIRECTORY: &'static str = "inode/directory";
/// The content type of a maildir folder.
pub const MAILDIR_FOLDER: &'static str = "application/x-maildir-folder";
/// The content type of a single mail.
pub const MESSAGE_RFC822: &'static str = "message/rfc822";

/// Guesses the content type of a path by its extension.
pub fn guess_from_path(path: impl AsRef<Path>) -> Option<Mime> {
    let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
    let found = match extension.as_str() {
        "html" | "htm" | "xhtml" => mime::TEXT_HTML_UTF_8,
        "txt" | "text" | "log" | "md" | "rst" | "ini" | "cfg" | "conf" | "toml" | "yaml"
        | "yml" | "rs" | "py" | "java" | "c" | "h" | "cpp" | "sh" => mime::TEXT_PLAIN_UTF_8,
        "csv" => mime::TEXT_CSV_UTF_8,
        "css" => mime::TEXT_CSS_UTF_8,
        "xml" => mime::TEXT_XML,
        "js" | "mjs" => mime::APPLICATION_JAVASCRIPT_UTF_8,
        "json" => mime::APPLICATION_JSON,
        "pdf" => mime::APPLICATION_PDF,
        "eml" => MESSAGE_RFC822.parse().ok()?,
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "bmp" => mime::IMAGE_BMP,
        _ => return None,
    };
    Some(found)
}

/// Returns the essence of a content type header value, e.g. `text/html` for
/// `text/html; charset=utf-8`.
pub fn essence_of(content_type: &str) -> Option<String> {
    content_type
        .parse::<Mime>()
        .ok()
        .map(|value| value.essence_str().to_string())
}

pub fn is_html(content_type: &str) -> bool {
    matches!(content_type, "text/html" | "application/xhtml+xml")
}

/// True for everything that can be read as text.
pub fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || matches!(
            content_type,
            "application/json"
                | "application/javascript"
                | "application/xml"
                | "application/x-sh"
                | MESSAGE_RFC822
        )
        || content_type.ends_with("+xml")
        || content_type.ends_with("+json")
}

/// Sniffs html by looking at the first non whitespace bytes.
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|value| !value.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let head = &bytes[start..bytes.len().min(start + 15)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// The headers and the body of a message in the internet message format.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct MessageParts<'a> {
    pub headers: Vec<(String, String)>,
    pub body: &'a [u8],
}

impl<'a> MessageParts<'a> {
    /// The value of the first header named `name`, case insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Splits a message into its unfolded headers and its body.
pub fn split_message(bytes: &[u8]) -> MessageParts<'_> {
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let end = bytes[offset..]
            .iter()
            .position(|&value| value == b'\n')
            .map(|pos| offset + pos + 1)
            .unwrap_or(bytes.len());
        let line = String::from_utf8_lossy(&bytes[offset..end]);
        let line = line.trim_end_matches(['\r', '\n']);
        offset = end;
        if line.is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    MessageParts {
        headers,
        body: &bytes[offset.min(bytes.len())..],
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn guesses_common_extensions() {
        assert_eq!(
            Some("text/html"),
            guess_from_path("/a/index.HTML")
                .as_ref()
                .map(Mime::essence_str)
        );
        assert_eq!(
            Some("text/plain"),
            guess_from_path("notes.txt").as_ref().map(Mime::essence_str)
        );
        assert_eq!(None, guess_from_path("archive.unknown"));
        assert_eq!(None, guess_from_path("README"));
    }

    #[test]
    fn essence_drops_parameters() {
        assert_eq!(
            Some("text/html".to_string()),
            essence_of("text/html; charset=utf-8")
        );
        assert_eq!(None, essence_of("not a mime"));
    }

    #[test]
    fn sniffs_html() {
        assert!(looks_like_html(b"  \n<!DOCTYPE html><html></html>"));
        assert!(looks_like_html(b"<html lang=\"en\">"));
        assert!(!looks_like_html(b"Hello <html>"));
    }

    #[test]
    fn messages_are_split_and_unfolded() {
        let raw = b"Subject: Hello\r\n World\r\nMessage-ID: <1@example.com>\r\n\r\nBody\r\n";
        let parts = split_message(raw);
        assert_eq!(Some("Hello World"), parts.header("subject"));
        assert_eq!(Some("<1@example.com>"), parts.header("Message-Id"));
        assert_eq!(b"Body\r\n", parts.body);
    }
}
