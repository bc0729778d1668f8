//! Resource loading from the local filesystem.
//!
//! The synchronous readers return [`HarnessError`] on failure. The `async`
//! loaders follow the success-flag contract of a browser fetch instead: a
//! transport failure is logged and yields `None`, never an error.
//!
//! File lists are text files whose non-comment lines name either a test file
//! or another list. Entries resolve relative to the list's directory.

use std::{collections::HashMap, future::Future, path::Path, time::Duration};

use smol::{future, Timer};

use crate::{error::HarnessError, report::Reporter, session::Session, types::LoadedImage};

/// Bound used by [`await_or_timeout`] when the caller gives none.
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Read a text file, stripping carriage returns.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if the file cannot be read.
pub fn read_file(path: impl AsRef<Path>) -> Result<String, HarnessError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map(|text| text.replace('\r', ""))
        .map_err(|source| HarnessError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// One meaningful line of a file list.
#[derive(Debug, PartialEq, Eq)]
enum ListEntry {
    /// A single name; a nested list if it ends in `.txt`.
    Single(String),
    /// Several space-separated names, each prefixed, kept as one entry.
    Multi(String),
}

fn list_entries(url: &str, text: &str) -> Vec<ListEntry> {
    let prefix = url.rfind('/').map_or("", |slash| &url[..=slash]);
    text.split('\n')
        .map(str::trim)
        .filter(|line| {
            line.len() > 4 && !line.starts_with('#') && !line.starts_with(';') && !line.starts_with("//")
        })
        .map(|line| {
            let names: Vec<&str> = line.split(' ').filter(|n| !n.is_empty()).collect();
            if names.len() == 1 {
                ListEntry::Single(format!("{prefix}{line}"))
            } else {
                let joined = names
                    .iter()
                    .map(|name| format!("{prefix}{name}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                ListEntry::Multi(joined)
            }
        })
        .collect()
}

fn is_list(url: &str) -> bool {
    url.ends_with(".txt")
}

/// Expand a file list into the files it names, recursively.
///
/// A `url` that is not a `.txt` list is returned as the only entry.
///
/// # Errors
///
/// Returns [`HarnessError::Io`] if any list in the tree cannot be read.
pub fn read_file_list(url: &str) -> Result<Vec<String>, HarnessError> {
    if !is_list(url) {
        return Ok(vec![url.to_owned()]);
    }
    let mut files = Vec::new();
    for entry in list_entries(url, &read_file(url)?) {
        match entry {
            ListEntry::Single(nested) => files.extend(read_file_list(&nested)?),
            ListEntry::Multi(line) => files.push(line),
        }
    }
    Ok(files)
}

/// Read a text file without blocking the executor.
///
/// Carriage returns are kept, as a plain fetch would.
pub async fn load_text_file_async(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();
    log::debug!("loading: {}", path.display());
    match smol::fs::read_to_string(path).await {
        Ok(text) => {
            log::debug!("completed load request: {}", path.display());
            Some(text)
        }
        Err(err) => {
            log::debug!("loading {} resulted in unexpected status: {err}", path.display());
            None
        }
    }
}

/// Asynchronous [`read_file_list`]. Any unreadable list fails the whole
/// expansion.
pub async fn get_file_list_async(url: &str) -> Option<Vec<String>> {
    if !is_list(url) {
        return Some(vec![url.to_owned()]);
    }
    let text = load_text_file_async(url).await?;
    let mut files = Vec::new();
    for entry in list_entries(url, &text.replace('\r', "")) {
        match entry {
            ListEntry::Single(nested) => {
                let nested_files = Box::pin(get_file_list_async(&nested)).await?;
                log::debug!("got files: {}", nested_files.len());
                files.extend(nested_files);
            }
            ListEntry::Multi(line) => files.push(line),
        }
    }
    Some(files)
}

/// Read and decode an image.
pub async fn load_image_async(path: impl AsRef<Path>) -> Option<LoadedImage> {
    let path = path.as_ref();
    let data = match smol::fs::read(path).await {
        Ok(data) => data,
        Err(err) => {
            log::debug!("error occurred loading {}: {err}", path.display());
            return None;
        }
    };
    match LoadedImage::from_memory(&data) {
        Ok(image) => Some(image),
        Err(err) => {
            log::debug!("failed to decode {}: {err}", path.display());
            None
        }
    }
}

/// Load several images, keyed by the path they were requested under.
///
/// Images that fail to load are left out of the map.
pub async fn load_images_async(urls: &[&str]) -> HashMap<String, LoadedImage> {
    let mut images = HashMap::new();
    for &url in urls {
        if let Some(image) = load_image_async(url).await {
            log::debug!("loadImagesAsync: loaded {url}");
            images.insert(url.to_owned(), image);
        }
    }
    log::debug!("loadImagesAsync: all images loaded");
    images
}

/// Sleep for `ms` milliseconds.
pub async fn await_timeout(ms: u64) {
    Timer::after(Duration::from_millis(ms)).await;
}

/// Run `fut`, giving up after `timeout` ([`DEFAULT_AWAIT_TIMEOUT`] if
/// `None`).
///
/// # Errors
///
/// Returns [`HarnessError::Timeout`] if the timer fires first.
pub async fn await_or_timeout<T>(
    fut: impl Future<Output = T>,
    timeout: Option<Duration>,
) -> Result<T, HarnessError> {
    let timeout = timeout.unwrap_or(DEFAULT_AWAIT_TIMEOUT);
    future::or(async { Ok(fut.await) }, async {
        Timer::after(timeout).await;
        Err(HarnessError::Timeout)
    })
    .await
}

impl<R: Reporter> Session<R> {
    /// [`await_or_timeout`] bounded by the configured `await_timeout_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Timeout`] if the timer fires first.
    pub async fn await_or_timeout<T>(&self, fut: impl Future<Output = T>) -> Result<T, HarnessError> {
        let timeout = Duration::from_millis(self.config().await_timeout_ms);
        await_or_timeout(fut, Some(timeout)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, text: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path.to_str().unwrap().to_owned()
    }

    #[test]
    fn read_file_strips_carriage_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.vert", "line1\r\nline2\r\n");
        assert_eq!(read_file(&path).unwrap(), "line1\nline2\n");
        assert!(matches!(
            read_file(dir.path().join("missing")),
            Err(HarnessError::Io { .. })
        ));
    }

    #[test]
    fn list_entries_skip_comments_and_short_lines() {
        let text = "# comment\n; also\n// too\nabc\n  a.html  \nb.html  c.html\n";
        assert_eq!(
            list_entries("dir/00_list.txt", text),
            [
                ListEntry::Single("dir/a.html".into()),
                ListEntry::Multi("dir/b.html dir/c.html".into()),
            ]
        );
        assert_eq!(
            list_entries("00_list.txt", "x.html"),
            [ListEntry::Single("x.html".into())]
        );
    }

    #[test]
    fn file_lists_expand_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let top = write(dir.path(), "00_test_list.txt", "one.html\nsub/00_list.txt\r\n# skip.html\n");
        write(&dir.path().join("sub"), "00_list.txt", "two.html\nthree.html  four.html\n");

        let prefix = format!("{}/", dir.path().to_str().unwrap());
        let expected = [
            format!("{prefix}one.html"),
            format!("{prefix}sub/two.html"),
            format!("{prefix}sub/three.html {prefix}sub/four.html"),
        ];
        assert_eq!(read_file_list(&top).unwrap(), expected);
        assert_eq!(smol::block_on(get_file_list_async(&top)).unwrap(), expected);
        assert_eq!(read_file_list("single.html").unwrap(), ["single.html"]);
    }

    #[test_log::test]
    fn missing_nested_list_fails_async_expansion() {
        let dir = tempfile::tempdir().unwrap();
        let top = write(dir.path(), "00_list.txt", "missing/00_list.txt\n");
        assert!(smol::block_on(get_file_list_async(&top)).is_none());
        assert!(read_file_list(&top).is_err());
    }

    #[test_log::test]
    fn text_and_images_load_async() {
        let dir = tempfile::tempdir().unwrap();
        let text = write(dir.path(), "shader.frag", "void main() {}\r\n");
        assert_eq!(
            smol::block_on(load_text_file_async(&text)).as_deref(),
            Some("void main() {}\r\n")
        );

        let png = dir.path().join("red.png");
        image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 255, 0, 0, 255])
            .unwrap()
            .save(&png)
            .unwrap();
        let png = png.to_str().unwrap().to_owned();
        let images = smol::block_on(load_images_async(&[png.as_str(), text.as_str()]));
        assert_eq!(images.len(), 1);
        assert_eq!(images[&png].width, 2);
    }

    #[test]
    fn timeout_wins_over_pending_future() {
        let result = smol::block_on(await_or_timeout(
            future::pending::<()>(),
            Some(Duration::from_millis(10)),
        ));
        assert!(matches!(result, Err(HarnessError::Timeout)));

        let value = smol::block_on(await_or_timeout(async { 7 }, None)).unwrap();
        assert_eq!(value, 7);
        smol::block_on(await_timeout(1));
    }

    #[test]
    fn session_timeout_comes_from_config() {
        let config = crate::HarnessConfig::from_json(r#"{"awaitTimeoutMs": 10}"#).unwrap();
        let session = Session::with_config(crate::RecordingReporter::new(), config);
        let started = std::time::Instant::now();
        let result = smol::block_on(session.await_or_timeout(future::pending::<()>()));
        assert!(matches!(result, Err(HarnessError::Timeout)));
        assert!(started.elapsed() < DEFAULT_AWAIT_TIMEOUT);
        assert_eq!(smol::block_on(session.await_or_timeout(async { "done" })).unwrap(), "done");
    }
}
