//! Media downloads
//!
//! Images and videos are streamed to a `.part` file and renamed into place, so
//! a file that exists under its final name is always complete and is never
//! downloaded again.

use crate::config::MediaPolicy;
use crate::item::{ItemKind, ItemRecord};
use crate::sink::{SinkError, SinkResult};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// One file to fetch for a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub url: String,
    pub file_name: String,
}

/// Lists the files a note needs under the given policy
///
/// Albums get `image_{i}.jpg`; videos get `cover.jpg` and `video.mp4`.
/// `Images` covers album images and video covers, `Videos` only the video
/// stream.
pub fn media_plan(record: &ItemRecord, policy: MediaPolicy) -> Vec<MediaFile> {
    let images = matches!(policy, MediaPolicy::All | MediaPolicy::Images);
    let videos = matches!(policy, MediaPolicy::All | MediaPolicy::Videos);
    let mut plan = Vec::new();

    match record.kind {
        ItemKind::Album if images => {
            for (i, url) in record.image_urls.iter().enumerate() {
                plan.push(MediaFile {
                    url: url.clone(),
                    file_name: format!("image_{}.jpg", i),
                });
            }
        }
        ItemKind::Video => {
            if let (true, Some(cover)) = (images, &record.video_cover) {
                plan.push(MediaFile {
                    url: cover.clone(),
                    file_name: "cover.jpg".to_string(),
                });
            }
            if let (true, Some(video)) = (videos, &record.video_url) {
                plan.push(MediaFile {
                    url: video.clone(),
                    file_name: "video.mp4".to_string(),
                });
            }
        }
        _ => {}
    }

    plan
}

/// Downloads media files with a small fixed retry budget
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    client: Client,
    attempts: u32,
    pause: Duration,
}

impl MediaDownloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            attempts: 3,
            pause: Duration::from_secs(1),
        }
    }

    /// Downloads `url` to `dest`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The file was downloaded
    /// * `Ok(false)` - The file already existed
    /// * `Err(SinkError)` - Every attempt failed
    pub async fn download(&self, url: &str, dest: &Path) -> SinkResult<bool> {
        if dest.exists() {
            debug!("Skipping existing {}", dest.display());
            return Ok(false);
        }

        let mut attempt = 1;
        loop {
            match self.try_download(url, dest).await {
                Ok(()) => return Ok(true),
                Err(e) if attempt < self.attempts => {
                    warn!(
                        "Download of {} failed (attempt {}/{}): {}",
                        url, attempt, self.attempts, e
                    );
                    tokio::time::sleep(self.pause).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_download(&self, url: &str, dest: &Path) -> SinkResult<()> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        let partial = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, dest)
            .await
            .map_err(SinkError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::record;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_album_plan() {
        let mut rec = record("n1", None);
        rec.image_urls = vec!["u0".to_string(), "u1".to_string()];

        let plan = media_plan(&rec, MediaPolicy::All);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].file_name, "image_1.jpg");
        assert!(media_plan(&rec, MediaPolicy::Videos).is_empty());
        assert!(media_plan(&rec, MediaPolicy::None).is_empty());
    }

    #[test]
    fn test_video_plan() {
        let mut rec = record("v1", None);
        rec.kind = ItemKind::Video;
        rec.video_cover = Some("cover-url".to_string());
        rec.video_url = Some("video-url".to_string());

        let names = |policy| {
            media_plan(&rec, policy)
                .into_iter()
                .map(|m| m.file_name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(MediaPolicy::All), vec!["cover.jpg", "video.mp4"]);
        assert_eq!(names(MediaPolicy::Images), vec!["cover.jpg"]);
        assert_eq!(names(MediaPolicy::Videos), vec!["video.mp4"]);
    }

    #[tokio::test]
    async fn test_download_writes_file_and_skips_existing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("image_0.jpg");
        let downloader = MediaDownloader::new(Client::new());
        let url = format!("{}/img.jpg", server.uri());

        assert!(downloader.download(&url, &dest).await.unwrap());
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg-bytes");
        assert!(!dest.with_extension("part").exists());

        assert!(!downloader.download(&url, &dest).await.unwrap());
    }

    #[tokio::test]
    async fn test_download_gives_up_after_three_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("video.mp4");
        let downloader = MediaDownloader::new(Client::new());

        let result = downloader
            .download(&format!("{}/v.mp4", server.uri()), &dest)
            .await;
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
