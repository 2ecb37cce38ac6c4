use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::Semaphore;
use tracing::{debug, info};
use url::Url;

use super::{Resolved, TrackResolver};
use crate::{
    audio::track::{ResolvedTrack, SourceRef},
    config::PlaybackMode,
    error::ResolveError,
};

/// Resolver basado en el ejecutable `yt-dlp`.
///
/// En modo stream se usa la URL directa de audio que entrega yt-dlp; en
/// modo download el audio se extrae a mp3 dentro de `download_dir` y se
/// reproduce desde el disco.
pub struct YtDlpResolver {
    executable: String,
    mode: PlaybackMode,
    download_dir: PathBuf,
    // Limitar procesos concurrentes de yt-dlp
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp (`--dump-single-json`)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    entries: Option<Vec<YtDlpInfo>>,
    #[serde(default)]
    requested_downloads: Vec<RequestedDownload>,
}

#[derive(Debug, Deserialize)]
struct RequestedDownload {
    filepath: Option<String>,
}

impl YtDlpResolver {
    pub fn new(
        executable: impl Into<String>,
        mode: PlaybackMode,
        download_dir: PathBuf,
        max_concurrent: usize,
    ) -> Self {
        Self {
            executable: executable.into(),
            mode,
            download_dir,
            rate_limiter: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Las URLs http(s) se pasan tal cual; todo lo demás es una búsqueda
    pub fn search_target(locator: &str) -> String {
        match Url::parse(locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => locator.to_string(),
            _ => format!("ytsearch1:{}", locator),
        }
    }

    fn args(&self, target: &str) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--no-warnings",
            "--playlist-items",
            "1",
            "-f",
            "bestaudio/best",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if self.mode == PlaybackMode::Download {
            // Un archivo por id: una pista repetida reutiliza la descarga
            let template = self.download_dir.join("%(id)s.%(ext)s");
            args.extend(
                [
                    "--no-simulate",
                    "-x",
                    "--audio-format",
                    "mp3",
                    "--audio-quality",
                    "192K",
                    "-o",
                ]
                .iter()
                .map(|s| s.to_string()),
            );
            args.push(template.to_string_lossy().into_owned());
        }

        args.push(target.to_string());
        args
    }

    /// Convierte la salida JSON de yt-dlp en pistas
    fn parse_output(stdout: &str, mode: PlaybackMode) -> Result<Resolved, ResolveError> {
        let mut info: YtDlpInfo = serde_json::from_str(stdout.trim())?;

        match info.entries.take() {
            Some(entries) => {
                let tracks = entries
                    .into_iter()
                    .map(|entry| Self::entry_to_track(entry, mode))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Resolved::Collection(tracks))
            }
            None => Ok(Resolved::Single(Self::entry_to_track(info, mode)?)),
        }
    }

    fn entry_to_track(info: YtDlpInfo, mode: PlaybackMode) -> Result<ResolvedTrack, ResolveError> {
        let title = info
            .title
            .or(info.webpage_url)
            .unwrap_or_else(|| "Sin título".to_string());

        let source = match mode {
            PlaybackMode::Stream => {
                SourceRef::Streamed(info.url.ok_or(ResolveError::MissingField("url"))?)
            }
            PlaybackMode::Download => {
                let path = info
                    .requested_downloads
                    .into_iter()
                    .find_map(|download| download.filepath)
                    .ok_or(ResolveError::MissingField("filepath"))?;
                SourceRef::Downloaded(PathBuf::from(path))
            }
        };

        Ok(ResolvedTrack::new(title, source))
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, locator: &str) -> Result<Resolved, ResolveError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| ResolveError::Failed(e.to_string()))?;

        let target = Self::search_target(locator);
        info!("🔍 yt-dlp ({}): {}", self.mode.as_str(), target);

        let output = Command::new(&self.executable)
            .args(self.args(&target))
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Failed(error.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let resolved = Self::parse_output(&stdout, self.mode)?;
        debug!("yt-dlp resolvió `{}`", locator);
        Ok(resolved)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn urls_pass_through_and_terms_become_searches() {
        assert_eq!(
            YtDlpResolver::search_target("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            YtDlpResolver::search_target("never gonna give you up"),
            "ytsearch1:never gonna give you up"
        );
        assert_eq!(YtDlpResolver::search_target("ftp://host/a.mp3"), "ytsearch1:ftp://host/a.mp3");
    }

    #[test]
    fn single_video_in_stream_mode() {
        let json = r#"{"title": "Song", "url": "https://rr1.googlevideo.com/a", "webpage_url": "https://youtu.be/a"}"#;

        let resolved = YtDlpResolver::parse_output(json, PlaybackMode::Stream).unwrap();

        assert_eq!(
            resolved,
            Resolved::Single(ResolvedTrack::new(
                "Song",
                SourceRef::Streamed("https://rr1.googlevideo.com/a".into())
            ))
        );
    }

    #[test]
    fn playlist_becomes_collection() {
        let json = r#"{"title": "Mix", "entries": [
            {"title": "One", "url": "https://cdn/1"},
            {"title": "Two", "url": "https://cdn/2"}
        ]}"#;

        match YtDlpResolver::parse_output(json, PlaybackMode::Stream).unwrap() {
            Resolved::Collection(tracks) => {
                let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
                assert_eq!(titles, vec!["One", "Two"]);
            }
            other => panic!("se esperaba colección: {other:?}"),
        }
    }

    #[test]
    fn download_mode_uses_final_filepath() {
        let json = r#"{"title": "Song", "requested_downloads": [{"filepath": "/app/cache/abc.mp3"}]}"#;

        let resolved = YtDlpResolver::parse_output(json, PlaybackMode::Download).unwrap();

        assert_eq!(
            resolved,
            Resolved::Single(ResolvedTrack::new(
                "Song",
                SourceRef::Downloaded("/app/cache/abc.mp3".into())
            ))
        );
    }

    #[test]
    fn missing_stream_url_is_an_error() {
        let json = r#"{"title": "Song"}"#;

        let err = YtDlpResolver::parse_output(json, PlaybackMode::Stream).unwrap_err();

        assert!(matches!(err, ResolveError::MissingField("url")));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = YtDlpResolver::parse_output("ERROR: not json", PlaybackMode::Stream).unwrap_err();

        assert!(matches!(err, ResolveError::Parse(_)));
    }

    #[test]
    fn download_args_include_output_template() {
        let resolver = YtDlpResolver::new("yt-dlp", PlaybackMode::Download, "/tmp/dl".into(), 2);

        let args = resolver.args("https://youtu.be/a");

        assert!(args.contains(&"--no-simulate".to_string()));
        assert!(args.contains(&"/tmp/dl/%(id)s.%(ext)s".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/a"));
    }
}
