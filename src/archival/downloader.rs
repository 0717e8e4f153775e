//! External downloader (yt-dlp compatible) argument assembly and
//! invocation, bound to a cancellation token.

use crate::error::ArchivalError;
use std::path::Path;
use std::process::Stdio;
use tokio_util::sync::CancellationToken;

const VALID_QUALITIES: &[&str] = &["1080", "720", "640", "480", "360", "240", "144"];

/// Build the argv (excluding the binary name) for a download of
/// `(tmp_file_path, url, quality, ext, is_live)`.
pub fn build_args(
    tmp_file_path: &str,
    url: &str,
    quality: &str,
    ext: &str,
    is_live: bool,
) -> Result<Vec<String>, ArchivalError> {
    let (video_ext, audio_ext) = match ext {
        "mp4" => ("mp4", "m4a"),
        "webm" | "mkv" => ("webm", "webm"),
        other => return Err(ArchivalError::InvalidExtension(other.to_owned())),
    };

    if !VALID_QUALITIES.contains(&quality) {
        return Err(ArchivalError::InvalidQuality(quality.to_owned()));
    }

    let mut args = vec!["-f".to_owned()];
    if is_live {
        args.push(format!("[height={quality}]"));
    } else {
        args.push(format!("bestvideo[ext={video_ext}][height={quality}]+bestaudio[ext={audio_ext}]"));
        args.push("--merge-output-format".to_owned());
        args.push(ext.to_owned());
    }
    args.push("-o".to_owned());
    args.push(tmp_file_path.to_owned());
    args.push(url.to_owned());

    Ok(args)
}

/// Run the downloader binary, bound to `cancel`. Returns once the child
/// exits, or immediately after killing it if cancellation fires first.
pub async fn run(
    binary: &str,
    args: &[String],
    cancel: &CancellationToken,
) -> Result<(), ArchivalError> {
    let mut child = tokio::process::Command::new(binary)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ArchivalError::DownloaderSpawn)?;

    let stderr = child.stderr.take();

    let status = tokio::select! {
        status = child.wait() => status.map_err(ArchivalError::DownloaderSpawn)?,
        _ = cancel.cancelled() => {
            let _ = child.kill().await;
            return Err(ArchivalError::Cancelled);
        }
    };

    if status.success() {
        return Ok(());
    }

    let stderr_text = match stderr {
        Some(mut pipe) => {
            use tokio::io::AsyncReadExt;
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf).await;
            buf
        }
        None => String::new(),
    };

    Err(ArchivalError::DownloaderFailed {
        status: status.code().unwrap_or(-1),
        stderr: stderr_text,
    })
}

/// Replace path separators so a video name can be used as a single path
/// component inside the scratch directory.
pub fn sanitize_component(name: &str) -> String {
    name.replace('/', "-")
}

pub fn scratch_file_path(scratch_dir: &Path, video_name: &str) -> std::path::PathBuf {
    scratch_dir.join(sanitize_component(video_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_vod_args() {
        let args = build_args(
            "./",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "1080",
            "mp4",
            false,
        )
        .unwrap();
        assert_eq!(
            args,
            vec![
                "-f",
                "bestvideo[ext=mp4][height=1080]+bestaudio[ext=m4a]",
                "--merge-output-format",
                "mp4",
                "-o",
                "./",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn builds_live_args_without_merge_flag() {
        let args = build_args("./out", "https://example.com/v", "720", "webm", true).unwrap();
        assert_eq!(args, vec!["-f", "[height=720]", "-o", "./out", "https://example.com/v"]);
    }

    #[test]
    fn rejects_invalid_quality() {
        assert!(matches!(
            build_args("./", "u", "999", "mp4", false),
            Err(ArchivalError::InvalidQuality(_))
        ));
    }

    #[test]
    fn rejects_invalid_extension() {
        assert!(matches!(
            build_args("./", "u", "720", "avi", false),
            Err(ArchivalError::InvalidExtension(_))
        ));
    }
}
