//! Store command implementation.

use super::{open_store, CommandError};
use filestash_core::NewFile;
use std::path::Path;

/// Media type used when nothing better is known.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Runs the store command.
pub async fn run(
    path: &Path,
    files: &[std::path::PathBuf],
    media_type: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let batch = files
        .iter()
        .map(|file| load(file, media_type))
        .collect::<Result<Vec<_>, _>>()?;

    let handle = open_store(path).await?;
    let count = batch.len();
    handle.store(batch).await?;
    println!("Stored {count} file(s)");
    Ok(())
}

fn load(file: &Path, media_type: Option<&str>) -> Result<NewFile, CommandError> {
    let content = std::fs::read(file).map_err(|source| CommandError::ReadFile {
        path: file.display().to_string(),
        source,
    })?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let media_type = media_type.unwrap_or_else(|| guess_media_type(file));
    Ok(NewFile::new(name, content).media_type(media_type))
}

/// Guesses a media type from the file extension.
pub fn guess_media_type(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn media_type_from_extension() {
        assert_eq!(guess_media_type(Path::new("clip.MP4")), "video/mp4");
        assert_eq!(guess_media_type(Path::new("a/b/notes.txt")), "text/plain");
        assert_eq!(guess_media_type(Path::new("blob")), FALLBACK_MEDIA_TYPE);
        assert_eq!(guess_media_type(Path::new("x.unknown")), FALLBACK_MEDIA_TYPE);
    }

    #[test]
    fn load_reads_name_and_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let file = load(&path, None).unwrap();
        assert_eq!(file.name, "photo.png");
        assert_eq!(file.content, vec![1, 2, 3]);
        assert_eq!(file.size, 3);
        assert_eq!(file.media_type.as_deref(), Some("image/png"));

        let file = load(&path, Some("application/x-custom")).unwrap();
        assert_eq!(file.media_type.as_deref(), Some("application/x-custom"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("absent"), None).unwrap_err();
        assert!(matches!(err, CommandError::ReadFile { .. }));
    }

    #[tokio::test]
    async fn stored_files_can_be_listed() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, b"hello").unwrap();
        let data = dir.path().join("data");

        run(&data, &[input], None).await.unwrap();

        let handle = open_store(&data).await.unwrap();
        let records = handle.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "in.txt");
        assert_eq!(records[0].media_type.as_deref(), Some("text/plain"));
    }
}
