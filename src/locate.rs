// Input lookup: newest image in `input/`, else the first image by name in
// the working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{EditError, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

/// Case-insensitive match against [`IMAGE_EXTENSIONS`].
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Most recently modified image file in `dir`. Files sharing a
/// modification time are ordered by name, so the result is stable.
pub fn newest_image(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| EditError::io(dir, e))? {
        let entry = entry.map_err(|e| EditError::io(dir, e))?;
        let path = entry.path();
        if !has_image_extension(&path) {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| EditError::io(&path, e))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, path));
    }

    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(candidates.into_iter().next().map(|(_, path)| path))
}

/// First image file in `dir` in lexicographic name order.
pub fn first_image_by_name(dir: &Path) -> Result<Option<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .map_err(|e| EditError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| EditError::io(dir, e))?;
    paths.sort();

    Ok(paths
        .into_iter()
        .find(|path| has_image_extension(path) && path.is_file()))
}

/// Pick the image to edit. An empty or missing `input_dir` falls through
/// to the working directory.
pub fn find_input_image(workdir: &Path, input_dir: &Path) -> Result<Option<PathBuf>> {
    if input_dir.is_dir() {
        if let Some(path) = newest_image(input_dir)? {
            return Ok(Some(path));
        }
    }
    first_image_by_name(workdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(path: &Path, age_secs: u64) {
        let file = File::create(path).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_image_extension(Path::new("a.PNG")));
        assert!(has_image_extension(Path::new("dir/b.tif")));
        assert!(!has_image_extension(Path::new("notes.txt")));
        assert!(!has_image_extension(Path::new("png")));
    }

    #[test]
    fn newest_file_in_input_dir_wins() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        fs::create_dir(&input).unwrap();
        touch(&input.join("a.png"), 600);
        touch(&input.join("b.jpg"), 10);
        touch(&input.join("c.txt"), 0);

        let found = find_input_image(dir.path(), &input).unwrap();
        assert_eq!(found, Some(input.join("b.jpg")));
    }

    #[test]
    fn equal_mtimes_break_ties_by_name() {
        let dir = TempDir::new().unwrap();
        let when = SystemTime::now() - Duration::from_secs(60);
        for name in ["z.png", "m.png", "q.png"] {
            File::create(dir.path().join(name))
                .unwrap()
                .set_modified(when)
                .unwrap();
        }
        assert_eq!(
            newest_image(dir.path()).unwrap(),
            Some(dir.path().join("m.png"))
        );
    }

    #[test]
    fn working_dir_used_without_input_dir() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("notes.txt"), 0);
        touch(&dir.path().join("photo.webp"), 0);

        let found = find_input_image(dir.path(), &dir.path().join("input")).unwrap();
        assert_eq!(found, Some(dir.path().join("photo.webp")));
    }

    #[test]
    fn empty_input_dir_falls_through_to_working_dir() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input");
        fs::create_dir(&input).unwrap();
        touch(&dir.path().join("b.png"), 0);
        touch(&dir.path().join("a.jpeg"), 0);

        let found = find_input_image(dir.path(), &input).unwrap();
        assert_eq!(found, Some(dir.path().join("a.jpeg")));
    }

    #[test]
    fn directories_with_image_names_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("a.png")).unwrap();
        touch(&dir.path().join("b.png"), 0);

        let found = first_image_by_name(dir.path()).unwrap();
        assert_eq!(found, Some(dir.path().join("b.png")));
    }

    #[test]
    fn nothing_found() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("readme.md"), 0);
        assert_eq!(find_input_image(dir.path(), &dir.path().join("input")).unwrap(), None);
    }
}
