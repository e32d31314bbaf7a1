use std::fs;
use std::io;
use std::path::Path;

use zip::ZipArchive;

use crate::domain::SpeciesSlug;
use crate::error::PipelineError;

// slug-prefixed entries carry their own species directory under shared_root
pub fn extract_archive_routed(
    zip_path: &Path,
    slug: &SpeciesSlug,
    shared_root: &Path,
    species_dir: &Path,
) -> Result<usize, PipelineError> {
    let file = fs::File::open(zip_path).map_err(|err| {
        PipelineError::Filesystem(format!("open archive {}: {err}", zip_path.display()))
    })?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| PipelineError::BadArchive(err.to_string()))?;

    let mut extracted = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| PipelineError::BadArchive(err.to_string()))?;
        let target_root = if entry.name().starts_with(slug.as_str()) {
            shared_root
        } else {
            species_dir
        };
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_root.join(path),
            None => {
                return Err(PipelineError::BadArchive(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| PipelineError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| PipelineError::BadArchive(err.to_string()))?;
        extracted += 1;
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extraction_routes_by_slug_prefix() {
        let temp = tempfile::tempdir().unwrap();
        let zip_path = temp.path().join("current.zip");
        write_zip(
            &zip_path,
            &[
                ("abies-balsamea/current.txt", "grid"),
                ("readme.txt", "notes"),
            ],
        );

        let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
        let shared = temp.path().join("ascii");
        let species = shared.join("abies-balsamea");
        fs::create_dir_all(&species).unwrap();

        let count = extract_archive_routed(&zip_path, &slug, &shared, &species).unwrap();
        assert_eq!(count, 2);
        assert!(shared.join("abies-balsamea/current.txt").is_file());
        assert!(species.join("readme.txt").is_file());
    }

    #[test]
    fn corrupt_archive_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let zip_path = temp.path().join("broken.zip");
        fs::write(&zip_path, b"this is not a zip archive").unwrap();

        let slug: SpeciesSlug = "abies-balsamea".parse().unwrap();
        let err = extract_archive_routed(&zip_path, &slug, temp.path(), temp.path()).unwrap_err();
        assert_matches!(err, PipelineError::BadArchive(_));
    }
}
