//! Module archive extraction

use super::CacheError;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Extract a module zip into an empty directory
///
/// Every entry of a module archive starts with `<path>@<version>/`; that
/// prefix is stripped so `dest` becomes the module root. Returns the number of
/// files written.
pub(crate) fn extract_module_zip(
    bytes: &[u8],
    prefix: &str,
    dest: &Path,
) -> Result<usize, CacheError> {
    fs::create_dir_all(dest)?;
    if fs::read_dir(dest)?.next().is_some() {
        return Err(CacheError::TargetNotEmpty(dest.to_path_buf()));
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();

        let Some(rel) = name.strip_prefix(prefix) else {
            return Err(CacheError::InvalidArchive(format!(
                "entry {} is outside {}",
                name, prefix
            )));
        };
        if rel.is_empty() {
            continue;
        }
        let rel = safe_relative(rel)
            .ok_or_else(|| CacheError::InvalidArchive(format!("unsafe entry path {}", name)))?;
        let out_path = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    Ok(written)
}

/// Relative path with only normal components
fn safe_relative(rel: &str) -> Option<PathBuf> {
    let path = Path::new(rel.trim_end_matches('/'));
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_strips_prefix() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[
            ("example.com/m@v1.0.0/go.mod", "module example.com/m\n"),
            ("example.com/m@v1.0.0/sub/a.go", "package sub\n"),
        ]);
        let dest = temp.path().join("out");

        let n = extract_module_zip(&bytes, "example.com/m@v1.0.0/", &dest).unwrap();

        assert_eq!(n, 2);
        assert!(dest.join("go.mod").is_file());
        assert!(dest.join("sub").join("a.go").is_file());
    }

    #[test]
    fn test_extract_refuses_non_empty_target() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("existing"), "x").unwrap();
        let bytes = build_zip(&[("example.com/m@v1.0.0/go.mod", "module example.com/m\n")]);

        let result = extract_module_zip(&bytes, "example.com/m@v1.0.0/", temp.path());
        assert!(matches!(result, Err(CacheError::TargetNotEmpty(_))));
    }

    #[test]
    fn test_extract_rejects_foreign_entries() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[("other@v1.0.0/go.mod", "module other\n")]);

        let result = extract_module_zip(&bytes, "example.com/m@v1.0.0/", &temp.path().join("o"));
        assert!(matches!(result, Err(CacheError::InvalidArchive(_))));
    }

    #[test]
    fn test_safe_relative() {
        assert_eq!(safe_relative("a/b.go"), Some(PathBuf::from("a").join("b.go")));
        assert_eq!(safe_relative("../x"), None);
        assert_eq!(safe_relative("/abs"), None);
    }
}
