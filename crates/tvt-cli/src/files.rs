use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use tvt_core::few_shot::Example;
use tvt_core::state::FileRef;
use tvt_core::templates::TemplateDraft;

const OCTET_STREAM: &str = "application/octet-stream";

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("npy") => OCTET_STREAM,
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => OCTET_STREAM,
    }
}

pub fn load_file(path: &Path) -> Result<FileRef> {
    let content =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(FileRef::new(name, mime_for_path(path), content))
}

pub fn load_optional(path: Option<&Path>) -> Result<Option<FileRef>> {
    path.map(load_file).transpose()
}

/// Reads a YAML list of few-shot examples. Ids are optional.
pub fn load_examples(path: &Path) -> Result<Vec<Example>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid examples in {}", path.display()))
}

pub fn load_template_draft(path: &Path) -> Result<TemplateDraft> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid template draft in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("grip.CSV")), "text/csv");
        assert_eq!(mime_for_path(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("raw.bin")), OCTET_STREAM);
        assert_eq!(mime_for_path(Path::new("noext")), OCTET_STREAM);
    }

    #[test]
    fn load_file_keeps_name_and_size() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("surface.csv");
        fs::write(&path, "t,pressure\n0,0.4\n").expect("write");

        let file = load_file(&path).expect("load");

        assert_eq!(file.name, "surface.csv");
        assert_eq!(file.mime_type, "text/csv");
        assert_eq!(file.byte_size, 17);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("absent.png");

        let err = load_file(&path).expect_err("missing");

        assert!(err.to_string().contains("absent.png"));
    }

    #[test]
    fn examples_load_from_yaml() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("examples.yaml");
        fs::write(
            &path,
            "- tactile: high pressure, smooth\n  text: polished steel\n  output: metal\n\
             - text: woven fibres\n  output: fabric\n",
        )
        .expect("write");

        let examples = load_examples(&path).expect("examples");

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].output, "metal");
        assert_eq!(examples[1].tactile, "");
    }

    #[test]
    fn template_draft_loads_from_yaml() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("draft.yaml");
        fs::write(
            &path,
            "name: grip\ntemplate: \"Assess {surface}\"\nrequired_inputs: '[\"surface\"]'\n",
        )
        .expect("write");

        let draft = load_template_draft(&path).expect("draft");

        assert_eq!(
            draft,
            TemplateDraft {
                name: "grip".to_string(),
                template: "Assess {surface}".to_string(),
                required_inputs: "[\"surface\"]".to_string(),
            }
        );
    }
}
