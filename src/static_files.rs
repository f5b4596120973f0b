//! Rooted static file serving for the documentation UI bundle.

use minijinja::Environment;
use serde_json::Value as JsonValue;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Serves files from a base directory, refusing anything that would escape it.
pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
        }
    }

    /// Map a URL path onto the base directory. Parent and absolute
    /// components refuse the whole path.
    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str()
        {
            "html" => "text/html",
            "css" => "text/css",
            "js" => "application/javascript",
            "json" => "application/json",
            "yaml" | "yml" => "application/yaml",
            "png" => "image/png",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            "map" => "application/json",
            "txt" => "text/plain",
            _ => "application/octet-stream",
        }
    }

    /// Read a file under the base directory.
    ///
    /// HTML files render as templates when a context is supplied; everything
    /// else comes back byte for byte.
    pub fn load(
        &self,
        url_path: &str,
        ctx: Option<&JsonValue>,
    ) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !path.exists() || !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        if path.extension().and_then(|s| s.to_str()) == Some("html") {
            if let Some(ctx_val) = ctx {
                let source = fs::read_to_string(&path)?;
                let mut env = Environment::new();
                env.add_template("tpl", &source)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                let tmpl = env
                    .get_template("tpl")
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                let rendered = tmpl
                    .render(ctx_val)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                return Ok((rendered.into_bytes(), Self::content_type(&path)));
            }
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn asset_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("app.css"), "body { margin: 0 }").expect("write css");
        fs::write(dir.path().join("index.html"), "<title>{{ name }}</title>")
            .expect("write template");
        dir
    }

    #[test]
    fn test_map_path_refuses_traversal() {
        let dir = asset_dir();
        let sf = StaticFiles::new(dir.path());
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("a/../../etc/passwd").is_none());
        assert!(sf.map_path("/app.css").is_some());
    }

    #[test]
    fn test_load_plain_file_with_content_type() {
        let dir = asset_dir();
        let sf = StaticFiles::new(dir.path());
        let (bytes, ct) = sf.load("app.css", None).expect("css loads");
        assert_eq!(ct, "text/css");
        assert_eq!(bytes, b"body { margin: 0 }");
    }

    #[test]
    fn test_html_renders_with_context() {
        let dir = asset_dir();
        let sf = StaticFiles::new(dir.path());
        let ctx = json!({ "name": "Pets" });
        let (bytes, ct) = sf.load("index.html", Some(&ctx)).expect("template renders");
        assert_eq!(ct, "text/html");
        assert_eq!(String::from_utf8(bytes).expect("utf8"), "<title>Pets</title>");
    }

    #[test]
    fn test_html_without_context_is_raw() {
        let dir = asset_dir();
        let sf = StaticFiles::new(dir.path());
        let (bytes, _) = sf.load("index.html", None).expect("file loads");
        assert_eq!(
            String::from_utf8(bytes).expect("utf8"),
            "<title>{{ name }}</title>"
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = asset_dir();
        let sf = StaticFiles::new(dir.path());
        let err = sf.load("nope.js", None).expect_err("missing file");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
