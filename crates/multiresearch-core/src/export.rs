//! Report export: markdown to a styled HTML document, and on to PDF via an
//! external converter program.

use std::path::{Path, PathBuf};

use pulldown_cmark::{Options, Parser, html};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::ResearcherError;

const DEFAULT_CONVERTER: &str = "wkhtmltopdf";

/// Renders the final report for download.
///
/// PDF binary generation is delegated to an external converter program that
/// accepts `<input.html> <output.pdf>` argument pairs (wkhtmltopdf-style).
#[derive(Debug, Clone)]
pub struct ReportExporter {
    converter: String,
}

impl ReportExporter {
    pub fn new() -> Self {
        Self::with_converter(DEFAULT_CONVERTER)
    }

    pub fn with_converter(converter: impl Into<String>) -> Self {
        Self {
            converter: converter.into(),
        }
    }

    /// Render the markdown report into a standalone styled HTML document.
    pub fn render_html(&self, markdown: &str, title: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);

        let parser = Parser::new_ext(markdown, options);
        let mut body = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut body, parser);

        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{title}</title>\n<style>{REPORT_CSS}</style>\n</head>\n\
             <body>\n<main class=\"report\">\n{body}</main>\n</body>\n</html>\n"
        )
    }

    /// Write the rendered HTML document to `path`, overwriting it.
    pub async fn export_html(
        &self,
        markdown: &str,
        title: &str,
        path: &Path,
    ) -> Result<(), ResearcherError> {
        let document = self.render_html(markdown, title);
        write_artifact(path, document.as_bytes()).await?;
        debug!(path = %path.display(), "HTML report written");
        Ok(())
    }

    /// Export the report as PDF at `output`, overwriting any previous export.
    ///
    /// The intermediate HTML document lands next to the PDF and is kept so
    /// the converter's input stays inspectable.
    pub async fn export_pdf(
        &self,
        markdown: &str,
        title: &str,
        output: &Path,
    ) -> Result<PathBuf, ResearcherError> {
        let html_path = output.with_extension("html");
        self.export_html(markdown, title, &html_path).await?;

        let status = Command::new(&self.converter)
            .arg(&html_path)
            .arg(output)
            .output()
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ResearcherError::Export(format!(
                        "PDF converter `{}` not found; install it or set \
                         MULTIRESEARCH_PDF_CONVERTER to an available program",
                        self.converter
                    ))
                } else {
                    ResearcherError::Export(err.to_string())
                }
            })?;

        if !status.status.success() {
            let stderr = String::from_utf8_lossy(&status.stderr);
            return Err(ResearcherError::Export(format!(
                "`{}` exited with {}: {}",
                self.converter,
                status.status,
                stderr.trim()
            )));
        }

        info!(path = %output.display(), "PDF report written");
        Ok(output.to_path_buf())
    }
}

impl Default for ReportExporter {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), ResearcherError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| ResearcherError::Export(err.to_string()))?;
    }
    fs::write(path, bytes)
        .await
        .map_err(|err| ResearcherError::Export(err.to_string()))
}

const REPORT_CSS: &str = r#"
body { font-family: Georgia, 'Times New Roman', serif; margin: 0; }
main.report { max-width: 48rem; margin: 2rem auto; padding: 0 1.5rem; line-height: 1.6; }
h1, h2, h3 { font-family: Helvetica, Arial, sans-serif; line-height: 1.25; }
h1 { border-bottom: 2px solid #333; padding-bottom: 0.3rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid #999; padding: 0.4rem 0.6rem; text-align: left; }
blockquote { border-left: 4px solid #999; margin-left: 0; padding-left: 1rem; color: #444; }
code { font-family: 'SF Mono', Consolas, monospace; background: #f2f2f2; padding: 0.1rem 0.25rem; }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Title\n\nSome **bold** text.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";

    #[test]
    fn renders_markdown_into_a_full_document() {
        let exporter = ReportExporter::new();
        let document = exporter.render_html(SAMPLE, "Research Report");
        assert!(document.starts_with("<!DOCTYPE html>"));
        assert!(document.contains("<h1>Title</h1>"));
        assert!(document.contains("<strong>bold</strong>"));
        assert!(document.contains("<table>"));
        assert!(document.contains("<title>Research Report</title>"));
    }

    #[tokio::test]
    async fn export_overwrites_previous_html() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        let exporter = ReportExporter::new();

        exporter.export_html("first", "r", &path).await.unwrap();
        exporter.export_html("second", "r", &path).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("second"));
        assert!(!contents.contains("first"));
    }

    #[tokio::test]
    async fn pdf_export_runs_the_converter() {
        // `cp` consumes the same `<input> <output>` argument pair as a real
        // converter, which keeps the test hermetic.
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Research_Report.pdf");
        let exporter = ReportExporter::with_converter("cp");

        let written = exporter.export_pdf(SAMPLE, "r", &output).await.unwrap();
        assert_eq!(written, output);
        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn missing_converter_is_reported_with_a_hint() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.pdf");
        let exporter = ReportExporter::with_converter("definitely-not-a-pdf-converter");

        let err = exporter.export_pdf(SAMPLE, "r", &output).await.unwrap_err();
        assert!(matches!(err, ResearcherError::Export(_)));
        assert!(err.to_string().contains("MULTIRESEARCH_PDF_CONVERTER"));
    }
}
