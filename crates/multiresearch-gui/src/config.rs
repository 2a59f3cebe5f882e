use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: String,
    pub assets_dir: PathBuf,
    /// Fixed path the PDF export is written to and streamed from.
    pub pdf_path: PathBuf,
    /// External HTML-to-PDF converter program.
    pub pdf_converter: String,
}

impl AppConfig {
    const DEFAULT_LISTEN_ADDR: &'static str = "0.0.0.0:8080";
    const DEFAULT_ASSETS_DIR: &'static str = "crates/multiresearch-gui/assets";
    const DEFAULT_PDF_PATH: &'static str = "Research_Report.pdf";
    const DEFAULT_PDF_CONVERTER: &'static str = "wkhtmltopdf";

    pub fn from_env() -> Self {
        let listen_addr = env::var("MULTIRESEARCH_LISTEN_ADDR")
            .unwrap_or_else(|_| Self::DEFAULT_LISTEN_ADDR.to_string());

        let assets_dir = env::var("MULTIRESEARCH_ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_ASSETS_DIR));
        let assets_dir = if assets_dir.is_relative() {
            env::current_dir()
                .map(|cwd| cwd.join(&assets_dir))
                .unwrap_or(assets_dir)
        } else {
            assets_dir
        };

        let pdf_path = env::var("MULTIRESEARCH_PDF_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_PDF_PATH));

        let pdf_converter = env::var("MULTIRESEARCH_PDF_CONVERTER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| Self::DEFAULT_PDF_CONVERTER.to_string());

        Self {
            listen_addr,
            assets_dir,
            pdf_path,
            pdf_converter,
        }
    }
}
