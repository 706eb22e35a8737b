//! Visual report of the computed parameters.
//!
//! For every parameter the executor appends two pages: a colorbar with the
//! display range and units, and a burn-in of the masked grid. [`ImageReport`]
//! writes the pages as JPEG files plus a `report.json` manifest;
//! [`MemoryReport`] keeps the rendered pages in memory.
pub mod colormap;
pub mod render;

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::io::gdal::GeoReference;
use crate::io::writers::jpeg::write_rgb_jpeg;
use crate::io::writers::worldfile::{scale_geotransform, write_prj_file, write_world_file};
use colormap::Colormap;
use render::{
    COLORBAR_HEIGHT, COLORBAR_WIDTH, burn_in_rgb, calculate_resize_dimensions, colorbar_rgb,
    resize_rgb_image,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Colorbar,
    BurnIn,
}

/// One page appended to a report, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPage {
    pub index: usize,
    pub kind: PageKind,
    pub parameter: String,
    pub colormap: Colormap,
    pub min_value: f64,
    pub max_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub width: usize,
    pub height: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Destination of the visual pages.
pub trait ReportSink {
    fn append_colorbar(
        &mut self,
        name: &str,
        colormap: Colormap,
        min_value: f64,
        max_value: f64,
        units: &str,
    ) -> Result<ReportPage>;

    #[allow(clippy::too_many_arguments)]
    fn append_burn_in(
        &mut self,
        name: &str,
        array: &Array2<f64>,
        colormap: Colormap,
        min_value: f64,
        max_value: f64,
        no_data: f64,
        uniform_distribution: bool,
    ) -> Result<ReportPage>;

    fn pages(&self) -> &[ReportPage];

    /// Flush whatever the sink writes once all pages are in. Returns the
    /// path of the written index, if any.
    fn finish(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

fn units_field(units: &str) -> Option<String> {
    if units.is_empty() {
        None
    } else {
        Some(units.to_string())
    }
}

/// Report rendered in memory: pages and their RGB buffers.
#[derive(Debug, Default)]
pub struct MemoryReport {
    pages: Vec<ReportPage>,
    images: Vec<Vec<u8>>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// RGB bytes of page `index`.
    pub fn image(&self, index: usize) -> Option<&[u8]> {
        self.images.get(index).map(Vec::as_slice)
    }
}

impl ReportSink for MemoryReport {
    fn append_colorbar(
        &mut self,
        name: &str,
        colormap: Colormap,
        min_value: f64,
        max_value: f64,
        units: &str,
    ) -> Result<ReportPage> {
        let rgb = colorbar_rgb(colormap, COLORBAR_WIDTH, COLORBAR_HEIGHT);
        let page = ReportPage {
            index: self.pages.len(),
            kind: PageKind::Colorbar,
            parameter: name.to_string(),
            colormap,
            min_value,
            max_value,
            units: units_field(units),
            width: COLORBAR_WIDTH,
            height: COLORBAR_HEIGHT,
            path: None,
        };
        self.pages.push(page.clone());
        self.images.push(rgb);
        Ok(page)
    }

    fn append_burn_in(
        &mut self,
        name: &str,
        array: &Array2<f64>,
        colormap: Colormap,
        min_value: f64,
        max_value: f64,
        no_data: f64,
        uniform_distribution: bool,
    ) -> Result<ReportPage> {
        let rgb = burn_in_rgb(array, colormap, min_value, max_value, no_data, uniform_distribution);
        let (rows, cols) = array.dim();
        let page = ReportPage {
            index: self.pages.len(),
            kind: PageKind::BurnIn,
            parameter: name.to_string(),
            colormap,
            min_value,
            max_value,
            units: None,
            width: cols,
            height: rows,
            path: None,
        };
        self.pages.push(page.clone());
        self.images.push(rgb);
        Ok(page)
    }

    fn pages(&self) -> &[ReportPage] {
        &self.pages
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    created: String,
    pages: &'a [ReportPage],
}

/// Report written to a directory: one JPEG per page, a world file for
/// burn-in pages when the scene is georeferenced, and a `report.json`
/// manifest on [`finish`](ReportSink::finish).
pub struct ImageReport {
    dir: PathBuf,
    size: Option<usize>,
    georef: GeoReference,
    pages: Vec<ReportPage>,
}

impl ImageReport {
    pub const MANIFEST: &'static str = "report.json";

    pub fn new(dir: impl Into<PathBuf>, size: Option<usize>, georef: GeoReference) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            size,
            georef,
            pages: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, name: &str, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{:03}_{}{}.jpg", self.pages.len(), name, suffix))
    }
}

impl ReportSink for ImageReport {
    fn append_colorbar(
        &mut self,
        name: &str,
        colormap: Colormap,
        min_value: f64,
        max_value: f64,
        units: &str,
    ) -> Result<ReportPage> {
        let rgb = colorbar_rgb(colormap, COLORBAR_WIDTH, COLORBAR_HEIGHT);
        let path = self.page_path(name, "_colorbar");
        write_rgb_jpeg(&path, COLORBAR_WIDTH, COLORBAR_HEIGHT, &rgb)?;
        debug!("Colorbar page {:?}", path);

        let page = ReportPage {
            index: self.pages.len(),
            kind: PageKind::Colorbar,
            parameter: name.to_string(),
            colormap,
            min_value,
            max_value,
            units: units_field(units),
            width: COLORBAR_WIDTH,
            height: COLORBAR_HEIGHT,
            path: Some(path),
        };
        self.pages.push(page.clone());
        Ok(page)
    }

    fn append_burn_in(
        &mut self,
        name: &str,
        array: &Array2<f64>,
        colormap: Colormap,
        min_value: f64,
        max_value: f64,
        no_data: f64,
        uniform_distribution: bool,
    ) -> Result<ReportPage> {
        let (rows, cols) = array.dim();
        let rgb = burn_in_rgb(array, colormap, min_value, max_value, no_data, uniform_distribution);

        let (width, height) = match self.size {
            Some(size) => calculate_resize_dimensions(cols, rows, size),
            None => (cols, rows),
        };
        let rgb = if (width, height) != (cols, rows) {
            info!("Resizing {} page to {}x{}", name, width, height);
            resize_rgb_image(&rgb, cols, rows, width, height)?
        } else {
            rgb
        };

        let path = self.page_path(name, "");
        write_rgb_jpeg(&path, width, height, &rgb)?;
        if let Some(gt) = self.georef.geotransform {
            write_world_file(&path, scale_geotransform(gt, (cols, rows), (width, height)))?;
        }
        if let Some(proj) = &self.georef.projection {
            write_prj_file(&path, proj)?;
        }
        debug!("Burn-in page {:?}", path);

        let page = ReportPage {
            index: self.pages.len(),
            kind: PageKind::BurnIn,
            parameter: name.to_string(),
            colormap,
            min_value,
            max_value,
            units: None,
            width,
            height,
            path: Some(path),
        };
        self.pages.push(page.clone());
        Ok(page)
    }

    fn pages(&self) -> &[ReportPage] {
        &self.pages
    }

    /// Write the `report.json` manifest.
    fn finish(&mut self) -> Result<Option<PathBuf>> {
        let manifest = Manifest {
            created: chrono::Utc::now().to_rfc3339(),
            pages: &self.pages,
        };
        let path = self.dir.join(Self::MANIFEST);
        std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        info!("Report with {} pages written to {:?}", self.pages.len(), self.dir);
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_report_writes_pages_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let georef = GeoReference {
            geotransform: Some([0.0, 10.0, 0.0, 0.0, 0.0, -10.0]),
            projection: None,
        };
        let mut report = ImageReport::new(dir.path().join("report"), Some(4), georef).unwrap();

        let param = Array2::from_shape_fn((8, 8), |(r, c)| (r * 8 + c) as f64);
        report
            .append_colorbar("SPM", Colormap::Viridis, 0.0, 63.0, "mg/l")
            .unwrap();
        let page = report
            .append_burn_in("SPM", &param, Colormap::Viridis, 0.0, 63.0, -9999.0, false)
            .unwrap();
        assert_eq!((page.width, page.height), (4, 4));
        assert_eq!(page.index, 1);

        let burn_path = page.path.unwrap();
        assert!(burn_path.ends_with("001_SPM.jpg"));
        assert!(burn_path.exists());
        assert!(burn_path.with_extension("jgw").exists());
        assert!(dir.path().join("report/000_SPM_colorbar.jpg").exists());

        let manifest_path = report.finish().unwrap().unwrap();
        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(manifest_path).unwrap()).unwrap();
        let pages = manifest["pages"].as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0]["kind"], "colorbar");
        assert_eq!(pages[0]["units"], "mg/l");
        assert_eq!(pages[1]["kind"], "burn_in");
    }

    #[test]
    fn memory_report_keeps_order() {
        let mut report = MemoryReport::new();
        let grid = Array2::from_elem((2, 3), 1.0);
        report.append_colorbar("A", Colormap::Jet, 0.0, 1.0, "").unwrap();
        report
            .append_burn_in("A", &grid, Colormap::Jet, 0.0, 1.0, -9999.0, true)
            .unwrap();
        assert_eq!(report.pages().len(), 2);
        assert_eq!(report.pages()[0].units, None);
        assert_eq!(report.image(1).unwrap().len(), 2 * 3 * 3);
    }
}
