//! Ranked list rendering
//!
//! Draws one line of a ranked list file as a horizontal strip of dataset
//! images. The first image (normally the query itself) is framed blue; each
//! other image is framed green when it shares the first one's class and red
//! otherwise.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::info;

use crate::data_io;
use crate::error::{Result, UdlfError};

pub const BORDER_WIDTH: u32 = 10;
const QUERY_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const MATCH_COLOR: Rgb<u8> = Rgb([0, 128, 0]);
const MISMATCH_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// What to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub rk_path: PathBuf,
    pub lists_path: PathBuf,
    pub classes_path: PathBuf,
    pub images_dir: PathBuf,
    /// Line of the ranked list file, i.e. the query index
    pub line: usize,
    /// Number of images in the strip
    pub rk_size: usize,
    /// Size every image is resized to; the smallest width and height when unset
    pub shape: Option<(u32, u32)>,
    /// Position in the ranked list of the first image
    pub start_element: usize,
}

impl RenderRequest {
    pub fn new(
        rk_path: impl Into<PathBuf>,
        lists_path: impl Into<PathBuf>,
        classes_path: impl Into<PathBuf>,
        images_dir: impl Into<PathBuf>,
        line: usize,
    ) -> Self {
        Self {
            rk_path: rk_path.into(),
            lists_path: lists_path.into(),
            classes_path: classes_path.into(),
            images_dir: images_dir.into(),
            line,
            rk_size: 10,
            shape: None,
            start_element: 0,
        }
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(UdlfError::render(format!("Required file not found: {}", path.display())))
    }
}

/// Frame `img` with a solid border
fn draw_border(img: &mut RgbImage, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if x < BORDER_WIDTH || y < BORDER_WIDTH || x + BORDER_WIDTH >= w || y + BORDER_WIDTH >= h {
            *pixel = color;
        }
    }
}

/// Render the strip described by `request`
pub fn render_ranked_list(request: &RenderRequest) -> Result<RgbImage> {
    for path in [&request.rk_path, &request.lists_path, &request.classes_path] {
        require_file(path)?;
    }
    if !request.images_dir.is_dir() {
        return Err(UdlfError::render(format!(
            "Images directory not found: {}",
            request.images_dir.display()
        )));
    }
    if request.rk_size == 0 {
        return Err(UdlfError::render("Nothing to render: rk_size is 0"));
    }

    // Line and element numbers refer to physical lines, blank ones included.
    let labels = data_io::read_class_map(&request.classes_path)?;
    let names = data_io::read_raw_lines(&request.lists_path)?;
    let lines = data_io::read_raw_lines(&request.rk_path)?;

    let ranked: Vec<&str> = lines
        .get(request.line)
        .ok_or_else(|| {
            UdlfError::render(format!(
                "Line {} out of range, the file has {} lines",
                request.line,
                lines.len()
            ))
        })?
        .split_whitespace()
        .collect();
    if ranked.is_empty() {
        return Err(UdlfError::render(format!("Ranked list at line {} is empty", request.line)));
    }
    if request.start_element + request.rk_size > ranked.len() {
        return Err(UdlfError::render(format!(
            "Requested {} images from position {}, but the ranked list holds {}",
            request.rk_size,
            request.start_element,
            ranked.len()
        )));
    }

    let mut entries = Vec::with_capacity(request.rk_size);
    for token in &ranked[request.start_element..request.start_element + request.rk_size] {
        let idx: usize = token
            .parse()
            .map_err(|_| UdlfError::render(format!("'{}' is not a dataset index", token)))?;
        let name = names.get(idx).filter(|n| !n.is_empty()).ok_or_else(|| {
            UdlfError::render(format!(
                "Index {} does not name an element of {}",
                idx,
                request.lists_path.display()
            ))
        })?;
        let label = labels.get(name.as_str()).copied().ok_or_else(|| {
            UdlfError::render(format!(
                "Element '{}' has no class in {}",
                name,
                request.classes_path.display()
            ))
        })?;
        let path = request.images_dir.join(name);
        require_file(&path)?;
        entries.push((label, path));
    }

    let mut images = Vec::with_capacity(entries.len());
    let query_label = entries[0].0;
    for (i, (label, path)) in entries.iter().enumerate() {
        let mut img = image::open(path)
            .map_err(|e| UdlfError::render(format!("Failed to open {}: {}", path.display(), e)))?
            .to_rgb8();
        let color = match i {
            0 => QUERY_COLOR,
            _ if *label == query_label => MATCH_COLOR,
            _ => MISMATCH_COLOR,
        };
        draw_border(&mut img, color);
        images.push(img);
    }

    let (w, h) = match request.shape {
        Some((0, _)) | Some((_, 0)) => {
            return Err(UdlfError::render("Image shape must be positive"));
        }
        Some(shape) => shape,
        None => (
            images.iter().map(|i| i.width()).min().unwrap_or(1),
            images.iter().map(|i| i.height()).min().unwrap_or(1),
        ),
    };

    let mut strip = RgbImage::new(w * images.len() as u32, h);
    for (i, img) in images.iter().enumerate() {
        let tile = if img.dimensions() == (w, h) {
            img.clone()
        } else {
            imageops::resize(img, w, h, FilterType::Triangle)
        };
        imageops::replace(&mut strip, &tile, i as i64 * w as i64, 0);
    }
    Ok(strip)
}

/// Render and write the strip to `out`; the format follows the extension
pub fn save_ranked_list(request: &RenderRequest, out: &Path) -> Result<PathBuf> {
    let strip = render_ranked_list(request)?;
    strip
        .save(out)
        .map_err(|e| UdlfError::render(format!("Failed to save {}: {}", out.display(), e)))?;
    info!("Saved ranked list visualization at {}", out.display());
    Ok(out.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const GREY: Rgb<u8> = Rgb([200, 200, 200]);

    fn dataset(dir: &TempDir) -> RenderRequest {
        let images = dir.path().join("images");
        fs::create_dir_all(&images).unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            RgbImage::from_pixel(30, 30, GREY).save(images.join(name)).unwrap();
        }
        fs::write(dir.path().join("lists.txt"), "a.png\nb.png\nc.png\n").unwrap();
        fs::write(dir.path().join("classes.txt"), "a.png:1\nb.png:1\nc.png:2\n").unwrap();
        fs::write(dir.path().join("rks.txt"), "0 1 2\n2 0 1\n").unwrap();

        let mut request = RenderRequest::new(
            dir.path().join("rks.txt"),
            dir.path().join("lists.txt"),
            dir.path().join("classes.txt"),
            images,
            0,
        );
        request.rk_size = 3;
        request
    }

    #[test]
    fn test_strip_layout_and_borders() {
        let dir = TempDir::new().unwrap();
        let strip = render_ranked_list(&dataset(&dir)).unwrap();
        assert_eq!(strip.dimensions(), (90, 30));
        assert_eq!(*strip.get_pixel(0, 0), QUERY_COLOR);
        assert_eq!(*strip.get_pixel(30, 0), MATCH_COLOR);
        assert_eq!(*strip.get_pixel(60, 0), MISMATCH_COLOR);
        assert_eq!(*strip.get_pixel(15, 15), GREY);
    }

    #[test]
    fn test_explicit_shape() {
        let dir = TempDir::new().unwrap();
        let mut request = dataset(&dir);
        request.shape = Some((16, 12));
        let strip = render_ranked_list(&request).unwrap();
        assert_eq!(strip.dimensions(), (48, 12));
    }

    #[test]
    fn test_out_of_range_requests() {
        let dir = TempDir::new().unwrap();
        let mut request = dataset(&dir);
        request.line = 5;
        assert!(render_ranked_list(&request).is_err());

        let mut request = dataset(&dir);
        request.start_element = 1;
        assert!(render_ranked_list(&request).is_err());
    }

    #[test]
    fn test_lines_are_physical_line_numbers() {
        let dir = TempDir::new().unwrap();
        let mut request = dataset(&dir);
        fs::write(&request.rk_path, "0 1 2\n\n2 0 1\n").unwrap();

        request.line = 1;
        let err = render_ranked_list(&request).unwrap_err();
        assert!(err.to_string().contains("empty"));

        // Line 2 starts with element 2 (c.png, class 2).
        request.line = 2;
        let strip = render_ranked_list(&request).unwrap();
        assert_eq!(*strip.get_pixel(0, 0), QUERY_COLOR);
        assert_eq!(*strip.get_pixel(30, 0), MISMATCH_COLOR);
        assert_eq!(*strip.get_pixel(60, 0), MISMATCH_COLOR);
    }

    #[test]
    fn test_element_index_counts_blank_list_lines() {
        let dir = TempDir::new().unwrap();
        let mut request = dataset(&dir);
        fs::write(&request.lists_path, "a.png\n\nc.png\n").unwrap();
        fs::write(&request.rk_path, "2 0\n").unwrap();
        request.rk_size = 2;

        // Index 2 is c.png on the third physical line; 0 is a.png.
        let strip = render_ranked_list(&request).unwrap();
        assert_eq!(strip.dimensions(), (60, 30));
        assert_eq!(*strip.get_pixel(30, 0), MISMATCH_COLOR);

        fs::write(&request.rk_path, "1 0\n").unwrap();
        assert!(render_ranked_list(&request).is_err());
    }

    #[test]
    fn test_missing_image() {
        let dir = TempDir::new().unwrap();
        let request = dataset(&dir);
        fs::remove_file(request.images_dir.join("c.png")).unwrap();
        assert!(render_ranked_list(&request).is_err());
    }

    #[test]
    fn test_save() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("strip.png");
        let saved = save_ranked_list(&dataset(&dir), &out).unwrap();
        assert_eq!(saved, out);
        assert!(out.is_file());
    }
}
