use crate::config::{Alignment, RenderConfig, TextAlignment};
use crate::pass::Surface;
use crate::text_metrics::LabelFont;
use anyhow::Result;
use std::path::Path;

/// SVG drawing device for placement passes.
pub struct SvgSurface {
    width: i32,
    height: i32,
    config: RenderConfig,
    body: String,
}

impl SvgSurface {
    pub fn new(width: i32, height: i32, config: RenderConfig) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            config,
            body: String::new(),
        }
    }

    pub fn finish(self) -> String {
        let width = self.width;
        let height = self.height;
        let mut svg = String::with_capacity(self.body.len() + 256);
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        ));
        svg.push_str(&format!(
            "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
            escape_xml(&self.config.background)
        ));
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }
}

impl Surface for SvgSurface {
    fn draw_marker(&mut self, x: i32, y: i32) {
        self.body.push_str(&format!(
            "<circle cx=\"{x}\" cy=\"{y}\" r=\"{:.2}\" fill=\"{}\"/>",
            self.config.marker_radius,
            escape_xml(&self.config.marker_color)
        ));
    }

    fn draw_label(&mut self, x: i32, y: i32, text: &str, alignment: TextAlignment, font: &LabelFont) {
        let anchor = match alignment.horizontal {
            Alignment::Near => "start",
            Alignment::Center => "middle",
            Alignment::Far => "end",
        };
        let baseline = match alignment.vertical {
            Alignment::Near => "hanging",
            Alignment::Center => "central",
            Alignment::Far => "alphabetic",
        };
        self.body.push_str(&format!(
            "<text x=\"{x}\" y=\"{y}\" text-anchor=\"{anchor}\" dominant-baseline=\"{baseline}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            escape_xml(font.family()),
            font.size(),
            escape_xml(&self.config.label_color),
            escape_xml(text)
        ));
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, font_family: &str) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = font_family.to_string();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
