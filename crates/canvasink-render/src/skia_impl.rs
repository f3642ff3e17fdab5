//! tiny-skia based CPU rasterizer.

use crate::renderer::{RenderOptions, RenderResult, RendererError};
use crate::text::{TextRaster, rasterize_text};
use ab_glyph::FontArc;
use canvasink_core::elements::{
    Element, ElementKind, ImageElement, LineCap, LineJoin, ResourceHandle, ShapeElement,
    StrokeElement, TextElement,
};
use canvasink_core::{Background, RasterBackend, RasterRequest, SerializableColor};
use image::RgbaImage;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape};
use std::collections::HashMap;
use tiny_skia::{
    BlendMode, Color, ColorU8, FillRule, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

/// Convert a kurbo path to a tiny-skia path. Returns `None` for empty paths.
pub fn to_skia_path(path: &BezPath) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => builder.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => builder.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }
    builder.finish()
}

fn to_skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Rotation and scale of `element`, applied about the center of its bounds.
pub fn element_transform(element: &Element) -> Affine {
    let identity = element.rotation == 0.0 && element.scale_x == 1.0 && element.scale_y == 1.0;
    let Some(bounds) = element.bounds().filter(|_| !identity) else {
        return Affine::IDENTITY;
    };
    let center = bounds.center().to_vec2();
    Affine::translate(center)
        * Affine::rotate(element.rotation.to_radians())
        * Affine::scale_non_uniform(element.scale_x, element.scale_y)
        * Affine::translate(-center)
}

fn solid_paint(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

fn skia_stroke(width: f64, cap: LineCap, join: LineJoin) -> Stroke {
    Stroke {
        width: width.max(0.0) as f32,
        line_cap: match cap {
            LineCap::Butt => tiny_skia::LineCap::Butt,
            LineCap::Round => tiny_skia::LineCap::Round,
            LineCap::Square => tiny_skia::LineCap::Square,
        },
        line_join: match join {
            LineJoin::Miter => tiny_skia::LineJoin::Miter,
            LineJoin::Round => tiny_skia::LineJoin::Round,
            LineJoin::Bevel => tiny_skia::LineJoin::Bevel,
        },
        ..Stroke::default()
    }
}

fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or_else(|| {
        RendererError::InitFailed(format!("cannot allocate {width}x{height} pixmap"))
    })
}

/// Premultiply a straight-alpha image into a pixmap.
fn pixmap_from_image(image: &RgbaImage) -> RenderResult<Pixmap> {
    let mut pixmap = new_pixmap(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Demultiply a pixmap into a straight-alpha image.
fn image_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        dst.0 = [color.red(), color.green(), color.blue(), color.alpha()];
    }
    image
}

/// CPU renderer for raster export.
///
/// Elements are drawn onto a transparent element layer, so eraser strokes
/// only remove annotation pixels; that layer is then composited over the
/// background at 1:1.
#[derive(Default)]
pub struct TinySkiaRenderer {
    options: RenderOptions,
    font: Option<FontArc>,
    /// Decoded image pixels keyed by resource handle, premultiplied.
    image_cache: HashMap<ResourceHandle, Pixmap>,
}

impl TinySkiaRenderer {
    /// Create a new renderer with default options and no font.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `font` for every text element.
    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TTF/OTF face from bytes.
    pub fn load_font(&mut self, bytes: Vec<u8>) -> RenderResult<()> {
        let font = FontArc::try_from_vec(bytes).map_err(|e| RendererError::Font(e.to_string()))?;
        self.font = Some(font);
        Ok(())
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Supply decoded pixels for an image resource.
    pub fn insert_image(&mut self, handle: ResourceHandle, image: &RgbaImage) -> RenderResult<()> {
        let pixmap = pixmap_from_image(image)?;
        self.image_cache.insert(handle, pixmap);
        Ok(())
    }

    /// Forget an image resource, mirroring the host's release.
    pub fn remove_image(&mut self, handle: &ResourceHandle) -> bool {
        self.image_cache.remove(handle).is_some()
    }

    pub fn cached_images(&self) -> usize {
        self.image_cache.len()
    }

    /// Render a request into a straight-alpha RGBA image.
    pub fn render(&mut self, request: &RasterRequest) -> RenderResult<RgbaImage> {
        let (width, height) = request.pixel_size();
        let mut output = new_pixmap(width, height)?;
        if let Some(clear) = self.options.clear_rgba() {
            output.fill(Color::from_rgba8(clear.r, clear.g, clear.b, clear.a));
        }
        if let Some(background) = &request.background {
            self.draw_background(&mut output, background)?;
        }

        let mut layer = new_pixmap(width, height)?;
        let mut skipped_text = 0;
        for element in request.scene.iter() {
            let transform = to_skia_transform(element_transform(element));
            match &element.kind {
                ElementKind::Stroke(stroke) => self.render_stroke(&mut layer, stroke, transform),
                ElementKind::Shape(shape) => self.render_shape(&mut layer, shape, transform),
                ElementKind::Text(text) => {
                    if !self.render_text(&mut layer, text, transform) {
                        skipped_text += 1;
                    }
                }
                ElementKind::Image(image) => self.render_image(&mut layer, image, transform),
            }
        }
        if skipped_text > 0 {
            log::warn!("{skipped_text} text element(s) not rendered: no font loaded");
        }

        output.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        log::debug!("rasterized {} element(s) at {width}x{height}", request.scene.len());
        Ok(image_from_pixmap(&output))
    }

    fn draw_background(&self, output: &mut Pixmap, background: &Background) -> RenderResult<()> {
        let pixmap = pixmap_from_image(background.image())?;
        output.draw_pixmap(
            0,
            0,
            pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        Ok(())
    }

    /// Render a free-hand stroke; erasers punch through the element layer.
    fn render_stroke(&self, layer: &mut Pixmap, stroke: &StrokeElement, transform: Transform) {
        if stroke.points.len() < 2 {
            return;
        }
        let Some(path) = to_skia_path(&stroke.to_path()) else {
            return;
        };

        let mut paint = if stroke.is_eraser() {
            let mut paint = solid_paint(SerializableColor::black());
            paint.blend_mode = BlendMode::DestinationOut;
            paint
        } else {
            solid_paint(stroke.color.with_opacity(stroke.opacity))
        };

        if let Some(fill) = stroke.effective_fill() {
            let mut fill_paint = solid_paint(fill.with_opacity(stroke.opacity));
            fill_paint.blend_mode = paint.blend_mode;
            layer.fill_path(&path, &fill_paint, FillRule::Winding, transform, None);
        }

        let skia_stroke = skia_stroke(stroke.stroke_width, stroke.line_cap, stroke.line_join);
        paint.anti_alias = true;
        layer.stroke_path(&path, &paint, &skia_stroke, transform, None);
    }

    /// Render a preset shape with its fill, outline and arrowhead.
    fn render_shape(&self, layer: &mut Pixmap, shape: &ShapeElement, transform: Transform) {
        let geometry = shape.geometry();
        let Some(path) = to_skia_path(&geometry.to_path()) else {
            return;
        };

        if let Some(fill) = shape.fill.filter(|_| geometry.is_closed()) {
            let paint = solid_paint(fill.with_opacity(shape.opacity));
            layer.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }

        let stroke_color = shape.stroke.with_opacity(shape.opacity);
        if shape.stroke_width > 0.0 && stroke_color.a > 0 {
            let paint = solid_paint(stroke_color);
            let stroke = skia_stroke(shape.stroke_width, LineCap::Round, LineJoin::Round);
            layer.stroke_path(&path, &paint, &stroke, transform, None);
        }

        if let Some([tip, left, right]) = geometry.arrowhead(shape.stroke_width) {
            let mut head = BezPath::new();
            head.move_to(tip);
            head.line_to(left);
            head.line_to(right);
            head.close_path();
            if let Some(head) = to_skia_path(&head) {
                layer.fill_path(&head, &solid_paint(stroke_color), FillRule::Winding, transform, None);
            }
        }
    }

    /// Render a text element. Returns false when no font is available.
    fn render_text(&self, layer: &mut Pixmap, text: &TextElement, transform: Transform) -> bool {
        let Some(font) = &self.font else {
            return false;
        };

        if let Some(shadow) = text.shadow {
            if let Some(raster) = rasterize_text(text, font, shadow.color, false) {
                let offset =
                    Transform::from_translate(shadow.offset_x as f32, shadow.offset_y as f32);
                draw_text_raster(layer, &raster, transform.pre_concat(offset));
            }
        }
        if let Some(raster) = rasterize_text(text, font, text.color, true) {
            draw_text_raster(layer, &raster, transform);
        }
        true
    }

    /// Render an image scaled to its display box, or a placeholder.
    fn render_image(&self, layer: &mut Pixmap, image: &ImageElement, transform: Transform) {
        let bounds = image.bounds();
        let Some(pixmap) = self.image_cache.get(&image.resource) else {
            if self.options.image_placeholders {
                render_image_placeholder(layer, bounds, transform);
            }
            return;
        };
        let scale_x = bounds.width() / pixmap.width() as f64;
        let scale_y = bounds.height() / pixmap.height() as f64;
        let placement = Transform::from_row(
            scale_x as f32,
            0.0,
            0.0,
            scale_y as f32,
            bounds.x0 as f32,
            bounds.y0 as f32,
        );
        let paint = PixmapPaint {
            quality: tiny_skia::FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        layer.draw_pixmap(0, 0, pixmap.as_ref(), &paint, transform.pre_concat(placement), None);
    }
}

fn draw_text_raster(layer: &mut Pixmap, raster: &TextRaster, transform: Transform) {
    let (x, y) = raster.origin;
    let placement = transform.pre_concat(Transform::from_translate(x, y));
    layer.draw_pixmap(0, 0, raster.pixmap.as_ref(), &PixmapPaint::default(), placement, None);
}

/// Gray box with a cross for images whose pixels are not available.
fn render_image_placeholder(layer: &mut Pixmap, bounds: Rect, transform: Transform) {
    let Some(rect) = to_skia_path(&bounds.to_path(0.1)) else {
        return;
    };
    layer.fill_path(
        &rect,
        &solid_paint(SerializableColor::new(200, 200, 200, 255)),
        FillRule::Winding,
        transform,
        None,
    );

    let mut cross = BezPath::new();
    cross.move_to(Point::new(bounds.x0, bounds.y0));
    cross.line_to(Point::new(bounds.x1, bounds.y1));
    cross.move_to(Point::new(bounds.x1, bounds.y0));
    cross.line_to(Point::new(bounds.x0, bounds.y1));
    let stroke = skia_stroke(2.0, LineCap::Butt, LineJoin::Miter);
    if let Some(cross) = to_skia_path(&cross) {
        layer.stroke_path(
            &cross,
            &solid_paint(SerializableColor::new(150, 150, 150, 255)),
            &stroke,
            transform,
            None,
        );
    }
    layer.stroke_path(
        &rect,
        &solid_paint(SerializableColor::new(100, 100, 100, 255)),
        &stroke,
        transform,
        None,
    );
}

impl RasterBackend for TinySkiaRenderer {
    type Error = RendererError;

    fn rasterize(&mut self, request: &RasterRequest) -> Result<RgbaImage, Self::Error> {
        self.render(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvasink_core::elements::{CompositeMode, ShapeKind};
    use canvasink_core::{Canvas, Scene, ToolKind};
    use image::Rgba;
    use kurbo::Size;

    fn request(scene: Scene, size: Size, background: Option<Background>) -> RasterRequest {
        RasterRequest {
            scene,
            size,
            background,
        }
    }

    fn horizontal_stroke(y: f64, width: f64) -> StrokeElement {
        let mut stroke = StrokeElement::new(vec![Point::new(0.0, y), Point::new(40.0, y)]);
        stroke.stroke_width = width;
        stroke.color = SerializableColor::new(255, 0, 0, 255);
        stroke
    }

    #[test]
    fn test_renderer_creation() {
        let renderer = TinySkiaRenderer::new();
        assert_eq!(renderer.cached_images(), 0);
        assert!(renderer.options().image_placeholders);
    }

    #[test]
    fn test_error_variants() {
        let mut renderer = TinySkiaRenderer::new();
        let err = renderer.load_font(vec![0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, RendererError::Font(_)));
        assert!(renderer.render(&request(Scene::new(), Size::new(4.0, 4.0), None)).is_ok());

        let Err(err) = new_pixmap(0, 0) else {
            panic!("zero-size pixmap allocated");
        };
        match err {
            RendererError::InitFailed(message) => assert!(message.contains("0x0")),
            RendererError::Font(_) => panic!("unexpected font error"),
        }
    }

    #[test]
    fn test_empty_scene_is_transparent() {
        let mut renderer = TinySkiaRenderer::new();
        let image = renderer
            .render(&request(Scene::new(), Size::new(8.0, 6.0), None))
            .unwrap();
        assert_eq!(image.dimensions(), (8, 6));
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_clear_color() {
        let options = RenderOptions::default().with_clear_color(peniko::Color::from_rgba8(255, 255, 255, 255));
        let mut renderer = TinySkiaRenderer::new().with_options(options);
        let image = renderer
            .render(&request(Scene::new(), Size::new(2.0, 2.0), None))
            .unwrap();
        assert_eq!(image.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_filled_rectangle() {
        let mut shape = ShapeElement::new(ShapeKind::Rectangle, Rect::new(5.0, 5.0, 15.0, 15.0));
        shape.fill = Some(SerializableColor::new(0, 0, 255, 255));
        let scene = Scene::from_elements(vec![Element::shape(shape)]);
        let image = TinySkiaRenderer::new()
            .render(&request(scene, Size::new(20.0, 20.0), None))
            .unwrap();
        assert_eq!(image.get_pixel(10, 10), &Rgba([0, 0, 255, 255]));
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_eraser_removes_strokes_but_not_background() {
        let background = Background::new(RgbaImage::from_pixel(40, 20, Rgba([0, 255, 0, 255])));
        let mut eraser = horizontal_stroke(10.0, 8.0);
        eraser.composite_mode = CompositeMode::Erase;
        let scene = Scene::from_elements(vec![
            Element::stroke(horizontal_stroke(10.0, 8.0)),
            Element::stroke(eraser),
        ]);

        let image = TinySkiaRenderer::new()
            .render(&request(scene, Size::new(40.0, 20.0), Some(background)))
            .unwrap();
        assert_eq!(image.get_pixel(20, 10), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_stroke_over_background() {
        let background = Background::new(RgbaImage::from_pixel(40, 20, Rgba([0, 255, 0, 255])));
        let scene = Scene::from_elements(vec![Element::stroke(horizontal_stroke(10.0, 8.0))]);
        let image = TinySkiaRenderer::new()
            .render(&request(scene, Size::new(40.0, 20.0), Some(background)))
            .unwrap();
        assert_eq!(image.get_pixel(20, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(20, 1), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_missing_image_draws_placeholder() {
        let image = ImageElement::new(Point::new(0.0, 0.0), 10.0, 10.0, ResourceHandle::new("blob:x"));
        let scene = Scene::from_elements(vec![Element::image(image)]);

        let drawn = TinySkiaRenderer::new()
            .render(&request(scene.clone(), Size::new(10.0, 10.0), None))
            .unwrap();
        assert_eq!(drawn.get_pixel(2, 7).0[3], 255);

        let options = RenderOptions::default().with_image_placeholders(false);
        let skipped = TinySkiaRenderer::new()
            .with_options(options)
            .render(&request(scene, Size::new(10.0, 10.0), None))
            .unwrap();
        assert!(skipped.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_cached_image_is_scaled_into_box() {
        let handle = ResourceHandle::new("blob:red");
        let mut renderer = TinySkiaRenderer::new();
        renderer
            .insert_image(handle.clone(), &RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])))
            .unwrap();
        let scene = Scene::from_elements(vec![Element::image(ImageElement::new(
            Point::new(4.0, 4.0),
            8.0,
            8.0,
            handle.clone(),
        ))]);
        let image = renderer.render(&request(scene, Size::new(16.0, 16.0), None)).unwrap();
        assert_eq!(image.get_pixel(8, 8), &Rgba([255, 0, 0, 255]));
        assert_eq!(image.get_pixel(1, 1).0[3], 0);
        assert!(renderer.remove_image(&handle));
    }

    #[test]
    fn test_text_without_font_is_skipped() {
        let text = Element::create_text(&Default::default(), "hello", Point::new(1.0, 1.0));
        let scene = Scene::from_elements(vec![text]);
        let image = TinySkiaRenderer::new()
            .render(&request(scene, Size::new(50.0, 50.0), None))
            .unwrap();
        assert!(image.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_rotation_transform_about_center() {
        let mut element = Element::shape(ShapeElement::new(
            ShapeKind::Rectangle,
            Rect::new(0.0, 0.0, 20.0, 10.0),
        ));
        assert_eq!(element_transform(&element), Affine::IDENTITY);
        element.rotation = 90.0;
        let rotated = element_transform(&element) * Point::new(10.0, 5.0);
        assert!((rotated.x - 10.0).abs() < 1e-9);
        assert!((rotated.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_canvas_export_through_backend() {
        let mut canvas = Canvas::new();
        canvas.set_canvas_size(Size::new(64.0, 48.0));
        canvas.set_tool(ToolKind::Fill);
        canvas.pointer_down(Point::new(5.0, 5.0));
        canvas.pointer_up(Point::new(5.0, 5.0));

        let mut renderer = TinySkiaRenderer::new();
        let image = canvas.export_raster(&mut renderer).unwrap();
        assert_eq!(image.dimensions(), (64, 48));
        let alpha = image.get_pixel(30, 30).0[3];
        assert!(alpha > 60 && alpha < 120);
    }
}
