use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Object detection service.
///
/// # Contract
///
/// - Boxes are returned in the coordinate space of `image` (crop-local when
///   the caller passes a crop).
/// - Results below `conf_threshold` are already filtered out.
/// - `imgsz` is the square inference size the model runs at; scaling back to
///   `image` coordinates is the backend's job.
/// - An image with nothing in it returns `Ok(vec![])`, not an error.
///
/// Backends run on the frame thread and may block.
pub trait DetectionService: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run inference on one image.
    fn infer(&mut self, image: &Frame, conf_threshold: f32, imgsz: u32)
        -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: DetectionService + ?Sized> DetectionService for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(
        &mut self,
        image: &Frame,
        conf_threshold: f32,
        imgsz: u32,
    ) -> Result<Vec<RawDetection>> {
        (**self).infer(image, conf_threshold, imgsz)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
