// ── Matrix controller ──
//
// Per-key LED control. A `MatrixHandle` stages pixels in memory and
// flushes the complete frame in one backend call on `draw()`. Nothing
// reaches the device until then.

use std::fmt;
use std::sync::Arc;

use futures_util::future::join_all;
use spectra_backend::{Backend, Frame, MatrixDimensions, Rgb};
use tracing::{debug, warn};

use crate::batch::BatchReport;
use crate::catalog::DeviceCatalog;
use crate::error::CoreError;
use crate::model::DeviceKey;

/// Hands out [`MatrixHandle`]s for matrix-capable devices.
pub struct MatrixController {
    catalog: Arc<DeviceCatalog>,
}

impl MatrixController {
    pub fn new(catalog: Arc<DeviceCatalog>) -> Self {
        Self { catalog }
    }

    /// Open a staging handle for one device.
    ///
    /// `Ok(None)` when the device is unknown, does not advertise a matrix,
    /// or its backend reports the matrix as unsupported. Only the last case
    /// costs a backend call.
    pub async fn get_device_object(
        &self,
        backend: &str,
        uid: &str,
    ) -> Result<Option<MatrixHandle>, CoreError> {
        let Some(device) = self.catalog.get_device(backend, uid).await else {
            return Ok(None);
        };
        if !device.has_matrix() {
            return Ok(None);
        }
        let Some(handle) = self.catalog.registry().get_backend(backend) else {
            return Ok(None);
        };
        let Some(adapter) = handle.adapter().await else {
            return Err(CoreError::BackendUnavailable {
                backend: backend.to_owned(),
                reason: handle
                    .availability()
                    .reason()
                    .unwrap_or("adapter not constructed")
                    .to_owned(),
            });
        };

        match adapter.get_matrix(uid).await {
            Ok(dims) => {
                let handle = MatrixHandle::new(device.key.clone(), adapter, dims);
                if handle.is_none() {
                    warn!(
                        device = %device.key,
                        rows = dims.rows,
                        cols = dims.cols,
                        "backend reported an empty or oversized matrix"
                    );
                }
                Ok(handle)
            }
            Err(e) if e.is_unsupported() => {
                debug!(device = %device.key, "matrix advertised but unsupported");
                Ok(None)
            }
            Err(e) => {
                if e.is_unavailable() {
                    handle.mark_unavailable(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Paint every matrix-capable device with `paint` and draw it.
    ///
    /// Each device is independent: a failure is logged, recorded in the
    /// report and the remaining devices still draw.
    pub async fn fan_out<F>(&self, paint: F) -> BatchReport
    where
        F: Fn(&mut MatrixHandle) + Sync,
    {
        let devices = self.catalog.device_all().await;
        let targets: Vec<DeviceKey> = devices
            .iter()
            .filter(|d| d.has_matrix())
            .map(|d| d.key.clone())
            .collect();

        let paint = &paint;
        let outcomes = join_all(targets.into_iter().map(|key| async move {
            let outcome = self.paint_one(&key, paint).await;
            (key, outcome)
        }))
        .await;

        let mut report = BatchReport::default();
        for (key, outcome) in outcomes {
            if let Err(ref e) = outcome {
                warn!(device = %key, error = %e, "matrix draw failed, continuing");
            }
            report.record(key, outcome);
        }
        report
    }

    async fn paint_one<F>(&self, key: &DeviceKey, paint: &F) -> Result<(), CoreError>
    where
        F: Fn(&mut MatrixHandle) + Sync,
    {
        let Some(mut handle) = self.get_device_object(&key.backend, &key.uid).await? else {
            return Err(CoreError::Unsupported {
                operation: "matrix".into(),
                device: key.to_string(),
            });
        };
        paint(&mut handle);
        handle.draw().await
    }
}

// ── MatrixHandle ─────────────────────────────────────────────────────

/// A staged frame bound to one device.
pub struct MatrixHandle {
    key: DeviceKey,
    adapter: Arc<dyn Backend>,
    frame: Frame,
}

impl MatrixHandle {
    /// `None` unless `dimensions` is addressable.
    fn new(
        key: DeviceKey,
        adapter: Arc<dyn Backend>,
        dimensions: MatrixDimensions,
    ) -> Option<Self> {
        if !dimensions.is_addressable() {
            return None;
        }
        Some(Self {
            key,
            adapter,
            frame: Frame::new(dimensions)?,
        })
    }

    pub fn key(&self) -> &DeviceKey {
        &self.key
    }

    pub fn dimensions(&self) -> MatrixDimensions {
        self.frame.dimensions()
    }

    /// Stage one pixel.
    pub fn set(&mut self, row: usize, col: usize, r: u8, g: u8, b: u8) -> Result<(), CoreError> {
        self.set_rgb(row, col, Rgb::new(r, g, b))
    }

    /// Stage one pixel. Out-of-range coordinates leave the frame untouched.
    pub fn set_rgb(&mut self, row: usize, col: usize, colour: Rgb) -> Result<(), CoreError> {
        if self.frame.set(row, col, colour) {
            Ok(())
        } else {
            Err(CoreError::OutOfRange {
                row,
                col,
                rows: self.frame.rows,
                cols: self.frame.cols,
            })
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Rgb> {
        self.frame.get(row, col)
    }

    pub fn fill(&mut self, colour: Rgb) {
        self.frame.fill(colour);
    }

    pub fn clear(&mut self) {
        self.frame.clear();
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Send the staged frame to the device.
    ///
    /// The frame survives a failure, so calling `draw` again retries it.
    pub async fn draw(&self) -> Result<(), CoreError> {
        self.adapter
            .draw_matrix(&self.key.uid, &self.frame)
            .await
            .map_err(|e| CoreError::DeviceCommunication {
                device: self.key.to_string(),
                message: e.to_string(),
            })
    }
}

impl fmt::Debug for MatrixHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixHandle")
            .field("key", &self.key)
            .field("rows", &self.frame.rows)
            .field("cols", &self.frame.cols)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use spectra_backend::{MemoryBackend, RawDeviceDescriptor};

    use super::*;
    use crate::registry::BackendRegistry;

    fn controller(backend: Arc<MemoryBackend>) -> MatrixController {
        let adapter: Arc<dyn Backend> = backend;
        let registry = BackendRegistry::from_adapters(
            vec![adapter],
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        MatrixController::new(Arc::new(DeviceCatalog::new(registry)))
    }

    #[tokio::test]
    async fn out_of_range_leaves_frame_intact() {
        let matrix = controller(Arc::new(MemoryBackend::demo("mem")));
        let mut handle = matrix
            .get_device_object("mem", "kbd-0001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.dimensions(), MatrixDimensions::new(6, 22));

        handle.set(0, 0, 255, 0, 0).unwrap();
        let before = handle.frame().clone();

        let err = handle.set(6, 0, 0, 255, 0).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { rows: 6, cols: 22, .. }));
        assert!(handle.set(0, 22, 0, 255, 0).is_err());
        assert_eq!(handle.frame(), &before);
        assert_eq!(handle.get(0, 0), Some(Rgb::new(255, 0, 0)));
    }

    #[tokio::test]
    async fn redraw_sends_identical_frame() {
        let backend = Arc::new(MemoryBackend::demo("mem"));
        let matrix = controller(backend.clone());
        let mut handle = matrix
            .get_device_object("mem", "mat-0001")
            .await
            .unwrap()
            .unwrap();

        handle.fill(Rgb::new(0, 0, 255));
        handle.draw().await.unwrap();
        handle.draw().await.unwrap();

        let frames = backend.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].1, frames[1].1);
        assert_eq!(frames[0].1.get(0, 14), Some(Rgb::new(0, 0, 255)));
    }

    #[tokio::test]
    async fn failed_draw_keeps_the_frame() {
        let matrix = controller(Arc::new(MemoryBackend::demo("mem")));
        let mut handle = matrix
            .get_device_object("mem", "mouse-0001")
            .await
            .unwrap()
            .unwrap();
        handle.set(0, 1, 1, 2, 3).unwrap();

        let err = handle.draw().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::DeviceCommunication { ref device, .. } if device == "mem:mouse-0001"
        ));
        assert_eq!(handle.get(0, 1), Some(Rgb::new(1, 2, 3)));
    }

    #[tokio::test]
    async fn oversized_matrix_has_no_handle() {
        let backend = MemoryBackend::new("m").with_device(RawDeviceDescriptor {
            uid: "big".into(),
            matrix: Some(MatrixDimensions::new(1 << 33, 1 << 33)),
            ..RawDeviceDescriptor::default()
        });
        let matrix = controller(Arc::new(backend));
        assert!(matrix.get_device_object("m", "big").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn matrix_larger_than_advertised_has_no_handle() {
        let backend = Arc::new(MemoryBackend::new("m").with_device(RawDeviceDescriptor {
            uid: "strip".into(),
            matrix: Some(MatrixDimensions::new(1, 8)),
            ..RawDeviceDescriptor::default()
        }));
        let matrix = controller(backend.clone());
        matrix.get_device_object("m", "strip").await.unwrap().unwrap();

        backend.insert_device(RawDeviceDescriptor {
            uid: "strip".into(),
            matrix: Some(MatrixDimensions::new(usize::MAX, 2)),
            ..RawDeviceDescriptor::default()
        });
        assert!(matrix.get_device_object("m", "strip").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_device_has_no_handle() {
        let matrix = controller(Arc::new(MemoryBackend::demo("mem")));
        assert!(matrix.get_device_object("mem", "nope").await.unwrap().is_none());
        assert!(matrix.get_device_object("other", "kbd-0001").await.unwrap().is_none());
    }
}
