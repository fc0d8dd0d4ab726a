//! Image loading and batch assembly for burn data loaders.
//!
//! `load_image_chw` is the single preprocessing path shared by training and
//! inference: decode, force RGB, resize to the configured geometry, scale
//! to `[0, 1]`, lay out channels-first. Nothing else touches pixels.

use std::marker::PhantomData;
use std::path::Path;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use image::imageops::FilterType;

use crate::error::{Result, SkinScanError};
use crate::labels::NUM_LABELS;

use super::table::{ImageRecord, SplitTable};

/// Decode an image into a normalized channels-first float buffer.
///
/// The result has length `3 * height * width`. Images are resized to the
/// exact target geometry regardless of aspect ratio.
pub fn load_image_chw(path: &Path, height: usize, width: usize) -> Result<Vec<f32>> {
    let img = image::open(path).map_err(|e| SkinScanError::ImageLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let img = img
        .resize_exact(width as u32, height as u32, FilterType::Triangle)
        .to_rgb8();

    let mut chw = vec![0.0f32; 3 * height * width];
    let plane = height * width;
    for (i, pixel) in img.pixels().enumerate() {
        chw[i] = pixel.0[0] as f32 / 255.0;
        chw[plane + i] = pixel.0[1] as f32 / 255.0;
        chw[2 * plane + i] = pixel.0[2] as f32 / 255.0;
    }
    Ok(chw)
}

/// One loaded example: normalized pixels plus its multi-hot target.
#[derive(Debug, Clone)]
pub struct SkinItem {
    pub image: Vec<f32>,
    pub targets: [f32; NUM_LABELS],
}

/// Lazily-decoding dataset over one split's records.
#[derive(Debug, Clone)]
pub struct SkinDataset {
    records: Vec<ImageRecord>,
    height: usize,
    width: usize,
}

impl SkinDataset {
    /// Bind a split table to an input geometry.
    ///
    /// Every record's image file must exist; the first missing one fails
    /// construction. Returning `None` from `Dataset::get` would instead
    /// silently truncate the stream at that index.
    pub fn new(table: SplitTable, height: usize, width: usize) -> Result<Self> {
        for record in &table.records {
            if !record.image_path.is_file() {
                return Err(SkinScanError::ImageLoad {
                    path: record.image_path.clone(),
                    message: "file not found".to_string(),
                });
            }
        }
        Ok(Self {
            records: table.records,
            height,
            width,
        })
    }
}

impl Dataset<SkinItem> for SkinDataset {
    fn get(&self, index: usize) -> Option<SkinItem> {
        let record = self.records.get(index)?;
        // The trait cannot surface errors; a decode failure mid-epoch must
        // abort the stage, never shorten the stream.
        let image = match load_image_chw(&record.image_path, self.height, self.width) {
            Ok(image) => image,
            Err(e) => panic!("{e}"),
        };
        Some(SkinItem {
            image,
            targets: record.targets,
        })
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// One assembled batch: `[batch, 3, h, w]` images, `[batch, labels]` targets.
#[derive(Debug, Clone)]
pub struct SkinBatch<B: Backend> {
    pub images: Tensor<B, 4>,
    pub targets: Tensor<B, 2, Int>,
}

/// Assembles [`SkinItem`]s into tensors on the loader's device.
#[derive(Debug, Clone)]
pub struct SkinBatcher<B: Backend> {
    height: usize,
    width: usize,
    _backend: PhantomData<B>,
}

impl<B: Backend> SkinBatcher<B> {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, SkinItem, SkinBatch<B>> for SkinBatcher<B> {
    fn batch(&self, items: Vec<SkinItem>, device: &B::Device) -> SkinBatch<B> {
        let batch_size = items.len();

        let mut pixels = Vec::with_capacity(batch_size * 3 * self.height * self.width);
        let mut targets = Vec::with_capacity(batch_size * NUM_LABELS);
        for item in items {
            pixels.extend_from_slice(&item.image);
            targets.extend(item.targets.iter().map(|&t| t as i64));
        }

        SkinBatch {
            images: Tensor::from_data(
                TensorData::new(pixels, [batch_size, 3, self.height, self.width]),
                device,
            ),
            targets: Tensor::from_data(
                TensorData::new(targets, [batch_size, NUM_LABELS]),
                device,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::table::Split;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    fn write_image(path: &Path, color: [u8; 3], size: u32) {
        let mut img = RgbImage::new(size, size);
        for pixel in img.pixels_mut() {
            *pixel = Rgb(color);
        }
        img.save(path).unwrap();
    }

    #[test]
    fn test_load_image_chw_normalizes_and_resizes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("red.png");
        write_image(&path, [255, 0, 0], 48);

        let chw = load_image_chw(&path, 8, 8).unwrap();
        assert_eq!(chw.len(), 3 * 8 * 8);
        // Red plane saturated, green and blue empty.
        assert!(chw[..64].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(chw[64..].iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn test_load_image_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.jpg");
        assert!(matches!(
            load_image_chw(&missing, 8, 8),
            Err(SkinScanError::ImageLoad { .. })
        ));
    }

    #[test]
    fn test_batcher_shapes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grey.png");
        write_image(&path, [128, 128, 128], 8);

        let mut targets = [0.0f32; NUM_LABELS];
        targets[3] = 1.0;
        let item = SkinItem {
            image: load_image_chw(&path, 8, 8).unwrap(),
            targets,
        };

        let batcher = SkinBatcher::<TestBackend>::new(8, 8);
        let device = Default::default();
        let batch = batcher.batch(vec![item.clone(), item], &device);

        assert_eq!(batch.images.dims(), [2, 3, 8, 8]);
        assert_eq!(batch.targets.dims(), [2, NUM_LABELS]);

        let flat: Vec<i64> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(flat.iter().sum::<i64>(), 2);
        assert_eq!(flat[3], 1);
        assert_eq!(flat[NUM_LABELS + 3], 1);
    }

    #[test]
    fn test_dataset_decodes_lazily_per_index() {
        let tmp = tempfile::tempdir().unwrap();
        let split_dir = tmp.path().join("train");
        std::fs::create_dir_all(&split_dir).unwrap();
        write_image(&split_dir.join("a.png"), [0, 255, 0], 8);

        let header: String = format!("filename, {}", crate::labels::LABELS.join(", "));
        std::fs::write(
            split_dir.join(super::super::CSV_NAME),
            format!("{header}\na.png, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0\n"),
        )
        .unwrap();

        let table = SplitTable::load(tmp.path(), Split::Train).unwrap();
        let dataset = SkinDataset::new(table, 8, 8).unwrap();
        assert_eq!(dataset.len(), 1);

        let item = dataset.get(0).unwrap();
        assert_eq!(item.targets[1], 1.0);
        assert!(dataset.get(1).is_none());
    }

    #[test]
    fn test_dataset_rejects_records_with_missing_images() {
        let tmp = tempfile::tempdir().unwrap();
        let split_dir = tmp.path().join("train");
        std::fs::create_dir_all(&split_dir).unwrap();
        write_image(&split_dir.join("a.png"), [0, 255, 0], 8);

        let header: String = format!("filename, {}", crate::labels::LABELS.join(", "));
        std::fs::write(
            split_dir.join(super::super::CSV_NAME),
            format!(
                "{header}\na.png, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0\nghost.png, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0\n"
            ),
        )
        .unwrap();

        let table = SplitTable::load(tmp.path(), Split::Train).unwrap();
        match SkinDataset::new(table, 8, 8) {
            Err(SkinScanError::ImageLoad { path, .. }) => {
                assert!(path.ends_with("ghost.png"));
            }
            other => panic!("expected image load error, got {other:?}"),
        }
    }
}
