use anyhow::Result;
use image::{GrayImage, Luma};
use ridgeid_vision::{FingerprintEmbedder, ModelPair, ModelSource};

const SEG_MODEL: &str = "unet_segmentation_v1_0";
const REC_MODEL: &str = "siamese_network_v1_0";

fn model_dir() -> Option<std::path::PathBuf> {
    std::env::var_os("RIDGEID_MODEL_DIR").map(Into::into)
}

/// Synthetic ridge-like pattern: horizontal sine stripes.
fn synthetic_print(width: u32, height: u32, phase: f32) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let v = ((y as f32 * 0.7 + x as f32 * 0.05 + phase).sin() * 0.5 + 0.5) * 255.0;
        *pixel = Luma([v as u8]);
    }
    img
}

/// End-to-end pass over real artifacts when a model directory is provided.
#[test]
fn test_embedding_pass_on_real_models() -> Result<()> {
    env_logger::try_init().ok();
    let Some(dir) = model_dir() else {
        eprintln!("Skipping: RIDGEID_MODEL_DIR not set");
        return Ok(());
    };

    let source = ModelSource::new(&dir);
    let mut pair = ModelPair::load(&source, SEG_MODEL, REC_MODEL)?;

    let print = synthetic_print(320, 240, 0.0);
    let embedding = pair.embed_image(&print)?;

    println!("embedding dims: {}", embedding.len());
    assert!(!embedding.is_empty());
    assert!(embedding.iter().all(|v| v.is_finite()));

    // Same image, same vector.
    let again = pair.embed_image(&print)?;
    assert_eq!(embedding, again);
    Ok(())
}

#[test]
fn test_distinct_inputs_differ() -> Result<()> {
    env_logger::try_init().ok();
    let Some(dir) = model_dir() else {
        eprintln!("Skipping: RIDGEID_MODEL_DIR not set");
        return Ok(());
    };

    let source = ModelSource::new(&dir);
    let mut pair = ModelPair::load(&source, SEG_MODEL, REC_MODEL)?;

    let a = pair.embed_image(&synthetic_print(320, 240, 0.0))?;
    let b = pair.embed_image(&synthetic_print(320, 240, 1.3))?;

    assert_eq!(a.len(), b.len());
    assert_ne!(a, b, "different prints produced an identical raw embedding");
    Ok(())
}
