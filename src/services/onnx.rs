// ONNX Runtime session builder with automatic hardware acceleration detection

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{debug, info, warn};

#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;

#[cfg(all(target_os = "macos", feature = "coreml"))]
use ort::execution_providers::CoreMLExecutionProvider;

/// Intra-op thread count for CPU inference. Windows is capped at 6 threads;
/// past that, synchronization overhead outweighs the extra cores
/// (https://github.com/microsoft/onnxruntime/issues/3713).
fn intra_op_threads() -> usize {
    let total_cores = num_cpus::get();

    #[cfg(target_os = "windows")]
    let optimal = std::cmp::min(6, total_cores).max(1);

    #[cfg(not(target_os = "windows"))]
    let optimal = total_cores.max(1);

    debug!(
        "CPU threads: {} total cores, using {} for inference",
        total_cores, optimal
    );
    optimal
}

/// Build a session for `model_path`, trying GPU execution providers first
/// and falling back to CPU. `forced` pins a specific backend instead of
/// auto-detecting.
///
/// Returns (backend_name, session).
pub fn build_session(
    model_path: &Path,
    model_name: &str,
    forced: Option<&str>,
) -> Result<(String, Session)> {
    if let Some(backend) = forced {
        return forced_backend(backend, model_path, model_name);
    }

    // Try CUDA (if feature enabled)
    #[cfg(feature = "cuda")]
    {
        if let Ok(session) = Session::builder()
            .and_then(|b| b.with_execution_providers([CUDAExecutionProvider::default().build()]))
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(intra_op_threads()))
            .and_then(|b| b.with_inter_threads(1))
            .and_then(|b| b.commit_from_file(model_path))
        {
            info!("using CUDA acceleration for {} model", model_name);
            return Ok(("CUDA".to_string(), session));
        }
    }

    // Try CoreML (Apple Silicon, if feature enabled)
    #[cfg(all(target_os = "macos", feature = "coreml"))]
    {
        if let Ok(session) = Session::builder()
            .and_then(|b| b.with_execution_providers([CoreMLExecutionProvider::default().build()]))
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(intra_op_threads()))
            .and_then(|b| b.with_inter_threads(1))
            .and_then(|b| b.commit_from_file(model_path))
        {
            info!("using CoreML acceleration for {} model", model_name);
            return Ok(("CoreML".to_string(), session));
        }
    }

    // Final fallback: pure CPU
    let session = cpu_session(model_path, model_name)?;
    warn!(
        "using CPU-only inference for {} model (no GPU acceleration available)",
        model_name
    );
    Ok(("CPU".to_string(), session))
}

fn cpu_session(model_path: &Path, model_name: &str) -> Result<Session> {
    Session::builder()
        .context("failed to create ONNX session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("failed to configure CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("failed to set graph optimization level")?
        .with_intra_threads(intra_op_threads())
        .context("failed to configure intra-op threads")?
        .with_inter_threads(1)
        .context("failed to configure inter-op threads")?
        .commit_from_file(model_path)
        .with_context(|| {
            format!(
                "failed to load {} ONNX model from {}",
                model_name,
                model_path.display()
            )
        })
}

/// Pin a specific backend (from the INFERENCE_BACKEND override).
fn forced_backend(backend: &str, model_path: &Path, model_name: &str) -> Result<(String, Session)> {
    match backend {
        #[cfg(feature = "cuda")]
        "cuda" => {
            let session = Session::builder()
                .context("failed to create ONNX session builder")?
                .with_execution_providers([CUDAExecutionProvider::default().build()])
                .context("failed to configure CUDA execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("failed to set graph optimization level")?
                .with_intra_threads(intra_op_threads())
                .context("failed to configure intra-op threads")?
                .with_inter_threads(1)
                .context("failed to configure inter-op threads")?
                .commit_from_file(model_path)
                .context("failed to load model with CUDA")?;
            info!("forced CUDA backend for {} model", model_name);
            Ok(("CUDA".to_string(), session))
        }

        "cpu" => {
            let session = cpu_session(model_path, model_name)?;
            info!("forced CPU backend for {} model", model_name);
            Ok(("CPU".to_string(), session))
        }

        _ => {
            warn!(
                "unknown inference backend '{}', falling back to auto-detection for {} model",
                backend, model_name
            );
            build_session(model_path, model_name, None)
        }
    }
}
