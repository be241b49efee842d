//! Command endpoint handlers.
//!
//! Each handler validates its request, starts the actual work and
//! returns once the work is running. Success or failure of the work
//! itself is reported by sentinel lines on stdout from a detached
//! watcher task, never by the HTTP response.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, info};
use validator::Validate;

use squash_media::{
    content_length, run_ffprobe, scale_pad_filter, spawn_fetch, verify_fetched, FfmpegCommand,
};
use squash_models::{protocol, CompressRequest, DownloadRequest, Envelope};

use crate::error::{WorkerError, WorkerResult};
use crate::sentinel;
use crate::state::{AppState, InputFile};

const AUDIO_CODEC: &str = "aac";
const AUDIO_SAMPLE_RATE_HZ: u32 = 44_100;

fn validation_details(errors: &validator::ValidationErrors) -> serde_json::Value {
    serde_json::to_value(errors).unwrap_or_else(|_| serde_json::Value::String(errors.to_string()))
}

/// `POST /download`
///
/// Starts fetching the source file. Responds 201 as soon as the fetch
/// process is running; DOWNLOAD_COMPLETED or DOWNLOAD_FAILED follows on
/// stdout once it finishes and the byte length has been checked.
pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<DownloadRequest>, JsonRejection>,
) -> WorkerResult<(StatusCode, Json<Envelope>)> {
    let Json(req) = body.map_err(|rejection| {
        sentinel::emit(protocol::DOWNLOAD_FAILED);
        WorkerError::bad_request_with(
            "invalid request body",
            "invalid_request_body",
            rejection.body_text(),
        )
    })?;

    if let Err(errors) = req.validate() {
        sentinel::emit(protocol::DOWNLOAD_FAILED);
        return Err(WorkerError::bad_request_with(
            "missing required fields",
            "missing_fields",
            validation_details(&errors),
        ));
    }

    let expected = match content_length(&req.url).await {
        Ok(len) => len,
        Err(e) => {
            error!(error = %e, "could not determine source file size");
            sentinel::emit(protocol::DOWNLOAD_FAILED);
            return Err(WorkerError::internal(
                "could not determine source file size",
                "fetch_error",
            ));
        }
    };

    let path = state.input_path(&req.container);
    let mut child = match spawn_fetch(&req.url, &path) {
        Ok(child) => child,
        Err(e) => {
            error!(error = %e, "could not start download");
            sentinel::emit(protocol::DOWNLOAD_FAILED);
            return Err(WorkerError::internal(
                "could not start download",
                "fetch_error",
            ));
        }
    };

    *state.input.lock().await = Some(InputFile {
        path: path.clone(),
        container: req.container.clone(),
    });

    info!(container = %req.container, expected_bytes = expected, "download started");

    tokio::spawn(async move {
        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "failed waiting for download process");
                sentinel::emit(protocol::DOWNLOAD_FAILED);
                return;
            }
        };

        if !status.success() {
            error!(%status, "download process exited with failure");
            sentinel::emit(protocol::DOWNLOAD_FAILED);
            return;
        }

        match verify_fetched(&path, expected).await {
            Ok(()) => {
                info!(bytes = expected, "download completed");
                sentinel::emit(protocol::DOWNLOAD_COMPLETED);
            }
            Err(e) => {
                error!(error = %e, "downloaded file failed validation");
                sentinel::emit(protocol::DOWNLOAD_FAILED);
            }
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(201, "file download started", None)),
    ))
}

/// `POST /probe`
///
/// Runs ffprobe on the downloaded input. Unlike the other commands this
/// is synchronous: the stream metadata goes both into the response body
/// and onto stdout as a bracketed probe block.
pub async fn probe(State(state): State<AppState>) -> WorkerResult<(StatusCode, Json<Envelope>)> {
    let input = state.input.lock().await.clone();
    let Some(input) = input else {
        sentinel::emit(protocol::PROBE_FAILED);
        return Err(WorkerError::bad_request(
            "no input file has been downloaded",
            "no_input",
        ));
    };

    match run_ffprobe(&input.path).await {
        Ok(result) => {
            info!(streams = result.streams.len(), "probe completed");
            sentinel::emit_probe_data(&result);
            let data = serde_json::to_value(&result).ok();
            Ok((
                StatusCode::OK,
                Json(Envelope::success(200, "probe completed", data)),
            ))
        }
        Err(e) => {
            error!(error = %e, "probe failed");
            sentinel::emit(protocol::PROBE_FAILED);
            Err(WorkerError::internal("probe failed", "ffprobe_error"))
        }
    }
}

/// `POST /compress`
///
/// Starts the transcode. Responds 201 and emits COMPRESSION_STARTED once
/// the ffmpeg process is running; exactly one of COMPRESSION_COMPLETED
/// or COMPRESSION_FAILED follows on stdout when it finishes.
pub async fn compress(
    State(state): State<AppState>,
    body: Result<Json<CompressRequest>, JsonRejection>,
) -> WorkerResult<(StatusCode, Json<Envelope>)> {
    let Json(req) = body.map_err(|rejection| {
        sentinel::emit(protocol::COMPRESSION_FAILED);
        WorkerError::bad_request_with(
            "invalid request body",
            "invalid_request_body",
            rejection.body_text(),
        )
    })?;

    if let Err(errors) = req.validate() {
        sentinel::emit(protocol::COMPRESSION_FAILED);
        return Err(WorkerError::bad_request_with(
            "invalid compression parameters",
            "invalid_parameters",
            validation_details(&errors),
        ));
    }

    let input_path = state.input_path(&req.input_container);
    if tokio::fs::metadata(&input_path).await.is_err() {
        sentinel::emit(protocol::COMPRESSION_FAILED);
        return Err(WorkerError::bad_request(
            "no input file has been downloaded",
            "no_input",
        ));
    }

    let output_path = state.output_path(&req.output_container);

    let command = FfmpegCommand::new(&input_path, &output_path)
        .video_filter(scale_pad_filter(req.max_width, req.max_height))
        .video_codec(&req.codec)
        .crf(req.crf)
        .preset(&req.preset)
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate_kbps(req.audio_bitrate)
        .audio_sample_rate(AUDIO_SAMPLE_RATE_HZ);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            error!(error = %e, "could not start compression");
            sentinel::emit(protocol::COMPRESSION_FAILED);
            return Err(WorkerError::internal(
                "could not start compression",
                "ffmpeg_error",
            ));
        }
    };

    info!(
        codec = %req.codec,
        max_width = req.max_width,
        max_height = req.max_height,
        "compression started"
    );
    sentinel::emit(protocol::COMPRESSION_STARTED);

    tokio::spawn(async move {
        let status = match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "failed waiting for compression process");
                sentinel::emit(protocol::COMPRESSION_FAILED);
                return;
            }
        };

        if status.success() && tokio::fs::metadata(&output_path).await.is_ok() {
            info!(output = %output_path.display(), "compression completed");
            sentinel::emit(protocol::COMPRESSION_COMPLETED);
        } else {
            error!(%status, "compression process exited with failure");
            sentinel::emit(protocol::COMPRESSION_FAILED);
        }
    });

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(201, "compression started", None)),
    ))
}
