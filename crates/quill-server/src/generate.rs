use std::convert::Infallible;

use axum::Extension;
use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use serde::Deserialize;

use quill_core::Identity;
use quill_ingest::{FileInput, allocate};
use quill_llm::GenerationJob;

use crate::error::{RequestError, relay_error_response};
use crate::state::AppState;

/// Upper bound on a JSON generation body; bulky uploads belong in the
/// multipart path
const MAX_JSON_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateBody {
    text: Option<String>,
    prompt: Option<String>,
    images: Option<Vec<String>>,
    staged_paths: Option<Vec<String>>,
}

/// `POST /v1/generate` — the metered generation endpoint
///
/// Accepts a JSON body (`{text?, prompt?, images?}`) or a multipart body
/// (`files…, prompt?`). Success is a raw streamed byte response; failures
/// are JSON with a machine-readable code.
pub async fn generate_handler(
    State(state): State<AppState>,
    identity: Option<Extension<Identity>>,
    request: Request,
) -> Response {
    let identity = identity.map(|Extension(identity)| identity);
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("multipart/form-data") {
        match Multipart::from_request(request, &()).await {
            Ok(multipart) => handle_multipart(state, identity, multipart).await,
            Err(_) => RequestError::InvalidFormData.into_response(),
        }
    } else {
        let bytes = match axum::body::to_bytes(request.into_body(), MAX_JSON_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(_) => return RequestError::InvalidJson.into_response(),
        };
        handle_json(state, identity, &bytes).await
    }
}

async fn handle_json(state: AppState, identity: Option<Identity>, body: &[u8]) -> Response {
    let Ok(body) = serde_json::from_slice::<GenerateBody>(body) else {
        return RequestError::InvalidJson.into_response();
    };

    if body.text.is_none() && body.prompt.is_none() && body.images.is_none() {
        return RequestError::EmptyRequest.into_response();
    }

    let text = body.text.as_deref().unwrap_or_default().trim();
    let prompt = body.prompt.as_deref().unwrap_or_default().trim();
    let images = body.images.unwrap_or_default();

    if let Some(bad) = images.iter().find(|url| !is_image_reference(url)) {
        tracing::debug!(reference = %bad, "rejecting image reference");
        return RequestError::InvalidImageUrls.into_response();
    }
    if text.is_empty() && prompt.is_empty() && images.is_empty() {
        return RequestError::NoContent.into_response();
    }

    // document text is what gets billed; a bare prompt is billed only when
    // it is the entire request
    let prompt_only = text.is_empty() && images.is_empty();
    let billable_chars = if text.is_empty() {
        prompt.chars().count()
    } else {
        text.chars().count()
    };

    let job = GenerationJob {
        identity,
        prompt: join_prompt(prompt, text),
        images,
        billable_chars,
        prompt_only,
        cleanup_paths: body.staged_paths.unwrap_or_default(),
    };
    run_generation(&state, job).await
}

async fn handle_multipart(
    state: AppState,
    identity: Option<Identity>,
    mut multipart: Multipart,
) -> Response {
    let mut files: Vec<FileInput> = Vec::new();
    let mut prompt = String::new();
    let mut staged_paths: Vec<String> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return RequestError::InvalidFormData.into_response(),
        };

        match field.name() {
            Some("files" | "file") => {
                let name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().map(str::to_owned);
                match field.bytes().await {
                    Ok(bytes) => files.push(FileInput {
                        name,
                        content_type,
                        bytes,
                    }),
                    Err(error) => {
                        tracing::warn!(%name, %error, "failed to read uploaded file");
                        return RequestError::FileProcessingError.into_response();
                    }
                }
            }
            Some("prompt") => match field.text().await {
                Ok(text) => prompt = text,
                Err(_) => return RequestError::InvalidFormData.into_response(),
            },
            Some("staged_path") => match field.text().await {
                Ok(path) => staged_paths.push(path),
                Err(_) => return RequestError::InvalidFormData.into_response(),
            },
            _ => {}
        }
    }

    if files.is_empty() {
        return RequestError::NoFilesUploaded.into_response();
    }

    let tier = state.resolver.resolve_tier(identity.as_ref()).await.tier;
    let allocation = allocate(&files, tier, &state.extractors);
    if !allocation.has_content() {
        return RequestError::NoReadableContent.into_response();
    }

    let job = GenerationJob {
        identity,
        prompt: join_prompt(prompt.trim(), &allocation.combined_text()),
        images: allocation.image_parts.clone(),
        billable_chars: allocation.total_raw_chars,
        prompt_only: false,
        cleanup_paths: staged_paths,
    };
    run_generation(&state, job).await
}

async fn run_generation(state: &AppState, job: GenerationJob) -> Response {
    match state.relay.generate(job).await {
        Ok(stream) => {
            let body = Body::from_stream(stream.map(Ok::<_, Infallible>));
            Response::builder()
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .header(CACHE_CONTROL, "no-cache")
                .body(body)
                .unwrap_or_else(|_| Response::new(Body::empty()))
        }
        Err(error) => relay_error_response(&error),
    }
}

fn join_prompt(instruction: &str, content: &str) -> String {
    match (instruction.is_empty(), content.is_empty()) {
        (false, false) => format!("{instruction}\n\n{content}"),
        (true, false) => content.to_owned(),
        _ => instruction.to_owned(),
    }
}

fn is_image_reference(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:")
}
