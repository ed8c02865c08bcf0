//! Media uploads.
//!
//! Uploading is a three-step dance: ask the server for an upload URL over the
//! WebSocket, POST the bytes to that URL over HTTP, then (for files and
//! videos) wait for the attach-completion push confirming server-side
//! processing.  Photos skip the third step; their upload response already
//! carries the attach token.
//!
//! The HTTP step is the only part governed by the configured
//! [`crate::UploadRetryPolicy`]; a 4xx response or a protocol failure is
//! never retried.

use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::path::Path;

use oneme_proto::opcode;
use serde_json::{json, Value};

use crate::errors::Error;
use crate::retry::RetryContext;
use crate::Client;

// ─── UploadedAttach ───────────────────────────────────────────────────────────

/// The attach document produced by a finished upload, ready to be put on an
/// outgoing message.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadedAttach {
    Photo { photo_token: String },
    File { file_id: i64 },
    Video { video_id: i64, token: String },
}

impl UploadedAttach {
    /// The wire form, as expected inside a message's `attaches` array.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Photo { photo_token } => json!({"_type": "PHOTO", "photoToken": photo_token}),
            Self::File { file_id }      => json!({"_type": "FILE", "fileId": file_id}),
            Self::Video { video_id, token } => {
                json!({"_type": "VIDEO", "videoId": video_id, "token": token})
            }
        }
    }
}

// ─── Uploads ──────────────────────────────────────────────────────────────────

impl Client {
    /// Upload an image.  The multipart response already carries the photo
    /// token, so no completion push is awaited.
    pub async fn upload_photo(&self, path: impl AsRef<Path>) -> Result<UploadedAttach, Error> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let ext  = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let frame = self.call(opcode::PHOTO_UPLOAD, json!({"count": 1})).await?;
        let url = frame
            .payload
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Decode("photo upload response carries no url".into()))?
            .to_string();

        log::info!("[oneme] Uploading photo {} ({} bytes) …", path.display(), data.len());
        let response = self
            .post_with_retry(|| {
                let part = reqwest::multipart::Part::bytes(data.clone())
                    .file_name(format!("image.{ext}"))
                    .mime_str(mime.essence_str());
                part.map(|part| {
                    self.http()
                        .post(&url)
                        .multipart(reqwest::multipart::Form::new().part("file", part))
                })
            })
            .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Decode(format!("undecodable photo upload response: {e}")))?;
        let token = body
            .get("photos")
            .and_then(Value::as_object)
            .and_then(|photos| photos.values().next())
            .and_then(|entry| entry.get("token"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Decode("photo upload response carries no token".into()))?;

        Ok(UploadedAttach::Photo { photo_token: token.to_string() })
    }

    /// Upload an arbitrary file and wait for the server to confirm processing.
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadedAttach, Error> {
        let frame = self.call(opcode::FILE_UPLOAD, json!({"count": 1})).await?;
        let slot = upload_slot(&frame.payload, "fileId")?;

        self.post_raw_bytes(path.as_ref(), &slot.url).await?;
        self.await_upload(slot.resource_id, self.request_timeout()).await?;
        Ok(UploadedAttach::File { file_id: slot.resource_id })
    }

    /// Upload a video and wait for the server to confirm processing.
    pub async fn upload_video(&self, path: impl AsRef<Path>) -> Result<UploadedAttach, Error> {
        let frame = self.call(opcode::VIDEO_UPLOAD, json!({"count": 1})).await?;
        let slot  = upload_slot(&frame.payload, "videoId")?;
        let token = frame
            .payload
            .pointer("/info/0/token")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Decode("video upload response carries no token".into()))?
            .to_string();

        self.post_raw_bytes(path.as_ref(), &slot.url).await?;
        self.await_upload(slot.resource_id, self.request_timeout()).await?;
        Ok(UploadedAttach::Video { video_id: slot.resource_id, token })
    }

    /// The raw-bytes POST used by file and video uploads: whole content in
    /// one request, described by a range header.
    async fn post_raw_bytes(&self, path: &Path, url: &str) -> Result<(), Error> {
        let data = tokio::fs::read(path).await?;
        if data.is_empty() {
            return Err(Error::InvalidInput(format!("{} is empty", path.display())));
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let disposition = format!("attachment; filename={name}");
        let range = format!("0-{}/{}", data.len() - 1, data.len());

        log::info!("[oneme] Uploading {} ({} bytes) …", path.display(), data.len());
        self.post_with_retry(|| {
            Ok(self
                .http()
                .post(url)
                .header("Content-Disposition", disposition.clone())
                .header("Content-Range", range.clone())
                .body(data.clone()))
        })
        .await
        .map(drop)
    }

    /// Run one HTTP POST under the configured retry policy.  The closure
    /// rebuilds the request for every attempt.
    async fn post_with_retry<F>(&self, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn() -> Result<reqwest::RequestBuilder, reqwest::Error>,
    {
        let mut fails = 0u32;
        let mut slept = std::time::Duration::ZERO;
        loop {
            let error = match build() {
                Ok(request) => match request.send().await {
                    Ok(response) => match classify_status(response) {
                        Ok(response) => return Ok(response),
                        Err(e) => e,
                    },
                    Err(e) => classify_send_error(e),
                },
                Err(e) => Error::InvalidInput(e.to_string()),
            };

            fails += 1;
            let ctx = RetryContext {
                fail_count:   NonZeroU32::new(fails).unwrap_or(NonZeroU32::MIN),
                slept_so_far: slept,
                error,
            };
            match self.upload_retry().should_retry(&ctx) {
                ControlFlow::Break(())       => return Err(ctx.error),
                ControlFlow::Continue(delay) => {
                    tokio::time::sleep(delay).await;
                    slept += delay;
                }
            }
        }
    }
}

/// The URL and resource id of one granted upload slot, from `info[0]`.
struct UploadSlot {
    url:         String,
    resource_id: i64,
}

fn upload_slot(payload: &Value, id_field: &str) -> Result<UploadSlot, Error> {
    let entry = payload
        .pointer("/info/0")
        .ok_or_else(|| Error::Decode("upload response carries no slot info".into()))?;
    let url = entry
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Decode("upload slot carries no url".into()))?
        .to_string();
    let resource_id = entry
        .get(id_field)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Decode(format!("upload slot carries no {id_field}")))?;
    Ok(UploadSlot { url, resource_id })
}

/// 5xx is transient and eligible for retry; any other non-success is final.
fn classify_status(response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status.is_server_error() {
        Err(Error::Temporary(format!("upload failed with status {}", status.as_u16())))
    } else {
        Err(Error::Network(format!("upload failed with status {}", status.as_u16())))
    }
}

fn classify_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        Error::Temporary(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_wire_forms() {
        let photo = UploadedAttach::Photo { photo_token: "tok".into() };
        assert_eq!(photo.to_value(), json!({"_type": "PHOTO", "photoToken": "tok"}));

        let file = UploadedAttach::File { file_id: 7 };
        assert_eq!(file.to_value(), json!({"_type": "FILE", "fileId": 7}));

        let video = UploadedAttach::Video { video_id: 9, token: "v".into() };
        assert_eq!(video.to_value(), json!({"_type": "VIDEO", "videoId": 9, "token": "v"}));
    }

    #[test]
    fn upload_slot_is_read_from_first_info_entry() {
        let payload = json!({"info": [{"url": "https://u", "fileId": 5}]});
        let slot = upload_slot(&payload, "fileId").unwrap();
        assert_eq!(slot.url, "https://u");
        assert_eq!(slot.resource_id, 5);
    }

    #[test]
    fn upload_slot_missing_id_is_a_decode_error() {
        let payload = json!({"info": [{"url": "https://u"}]});
        assert!(matches!(upload_slot(&payload, "videoId"), Err(Error::Decode(_))));
    }
}
