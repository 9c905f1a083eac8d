// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Remote label store access.
//!
//! Datasets live under `{api_base}/datasets/{dataset_id}` and expose a
//! path-addressed protocol: list items, fetch an image, read a label and
//! write a label. The adapter is stateless and never retries.

use crate::error::{SyncError, TransportError};
use crate::models::annotation::LabelPayload;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

/// One entry of a dataset listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetItem {
    pub image_rel: String,
    pub label_rel: String,
    #[serde(default)]
    pub has_label: bool,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<DatasetItem>,
}

#[derive(Debug, Serialize)]
struct SaveRequest<'a> {
    path: &'a str,
    data: &'a LabelPayload,
}

/// Storage backend for dataset items and their labels.
pub trait LabelStore: Send + Sync {
    /// List every item of the dataset, in store order.
    fn list_items(&self, dataset_id: &str) -> Result<Vec<DatasetItem>, SyncError>;

    /// Load a label; `Ok(None)` means the store has no label for it yet.
    fn load_label(&self, dataset_id: &str, label_rel: &str)
        -> Result<Option<LabelPayload>, SyncError>;

    /// Persist a label payload verbatim.
    fn save_label(
        &self,
        dataset_id: &str,
        label_rel: &str,
        payload: &LabelPayload,
    ) -> Result<(), SyncError>;

    /// Fetch the encoded bytes of an image.
    fn fetch_image(&self, dataset_id: &str, image_rel: &str) -> Result<Vec<u8>, SyncError>;

    /// Displayable URL of an image resource.
    fn image_url(&self, dataset_id: &str, image_rel: &str) -> String;
}

/// [`LabelStore`] speaking HTTP to a dataset server.
pub struct HttpLabelStore {
    client: Client,
    api_base: String,
}

impl HttpLabelStore {
    pub fn new(api_base: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, dataset_id: &str, endpoint: &str) -> String {
        format!("{}/datasets/{}/{}", self.api_base, dataset_id, endpoint)
    }

    fn get(&self, url: &str, path: Option<&str>) -> Result<Response, TransportError> {
        let mut request = self.client.get(url);
        if let Some(path) = path {
            request = request.query(&[("path", path)]);
        }
        Ok(request.send()?)
    }
}

fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Interpret a label GET response.
///
/// 204 means "no label yet". JSON content is kept as raw JSON, anything else
/// as text, both unchanged.
pub fn label_from_response(
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
    url: &str,
) -> Result<Option<LabelPayload>, TransportError> {
    if status == 204 {
        return Ok(None);
    }
    if !(200..300).contains(&status) {
        return Err(TransportError::Status {
            status,
            url: url.to_string(),
        });
    }

    let is_json = content_type.is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        Ok(Some(LabelPayload::Json(serde_json::from_slice(body)?)))
    } else {
        Ok(Some(LabelPayload::Text(String::from_utf8_lossy(body).into_owned())))
    }
}

impl LabelStore for HttpLabelStore {
    fn list_items(&self, dataset_id: &str) -> Result<Vec<DatasetItem>, SyncError> {
        let url = self.endpoint(dataset_id, "list");
        let listing = self
            .get(&url, None)
            .and_then(check_status)
            .and_then(|response| Ok(response.json::<ListResponse>()?))
            .map_err(SyncError::List)?;
        log::debug!("Listed {} items of dataset {}", listing.items.len(), dataset_id);
        Ok(listing.items)
    }

    fn load_label(
        &self,
        dataset_id: &str,
        label_rel: &str,
    ) -> Result<Option<LabelPayload>, SyncError> {
        let url = self.endpoint(dataset_id, "label");
        let fetch = || -> Result<Option<LabelPayload>, TransportError> {
            let response = self.get(&url, Some(label_rel))?;
            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes()?;
            label_from_response(status, content_type.as_deref(), &body, &final_url)
        };
        fetch().map_err(SyncError::Load)
    }

    fn save_label(
        &self,
        dataset_id: &str,
        label_rel: &str,
        payload: &LabelPayload,
    ) -> Result<(), SyncError> {
        let url = self.endpoint(dataset_id, "label");
        let body = SaveRequest {
            path: label_rel,
            data: payload,
        };
        self.client
            .put(&url)
            .json(&body)
            .send()
            .map_err(TransportError::from)
            .and_then(check_status)
            .map_err(SyncError::Save)?;
        log::debug!("Saved label {} of dataset {}", label_rel, dataset_id);
        Ok(())
    }

    fn fetch_image(&self, dataset_id: &str, image_rel: &str) -> Result<Vec<u8>, SyncError> {
        let url = self.endpoint(dataset_id, "image");
        self.get(&url, Some(image_rel))
            .and_then(check_status)
            .and_then(|response| Ok(response.bytes()?.to_vec()))
            .map_err(SyncError::Image)
    }

    fn image_url(&self, dataset_id: &str, image_rel: &str) -> String {
        let base = self.endpoint(dataset_id, "image");
        match reqwest::Url::parse_with_params(&base, &[("path", image_rel)]) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}?path={}", base, image_rel),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::{LabelBox, LabelData};
    use serde_json::json;

    #[test]
    fn test_label_absent_on_204() {
        let result = label_from_response(204, None, b"", "u").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_label_json_content() {
        let body = br#"{"boxes":[[0,0,10,10]],"names":{}}"#;
        let result =
            label_from_response(200, Some("application/json; charset=utf-8"), body, "u").unwrap();
        assert_eq!(
            result,
            Some(LabelPayload::Json(json!({"boxes": [[0, 0, 10, 10]], "names": {}})))
        );
    }

    #[test]
    fn test_label_text_passes_through() {
        let body = b"0 0.5 0.5 0.2 0.2\n1 0.1 0.1 0.05 0.05\n";
        let result = label_from_response(200, Some("text/plain"), body, "u").unwrap();
        assert_eq!(
            result,
            Some(LabelPayload::Text("0 0.5 0.5 0.2 0.2\n1 0.1 0.1 0.05 0.05\n".to_string()))
        );
    }

    #[test]
    fn test_label_error_status() {
        let err = label_from_response(404, Some("application/json"), b"{}", "http://x/label")
            .unwrap_err();
        match err {
            TransportError::Status { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, "http://x/label");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_label_invalid_json_is_an_error() {
        assert!(label_from_response(200, Some("application/json"), b"{oops", "u").is_err());
    }

    #[test]
    fn test_save_request_shape() {
        let data = LabelData::new(vec![LabelBox::new(1.0, 2.0, 3.0, 4.0)], Default::default());
        let structured = LabelPayload::from(data);
        let body = SaveRequest {
            path: "labels/a.json",
            data: &structured,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"path": "labels/a.json", "data": {"boxes": [[1.0, 2.0, 3.0, 4.0]], "names": {}}})
        );

        let text = LabelPayload::Text("raw".into());
        let body = SaveRequest {
            path: "a.txt",
            data: &text,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"path": "a.txt", "data": "raw"})
        );
    }

    #[test]
    fn test_list_response_defaults() {
        let parsed: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());

        let parsed: ListResponse = serde_json::from_str(
            r#"{"items":[{"image_rel":"img/a.jpg","label_rel":"lbl/a.json","has_label":true}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert!(parsed.items[0].has_label);
    }

    #[test]
    fn test_urls() {
        let store = HttpLabelStore::new("http://localhost:5000/").unwrap();
        assert_eq!(store.endpoint("cats", "list"), "http://localhost:5000/datasets/cats/list");
        assert_eq!(
            store.image_url("cats", "img/a b.jpg"),
            "http://localhost:5000/datasets/cats/image?path=img%2Fa+b.jpg"
        );
    }
}
