use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

mod client;
mod parse;

pub use client::{DEFAULT_ENDPOINT, GoogleVision};
pub use parse::parse_response;

/// Polygon corner as reported by the provider. Zero-valued coordinates are
/// omitted from the wire format, so either axis may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Vertex {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }

    pub fn coords(&self) -> Option<(i32, i32)> {
        self.x.zip(self.y)
    }
}

/// Corners A, B, C, D in clockwise order starting at the nominal top-left.
pub type Polygon = [Vertex; 4];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub polygon: Polygon,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub full_text: String,
    pub words: Vec<Word>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.full_text.is_empty() && self.words.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotateResponse {
    #[serde(default)]
    pub responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotateImageResponse {
    #[serde(rename = "textAnnotations")]
    pub text_annotations: Option<Vec<EntityAnnotation>>,
    pub error: Option<ProviderStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityAnnotation {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "boundingPoly", default)]
    pub bounding_poly: BoundingPoly,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderStatus {
    pub code: Option<i64>,
    pub message: Option<String>,
}

pub type RecognizeFuture =
    Pin<Box<dyn Future<Output = anyhow::Result<AnnotateResponse>> + Send>>;

/// Text recognition backend consumed by the gateway worker.
pub trait Recognizer: Send + Sync + 'static {
    fn annotate(&self, image: Vec<u8>) -> RecognizeFuture;
}
