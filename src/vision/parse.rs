use crate::error::{Result, TrocrError};

use super::{AnnotateResponse, Annotations, EntityAnnotation, Polygon, Vertex, Word};

/// Shapes a raw annotate response into the full text plus per-word polygons.
///
/// An empty `responses` list means the provider saw nothing and yields empty
/// annotations; a response without annotations is either a provider error or
/// a benign "no text" outcome.
pub fn parse_response(response: AnnotateResponse) -> Result<Annotations> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Annotations::default());
    };

    let Some(annotations) = first.text_annotations else {
        if let Some(error) = first.error {
            return Err(TrocrError::Provider {
                code: error.code,
                message: error.message.unwrap_or_else(|| "unknown".to_string()),
            });
        }
        return Err(TrocrError::NoTextDetected);
    };

    let mut annotations = annotations.into_iter();
    let Some(summary) = annotations.next() else {
        return Err(TrocrError::NoTextDetected);
    };

    Ok(Annotations {
        full_text: summary.description,
        words: annotations.map(to_word).collect(),
    })
}

fn to_word(annotation: EntityAnnotation) -> Word {
    let mut polygon: Polygon = [Vertex::default(); 4];
    for (slot, vertex) in polygon
        .iter_mut()
        .zip(annotation.bounding_poly.vertices)
    {
        *slot = vertex;
    }
    Word {
        text: annotation.description,
        polygon,
    }
}
