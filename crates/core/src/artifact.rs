use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

/// Payload produced by a capture component.
///
/// An artifact is owned exclusively by its capture component until the
/// assembler reads it at submit time; it is never shared across records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureArtifact {
    /// Nothing was captured.
    None,
    /// An encoded image (signature PNG or photo JPEG).
    Image { bytes: Vec<u8>, mime_type: String },
    /// An opaque identifying token (fingerprint scan result).
    Token(String),
}

impl CaptureArtifact {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the label used for logging and metrics.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Image { .. } => "image",
            Self::Token(_) => "token",
        }
    }

    /// Renders the artifact as the string marker stored inside a record.
    ///
    /// Missing artifacts map to the empty string so the stored record shape
    /// stays fixed. Images become `data:` URLs, tokens pass through as-is.
    pub fn inline_marker(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Image { bytes, mime_type } => {
                format!("data:{};base64,{}", mime_type, BASE64.encode(bytes))
            }
            Self::Token(token) => token.clone(),
        }
    }

    /// Parses a `data:` URL back into an image artifact.
    ///
    /// The empty string decodes to [`CaptureArtifact::None`]; any other
    /// non-URL value is treated as an opaque token.
    pub fn from_marker(marker: &str) -> Result<Self, ArtifactError> {
        if marker.is_empty() {
            return Ok(Self::None);
        }
        let Some(rest) = marker.strip_prefix("data:") else {
            return Ok(Self::Token(marker.to_string()));
        };
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or(ArtifactError::MalformedDataUrl)?;
        if mime_type.is_empty() {
            return Err(ArtifactError::MalformedDataUrl);
        }
        let bytes = BASE64
            .decode(payload)
            .map_err(|_| ArtifactError::InvalidBase64)?;
        Ok(Self::Image {
            bytes,
            mime_type: mime_type.to_string(),
        })
    }
}

/// Errors raised while decoding artifact markers received from clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("data url is missing the ';base64,' separator or a media type")]
    MalformedDataUrl,
    #[error("data url payload is not valid base64")]
    InvalidBase64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_renders_as_empty_marker() {
        assert_eq!(CaptureArtifact::None.inline_marker(), "");
        assert!(CaptureArtifact::None.is_none());
    }

    #[test]
    fn image_round_trips_through_data_url() {
        let artifact = CaptureArtifact::Image {
            bytes: vec![1, 2, 3, 250],
            mime_type: "image/png".to_string(),
        };
        let marker = artifact.inline_marker();
        assert!(marker.starts_with("data:image/png;base64,"));
        assert_eq!(CaptureArtifact::from_marker(&marker), Ok(artifact));
    }

    #[test]
    fn empty_marker_decodes_to_none() {
        assert_eq!(
            CaptureArtifact::from_marker(""),
            Ok(CaptureArtifact::None)
        );
    }

    #[test]
    fn bare_string_decodes_to_token() {
        assert_eq!(
            CaptureArtifact::from_marker("scan-42"),
            Ok(CaptureArtifact::Token("scan-42".to_string()))
        );
    }

    #[test]
    fn malformed_data_url_is_rejected() {
        assert_eq!(
            CaptureArtifact::from_marker("data:image/png,AAAA"),
            Err(ArtifactError::MalformedDataUrl)
        );
        assert_eq!(
            CaptureArtifact::from_marker("data:image/png;base64,@@@"),
            Err(ArtifactError::InvalidBase64)
        );
    }
}
