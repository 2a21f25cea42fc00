//! remove.bg request types.

use serde::{Deserialize, Serialize};

/// JSON body of `POST /v1.0/removebg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveBgRequest {
    /// Source image, standard base64
    pub image_file_b64: String,
    /// Output resolution preset
    pub size: String,
}

impl RemoveBgRequest {
    pub fn auto(image_file_b64: String) -> Self {
        Self {
            image_file_b64,
            size: "auto".to_string(),
        }
    }
}
