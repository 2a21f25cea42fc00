//! Caption intent.

use serde::{Deserialize, Serialize};

/// Directives parsed once per message from the caption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Crop to a centered 1:1 square.
    pub wants_square: bool,
    /// Send the image through background removal first.
    pub wants_background_removal: bool,
    /// Global mode at parse time: caption must contain the keyword.
    pub requires_keyword: bool,
    /// Caption contains the keyword.
    pub has_keyword: bool,
}

impl Intent {
    /// Whether this message may be converted under the keyword policy.
    pub fn passes_keyword_gate(&self) -> bool {
        !self.requires_keyword || self.has_keyword
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_gate() {
        let open = Intent::default();
        assert!(open.passes_keyword_gate());

        let gated = Intent {
            requires_keyword: true,
            ..Default::default()
        };
        assert!(!gated.passes_keyword_gate());

        let unlocked = Intent {
            requires_keyword: true,
            has_keyword: true,
            ..Default::default()
        };
        assert!(unlocked.passes_keyword_gate());
    }
}
