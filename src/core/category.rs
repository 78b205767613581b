// FILE: src/core/category.rs
use serde::{Deserialize, Serialize};

/// The closed set of file categories shown by the host.
///
/// The discriminants are the integer codes used across the C boundary and
/// must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Category {
    Images = 0,
    Videos = 1,
    Audio = 2,
    Documents = 3,
    Archives = 4,
    #[serde(rename = "apk")]
    ApplicationPackage = 5,
    Code = 6,
    Others = 7,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Images,
        Category::Videos,
        Category::Audio,
        Category::Documents,
        Category::Archives,
        Category::ApplicationPackage,
        Category::Code,
        Category::Others,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Images => "images",
            Category::Videos => "videos",
            Category::Audio => "audio",
            Category::Documents => "documents",
            Category::Archives => "archives",
            Category::ApplicationPackage => "apk",
            Category::Code => "code",
            Category::Others => "others",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_all() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.code() as usize, i);
            assert_eq!(Category::from_code(i as u8), Some(*category));
        }
        assert_eq!(Category::from_code(8), None);
    }

    #[test]
    fn test_labels_match_serde() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
        assert_eq!(Category::ApplicationPackage.to_string(), "apk");
    }
}
