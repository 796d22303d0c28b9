use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// Class id the detector assigns to people.
pub const PERSON_CLASS_ID: u32 = 0;

/// Highest class id in the detector taxonomy.
pub const MAX_CLASS_ID: u32 = 10;

/// One object reported by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    /// Taxonomy entry for this detection, `None` when the class id is unknown.
    pub fn class(&self) -> Option<PpeClass> {
        PpeClass::from_id(self.class_id)
    }
}

/// PPE categories, in report order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PpeCategory {
    Helmet,
    Vest,
    Glasses,
    Gloves,
    Boots,
}

impl PpeCategory {
    pub const ALL: [PpeCategory; 5] = [
        PpeCategory::Helmet,
        PpeCategory::Vest,
        PpeCategory::Glasses,
        PpeCategory::Gloves,
        PpeCategory::Boots,
    ];

    /// Position in `ALL` and in every compliance record.
    pub fn index(self) -> usize {
        match self {
            PpeCategory::Helmet => 0,
            PpeCategory::Vest => 1,
            PpeCategory::Glasses => 2,
            PpeCategory::Gloves => 3,
            PpeCategory::Boots => 4,
        }
    }

    /// Detector class meaning "this item is worn".
    pub fn used_class_id(self) -> u32 {
        self.index() as u32 * 2 + 1
    }

    /// Detector class meaning "this item is missing".
    pub fn not_used_class_id(self) -> u32 {
        self.used_class_id() + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            PpeCategory::Helmet => "helmet",
            PpeCategory::Vest => "vest",
            PpeCategory::Glasses => "glasses",
            PpeCategory::Gloves => "gloves",
            PpeCategory::Boots => "boots",
        }
    }
}

/// Decoded detector class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PpeClass {
    Person,
    Ppe { category: PpeCategory, worn: bool },
}

impl PpeClass {
    pub fn from_id(class_id: u32) -> Option<Self> {
        match class_id {
            PERSON_CLASS_ID => Some(PpeClass::Person),
            1..=MAX_CLASS_ID => {
                let offset = class_id - 1;
                let category = PpeCategory::ALL[(offset / 2) as usize];
                Some(PpeClass::Ppe {
                    category,
                    worn: offset % 2 == 0,
                })
            }
            _ => None,
        }
    }
}
