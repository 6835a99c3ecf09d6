//! Static reference data: the camp offerings and the kit shop catalog.
//!
//! Both tables are read-only and compiled into the binary; registrations and
//! carts only ever look entries up by key.

use serde::{Deserialize, Serialize};

/// Key of one of the fixed camp offerings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CampKey {
    #[default]
    OneDay,
    TwoDay,
    Online,
}

impl CampKey {
    pub const ALL: [CampKey; 3] = [CampKey::OneDay, CampKey::TwoDay, CampKey::Online];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "one-day",
            Self::TwoDay => "two-day",
            Self::Online => "online",
        }
    }

    /// Parse the `camp` query parameter. Returns `None` for unknown keys.
    pub fn from_param(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == raw.trim())
    }

    pub fn entry(&self) -> &'static CampCatalogEntry {
        match self {
            Self::OneDay => &CAMPS[0],
            Self::TwoDay => &CAMPS[1],
            Self::Online => &CAMPS[2],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampCatalogEntry {
    pub key: CampKey,
    pub name: &'static str,
    pub duration: &'static str,
    pub price: u64,
    pub description: &'static str,
    pub location: &'static str,
    pub capacity: u32,
    pub age_range: &'static str,
    pub requirements: &'static [&'static str],
    pub includes: &'static [&'static str],
}

pub static CAMPS: [CampCatalogEntry; 3] = [
    CampCatalogEntry {
        key: CampKey::OneDay,
        name: "One-Day Arduino Camp",
        duration: "1 Day (6 hours)",
        price: 2499,
        description: "Perfect introduction to Arduino and basic electronics",
        location: "Pro26 Learning Center",
        capacity: 15,
        age_range: "8-16 years",
        requirements: &[
            "No prior experience needed",
            "Bring notebook and pen",
            "Lunch will be provided",
        ],
        includes: &[
            "Arduino Uno Kit",
            "Project Components",
            "Lunch & Snacks",
            "Certificate",
            "Take-home Project",
        ],
    },
    CampCatalogEntry {
        key: CampKey::TwoDay,
        name: "Two-Day Robotics Camp",
        duration: "2 Days (12 hours)",
        price: 4499,
        description: "Build and program your own robot over two exciting days",
        location: "Pro26 Learning Center",
        capacity: 12,
        age_range: "10-18 years",
        requirements: &[
            "Basic understanding of computers helpful",
            "Bring notebook and pen",
            "Lunch provided both days",
        ],
        includes: &[
            "Complete Robot Kit",
            "Sensors & Motors",
            "Programming Software",
            "Lunch & Snacks (2 days)",
            "Certificate",
            "Robot to take home",
        ],
    },
    CampCatalogEntry {
        key: CampKey::Online,
        name: "Online STEM Kit Program",
        duration: "4 Weeks (2 hours/week)",
        price: 3999,
        description: "Learn Arduino and robotics from home with shipped kit",
        location: "Online via Zoom",
        capacity: 20,
        age_range: "8-18 years",
        requirements: &[
            "Stable internet connection",
            "Computer/laptop with webcam",
            "Kit shipped to your address",
        ],
        includes: &[
            "Arduino Kit (Shipped)",
            "Online Classes (4 weeks)",
            "Digital Resources",
            "One-on-one Support",
            "Digital Certificate",
        ],
    },
];

// ─────────────────────────────────────────────────────────
// Kit shop
// ─────────────────────────────────────────────────────────

pub type ProductId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: &'static str,
    pub price: u64,
    pub original_price: u64,
    pub description: &'static str,
    pub features: &'static [&'static str],
    pub difficulty: Difficulty,
    pub age_range: &'static str,
    pub projects: &'static str,
}

pub static PRODUCTS: [Product; 6] = [
    Product {
        id: 1,
        name: "Arduino Starter Kit",
        price: 4199,
        original_price: 5899,
        description: "Perfect for beginners! Includes Arduino Uno, breadboard, LEDs, resistors, and 15+ components.",
        features: &[
            "Arduino Uno R3 board",
            "Breadboard & jumper wires",
            "20+ electronic components",
            "Step-by-step project guide",
            "Online tutorial access",
        ],
        difficulty: Difficulty::Beginner,
        age_range: "8-16",
        projects: "10+",
    },
    Product {
        id: 2,
        name: "Robot Building Kit",
        price: 7599,
        original_price: 10099,
        description: "Build your own obstacle-avoiding robot! Includes sensors, motors, and chassis.",
        features: &[
            "Arduino-compatible board",
            "Ultrasonic sensor",
            "Servo motors & wheels",
            "Robot chassis frame",
            "Pre-programmed examples",
        ],
        difficulty: Difficulty::Intermediate,
        age_range: "10-18",
        projects: "5+",
    },
    Product {
        id: 3,
        name: "Smart Home Kit",
        price: 10999,
        original_price: 13499,
        description: "Create IoT devices! Control lights, monitor temperature, and build smart home automation.",
        features: &[
            "ESP32 WiFi board",
            "Temperature & humidity sensors",
            "Relay modules",
            "LED strips & controllers",
            "Mobile app connectivity",
        ],
        difficulty: Difficulty::Advanced,
        age_range: "12+",
        projects: "8+",
    },
    Product {
        id: 4,
        name: "Sensor Explorer Kit",
        price: 3399,
        original_price: 4649,
        description: "Discover the world of sensors! Light, sound, motion, and temperature detection.",
        features: &[
            "Arduino Nano board",
            "12 different sensors",
            "LCD display module",
            "Buzzer & LED indicators",
            "Sensor library code",
        ],
        difficulty: Difficulty::Beginner,
        age_range: "8-14",
        projects: "15+",
    },
    Product {
        id: 5,
        name: "LED Matrix Display Kit",
        price: 5899,
        original_price: 7599,
        description: "Create stunning visual displays! Build scrolling text, animations, and games.",
        features: &[
            "Arduino Uno compatible",
            "8x8 LED matrix panels",
            "Real-time clock module",
            "Button controls",
            "Animation library",
        ],
        difficulty: Difficulty::Intermediate,
        age_range: "10-16",
        projects: "12+",
    },
    Product {
        id: 6,
        name: "Advanced Robotics Kit",
        price: 16899,
        original_price: 21099,
        description: "Professional-grade robotics! Build complex robots with advanced sensors and AI.",
        features: &[
            "Raspberry Pi 4 included",
            "Camera & microphone",
            "Servo & stepper motors",
            "Advanced sensor array",
            "AI programming examples",
        ],
        difficulty: Difficulty::Expert,
        age_range: "14+",
        projects: "6+",
    },
];

pub fn find_product(id: ProductId) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camp_keys_resolve_to_their_entries() {
        for key in CampKey::ALL {
            assert_eq!(key.entry().key, key);
            assert_eq!(CampKey::from_param(key.as_str()), Some(key));
        }
        assert_eq!(CampKey::OneDay.entry().name, "One-Day Arduino Camp");
        assert_eq!(CampKey::TwoDay.entry().price, 4499);
    }

    #[test]
    fn unknown_camp_param_is_rejected() {
        assert_eq!(CampKey::from_param("weekend"), None);
        assert_eq!(CampKey::from_param(""), None);
    }

    #[test]
    fn camp_key_serializes_kebab_case() {
        let json = serde_json::to_string(&CampKey::TwoDay).unwrap();
        assert_eq!(json, r#""two-day""#);
    }

    #[test]
    fn product_lookup() {
        assert_eq!(find_product(1).map(|p| p.price), Some(4199));
        assert!(find_product(99).is_none());
        let mut ids: Vec<_> = PRODUCTS.iter().map(|p| p.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), PRODUCTS.len());
    }
}
