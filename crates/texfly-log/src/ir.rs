use serde::{Deserialize, Serialize};

/// The three detection tiers, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceTier {
    /// `! LaTeX Error: File `x' not found` and `! I can't find file `x'`.
    ExplicitFile,
    /// A metric file name synthesized from a font loading error.
    FontFile,
    /// A font family name scraped from a font error.
    FontName,
}

impl ResourceTier {
    /// All tiers, highest priority first.
    pub const ALL: [ResourceTier; 3] = [Self::ExplicitFile, Self::FontFile, Self::FontName];

    pub fn index(self) -> usize {
        match self {
            Self::ExplicitFile => 0,
            Self::FontFile => 1,
            Self::FontName => 2,
        }
    }
}

/// A missing resource inferred from compiler output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name")]
pub enum MissingResource {
    ExplicitFile(String),
    FontFile(String),
    /// Raw family string; may still carry a `(...)` annotation and odd casing.
    FontName(String),
}

impl MissingResource {
    pub fn new(tier: ResourceTier, name: String) -> Self {
        match tier {
            ResourceTier::ExplicitFile => Self::ExplicitFile(name),
            ResourceTier::FontFile => Self::FontFile(name),
            ResourceTier::FontName => Self::FontName(name),
        }
    }

    pub fn tier(&self) -> ResourceTier {
        match self {
            Self::ExplicitFile(_) => ResourceTier::ExplicitFile,
            Self::FontFile(_) => ResourceTier::FontFile,
            Self::FontName(_) => ResourceTier::FontName,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ExplicitFile(name) | Self::FontFile(name) | Self::FontName(name) => name,
        }
    }

    /// Whether the package index should be searched by exact file name
    /// (as opposed to a loose font search).
    pub fn is_file(&self) -> bool {
        !matches!(self, Self::FontName(_))
    }
}

impl std::fmt::Display for MissingResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExplicitFile(name) => write!(f, "file {}", name),
            Self::FontFile(name) => write!(f, "font file {}", name),
            Self::FontName(name) => write!(f, "font {}", name),
        }
    }
}

/// Every match found in one compiler run, grouped by tier in the order
/// they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detections {
    pub files: Vec<String>,
    pub font_files: Vec<String>,
    pub fonts: Vec<String>,
}

impl Detections {
    pub fn for_tier(&self, tier: ResourceTier) -> &[String] {
        match tier {
            ResourceTier::ExplicitFile => &self.files,
            ResourceTier::FontFile => &self.font_files,
            ResourceTier::FontName => &self.fonts,
        }
    }

    /// The first match of a tier. Only this one is ever acted on.
    pub fn top(&self, tier: ResourceTier) -> Option<&str> {
        self.for_tier(tier).first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.font_files.is_empty() && self.fonts.is_empty()
    }
}
