//! Medaka consensus models and their naming scheme.
//!
//! A model name such as `r941_prom_high_g360` encodes the flow cell
//! (`r941`), an optional device (`prom`), the basecaller variant (`high`)
//! and the basecaller version (`g360`, i.e. 3.6.0).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{NanoAsmError, Result};

/// Basecaller version, ordered numerically by (major, minor, build).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl VersionTag {
    pub const fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// The `g`-prefixed form used inside model names.
    pub fn compact(&self) -> String {
        format!("g{}{}{}", self.major, self.minor, self.build)
    }

    /// Parses `g` + one major digit + one minor digit + build digits.
    fn parse_compact(digits: &str) -> Option<Self> {
        if digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let major = digits[..1].parse().ok()?;
        let minor = digits[1..2].parse().ok()?;
        let build = digits[2..].parse().ok()?;
        Some(Self::new(major, minor, build))
    }

    fn parse_dotted(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let build = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, build))
    }
}

impl FromStr for VersionTag {
    type Err = NanoAsmError;

    /// Accepts `g5015`, `5.0.15`, `v5.0.15` and `Guppy 5.0.15`.
    fn from_str(s: &str) -> Result<Self> {
        let token = s.split_whitespace().last().unwrap_or_default();
        let parsed = if let Some(digits) = token.strip_prefix(['g', 'G']) {
            Self::parse_compact(digits)
        } else {
            let dotted = token.strip_prefix(['v', 'V']).unwrap_or(token);
            Self::parse_dotted(dotted)
        };
        parsed.ok_or_else(|| NanoAsmError::InvalidVersion(s.to_string()))
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Flow cell chemistry, e.g. `r941` or `r104_e81`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowCell(String);

impl FlowCell {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FlowCell {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for FlowCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequencing device a model was trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    MinION,
    PromethION,
}

impl Device {
    pub fn token(self) -> &'static str {
        match self {
            Device::MinION => "min",
            Device::PromethION => "prom",
        }
    }
}

impl FromStr for Device {
    type Err = NanoAsmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "min" | "minion" => Ok(Device::MinION),
            "prom" | "promethion" => Ok(Device::PromethION),
            _ => Err(NanoAsmError::InvalidConfig(format!(
                "unknown device '{s}' (expected min or prom)"
            ))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Basecalling accuracy mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasecallerVariant {
    Fast,
    Hac,
    /// Name of the high accuracy mode before `hac`
    High,
    Sup,
}

impl BasecallerVariant {
    pub fn token(self) -> &'static str {
        match self {
            BasecallerVariant::Fast => "fast",
            BasecallerVariant::Hac => "hac",
            BasecallerVariant::High => "high",
            BasecallerVariant::Sup => "sup",
        }
    }
}

impl FromStr for BasecallerVariant {
    type Err = NanoAsmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(BasecallerVariant::Fast),
            "hac" => Ok(BasecallerVariant::Hac),
            "high" => Ok(BasecallerVariant::High),
            "sup" => Ok(BasecallerVariant::Sup),
            _ => Err(NanoAsmError::InvalidConfig(format!(
                "unknown basecaller variant '{s}' (expected fast, hac, high or sup)"
            ))),
        }
    }
}

impl fmt::Display for BasecallerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One consensus model of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub full_name: String,
    pub cell: FlowCell,
    pub device: Option<Device>,
    pub variant: BasecallerVariant,
    pub version: VersionTag,
}

impl Model {
    /// Splits a model name into its components.
    ///
    /// The last token is the version, the one before it the variant and an
    /// optional device token may precede that. Everything in front is the
    /// flow cell. Names that do not follow this layout (variant-calling
    /// models, `_rle` models) are rejected.
    pub fn from_name(name: &str) -> Result<Self> {
        let invalid = || NanoAsmError::InvalidModelName(name.to_string());
        let tokens: Vec<&str> = name.split('_').collect();
        let [cell_tokens @ .., variant, version] = tokens.as_slice() else {
            return Err(invalid());
        };
        if !version.starts_with('g') {
            return Err(invalid());
        }
        let version: VersionTag = version.parse().map_err(|_| invalid())?;
        let variant: BasecallerVariant = variant.parse().map_err(|_| invalid())?;

        let (cell_tokens, device) = match cell_tokens {
            [rest @ .., last] if !rest.is_empty() => match last.parse::<Device>() {
                Ok(device) => (rest, Some(device)),
                Err(_) => (cell_tokens, None),
            },
            _ => (cell_tokens, None),
        };
        if cell_tokens.is_empty() || cell_tokens.iter().any(|t| t.is_empty()) {
            return Err(invalid());
        }

        Ok(Model {
            full_name: name.to_string(),
            cell: FlowCell::new(cell_tokens.join("_")),
            device,
            variant,
            version,
        })
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// A possibly partial model selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelQuery {
    pub cell: FlowCell,
    pub device: Option<Device>,
    pub variant: BasecallerVariant,
    pub version: Option<VersionTag>,
}

impl ModelQuery {
    pub fn new(cell: impl Into<FlowCell>, variant: BasecallerVariant) -> Self {
        Self {
            cell: cell.into(),
            device: None,
            variant,
            version: None,
        }
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    pub fn version(mut self, version: VersionTag) -> Self {
        self.version = Some(version);
        self
    }
}

impl fmt::Display for ModelQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell={}", self.cell)?;
        if let Some(device) = self.device {
            write!(f, " device={device}")?;
        }
        write!(f, " variant={}", self.variant)?;
        if let Some(version) = self.version {
            write!(f, " version={version}")?;
        }
        Ok(())
    }
}

/// Consensus models shipped with medaka.
const BUILTIN_MODELS: &[&str] = &[
    "r103_fast_g507",
    "r103_hac_g507",
    "r103_min_high_g345",
    "r103_min_high_g360",
    "r103_prom_high_g360",
    "r103_sup_g507",
    "r1041_e82_400bps_fast_g615",
    "r1041_e82_400bps_hac_g615",
    "r1041_e82_400bps_sup_g615",
    "r104_e81_fast_g5015",
    "r104_e81_hac_g5015",
    "r104_e81_sup_g5015",
    "r104_e81_sup_g610",
    "r10_min_high_g303",
    "r10_min_high_g340",
    "r941_e81_fast_g514",
    "r941_e81_hac_g514",
    "r941_e81_sup_g514",
    "r941_min_fast_g303",
    "r941_min_fast_g507",
    "r941_min_hac_g507",
    "r941_min_high_g303",
    "r941_min_high_g330",
    "r941_min_high_g340_rle",
    "r941_min_high_g344",
    "r941_min_high_g351",
    "r941_min_high_g360",
    "r941_min_sup_g507",
    "r941_prom_fast_g303",
    "r941_prom_fast_g507",
    "r941_prom_hac_g507",
    "r941_prom_high_g303",
    "r941_prom_high_g330",
    "r941_prom_high_g344",
    "r941_prom_high_g360",
    "r941_prom_high_g4011",
    "r941_prom_sup_g507",
    "r941_sup_plant_g610",
];

/// Immutable, ordered set of models to resolve against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub fn new(models: Vec<Model>) -> Self {
        Self { models }
    }

    /// Parses model names, skipping the ones that are not consensus models.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let models = names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref().trim();
                match Model::from_name(name) {
                    Ok(model) => Some(model),
                    Err(e) => {
                        tracing::debug!("Skipping catalog entry: {e}");
                        None
                    }
                }
            })
            .collect();
        Self { models }
    }

    /// Reads one model name per line. Blank lines and `#` comments are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_names(text.lines().map(str::trim).filter(|line| {
            !line.is_empty() && !line.starts_with('#')
        })))
    }

    pub fn default_models() -> Self {
        Self::from_names(BUILTIN_MODELS)
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.full_name == name)
    }
}
