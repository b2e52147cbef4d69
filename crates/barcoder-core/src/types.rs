//! # Domain Types
//!
//! Core domain types used throughout Barcoder.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ScanEvent     │   │    Product      │   │ PermissionState │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  symbology      │   │  id             │   │  Unknown        │       │
//! │  │  payload        │   │  title          │   │  Denied         │       │
//! │  └─────────────────┘   │  price          │   │  Granted        │       │
//! │                        │  thumbnail_url  │   └─────────────────┘       │
//! │  ┌─────────────────┐   │  permalink      │                             │
//! │  │  SymbologySet   │   └─────────────────┘   ┌─────────────────┐       │
//! │  │  ─────────────  │                         │  FailureKind    │       │
//! │  │  u16 bitmask    │                         │  NetworkError   │       │
//! │  │  of Symbology   │                         │  Timeout  ...   │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, ValidationError};
use crate::money::Price;
use crate::validation::{validate_price, validate_required};

// =============================================================================
// Symbology
// =============================================================================

/// Barcode encoding standard reported by the decoder.
///
/// Wire names match what mobile vision APIs emit (`ean13`, `upc_a`, `qr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Symbology {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code39,
    Code93,
    Code128,
    Itf14,
    Codabar,
    Qr,
    Pdf417,
    Aztec,
    #[serde(rename = "datamatrix")]
    DataMatrix,
}

impl Symbology {
    /// Every known symbology, in declaration order.
    pub const ALL: [Symbology; 13] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code39,
        Symbology::Code93,
        Symbology::Code128,
        Symbology::Itf14,
        Symbology::Codabar,
        Symbology::Qr,
        Symbology::Pdf417,
        Symbology::Aztec,
        Symbology::DataMatrix,
    ];

    /// Canonical wire name.
    pub const fn name(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "ean13",
            Symbology::Ean8 => "ean8",
            Symbology::UpcA => "upc_a",
            Symbology::UpcE => "upc_e",
            Symbology::Code39 => "code39",
            Symbology::Code93 => "code93",
            Symbology::Code128 => "code128",
            Symbology::Itf14 => "itf14",
            Symbology::Codabar => "codabar",
            Symbology::Qr => "qr",
            Symbology::Pdf417 => "pdf417",
            Symbology::Aztec => "aztec",
            Symbology::DataMatrix => "datamatrix",
        }
    }

    /// Retail product codes (GTIN family).
    pub const fn is_retail(&self) -> bool {
        matches!(
            self,
            Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA | Symbology::UpcE
        )
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Symbology {
    type Err = CoreError;

    /// Accepts `ean13`, `EAN-13`, `upc_a`, iOS-style `org.gs1.EAN-13` and
    /// `qrcode`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let last_segment = s.trim().rsplit('.').next().unwrap_or_default();
        let normalized: String = last_segment
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "ean13" => Ok(Symbology::Ean13),
            "ean8" => Ok(Symbology::Ean8),
            "upca" => Ok(Symbology::UpcA),
            "upce" => Ok(Symbology::UpcE),
            "code39" => Ok(Symbology::Code39),
            "code93" => Ok(Symbology::Code93),
            "code128" => Ok(Symbology::Code128),
            "itf14" => Ok(Symbology::Itf14),
            "codabar" => Ok(Symbology::Codabar),
            "qr" | "qrcode" => Ok(Symbology::Qr),
            "pdf417" => Ok(Symbology::Pdf417),
            "aztec" => Ok(Symbology::Aztec),
            "datamatrix" => Ok(Symbology::DataMatrix),
            _ => Err(CoreError::UnknownSymbology(s.to_string())),
        }
    }
}

// =============================================================================
// Symbology Set
// =============================================================================

/// A fixed set of accepted symbologies.
///
/// Stored as a bitmask; serialized as a list so config files read
/// `accepted = ["ean13", "qr"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Symbology>", into = "Vec<Symbology>")]
pub struct SymbologySet(u16);

impl SymbologySet {
    /// The empty set.
    pub const fn empty() -> Self {
        SymbologySet(0)
    }

    /// EAN-13, EAN-8, UPC-A, UPC-E: the codes a catalog search can resolve.
    pub const fn retail() -> Self {
        SymbologySet::empty()
            .with(Symbology::Ean13)
            .with(Symbology::Ean8)
            .with(Symbology::UpcA)
            .with(Symbology::UpcE)
    }

    /// Retail codes plus QR, for the raw-payload screen.
    pub const fn retail_and_qr() -> Self {
        SymbologySet::retail().with(Symbology::Qr)
    }

    /// Returns a copy with `symbology` added.
    pub const fn with(self, symbology: Symbology) -> Self {
        SymbologySet(self.0 | symbology.bit())
    }

    pub fn insert(&mut self, symbology: Symbology) {
        self.0 |= symbology.bit();
    }

    pub const fn contains(&self, symbology: Symbology) -> bool {
        self.0 & symbology.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Symbology> + '_ {
        Symbology::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl From<Vec<Symbology>> for SymbologySet {
    fn from(list: Vec<Symbology>) -> Self {
        list.into_iter().collect()
    }
}

impl From<SymbologySet> for Vec<Symbology> {
    fn from(set: SymbologySet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<Symbology> for SymbologySet {
    fn from_iter<I: IntoIterator<Item = Symbology>>(iter: I) -> Self {
        let mut set = SymbologySet::empty();
        for symbology in iter {
            set.insert(symbology);
        }
        set
    }
}

// =============================================================================
// Scan Event
// =============================================================================

/// One decoded barcode, as delivered by the camera's vision capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ScanEvent {
    pub symbology: Symbology,
    pub payload: String,
}

impl ScanEvent {
    pub fn new(symbology: Symbology, payload: impl Into<String>) -> Self {
        ScanEvent {
            symbology,
            payload: payload.into(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog listing matched by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Catalog identifier, unique within one result set.
    pub id: String,

    /// Listing title.
    pub title: String,

    /// Listing price.
    pub price: Price,

    /// Thumbnail image URL.
    pub thumbnail_url: String,

    /// Listing page on the catalog site.
    pub permalink: String,
}

impl Product {
    /// Builds a product, rejecting empty required fields and negative prices.
    ///
    /// ## Example
    /// ```rust
    /// use barcoder_core::money::{Money, Price};
    /// use barcoder_core::types::Product;
    ///
    /// let price = Price::new(Money::from_cents(1999), "ARS");
    /// assert!(Product::try_new("MLA1", "Yerba 1kg", price.clone(), "http://t/1.jpg", "http://p/1").is_ok());
    /// assert!(Product::try_new("MLA1", "", price, "http://t/1.jpg", "http://p/1").is_err());
    /// ```
    pub fn try_new(
        id: impl Into<String>,
        title: impl Into<String>,
        price: Price,
        thumbnail_url: impl Into<String>,
        permalink: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let product = Product {
            id: id.into(),
            title: title.into(),
            price,
            thumbnail_url: thumbnail_url.into(),
            permalink: permalink.into(),
        };

        validate_required("id", &product.id)?;
        validate_required("title", &product.title)?;
        validate_required("thumbnail", &product.thumbnail_url)?;
        validate_required("permalink", &product.permalink)?;
        validate_price(&product.price)?;

        Ok(product)
    }
}

// =============================================================================
// Permission State
// =============================================================================

/// Camera-access authorization as last reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PermissionState {
    /// Not resolved yet (screen just mounted).
    #[default]
    Unknown,
    /// Host refused or the prompt failed.
    Denied,
    /// Camera may be used.
    Granted,
}

impl PermissionState {
    pub const fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

impl fmt::Display for PermissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionState::Unknown => write!(f, "unknown"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Granted => write!(f, "granted"),
        }
    }
}

// =============================================================================
// Failure Kind
// =============================================================================

/// Why a session ended in `Failed`.
///
/// The three lookup kinds render identically; the distinction is kept for
/// logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FailureKind {
    NetworkError,
    Timeout,
    MalformedResponse,
    DecodeFailed,
    CameraUnavailable,
}

impl FailureKind {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            FailureKind::NetworkError => "NETWORK_ERROR",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::MalformedResponse => "MALFORMED_RESPONSE",
            FailureKind::DecodeFailed => "DECODE_FAILED",
            FailureKind::CameraUnavailable => "CAMERA_UNAVAILABLE",
        }
    }

    /// True for failures of the remote catalog search.
    pub const fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            FailureKind::NetworkError | FailureKind::Timeout | FailureKind::MalformedResponse
        )
    }

    /// Message shown on the failure screen.
    pub const fn user_message(&self) -> &'static str {
        match self {
            FailureKind::NetworkError | FailureKind::Timeout | FailureKind::MalformedResponse => {
                "Search failed, please try again."
            }
            FailureKind::DecodeFailed => "Could not read the barcode, please try again.",
            FailureKind::CameraUnavailable => "The camera could not be started.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
