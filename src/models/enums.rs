use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Garment sizes a spa service can be booked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Size {
    S,
    M,
    L,
    XL,
    XXL,
    #[serde(rename = "3XL")]
    ThreeXl,
    #[serde(rename = "4XL")]
    FourXl,
}

impl Size {
    /// Every size offered by the detail screen, in display order
    pub const ALL: [Size; 7] = [
        Size::S,
        Size::M,
        Size::L,
        Size::XL,
        Size::XXL,
        Size::ThreeXl,
        Size::FourXl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Size::S => "S",
            Size::M => "M",
            Size::L => "L",
            Size::XL => "XL",
            Size::XXL => "XXL",
            Size::ThreeXl => "3XL",
            Size::FourXl => "4XL",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "S" => Ok(Size::S),
            "M" => Ok(Size::M),
            "L" => Ok(Size::L),
            "XL" => Ok(Size::XL),
            "XXL" => Ok(Size::XXL),
            "3XL" => Ok(Size::ThreeXl),
            "4XL" => Ok(Size::FourXl),
            _ => Err(format!("Invalid size: {}", s)),
        }
    }
}

/// Where a browsing session is in the select / add / checkout flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Browsing,
    SizeChosen,
    Added,
    CheckedOut,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::CheckedOut)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Browsing => write!(f, "browsing"),
            SessionPhase::SizeChosen => write!(f, "size_chosen"),
            SessionPhase::Added => write!(f, "added"),
            SessionPhase::CheckedOut => write!(f, "checked_out"),
        }
    }
}

/// Progress of the one-shot catalog fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStatus {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

impl fmt::Display for CatalogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogStatus::NotLoaded => write!(f, "not_loaded"),
            CatalogStatus::Loading => write!(f, "loading"),
            CatalogStatus::Loaded => write!(f, "loaded"),
            CatalogStatus::Failed => write!(f, "failed"),
        }
    }
}
