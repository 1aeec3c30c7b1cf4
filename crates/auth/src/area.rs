//! Functional-area scoping from position titles.
//!
//! Area detection has two sources, consulted in order: an explicit
//! position→area table maintained by HR, then keyword inference over the
//! position title and business unit. Keyword inference is the fallback for
//! positions nobody has mapped yet.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::{contains_any, has_any_keyword, normalize};

/// Canonical functional area.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalArea {
    Operaciones,
    Comercial,
    Almacen,
    Distribucion,
    Mantenimiento,
    Finanzas,
    Sistemas,
}

impl CanonicalArea {
    pub const ALL: [CanonicalArea; 7] = [
        CanonicalArea::Operaciones,
        CanonicalArea::Comercial,
        CanonicalArea::Almacen,
        CanonicalArea::Distribucion,
        CanonicalArea::Mantenimiento,
        CanonicalArea::Finanzas,
        CanonicalArea::Sistemas,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalArea::Operaciones => "OPERACIONES",
            CanonicalArea::Comercial => "COMERCIAL",
            CanonicalArea::Almacen => "ALMACEN",
            CanonicalArea::Distribucion => "DISTRIBUCION",
            CanonicalArea::Mantenimiento => "MANTENIMIENTO",
            CanonicalArea::Finanzas => "FINANZAS",
            CanonicalArea::Sistemas => "SISTEMAS",
        }
    }
}

impl core::fmt::Display for CanonicalArea {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown functional area '{0}'")]
pub struct UnknownArea(String);

impl FromStr for CanonicalArea {
    type Err = UnknownArea;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        CanonicalArea::ALL
            .into_iter()
            .find(|area| area.as_str() == normalized)
            .ok_or_else(|| UnknownArea(s.to_string()))
    }
}

/// Keywords marking HR/people-function positions or units. Holders see
/// across areas (their scope falls back to location).
pub const HR_KEYWORDS: &[&str] = &[
    "GENTE",
    "RRHH",
    "RR.HH",
    "TALENTO",
    "HUMANO",
    "NOMINA",
    "PLANILLA",
    "SELECCION",
    "BIENESTAR",
];

/// Ordered keyword table; the first area with a matching keyword wins.
pub const AREA_KEYWORDS: &[(CanonicalArea, &[&str])] = &[
    (CanonicalArea::Operaciones, &["OPERACIONES"]),
    (CanonicalArea::Comercial, &["COMERCIAL", "VENTAS"]),
    (CanonicalArea::Almacen, &["ALMACEN", "LOGISTICA"]),
    (CanonicalArea::Distribucion, &["DISTRIBUCION", "TRANSPORTE"]),
    (CanonicalArea::Mantenimiento, &["MANTENIMIENTO"]),
    (CanonicalArea::Finanzas, &["FINANZAS", "CONTABILIDAD"]),
    (CanonicalArea::Sistemas, &["SISTEMAS", "TECNOLOGIA"]),
];

/// Explicit area assignment of a position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AreaAssignment {
    Area(CanonicalArea),
    /// Position sees across areas (HR and other org-wide functions).
    CrossArea,
}

impl AreaAssignment {
    pub fn area(self) -> Option<CanonicalArea> {
        match self {
            AreaAssignment::Area(area) => Some(area),
            AreaAssignment::CrossArea => None,
        }
    }
}

/// Position→area lookup table maintained outside the code.
///
/// Serialized as a JSON object of position title to area tag, with `null`
/// marking a cross-area position:
///
/// ```json
/// { "Jefe de Operaciones": "OPERACIONES", "Analista de Nóminas": null }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, Option<CanonicalArea>>")]
pub struct PositionAreaTable(HashMap<String, Option<CanonicalArea>>);

impl PositionAreaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: &str, assignment: AreaAssignment) {
        self.0.insert(normalize(position), assignment.area());
    }

    pub fn lookup(&self, position: &str) -> Option<AreaAssignment> {
        self.0.get(&normalize(position)).map(|entry| match entry {
            Some(area) => AreaAssignment::Area(*area),
            None => AreaAssignment::CrossArea,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, Option<CanonicalArea>>> for PositionAreaTable {
    fn from(value: HashMap<String, Option<CanonicalArea>>) -> Self {
        Self(value.into_iter().map(|(k, v)| (normalize(&k), v)).collect())
    }
}

/// Maps a position title (and business unit) to the canonical area its
/// holder is scoped to.
///
/// Total and pure: any input, including empty strings, yields a value.
/// `None` means "do not area-restrict".
#[derive(Debug, Clone, Default)]
pub struct AreaScopeResolver {
    table: PositionAreaTable,
}

impl AreaScopeResolver {
    /// Keyword inference only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: PositionAreaTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PositionAreaTable {
        &self.table
    }

    pub fn resolve(&self, position: &str, business_unit: &str) -> Option<CanonicalArea> {
        let position = normalize(position);
        let business_unit = normalize(business_unit);
        if position.is_empty() && business_unit.is_empty() {
            return None;
        }

        if let Some(assignment) = self.table.lookup(&position) {
            return assignment.area();
        }

        if is_people_function(&position) || is_people_function(&business_unit) {
            return None;
        }

        keyword_area(&position).or_else(|| keyword_area(&business_unit))
    }
}

fn is_people_function(normalized: &str) -> bool {
    has_any_keyword(normalized, HR_KEYWORDS)
}

/// First area of [`AREA_KEYWORDS`] with a keyword anywhere in `normalized`.
fn keyword_area(normalized: &str) -> Option<CanonicalArea> {
    AREA_KEYWORDS
        .iter()
        .find(|(_, keywords)| contains_any(normalized, keywords))
        .map(|(area, _)| *area)
}
