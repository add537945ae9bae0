//! Tile descriptors and their resolution into fetchable URL templates.

use serde::{Deserialize, Serialize};

use super::OverlayError;
use crate::analysis::{AnalysisKind, MapToken};
use crate::geo::DEFAULT_TILE_SIZE;

/// Default Earth Engine tile host used for map-id/token descriptors.
pub const DEFAULT_TILE_HOST: &str =
    "https://earthengine.googleapis.com/v1alpha/projects/earthengine-legacy/maps";

/// Opacity given to overlays built from an analysis result.
pub const ANALYSIS_OVERLAY_OPACITY: f32 = 0.7;

/// Name used when a descriptor does not carry one.
pub const DEFAULT_OVERLAY_NAME: &str = "overlay";

/// How the tiles of a descriptor are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileKind {
    /// `mapId` + `token` pair issued by the analysis service.
    MapidToken,
    /// A ready-made `{z}/{x}/{y}` URL template.
    UrlTemplate,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_opacity() -> f32 {
    1.0
}

/// Addressing data for one remote raster overlay.
///
/// Deserializes from the camelCase JSON produced by analysis callers:
///
/// ```
/// use envmap::overlay::{TileDescriptor, TileKind};
///
/// let d: TileDescriptor = serde_json::from_str(
///     r#"{"kind":"MAPID_TOKEN","mapId":"abc","token":"xyz","opacity":0.7,"name":"ndvi"}"#,
/// ).unwrap();
/// assert_eq!(d.kind, TileKind::MapidToken);
/// assert_eq!(d.tile_size, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDescriptor {
    pub kind: TileKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub name: String,
}

impl TileDescriptor {
    pub fn map_id_token(
        map_id: impl Into<String>,
        token: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: TileKind::MapidToken,
            map_id: Some(map_id.into()),
            token: Some(token.into()),
            url_template: None,
            tile_size: DEFAULT_TILE_SIZE,
            opacity: default_opacity(),
            name: name.into(),
        }
    }

    pub fn url_template(template: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: TileKind::UrlTemplate,
            map_id: None,
            token: None,
            url_template: Some(template.into()),
            tile_size: DEFAULT_TILE_SIZE,
            opacity: default_opacity(),
            name: name.into(),
        }
    }

    /// Descriptor for the tiles of a finished analysis, named after its kind.
    pub fn from_analysis(result: &MapToken, kind: AnalysisKind) -> Self {
        Self::map_id_token(result.map_id.clone(), result.token.clone(), kind.id())
            .with_opacity(ANALYSIS_OVERLAY_OPACITY)
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Validates the descriptor and builds its tile URL template.
    ///
    /// Map-id/token descriptors are expanded against `tile_host`; URL
    /// templates are used as given.
    pub fn resolve(&self, tile_host: &str) -> Result<ResolvedOverlay, OverlayError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(OverlayError::invalid(format!(
                "opacity {} outside [0, 1]",
                self.opacity
            )));
        }
        if self.tile_size == 0 {
            return Err(OverlayError::invalid("tile size must be positive"));
        }

        let tile_url_template = match self.kind {
            TileKind::MapidToken => {
                let map_id = non_empty(&self.map_id)
                    .ok_or_else(|| OverlayError::invalid("mapId is required"))?;
                let token = non_empty(&self.token)
                    .ok_or_else(|| OverlayError::invalid("token is required"))?;
                if map_id.contains(|c: char| c == '/' || c == '?' || c == '#' || c.is_whitespace())
                {
                    return Err(OverlayError::invalid(format!(
                        "mapId '{}' is not a path segment",
                        map_id
                    )));
                }
                format!(
                    "{}/{}/tiles/{{z}}/{{x}}/{{y}}?token={}",
                    tile_host.trim_end_matches('/'),
                    map_id,
                    encode_query_value(token)
                )
            }
            TileKind::UrlTemplate => {
                let template = non_empty(&self.url_template)
                    .ok_or_else(|| OverlayError::invalid("urlTemplate is required"))?;
                if !["{z}", "{x}", "{y}"].iter().all(|p| template.contains(p)) {
                    return Err(OverlayError::invalid(
                        "urlTemplate must contain {z}, {x} and {y}",
                    ));
                }
                template.to_string()
            }
        };

        let name = match self.name.trim() {
            "" => DEFAULT_OVERLAY_NAME.to_string(),
            name => name.to_string(),
        };

        Ok(ResolvedOverlay {
            name,
            tile_url_template,
            tile_size: self.tile_size,
            opacity: self.opacity,
        })
    }
}

/// A validated overlay, ready to mount on either provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOverlay {
    pub name: String,
    pub tile_url_template: String,
    pub tile_size: u32,
    pub opacity: f32,
}

impl ResolvedOverlay {
    /// URL of one tile.
    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        expand_tile_url(&self.tile_url_template, z, x, y)
    }
}

/// Substitutes `{z}`, `{x}` and `{y}` in a tile URL template.
pub fn expand_tile_url(template: &str, z: u8, x: u32, y: u32) -> String {
    template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
