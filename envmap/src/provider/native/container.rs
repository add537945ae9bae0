//! The surface a native map renders into.

/// How the host drives render passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// The first frame is rendered while the map is constructed (headless
    /// surfaces, CLI probes).
    #[default]
    Immediate,
    /// The host calls `render_frame` when its surface is ready.
    Deferred,
}

/// A host element that owns the map's pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapContainer {
    id: String,
    width: u32,
    height: u32,
    render_mode: RenderMode,
}

impl MapContainer {
    /// Creates a container rendered by the host.
    pub fn new(id: impl Into<String>, width: u32, height: u32, render_mode: RenderMode) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            render_mode,
        }
    }

    /// Creates a container that renders immediately.
    pub fn headless(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(id, width, height, RenderMode::Immediate)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    /// A container is attached when it has an id and a non-empty area.
    pub fn is_attached(&self) -> bool {
        !self.id.trim().is_empty() && self.width > 0 && self.height > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_container() {
        let container = MapContainer::headless("map", 800, 600);
        assert_eq!(container.id(), "map");
        assert_eq!(container.render_mode(), RenderMode::Immediate);
        assert!(container.is_attached());
    }

    #[test]
    fn test_detached_container() {
        assert!(!MapContainer::headless("", 800, 600).is_attached());
        assert!(!MapContainer::headless("map", 0, 600).is_attached());
    }
}
