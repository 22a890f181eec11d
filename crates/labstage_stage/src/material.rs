// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geometry and surface presentation for entities.

use labstage_sequencer::{AssetKind, MaterialClass, PbrMaterial, Rgb};

/// Mesh used to draw an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// Unit-radius sphere
    Sphere {
        /// Width and height segments
        segments: u32,
    },
    /// Unit cube
    Cube,
    /// Radius 1, height 2
    Cylinder {
        /// Radial segments
        segments: u32,
    },
}

impl Geometry {
    /// Mesh for an entity kind. External models and unknown kinds draw as a
    /// low-detail sphere.
    pub fn for_kind(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Sphere => Geometry::Sphere { segments: 32 },
            AssetKind::Cube => Geometry::Cube,
            AssetKind::Cylinder => Geometry::Cylinder { segments: 32 },
            AssetKind::GlbAsset | AssetKind::Unknown => Geometry::Sphere { segments: 16 },
        }
    }

    /// Half extents of the unscaled mesh
    pub fn half_extents(&self) -> [f32; 3] {
        match self {
            Geometry::Sphere { .. } => [1.0, 1.0, 1.0],
            Geometry::Cube => [0.5, 0.5, 0.5],
            Geometry::Cylinder { .. } => [1.0, 1.0, 1.0],
        }
    }
}

/// Shading model of a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    /// Standard metal/rough shading
    Standard,
    /// Physical shading with light transmission
    Transmissive {
        /// Transmission in [0, 1]
        transmission: f32,
        /// Volume thickness
        thickness: f32,
        /// Index of refraction
        ior: f32,
    },
    /// Self-lit in the base color
    Emissive {
        /// Emission strength
        intensity: f32,
    },
}

/// Resolved surface look of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialLook {
    /// Authored base color
    pub base_color: Rgb,
    /// Roughness
    pub roughness: f32,
    /// Metalness
    pub metalness: f32,
    /// Shading model
    pub surface: Surface,
    /// Whether the surface is blended
    pub transparent: bool,
}

impl MaterialLook {
    /// Resolve an authored material
    pub fn from_material(material: &PbrMaterial) -> Self {
        let surface = match material.material_class {
            MaterialClass::Glass | MaterialClass::Liquid => Surface::Transmissive {
                transmission: material.transmission.unwrap_or(1.0),
                thickness: material.thickness.unwrap_or(1.0),
                ior: material.ior.unwrap_or(1.5),
            },
            MaterialClass::Emission => Surface::Emissive { intensity: 2.0 },
            _ => Surface::Standard,
        };

        Self {
            base_color: material.base_rgb(),
            roughness: material.roughness,
            metalness: material.metalness,
            transparent: matches!(surface, Surface::Transmissive { .. }),
            surface,
        }
    }

    /// Opacity a flat renderer should use for this surface
    pub fn flat_opacity(&self) -> f32 {
        match self.surface {
            Surface::Transmissive { transmission, .. } => (1.0 - 0.7 * transmission).clamp(0.2, 1.0),
            _ => 1.0,
        }
    }

    /// Shade a live color for a flat renderer given a light factor in [0, 1]
    pub fn shade(&self, color: Rgb, light: f32) -> Rgb {
        match self.surface {
            Surface::Emissive { intensity } => color.scaled(intensity.max(1.0)),
            _ => {
                let gloss = (1.0 - self.roughness).clamp(0.0, 1.0) * 0.2;
                color.scaled(light + gloss)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn material(class: &str, extra: serde_json::Value) -> PbrMaterial {
        let mut value = json!({
            "material_class": class, "base_color": "#808080", "roughness": 0.3, "metalness": 0.1
        });
        if let (Some(obj), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_transmissive_defaults() {
        let look = MaterialLook::from_material(&material("GLASS", json!({})));
        assert_eq!(
            look.surface,
            Surface::Transmissive { transmission: 1.0, thickness: 1.0, ior: 1.5 }
        );
        assert!(look.transparent);

        let liquid = MaterialLook::from_material(&material("LIQUID", json!({ "ior": 1.33, "transmission": 0.5 })));
        assert_eq!(
            liquid.surface,
            Surface::Transmissive { transmission: 0.5, thickness: 1.0, ior: 1.33 }
        );
    }

    #[test]
    fn test_emissive_and_standard() {
        let look = MaterialLook::from_material(&material("EMISSION", json!({})));
        assert_eq!(look.surface, Surface::Emissive { intensity: 2.0 });
        assert!(!look.transparent);

        for class in ["METAL", "PLASTIC", "STONE", "CHEESE"] {
            assert_eq!(MaterialLook::from_material(&material(class, json!({}))).surface, Surface::Standard);
        }
    }

    #[test]
    fn test_geometry_for_kind() {
        assert_eq!(Geometry::for_kind(AssetKind::Sphere), Geometry::Sphere { segments: 32 });
        assert_eq!(Geometry::for_kind(AssetKind::Cube), Geometry::Cube);
        assert_eq!(Geometry::for_kind(AssetKind::GlbAsset), Geometry::Sphere { segments: 16 });
        assert_eq!(Geometry::for_kind(AssetKind::Unknown), Geometry::Sphere { segments: 16 });
    }
}
