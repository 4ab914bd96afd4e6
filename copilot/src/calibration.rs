//! Persisted screen-region calibration.
//!
//! Every screen location the pipeline looks at is a named percent-of-screen
//! rectangle in one JSON file the operator can edit and recalibrate. Keys are
//! dotted `owner.part` names. Entries may carry a reference `text`, the label
//! expected inside the region, which calibration tooling uses to verify a
//! candidate rectangle by OCR.
//!
//! Some regions are not calibrated directly but derived as a fixed
//! sub-rectangle of a parent; derivations re-run on every save so moving a
//! parent moves its children with it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use vision::Quad;

pub const ROUND_DIGITS: u32 = 4;

/// One named region as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    /// `[left, top, right, bottom]`, each as a fraction of the screen.
    pub rect: [f32; 4],
    /// Label expected inside the region, for OCR-verified calibration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

struct Derivation {
    parent: String,
    child: String,
    region: Quad,
}

pub struct Registry {
    path: PathBuf,
    regions: BTreeMap<String, RegionEntry>,
    derived: Vec<Derivation>,
}

impl Registry {
    /// Load the registry at `path`, creating it from `defaults` if absent.
    ///
    /// An existing file is back-filled: any default key it lacks is added and
    /// the file rewritten, so upgrades introducing new regions keep old
    /// calibrations intact. Keys unknown to `defaults` pass through
    /// untouched.
    pub fn load(
        path: impl Into<PathBuf>,
        defaults: BTreeMap<String, RegionEntry>,
    ) -> anyhow::Result<Self> {
        let path = path.into();
        let mut registry = Self {
            path,
            regions: BTreeMap::new(),
            derived: Vec::new(),
        };

        if registry.path.exists() {
            let json = std::fs::read_to_string(&registry.path)
                .with_context(|| format!("reading calibration {:?}", registry.path))?;
            registry.regions = serde_json::from_str(&json)
                .with_context(|| format!("parsing calibration {:?}", registry.path))?;

            let mut added = 0usize;
            for (key, entry) in defaults {
                if !registry.regions.contains_key(&key) {
                    registry.regions.insert(key, entry);
                    added += 1;
                }
            }
            if added > 0 {
                log::info!("calibration gained {added} new default region(s)");
                registry.save()?;
            }
        } else {
            log::info!("no calibration at {:?}; writing defaults", registry.path);
            registry.regions = defaults;
            registry.save()?;
        }

        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Region rectangle as an axis-aligned quad. `None` for unknown keys.
    pub fn quad(&self, key: &str) -> Option<Quad> {
        self.regions.get(key).map(|e| Quad::from_rect(e.rect))
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.regions.get(key)?.text.as_deref()
    }

    /// Replace a region's rectangle, keeping its reference text.
    pub fn set_rect(&mut self, key: &str, quad: &Quad) {
        let rect = quad.to_rect_rounded(ROUND_DIGITS);
        match self.regions.get_mut(key) {
            Some(entry) => entry.rect = rect,
            None => {
                self.regions.insert(key.to_string(), RegionEntry { rect, text: None });
            }
        }
    }

    /// Define `child` as the `region` sub-rectangle of `parent`, recomputed
    /// on every save. Takes effect immediately in memory.
    pub fn derive(&mut self, parent: &str, child: &str, region: Quad) {
        self.derived.push(Derivation {
            parent: parent.to_string(),
            child: child.to_string(),
            region,
        });
        self.apply_derivation(self.derived.len() - 1);
    }

    fn apply_derivation(&mut self, idx: usize) {
        let Derivation { parent, child, region } = &self.derived[idx];
        let Some(parent_quad) = self.quad(parent) else {
            log::warn!("derived region '{child}' has no parent '{parent}'");
            return;
        };
        let rect = parent_quad.sub_region(*region).to_rect_rounded(ROUND_DIGITS);
        let text = self.regions.get(child.as_str()).and_then(|e| e.text.clone());
        self.regions.insert(child.clone(), RegionEntry { rect, text });
    }

    /// Re-run derivations and write the registry to disk.
    pub fn save(&mut self) -> anyhow::Result<()> {
        for idx in 0..self.derived.len() {
            self.apply_derivation(idx);
        }
        for entry in self.regions.values_mut() {
            entry.rect = Quad::from_rect(entry.rect).to_rect_rounded(ROUND_DIGITS);
        }
        let json = serde_json::to_string_pretty(&self.regions)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing calibration {:?}", self.path))
    }
}

/// Compiled-in region defaults, calibrated against the reference 3440x1440
/// layout. Bounds pairs describe the perspective-skewed cockpit panels: the
/// first rectangle pins the top-left and bottom-right corners, the second
/// the top-right and bottom-left.
pub fn default_regions() -> BTreeMap<String, RegionEntry> {
    let mut regions = BTreeMap::new();
    let mut add = |key: &str, rect: [f32; 4], text: Option<&str>| {
        regions.insert(
            key.to_string(),
            RegionEntry {
                rect,
                text: text.map(str::to_string),
            },
        );
    };

    add(
        "nav_panel.bounds1",
        [0.1089, 0.4704, 0.6406, 0.8696],
        Some("NAVIGATION"),
    );
    add("nav_panel.bounds2", [0.0987, 0.4837, 0.6561, 0.8563], None);
    add(
        "status_panel.bounds1",
        [0.3594, 0.4704, 0.8911, 0.8696],
        Some("MODULES"),
    );
    add("status_panel.bounds2", [0.3439, 0.4837, 0.9013, 0.8563], None);

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_close(a: &Quad, b: &Quad) -> bool {
        a.to_rect()
            .iter()
            .zip(b.to_rect())
            .all(|(x, y)| (x - y).abs() < 1e-3)
    }

    #[test]
    fn bootstrap_writes_defaults_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");

        let mut defaults = BTreeMap::new();
        defaults.insert(
            "A.b".to_string(),
            RegionEntry {
                rect: [0.1, 0.1, 0.9, 0.9],
                text: None,
            },
        );

        let registry = Registry::load(&path, defaults.clone()).unwrap();
        assert!(path.exists());
        assert!(quad_close(
            &registry.quad("A.b").unwrap(),
            &Quad::from_rect([0.1, 0.1, 0.9, 0.9])
        ));

        // A fresh load of the same file sees the persisted entry.
        let again = Registry::load(&path, BTreeMap::new()).unwrap();
        assert_eq!(again.quad("A.b"), registry.quad("A.b"));
    }

    #[test]
    fn existing_file_gains_new_defaults_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");

        let mut v1 = BTreeMap::new();
        v1.insert(
            "A.b".to_string(),
            RegionEntry { rect: [0.1, 0.1, 0.9, 0.9], text: None },
        );
        let mut registry = Registry::load(&path, v1).unwrap();
        registry.set_rect("A.b", &Quad::from_rect([0.2, 0.2, 0.8, 0.8]));
        registry.save().unwrap();

        let mut v2 = BTreeMap::new();
        v2.insert(
            "A.b".to_string(),
            RegionEntry { rect: [0.1, 0.1, 0.9, 0.9], text: None },
        );
        v2.insert(
            "C.d".to_string(),
            RegionEntry { rect: [0.0, 0.0, 0.5, 0.5], text: Some("LABEL".into()) },
        );
        let upgraded = Registry::load(&path, v2).unwrap();

        // The operator's calibration of A.b survives; C.d arrives new.
        assert!(quad_close(
            &upgraded.quad("A.b").unwrap(),
            &Quad::from_rect([0.2, 0.2, 0.8, 0.8])
        ));
        assert_eq!(upgraded.text("C.d"), Some("LABEL"));
    }

    #[test]
    fn derived_regions_follow_their_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");

        let mut defaults = BTreeMap::new();
        defaults.insert(
            "panel.body".to_string(),
            RegionEntry { rect: [0.0, 0.0, 1.0, 1.0], text: None },
        );
        let mut registry = Registry::load(&path, defaults).unwrap();
        registry.derive("panel.body", "panel.header", Quad::from_rect([0.0, 0.0, 1.0, 0.1]));
        assert!(quad_close(
            &registry.quad("panel.header").unwrap(),
            &Quad::from_rect([0.0, 0.0, 1.0, 0.1])
        ));

        // Moving the parent and saving recomputes the child.
        registry.set_rect("panel.body", &Quad::from_rect([0.5, 0.5, 1.0, 1.0]));
        registry.save().unwrap();
        assert!(quad_close(
            &registry.quad("panel.header").unwrap(),
            &Quad::from_rect([0.5, 0.5, 1.0, 0.55])
        ));
    }

    #[test]
    fn rects_round_to_four_decimals_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.json");

        let mut registry = Registry::load(&path, BTreeMap::new()).unwrap();
        registry.set_rect("A.b", &Quad::from_rect([0.123_456, 0.2, 0.987_654, 0.9]));
        registry.save().unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("0.1235"));
        assert!(json.contains("0.9877"));
    }

    #[test]
    fn default_regions_cover_both_panels() {
        let defaults = default_regions();
        for key in [
            "nav_panel.bounds1",
            "nav_panel.bounds2",
            "status_panel.bounds1",
            "status_panel.bounds2",
        ] {
            assert!(defaults.contains_key(key), "missing {key}");
        }
        assert_eq!(defaults["nav_panel.bounds1"].text.as_deref(), Some("NAVIGATION"));
    }
}
