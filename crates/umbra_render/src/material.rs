//! Technique materials and their named sub-passes

use serde::{Deserialize, Serialize};

/// Index of a pass within a material
///
/// Lookups that find nothing resolve to [`PassIndex::NOT_FOUND`] (−1)
/// instead of failing; callers decide what an unresolved pass means.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PassIndex(pub i32);

impl PassIndex {
    /// Sentinel for a pass name the material does not define
    pub const NOT_FOUND: Self = Self(-1);

    /// Check if the index refers to an actual pass
    pub fn is_resolved(&self) -> bool {
        self.0 >= 0
    }

    /// The index as a slot, if resolved
    pub fn get(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl Default for PassIndex {
    fn default() -> Self {
        Self::NOT_FOUND
    }
}

/// A material with an ordered list of named passes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    name: String,
    passes: Vec<String>,
}

impl Material {
    /// Create a material
    pub fn new(name: impl Into<String>, passes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            passes,
        }
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of passes
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Look a pass up by name
    pub fn find_pass(&self, name: &str) -> PassIndex {
        self.passes
            .iter()
            .position(|p| p == name)
            .and_then(|i| i32::try_from(i).ok())
            .map(PassIndex)
            .unwrap_or(PassIndex::NOT_FOUND)
    }

    /// Name of the pass at `index`
    pub fn pass_name(&self, index: PassIndex) -> Option<&str> {
        index
            .get()
            .and_then(|i| self.passes.get(i))
            .map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> Material {
        Material::new(
            "ShadowVolume",
            vec![
                "ShadowVolumeFrontFaces".into(),
                "ShadowVolumeBackFaces".into(),
                "ShadowVolumeShadowPass".into(),
            ],
        )
    }

    #[test]
    fn test_find_pass() {
        let material = material();
        assert_eq!(material.find_pass("ShadowVolumeFrontFaces"), PassIndex(0));
        assert_eq!(material.find_pass("ShadowVolumeShadowPass"), PassIndex(2));
        assert_eq!(material.find_pass("Missing"), PassIndex::NOT_FOUND);
    }

    #[test]
    fn test_pass_index_resolution() {
        assert!(PassIndex(0).is_resolved());
        assert!(!PassIndex::NOT_FOUND.is_resolved());
        assert_eq!(PassIndex::NOT_FOUND.get(), None);
        assert_eq!(PassIndex(2).get(), Some(2));
        assert_eq!(PassIndex::default(), PassIndex(-1));
    }

    #[test]
    fn test_pass_name() {
        let material = material();
        assert_eq!(material.pass_name(PassIndex(1)), Some("ShadowVolumeBackFaces"));
        assert_eq!(material.pass_name(PassIndex(7)), None);
        assert_eq!(material.pass_name(PassIndex::NOT_FOUND), None);
        assert_eq!(material.pass_count(), 3);
    }
}
