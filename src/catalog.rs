//! Block Catalog (component C1).
//!
//! Holds the immutable set of blocks and their shape variants for a run, and
//! resolves the default variant for a block by name.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{FloorplanError, Result};
use crate::io::{RawBlock, RawVariant};

/// One legal rectangular shape a block may assume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variant {
    pub width: f64,
    pub height: f64,
    pub is_default: bool,
}

impl Variant {
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A placeable module: a name, optional opaque attributes, and its variants.
#[derive(Debug, Clone)]
pub struct Block {
    pub name: String,
    pub device_type: Option<Value>,
    pub symmetry: Option<Value>,
    pub variants: Vec<Variant>,
}

impl Block {
    /// Index of the variant flagged `is_default`, falling back to the first
    /// variant when none is flagged (`spec.md` §3: "exactly zero or one
    /// variant per block is default").
    fn default_variant_index(&self) -> usize {
        self.variants.iter().position(|v| v.is_default).unwrap_or(0)
    }

    pub fn default_variant(&self) -> &Variant {
        &self.variants[self.default_variant_index()]
    }

    pub fn area_of_default_variant(&self) -> f64 {
        self.default_variant().area()
    }
}

/// The immutable, validated set of blocks for a run.
#[derive(Debug, Clone)]
pub struct Catalog {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Validate and load raw (dynamically typed) blocks into a typed
    /// catalog. Fails with [`FloorplanError::EmptyBlockSet`] if `raw_blocks`
    /// is empty, [`FloorplanError::InvalidInput`] if a block is missing a
    /// name, and [`FloorplanError::MalformedVariant`] if a block has no
    /// variant with positive, finite dimensions.
    pub fn load(raw_blocks: &[RawBlock]) -> Result<Catalog> {
        if raw_blocks.is_empty() {
            return Err(FloorplanError::EmptyBlockSet);
        }
        let mut blocks = Vec::with_capacity(raw_blocks.len());
        let mut index = HashMap::with_capacity(raw_blocks.len());
        for raw in raw_blocks {
            let name = raw.name.trim();
            if name.is_empty() {
                return Err(FloorplanError::InvalidInput("block missing a non-empty name".to_string()));
            }
            let variants = Self::validate_variants(name, &raw.variants)?;
            if index.insert(name.to_string(), blocks.len()).is_some() {
                return Err(FloorplanError::InvalidInput(format!("duplicate block name: {name}")));
            }
            blocks.push(Block {
                name: name.to_string(),
                device_type: raw.device_type.clone(),
                symmetry: raw.symmetry.clone(),
                variants,
            });
        }
        Ok(Catalog { blocks, index })
    }

    fn validate_variants(block_name: &str, raw_variants: &[RawVariant]) -> Result<Vec<Variant>> {
        if raw_variants.is_empty() {
            return Err(FloorplanError::MalformedVariant {
                block: block_name.to_string(),
                reason: "no variants given".to_string(),
            });
        }
        let mut default_seen = false;
        let mut variants = Vec::with_capacity(raw_variants.len());
        for raw in raw_variants {
            if !raw.width.is_finite() || raw.width <= 0.0 || !raw.height.is_finite() || raw.height <= 0.0 {
                return Err(FloorplanError::MalformedVariant {
                    block: block_name.to_string(),
                    reason: format!("non-positive or non-finite dimensions ({}, {})", raw.width, raw.height),
                });
            }
            let is_default = raw.is_default.unwrap_or(false) && !default_seen;
            default_seen |= is_default;
            variants.push(Variant {
                width: raw.width,
                height: raw.height,
                is_default,
            });
        }
        Ok(variants)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|b| b.name.as_str())
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    fn resolve(&self, name: &str) -> Result<&Block> {
        let idx = self
            .index
            .get(name)
            .copied()
            .ok_or_else(|| FloorplanError::UnknownBlock(name.to_string()))?;
        Ok(&self.blocks[idx])
    }

    pub fn block(&self, name: &str) -> Result<&Block> {
        self.resolve(name)
    }

    /// Returns the variant flagged default for `name`, else the first.
    pub fn default_variant(&self, name: &str) -> Result<Variant> {
        Ok(*self.resolve(name)?.default_variant())
    }

    /// Index (into [`Catalog::variants`]) of the default variant for `name`.
    pub fn default_variant_index(&self, name: &str) -> Result<usize> {
        Ok(self.resolve(name)?.default_variant_index())
    }

    /// Ordered list of variants for `name`, preserving input order.
    pub fn variants(&self, name: &str) -> Result<&[Variant]> {
        Ok(&self.resolve(name)?.variants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, variants: Vec<RawVariant>) -> RawBlock {
        RawBlock {
            name: name.to_string(),
            device_type: None,
            symmetry: None,
            variants,
        }
    }

    fn variant(w: f64, h: f64, is_default: bool) -> RawVariant {
        RawVariant {
            width: w,
            height: h,
            is_default: Some(is_default),
        }
    }

    #[test]
    fn loads_simple_catalog() {
        let blocks = vec![raw("A", vec![variant(5.0, 3.0, true)])];
        let catalog = Catalog::load(&blocks).unwrap();
        assert_eq!(catalog.len(), 1);
        let v = catalog.default_variant("A").unwrap();
        assert_eq!((v.width, v.height), (5.0, 3.0));
    }

    #[test]
    fn empty_catalog_fails() {
        let err = Catalog::load(&[]).unwrap_err();
        assert_eq!(err, FloorplanError::EmptyBlockSet);
    }

    #[test]
    fn missing_default_falls_back_to_first() {
        let blocks = vec![raw(
            "A",
            vec![variant(4.0, 1.0, false), variant(1.0, 4.0, false)],
        )];
        let catalog = Catalog::load(&blocks).unwrap();
        let v = catalog.default_variant("A").unwrap();
        assert_eq!((v.width, v.height), (4.0, 1.0));
    }

    #[test]
    fn unknown_block_fails() {
        let blocks = vec![raw("A", vec![variant(1.0, 1.0, true)])];
        let catalog = Catalog::load(&blocks).unwrap();
        assert_eq!(catalog.default_variant("B").unwrap_err(), FloorplanError::UnknownBlock("B".to_string()));
    }

    #[test]
    fn malformed_variant_fails() {
        let blocks = vec![raw("A", vec![variant(0.0, 1.0, true)])];
        assert!(matches!(Catalog::load(&blocks), Err(FloorplanError::MalformedVariant { .. })));
    }
}
