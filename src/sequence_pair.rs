//! Sequence-Pair Engine (component C4): two permutations of the block set
//! and the O(n²) longest-path-style decode that turns them into a
//! placement.

use std::collections::HashMap;

use rand::Rng;

use crate::catalog::Catalog;
use crate::error::{FloorplanError, Result};
use crate::io::SequencePairSection;
use crate::placement::{PlacedBlock, Placement};

/// The three supported SA neighbor moves (`spec.md` §4.4). All three
/// preserve SP feasibility by construction, so none can produce an invalid
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePairMove {
    SwapPlus,
    SwapMinus,
    VariantChange,
}

impl SequencePairMove {
    pub const ALL: [SequencePairMove; 3] =
        [SequencePairMove::SwapPlus, SequencePairMove::SwapMinus, SequencePairMove::VariantChange];

    pub fn random(rng: &mut impl Rng) -> SequencePairMove {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Two permutations `Γ⁺`/`Γ⁻` of the block set plus the currently selected
/// variant index per block.
#[derive(Debug, Clone)]
pub struct SequencePair {
    r_plus: Vec<String>,
    r_minus: Vec<String>,
    variant_index: HashMap<String, usize>,
}

impl SequencePair {
    /// `Γ⁺` = block names in catalog (input) order; `Γ⁻` = the reverse.
    /// This pair is always feasible (`spec.md` §4.4).
    pub fn construct(catalog: &Catalog) -> Result<SequencePair> {
        if catalog.is_empty() {
            return Err(FloorplanError::EmptyBlockSet);
        }
        let r_plus: Vec<String> = catalog.names().map(|s| s.to_string()).collect();
        let r_minus: Vec<String> = r_plus.iter().rev().cloned().collect();
        let mut variant_index = HashMap::with_capacity(r_plus.len());
        for name in &r_plus {
            variant_index.insert(name.clone(), catalog.default_variant_index(name)?);
        }
        Ok(SequencePair { r_plus, r_minus, variant_index })
    }

    /// Rebuilds from a wire record (e.g. a prior `build-sp` stage, or a
    /// previous SA run's output being annealed further), validating both
    /// permutations are a permutation of exactly the catalog's block names.
    pub fn from_section(section: &SequencePairSection, catalog: &Catalog) -> Result<SequencePair> {
        let expected: std::collections::BTreeSet<&str> = catalog.names().collect();
        let got_plus: std::collections::BTreeSet<&str> = section.r_plus.iter().map(String::as_str).collect();
        let got_minus: std::collections::BTreeSet<&str> = section.r_minus.iter().map(String::as_str).collect();
        if got_plus != expected || got_minus != expected || section.r_plus.len() != expected.len() {
            return Err(FloorplanError::InvalidInput(
                "sequence_pair permutations do not match the block catalog".to_string(),
            ));
        }
        let mut variant_index = HashMap::with_capacity(section.r_plus.len());
        for name in &section.r_plus {
            variant_index.insert(name.clone(), catalog.default_variant_index(name)?);
        }
        Ok(SequencePair {
            r_plus: section.r_plus.clone(),
            r_minus: section.r_minus.clone(),
            variant_index,
        })
    }

    pub fn r_plus(&self) -> &[String] {
        &self.r_plus
    }

    pub fn r_minus(&self) -> &[String] {
        &self.r_minus
    }

    /// O(n²) decode: scan in `Γ⁺` order, growing `(x, y)` against every
    /// already-placed predecessor per the four-case relation table
    /// (`spec.md` §3, §4.4).
    pub fn decode(&self, catalog: &Catalog) -> Result<Placement> {
        let pos_plus: HashMap<&str, usize> = self.r_plus.iter().map(|s| s.as_str()).zip(0..).collect();
        let pos_minus: HashMap<&str, usize> = self.r_minus.iter().map(|s| s.as_str()).zip(0..).collect();

        let mut placement = Placement::new();
        for name in &self.r_plus {
            let variant_idx = *self.variant_index.get(name).unwrap_or(&0);
            let variant = catalog
                .variants(name)?
                .get(variant_idx)
                .ok_or_else(|| FloorplanError::DecodeFailure(format!("variant index out of range for block {name}")))?;
            let mut x = 0.0_f64;
            let mut y = 0.0_f64;
            let pb = pos_plus[name.as_str()];
            let mb = pos_minus[name.as_str()];
            for (other_name, other_rect) in placement.iter() {
                let pa = pos_plus[other_name.as_str()];
                let ma = pos_minus[other_name.as_str()];
                if pa < pb && ma < mb {
                    x = x.max(other_rect.x_max);
                } else if pa < pb && ma > mb {
                    y = y.max(other_rect.y_max);
                }
            }
            let x_max = x + variant.width;
            let y_max = y + variant.height;
            if !x_max.is_finite() || !y_max.is_finite() {
                return Err(FloorplanError::DecodeFailure(format!("non-finite coordinates for block {name}")));
            }
            placement.insert(name.clone(), PlacedBlock { x_min: x, y_min: y, x_max, y_max });
        }
        Ok(placement)
    }

    /// S1: swap two positions in `Γ⁺`.
    pub fn apply_swap_plus(&mut self, rng: &mut impl Rng) {
        Self::swap_two(&mut self.r_plus, rng);
    }

    /// S2: swap two positions in `Γ⁻`.
    pub fn apply_swap_minus(&mut self, rng: &mut impl Rng) {
        Self::swap_two(&mut self.r_minus, rng);
    }

    fn swap_two(sequence: &mut [String], rng: &mut impl Rng) {
        if sequence.len() < 2 {
            return;
        }
        let i = rng.gen_range(0..sequence.len());
        let j = loop {
            let candidate = rng.gen_range(0..sequence.len());
            if candidate != i {
                break candidate;
            }
        };
        sequence.swap(i, j);
    }

    /// S3: change the variant index of a random block to any other index.
    pub fn apply_variant_change(&mut self, catalog: &Catalog, rng: &mut impl Rng) -> Result<()> {
        if self.r_plus.is_empty() {
            return Ok(());
        }
        let idx = rng.gen_range(0..self.r_plus.len());
        let name = &self.r_plus[idx];
        let variants = catalog.variants(name)?;
        if variants.len() < 2 {
            return Ok(());
        }
        let current = *self.variant_index.get(name).unwrap_or(&0);
        let choice = loop {
            let candidate = rng.gen_range(0..variants.len());
            if candidate != current {
                break candidate;
            }
        };
        self.variant_index.insert(name.clone(), choice);
        Ok(())
    }

    pub fn apply_move(&mut self, mv: SequencePairMove, catalog: &Catalog, rng: &mut impl Rng) -> Result<()> {
        match mv {
            SequencePairMove::SwapPlus => {
                self.apply_swap_plus(rng);
                Ok(())
            }
            SequencePairMove::SwapMinus => {
                self.apply_swap_minus(rng);
                Ok(())
            }
            SequencePairMove::VariantChange => self.apply_variant_change(catalog, rng),
        }
    }

    /// Serializes the current permutations and a decoded placement into the
    /// wire record shape, rounding coordinates to two decimals.
    pub fn to_section(&self, placement: &Placement) -> Result<SequencePairSection> {
        use crate::io::RawPlacedRect;
        use crate::result::round2;
        let mut out = std::collections::BTreeMap::new();
        for (name, rect) in placement.iter() {
            out.insert(
                name.clone(),
                RawPlacedRect {
                    x_min: round2(rect.x_min),
                    y_min: round2(rect.y_min),
                    x_max: round2(rect.x_max),
                    y_max: round2(rect.y_max),
                    width: Some(round2(rect.width())),
                    height: Some(round2(rect.height())),
                },
            );
        }
        Ok(SequencePairSection { r_plus: self.r_plus.clone(), r_minus: self.r_minus.clone(), placement: out })
    }
}
