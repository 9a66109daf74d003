//! Local SVG rendering for generative token icons.
//!
//! [`IdenticonRenderer`] draws a horizontally mirrored 5x5 grid whose cells and
//! colour come from a SHA-256 digest of the seed. Output is deterministic and
//! always 320x320; callers resize by rewriting the root element's attributes.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use tokicon_core::Error;
use tokicon_core::wallet::GenerativeRenderer;

const GRID: usize = 5;
const CANVAS: usize = 320;
const CELL: usize = CANVAS / GRID;
const BACKGROUND: &str = "#f0f0f0";

/// Deterministic identicon renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdenticonRenderer;

impl IdenticonRenderer {
    fn digest(seed: &[u32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for part in seed {
            hasher.update(part.to_le_bytes());
        }
        hasher.finalize().into()
    }

    /// Filled cells, row-major. Columns 3 and 4 mirror columns 1 and 0.
    fn cells(digest: &[u8; 32]) -> [[bool; GRID]; GRID] {
        let mut cells = [[false; GRID]; GRID];
        for (row, line) in cells.iter_mut().enumerate() {
            for col in 0..GRID.div_ceil(2) {
                let on = digest[3 + row * 3 + col] & 1 == 1;
                line[col] = on;
                line[GRID - 1 - col] = on;
            }
        }
        cells
    }
}

impl GenerativeRenderer for IdenticonRenderer {
    fn render(&self, seed: &[u32]) -> Result<String, Error> {
        if seed.is_empty() {
            return Err(Error::InvalidInput("generative seed is empty".into()));
        }

        let digest = Self::digest(seed);
        let colour = format!("#{}", hex::encode(&digest[..3]));

        let mut svg = format!(
            r#"<svg width="{CANVAS}" height="{CANVAS}" viewBox="0 0 {CANVAS} {CANVAS}" xmlns="http://www.w3.org/2000/svg"><rect width="{CANVAS}" height="{CANVAS}" fill="{BACKGROUND}"/>"#
        );
        for (row, line) in Self::cells(&digest).iter().enumerate() {
            for (col, _) in line.iter().enumerate().filter(|(_, on)| **on) {
                let _ = write!(svg, r#"<rect x="{}" y="{}" width="{CELL}" height="{CELL}" fill="{colour}"/>"#, col * CELL, row * CELL);
            }
        }
        svg.push_str("</svg>");
        Ok(svg)
    }
}
