//! Tile layers.
//!
//! A layer is one integer code per tile of a lane. In the world file every
//! layer is written as a single string of space-separated integers, e.g.
//! `"0 0 -1 2 2"`. Loading also accepts a plain JSON array of integers.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Road code marking a tile that cannot be walked on at all.
pub const IMPASSABLE: i32 = -1;

/// One integer-coded layer of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileLayer(Vec<i32>);

impl TileLayer {
    /// A layer of `width` tiles all set to `code`.
    pub fn filled(width: usize, code: i32) -> Self {
        Self(vec![code; width])
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the layer has no tiles.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Code at `tile`, or `None` outside the lane.
    pub fn get(&self, tile: usize) -> Option<i32> {
        self.0.get(tile).copied()
    }

    /// Codes in tile order.
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Consume the layer into its codes.
    pub fn into_inner(self) -> Vec<i32> {
        self.0
    }

    /// Parse the space-separated file encoding.
    pub fn parse(text: &str) -> Result<Self, String> {
        text.split_whitespace()
            .map(|part| {
                part.parse::<i32>()
                    .map_err(|_| format!("invalid tile code '{part}'"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<i32>> for TileLayer {
    fn from(codes: Vec<i32>) -> Self {
        Self(codes)
    }
}

impl fmt::Display for TileLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, code) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{code}")?;
        }
        Ok(())
    }
}

impl Serialize for TileLayer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TileLayerVisitor;

impl<'de> Visitor<'de> for TileLayerVisitor {
    type Value = TileLayer;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string of space-separated integers or an integer array")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TileLayer, E> {
        TileLayer::parse(v).map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TileLayer, A::Error> {
        let mut codes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(code) = seq.next_element::<i32>()? {
            codes.push(code);
        }
        Ok(TileLayer(codes))
    }
}

impl<'de> Deserialize<'de> for TileLayer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TileLayerVisitor)
    }
}
