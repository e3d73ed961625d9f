use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::Path,
};

use medley_core::F0Type;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Nodo de la taxonomía tal como viene en el YAML: o un mapa de subtaxones o una lista de hojas.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawNode {
    Branch(BTreeMap<String, RawNode>),
    Leaves(Vec<String>),
    Empty(#[allow(dead_code)] Option<()>),
}

/// Un taxón con sus hijos y los instrumentos que cuelgan directamente de él.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaxonNode {
    pub name: String,
    pub children: Vec<TaxonNode>,
    pub instruments: Vec<String>,
}

impl TaxonNode {
    fn from_raw(name: String, raw: RawNode) -> Self {
        match raw {
            RawNode::Branch(map) => TaxonNode {
                name,
                children: map
                    .into_iter()
                    .map(|(child, node)| TaxonNode::from_raw(child, node))
                    .collect(),
                instruments: Vec::new(),
            },
            RawNode::Leaves(instruments) => TaxonNode {
                name,
                children: Vec::new(),
                instruments,
            },
            RawNode::Empty(_) => TaxonNode {
                name,
                ..Default::default()
            },
        }
    }

    /// Recorre el árbol en preorden llamando a `f(nodo, padre)`.
    pub fn walk<'a, F>(&'a self, parent: Option<&'a TaxonNode>, f: &mut F)
    where
        F: FnMut(&'a TaxonNode, Option<&'a TaxonNode>),
    {
        f(self, parent);
        for child in &self.children {
            child.walk(Some(self), f);
        }
    }
}

/// Taxonomía de instrumentos.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Taxonomy {
    /// Taxones de primer nivel.
    pub roots: Vec<TaxonNode>,
    leaves: BTreeSet<String>,
    parents: HashMap<String, String>,
}

impl Taxonomy {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let taxonomy = Self::from_yaml_str(&text).map_err(|source| Error::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Taxonomía cargada desde {}: {} instrumentos",
            path.display(),
            taxonomy.leaves.len()
        );
        Ok(taxonomy)
    }

    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let raw: BTreeMap<String, RawNode> = serde_yaml::from_str(text)?;
        let roots: Vec<TaxonNode> = raw
            .into_iter()
            .map(|(name, node)| TaxonNode::from_raw(name, node))
            .collect();
        Ok(Self::from_roots(roots))
    }

    pub fn from_roots(roots: Vec<TaxonNode>) -> Self {
        let mut leaves = BTreeSet::new();
        let mut parents = HashMap::new();
        for root in &roots {
            root.walk(None, &mut |node, _| {
                for instrument in &node.instruments {
                    leaves.insert(instrument.clone());
                    parents
                        .entry(instrument.clone())
                        .or_insert_with(|| node.name.clone());
                }
            });
        }
        Taxonomy {
            roots,
            leaves,
            parents,
        }
    }

    /// Todas las etiquetas de instrumento (las hojas del árbol).
    pub fn leaves(&self) -> &BTreeSet<String> {
        &self.leaves
    }

    /// Comparación exacta, sensible a mayúsculas.
    pub fn is_valid_instrument(&self, instrument: &str) -> bool {
        self.leaves.contains(instrument)
    }

    /// Taxón inmediato que contiene al instrumento.
    pub fn taxon_of(&self, instrument: &str) -> Option<&str> {
        self.parents.get(instrument).map(String::as_str)
    }
}

/// Tabla instrumento -> tipos de f0 (`instrument_f0_type.json`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct F0TypeTable {
    entries: HashMap<String, Vec<F0Type>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl F0TypeTable {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: HashMap<String, OneOrMany> = serde_json::from_str(text)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (instrument, codes) in raw {
            let codes = match codes {
                OneOrMany::One(code) => vec![code],
                OneOrMany::Many(codes) => codes,
            };
            let types = codes
                .iter()
                .map(|c| c.parse::<F0Type>())
                .collect::<std::result::Result<Vec<_>, _>>()?;
            entries.insert(instrument, types);
        }
        Ok(F0TypeTable { entries })
    }

    /// Tipos de f0 de un instrumento; vacío si no aparece en la tabla.
    pub fn lookup(&self, instrument: &str) -> Vec<F0Type> {
        match self.entries.get(instrument) {
            Some(types) => types.clone(),
            None => {
                debug!("Instrumento sin tipo de f0 registrado: {}", instrument);
                Vec::new()
            }
        }
    }

    /// Tipos de f0 de una lista de instrumentos, sin duplicados y en orden de aparición.
    pub fn lookup_all(&self, instruments: &[String]) -> Vec<F0Type> {
        let mut out = Vec::new();
        for instrument in instruments {
            for f0 in self.lookup(instrument) {
                if !out.contains(&f0) {
                    out.push(f0);
                }
            }
        }
        out
    }
}
