use crate::error::TractomeError;
use crate::normalize::GeneKey;
use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            Cell::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Number(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub cells: Vec<Option<Cell>>,
}

impl TableColumn {
    pub fn is_entirely_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// What to do when both join operands carry a column with the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep the left column; take the right one only if the left is empty in every row.
    #[default]
    PreferLeftUnlessEmpty,
    /// Row by row: left value when present, right value otherwise.
    Coalesce,
    KeepLeft,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    KeptLeft,
    TookRight,
    Coalesced { filled: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnCollision {
    pub column: String,
    pub resolution: Resolution,
    /// Rows where both operands had a value and the values differed.
    pub disagreements: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinOutcome {
    pub table: GeneTable,
    /// Left keys that found no right row, in left order.
    pub unmatched: Vec<GeneKey>,
    pub collisions: Vec<ColumnCollision>,
}

/// Column-oriented table whose rows are identified by a normalized gene key.
///
/// Rows keep their insertion order through every operation. Column names are
/// expected to be unique; `append_column` does not enforce it and
/// `dedup_columns` restores it.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct GeneTable {
    keys: Vec<GeneKey>,
    columns: Vec<TableColumn>,
}

impl GeneTable {
    pub fn new(keys: Vec<GeneKey>) -> Self {
        Self { keys, columns: vec![] }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[GeneKey] {
        &self.keys
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column carrying `name`.
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        self.column(name).and_then(|c| c.cells.get(row)).and_then(Option::as_ref)
    }

    pub fn append_column(&mut self, name: &str, cells: Vec<Option<Cell>>) -> Result<(), TractomeError> {
        if cells.len() != self.keys.len() {
            return Err(TractomeError::ColumnLength {
                name: name.to_string(),
                expected: self.keys.len(),
                actual: cells.len(),
            });
        }
        self.columns.push(TableColumn {
            name: name.to_string(),
            cells,
        });
        Ok(())
    }

    pub fn with_column(mut self, name: &str, cells: Vec<Option<Cell>>) -> Result<Self, TractomeError> {
        self.append_column(name, cells)?;
        Ok(self)
    }

    /// Removes every column named in `names`, returning how many went.
    pub fn drop_columns(&mut self, names: &[&str]) -> usize {
        let before = self.columns.len();
        self.columns.retain(|c| !names.contains(&c.name.as_str()));
        before - self.columns.len()
    }

    /// Keeps the first column of every name and returns the names of the dropped ones.
    pub fn dedup_columns(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dropped = vec![];
        self.columns.retain(|c| {
            if seen.insert(c.name.clone()) {
                true
            } else {
                dropped.push(c.name.clone());
                false
            }
        });
        if !dropped.is_empty() {
            warn!("dropped duplicated columns: {:?}", dropped);
        }
        dropped
    }

    pub fn has_unique_keys(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.keys.len());
        self.keys.iter().all(|k| seen.insert(k))
    }

    /// Keeps the first row for every key. Returns the reduced table and the
    /// number of rows removed.
    pub fn unique_by_key(self) -> (Self, usize) {
        let mut seen = HashSet::with_capacity(self.keys.len());
        let keep: Vec<bool> = self.keys.iter().map(|k| seen.insert(k.clone())).collect();
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return (self, 0);
        }

        let keys = self.keys.into_iter().zip(&keep).filter(|(_, k)| **k).map(|(key, _)| key).collect();
        let columns = self
            .columns
            .into_iter()
            .map(|column| TableColumn {
                name: column.name,
                cells: column.cells.into_iter().zip(&keep).filter(|(_, k)| **k).map(|(cell, _)| cell).collect(),
            })
            .collect();
        (GeneTable { keys, columns }, removed)
    }

    /// Left join on the gene key. The right operand must be unique by key so
    /// that no left row can fan out; every left row appears exactly once in
    /// the result, in its original position.
    pub fn left_join(&self, right: &GeneTable, policy: CollisionPolicy) -> Result<JoinOutcome, TractomeError> {
        let mut index: HashMap<&GeneKey, usize> = HashMap::with_capacity(right.len());
        for (row, key) in right.keys.iter().enumerate() {
            if index.insert(key, row).is_some() {
                return Err(TractomeError::NonUniqueJoinKey(key.clone()));
            }
        }

        let matches: Vec<Option<usize>> = self.keys.iter().map(|k| index.get(k).copied()).collect();
        let unmatched: Vec<GeneKey> = self.keys.iter().zip(&matches).filter(|(_, m)| m.is_none()).map(|(k, _)| k.clone()).collect();
        debug!("left join matched {} of {} rows", self.len() - unmatched.len(), self.len());

        let mut table = self.clone();
        let mut collisions = vec![];
        for right_column in right.columns.iter() {
            let aligned: Vec<Option<Cell>> = matches.iter().map(|m| m.and_then(|row| right_column.cells[row].clone())).collect();
            match table.columns.iter_mut().find(|c| c.name == right_column.name) {
                Some(left_column) => collisions.push(resolve_collision(left_column, aligned, policy)),
                None => table.columns.push(TableColumn {
                    name: right_column.name.clone(),
                    cells: aligned,
                }),
            }
        }

        Ok(JoinOutcome { table, unmatched, collisions })
    }
}

fn resolve_collision(left: &mut TableColumn, right: Vec<Option<Cell>>, policy: CollisionPolicy) -> ColumnCollision {
    let disagreements = left.cells.iter().zip(right.iter()).filter(|(l, r)| matches!((l, r), (Some(l), Some(r)) if l != r)).count();

    let resolution = match policy {
        CollisionPolicy::KeepLeft => Resolution::KeptLeft,
        CollisionPolicy::PreferLeftUnlessEmpty => {
            if left.is_entirely_empty() {
                left.cells = right;
                Resolution::TookRight
            } else {
                Resolution::KeptLeft
            }
        }
        CollisionPolicy::Coalesce => {
            let mut filled = 0;
            for (l, r) in left.cells.iter_mut().zip(right) {
                if l.is_none() && r.is_some() {
                    *l = r;
                    filled += 1;
                }
            }
            Resolution::Coalesced { filled }
        }
    };

    if disagreements > 0 {
        warn!("column '{}' differs between join operands in {} rows, resolved as {:?}", left.name, disagreements, resolution);
    }

    ColumnCollision {
        column: left.name.clone(),
        resolution,
        disagreements,
    }
}
