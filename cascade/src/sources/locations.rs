//! The location hierarchy as a DAG of containment edges, parent to child.

use std::collections::BTreeSet;

use itertools::izip;
use log::info;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use polars::prelude::DataFrame;

use crate::column_names as COL;
use crate::error::{CascadeError, Result};
use crate::frame::required_i64;

#[derive(Debug, Clone)]
pub struct LocationDag {
    pub location_set_version_id: i64,
    root: i64,
    dag: DiGraphMap<i64, ()>,
}

impl LocationDag {
    /// Builds the hierarchy from `(location_id, parent_id)` rows; the root is its own parent.
    pub fn from_df(location_set_version_id: i64, df: &DataFrame) -> Result<Self> {
        let edges = izip!(
            required_i64(df, COL::LOCATION_ID)?,
            required_i64(df, COL::PARENT_ID)?
        )
        .collect::<Vec<_>>();
        Self::from_edges(location_set_version_id, &edges)
    }

    pub fn from_edges(location_set_version_id: i64, edges: &[(i64, i64)]) -> Result<Self> {
        let mut dag = DiGraphMap::new();
        let mut roots = BTreeSet::new();
        for &(location_id, parent_id) in edges {
            dag.add_node(location_id);
            if location_id == parent_id {
                roots.insert(location_id);
            } else {
                dag.add_edge(parent_id, location_id, ());
            }
        }

        let root = match (roots.first(), roots.len()) {
            (Some(root), 1) => *root,
            (None, _) => {
                return Err(CascadeError::InvalidHierarchy(
                    "hierarchy has no root".to_string(),
                ))
            }
            _ => {
                return Err(CascadeError::InvalidHierarchy(format!(
                    "hierarchy has several roots: {roots:?}"
                )))
            }
        };
        toposort(&dag, None).map_err(|cycle| {
            CascadeError::InvalidHierarchy(format!(
                "cycle through location {}",
                cycle.node_id()
            ))
        })?;
        for location_id in dag.nodes() {
            let parents = dag
                .neighbors_directed(location_id, Direction::Incoming)
                .count();
            let expected = usize::from(location_id != root);
            if parents != expected {
                return Err(CascadeError::InvalidHierarchy(format!(
                    "location {location_id} has {parents} parents"
                )));
            }
        }

        info!(
            "Location hierarchy {location_set_version_id} has {} locations under root {root}",
            dag.node_count()
        );
        Ok(Self {
            location_set_version_id,
            root,
            dag,
        })
    }

    pub fn root(&self) -> i64 {
        self.root
    }

    pub fn contains(&self, location_id: i64) -> bool {
        self.dag.contains_node(location_id)
    }

    /// Direct children of `location_id`; empty for leaves and unknown locations.
    pub fn successors(&self, location_id: i64) -> BTreeSet<i64> {
        if !self.dag.contains_node(location_id) {
            return BTreeSet::new();
        }
        self.dag
            .neighbors_directed(location_id, Direction::Outgoing)
            .collect()
    }

    pub fn parent(&self, location_id: i64) -> Option<i64> {
        if !self.dag.contains_node(location_id) {
            return None;
        }
        self.dag
            .neighbors_directed(location_id, Direction::Incoming)
            .next()
    }

    /// Every location below `location_id`.
    pub fn descendants(&self, location_id: i64) -> BTreeSet<i64> {
        let mut found = BTreeSet::new();
        let mut stack: Vec<i64> = self.successors(location_id).into_iter().collect();
        while let Some(next) = stack.pop() {
            if found.insert(next) {
                stack.extend(self.successors(next));
            }
        }
        found
    }
}
