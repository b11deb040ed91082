//! Scored access-path planner.
//!
//! Every viable combination of partition-key source (primary key or a global
//! index) and sort-side refinement (primary sort key, local index, or the
//! global index's own sort key) becomes one [`CandidatePlan`]. The highest
//! score wins; a full scan seeded at score 0 guarantees a result.
//!
//! Scoring, per partition-key path with bonus `b` (1 primary, 0.1 global):
//! - multi-valued equality: `50 * b`, one query per value
//! - single equality: `50 + 50 * b`
//! - refinement: `base + weight * candidate_score * 50` where weight is
//!   1 for the primary sort key, 0.01 for a local index and 0.5 for a
//!   global index's sort key.
//!
//! Ties go to the candidate generated first.

use tracing::debug;

use crate::config::TableOptions;
use crate::provider::multi_query::MultiQueryRowProvider;
use crate::provider::paginated::{QueryRowProvider, ScanRowProvider};
use crate::provider::parallel_scan::ParallelScanRowProvider;
use crate::provider::{ExplainContext, RowProvider};
use crate::query::condition::{KeyCondition, QueryParams};
use crate::query::qualifier::{find_exact_value, find_multi_values, Qualifier};
use crate::query::sort_key::sort_key_candidates;
use crate::query::topology::{KeyField, KeyTopology};
use crate::query::value::Value;

const SCAN_SCORE: f64 = 0.0;
const PARTITION_BASE: f64 = 50.0;
const REFINEMENT_SCALE: f64 = 50.0;

const PRIMARY_PARTITION_BONUS: f64 = 1.0;
const GLOBAL_PARTITION_BONUS: f64 = 0.1;

const PRIMARY_SORT_WEIGHT: f64 = 1.0;
const LOCAL_INDEX_WEIGHT: f64 = 0.01;
const GLOBAL_SORT_WEIGHT: f64 = 0.5;

/// A not yet executed provider and its score.
#[derive(Debug)]
pub struct CandidatePlan {
    /// Provider to run if this plan is chosen.
    pub provider: RowProvider,
    /// Heuristic score; higher is better.
    pub score: f64,
}

impl CandidatePlan {
    /// Plan trace of the provider.
    pub fn explain(&self, ctx: &ExplainContext<'_>) -> Vec<String> {
        self.provider.explain(ctx)
    }
}

/// How a partition-key path's equality was expressed.
#[derive(Clone, Copy)]
enum PartitionMatch<'q> {
    Single(&'q Value),
    Multi(&'q [Value]),
}

/// Sort-side attribute that can refine a partition-key path.
struct Refinement<'t> {
    field: &'t KeyField,
    index_name: Option<&'t str>,
    weight: f64,
}

/// Chooses the access path for one fetch.
#[derive(Debug, Clone, Copy)]
pub struct AccessPathPlanner<'a> {
    topology: &'a KeyTopology,
    options: &'a TableOptions,
}

impl<'a> AccessPathPlanner<'a> {
    /// Planner over one table's topology and options.
    pub fn new(topology: &'a KeyTopology, options: &'a TableOptions) -> Self {
        Self { topology, options }
    }

    /// All candidate plans in generation order, full scan first.
    pub fn candidates(&self, quals: &[Qualifier]) -> Vec<CandidatePlan> {
        let mut out = vec![self.scan_candidate()];
        self.key_candidates(quals, &mut out);
        out
    }

    /// The best candidate. Never fails.
    pub fn plan(&self, quals: &[Qualifier]) -> CandidatePlan {
        let mut keyed = Vec::new();
        self.key_candidates(quals, &mut keyed);
        let considered = keyed.len() + 1;

        let mut best = self.scan_candidate();
        for candidate in keyed {
            if candidate.score > best.score {
                best = candidate;
            }
        }
        debug!(
            candidates = considered,
            provider = %best.provider.kind(),
            score = best.score,
            "planner.selected"
        );
        best
    }

    fn scan_candidate(&self) -> CandidatePlan {
        let provider = if self.options.parallel_scan_count <= 1 {
            RowProvider::Scan(ScanRowProvider::new())
        } else {
            RowProvider::ParallelScan(ParallelScanRowProvider::new(
                self.options.parallel_scan_count,
                self.options.scan,
            ))
        };
        CandidatePlan {
            provider,
            score: SCAN_SCORE,
        }
    }

    fn key_candidates(&self, quals: &[Qualifier], out: &mut Vec<CandidatePlan>) {
        let topology = self.topology;

        let mut primary_refinements: Vec<Refinement<'_>> = Vec::new();
        if let Some(sort_key) = &topology.sort_key {
            primary_refinements.push(Refinement {
                field: sort_key,
                index_name: None,
                weight: PRIMARY_SORT_WEIGHT,
            });
        }
        primary_refinements.extend(topology.local_indexes.iter().map(|lsi| Refinement {
            field: &lsi.sort_key,
            index_name: Some(lsi.index_id.as_str()),
            weight: LOCAL_INDEX_WEIGHT,
        }));
        partition_path(
            quals,
            &topology.partition_key,
            None,
            PRIMARY_PARTITION_BONUS,
            &primary_refinements,
            out,
        );

        for gsi in &topology.global_indexes {
            let refinements: Vec<Refinement<'_>> = gsi
                .sort_key
                .iter()
                .map(|field| Refinement {
                    field,
                    index_name: Some(gsi.index_id.as_str()),
                    weight: GLOBAL_SORT_WEIGHT,
                })
                .collect();
            partition_path(
                quals,
                &gsi.partition_key,
                Some(gsi.index_id.as_str()),
                GLOBAL_PARTITION_BONUS,
                &refinements,
                out,
            );
        }
    }
}

/// Emits the unrefined plan for one partition-key path, then one plan per
/// refinement candidate.
fn partition_path(
    quals: &[Qualifier],
    partition_key: &KeyField,
    index_name: Option<&str>,
    bonus: f64,
    refinements: &[Refinement<'_>],
    out: &mut Vec<CandidatePlan>,
) {
    let matched = match find_multi_values(quals, &partition_key.logical_name) {
        Some(values) => PartitionMatch::Multi(values),
        None => match find_exact_value(quals, &partition_key.logical_name) {
            Some(value) => PartitionMatch::Single(value),
            None => return,
        },
    };
    let base = match matched {
        PartitionMatch::Multi(_) => PARTITION_BASE * bonus,
        PartitionMatch::Single(_) => PARTITION_BASE + PARTITION_BASE * bonus,
    };

    let build = |extra: Option<(&KeyField, KeyCondition)>, index: Option<&str>| {
        let mut params = QueryParams::default();
        if let Some(index) = index {
            params = params.with_index(index);
        }
        if let Some((field, condition)) = extra {
            params = params.with_condition(field.physical_attr.clone(), condition);
        }
        match matched {
            PartitionMatch::Multi(values) => RowProvider::MultiQuery(MultiQueryRowProvider::new(
                partition_key.physical_attr.clone(),
                values.iter().cloned(),
                &params,
            )),
            PartitionMatch::Single(value) => RowProvider::Query(QueryRowProvider::new(
                params.with_condition(
                    partition_key.physical_attr.clone(),
                    KeyCondition::eq(value.clone()),
                ),
            )),
        }
    };

    out.push(CandidatePlan {
        provider: build(None, index_name),
        score: base,
    });
    for refinement in refinements {
        let index = refinement.index_name.or(index_name);
        for candidate in sort_key_candidates(quals, refinement.field) {
            out.push(CandidatePlan {
                provider: build(Some((refinement.field, candidate.condition)), index),
                score: base + refinement.weight * candidate.score * REFINEMENT_SCALE,
            });
        }
    }
}
